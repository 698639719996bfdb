//! Configuration surfaces
//!
//! Each surface turns "proxy at this endpoint" / "no proxy" into a concrete
//! change in one place, and can report what that place currently says.
//!
//! | Surface | Target | Managed fragment |
//! |---------|--------|------------------|
//! | [`SystemSurface`] | OS proxy store | `host:port` + enable flag |
//! | [`ShellProfileSurface`] | Shell startup script | `# Proxy Setting` block |
//! | [`EditorSurface`] | Editor `settings.json` | `http.proxy` key |
//! | [`PackageManagerSurface`] | `.npmrc` | `proxy=` line |

use crate::endpoint::{ProxyEndpoint, ProxyState};
use crate::mask::SurfaceKind;
use crate::store::{ProxyStore, StoreError};
use gwproxy_merge::{
    read_optional, LineEntryMerger, MergeError, ScriptBlockMerger, StructuredSettingsMerger,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

/// One configuration target
pub trait Surface {
    /// Which surface this is
    fn kind(&self) -> SurfaceKind;

    /// Point the surface at `endpoint`, or switch the proxy off when `None`.
    fn apply(&self, endpoint: Option<&ProxyEndpoint>) -> Result<(), SurfaceError>;

    /// Read the surface's current state
    fn observe(&self) -> Result<ProxyState, SurfaceError>;
}

/// Per-surface errors
#[derive(Debug, thiserror::Error)]
pub enum SurfaceError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    File(#[from] MergeError),
}

/// OS proxy settings
pub struct SystemSurface {
    store: Box<dyn ProxyStore>,
}

impl SystemSurface {
    pub fn new(store: Box<dyn ProxyStore>) -> Self {
        Self { store }
    }
}

impl Surface for SystemSurface {
    fn kind(&self) -> SurfaceKind {
        SurfaceKind::System
    }

    fn apply(&self, endpoint: Option<&ProxyEndpoint>) -> Result<(), SurfaceError> {
        debug!("Applying {:?} to {} store", endpoint, self.store.name());
        match endpoint {
            Some(endpoint) => self.store.set(&endpoint.to_string(), true)?,
            None => self.store.set("", false)?,
        }
        Ok(())
    }

    fn observe(&self) -> Result<ProxyState, SurfaceError> {
        Ok(self.store.get()?.state())
    }
}

/// Shell dialect of the profile script
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShellFlavor {
    /// `export name="value"`
    Posix,
    /// `$env:name="value"`
    PowerShell,
}

impl ShellFlavor {
    /// Flavor native to the host platform
    pub fn host() -> Self {
        if cfg!(windows) {
            ShellFlavor::PowerShell
        } else {
            ShellFlavor::Posix
        }
    }

    fn assignment(&self, name: &str, value: &str) -> String {
        match self {
            ShellFlavor::Posix => format!("export {}=\"{}\"", name, value),
            ShellFlavor::PowerShell => format!("$env:{}=\"{}\"", name, value),
        }
    }

    /// Managed block body for `endpoint`
    pub fn proxy_body(&self, endpoint: &ProxyEndpoint) -> String {
        let url = endpoint.url();
        [
            self.assignment("http_proxy", &url),
            self.assignment("https_proxy", &url),
        ]
        .join("\n")
    }
}

/// Find the `http_proxy` value among managed block lines
fn http_proxy_value<'a>(lines: &[&'a str]) -> Option<&'a str> {
    lines.iter().find_map(|line| {
        let (lhs, rhs) = line.split_once('=')?;
        let name = lhs.trim().trim_start_matches("export ").trim_start_matches("$env:");
        (name.trim() == "http_proxy").then(|| rhs.trim().trim_matches('"').trim_matches('\''))
    })
}

/// Shell startup script
pub struct ShellProfileSurface {
    path: PathBuf,
    flavor: ShellFlavor,
    merger: ScriptBlockMerger,
}

impl ShellProfileSurface {
    pub fn new(path: impl Into<PathBuf>, flavor: ShellFlavor, sentinel: &str) -> Self {
        Self {
            path: path.into(),
            flavor,
            merger: ScriptBlockMerger::new(sentinel),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Surface for ShellProfileSurface {
    fn kind(&self) -> SurfaceKind {
        SurfaceKind::ShellProfile
    }

    fn apply(&self, endpoint: Option<&ProxyEndpoint>) -> Result<(), SurfaceError> {
        let body = endpoint.map(|ep| self.flavor.proxy_body(ep));
        self.merger.apply_to_file(&self.path, body.as_deref())?;
        Ok(())
    }

    fn observe(&self) -> Result<ProxyState, SurfaceError> {
        let content = read_optional(&self.path)?;

        let endpoint = self
            .merger
            .extract(&content)
            .and_then(|lines| http_proxy_value(&lines).and_then(|v| v.parse().ok()));

        Ok(match endpoint {
            Some(endpoint) => ProxyState::enabled(endpoint),
            None => ProxyState::disabled(),
        })
    }
}

/// Editor `settings.json`
pub struct EditorSurface {
    path: PathBuf,
    merger: StructuredSettingsMerger,
}

impl EditorSurface {
    pub fn new(path: impl Into<PathBuf>, key: &str) -> Self {
        Self {
            path: path.into(),
            merger: StructuredSettingsMerger::new(key),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Surface for EditorSurface {
    fn kind(&self) -> SurfaceKind {
        SurfaceKind::Editor
    }

    fn apply(&self, endpoint: Option<&ProxyEndpoint>) -> Result<(), SurfaceError> {
        let url = endpoint.map(ProxyEndpoint::url);
        self.merger.apply_to_file(&self.path, url.as_deref())?;
        Ok(())
    }

    fn observe(&self) -> Result<ProxyState, SurfaceError> {
        let document = self.merger.read_file(&self.path)?;
        Ok(state_from_value(self.merger.get(&document)))
    }
}

/// Package manager config (`.npmrc`)
pub struct PackageManagerSurface {
    path: PathBuf,
    merger: LineEntryMerger,
}

impl PackageManagerSurface {
    pub fn new(path: impl Into<PathBuf>, prefix: &str) -> Self {
        Self {
            path: path.into(),
            merger: LineEntryMerger::new(prefix),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Surface for PackageManagerSurface {
    fn kind(&self) -> SurfaceKind {
        SurfaceKind::PackageManager
    }

    fn apply(&self, endpoint: Option<&ProxyEndpoint>) -> Result<(), SurfaceError> {
        let url = endpoint.map(ProxyEndpoint::url);
        self.merger.apply_to_file(&self.path, url.as_deref())?;
        Ok(())
    }

    fn observe(&self) -> Result<ProxyState, SurfaceError> {
        let content = read_optional(&self.path)?;
        Ok(state_from_value(self.merger.value(&content)))
    }
}

/// File surfaces are on when their fragment holds a parseable endpoint
fn state_from_value(value: Option<&str>) -> ProxyState {
    match value.and_then(|v| v.parse::<ProxyEndpoint>().ok()) {
        Some(endpoint) => ProxyState::enabled(endpoint),
        None => ProxyState::disabled(),
    }
}
