//! Configuration
//!
//! Optional TOML file at `<config_dir>/gwproxy/config.toml`. Every field has
//! a default, so a missing file or a partial one both work:
//!
//! ```toml
//! proxy_port = 10808
//!
//! [shell]
//! path = "/home/me/.zshrc"
//! flavor = "posix"
//!
//! [package_manager]
//! prefix = "proxy="
//! ```

use crate::endpoint::DEFAULT_PROXY_PORT;
use crate::surface::ShellFlavor;
use gwproxy_merge::{DEFAULT_ENTRY_PREFIX, DEFAULT_PROXY_KEY, DEFAULT_SENTINEL};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Complete configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Port the proxy listens on at the gateway / localhost
    #[serde(default = "default_proxy_port")]
    pub proxy_port: u16,
    /// Shell profile surface
    #[serde(default)]
    pub shell: ShellConfig,
    /// Editor settings surface
    #[serde(default)]
    pub editor: EditorConfig,
    /// Package manager surface
    #[serde(default)]
    pub package_manager: PackageManagerConfig,
}

/// Shell profile settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShellConfig {
    #[serde(default = "default_shell_path")]
    pub path: PathBuf,
    #[serde(default = "ShellFlavor::host")]
    pub flavor: ShellFlavor,
    /// Line delimiting the managed block
    #[serde(default = "default_sentinel")]
    pub sentinel: String,
}

/// Editor settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EditorConfig {
    #[serde(default = "default_editor_path")]
    pub path: PathBuf,
    /// Reserved settings key
    #[serde(default = "default_editor_key")]
    pub key: String,
}

/// Package manager settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PackageManagerConfig {
    #[serde(default = "default_npmrc_path")]
    pub path: PathBuf,
    /// Reserved line prefix, including `=`
    #[serde(default = "default_entry_prefix")]
    pub prefix: String,
}

fn default_proxy_port() -> u16 {
    DEFAULT_PROXY_PORT
}

fn default_sentinel() -> String {
    DEFAULT_SENTINEL.to_string()
}

fn default_editor_key() -> String {
    DEFAULT_PROXY_KEY.to_string()
}

fn default_entry_prefix() -> String {
    DEFAULT_ENTRY_PREFIX.to_string()
}

fn home_dir() -> PathBuf {
    dirs::home_dir().unwrap_or_else(|| PathBuf::from("."))
}

fn default_shell_path() -> PathBuf {
    if cfg!(windows) {
        dirs::document_dir()
            .unwrap_or_else(|| home_dir().join("Documents"))
            .join("WindowsPowerShell")
            .join("Microsoft.PowerShell_profile.ps1")
    } else {
        home_dir().join(".bashrc")
    }
}

fn default_editor_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(home_dir)
        .join("Code")
        .join("User")
        .join("settings.json")
}

fn default_npmrc_path() -> PathBuf {
    home_dir().join(".npmrc")
}

impl Default for ShellConfig {
    fn default() -> Self {
        Self {
            path: default_shell_path(),
            flavor: ShellFlavor::host(),
            sentinel: default_sentinel(),
        }
    }
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            path: default_editor_path(),
            key: default_editor_key(),
        }
    }
}

impl Default for PackageManagerConfig {
    fn default() -> Self {
        Self {
            path: default_npmrc_path(),
            prefix: default_entry_prefix(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            proxy_port: default_proxy_port(),
            shell: ShellConfig::default(),
            editor: EditorConfig::default(),
            package_manager: PackageManagerConfig::default(),
        }
    }
}

impl Config {
    /// Default config file location
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("gwproxy").join("config.toml"))
    }

    /// Load from `path`, or from the default location when `None`.
    ///
    /// A missing file at the default location yields the defaults; a missing
    /// file at an explicit `path` is an error.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = path {
            let config = Self::from_toml_file(path)?;
            info!("Loaded config from {}", path.display());
            return Ok(config);
        }

        let Some(path) = Self::default_path() else {
            debug!("No config directory, using defaults");
            return Ok(Self::default());
        };

        if !path.exists() {
            debug!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let config = Self::from_toml_file(&path)?;
        info!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Load from TOML file
    pub fn from_toml_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::IoError(format!("{}: {}", path.display(), e)))?;
        Self::from_toml(&content)
    }

    /// Load from TOML string
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self =
            toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Export as TOML
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::SerializeError(e.to_string()))
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.proxy_port == 0 {
            return Err(ConfigError::InvalidPort);
        }
        if self.shell.sentinel.trim().is_empty() {
            return Err(ConfigError::Empty("shell.sentinel"));
        }
        if self.editor.key.is_empty() {
            return Err(ConfigError::Empty("editor.key"));
        }
        if self.package_manager.prefix.trim().is_empty() {
            return Err(ConfigError::Empty("package_manager.prefix"));
        }
        Ok(())
    }
}

/// Configuration errors
#[derive(Debug, Clone, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid proxy port")]
    InvalidPort,

    #[error("{0} must not be empty")]
    Empty(&'static str),

    #[error("IO error: {0}")]
    IoError(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Serialize error: {0}")]
    SerializeError(String),
}
