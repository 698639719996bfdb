//! OS proxy store
//!
//! The operating system keeps the machine-wide proxy as two fields: a server
//! string (`host:port`, no scheme) and an enable flag.
//!
//! | Platform | Backend |
//! |----------|---------|
//! | Windows | `HKCU\...\Internet Settings` (`ProxyServer`, `ProxyEnable`) |
//! | Other | GNOME `gsettings` (`org.gnome.system.proxy`) |

use crate::command::{CommandError, CommandRunner, SystemCommand};
use crate::endpoint::{ProxyEndpoint, ProxyState};
use std::cell::RefCell;
use tracing::{debug, info};

/// Raw contents of the OS proxy store
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StoreRecord {
    /// Server string, `host:port`
    pub server: String,
    /// Enable flag
    pub enabled: bool,
}

impl StoreRecord {
    /// Create a record
    pub fn new(server: impl Into<String>, enabled: bool) -> Self {
        Self {
            server: server.into(),
            enabled,
        }
    }

    /// Logical state. A server string that is not `host:port` reads as no endpoint.
    pub fn state(&self) -> ProxyState {
        let endpoint = self.server.parse::<ProxyEndpoint>().ok();
        ProxyState {
            enabled: self.enabled && endpoint.is_some(),
            endpoint,
        }
    }
}

/// Get/set access to the OS proxy settings
pub trait ProxyStore {
    /// Backend name for logs
    fn name(&self) -> &'static str;

    /// Read the current record
    fn get(&self) -> Result<StoreRecord, StoreError>;

    /// Write server string and enable flag
    fn set(&self, server: &str, enabled: bool) -> Result<(), StoreError>;
}

/// Store backed by the host platform
pub fn platform_store() -> Box<dyn ProxyStore> {
    #[cfg(windows)]
    {
        Box::new(RegistryProxyStore::new())
    }

    #[cfg(not(windows))]
    {
        Box::new(GsettingsProxyStore::new())
    }
}

/// In-process store, used when the OS store must not be touched
#[derive(Debug, Default)]
pub struct MemoryProxyStore {
    record: RefCell<StoreRecord>,
}

impl MemoryProxyStore {
    /// Create a store holding `record`
    pub fn new(record: StoreRecord) -> Self {
        Self {
            record: RefCell::new(record),
        }
    }

    /// Current record
    pub fn record(&self) -> StoreRecord {
        self.record.borrow().clone()
    }
}

impl ProxyStore for MemoryProxyStore {
    fn name(&self) -> &'static str {
        "memory"
    }

    fn get(&self) -> Result<StoreRecord, StoreError> {
        Ok(self.record())
    }

    fn set(&self, server: &str, enabled: bool) -> Result<(), StoreError> {
        *self.record.borrow_mut() = StoreRecord::new(server, enabled);
        Ok(())
    }
}

#[cfg(windows)]
pub use registry::RegistryProxyStore;

#[cfg(windows)]
mod registry {
    use super::{ProxyStore, StoreError, StoreRecord};
    use std::io::ErrorKind;
    use tracing::info;
    use winreg::RegKey;
    use winreg::enums::{HKEY_CURRENT_USER, KEY_READ, KEY_SET_VALUE};

    const INTERNET_SETTINGS: &str = r"Software\Microsoft\Windows\CurrentVersion\Internet Settings";
    const PROXY_ENABLE: &str = "ProxyEnable";
    const PROXY_SERVER: &str = "ProxyServer";

    /// Current-user Internet Settings in the Windows registry
    #[derive(Debug, Clone, Copy, Default)]
    pub struct RegistryProxyStore;

    impl RegistryProxyStore {
        pub fn new() -> Self {
            Self
        }

        fn open(flags: u32) -> Result<RegKey, StoreError> {
            RegKey::predef(HKEY_CURRENT_USER)
                .open_subkey_with_flags(INTERNET_SETTINGS, flags)
                .map_err(StoreError::Open)
        }
    }

    impl ProxyStore for RegistryProxyStore {
        fn name(&self) -> &'static str {
            "registry"
        }

        fn get(&self) -> Result<StoreRecord, StoreError> {
            let key = Self::open(KEY_READ)?;

            let enabled = match key.get_value::<u32, _>(PROXY_ENABLE) {
                Ok(value) => value != 0,
                Err(e) if e.kind() == ErrorKind::NotFound => false,
                Err(source) => {
                    return Err(StoreError::Read {
                        name: PROXY_ENABLE,
                        source,
                    });
                }
            };

            let server = match key.get_value::<String, _>(PROXY_SERVER) {
                Ok(value) => value,
                Err(e) if e.kind() == ErrorKind::NotFound => String::new(),
                Err(source) => {
                    return Err(StoreError::Read {
                        name: PROXY_SERVER,
                        source,
                    });
                }
            };

            Ok(StoreRecord { server, enabled })
        }

        fn set(&self, server: &str, enabled: bool) -> Result<(), StoreError> {
            let key = Self::open(KEY_READ | KEY_SET_VALUE)?;

            key.set_value(PROXY_SERVER, &server.to_string())
                .map_err(|source| StoreError::Write {
                    name: PROXY_SERVER,
                    source,
                })?;
            key.set_value(PROXY_ENABLE, &u32::from(enabled))
                .map_err(|source| StoreError::Write {
                    name: PROXY_ENABLE,
                    source,
                })?;

            info!("Registry proxy set to '{}' (enabled: {})", server, enabled);
            Ok(())
        }
    }
}

const GNOME_PROXY: &str = "org.gnome.system.proxy";
const GNOME_PROXY_HTTP: &str = "org.gnome.system.proxy.http";
const GNOME_PROXY_HTTPS: &str = "org.gnome.system.proxy.https";

/// GNOME desktop proxy settings via `gsettings`
#[derive(Debug, Clone, Default)]
pub struct GsettingsProxyStore<R = SystemCommand> {
    runner: R,
}

impl GsettingsProxyStore<SystemCommand> {
    pub fn new() -> Self {
        Self::with_runner(SystemCommand)
    }
}

impl<R: CommandRunner> GsettingsProxyStore<R> {
    /// Store with a custom command runner
    pub fn with_runner(runner: R) -> Self {
        Self { runner }
    }

    fn read_key(&self, schema: &str, key: &str) -> Result<String, StoreError> {
        let raw = self.runner.run("gsettings", &["get", schema, key])?;
        Ok(unquote(&raw))
    }

    fn write_key(&self, schema: &str, key: &str, value: &str) -> Result<(), StoreError> {
        self.runner.run("gsettings", &["set", schema, key, value])?;
        Ok(())
    }
}

impl<R: CommandRunner> ProxyStore for GsettingsProxyStore<R> {
    fn name(&self) -> &'static str {
        "gsettings"
    }

    fn get(&self) -> Result<StoreRecord, StoreError> {
        let mode = self.read_key(GNOME_PROXY, "mode")?;
        let host = self.read_key(GNOME_PROXY_HTTP, "host")?;
        let port = self.read_key(GNOME_PROXY_HTTP, "port")?;

        let server = match port.parse::<u16>() {
            Ok(port) if !host.is_empty() && port != 0 => format!("{}:{}", host, port),
            _ => String::new(),
        };
        debug!("gsettings proxy mode '{}', server '{}'", mode, server);

        Ok(StoreRecord {
            server,
            enabled: mode == "manual",
        })
    }

    fn set(&self, server: &str, enabled: bool) -> Result<(), StoreError> {
        if !enabled {
            self.write_key(GNOME_PROXY, "mode", "none")?;
            info!("gsettings proxy disabled");
            return Ok(());
        }

        let endpoint: ProxyEndpoint = server
            .parse()
            .map_err(|_| StoreError::Malformed(server.to_string()))?;
        let port = endpoint.port.to_string();

        // Off while host/port are rewritten, so a failed write never leaves
        // a half-updated proxy in effect
        self.write_key(GNOME_PROXY, "mode", "none")?;
        for schema in [GNOME_PROXY_HTTP, GNOME_PROXY_HTTPS] {
            self.write_key(schema, "host", &endpoint.host)?;
            self.write_key(schema, "port", &port)?;
        }
        self.write_key(GNOME_PROXY, "mode", "manual")?;

        info!("gsettings proxy set to {}", endpoint);
        Ok(())
    }
}

/// Strip GVariant decoration: `'text'` → `text`, `uint32 8080` → `8080`
fn unquote(raw: &str) -> String {
    let value = raw.trim();
    let value = value.strip_prefix("uint32 ").unwrap_or(value);
    value
        .strip_prefix('\'')
        .and_then(|v| v.strip_suffix('\''))
        .unwrap_or(value)
        .to_string()
}

/// OS store errors
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Failed to open proxy settings: {0}")]
    Open(#[source] std::io::Error),

    #[error("Failed to read {name}: {source}")]
    Read {
        name: &'static str,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write {name}: {source}")]
    Write {
        name: &'static str,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Command(#[from] CommandError),

    #[error("Malformed proxy server '{0}'")]
    Malformed(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    /// Fake `gsettings` backed by a map
    #[derive(Default)]
    struct FakeGsettings {
        values: RefCell<HashMap<String, String>>,
        writes: RefCell<Vec<String>>,
        fail_on: Option<&'static str>,
    }

    impl FakeGsettings {
        fn with(values: &[(&str, &str)]) -> Self {
            let fake = Self::default();
            for (k, v) in values {
                fake.values.borrow_mut().insert(k.to_string(), v.to_string());
            }
            fake
        }

        fn value(&self, key: &str) -> Option<String> {
            self.values.borrow().get(key).cloned()
        }
    }

    impl CommandRunner for FakeGsettings {
        fn run(&self, program: &str, args: &[&str]) -> Result<String, CommandError> {
            assert_eq!(program, "gsettings");
            let key = format!("{} {}", args[1], args[2]);
            match args[0] {
                "get" => Ok(format!("{}\n", self.value(&key).unwrap_or_else(|| "''".into()))),
                "set" => {
                    if self.fail_on == Some(key.as_str()) {
                        return Err(CommandError::Failed {
                            program: program.to_string(),
                            code: Some(1),
                            stderr: "schema locked".to_string(),
                        });
                    }
                    self.writes.borrow_mut().push(format!("{}={}", key, args[3]));
                    self.values.borrow_mut().insert(key, args[3].to_string());
                    Ok(String::new())
                }
                other => panic!("unexpected gsettings verb {other}"),
            }
        }
    }

    #[test]
    fn test_record_state() {
        let state = StoreRecord::new("10.0.0.1:10808", true).state();
        assert_eq!(state, ProxyState::enabled(ProxyEndpoint::new("10.0.0.1", 10808)));

        let state = StoreRecord::new("", true).state();
        assert!(!state.enabled);

        let state = StoreRecord::new("http=a:1;https=b:2", true).state();
        assert!(state.active_endpoint().is_none());
    }

    #[test]
    fn test_memory_store() {
        let store = MemoryProxyStore::default();
        store.set("127.0.0.1:10808", true).unwrap();
        assert_eq!(store.get().unwrap(), StoreRecord::new("127.0.0.1:10808", true));
    }

    #[test]
    fn test_unquote() {
        assert_eq!(unquote("'manual'\n"), "manual");
        assert_eq!(unquote("10808"), "10808");
        assert_eq!(unquote("uint32 10808"), "10808");
        assert_eq!(unquote("''"), "");
    }

    #[test]
    fn test_gsettings_get() {
        let fake = FakeGsettings::with(&[
            ("org.gnome.system.proxy mode", "'manual'"),
            ("org.gnome.system.proxy.http host", "'10.0.0.1'"),
            ("org.gnome.system.proxy.http port", "10808"),
        ]);
        let store = GsettingsProxyStore::with_runner(fake);

        assert_eq!(store.get().unwrap(), StoreRecord::new("10.0.0.1:10808", true));
    }

    #[test]
    fn test_gsettings_unset_host() {
        let fake = FakeGsettings::with(&[
            ("org.gnome.system.proxy mode", "'none'"),
            ("org.gnome.system.proxy.http port", "0"),
        ]);
        let store = GsettingsProxyStore::with_runner(fake);

        assert_eq!(store.get().unwrap(), StoreRecord::default());
    }

    #[test]
    fn test_gsettings_set_and_clear() {
        let store = GsettingsProxyStore::with_runner(FakeGsettings::default());

        store.set("10.0.0.2:3128", true).unwrap();
        assert_eq!(store.runner.value("org.gnome.system.proxy mode").as_deref(), Some("manual"));
        assert_eq!(store.runner.value("org.gnome.system.proxy.https host").as_deref(), Some("10.0.0.2"));
        assert_eq!(store.runner.value("org.gnome.system.proxy.http port").as_deref(), Some("3128"));

        store.set("", false).unwrap();
        assert_eq!(store.runner.value("org.gnome.system.proxy mode").as_deref(), Some("none"));
    }

    #[test]
    fn test_gsettings_switches_off_before_rewriting() {
        let store = GsettingsProxyStore::with_runner(FakeGsettings::default());
        store.set("10.0.0.2:3128", true).unwrap();

        let writes = store.runner.writes.borrow();
        assert_eq!(writes.first().map(String::as_str), Some("org.gnome.system.proxy mode=none"));
        assert_eq!(writes.last().map(String::as_str), Some("org.gnome.system.proxy mode=manual"));
        assert_eq!(writes.len(), 6);
    }

    #[test]
    fn test_gsettings_partial_write_leaves_proxy_off() {
        let fake = FakeGsettings {
            fail_on: Some("org.gnome.system.proxy.https port"),
            ..FakeGsettings::with(&[("org.gnome.system.proxy mode", "'manual'")])
        };
        let store = GsettingsProxyStore::with_runner(fake);

        assert!(matches!(store.set("10.0.0.2:3128", true), Err(StoreError::Command(_))));
        assert_eq!(store.runner.value("org.gnome.system.proxy mode").as_deref(), Some("none"));
        assert!(!store.get().unwrap().enabled);
    }

    #[test]
    fn test_gsettings_rejects_malformed_server() {
        let store = GsettingsProxyStore::with_runner(FakeGsettings::default());
        assert!(matches!(store.set("nonsense", true), Err(StoreError::Malformed(_))));
    }
}
