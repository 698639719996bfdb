//! gwproxy core
//!
//! Points the machine's proxy settings at a proxy listening on the default
//! gateway (or any other endpoint) across four independent surfaces, and
//! clears them again.
//!
//! # Architecture
//!
//! ```text
//!  routing table ──▶ GatewayResolver ──▶ candidate endpoint
//!                                              │
//!  OS proxy store ──▶ current state ───────────┤
//!                                              ▼
//!                                       ProxyReconciler ──▶ Decision
//!                                              │
//!          ┌───────────────┬───────────────────┼───────────────────┐
//!          ▼               ▼                   ▼                   ▼
//!    SystemSurface  ShellProfileSurface   EditorSurface   PackageManagerSurface
//!    (ProxyStore)   (script block)        (JSON key)      (prefixed line)
//! ```
//!
//! Surface failures are collected per surface; one failing surface never
//! stops the others.

mod command;
mod config;
mod endpoint;
mod gateway;
mod mask;
mod reconcile;
mod store;
mod surface;

pub use command::{CommandError, CommandRunner, SystemCommand};
pub use config::{Config, ConfigError, EditorConfig, PackageManagerConfig, ShellConfig};
pub use endpoint::{
    EndpointError, EndpointKind, ProxyEndpoint, ProxyState, DEFAULT_PROXY_PORT,
};
pub use gateway::{GatewayResolver, GatewaySource, ResolutionError, RouteFormat};
pub use mask::{EnvironmentMask, SurfaceKind};
pub use reconcile::{
    Action, Decision, Intent, ProxyReconciler, ReconcileError, ReconciliationResult,
    SurfaceOutcome,
};
pub use store::{
    platform_store, GsettingsProxyStore, MemoryProxyStore, ProxyStore, StoreError, StoreRecord,
};
#[cfg(windows)]
pub use store::RegistryProxyStore;
pub use surface::{
    EditorSurface, PackageManagerSurface, ShellFlavor, ShellProfileSurface, Surface,
    SurfaceError, SystemSurface,
};

/// Resolve the default gateway and pair it with `port`
pub fn gateway_endpoint(
    source: &dyn GatewaySource,
    port: u16,
) -> Result<ProxyEndpoint, ResolutionError> {
    source
        .default_gateway()
        .map(|host| ProxyEndpoint::new(host, port))
}
