//! Proxy endpoints and per-surface state
//!
//! A [`ProxyEndpoint`] is the one unit of "a proxy address" shared by every
//! surface. The OS store takes it bare (`host:port`); file surfaces take it as
//! a URL (`http://host:port`).

use std::fmt;
use std::net::Ipv4Addr;
use std::str::FromStr;

/// Port the gateway proxy listens on by default
pub const DEFAULT_PROXY_PORT: u16 = 10808;

/// Scheme prefix used by file surfaces
const HTTP_SCHEME: &str = "http://";

/// Proxy server address (host + port)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ProxyEndpoint {
    /// Host (usually a dotted IPv4 literal)
    pub host: String,
    /// TCP port
    pub port: u16,
}

impl ProxyEndpoint {
    /// Create a new endpoint
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    /// Endpoint on the loopback interface
    pub fn localhost(port: u16) -> Self {
        Self::new(Ipv4Addr::LOCALHOST.to_string(), port)
    }

    /// URL form used by file surfaces
    pub fn url(&self) -> String {
        format!("{}{}", HTTP_SCHEME, self)
    }

    /// Does the host refer to this machine?
    pub fn is_loopback(&self) -> bool {
        match self.host.as_str() {
            "localhost" | "::1" | "[::1]" => true,
            host => host
                .parse::<Ipv4Addr>()
                .map(|ip| ip.is_loopback())
                .unwrap_or(false),
        }
    }
}

impl fmt::Display for ProxyEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

impl FromStr for ProxyEndpoint {
    type Err = EndpointError;

    /// Accepts `host:port`, optionally prefixed with `http://` and
    /// followed by a `/`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let s = s.strip_prefix(HTTP_SCHEME).unwrap_or(s);
        let s = s.strip_suffix('/').unwrap_or(s);

        let (host, port) = s
            .rsplit_once(':')
            .ok_or_else(|| EndpointError::MissingPort(s.to_string()))?;

        if host.is_empty() {
            return Err(EndpointError::EmptyHost);
        }
        if host.contains(|c: char| c.is_whitespace() || matches!(c, '=' | ';' | '/')) {
            return Err(EndpointError::InvalidHost(host.to_string()));
        }

        let port: u16 = port
            .parse()
            .map_err(|_| EndpointError::InvalidPort(port.to_string()))?;
        if port == 0 {
            return Err(EndpointError::InvalidPort(port.to_string()));
        }

        Ok(Self::new(host, port))
    }
}

/// Endpoint parse errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EndpointError {
    #[error("Missing port in '{0}' (expected host:port)")]
    MissingPort(String),

    #[error("Invalid port '{0}'")]
    InvalidPort(String),

    #[error("Invalid host '{0}'")]
    InvalidHost(String),

    #[error("Empty host")]
    EmptyHost,
}

/// Logical proxy state of one surface
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ProxyState {
    /// Configured endpoint, if any
    pub endpoint: Option<ProxyEndpoint>,
    /// Is the proxy switched on?
    pub enabled: bool,
}

impl ProxyState {
    /// Proxy switched off
    pub fn disabled() -> Self {
        Self::default()
    }

    /// Proxy switched on at `endpoint`
    pub fn enabled(endpoint: ProxyEndpoint) -> Self {
        Self {
            endpoint: Some(endpoint),
            enabled: true,
        }
    }

    /// Endpoint in effect, only when enabled
    pub fn active_endpoint(&self) -> Option<&ProxyEndpoint> {
        self.endpoint.as_ref().filter(|_| self.enabled)
    }
}

/// Where an observed endpoint points (display only)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndpointKind {
    /// The resolved default gateway
    Gateway,
    /// This machine
    Localhost,
    /// Anything else
    Custom,
}

impl EndpointKind {
    /// Classify `endpoint` against the resolved gateway address.
    pub fn classify(endpoint: &ProxyEndpoint, gateway: Option<&str>) -> Self {
        if gateway.is_some_and(|gw| gw == endpoint.host) {
            EndpointKind::Gateway
        } else if endpoint.is_loopback() {
            EndpointKind::Localhost
        } else {
            EndpointKind::Custom
        }
    }

    /// Display label
    pub fn label(&self) -> &'static str {
        match self {
            EndpointKind::Gateway => "Gateway",
            EndpointKind::Localhost => "Localhost",
            EndpointKind::Custom => "Custom",
        }
    }
}

impl fmt::Display for EndpointKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
