//! Default gateway discovery
//!
//! Reads the host routing table with the platform's own tool and extracts
//! the IPv4 address of the default route's next hop.
//!
//! | Platform | Command | Matched line |
//! |----------|---------|--------------|
//! | Windows | `route print 0.0.0.0` | `0.0.0.0  0.0.0.0  <gw> ...` |
//! | macOS | `route -n get default` | `gateway: <gw>` |
//! | Linux | `ip -4 route show default` | `default via <gw> ...` |

use crate::command::{CommandError, CommandRunner, SystemCommand};
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::info;

static ROUTE_PRINT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"0\.0\.0\.0\s+0\.0\.0\.0\s+(\d+\.\d+\.\d+\.\d+)").expect("valid regex")
});

static ROUTE_GET: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"gateway:\s*(\d+\.\d+\.\d+\.\d+)").expect("valid regex"));

static IP_ROUTE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"default\s+via\s+(\d+\.\d+\.\d+\.\d+)").expect("valid regex"));

const ROUTE_PRINT_ARGS: &[&str] = &["print", "0.0.0.0"];
const ROUTE_GET_ARGS: &[&str] = &["-n", "get", "default"];
const IP_ROUTE_ARGS: &[&str] = &["-4", "route", "show", "default"];

/// Routing table dump format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteFormat {
    /// Windows `route print`
    RoutePrint,
    /// BSD/macOS `route get`
    RouteGet,
    /// iproute2 `ip route`
    IpRoute,
}

impl RouteFormat {
    /// Format used by the host platform
    pub fn host() -> Self {
        if cfg!(windows) {
            RouteFormat::RoutePrint
        } else if cfg!(target_os = "macos") {
            RouteFormat::RouteGet
        } else {
            RouteFormat::IpRoute
        }
    }

    fn command(&self) -> (&'static str, &'static [&'static str]) {
        match self {
            RouteFormat::RoutePrint => ("route", ROUTE_PRINT_ARGS),
            RouteFormat::RouteGet => ("route", ROUTE_GET_ARGS),
            RouteFormat::IpRoute => ("ip", IP_ROUTE_ARGS),
        }
    }

    fn pattern(&self) -> &'static Regex {
        match self {
            RouteFormat::RoutePrint => &ROUTE_PRINT,
            RouteFormat::RouteGet => &ROUTE_GET,
            RouteFormat::IpRoute => &IP_ROUTE,
        }
    }

    /// Extract the gateway address from a routing table dump
    pub fn parse(&self, output: &str) -> Option<String> {
        self.pattern()
            .captures(output)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().to_string())
    }
}

/// Source of the default gateway address
pub trait GatewaySource {
    fn default_gateway(&self) -> Result<String, ResolutionError>;
}

/// Resolves the default gateway from the routing table
#[derive(Debug, Clone)]
pub struct GatewayResolver<R = SystemCommand> {
    runner: R,
    format: RouteFormat,
}

impl GatewayResolver<SystemCommand> {
    /// Resolver for the host platform
    pub fn new() -> Self {
        Self::with_runner(SystemCommand, RouteFormat::host())
    }
}

impl Default for GatewayResolver<SystemCommand> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: CommandRunner> GatewayResolver<R> {
    /// Resolver with a custom command runner
    pub fn with_runner(runner: R, format: RouteFormat) -> Self {
        Self { runner, format }
    }
}

impl<R: CommandRunner> GatewaySource for GatewayResolver<R> {
    fn default_gateway(&self) -> Result<String, ResolutionError> {
        let (program, args) = self.format.command();
        let output = self.runner.run(program, args)?;

        let gateway = self.format.parse(&output).ok_or(ResolutionError::NotFound)?;
        info!("Default gateway: {}", gateway);
        Ok(gateway)
    }
}

/// Gateway resolution errors
#[derive(Debug, thiserror::Error)]
pub enum ResolutionError {
    #[error("Failed to read routing table: {0}")]
    Command(#[from] CommandError),

    #[error("Gateway not found")]
    NotFound,
}
