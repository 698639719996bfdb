//! Command-line interface

use clap::{Args, Parser, Subcommand};
use gwproxy_core::{EnvironmentMask, ProxyEndpoint};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "gwproxy",
    version,
    about = "Point proxy settings at a proxy on the default gateway"
)]
pub struct Cli {
    /// Config file (default: <config dir>/gwproxy/config.toml)
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Log progress to stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Interactive menu (default)
    Menu,

    /// Enable at the gateway, or clear when already pointing there
    Toggle {
        #[command(flatten)]
        selection: Selection,
    },

    /// Enable at an explicit endpoint
    Set {
        /// Proxy address, `host:port` (an `http://` prefix is accepted)
        endpoint: ProxyEndpoint,

        #[command(flatten)]
        selection: Selection,
    },

    /// Clear the proxy
    Unset {
        #[command(flatten)]
        selection: Selection,
    },

    /// Show what each surface currently points at
    Status,

    /// Print the effective configuration
    Config,
}

#[derive(Args, Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    /// Surfaces to touch: `A` for all, or digits 1 (system), 2 (shell),
    /// 3 (editor), 4 (package manager)
    #[arg(long, value_name = "SELECTION", default_value = "A", value_parser = parse_mask)]
    pub only: EnvironmentMask,
}

fn parse_mask(input: &str) -> Result<EnvironmentMask, String> {
    let mask = EnvironmentMask::parse(input);
    if mask.is_empty() {
        return Err(format!("no surface selected by '{}'", input));
    }
    Ok(mask)
}
