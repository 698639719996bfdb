//! gwproxy: point proxy settings at the default gateway
//!
//! Main entry point. Sets up the global allocator and logging, loads the
//! configuration, then runs either the interactive menu or one command.

mod cli;
mod menu;
mod report;

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Command};
use gwproxy_core::{
    gateway_endpoint, platform_store, Config, Decision, EnvironmentMask, GatewayResolver,
    GatewaySource, Intent, ProxyReconciler, ReconciliationResult,
};
use std::io::{self, Write};
use std::process::ExitCode;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

// Use mimalloc as the global allocator
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = Config::load(cli.config.as_deref()).context("Failed to load configuration")?;
    let resolver = GatewayResolver::new();
    let reconciler = ProxyReconciler::from_config(&config, platform_store());
    let port = config.proxy_port;

    match cli.command.unwrap_or(Command::Menu) {
        Command::Menu => {
            let stdin = io::stdin();
            menu::Menu::new(&reconciler, &resolver, port, stdin.lock(), io::stdout()).run()?;
            Ok(ExitCode::SUCCESS)
        }
        Command::Toggle { selection } => toggle(&reconciler, &resolver, port, selection.only),
        Command::Set {
            endpoint,
            selection,
        } => finish(&reconciler.execute(Decision::enable(endpoint), selection.only)),
        Command::Unset { selection } => {
            finish(&reconciler.execute(Decision::disable(), selection.only))
        }
        Command::Status => status(&reconciler, &resolver, port),
        Command::Config => {
            print!("{}", config.to_toml().context("Failed to render configuration")?);
            Ok(ExitCode::SUCCESS)
        }
    }
}

/// Logs go to stderr; `RUST_LOG` overrides the level chosen by `--verbose`.
fn init_logging(verbose: bool) {
    let default_level = if verbose { "info" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .compact()
        .init();
}

fn toggle(
    reconciler: &ProxyReconciler,
    gateway: &dyn GatewaySource,
    port: u16,
    mask: EnvironmentMask,
) -> Result<ExitCode> {
    let candidate = gateway_endpoint(gateway, port).context("Error getting gateway")?;
    let current = reconciler.toggle_state(mask);

    let result = reconciler.reconcile(&current, Ok(candidate), Intent::Toggle, mask)?;
    finish(&result)
}

/// Print the outcome; failure exit code when any surface failed.
fn finish(result: &ReconciliationResult) -> Result<ExitCode> {
    let mut stdout = io::stdout().lock();
    report::write_result(&mut stdout, result)?;
    writeln!(stdout, "{}", report::RESTART_HINT)?;

    if result.is_success() {
        info!("All selected surfaces updated");
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::FAILURE)
    }
}

fn status(reconciler: &ProxyReconciler, gateway: &dyn GatewaySource, port: u16) -> Result<ExitCode> {
    let gateway = match gateway_endpoint(gateway, port) {
        Ok(endpoint) => Some(endpoint.host),
        Err(e) => {
            warn!("Cannot classify against gateway: {}", e);
            None
        }
    };

    let observations = reconciler.observe(EnvironmentMask::all());
    let mut stdout = io::stdout().lock();
    if let Some(host) = &gateway {
        writeln!(stdout, "Gateway          {}", host)?;
    }
    report::write_status(&mut stdout, &observations, gateway.as_deref())?;
    Ok(ExitCode::SUCCESS)
}
