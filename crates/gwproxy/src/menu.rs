//! Interactive menu
//!
//! ```text
//! Current proxy: 10.0.0.1:10808 (Gateway)
//!   1) Set proxy
//!   2) Unset proxy
//!   0) Exit
//! ```
//!
//! The gateway is resolved again on every pass so the status line and the
//! "default gateway" choice follow network changes. When it cannot be
//! resolved, the user picks an endpoint by hand.

use crate::report;
use gwproxy_core::{
    gateway_endpoint, Decision, EnvironmentMask, GatewaySource, ProxyEndpoint, ProxyReconciler,
    ResolutionError, SurfaceKind,
};
use std::io::{self, BufRead, Write};
use tracing::debug;

pub struct Menu<'a, R, W> {
    reconciler: &'a ProxyReconciler,
    gateway: &'a dyn GatewaySource,
    port: u16,
    input: R,
    output: W,
}

impl<'a, R: BufRead, W: Write> Menu<'a, R, W> {
    pub fn new(
        reconciler: &'a ProxyReconciler,
        gateway: &'a dyn GatewaySource,
        port: u16,
        input: R,
        output: W,
    ) -> Self {
        Self {
            reconciler,
            gateway,
            port,
            input,
            output,
        }
    }

    /// Run until the user exits or input ends.
    pub fn run(&mut self) -> io::Result<()> {
        loop {
            let gateway = gateway_endpoint(self.gateway, self.port);
            self.write_status(&gateway)?;

            writeln!(self.output, "  1) Set proxy")?;
            writeln!(self.output, "  2) Unset proxy")?;
            writeln!(self.output, "  0) Exit")?;

            let Some(choice) = self.prompt("> ")? else {
                break;
            };

            match choice.as_str() {
                "1" => self.set(gateway)?,
                "2" => self.apply(Decision::disable())?,
                "0" | "q" | "exit" => break,
                other => writeln!(self.output, "Unknown choice '{}'", other)?,
            }
        }

        debug!("Menu closed");
        Ok(())
    }

    fn write_status(&mut self, gateway: &Result<ProxyEndpoint, ResolutionError>) -> io::Result<()> {
        let host = gateway.as_ref().ok().map(|ep| ep.host.as_str());
        match self.reconciler.current_state() {
            Ok(state) => writeln!(self.output, "\nCurrent proxy: {}", report::describe(&state, host)),
            Err(e) => writeln!(self.output, "\nCurrent proxy: unknown ({})", e),
        }
    }

    fn set(&mut self, gateway: Result<ProxyEndpoint, ResolutionError>) -> io::Result<()> {
        let localhost = ProxyEndpoint::localhost(self.port);

        match &gateway {
            Ok(endpoint) => writeln!(self.output, "  1) Default gateway ({})", endpoint)?,
            Err(e) => writeln!(self.output, "  1) Default gateway (unavailable: {})", e)?,
        }
        writeln!(self.output, "  2) Localhost ({})", localhost)?;
        writeln!(self.output, "  3) Custom")?;

        let Some(choice) = self.prompt("Endpoint: ")? else {
            return Ok(());
        };

        let endpoint = match choice.as_str() {
            "1" => match gateway {
                Ok(endpoint) => endpoint,
                Err(_) => {
                    writeln!(self.output, "Default gateway unavailable, choose 2 or 3")?;
                    return Ok(());
                }
            },
            "2" => localhost,
            "3" => {
                let Some(text) = self.prompt("Address (host:port): ")? else {
                    return Ok(());
                };
                match text.parse::<ProxyEndpoint>() {
                    Ok(endpoint) => endpoint,
                    Err(e) => {
                        writeln!(self.output, "Invalid address: {}", e)?;
                        return Ok(());
                    }
                }
            }
            other => {
                writeln!(self.output, "Unknown choice '{}'", other)?;
                return Ok(());
            }
        };

        self.apply(Decision::enable(endpoint))
    }

    fn apply(&mut self, decision: Decision) -> io::Result<()> {
        let Some(mask) = self.select_surfaces()? else {
            return Ok(());
        };

        let result = self.reconciler.execute(decision, mask);
        report::write_result(&mut self.output, &result)?;
        writeln!(self.output, "{}", report::RESTART_HINT)
    }

    /// Ask until at least one surface is selected; `None` on end of input.
    fn select_surfaces(&mut self) -> io::Result<Option<EnvironmentMask>> {
        let choices: Vec<String> = SurfaceKind::ALL
            .iter()
            .map(|kind| format!("{} {}", kind.digit(), kind.name()))
            .collect();

        loop {
            let question = format!("Apply to (A = all; {}): ", choices.join(", "));
            let Some(text) = self.prompt(&question)? else {
                return Ok(None);
            };

            let mask = EnvironmentMask::parse(&text);
            if !mask.is_empty() {
                return Ok(Some(mask));
            }
            writeln!(self.output, "Nothing selected, try again")?;
        }
    }

    /// Print `question` and read one trimmed line; `None` on end of input.
    fn prompt(&mut self, question: &str) -> io::Result<Option<String>> {
        write!(self.output, "{}", question)?;
        self.output.flush()?;

        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim().to_string()))
    }
}
