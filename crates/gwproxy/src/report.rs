//! User-facing output

use gwproxy_core::{EndpointKind, ProxyState, ReconciliationResult, SurfaceError, SurfaceKind};
use std::io::{self, Write};

pub const RESTART_HINT: &str =
    "You might need to restart applications or refresh network settings for changes to take effect";

/// Short description of a state, e.g. `10.0.0.1:10808 (Gateway)` or `off`
pub fn describe(state: &ProxyState, gateway: Option<&str>) -> String {
    match state.active_endpoint() {
        Some(endpoint) => format!("{} ({})", endpoint, EndpointKind::classify(endpoint, gateway)),
        None => "off".to_string(),
    }
}

/// Headline, then the surfaces that succeeded, then each failure with its reason.
pub fn write_result(out: &mut impl Write, result: &ReconciliationResult) -> io::Result<()> {
    let succeeded: Vec<&str> = result.succeeded().map(|kind| kind.name()).collect();

    if succeeded.is_empty() {
        writeln!(out, "Nothing was changed")?;
    } else {
        writeln!(out, "{}", result.headline())?;
        writeln!(out, "Updated: {}", succeeded.join(", "))?;
    }

    if !result.is_success() {
        writeln!(out, "Failed:")?;
        for (kind, reason) in result.failed() {
            writeln!(out, "  {}: {}", kind, reason)?;
        }
    }
    Ok(())
}

/// One line per surface
pub fn write_status(
    out: &mut impl Write,
    observations: &[(SurfaceKind, Result<ProxyState, SurfaceError>)],
    gateway: Option<&str>,
) -> io::Result<()> {
    for (kind, state) in observations {
        let text = match state {
            Ok(state) => describe(state, gateway),
            Err(e) => format!("error: {}", e),
        };
        writeln!(out, "{:<16} {}", kind.name(), text)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use gwproxy_core::{Action, ProxyEndpoint, SurfaceOutcome};
    use std::collections::BTreeMap;

    fn render(result: &ReconciliationResult) -> String {
        let mut out = Vec::new();
        write_result(&mut out, result).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_describe() {
        let state = ProxyState::enabled(ProxyEndpoint::new("10.0.0.1", 10808));
        assert_eq!(describe(&state, Some("10.0.0.1")), "10.0.0.1:10808 (Gateway)");
        assert_eq!(describe(&state, None), "10.0.0.1:10808 (Custom)");
        assert_eq!(describe(&ProxyState::disabled(), None), "off");
    }

    #[test]
    fn test_result_with_failure() {
        let outcomes = BTreeMap::from([
            (SurfaceKind::System, SurfaceOutcome::Ok),
            (SurfaceKind::Editor, SurfaceOutcome::Error("permission denied".to_string())),
            (SurfaceKind::PackageManager, SurfaceOutcome::Ok),
        ]);
        let result = ReconciliationResult {
            server: Some(ProxyEndpoint::new("10.0.0.1", 10808)),
            action: Action::Enable,
            outcomes,
        };

        assert_eq!(
            render(&result),
            "Proxy set to 10.0.0.1:10808\n\
             Updated: System, Package manager\n\
             Failed:\n  Editor: permission denied\n"
        );
    }

    #[test]
    fn test_result_all_failed() {
        let result = ReconciliationResult {
            server: None,
            action: Action::Disable,
            outcomes: BTreeMap::from([(SurfaceKind::System, SurfaceOutcome::Error("boom".to_string()))]),
        };

        assert_eq!(render(&result), "Nothing was changed\nFailed:\n  System: boom\n");
    }

    #[test]
    fn test_status_lines() {
        let observations = vec![
            (SurfaceKind::System, Ok(ProxyState::enabled(ProxyEndpoint::localhost(7890)))),
            (SurfaceKind::Editor, Ok(ProxyState::disabled())),
        ];
        let mut out = Vec::new();
        write_status(&mut out, &observations, None).unwrap();

        assert_eq!(
            String::from_utf8(out).unwrap(),
            "System           127.0.0.1:7890 (Localhost)\nEditor           off\n"
        );
    }
}
