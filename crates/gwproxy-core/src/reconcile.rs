//! Proxy Reconciler
//!
//! Decides what to do from the observed OS proxy state and the user's intent,
//! then fans the decision out to every selected surface.
//!
//! # Toggle decision
//!
//! | OS store | Endpoint vs. gateway | Action |
//! |----------|----------------------|--------|
//! | enabled | same | Disable |
//! | enabled | different | Update to gateway |
//! | disabled | - | Enable at gateway |
//!
//! # Execution
//!
//! Surfaces are applied in a fixed order (System, Shell profile, Editor,
//! Package manager). A failing surface is recorded and the rest still run.

use crate::config::Config;
use crate::endpoint::{ProxyEndpoint, ProxyState};
use crate::gateway::ResolutionError;
use crate::mask::{EnvironmentMask, SurfaceKind};
use crate::store::ProxyStore;
use crate::surface::{
    EditorSurface, PackageManagerSurface, ShellProfileSurface, Surface, SurfaceError,
    SystemSurface,
};
use std::collections::BTreeMap;
use std::fmt;
use tracing::{debug, info, warn};

/// What the user asked for
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intent {
    /// Flip the proxy based on the current state and the gateway
    Toggle,
    /// Switch the proxy on at a chosen endpoint
    Enable(ProxyEndpoint),
    /// Switch the proxy off
    Disable,
}

/// What will be done
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Enable,
    Disable,
    Update,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Action::Enable => "Enable",
            Action::Disable => "Disable",
            Action::Update => "Update",
        })
    }
}

/// Concrete action plus the endpoint it applies (none when disabling)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decision {
    pub action: Action,
    pub server: Option<ProxyEndpoint>,
}

impl Decision {
    /// Switch the proxy on at `endpoint`
    pub fn enable(endpoint: ProxyEndpoint) -> Self {
        Self {
            action: Action::Enable,
            server: Some(endpoint),
        }
    }

    /// Switch the proxy off
    pub fn disable() -> Self {
        Self {
            action: Action::Disable,
            server: None,
        }
    }

    /// Decide from the current OS state, the gateway candidate and the intent.
    ///
    /// Only `Intent::Toggle` consults the candidate; a resolution error is
    /// fatal there and ignored otherwise.
    pub fn new(
        current: &ProxyState,
        candidate: Result<ProxyEndpoint, ResolutionError>,
        intent: Intent,
    ) -> Result<Self, ReconcileError> {
        let decision = match intent {
            Intent::Enable(endpoint) => Self::enable(endpoint),
            Intent::Disable => Self::disable(),
            Intent::Toggle => {
                let candidate = candidate?;
                match current.active_endpoint() {
                    Some(active) if *active == candidate => Self::disable(),
                    Some(_) => Self {
                        action: Action::Update,
                        server: Some(candidate),
                    },
                    None => Self::enable(candidate),
                }
            }
        };

        debug!("Decision: {:?}", decision);
        Ok(decision)
    }
}

/// Outcome of applying to one surface
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SurfaceOutcome {
    Ok,
    Error(String),
}

impl SurfaceOutcome {
    pub fn is_ok(&self) -> bool {
        matches!(self, SurfaceOutcome::Ok)
    }
}

/// Result of one reconcile run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconciliationResult {
    /// Endpoint applied (none when disabling)
    pub server: Option<ProxyEndpoint>,
    /// Action taken
    pub action: Action,
    /// Per-surface outcome, for selected surfaces only
    pub outcomes: BTreeMap<SurfaceKind, SurfaceOutcome>,
}

impl ReconciliationResult {
    /// Surfaces that were updated
    pub fn succeeded(&self) -> impl Iterator<Item = SurfaceKind> + '_ {
        self.outcomes
            .iter()
            .filter(|(_, outcome)| outcome.is_ok())
            .map(|(kind, _)| *kind)
    }

    /// Surfaces that failed, with the reason
    pub fn failed(&self) -> impl Iterator<Item = (SurfaceKind, &str)> + '_ {
        self.outcomes.iter().filter_map(|(kind, outcome)| match outcome {
            SurfaceOutcome::Error(message) => Some((*kind, message.as_str())),
            SurfaceOutcome::Ok => None,
        })
    }

    /// Did every selected surface succeed?
    pub fn is_success(&self) -> bool {
        self.outcomes.values().all(SurfaceOutcome::is_ok)
    }

    /// One-line summary, e.g. "Proxy set to 10.0.0.1:10808"
    pub fn headline(&self) -> String {
        match (self.action, &self.server) {
            (Action::Disable, _) | (_, None) => "Proxy settings cleared".to_string(),
            (Action::Enable, Some(server)) => format!("Proxy set to {}", server),
            (Action::Update, Some(server)) => format!("Proxy updated to {}", server),
        }
    }
}

/// Applies decisions across surfaces
pub struct ProxyReconciler {
    surfaces: Vec<Box<dyn Surface>>,
}

impl ProxyReconciler {
    /// Create from explicit surfaces
    pub fn new(surfaces: Vec<Box<dyn Surface>>) -> Self {
        Self { surfaces }
    }

    /// Create the four standard surfaces from configuration
    pub fn from_config(config: &Config, store: Box<dyn ProxyStore>) -> Self {
        Self::new(vec![
            Box::new(SystemSurface::new(store)),
            Box::new(ShellProfileSurface::new(
                &config.shell.path,
                config.shell.flavor,
                &config.shell.sentinel,
            )),
            Box::new(EditorSurface::new(&config.editor.path, &config.editor.key)),
            Box::new(PackageManagerSurface::new(
                &config.package_manager.path,
                &config.package_manager.prefix,
            )),
        ])
    }

    fn surface(&self, kind: SurfaceKind) -> Option<&dyn Surface> {
        self.surfaces
            .iter()
            .find(|s| s.kind() == kind)
            .map(|s| s.as_ref())
    }

    /// Current OS proxy state, which drives toggle decisions
    pub fn current_state(&self) -> Result<ProxyState, SurfaceError> {
        match self.surface(SurfaceKind::System) {
            Some(system) => system.observe(),
            None => Ok(ProxyState::disabled()),
        }
    }

    /// State that drives a toggle over `mask`.
    ///
    /// The OS store is authoritative. When it cannot be read, the first
    /// selected file surface that can be observed stands in, else disabled.
    pub fn toggle_state(&self, mask: EnvironmentMask) -> ProxyState {
        match self.current_state() {
            Ok(state) => return state,
            Err(e) => warn!("Cannot read OS proxy state: {}", e),
        }

        mask.surfaces()
            .filter(|kind| *kind != SurfaceKind::System)
            .filter_map(|kind| self.surface(kind))
            .find_map(|surface| surface.observe().ok())
            .unwrap_or_default()
    }

    /// Observe every selected surface
    pub fn observe(&self, mask: EnvironmentMask) -> Vec<(SurfaceKind, Result<ProxyState, SurfaceError>)> {
        mask.surfaces()
            .filter_map(|kind| self.surface(kind).map(|s| (kind, s.observe())))
            .collect()
    }

    /// Decide and apply in one step.
    pub fn reconcile(
        &self,
        current: &ProxyState,
        candidate: Result<ProxyEndpoint, ResolutionError>,
        intent: Intent,
        mask: EnvironmentMask,
    ) -> Result<ReconciliationResult, ReconcileError> {
        if mask.is_empty() {
            return Err(ReconcileError::NothingSelected);
        }

        let decision = Decision::new(current, candidate, intent)?;
        Ok(self.execute(decision, mask))
    }

    /// Apply a decision to every selected surface, collecting outcomes.
    pub fn execute(&self, decision: Decision, mask: EnvironmentMask) -> ReconciliationResult {
        info!(
            "{} proxy{} on {:?}",
            decision.action,
            decision
                .server
                .as_ref()
                .map(|s| format!(" at {}", s))
                .unwrap_or_default(),
            mask
        );

        let mut outcomes = BTreeMap::new();

        for kind in mask.surfaces() {
            let Some(surface) = self.surface(kind) else {
                warn!("{} surface not configured, skipping", kind);
                continue;
            };

            let outcome = match surface.apply(decision.server.as_ref()) {
                Ok(()) => {
                    debug!("{} updated", kind);
                    SurfaceOutcome::Ok
                }
                Err(e) => {
                    warn!("{} failed: {}", kind, e);
                    SurfaceOutcome::Error(e.to_string())
                }
            };
            outcomes.insert(kind, outcome);
        }

        ReconciliationResult {
            server: decision.server,
            action: decision.action,
            outcomes,
        }
    }
}

/// Reconcile errors
#[derive(Debug, thiserror::Error)]
pub enum ReconcileError {
    #[error("Cannot toggle: {0}")]
    Resolution(#[from] ResolutionError),

    #[error("No environment selected")]
    NothingSelected,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryProxyStore;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn ep(host: &str) -> ProxyEndpoint {
        ProxyEndpoint::new(host, 10808)
    }

    /// Surface that records calls and optionally fails
    struct Recorder {
        kind: SurfaceKind,
        fail: bool,
        calls: Rc<RefCell<Vec<(SurfaceKind, Option<ProxyEndpoint>)>>>,
    }

    impl Surface for Recorder {
        fn kind(&self) -> SurfaceKind {
            self.kind
        }

        fn apply(&self, endpoint: Option<&ProxyEndpoint>) -> Result<(), SurfaceError> {
            self.calls.borrow_mut().push((self.kind, endpoint.cloned()));
            if self.fail {
                let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
                return Err(SurfaceError::Store(crate::store::StoreError::Open(io)));
            }
            Ok(())
        }

        fn observe(&self) -> Result<ProxyState, SurfaceError> {
            Ok(ProxyState::disabled())
        }
    }

    type Calls = Rc<RefCell<Vec<(SurfaceKind, Option<ProxyEndpoint>)>>>;

    fn recorders(failing: Option<SurfaceKind>) -> (ProxyReconciler, Calls) {
        let calls: Calls = Rc::default();
        let surfaces = SurfaceKind::ALL
            .into_iter()
            .map(|kind| {
                Box::new(Recorder {
                    kind,
                    fail: Some(kind) == failing,
                    calls: calls.clone(),
                }) as Box<dyn Surface>
            })
            .collect();
        (ProxyReconciler::new(surfaces), calls)
    }

    #[test]
    fn test_toggle_same_endpoint_disables() {
        let current = ProxyState::enabled(ep("10.0.0.1"));
        let decision = Decision::new(&current, Ok(ep("10.0.0.1")), Intent::Toggle).unwrap();

        assert_eq!(decision.action, Action::Disable);
        assert_eq!(decision.server, None);
    }

    #[test]
    fn test_toggle_new_gateway_updates() {
        let current = ProxyState::enabled(ep("10.0.0.1"));
        let decision = Decision::new(&current, Ok(ep("10.0.0.2")), Intent::Toggle).unwrap();

        assert_eq!(decision.action, Action::Update);
        assert_eq!(decision.server, Some(ep("10.0.0.2")));
    }

    #[test]
    fn test_toggle_disabled_enables() {
        let current = ProxyState {
            endpoint: Some(ep("10.0.0.1")),
            enabled: false,
        };
        let decision = Decision::new(&current, Ok(ep("10.0.0.1")), Intent::Toggle).unwrap();

        assert_eq!(decision.action, Action::Enable);
        assert_eq!(decision.server, Some(ep("10.0.0.1")));
    }

    #[test]
    fn test_toggle_without_gateway_fails() {
        let err = Decision::new(&ProxyState::disabled(), Err(ResolutionError::NotFound), Intent::Toggle)
            .unwrap_err();
        assert!(matches!(err, ReconcileError::Resolution(ResolutionError::NotFound)));
    }

    #[test]
    fn test_explicit_intent_ignores_gateway() {
        let current = ProxyState::enabled(ep("10.0.0.1"));

        let decision = Decision::new(
            &current,
            Err(ResolutionError::NotFound),
            Intent::Enable(ProxyEndpoint::localhost(10808)),
        )
        .unwrap();
        assert_eq!(decision.action, Action::Enable);
        assert_eq!(decision.server, Some(ProxyEndpoint::localhost(10808)));

        let decision = Decision::new(&current, Err(ResolutionError::NotFound), Intent::Disable).unwrap();
        assert_eq!(decision.action, Action::Disable);
    }

    #[test]
    fn test_partial_failure_continues() {
        let (reconciler, calls) = recorders(Some(SurfaceKind::ShellProfile));

        let result = reconciler
            .reconcile(
                &ProxyState::disabled(),
                Ok(ep("10.0.0.1")),
                Intent::Toggle,
                EnvironmentMask::all(),
            )
            .unwrap();

        assert_eq!(calls.borrow().len(), 4);
        assert!(!result.is_success());
        assert_eq!(
            result.succeeded().collect::<Vec<_>>(),
            vec![SurfaceKind::System, SurfaceKind::Editor, SurfaceKind::PackageManager]
        );

        let failed: Vec<_> = result.failed().collect();
        assert_eq!(failed.len(), 1);
        assert_eq!(failed[0].0, SurfaceKind::ShellProfile);
        assert!(failed[0].1.contains("denied"));
    }

    #[test]
    fn test_mask_limits_surfaces() {
        let (reconciler, calls) = recorders(None);

        let result = reconciler
            .reconcile(
                &ProxyState::disabled(),
                Err(ResolutionError::NotFound),
                Intent::Disable,
                EnvironmentMask::parse("13"),
            )
            .unwrap();

        assert_eq!(
            calls.borrow().as_slice(),
            &[(SurfaceKind::System, None), (SurfaceKind::Editor, None)]
        );
        assert_eq!(result.outcomes.len(), 2);
        assert!(result.is_success());
    }

    #[test]
    fn test_empty_mask_rejected() {
        let (reconciler, calls) = recorders(None);

        let err = reconciler
            .reconcile(
                &ProxyState::disabled(),
                Ok(ep("10.0.0.1")),
                Intent::Toggle,
                EnvironmentMask::empty(),
            )
            .unwrap_err();

        assert!(matches!(err, ReconcileError::NothingSelected));
        assert!(calls.borrow().is_empty());
    }

    #[test]
    fn test_current_state_from_system_store() {
        let store = MemoryProxyStore::new(crate::store::StoreRecord::new("10.0.0.1:10808", true));
        let reconciler = ProxyReconciler::new(vec![Box::new(SystemSurface::new(Box::new(store)))]);

        assert_eq!(reconciler.current_state().unwrap(), ProxyState::enabled(ep("10.0.0.1")));
    }

    struct UnreadableStore;

    impl ProxyStore for UnreadableStore {
        fn name(&self) -> &'static str {
            "unreadable"
        }

        fn get(&self) -> Result<crate::store::StoreRecord, crate::store::StoreError> {
            Err(crate::command::CommandError::Spawn {
                program: "gsettings".to_string(),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "not found"),
            }
            .into())
        }

        fn set(&self, _server: &str, _enabled: bool) -> Result<(), crate::store::StoreError> {
            self.get().map(|_| ())
        }
    }

    #[test]
    fn test_toggle_state_without_os_store() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join(".bashrc");
        let shell = ShellProfileSurface::new(&path, crate::surface::ShellFlavor::Posix, "# Proxy Setting");
        shell.apply(Some(&ep("10.0.0.1"))).unwrap();

        let reconciler = ProxyReconciler::new(vec![
            Box::new(SystemSurface::new(Box::new(UnreadableStore))),
            Box::new(shell),
        ]);

        assert!(reconciler.current_state().is_err());
        assert_eq!(
            reconciler.toggle_state(EnvironmentMask::SHELL_PROFILE),
            ProxyState::enabled(ep("10.0.0.1"))
        );
        assert_eq!(reconciler.toggle_state(EnvironmentMask::SYSTEM), ProxyState::disabled());
    }

    #[test]
    fn test_toggle_with_unreadable_os_store() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join(".bashrc");
        let reconciler = ProxyReconciler::new(vec![
            Box::new(SystemSurface::new(Box::new(UnreadableStore))),
            Box::new(ShellProfileSurface::new(
                &path,
                crate::surface::ShellFlavor::Posix,
                "# Proxy Setting",
            )),
        ]);

        let mask = EnvironmentMask::SYSTEM | EnvironmentMask::SHELL_PROFILE;
        let current = reconciler.toggle_state(mask);
        let result = reconciler
            .reconcile(&current, Ok(ep("10.0.0.1")), Intent::Toggle, mask)
            .unwrap();

        assert_eq!(result.action, Action::Enable);
        assert_eq!(result.succeeded().collect::<Vec<_>>(), vec![SurfaceKind::ShellProfile]);
        assert_eq!(result.failed().map(|(kind, _)| kind).collect::<Vec<_>>(), vec![SurfaceKind::System]);
        assert!(std::fs::read_to_string(&path).unwrap().contains("http://10.0.0.1:10808"));
    }

    #[test]
    fn test_headline() {
        let result = ReconciliationResult {
            server: Some(ep("10.0.0.2")),
            action: Action::Update,
            outcomes: BTreeMap::new(),
        };
        assert_eq!(result.headline(), "Proxy updated to 10.0.0.2:10808");

        let result = ReconciliationResult {
            server: None,
            action: Action::Disable,
            outcomes: BTreeMap::new(),
        };
        assert_eq!(result.headline(), "Proxy settings cleared");
    }
}
