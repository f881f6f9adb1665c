//! Integration tests for hook ordering, short-circuiting, and module loading.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tapgate_hooks::{
    FaucetModule, HookAction, HookCallback, HookError, HookPayload, HookRegistry, ModuleContext,
    ModuleManager,
};
use tapgate_protocol::{AdmissionError, ClientConfig, RewardFactor, SessionId, SessionInput};
use tapgate_session::{Session, SessionConfig, SessionKey, SessionManager};

// =========================================================================
// Mock hooks
// =========================================================================

/// Session key the mock hooks use to pass data down the chain.
struct Marker;

impl SessionKey for Marker {
    const NAME: &'static str = "test.marker";
    type Value = Vec<String>;
}

#[derive(Clone, Copy)]
enum Behavior {
    /// Append the tag to the `Marker` list in the session.
    Append,
    /// Reject the session.
    Reject,
    /// Push a reward factor.
    Factor(f64),
    /// Write a sub-object into the client config.
    Export,
}

/// Records every call in a shared log and then acts out its `Behavior`.
struct MockHook {
    tag: &'static str,
    behavior: Behavior,
    log: Arc<Mutex<Vec<String>>>,
}

#[async_trait]
impl HookCallback for MockHook {
    async fn call(&self, payload: HookPayload<'_>) -> Result<(), HookError> {
        match payload {
            HookPayload::SessionStart { session, .. } => {
                // Record what this hook saw before acting.
                let seen = session.get::<Marker>()?.unwrap_or_default();
                self.log
                    .lock()
                    .unwrap()
                    .push(format!("{}:{}", self.tag, seen.join(",")));
                match self.behavior {
                    Behavior::Append => {
                        let mut next = seen;
                        next.push(self.tag.to_string());
                        session.set::<Marker>(&next)?;
                        Ok(())
                    }
                    Behavior::Reject => Err(AdmissionError::new("MOCK_REJECT", self.tag).into()),
                    _ => Ok(()),
                }
            }
            HookPayload::SessionRewardFactor { factors, .. } => {
                self.log.lock().unwrap().push(self.tag.to_string());
                if let Behavior::Factor(f) = self.behavior {
                    factors.push(RewardFactor {
                        factor: f,
                        module: self.tag.to_string(),
                    });
                }
                Ok(())
            }
            HookPayload::ClientConfig(config) => {
                if let Behavior::Export = self.behavior {
                    config.set_module(self.tag, serde_json::json!({ "enabled": true }));
                }
                Ok(())
            }
            HookPayload::SessionComplete { .. } => {
                self.log.lock().unwrap().push(self.tag.to_string());
                Ok(())
            }
        }
    }
}

// =========================================================================
// Helpers
// =========================================================================

fn new_log() -> Arc<Mutex<Vec<String>>> {
    Arc::new(Mutex::new(Vec::new()))
}

fn hook(tag: &'static str, behavior: Behavior, log: &Arc<Mutex<Vec<String>>>) -> Arc<dyn HookCallback> {
    Arc::new(MockHook {
        tag,
        behavior,
        log: Arc::clone(log),
    })
}

fn session() -> Session {
    Session::new(SessionId::from("s-1"))
}

async fn start(registry: &HookRegistry, session: &mut Session) -> Result<(), HookError> {
    let input = SessionInput::new("0xabc");
    registry
        .dispatch(HookPayload::SessionStart {
            session,
            input: &input,
        })
        .await
}

// =========================================================================
// Ordering
// =========================================================================

#[tokio::test]
async fn test_dispatch_runs_hooks_in_ascending_priority() {
    let log = new_log();
    let registry = HookRegistry::new();
    registry.register("m", HookAction::SessionStart, 5, "five", hook("p5", Behavior::Append, &log)).await;
    registry.register("m", HookAction::SessionStart, 1, "one", hook("p1", Behavior::Append, &log)).await;
    registry.register("m", HookAction::SessionStart, 3, "three", hook("p3", Behavior::Append, &log)).await;

    let mut s = session();
    start(&registry, &mut s).await.unwrap();

    assert_eq!(s.get::<Marker>().unwrap().unwrap(), vec!["p1", "p3", "p5"]);
}

#[tokio::test]
async fn test_dispatch_equal_priority_keeps_registration_order() {
    let log = new_log();
    let registry = HookRegistry::new();
    registry.register("a", HookAction::SessionStart, 2, "first", hook("first", Behavior::Append, &log)).await;
    registry.register("b", HookAction::SessionStart, 1, "early", hook("early", Behavior::Append, &log)).await;
    registry.register("c", HookAction::SessionStart, 2, "second", hook("second", Behavior::Append, &log)).await;

    let infos = registry.hooks(HookAction::SessionStart).await;
    let labels: Vec<_> = infos.iter().map(|h| h.label.as_str()).collect();
    assert_eq!(labels, vec!["early", "first", "second"]);
}

#[tokio::test]
async fn test_dispatch_later_hook_observes_earlier_mutations() {
    let log = new_log();
    let registry = HookRegistry::new();
    registry.register("m", HookAction::SessionStart, 1, "a", hook("a", Behavior::Append, &log)).await;
    registry.register("m", HookAction::SessionStart, 2, "b", hook("b", Behavior::Append, &log)).await;
    registry.register("m", HookAction::SessionStart, 3, "c", hook("c", Behavior::Append, &log)).await;

    let mut s = session();
    start(&registry, &mut s).await.unwrap();

    // Each hook logged the marker list as it found it.
    assert_eq!(*log.lock().unwrap(), vec!["a:", "b:a", "c:a,b"]);
}

#[tokio::test]
async fn test_dispatch_only_runs_hooks_of_the_payload_action() {
    let log = new_log();
    let registry = HookRegistry::new();
    registry.register("m", HookAction::SessionComplete, 1, "done", hook("done", Behavior::Append, &log)).await;

    let mut s = session();
    start(&registry, &mut s).await.unwrap();

    assert!(log.lock().unwrap().is_empty());
}

// =========================================================================
// Short-circuit
// =========================================================================

#[tokio::test]
async fn test_dispatch_rejection_stops_later_hooks_without_rollback() {
    let log = new_log();
    let registry = HookRegistry::new();
    registry.register("m", HookAction::SessionStart, 1, "a", hook("a", Behavior::Append, &log)).await;
    registry.register("gate", HookAction::SessionStart, 2, "gate", hook("gate", Behavior::Reject, &log)).await;
    registry.register("m", HookAction::SessionStart, 3, "c", hook("c", Behavior::Append, &log)).await;

    let mut s = session();
    let err = start(&registry, &mut s).await.unwrap_err();

    let admission = err.as_admission().expect("should be a rejection");
    assert_eq!(admission.code, "MOCK_REJECT");
    // "c" never ran ...
    assert_eq!(*log.lock().unwrap(), vec!["a:", "gate:a"]);
    // ... but "a"'s mutation is still there.
    assert_eq!(s.get::<Marker>().unwrap().unwrap(), vec!["a"]);
}

// =========================================================================
// Accumulator payloads
// =========================================================================

#[tokio::test]
async fn test_dispatch_reward_factor_collects_in_order() {
    let log = new_log();
    let registry = HookRegistry::new();
    registry.register("x", HookAction::SessionRewardFactor, 5, "x", hook("x", Behavior::Factor(2.0), &log)).await;
    registry.register("y", HookAction::SessionRewardFactor, 1, "y", hook("y", Behavior::Factor(0.5), &log)).await;

    let s = session();
    let mut factors = Vec::new();
    registry
        .dispatch(HookPayload::SessionRewardFactor {
            session: &s,
            factors: &mut factors,
        })
        .await
        .unwrap();

    let modules: Vec<_> = factors.iter().map(|f| f.module.as_str()).collect();
    assert_eq!(modules, vec!["y", "x"]);
}

#[tokio::test]
async fn test_dispatch_client_config_merges_module_entries() {
    let log = new_log();
    let registry = HookRegistry::new();
    registry.register("one", HookAction::ClientConfig, 1, "one", hook("one", Behavior::Export, &log)).await;
    registry.register("two", HookAction::ClientConfig, 1, "two", hook("two", Behavior::Export, &log)).await;

    let mut config = ClientConfig::default();
    registry.dispatch(HookPayload::ClientConfig(&mut config)).await.unwrap();

    assert!(config.module("one").is_some());
    assert!(config.module("two").is_some());
}

#[tokio::test]
async fn test_unregister_module_removes_only_its_hooks() {
    let log = new_log();
    let registry = HookRegistry::new();
    registry.register("keep", HookAction::SessionStart, 1, "k", hook("k", Behavior::Append, &log)).await;
    registry.register("drop", HookAction::SessionStart, 1, "d", hook("d", Behavior::Append, &log)).await;
    registry.register("drop", HookAction::SessionComplete, 1, "d2", hook("d2", Behavior::Append, &log)).await;

    let removed = registry.unregister_module("drop").await;

    assert_eq!(removed, 2);
    assert_eq!(registry.hooks(HookAction::SessionStart).await.len(), 1);
    assert!(registry.hooks(HookAction::SessionComplete).await.is_empty());
}

// =========================================================================
// ModuleManager
// =========================================================================

struct TestModule {
    name: &'static str,
    fail_start: bool,
    log: Arc<Mutex<Vec<String>>>,
}

#[async_trait]
impl FaucetModule for TestModule {
    fn name(&self) -> &str {
        self.name
    }

    async fn start(&self, ctx: &ModuleContext) -> Result<(), HookError> {
        ctx.hooks
            .register(self.name, HookAction::SessionStart, 1, "check", hook("check", Behavior::Append, &self.log))
            .await;
        if self.fail_start {
            return Err(HookError::module(self.name, "boom"));
        }
        Ok(())
    }

    async fn stop(&self) -> Result<(), HookError> {
        self.log.lock().unwrap().push(format!("stop:{}", self.name));
        Ok(())
    }
}

fn manager() -> ModuleManager {
    ModuleManager::new(ModuleContext {
        hooks: Arc::new(HookRegistry::new()),
        sessions: SessionManager::shared(SessionConfig::default()),
    })
}

#[tokio::test]
async fn test_load_duplicate_module_rejected() {
    let log = new_log();
    let mut mgr = manager();
    mgr.load(Arc::new(TestModule { name: "ticket", fail_start: false, log: Arc::clone(&log) }))
        .await
        .unwrap();

    let result = mgr
        .load(Arc::new(TestModule { name: "ticket", fail_start: false, log: Arc::clone(&log) }))
        .await;

    assert!(matches!(result, Err(HookError::DuplicateModule(name)) if name == "ticket"));
    assert_eq!(mgr.context().hooks.hooks(HookAction::SessionStart).await.len(), 1);
}

/// A module that reports itself disabled.
struct Switched {
    inner: TestModule,
    enabled: bool,
}

#[async_trait]
impl FaucetModule for Switched {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn enabled(&self) -> bool {
        self.enabled
    }

    async fn start(&self, ctx: &ModuleContext) -> Result<(), HookError> {
        self.inner.start(ctx).await
    }
}

#[tokio::test]
async fn test_load_disabled_module_registers_no_hooks() {
    let log = new_log();
    let mut mgr = manager();

    mgr.load(Arc::new(Switched {
        inner: TestModule { name: "off", fail_start: false, log: Arc::clone(&log) },
        enabled: false,
    }))
    .await
    .unwrap();

    assert!(!mgr.is_loaded("off"));
    assert!(mgr.module_names().is_empty());
    assert!(mgr.context().hooks.hooks(HookAction::SessionStart).await.is_empty());
}

#[tokio::test]
async fn test_load_disabled_module_name_free_for_enabled_one() {
    let log = new_log();
    let mut mgr = manager();
    mgr.load(Arc::new(Switched {
        inner: TestModule { name: "ticket", fail_start: false, log: Arc::clone(&log) },
        enabled: false,
    }))
    .await
    .unwrap();

    mgr.load(Arc::new(TestModule { name: "ticket", fail_start: false, log }))
        .await
        .unwrap();

    assert_eq!(mgr.module_names(), vec!["ticket"]);
    assert_eq!(mgr.context().hooks.hooks(HookAction::SessionStart).await.len(), 1);
}

#[tokio::test]
async fn test_load_failed_start_removes_partial_hooks() {
    let log = new_log();
    let mut mgr = manager();

    let result = mgr
        .load(Arc::new(TestModule { name: "broken", fail_start: true, log }))
        .await;

    assert!(matches!(result, Err(HookError::Module { .. })));
    assert!(!mgr.is_loaded("broken"));
    assert!(mgr.context().hooks.hooks(HookAction::SessionStart).await.is_empty());
}

#[tokio::test]
async fn test_stop_all_stops_in_reverse_order_and_unregisters() {
    let log = new_log();
    let mut mgr = manager();
    for name in ["first", "second"] {
        mgr.load(Arc::new(TestModule { name, fail_start: false, log: Arc::clone(&log) }))
            .await
            .unwrap();
    }
    assert_eq!(mgr.module_names(), vec!["first", "second"]);

    mgr.stop_all().await.unwrap();

    assert_eq!(*log.lock().unwrap(), vec!["stop:second", "stop:first"]);
    assert!(mgr.context().hooks.hooks(HookAction::SessionStart).await.is_empty());
    assert!(mgr.module_names().is_empty());
}
