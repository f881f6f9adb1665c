//! Integration tests for the ticket module's hooks.
//!
//! The module is started through a real `ModuleManager`, and the hooks are
//! driven through the `HookRegistry` exactly as the lifecycle controller
//! drives them.

mod common;

use std::sync::Arc;

use chrono::Utc;
use common::{config, identity, token_for, BrokenStore, Oracle};
use tapgate_hooks::{HookAction, HookError, HookPayload, ModuleContext, ModuleManager};
use tapgate_protocol::{ClientConfig, SessionId, SessionInput};
use tapgate_session::{
    DropAmount, Session, SessionConfig, SessionManager, SharedSessions, SkipModules,
};
use tapgate_ticket::{
    message_hash, GrantConfig, MemoryTicketStore, TicketAuth, TicketConfig, TicketFactor,
    TicketModule, TicketSessionRecord, TicketSessionStore,
};

// =========================================================================
// Harness
// =========================================================================

struct Harness {
    manager: ModuleManager,
    sessions: SharedSessions,
    store: MemoryTicketStore,
}

impl Harness {
    async fn start(config: TicketConfig) -> Self {
        let store = MemoryTicketStore::new();
        let sessions = SessionManager::shared(SessionConfig::default());
        let mut manager = ModuleManager::new(ModuleContext {
            hooks: Arc::new(tapgate_hooks::HookRegistry::new()),
            sessions: sessions.clone(),
        });
        let module =
            TicketModule::new(config, Arc::new(store.clone()), Arc::new(Oracle::Accept)).unwrap();
        manager.load(Arc::new(module)).await.unwrap();
        Self {
            manager,
            sessions,
            store,
        }
    }

    async fn session_start(&self, session: &mut Session, input: &SessionInput) -> Result<(), HookError> {
        self.manager
            .context()
            .hooks
            .dispatch(HookPayload::SessionStart { session, input })
            .await
    }

    async fn start_with_token(&self, id: &str, attendee: &str) -> (Session, Result<(), HookError>) {
        let mut session = Session::new(SessionId::from(id));
        let input = SessionInput::new("0xabc").with_field("ticketToken", token_for(attendee));
        let result = self.session_start(&mut session, &input).await;
        (session, result)
    }

    /// Puts a running session of `attendee` into the active registry.
    async fn add_active(&self, id: &str, attendee: &str) {
        let mut session = Session::new(SessionId::from(id));
        session.set::<TicketAuth>(&identity(attendee)).unwrap();
        self.sessions.lock().await.insert(session).unwrap();
    }

    async fn add_history(&self, attendee: &str, amounts: &[&str]) {
        for (i, amount) in amounts.iter().enumerate() {
            self.store
                .insert(TicketSessionRecord {
                    session_id: format!("past-{i}"),
                    attendee_id: attendee.into(),
                    ticket_id: "t".into(),
                    event_id: "e".into(),
                    product_id: "p".into(),
                    timestamp: Utc::now().timestamp() - 60,
                    drop_amount: (*amount).into(),
                })
                .await
                .unwrap();
        }
    }
}

/// Loads a ticket module backed by `store` into a fresh manager.
async fn manager_with(config: TicketConfig, store: Arc<dyn TicketSessionStore>) -> ModuleManager {
    let mut manager = ModuleManager::new(ModuleContext {
        hooks: Arc::new(tapgate_hooks::HookRegistry::new()),
        sessions: SessionManager::shared(SessionConfig::default()),
    });
    let module = TicketModule::new(config, store, Arc::new(Oracle::Accept)).unwrap();
    manager.load(Arc::new(module)).await.unwrap();
    manager
}

fn rejection_code(result: &Result<(), HookError>) -> Option<&str> {
    result
        .as_ref()
        .err()
        .and_then(HookError::as_admission)
        .map(|e| e.code.as_str())
}

fn count_grant(limit: u32, required: bool) -> GrantConfig {
    GrantConfig {
        duration: 86_400,
        limit_count: limit,
        required,
        reward_factor: Some(2.0),
        ..GrantConfig::default()
    }
}

// =========================================================================
// Registration & client config
// =========================================================================

#[tokio::test]
async fn test_start_registers_hooks_with_priorities() {
    let h = Harness::start(config()).await;
    let hooks = &h.manager.context().hooks;

    let start = hooks.hooks(HookAction::SessionStart).await;
    assert_eq!(start.len(), 1);
    assert_eq!(start[0].module, "ticket");
    assert_eq!(start[0].priority, 2);
    assert_eq!(hooks.hooks(HookAction::ClientConfig).await[0].priority, 1);
    assert_eq!(hooks.hooks(HookAction::SessionComplete).await[0].priority, 5);
    assert_eq!(hooks.hooks(HookAction::SessionRewardFactor).await[0].priority, 5);
}

#[tokio::test]
async fn test_client_config_exports_module_entry() {
    let mut cfg = config();
    cfg.event.event_ids = vec!["event-1".into()];
    let h = Harness::start(cfg).await;

    let mut client = ClientConfig::default();
    h.manager
        .context()
        .hooks
        .dispatch(HookPayload::ClientConfig(&mut client))
        .await
        .unwrap();

    let entry = client.module("ticket").expect("ticket entry");
    assert_eq!(entry["url"], "https://zupass.org");
    assert_eq!(entry["api"], "https://api.zupass.org");
    assert_eq!(entry["event"]["eventIds"][0], "event-1");
    assert_eq!(entry["watermark"], message_hash(common::WATERMARK).to_string());
    assert_eq!(entry["nullifier"], message_hash(common::NULLIFIER).to_string());
    assert!(entry.get("redirectUrl").is_none());
}

// =========================================================================
// Session start: token handling
// =========================================================================

#[tokio::test]
async fn test_session_start_without_token_passes_when_login_optional() {
    let h = Harness::start(config()).await;
    let mut session = Session::new(SessionId::from("s1"));

    h.session_start(&mut session, &SessionInput::new("0xabc")).await.unwrap();

    assert!(!session.contains::<TicketAuth>());
}

#[tokio::test]
async fn test_session_start_without_token_rejected_when_login_required() {
    let mut cfg = config();
    cfg.require_login = true;
    let h = Harness::start(cfg).await;
    let mut session = Session::new(SessionId::from("s1"));

    let result = h.session_start(&mut session, &SessionInput::new("0xabc")).await;

    assert_eq!(rejection_code(&result), Some("TICKET_REQUIRED"));
}

#[tokio::test]
async fn test_session_start_invalid_token_rejected() {
    let h = Harness::start(config()).await;
    let mut session = Session::new(SessionId::from("s1"));
    let input = SessionInput::new("0xabc").with_field("ticketToken", "forged.00");

    let result = h.session_start(&mut session, &input).await;

    let err = result.as_ref().unwrap_err().as_admission().unwrap();
    assert_eq!(err.code, "TICKET_TOKEN");
    assert_eq!(err.message, "Invalid ticket login token");
}

#[tokio::test]
async fn test_session_start_valid_token_stores_identity() {
    let h = Harness::start(config()).await;

    let (session, result) = h.start_with_token("s1", "alice").await;

    result.unwrap();
    let info = session.get::<TicketAuth>().unwrap().unwrap();
    assert_eq!(info.attendee_id, "alice");
    assert_eq!(common::codec().parse(&info.token).unwrap().attendee_id, "alice");
}

#[tokio::test]
async fn test_session_start_skipped_module_does_nothing() {
    let mut cfg = config();
    cfg.require_login = true;
    let h = Harness::start(cfg).await;
    let mut session = Session::new(SessionId::from("s1"));
    session.set::<SkipModules>(&vec!["ticket".to_string()]).unwrap();

    h.session_start(&mut session, &SessionInput::new("0xabc")).await.unwrap();

    assert!(!session.contains::<TicketAuth>());
}

#[tokio::test]
async fn test_session_start_identity_is_write_once() {
    let h = Harness::start(config()).await;
    let (mut session, result) = h.start_with_token("s1", "alice").await;
    result.unwrap();

    let input = SessionInput::new("0xabc").with_field("ticketToken", token_for("bob"));
    let second = h.session_start(&mut session, &input).await;

    assert!(matches!(second, Err(HookError::Session(_))));
    assert_eq!(session.get::<TicketAuth>().unwrap().unwrap().attendee_id, "alice");
}

// =========================================================================
// Concurrency
// =========================================================================

#[tokio::test]
async fn test_concurrency_limit_one_rejects_second_session() {
    let mut cfg = config();
    cfg.concurrency_limit = 1;
    let h = Harness::start(cfg).await;
    h.add_active("running", "alice").await;

    let (_, result) = h.start_with_token("s2", "alice").await;

    let err = result.as_ref().unwrap_err().as_admission().unwrap();
    assert_eq!(err.code, "TICKET_CONCURRENCY_LIMIT");
    assert_eq!(err.message, "Only 1 concurrent sessions allowed per ticket holder");
}

#[tokio::test]
async fn test_concurrency_limit_zero_never_rejects() {
    let h = Harness::start(config()).await;
    for i in 0..5 {
        h.add_active(&format!("running-{i}"), "alice").await;
    }

    let (_, result) = h.start_with_token("s2", "alice").await;

    result.unwrap();
}

#[tokio::test]
async fn test_concurrency_counts_only_same_attendee() {
    let mut cfg = config();
    cfg.concurrency_limit = 1;
    let h = Harness::start(cfg).await;
    h.add_active("running", "bob").await;

    let (_, result) = h.start_with_token("s2", "alice").await;

    result.unwrap();
}

// =========================================================================
// Grants
// =========================================================================

#[tokio::test]
async fn test_required_count_grant_exhausted_rejects() {
    let mut cfg = config();
    cfg.grants = vec![count_grant(2, true)];
    let h = Harness::start(cfg).await;
    h.add_history("alice", &["1", "1", "1"]).await;

    let (session, result) = h.start_with_token("s1", "alice").await;

    let err = result.as_ref().unwrap_err().as_admission().unwrap();
    assert_eq!(err.code, "TICKET_LIMIT");
    assert_eq!(err.message, "You have already created 3 sessions in the last 1d");
    assert!(!session.contains::<TicketAuth>());
}

#[tokio::test]
async fn test_optional_count_grant_exhausted_skips_perks() {
    let mut cfg = config();
    cfg.grants = vec![count_grant(2, false)];
    let h = Harness::start(cfg).await;
    h.add_history("alice", &["1", "1", "1"]).await;

    let (session, result) = h.start_with_token("s1", "alice").await;

    result.unwrap();
    assert!(session.contains::<TicketAuth>());
    assert!(!session.contains::<TicketFactor>());
}

#[tokio::test]
async fn test_grant_with_room_left_applies_factor() {
    let mut cfg = config();
    cfg.grants = vec![count_grant(2, true)];
    let h = Harness::start(cfg).await;
    h.add_history("alice", &["1"]).await;

    let (session, result) = h.start_with_token("s1", "alice").await;

    result.unwrap();
    assert_eq!(session.get::<TicketFactor>().unwrap(), Some(2.0));
}

#[tokio::test]
async fn test_required_amount_grant_meets_limit_rejects() {
    let mut cfg = config();
    cfg.grants = vec![GrantConfig {
        duration: 3_600,
        limit_amount: "2000000000000000000".parse().unwrap(),
        required: true,
        ..GrantConfig::default()
    }];
    let h = Harness::start(cfg).await;
    h.add_history("alice", &["1000000000000000000", "1000000000000000000"])
        .await;

    let (_, result) = h.start_with_token("s1", "alice").await;

    let err = result.as_ref().unwrap_err().as_admission().unwrap();
    assert_eq!(err.code, "TICKET_LIMIT");
    assert_eq!(err.message, "You have already requested 2 ETH in the last 1h");
}

#[tokio::test]
async fn test_skip_modules_union_is_deduplicated() {
    let mut cfg = config();
    cfg.grants = vec![
        GrantConfig {
            skip_modules: Some(vec!["captcha".into()]),
            ..GrantConfig::default()
        },
        GrantConfig {
            skip_modules: Some(vec!["captcha".into(), "pow".into(), String::new()]),
            ..GrantConfig::default()
        },
    ];
    let h = Harness::start(cfg).await;
    let mut session = Session::new(SessionId::from("s1"));
    session.set::<SkipModules>(&vec!["captcha".to_string()]).unwrap();
    let input = SessionInput::new("0xabc").with_field("ticketToken", token_for("alice"));

    h.session_start(&mut session, &input).await.unwrap();

    assert_eq!(
        session.get::<SkipModules>().unwrap().unwrap(),
        vec!["captcha".to_string(), "pow".to_string()]
    );
}

// =========================================================================
// Completion & reward factor
// =========================================================================

#[tokio::test]
async fn test_session_complete_persists_record_with_drop_amount() {
    let h = Harness::start(config()).await;
    let (mut session, result) = h.start_with_token("s1", "alice").await;
    result.unwrap();
    session.set::<DropAmount>(&"500".to_string()).unwrap();

    h.manager
        .context()
        .hooks
        .dispatch(HookPayload::SessionComplete { session: &session })
        .await
        .unwrap();

    let records = h.store.records().await;
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].session_id, "s1");
    assert_eq!(records[0].attendee_id, "alice");
    assert_eq!(records[0].drop_amount, "500");
}

#[tokio::test]
async fn test_session_complete_without_identity_writes_nothing() {
    let h = Harness::start(config()).await;
    let session = Session::new(SessionId::from("anon"));

    h.manager
        .context()
        .hooks
        .dispatch(HookPayload::SessionComplete { session: &session })
        .await
        .unwrap();

    assert!(h.store.records().await.is_empty());
}

#[tokio::test]
async fn test_reward_factor_hook_contributes_grant_factor() {
    let mut cfg = config();
    cfg.grants = vec![count_grant(5, true)];
    let h = Harness::start(cfg).await;
    let (session, result) = h.start_with_token("s1", "alice").await;
    result.unwrap();

    let mut factors = Vec::new();
    h.manager
        .context()
        .hooks
        .dispatch(HookPayload::SessionRewardFactor {
            session: &session,
            factors: &mut factors,
        })
        .await
        .unwrap();

    assert_eq!(factors.len(), 1);
    assert_eq!(factors[0].factor, 2.0);
    assert_eq!(factors[0].module, "ticket");
}

// =========================================================================
// Disabled module
// =========================================================================

#[tokio::test]
async fn test_disabled_module_registers_no_hooks() {
    let mut cfg = config();
    cfg.enabled = false;
    cfg.require_login = true;

    let manager = manager_with(cfg, Arc::new(MemoryTicketStore::new())).await;

    assert!(!manager.is_loaded("ticket"));
    for action in [
        HookAction::ClientConfig,
        HookAction::SessionStart,
        HookAction::SessionComplete,
        HookAction::SessionRewardFactor,
    ] {
        assert!(manager.context().hooks.hooks(action).await.is_empty());
    }

    let mut session = Session::new(SessionId::from("s1"));
    let input = SessionInput::new("0xabc");
    manager
        .context()
        .hooks
        .dispatch(HookPayload::SessionStart { session: &mut session, input: &input })
        .await
        .unwrap();
}

// =========================================================================
// Store failures
// =========================================================================

#[tokio::test]
async fn test_grant_store_read_failure_is_module_error_not_rejection() {
    let mut cfg = config();
    cfg.grants = vec![count_grant(5, true)];
    let store = BrokenStore { fail_reads: true, fail_writes: false };
    let manager = manager_with(cfg, Arc::new(store)).await;

    let mut session = Session::new(SessionId::from("s1"));
    let input = SessionInput::new("0xabc").with_field("ticketToken", token_for("alice"));
    let result = manager
        .context()
        .hooks
        .dispatch(HookPayload::SessionStart { session: &mut session, input: &input })
        .await;

    let err = result.unwrap_err();
    assert!(err.as_admission().is_none());
    assert!(matches!(&err, HookError::Module { module, .. } if module == "ticket"));
    assert!(err.to_string().contains("ticket"));
}

#[tokio::test]
async fn test_session_complete_store_write_failure_propagates() {
    let store = BrokenStore { fail_reads: false, fail_writes: true };
    let manager = manager_with(config(), Arc::new(store)).await;
    let mut session = Session::new(SessionId::from("s1"));
    session.set::<TicketAuth>(&identity("alice")).unwrap();
    session.set::<DropAmount>(&"10".to_string()).unwrap();

    let result = manager
        .context()
        .hooks
        .dispatch(HookPayload::SessionComplete { session: &session })
        .await;

    assert!(matches!(result, Err(HookError::Module { .. })));
}
