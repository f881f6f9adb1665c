//! The hook registry: ordered callbacks per lifecycle action.
//!
//! ```text
//! register(module, action, priority, label, callback)
//!                     │
//!                     ▼
//!   SessionStart: [ p1 "captcha check" ] → [ p2 "ticket login check" ] → [ p2 "..." ]
//!                     │
//! dispatch(payload) ──┘  sequential, awaited, stops at the first error
//! ```
//!
//! Ordering is load-bearing: hooks run by ascending priority, ties in
//! registration order, and every hook sees the mutations made by the hooks
//! before it. A failing hook stops the dispatch, and the side effects of the
//! hooks that already ran are kept. Nothing is rolled back.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tapgate_protocol::{ClientConfig, RewardFactor, SessionInput};
use tapgate_session::Session;
use tokio::sync::RwLock;

use crate::{HookAction, HookError};

// ---------------------------------------------------------------------------
// Payload
// ---------------------------------------------------------------------------

/// What a hook receives. One variant per [`HookAction`].
///
/// Mutable references let hooks contribute to a shared accumulator (the
/// client config, the reward-factor list) or to the session itself.
pub enum HookPayload<'a> {
    ClientConfig(&'a mut ClientConfig),
    SessionStart {
        session: &'a mut Session,
        input: &'a SessionInput,
    },
    SessionComplete {
        session: &'a Session,
    },
    SessionRewardFactor {
        session: &'a Session,
        factors: &'a mut Vec<RewardFactor>,
    },
}

impl HookPayload<'_> {
    /// The action this payload belongs to.
    pub fn action(&self) -> HookAction {
        match self {
            Self::ClientConfig(_) => HookAction::ClientConfig,
            Self::SessionStart { .. } => HookAction::SessionStart,
            Self::SessionComplete { .. } => HookAction::SessionComplete,
            Self::SessionRewardFactor { .. } => HookAction::SessionRewardFactor,
        }
    }

    /// Borrows the payload again for the next hook in line.
    fn reborrow(&mut self) -> HookPayload<'_> {
        match self {
            Self::ClientConfig(config) => HookPayload::ClientConfig(&mut **config),
            Self::SessionStart { session, input } => HookPayload::SessionStart {
                session: &mut **session,
                input: *input,
            },
            Self::SessionComplete { session } => HookPayload::SessionComplete { session: *session },
            Self::SessionRewardFactor { session, factors } => HookPayload::SessionRewardFactor {
                session: *session,
                factors: &mut **factors,
            },
        }
    }
}

// ---------------------------------------------------------------------------
// Callback
// ---------------------------------------------------------------------------

/// A hook body.
///
/// A module usually implements this once and registers the same callback
/// for several actions, matching on the payload variant inside.
#[async_trait]
pub trait HookCallback: Send + Sync {
    async fn call(&self, payload: HookPayload<'_>) -> Result<(), HookError>;
}

/// One registered hook.
#[derive(Clone)]
pub struct ModuleHook {
    pub module: String,
    pub action: HookAction,
    pub priority: i32,
    pub label: String,
    pub callback: Arc<dyn HookCallback>,
}

/// Diagnostic view of a registered hook (everything but the callback).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HookInfo {
    pub module: String,
    pub priority: i32,
    pub label: String,
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// Maps each action to its ordered hook list.
#[derive(Default)]
pub struct HookRegistry {
    hooks: RwLock<HashMap<HookAction, Vec<ModuleHook>>>,
}

impl HookRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a hook for `action`.
    ///
    /// The hook is inserted after every hook with a priority less than or
    /// equal to `priority`, which keeps equal priorities in registration
    /// order.
    pub async fn register(
        &self,
        module: &str,
        action: HookAction,
        priority: i32,
        label: &str,
        callback: Arc<dyn HookCallback>,
    ) {
        let hook = ModuleHook {
            module: module.to_string(),
            action,
            priority,
            label: label.to_string(),
            callback,
        };

        let mut hooks = self.hooks.write().await;
        let list = hooks.entry(action).or_default();
        let pos = list
            .iter()
            .position(|h| h.priority > priority)
            .unwrap_or(list.len());
        list.insert(pos, hook);

        tracing::debug!(module, %action, priority, label, "hook registered");
    }

    /// Removes every hook owned by `module`. Returns how many were removed.
    pub async fn unregister_module(&self, module: &str) -> usize {
        let mut hooks = self.hooks.write().await;
        let mut removed = 0;
        for list in hooks.values_mut() {
            let before = list.len();
            list.retain(|h| h.module != module);
            removed += before - list.len();
        }
        tracing::debug!(module, removed, "hooks unregistered");
        removed
    }

    /// Lists the hooks for `action` in dispatch order.
    pub async fn hooks(&self, action: HookAction) -> Vec<HookInfo> {
        self.hooks
            .read()
            .await
            .get(&action)
            .map(|list| {
                list.iter()
                    .map(|h| HookInfo {
                        module: h.module.clone(),
                        priority: h.priority,
                        label: h.label.clone(),
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Runs every hook registered for the payload's action.
    ///
    /// Hooks are awaited one after another in priority order. The first
    /// error stops the dispatch and is returned unchanged; hooks that
    /// already ran keep their effects.
    ///
    /// The hook list is snapshotted before the first callback runs, so the
    /// registry lock is never held across an `.await` on module code.
    pub async fn dispatch(&self, mut payload: HookPayload<'_>) -> Result<(), HookError> {
        let action = payload.action();
        let snapshot: Vec<ModuleHook> = self
            .hooks
            .read()
            .await
            .get(&action)
            .cloned()
            .unwrap_or_default();

        for hook in &snapshot {
            tracing::trace!(module = %hook.module, %action, priority = hook.priority, label = %hook.label, "running hook");
            if let Err(err) = hook.callback.call(payload.reborrow()).await {
                tracing::debug!(
                    module = %hook.module,
                    %action,
                    label = %hook.label,
                    error = %err,
                    "hook stopped dispatch"
                );
                return Err(err);
            }
        }
        Ok(())
    }
}
