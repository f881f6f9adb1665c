//! Session types: the data structures that represent one funding attempt.
//!
//! A session tracks:
//! - WHO it is (`SessionId`)
//! - WHERE it is in its lifecycle (`SessionStatus`)
//! - WHAT modules learned about it (the typed data bag)
//! - WHEN it started (so stale sessions can be expired)

use std::collections::BTreeMap;
use std::fmt;
use std::time::Instant;

use serde_json::Value;
use tapgate_protocol::SessionId;

use crate::{SessionError, SessionKey, SkipModules};

// ---------------------------------------------------------------------------
// SessionConfig
// ---------------------------------------------------------------------------

/// Configuration for session behavior.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// How long (in seconds) a session may stay `Running` before
    /// [`SessionManager::expire_stale`](crate::SessionManager::expire_stale)
    /// fails and evicts it.
    ///
    /// Default: 3600 seconds. Set to 0 to never expire.
    pub session_timeout_secs: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            session_timeout_secs: 3600,
        }
    }
}

// ---------------------------------------------------------------------------
// SessionStatus
// ---------------------------------------------------------------------------

/// The lifecycle status of a session.
///
/// ```text
///   Pending ──(start hooks pass)──→ Running ──(complete)──→ Completed
///      │                               │
///      └────────(rejected)──────┬──────┘(fail / timeout)
///                               ▼
///                             Failed
/// ```
///
/// `Completed` and `Failed` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

impl SessionStatus {
    /// Returns `true` if moving to `target` is allowed.
    pub fn can_transition_to(self, target: Self) -> bool {
        matches!(
            (self, target),
            (Self::Pending, Self::Running)
                | (Self::Pending, Self::Failed)
                | (Self::Running, Self::Completed)
                | (Self::Running, Self::Failed)
        )
    }

    /// Returns `true` for `Completed` and `Failed`.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "Pending"),
            Self::Running => write!(f, "Running"),
            Self::Completed => write!(f, "Completed"),
            Self::Failed => write!(f, "Failed"),
        }
    }
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// One funding attempt.
///
/// Owned by the lifecycle controller. Modules only see it through hook
/// payloads and only touch its data through the typed accessors below.
#[derive(Debug, Clone)]
pub struct Session {
    id: SessionId,
    status: SessionStatus,
    data: BTreeMap<String, Value>,
    started_at: Instant,
}

impl Session {
    /// Creates a new `Pending` session with an empty data bag.
    pub fn new(id: SessionId) -> Self {
        Self {
            id,
            status: SessionStatus::Pending,
            data: BTreeMap::new(),
            started_at: Instant::now(),
        }
    }

    pub fn id(&self) -> &SessionId {
        &self.id
    }

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    pub fn started_at(&self) -> Instant {
        self.started_at
    }

    /// Moves the session to `next`.
    ///
    /// # Errors
    /// [`SessionError::InvalidTransition`] if the state machine forbids it.
    pub fn transition(&mut self, next: SessionStatus) -> Result<(), SessionError> {
        if !self.status.can_transition_to(next) {
            return Err(SessionError::InvalidTransition {
                id: self.id.clone(),
                from: self.status,
                to: next,
            });
        }
        tracing::debug!(session_id = %self.id, from = %self.status, to = %next, "session status changed");
        self.status = next;
        Ok(())
    }

    /// Reads the value stored under `K`, if any.
    ///
    /// # Errors
    /// [`SessionError::DataType`] if the stored JSON doesn't decode as
    /// `K::Value` (two keys sharing a name with different types).
    pub fn get<K: SessionKey>(&self) -> Result<Option<K::Value>, SessionError> {
        self.data
            .get(K::NAME)
            .map(|value| {
                serde_json::from_value(value.clone())
                    .map_err(|source| SessionError::DataType { key: K::NAME, source })
            })
            .transpose()
    }

    /// Stores `value` under `K`, replacing any previous value.
    pub fn set<K: SessionKey>(&mut self, value: &K::Value) -> Result<(), SessionError> {
        let json = serde_json::to_value(value)
            .map_err(|source| SessionError::DataType { key: K::NAME, source })?;
        self.data.insert(K::NAME.to_string(), json);
        Ok(())
    }

    /// Stores `value` under `K` only if nothing is stored there yet.
    ///
    /// # Errors
    /// [`SessionError::KeyAlreadySet`] if `K` already holds a value.
    pub fn insert_once<K: SessionKey>(&mut self, value: &K::Value) -> Result<(), SessionError> {
        if self.contains::<K>() {
            return Err(SessionError::KeyAlreadySet(K::NAME));
        }
        self.set::<K>(value)
    }

    pub fn contains<K: SessionKey>(&self) -> bool {
        self.data.contains_key(K::NAME)
    }

    /// Raw view of the data bag, keyed by [`SessionKey::NAME`].
    pub fn data(&self) -> &BTreeMap<String, Value> {
        &self.data
    }

    /// Returns `true` if `module` is in the session's skip list.
    pub fn is_module_skipped(&self, module: &str) -> Result<bool, SessionError> {
        Ok(self
            .get::<SkipModules>()?
            .is_some_and(|skip| skip.iter().any(|m| m == module)))
    }

    /// Adds `modules` to the session's skip list.
    ///
    /// The list is a de-duplicating union across every module that grants
    /// skips: names already present and empty names are ignored.
    pub fn add_skip_modules(&mut self, modules: &[String]) -> Result<(), SessionError> {
        let mut skip = self.get::<SkipModules>()?.unwrap_or_default();
        for module in modules {
            if module.is_empty() || skip.contains(module) {
                continue;
            }
            skip.push(module.clone());
        }
        self.set::<SkipModules>(&skip)
    }
}
