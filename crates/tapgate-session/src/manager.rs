//! The session manager: the registry of active faucet sessions.
//!
//! Responsibilities:
//! - Registering sessions once their start hooks pass
//! - Looking them up and mutating them by id
//! - Evicting them on completion or failure
//! - Failing sessions that stayed `Running` past the timeout
//! - Handing out snapshots so modules can reason about *other* sessions
//!   (e.g. the ticket module's per-attendee concurrency limit)
//!
//! # Concurrency note
//!
//! `SessionManager` is NOT thread-safe by itself; it is a plain
//! `HashMap`. It is shared as [`SharedSessions`] (`Arc<Mutex<_>>`) and
//! callers lock it only for short, synchronous operations. Nobody holds the
//! lock across a hook dispatch, so a module that locks it from inside a
//! hook never deadlocks against the controller.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tapgate_protocol::SessionId;
use tokio::sync::Mutex;

use crate::{Session, SessionConfig, SessionError, SessionStatus};

/// Shared handle to the session registry, injected into modules.
pub type SharedSessions = Arc<Mutex<SessionManager>>;

/// Registry of every `Running` session.
///
/// ## Lifecycle
///
/// ```text
/// start hooks pass ──→ insert() ──→ remove() on complete / fail
///                         │
///                         └──→ expire_stale() after the timeout
/// ```
pub struct SessionManager {
    sessions: HashMap<SessionId, Session>,
    config: SessionConfig,
}

impl SessionManager {
    /// Creates a new, empty registry with the given config.
    pub fn new(config: SessionConfig) -> Self {
        Self {
            sessions: HashMap::new(),
            config,
        }
    }

    /// Wraps a new registry in the shared handle modules receive.
    pub fn shared(config: SessionConfig) -> SharedSessions {
        Arc::new(Mutex::new(Self::new(config)))
    }

    /// Registers an admitted session.
    ///
    /// # Errors
    /// [`SessionError::AlreadyExists`] if the id is already registered.
    pub fn insert(&mut self, session: Session) -> Result<(), SessionError> {
        let id = session.id().clone();
        if self.sessions.contains_key(&id) {
            return Err(SessionError::AlreadyExists(id));
        }
        tracing::info!(session_id = %id, status = %session.status(), "session registered");
        self.sessions.insert(id, session);
        Ok(())
    }

    /// Evicts a session and hands ownership back to the caller.
    ///
    /// # Errors
    /// [`SessionError::NotFound`] if no such session is registered.
    pub fn remove(&mut self, id: &SessionId) -> Result<Session, SessionError> {
        let session = self
            .sessions
            .remove(id)
            .ok_or_else(|| SessionError::NotFound(id.clone()))?;
        tracing::info!(session_id = %id, "session evicted");
        Ok(session)
    }

    /// Looks up a session by id.
    pub fn get(&self, id: &SessionId) -> Option<&Session> {
        self.sessions.get(id)
    }

    /// Looks up a session by id for mutation.
    pub fn get_mut(&mut self, id: &SessionId) -> Option<&mut Session> {
        self.sessions.get_mut(id)
    }

    /// Iterates over all registered sessions (in no particular order).
    pub fn active_sessions(&self) -> impl Iterator<Item = &Session> {
        self.sessions.values()
    }

    /// Fails and evicts every session that has been running longer than
    /// the configured timeout. Returns the evicted sessions.
    pub fn expire_stale(&mut self) -> Vec<Session> {
        self.expire_stale_at(Instant::now())
    }

    /// Same as [`expire_stale`](Self::expire_stale) with an explicit "now",
    /// so callers (and tests) control the clock.
    pub fn expire_stale_at(&mut self, now: Instant) -> Vec<Session> {
        if self.config.session_timeout_secs == 0 {
            return Vec::new();
        }
        let timeout = Duration::from_secs(self.config.session_timeout_secs);

        let stale: Vec<SessionId> = self
            .sessions
            .values()
            .filter(|s| now.saturating_duration_since(s.started_at()) > timeout)
            .map(|s| s.id().clone())
            .collect();

        let mut expired = Vec::with_capacity(stale.len());
        for id in stale {
            if let Some(mut session) = self.sessions.remove(&id) {
                // Registered sessions are Running, so this can't fail; if a
                // caller registered something else, evict it unchanged.
                let _ = session.transition(SessionStatus::Failed);
                tracing::info!(session_id = %id, "session expired (timeout elapsed)");
                expired.push(session);
            }
        }
        expired
    }

    /// Returns the number of registered sessions.
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Returns `true` if no sessions are registered.
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

// =========================================================================
// Tests
// =========================================================================
