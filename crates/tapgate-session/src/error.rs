//! Error types for the session layer.

use tapgate_protocol::SessionId;

use crate::SessionStatus;

/// Errors that can occur while managing sessions or their data.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// No active session exists with this id.
    /// Either it never started, or it already completed/failed and was
    /// evicted from the registry.
    #[error("session {0} not found")]
    NotFound(SessionId),

    /// A session with this id is already registered.
    #[error("session {0} already registered")]
    AlreadyExists(SessionId),

    /// The requested status change isn't allowed by the state machine.
    #[error("session {id} cannot move from {from} to {to}")]
    InvalidTransition {
        id: SessionId,
        from: SessionStatus,
        to: SessionStatus,
    },

    /// A write-once key was written a second time.
    #[error("session key {0} is already set")]
    KeyAlreadySet(&'static str),

    /// The stored value doesn't match the key's declared type.
    #[error("session key {key} holds an incompatible value: {source}")]
    DataType {
        key: &'static str,
        #[source]
        source: serde_json::Error,
    },
}
