//! Error types for the ticket module.
//!
//! Rejections a user should see are [`AdmissionError`]s built with one of
//! the codes in [`codes`]. [`TicketError`] covers everything else: storage,
//! token decoding, a broken proof oracle, bad configuration.

use tapgate_hooks::HookError;
use tapgate_protocol::AdmissionError;

/// Machine-readable admission codes produced by the ticket module.
pub mod codes {
    /// The session-start input carried a token that failed to parse.
    pub const TICKET_TOKEN: &str = "TICKET_TOKEN";
    /// Login is mandatory and no token was submitted.
    pub const TICKET_REQUIRED: &str = "TICKET_REQUIRED";
    /// A required grant is exhausted.
    pub const TICKET_LIMIT: &str = "TICKET_LIMIT";
    /// Too many sessions are running for the same attendee.
    pub const TICKET_CONCURRENCY_LIMIT: &str = "TICKET_CONCURRENCY_LIMIT";
    /// The callback request carried no `proof` parameter.
    pub const PROOF_MISSING: &str = "PROOF_MISSING";
    /// The proof failed one of the verification stages.
    pub const INVALID_PCD: &str = "INVALID_PCD";
}

/// Errors that can occur inside the ticket module.
#[derive(Debug, thiserror::Error)]
pub enum TicketError {
    /// The sled database failed.
    #[error("ticket store error: {0}")]
    Store(#[from] sled::Error),

    /// A stored ticket-session record could not be encoded or decoded.
    #[error("ticket record codec error: {0}")]
    Codec(#[from] bincode::Error),

    /// A faucet token is malformed, forged, or expired.
    #[error("invalid token: {0}")]
    Token(String),

    /// The proof oracle could not reach a verdict.
    #[error("proof oracle failed: {0}")]
    Oracle(String),

    /// The module configuration is unusable.
    #[error("invalid ticket config: {0}")]
    Config(String),

    /// A typed rejection.
    #[error(transparent)]
    Rejected(#[from] AdmissionError),
}

impl TicketError {
    /// Converts into a hook error owned by `module`. Rejections stay
    /// rejections; every other variant becomes a module fault.
    pub fn into_hook(self, module: &str) -> HookError {
        match self {
            Self::Rejected(admission) => HookError::Rejected(admission),
            other => HookError::module(module, other),
        }
    }
}
