//! Error types for the protocol layer.
//!
//! Two very different kinds of failure live here:
//!
//! - [`ProtocolError`]: something went wrong turning values into bytes or
//!   back. These are bugs or malformed input, never shown to end users.
//! - [`AdmissionError`]: a module decided this session must not proceed.
//!   This is the ONLY way a session gets rejected, and its `code`/`message`
//!   pair is shown to the user verbatim.

use serde::{Deserialize, Serialize};

/// Errors that can occur while encoding or decoding protocol values.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serialization failed (turning a Rust type into bytes).
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// Deserialization failed (turning bytes into a Rust type).
    ///
    /// Common causes: malformed JSON, missing required fields, wrong
    /// data types, or truncated input.
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),

    /// The value decoded fine but violates a protocol rule, e.g. a
    /// string payload that is not valid UTF-8.
    #[error("invalid message: {0}")]
    InvalidMessage(String),
}

/// A typed rejection of a faucet session.
///
/// `code` is short and machine readable (`TICKET_LIMIT`, `INVALID_PCD`, ...);
/// `message` is human readable and displayed as-is in the frontend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[error("[{code}] {message}")]
pub struct AdmissionError {
    pub code: String,
    pub message: String,
}

impl AdmissionError {
    /// Creates a new admission error.
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }
}
