//! Core protocol types.
//!
//! These are the structures that get serialized to JSON and cross a
//! boundary: browser → server (session input, callback proof), server →
//! browser (client config, auth result), or popup → opener window
//! (auth message).

use std::fmt;

use rand::Rng;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// Opaque identifier of a faucet session.
///
/// Newtype over `String` so a session id can't be confused with an attendee
/// id or a ticket id, which are all strings too.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(pub String);

impl SessionId {
    /// Generates a random 32-character hex id (128 bits of entropy).
    pub fn generate() -> Self {
        let bytes: [u8; 16] = rand::rng().random();
        Self(bytes.iter().map(|b| format!("{b:02x}")).collect())
    }

    /// Borrows the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SessionId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

// ---------------------------------------------------------------------------
// Ticket identity
// ---------------------------------------------------------------------------

/// The identity a verified ticket proof yields.
///
/// Produced once per successful proof verification. The browser keeps it in
/// local storage and sends `token` back with every session-start request;
/// the server stores it in the session and, on completion, in the durable
/// ticket-session record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthInfo {
    pub ticket_id: String,
    pub product_id: String,
    pub event_id: String,
    /// The attendee's semaphore id. All rate limits key on this.
    pub attendee_id: String,
    /// Opaque bearer token presented in the session-start input.
    pub token: String,
}

/// The outcome of a proof validation, relayed to the browser.
///
/// Exactly one of `data` or (`error_code`, `error_message`) is set.
/// Validation failures never become HTTP errors; they travel inside this
/// object so the popup handshake can show them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResult {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<AuthInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl AuthResult {
    /// A successful result carrying the extracted identity.
    pub fn success(info: AuthInfo) -> Self {
        Self {
            data: Some(info),
            ..Self::default()
        }
    }

    /// A failed result with a machine-readable code and a message.
    pub fn failure(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            data: None,
            error_code: Some(code.into()),
            error_message: Some(message.into()),
        }
    }

    /// Returns `true` if this result carries an identity.
    pub fn is_success(&self) -> bool {
        self.data.is_some()
    }
}

/// The payload the callback page posts to its opener window.
///
/// `auth_module` lets the opener ignore messages meant for other login
/// modules sharing the same page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthMessage {
    pub auth_module: String,
    pub auth_result: AuthResult,
}

// ---------------------------------------------------------------------------
// Session input & client config
// ---------------------------------------------------------------------------

/// Raw input a client submits to start a session.
///
/// `addr` is the payout target. Every optional module adds its own token
/// field next to it (`ticketToken`, `captchaToken`, ...), which end up in
/// `fields` thanks to `#[serde(flatten)]`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionInput {
    #[serde(default)]
    pub addr: String,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl SessionInput {
    /// Creates an input targeting `addr` with no module fields.
    pub fn new(addr: impl Into<String>) -> Self {
        Self {
            addr: addr.into(),
            fields: Map::new(),
        }
    }

    /// Adds a string field (builder style).
    pub fn with_field(mut self, name: &str, value: impl Into<String>) -> Self {
        self.fields.insert(name.to_string(), Value::String(value.into()));
        self
    }

    /// Returns a non-empty string field, if present.
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields
            .get(name)
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
    }
}

/// Configuration object exported to the frontend.
///
/// Each module contributes a sub-object keyed by its name during the
/// `ClientConfig` hook.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClientConfig(pub Map<String, Value>);

impl ClientConfig {
    /// Sets (or replaces) the sub-object of `module`.
    pub fn set_module(&mut self, module: &str, value: Value) {
        self.0.insert(module.to_string(), value);
    }

    /// Returns the sub-object of `module`, if any.
    pub fn module(&self, module: &str) -> Option<&Value> {
        self.0.get(module)
    }
}

// ---------------------------------------------------------------------------
// Reward factors
// ---------------------------------------------------------------------------

/// A multiplicative reward adjustment contributed by one module.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RewardFactor {
    pub factor: f64,
    pub module: String,
}
