//! Unified error type for Tapgate, and its HTTP mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use tapgate_handshake::HandshakeError;
use tapgate_hooks::HookError;
use tapgate_protocol::ProtocolError;
use tapgate_session::SessionError;
use tapgate_ticket::TicketError;

/// Top-level error that wraps all crate-specific errors.
///
/// The `#[from]` attribute on each variant lets `?` convert sub-crate
/// errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum TapgateError {
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    #[error(transparent)]
    Session(#[from] SessionError),

    /// A hook failed. Admission rejections arrive here as
    /// [`HookError::Rejected`].
    #[error(transparent)]
    Hook(#[from] HookError),

    #[error(transparent)]
    Ticket(#[from] TicketError),

    #[error(transparent)]
    Handshake(#[from] HandshakeError),

    /// Binding or serving failed.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("invalid config file: {0}")]
    ConfigFile(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Config(String),

    /// A route belongs to a module that isn't loaded.
    #[error("module {0} is not enabled")]
    ModuleDisabled(String),
}

impl TapgateError {
    /// HTTP status, error code and message for the JSON error body.
    fn parts(&self) -> (StatusCode, String, String) {
        match self {
            Self::Hook(HookError::Rejected(rejection)) => (
                StatusCode::FORBIDDEN,
                rejection.code.clone(),
                rejection.message.clone(),
            ),
            Self::Session(SessionError::NotFound(id)) => (
                StatusCode::NOT_FOUND,
                "SESSION_NOT_FOUND".into(),
                format!("Session {id} not found"),
            ),
            Self::Session(err @ SessionError::InvalidTransition { .. }) => {
                (StatusCode::CONFLICT, "SESSION_STATE".into(), err.to_string())
            }
            Self::ModuleDisabled(_) => (StatusCode::NOT_FOUND, "MODULE_DISABLED".into(), self.to_string()),
            other => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR".into(),
                other.to_string(),
            ),
        }
    }
}

impl IntoResponse for TapgateError {
    fn into_response(self) -> Response {
        let (status, code, message) = self.parts();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }

        let body = Json(json!({
            "error": code,
            "message": message,
            "timestamp": chrono::Utc::now().to_rfc3339(),
        }));
        (status, body).into_response()
    }
}
