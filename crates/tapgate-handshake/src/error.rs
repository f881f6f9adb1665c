//! Error types for the handshake layer.

/// Errors that can occur on the client side of the login handshake.
///
/// Corrupt fallback storage is not one of them: it is logged
/// and ignored, leaving the login unauthenticated.
#[derive(Debug, thiserror::Error)]
pub enum HandshakeError {
    /// The proof request could not be serialized.
    #[error("failed to encode proof request: {0}")]
    Encode(#[from] serde_json::Error),

    /// The login config lacks something the request needs.
    #[error("invalid login config: {0}")]
    Config(String),
}
