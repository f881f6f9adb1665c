//! Codec trait and implementations for serializing/deserializing values.
//!
//! The fallback-storage slots of the browser handshake hold strings, and the
//! callback page embeds the auth result as a script literal. Both go through
//! a [`Codec`] so the representation is decided in one place.

use serde::{de::DeserializeOwned, Serialize};

use crate::ProtocolError;

/// A codec that can encode Rust types to bytes and decode bytes back.
///
/// - `Send + Sync` → safe to share between tasks.
/// - `'static` → owns everything it needs, so it can live inside
///   long-lived server state.
pub trait Codec: Send + Sync + 'static {
    /// Serializes a value into bytes.
    ///
    /// # Errors
    /// Returns `ProtocolError::Encode` if serialization fails.
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError>;

    /// Deserializes bytes back into a value.
    ///
    /// # Errors
    /// Returns `ProtocolError::Decode` if the bytes are malformed or don't
    /// match the expected type.
    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError>;

    /// Serializes a value into a string (for text slots such as local storage).
    fn encode_str<T: Serialize>(&self, value: &T) -> Result<String, ProtocolError> {
        let bytes = self.encode(value)?;
        String::from_utf8(bytes)
            .map_err(|e| ProtocolError::InvalidMessage(e.to_string()))
    }

    /// Deserializes a value from a string.
    fn decode_str<T: DeserializeOwned>(&self, data: &str) -> Result<T, ProtocolError> {
        self.decode(data.as_bytes())
    }
}

// ---------------------------------------------------------------------------
// JsonCodec
// ---------------------------------------------------------------------------

/// A [`Codec`] that uses JSON (via `serde_json`).
///
/// JSON is what the browser side speaks natively, so this is the only codec
/// Tapgate needs.
///
/// ## Example
///
/// ```rust
/// use tapgate_protocol::{AuthResult, Codec, JsonCodec};
///
/// let codec = JsonCodec;
/// let result = AuthResult::failure("PROOF_MISSING", "no proof");
///
/// let text = codec.encode_str(&result).unwrap();
/// let decoded: AuthResult = codec.decode_str(&text).unwrap();
/// assert_eq!(result, decoded);
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl Codec for JsonCodec {
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError> {
        serde_json::to_vec(value).map_err(ProtocolError::Encode)
    }

    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError> {
        serde_json::from_slice(data).map_err(ProtocolError::Decode)
    }
}
