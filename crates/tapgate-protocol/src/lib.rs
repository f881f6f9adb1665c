//! Shared wire types for Tapgate.
//!
//! Everything that crosses a boundary lives here: the session-start input a
//! browser submits, the identity a ticket proof yields, the result relayed
//! back through the popup handshake, and the typed admission error that
//! rejects a session.
//!
//! - **Types** ([`AuthInfo`], [`AuthResult`], [`AuthMessage`],
//!   [`SessionInput`], [`ClientConfig`], [`RewardFactor`], [`SessionId`])
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]): converts those types
//!   to/from bytes and strings.
//! - **Errors** ([`ProtocolError`], [`AdmissionError`])
//!
//! ```text
//! Browser (JSON) → Protocol (typed values) → Hooks / Session lifecycle
//! ```

mod codec;
mod error;
mod types;

pub use codec::{Codec, JsonCodec};
pub use error::{AdmissionError, ProtocolError};
pub use types::{
    AuthInfo, AuthMessage, AuthResult, ClientConfig, RewardFactor, SessionId,
    SessionInput,
};
