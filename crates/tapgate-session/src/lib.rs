//! Faucet session management for Tapgate.
//!
//! This crate handles the data side of a funding attempt:
//!
//! 1. **Session data**: a typed key/value bag that modules read and write
//!    through [`SessionKey`] types instead of raw strings
//! 2. **Status**: the `Pending → Running → Completed | Failed` machine
//!    ([`SessionStatus`])
//! 3. **Active registry**: every running session, so modules can take
//!    snapshots across sessions ([`SessionManager`])
//!
//! # How it fits in the stack
//!
//! ```text
//! Lifecycle controller (above)  ← owns sessions, fires hooks
//!     ↕
//! Session Layer (this crate)    ← data bag + registry
//!     ↕
//! Protocol Layer (below)        ← SessionId, wire types
//! ```

mod error;
mod keys;
mod manager;
mod session;

pub use error::SessionError;
pub use keys::{DropAmount, SessionKey, SkipModules, TargetAddress};
pub use manager::{SessionManager, SharedSessions};
pub use session::{Session, SessionConfig, SessionStatus};
