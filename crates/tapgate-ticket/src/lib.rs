//! Event-ticket proof admission for Tapgate.
//!
//! Attendees log in with a zero-knowledge event-ticket proof from their
//! ticket wallet. The faucet verifies the proof once, hands the browser a
//! signed faucet token, and from then on admits sessions presenting that
//! token, subject to per-attendee limits.
//!
//! ```text
//! wallet ──proof──▶ ProofVerifier ──AuthInfo + token──▶ browser
//!                                                          │
//! session start ◀──────────────── ticketToken ─────────────┘
//!     │
//!     ├─ TokenCodec::parse        (TICKET_TOKEN / TICKET_REQUIRED)
//!     ├─ check_concurrency        (TICKET_CONCURRENCY_LIMIT)
//!     ├─ GrantEvaluator::evaluate (TICKET_LIMIT, perks)
//!     └─ session ← TicketAuth, TicketFactor, skip modules
//!
//! session complete ──▶ TicketSessionStore::insert
//! ```
//!
//! # Key types
//!
//! - [`TicketModule`]: the [`FaucetModule`](tapgate_hooks::FaucetModule)
//! - [`ProofVerifier`] / [`ProofOracle`]: callback-side verification
//! - [`GrantEvaluator`]: windowed limits and perks
//! - [`TicketSessionStore`]: [`SledTicketStore`], [`MemoryTicketStore`]
//! - [`TokenCodec`]: signed faucet tokens

mod callback;
mod config;
mod error;
mod grants;
mod keys;
mod limiter;
mod module;
mod pcd;
mod render;
mod store;
mod token;
mod verifier;

pub use callback::{render_callback_page, CALLBACK_CONTENT_TYPE};
pub use config::{EventFilter, GrantConfig, TicketConfig, VerifyConfig};
pub use error::{codes, TicketError};
pub use grants::{GrantEvaluator, GrantOutcome, GrantPerks};
pub use keys::{TicketAuth, TicketFactor};
pub use limiter::check_concurrency;
pub use module::{TicketModule, DEFAULT_MODULE_NAME, TOKEN_FIELD};
pub use pcd::{
    message_hash, PartialTicket, PcdEnvelope, ProofOracle, TicketClaim, TicketPcd, TICKET_PCD_TYPE,
};
pub use render::{readable_amount, render_timespan};
pub use store::{MemoryTicketStore, SledTicketStore, TicketSessionRecord, TicketSessionStore};
pub use token::TokenCodec;
pub use verifier::ProofVerifier;
