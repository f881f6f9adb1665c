//! Browser side of the Tapgate ticket-login handshake.
//!
//! The faucet page opens the ticket wallet in a popup with a proof request
//! in the URL fragment. The wallet proves, then navigates the popup to the
//! faucet's callback endpoint, whose page posts `{ authModule, authResult }`
//! back to the opener. If the popup got lost (the wallet navigated the main
//! tab instead), the callback page parks the result in fallback storage and
//! the next mount picks it up.
//!
//! ```text
//! LoginClicked ─▶ OpenPopup(wallet#/prove?request=…) + StartPolling
//!                     │
//!     poll every 1s ──┤── popup closed ─▶ Closed
//!                     │
//!     Message ────────┴─▶ ClosePopup ─▶ Authenticated  (AuthInfo persisted)
//!                                   └─▶ ShowError      (errorCode/errorMessage)
//! ```
//!
//! [`LoginMachine`] holds the transitions and is free of timers;
//! [`LoginDriver`] runs it against a [`PopupWindow`] and a
//! [`LivenessPoller`].

mod config;
mod driver;
mod error;
mod machine;
mod poll;
mod request;
mod storage;

pub use config::{EventConstraints, LoginConfig};
pub use driver::{LoginDriver, PopupWindow};
pub use error::HandshakeError;
pub use machine::{Effect, LoginMachine, LoginState, Trigger};
pub use poll::{LivenessPoller, POLL_INTERVAL};
pub use request::{ProofRequest, ProveOptions, REQUESTED_PCD_TYPE};
pub use storage::{AuthSlots, FallbackStorage, MemoryStorage};
