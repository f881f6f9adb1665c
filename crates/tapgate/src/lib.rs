//! # Tapgate
//!
//! Faucet backend core: a pluggable admission pipeline where independent
//! modules gate and shape each funding session, with event-ticket login as
//! the built-in module.
//!
//! ```text
//! Browser ──HTTP──▶ server ──▶ SessionController ──dispatch──▶ HookRegistry
//!                                                                 │
//!                                   TicketModule, other modules ◀─┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use tapgate::prelude::*;
//!
//! # async fn run(oracle: Arc<dyn ProofOracle>) -> Result<(), TapgateError> {
//! let config = ServerConfig::load("tapgate.toml")?;
//! config.init_logging()?;
//!
//! let server = TapgateServerBuilder::from_config_with_oracle(&config, oracle)?
//!     .build()
//!     .await?;
//! server.run().await
//! # }
//! ```
//!
//! The zero-knowledge proof check itself is delegated to a [`ProofOracle`]
//! the embedding application supplies.
//!
//! [`ProofOracle`]: tapgate_ticket::ProofOracle

pub mod config;
pub mod controller;
mod error;
pub mod logging;
pub mod server;

pub use config::ServerConfig;
pub use controller::{CompletedSession, SessionController};
pub use error::TapgateError;
pub use server::{TapgateServer, TapgateServerBuilder};

pub mod prelude {
    pub use crate::{
        CompletedSession, ServerConfig, SessionController, TapgateError, TapgateServer,
        TapgateServerBuilder,
    };
    pub use tapgate_handshake::{LoginConfig, LoginDriver, LoginMachine, LoginState, Trigger};
    pub use tapgate_hooks::{
        FaucetModule, HookAction, HookCallback, HookError, HookPayload, HookRegistry, ModuleContext,
    };
    pub use tapgate_protocol::{
        AdmissionError, AuthInfo, AuthResult, ClientConfig, RewardFactor, SessionId, SessionInput,
    };
    pub use tapgate_session::{Session, SessionConfig, SessionKey, SessionStatus};
    pub use tapgate_ticket::{
        MemoryTicketStore, ProofOracle, SledTicketStore, TicketConfig, TicketModule,
    };
}
