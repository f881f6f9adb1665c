//! Server configuration.
//!
//! Loaded from a TOML file, then overridden from `TAPGATE_*` environment
//! variables:
//!
//! ```toml
//! bindAddr = "0.0.0.0:8080"
//! baseAmount = "1000000000000000000"
//! dbPath = "/var/lib/tapgate"
//!
//! [ticket]
//! enabled = true
//! watermark = "my faucet"
//! externalNullifier = "my faucet"
//! requireLogin = true
//! ```

use std::path::Path;
use std::str::FromStr;

use num_bigint::BigUint;
use serde::{Deserialize, Serialize};
use tapgate_session::SessionConfig;
use tapgate_ticket::{SledTicketStore, TicketConfig};

use crate::TapgateError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ServerConfig {
    pub bind_addr: String,
    /// Drop amount before reward factors, in base units.
    pub base_amount: String,
    /// Directory of the sled database holding ticket-session records.
    pub db_path: String,
    /// `tracing` filter used when `RUST_LOG` is unset.
    pub log_filter: String,
    /// Running sessions older than this are failed and evicted.
    pub session_timeout_secs: u64,
    pub ticket: TicketConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:8080".into(),
            base_amount: "1000000000000000000".into(),
            db_path: "tapgate.db".into(),
            log_filter: "info".into(),
            session_timeout_secs: SessionConfig::default().session_timeout_secs,
            ticket: TicketConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Reads `path` and applies environment overrides.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, TapgateError> {
        let text = std::fs::read_to_string(path)?;
        let mut config = Self::from_toml_str(&text)?;
        config.apply_env()?;
        Ok(config)
    }

    pub fn from_toml_str(text: &str) -> Result<Self, TapgateError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Applies overrides from the process environment.
    pub fn apply_env(&mut self) -> Result<(), TapgateError> {
        self.apply_env_with(|key| std::env::var(key).ok())
    }

    /// Applies overrides from `lookup`:
    ///
    /// | Variable | Field |
    /// |---|---|
    /// | `TAPGATE_BIND_ADDR` | `bindAddr` |
    /// | `TAPGATE_BASE_AMOUNT` | `baseAmount` |
    /// | `TAPGATE_DB_PATH` | `dbPath` |
    /// | `TAPGATE_LOG` | `logFilter` |
    /// | `TAPGATE_TICKET_SECRET` | `ticket.tokenSecret` |
    /// | `TAPGATE_REQUIRE_LOGIN` | `ticket.requireLogin` |
    pub fn apply_env_with(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), TapgateError> {
        if let Some(addr) = lookup("TAPGATE_BIND_ADDR") {
            self.bind_addr = addr;
        }
        if let Some(amount) = lookup("TAPGATE_BASE_AMOUNT") {
            self.base_amount = amount;
        }
        if let Some(path) = lookup("TAPGATE_DB_PATH") {
            self.db_path = path;
        }
        if let Some(filter) = lookup("TAPGATE_LOG") {
            self.log_filter = filter;
        }
        if let Some(secret) = lookup("TAPGATE_TICKET_SECRET") {
            self.ticket.token_secret = Some(secret);
        }
        if let Some(flag) = lookup("TAPGATE_REQUIRE_LOGIN") {
            self.ticket.require_login = bool::from_str(flag.trim()).map_err(|_| {
                TapgateError::Config(format!("TAPGATE_REQUIRE_LOGIN must be true or false, got {flag}"))
            })?;
        }
        self.validate()
    }

    pub fn validate(&self) -> Result<(), TapgateError> {
        self.base_amount()?;
        if self.ticket.enabled {
            self.ticket.validate()?;
        }
        Ok(())
    }

    /// [`base_amount`](Self::base_amount) as an integer.
    pub fn base_amount(&self) -> Result<BigUint, TapgateError> {
        self.base_amount
            .trim()
            .parse()
            .map_err(|_| TapgateError::Config(format!("baseAmount is not a decimal integer: {}", self.base_amount)))
    }

    /// Opens the ticket-session database at [`db_path`](Self::db_path).
    pub fn open_ticket_store(&self) -> Result<SledTicketStore, TapgateError> {
        Ok(SledTicketStore::open(&self.db_path)?)
    }

    /// Installs logging with [`log_filter`](Self::log_filter) as the default.
    pub fn init_logging(&self) -> Result<(), TapgateError> {
        crate::logging::init(&self.log_filter)
    }

    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            session_timeout_secs: self.session_timeout_secs,
        }
    }
}
