//! Ticket module configuration.
//!
//! Keys are camelCase so a config file reads the same as the client-config
//! export the frontend receives.
//!
//! ```toml
//! enabled = true
//! walletUrl = "https://wallet.example"
//! watermark = "my faucet"
//! externalNullifier = "my faucet"
//! requireLogin = true
//! concurrencyLimit = 1
//!
//! [event]
//! eventIds = ["5de90d09-22db-40ca-b3ae-d934573def8b"]
//!
//! [[grants]]
//! duration = 86400
//! limitCount = 2
//! required = true
//! ```

use num_bigint::BigUint;
use num_traits::Zero;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::TicketError;

// ---------------------------------------------------------------------------
// TicketConfig
// ---------------------------------------------------------------------------

/// Configuration of the ticket module.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TicketConfig {
    pub enabled: bool,

    /// Ticket wallet the login popup opens.
    pub wallet_url: String,

    /// Wallet API endpoint, forwarded to the frontend as-is.
    pub wallet_api_url: String,

    /// Where the wallet sends the proof back. `None` means the faucet's own
    /// callback endpoint.
    pub redirect_url: Option<String>,

    /// Constraints the proof request asks the wallet to satisfy.
    pub event: EventFilter,

    /// Deployment-specific string bound into every proof.
    pub watermark: String,

    /// Context-binding string bound into every proof.
    pub external_nullifier: String,

    /// Reject sessions that don't present a ticket token.
    pub require_login: bool,

    /// Maximum concurrent sessions per attendee. 0 = unlimited.
    pub concurrency_limit: u32,

    /// Server-side allow-lists checked after the proof verifies.
    pub verify: VerifyConfig,

    /// Rate limits and perks, evaluated top to bottom.
    pub grants: Vec<GrantConfig>,

    /// Secret used to sign faucet tokens. A random one is generated at
    /// start when absent, which invalidates tokens across restarts.
    pub token_secret: Option<String>,

    /// Faucet token lifetime in seconds.
    pub token_lifetime: u64,

    /// Decimals of the payout token, for rendering amounts in messages.
    pub amount_decimals: u32,

    /// Symbol of the payout token, for rendering amounts in messages.
    pub amount_symbol: String,

    /// Title of the callback page.
    pub faucet_title: String,
}

impl Default for TicketConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            wallet_url: "https://zupass.org".to_string(),
            wallet_api_url: "https://api.zupass.org".to_string(),
            redirect_url: None,
            event: EventFilter::default(),
            watermark: String::new(),
            external_nullifier: String::new(),
            require_login: false,
            concurrency_limit: 0,
            verify: VerifyConfig::default(),
            grants: Vec::new(),
            token_secret: None,
            token_lifetime: 86_400,
            amount_decimals: 18,
            amount_symbol: "ETH".to_string(),
            faucet_title: "Tapgate Faucet".to_string(),
        }
    }
}

impl TicketConfig {
    /// Checks the values that would make the module misbehave at runtime.
    pub fn validate(&self) -> Result<(), TicketError> {
        if self.token_lifetime == 0 {
            return Err(TicketError::Config("tokenLifetime must be greater than 0".into()));
        }
        for (idx, grant) in self.grants.iter().enumerate() {
            let limited = grant.limit_count > 0 || !grant.limit_amount.is_zero();
            if limited && grant.duration == 0 {
                return Err(TicketError::Config(format!(
                    "grant #{idx} has a limit but no duration"
                )));
            }
        }
        Ok(())
    }
}

/// Event and product ids the wallet should offer tickets for.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EventFilter {
    pub event_ids: Vec<String>,
    pub product_ids: Vec<String>,
}

/// Allow-lists enforced on a verified proof. `None` disables a check.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct VerifyConfig {
    /// Expected signer public key, compared element by element in order.
    pub signer: Option<Vec<String>>,
    pub product_id: Option<Vec<String>>,
    pub event_id: Option<Vec<String>>,
}

// ---------------------------------------------------------------------------
// GrantConfig
// ---------------------------------------------------------------------------

/// One rate-limit rule with optional perks.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GrantConfig {
    /// Trailing window in seconds.
    pub duration: u64,

    /// Maximum completed sessions in the window. 0 = no count limit.
    pub limit_count: u32,

    /// Maximum summed drop amount in the window, in base units.
    /// Zero means no amount limit. Accepts a decimal string or an integer.
    #[serde(
        serialize_with = "serialize_amount",
        deserialize_with = "deserialize_amount"
    )]
    pub limit_amount: BigUint,

    /// Exhausted required grants reject the session; exhausted optional
    /// grants are skipped without their perks.
    pub required: bool,

    /// Replaces the generated rejection message.
    pub message: Option<String>,

    /// Reward factor applied when the grant passes.
    pub reward_factor: Option<f64>,

    /// Modules to skip when the grant passes.
    pub skip_modules: Option<Vec<String>>,
}

fn serialize_amount<S: Serializer>(amount: &BigUint, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&amount.to_string())
}

fn deserialize_amount<'de, D: Deserializer<'de>>(deserializer: D) -> Result<BigUint, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Number(u64),
    }

    match Raw::deserialize(deserializer)? {
        Raw::Number(n) => Ok(BigUint::from(n)),
        Raw::Text(s) if s.trim().is_empty() => Ok(BigUint::zero()),
        Raw::Text(s) => s
            .trim()
            .parse()
            .map_err(|_| serde::de::Error::custom(format!("invalid amount: {s}"))),
    }
}
