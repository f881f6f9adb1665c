//! The login config the faucet exports to its frontend.

use serde::{Deserialize, Serialize};

/// Event constraints a proof must satisfy.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EventConstraints {
    pub event_ids: Vec<String>,
    pub product_ids: Vec<String>,
}

/// The ticket module's entry in the client config
/// (`{ url, api, redirectUrl, event, watermark, nullifier }`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginConfig {
    /// Wallet frontend the popup is opened on.
    pub url: String,
    /// Wallet API base.
    #[serde(default)]
    pub api: String,
    /// Where the wallet sends the proof. Falls back to the faucet's own
    /// callback endpoint when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub redirect_url: Option<String>,
    #[serde(default)]
    pub event: EventConstraints,
    /// Decimal watermark the proof must be bound to.
    pub watermark: String,
    /// Decimal external nullifier the proof must be bound to.
    pub nullifier: String,
}
