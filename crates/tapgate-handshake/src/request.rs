//! Proof request sent to the ticket wallet.
//!
//! The request travels as JSON in the URL fragment:
//! `<wallet>#/prove?request=<encodeURIComponent(json)>`.

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde::Serialize;
use serde_json::{json, Value};

use crate::{HandshakeError, LoginConfig};

/// PCD type the faucet asks the wallet to prove.
pub const REQUESTED_PCD_TYPE: &str = "zk-eddsa-event-ticket-pcd";

/// Characters `encodeURIComponent` leaves alone, besides alphanumerics.
const URI_COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// Display options for the wallet's prove screen.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProveOptions {
    pub generic_prove_screen: bool,
    pub title: String,
    pub description: String,
}

impl Default for ProveOptions {
    fn default() -> Self {
        Self {
            generic_prove_screen: true,
            title: "ZKEdDSA Proof".into(),
            description: "zkeddsa ticket pcd request".into(),
        }
    }
}

/// A wallet `Get` request for an event-ticket proof.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProofRequest {
    #[serde(rename = "type")]
    pub request_type: String,
    pub return_url: String,
    pub pcd_type: String,
    pub args: Value,
    pub options: ProveOptions,
}

impl ProofRequest {
    /// Builds the request for `config`.
    ///
    /// `default_return_url` is used when the config has no `redirectUrl`,
    /// normally the faucet's `/api/ticketCallback`.
    pub fn new(config: &LoginConfig, default_return_url: &str) -> Self {
        let event = &config.event;
        let valid_event_ids = if event.event_ids.is_empty() {
            Value::Null
        } else {
            json!(event.event_ids)
        };

        let args = json!({
            "ticket": {
                "argumentType": "PCD",
                "pcdType": "eddsa-ticket-pcd",
                "userProvided": true,
                "validatorParams": {
                    "eventIds": event.event_ids,
                    "productIds": event.product_ids,
                    "notFoundMessage": "No eligible PCDs found",
                },
            },
            "identity": {
                "argumentType": "PCD",
                "pcdType": "semaphore-identity-pcd",
                "userProvided": true,
            },
            "validEventIds": {
                "argumentType": "StringArray",
                "value": valid_event_ids,
                "userProvided": false,
            },
            "fieldsToReveal": {
                "argumentType": "ToggleList",
                "value": {
                    "revealTicketId": true,
                    "revealEventId": true,
                    "revealAttendeeSemaphoreId": true,
                    "revealProductId": true,
                },
                "userProvided": false,
            },
            "externalNullifier": {
                "argumentType": "BigInt",
                "value": config.nullifier,
                "userProvided": false,
            },
            "watermark": {
                "argumentType": "BigInt",
                "value": config.watermark,
                "userProvided": false,
            },
        });

        Self {
            request_type: "Get".into(),
            return_url: config
                .redirect_url
                .clone()
                .unwrap_or_else(|| default_return_url.to_string()),
            pcd_type: REQUESTED_PCD_TYPE.into(),
            args,
            options: ProveOptions::default(),
        }
    }

    /// The URL to open the wallet popup on.
    pub fn popup_url(&self, wallet_url: &str) -> Result<String, HandshakeError> {
        if wallet_url.is_empty() {
            return Err(HandshakeError::Config("wallet url is empty".into()));
        }
        let json = serde_json::to_string(self)?;
        Ok(format!(
            "{wallet_url}#/prove?request={}",
            utf8_percent_encode(&json, URI_COMPONENT)
        ))
    }
}
