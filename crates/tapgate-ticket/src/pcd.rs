//! Ticket proof (PCD) structures and the verification oracle.
//!
//! The wallet returns a serialized PCD envelope:
//!
//! ```json
//! { "type": "zk-eddsa-event-ticket-pcd", "pcd": "<ticket proof as a JSON string>" }
//! ```
//!
//! The embedded ticket proof carries a `claim` with the revealed ticket
//! fields, the signer public key, and the two binding values (watermark,
//! external nullifier), plus the zero-knowledge `proof` itself. This crate
//! only reads the claim; checking the proof is the [`ProofOracle`]'s job.

use async_trait::async_trait;
use num_bigint::BigUint;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::TicketError;

/// The only envelope type the verifier accepts.
pub const TICKET_PCD_TYPE: &str = "zk-eddsa-event-ticket-pcd";

/// Outer serialized-PCD wrapper.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PcdEnvelope {
    #[serde(rename = "type", default)]
    pub pcd_type: String,
    /// The ticket proof, itself JSON-encoded. Left untyped so a wrong
    /// envelope type is reported before a missing or malformed proof.
    #[serde(default)]
    pub pcd: Value,
}

/// A zero-knowledge event-ticket proof.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TicketPcd {
    #[serde(default)]
    pub id: String,
    pub claim: TicketClaim,
    /// Opaque proof material, handed to the oracle untouched.
    #[serde(default)]
    pub proof: Value,
}

/// What the proof claims.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TicketClaim {
    #[serde(default)]
    pub partial_ticket: PartialTicket,
    /// Decimal big integer.
    pub watermark: String,
    /// Signer public key, as the wallet lists it.
    #[serde(default)]
    pub signer: Vec<String>,
    /// Decimal big integer.
    #[serde(default)]
    pub external_nullifier: Option<String>,
    #[serde(default)]
    pub nullifier_hash: Option<String>,
    #[serde(default)]
    pub valid_event_ids: Option<Vec<String>>,
}

/// The selectively revealed ticket fields. Unrevealed fields are absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartialTicket {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ticket_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attendee_semaphore_id: Option<String>,
}

impl PartialTicket {
    /// Field names that must be revealed, in the order they are checked.
    pub const REQUIRED_FIELDS: [&'static str; 4] =
        ["productId", "eventId", "attendeeSemaphoreId", "ticketId"];

    /// Returns a revealed field by its wire name.
    pub fn field(&self, name: &str) -> Option<&str> {
        match name {
            "ticketId" => self.ticket_id.as_deref(),
            "eventId" => self.event_id.as_deref(),
            "productId" => self.product_id.as_deref(),
            "attendeeSemaphoreId" => self.attendee_semaphore_id.as_deref(),
            _ => None,
        }
    }

    /// The first required field that was not revealed.
    pub fn first_missing(&self) -> Option<&'static str> {
        Self::REQUIRED_FIELDS
            .into_iter()
            .find(|name| self.field(name).is_none())
    }
}

// ---------------------------------------------------------------------------
// Oracle
// ---------------------------------------------------------------------------

/// Checks the cryptographic integrity of a ticket proof.
///
/// The zero-knowledge verification lives outside this crate. Deployments
/// plug in whatever verifies their proof system.
///
/// ```rust
/// use async_trait::async_trait;
/// use tapgate_ticket::{ProofOracle, TicketError, TicketPcd};
///
/// /// Trusts every proof. Tests only.
/// struct TrustingOracle;
///
/// #[async_trait]
/// impl ProofOracle for TrustingOracle {
///     async fn verify(&self, _pcd: &TicketPcd) -> Result<bool, TicketError> {
///         Ok(true)
///     }
/// }
/// ```
#[async_trait]
pub trait ProofOracle: Send + Sync + 'static {
    /// `Ok(false)` for a proof that doesn't verify; `Err` when no verdict
    /// could be reached.
    async fn verify(&self, pcd: &TicketPcd) -> Result<bool, TicketError>;
}

/// Hashes a binding string the way the proof circuit expects it:
/// keccak-256 of the UTF-8 bytes, shifted right by 8 bits to fit the field.
pub fn message_hash(message: &str) -> BigUint {
    let digest = keccak_hash::keccak(message.as_bytes());
    BigUint::from_bytes_be(digest.as_bytes()) >> 8u32
}
