//! Ticket proof verification.
//!
//! A linear fail-fast pipeline. Each stage either passes or produces a
//! terminal `(errorCode, errorMessage)` pair, and nothing after the first
//! failure runs:
//!
//! ```text
//! proof param → decode envelope → type → parse ticket → oracle
//!   → watermark → nullifier → revealed fields → signer → product → event
//!   → AuthInfo + faucet token
//! ```
//!
//! Failures never escape as errors. [`ProofVerifier::verify`] always
//! returns an [`AuthResult`], which the callback page relays to the browser.

use std::sync::Arc;

use percent_encoding::percent_decode_str;
use tapgate_protocol::{AdmissionError, AuthInfo, AuthResult};

use crate::codes::{INVALID_PCD, PROOF_MISSING};
use crate::pcd::{message_hash, PcdEnvelope, ProofOracle, TicketPcd, TICKET_PCD_TYPE};
use crate::{TicketConfig, TokenCodec, VerifyConfig};

fn invalid(message: impl Into<String>) -> AdmissionError {
    AdmissionError::new(INVALID_PCD, message)
}

/// Validates ticket proofs returned by the wallet.
pub struct ProofVerifier {
    oracle: Arc<dyn ProofOracle>,
    tokens: TokenCodec,
    verify: VerifyConfig,
    watermark: String,
    nullifier: String,
}

impl ProofVerifier {
    /// Builds a verifier for `config`. The watermark and nullifier hashes
    /// are computed once here.
    pub fn new(config: &TicketConfig, oracle: Arc<dyn ProofOracle>, tokens: TokenCodec) -> Self {
        Self {
            oracle,
            tokens,
            verify: config.verify.clone(),
            watermark: message_hash(&config.watermark).to_string(),
            nullifier: message_hash(&config.external_nullifier).to_string(),
        }
    }

    /// The watermark hash proofs must carry, as a decimal string.
    pub fn watermark(&self) -> &str {
        &self.watermark
    }

    /// The external-nullifier hash proofs must carry, as a decimal string.
    pub fn nullifier(&self) -> &str {
        &self.nullifier
    }

    /// Runs the pipeline on the raw `proof` query value.
    pub async fn verify(&self, proof: Option<&str>) -> AuthResult {
        match self.run(proof).await {
            Ok(info) => {
                tracing::info!(
                    attendee_id = %info.attendee_id,
                    ticket_id = %info.ticket_id,
                    event_id = %info.event_id,
                    "ticket proof accepted"
                );
                AuthResult::success(info)
            }
            Err(err) => {
                tracing::debug!(code = %err.code, message = %err.message, "ticket proof rejected");
                AuthResult::failure(err.code, err.message)
            }
        }
    }

    async fn run(&self, proof: Option<&str>) -> Result<AuthInfo, AdmissionError> {
        let proof = proof.filter(|p| !p.is_empty()).ok_or_else(|| {
            AdmissionError::new(PROOF_MISSING, "Missing proof in ticket PCD authentication flow.")
        })?;

        let envelope = Self::decode_envelope(proof)?;
        if envelope.pcd_type != TICKET_PCD_TYPE {
            return Err(invalid("Invalid ticket PCD type."));
        }

        let ticket: TicketPcd = envelope
            .pcd
            .as_str()
            .and_then(|raw| serde_json::from_str(raw).ok())
            .ok_or_else(|| invalid("Malformed ticket PCD."))?;

        match self.oracle.verify(&ticket).await {
            Ok(true) => {}
            Ok(false) => return Err(invalid("Failed validating PCD integrity.")),
            Err(err) => {
                tracing::warn!(error = %err, "proof oracle failed");
                return Err(invalid("Failed validating PCD integrity."));
            }
        }

        let claim = &ticket.claim;
        if claim.watermark != self.watermark {
            return Err(invalid("Invalid PCD watermark."));
        }
        if claim.external_nullifier.as_deref() != Some(self.nullifier.as_str()) {
            return Err(invalid("Invalid PCD nullifier."));
        }

        if let Some(field) = claim.partial_ticket.first_missing() {
            return Err(invalid(format!("Missing PCD field: {field}.")));
        }
        let revealed = &claim.partial_ticket;
        let product_id = revealed.product_id.clone().unwrap_or_default();
        let event_id = revealed.event_id.clone().unwrap_or_default();

        if let Some(signer) = &self.verify.signer {
            if claim.signer.join(",") != signer.join(",") {
                return Err(invalid("PCD verification failed: invalid signer."));
            }
        }
        if let Some(allowed) = &self.verify.product_id {
            if !allowed.contains(&product_id) {
                return Err(invalid("PCD verification failed: invalid productId."));
            }
        }
        if let Some(allowed) = &self.verify.event_id {
            if !allowed.contains(&event_id) {
                return Err(invalid("PCD verification failed: invalid eventId."));
            }
        }

        let info = AuthInfo {
            ticket_id: revealed.ticket_id.clone().unwrap_or_default(),
            product_id,
            event_id,
            attendee_id: revealed.attendee_semaphore_id.clone().unwrap_or_default(),
            token: String::new(),
        };
        self.tokens.issue(info).map_err(|err| {
            tracing::error!(error = %err, "failed issuing faucet token");
            invalid("Failed issuing faucet token.")
        })
    }

    /// The query value is URL-encoded JSON; decode it once more before
    /// parsing, the way the wallet double-encodes it.
    fn decode_envelope(proof: &str) -> Result<PcdEnvelope, AdmissionError> {
        let decoded = percent_decode_str(proof)
            .decode_utf8()
            .map_err(|_| invalid("Malformed PCD envelope."))?;
        serde_json::from_str(&decoded).map_err(|_| invalid("Malformed PCD envelope."))
    }
}
