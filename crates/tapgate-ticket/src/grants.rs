//! Grant evaluation: windowed rate and amount limits with perks.
//!
//! Grants run in configured order. For each one the attendee's completed
//! sessions inside the grant window are fetched, then:
//!
//! | Situation | `required = false` | `required = true` |
//! |---|---|---|
//! | count limit reached | skip grant | reject `TICKET_LIMIT` |
//! | amount limit set | skip grant | reject if sum ≥ limit |
//! | otherwise | apply perks | apply perks |
//!
//! A non-required grant with an amount limit never applies its perks and
//! never rejects. Perks: the reward factor is last-writer-wins and the skip
//! list of a later grant replaces an earlier one.

use num_bigint::BigUint;
use num_traits::Zero;
use tapgate_protocol::AdmissionError;

use crate::codes::TICKET_LIMIT;
use crate::render::{readable_amount, render_timespan};
use crate::store::{TicketSessionRecord, TicketSessionStore};
use crate::{GrantConfig, TicketConfig, TicketError};

/// Accumulated perks of every grant that passed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GrantPerks {
    pub factor: Option<f64>,
    pub skip_modules: Option<Vec<String>>,
}

impl GrantPerks {
    fn apply(&mut self, grant: &GrantConfig) {
        if let Some(skip) = &grant.skip_modules {
            self.skip_modules = Some(skip.clone());
        }
        if let Some(factor) = grant.reward_factor {
            self.factor = Some(factor);
        }
    }
}

/// Outcome of a single grant that didn't reject.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GrantOutcome {
    /// The grant passed; its perks apply.
    Applied,
    /// The grant is exhausted but optional; no perks, no error.
    Skipped,
}

/// Evaluates the configured grants against the ticket-session history.
#[derive(Debug, Clone)]
pub struct GrantEvaluator {
    grants: Vec<GrantConfig>,
    decimals: u32,
    symbol: String,
}

impl GrantEvaluator {
    pub fn new(config: &TicketConfig) -> Self {
        Self {
            grants: config.grants.clone(),
            decimals: config.amount_decimals,
            symbol: config.amount_symbol.clone(),
        }
    }

    /// Runs every grant for `attendee_id` and returns the merged perks.
    ///
    /// # Errors
    /// [`TicketError::Rejected`] for the first exhausted required grant,
    /// or a store error.
    pub async fn evaluate(
        &self,
        attendee_id: &str,
        store: &dyn TicketSessionStore,
    ) -> Result<GrantPerks, TicketError> {
        let mut perks = GrantPerks::default();
        for (idx, grant) in self.grants.iter().enumerate() {
            let history = store.sessions_since(attendee_id, grant.duration).await?;
            match self.check(grant, &history)? {
                GrantOutcome::Applied => perks.apply(grant),
                GrantOutcome::Skipped => {
                    tracing::debug!(attendee_id, grant = idx, sessions = history.len(), "grant exhausted, skipped");
                }
            }
        }
        Ok(perks)
    }

    /// Checks one grant against the attendee's history inside its window.
    pub fn check(
        &self,
        grant: &GrantConfig,
        history: &[TicketSessionRecord],
    ) -> Result<GrantOutcome, AdmissionError> {
        let count = history.len();
        if grant.limit_count > 0 && count >= grant.limit_count as usize {
            if !grant.required {
                return Ok(GrantOutcome::Skipped);
            }
            let message = grant.message.clone().unwrap_or_else(|| {
                format!(
                    "You have already created {count} {} in the last {}",
                    if count > 1 { "sessions" } else { "session" },
                    render_timespan(grant.duration)
                )
            });
            return Err(AdmissionError::new(TICKET_LIMIT, message));
        }

        if !grant.limit_amount.is_zero() {
            if !grant.required {
                return Ok(GrantOutcome::Skipped);
            }
            let total: BigUint = history.iter().map(TicketSessionRecord::drop_amount).sum();
            if total >= grant.limit_amount {
                let message = grant.message.clone().unwrap_or_else(|| {
                    format!(
                        "You have already requested {} in the last {}",
                        readable_amount(&total, self.decimals, &self.symbol),
                        render_timespan(grant.duration)
                    )
                });
                return Err(AdmissionError::new(TICKET_LIMIT, message));
            }
        }

        Ok(GrantOutcome::Applied)
    }
}
