//! Session lifecycle controller.
//!
//! Drives one session through the module pipeline:
//!
//! ```text
//! start(input)
//!   └─ SessionStart hooks ──reject──▶ Failed (never registered)
//!         │ ok
//!         ▼
//!      Running, registered
//!         │
//! complete(id) ── evict ─▶ SessionRewardFactor ─▶ DropAmount ─▶ SessionComplete ─▶ Completed
//! fail(id)     ── evict ─▶ Failed
//! ```
//!
//! Neither the registry lock nor the hook registry lock is held while hooks
//! run: a starting session lives outside the registry until its hooks pass,
//! and a completing one is evicted before its hooks run.

use std::sync::Arc;

use num_bigint::BigUint;
use num_traits::{FromPrimitive, Zero};
use tapgate_hooks::{HookPayload, HookRegistry, ModuleContext};
use tapgate_protocol::{ClientConfig, RewardFactor, SessionId, SessionInput};
use tapgate_session::{DropAmount, Session, SessionStatus, SharedSessions, TargetAddress};
use tracing::{info, warn};

use crate::TapgateError;

/// Fixed-point precision for applying reward factors to integer amounts.
const FACTOR_SCALE: u64 = 1_000_000;

/// Multiplies all factors together. A non-finite or negative product
/// counts as zero.
pub fn combine_factors(factors: &[RewardFactor]) -> f64 {
    let product: f64 = factors.iter().map(|f| f.factor).product();
    if product.is_finite() && product > 0.0 {
        product
    } else {
        0.0
    }
}

/// `base * factor`, with the factor rounded to six decimal places.
///
/// The whole part of the factor is converted exactly, so factors past
/// `u64::MAX / 10^6` don't saturate.
pub fn scale_amount(base: &BigUint, factor: f64) -> BigUint {
    if !factor.is_finite() || factor <= 0.0 {
        return BigUint::zero();
    }
    let mut whole = factor.trunc();
    let mut micros = ((factor - whole) * FACTOR_SCALE as f64).round() as u64;
    if micros >= FACTOR_SCALE {
        whole += 1.0;
        micros -= FACTOR_SCALE;
    }
    let Some(whole) = BigUint::from_f64(whole) else {
        return BigUint::zero();
    };
    base * whole + base * BigUint::from(micros) / BigUint::from(FACTOR_SCALE)
}

/// A session that went through completion.
#[derive(Debug, Clone)]
pub struct CompletedSession {
    pub session: Session,
    pub amount: BigUint,
    pub factors: Vec<RewardFactor>,
}

pub struct SessionController {
    hooks: Arc<HookRegistry>,
    sessions: SharedSessions,
    base_amount: BigUint,
}

impl SessionController {
    pub fn new(hooks: Arc<HookRegistry>, sessions: SharedSessions, base_amount: BigUint) -> Self {
        Self {
            hooks,
            sessions,
            base_amount,
        }
    }

    /// A controller over the same registries the modules were started with.
    pub fn from_context(ctx: &ModuleContext, base_amount: BigUint) -> Self {
        Self::new(Arc::clone(&ctx.hooks), ctx.sessions.clone(), base_amount)
    }

    pub fn sessions(&self) -> &SharedSessions {
        &self.sessions
    }

    pub fn base_amount(&self) -> &BigUint {
        &self.base_amount
    }

    /// Collects every module's frontend config.
    pub async fn client_config(&self) -> Result<ClientConfig, TapgateError> {
        let mut config = ClientConfig::default();
        self.hooks.dispatch(HookPayload::ClientConfig(&mut config)).await?;
        Ok(config)
    }

    /// Runs the start hooks and, if they all pass, registers the session as
    /// running.
    ///
    /// # Errors
    /// The first hook error, typically [`HookError::Rejected`](tapgate_hooks::HookError::Rejected).
    /// A rejected session is never registered.
    pub async fn start(&self, input: SessionInput) -> Result<Session, TapgateError> {
        let mut session = Session::new(SessionId::generate());
        session.set::<TargetAddress>(&input.addr)?;

        let started = self
            .hooks
            .dispatch(HookPayload::SessionStart {
                session: &mut session,
                input: &input,
            })
            .await;

        if let Err(err) = started {
            session.transition(SessionStatus::Failed)?;
            match err.as_admission() {
                Some(rejection) => {
                    info!(session_id = %session.id(), code = %rejection.code, "session rejected")
                }
                None => warn!(session_id = %session.id(), error = %err, "session start failed"),
            }
            return Err(err.into());
        }

        session.transition(SessionStatus::Running)?;
        self.sessions.lock().await.insert(session.clone())?;
        info!(session_id = %session.id(), target = %input.addr, "session started");
        Ok(session)
    }

    /// Evicts a running session, computes its drop amount from the reward
    /// factors and runs the completion hooks.
    ///
    /// # Errors
    /// [`SessionError::NotFound`](tapgate_session::SessionError::NotFound)
    /// if `id` isn't running, or the first hook error (the session is then
    /// failed).
    pub async fn complete(&self, id: &SessionId) -> Result<CompletedSession, TapgateError> {
        let mut session = self.sessions.lock().await.remove(id)?;

        match self.finish(&mut session).await {
            Ok((amount, factors)) => {
                info!(session_id = %id, %amount, factors = factors.len(), "session completed");
                Ok(CompletedSession {
                    session,
                    amount,
                    factors,
                })
            }
            Err(err) => {
                session.transition(SessionStatus::Failed)?;
                warn!(session_id = %id, error = %err, "session completion failed");
                Err(err)
            }
        }
    }

    async fn finish(&self, session: &mut Session) -> Result<(BigUint, Vec<RewardFactor>), TapgateError> {
        let mut factors = Vec::new();
        self.hooks
            .dispatch(HookPayload::SessionRewardFactor {
                session: &*session,
                factors: &mut factors,
            })
            .await?;

        let amount = scale_amount(&self.base_amount, combine_factors(&factors));
        session.set::<DropAmount>(&amount.to_string())?;

        self.hooks.dispatch(HookPayload::SessionComplete { session: &*session }).await?;
        session.transition(SessionStatus::Completed)?;
        Ok((amount, factors))
    }

    /// Evicts a running session as failed. No hooks run.
    pub async fn fail(&self, id: &SessionId, reason: &str) -> Result<Session, TapgateError> {
        let mut session = self.sessions.lock().await.remove(id)?;
        session.transition(SessionStatus::Failed)?;
        warn!(session_id = %id, reason, "session failed");
        Ok(session)
    }

    /// Fails and evicts sessions past the configured timeout.
    pub async fn expire_stale(&self) -> Vec<Session> {
        self.sessions.lock().await.expire_stale()
    }
}
