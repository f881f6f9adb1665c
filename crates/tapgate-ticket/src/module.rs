//! The ticket admission module.
//!
//! Registers four hooks:
//!
//! | Action | Priority | Does |
//! |---|---|---|
//! | `ClientConfig` | 1 | exports wallet URLs, event filter, binding hashes |
//! | `SessionStart` | 2 | token → concurrency → grants → store identity |
//! | `SessionComplete` | 5 | persists the ticket-session record |
//! | `SessionRewardFactor` | 5 | contributes the grant factor |
//!
//! Proof verification is not a hook: the wallet calls the callback
//! endpoint, which goes through [`TicketModule::callback_page`].

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::{json, Map, Value};
use tapgate_hooks::{
    FaucetModule, HookAction, HookCallback, HookError, HookPayload, ModuleContext,
};
use tapgate_protocol::{AdmissionError, AuthInfo, AuthResult, ClientConfig, RewardFactor, SessionInput};
use tapgate_session::{DropAmount, Session, SharedSessions};

use crate::callback::render_callback_page;
use crate::codes::{TICKET_REQUIRED, TICKET_TOKEN};
use crate::grants::GrantEvaluator;
use crate::keys::{TicketAuth, TicketFactor};
use crate::limiter::check_concurrency;
use crate::store::{TicketSessionRecord, TicketSessionStore};
use crate::{ProofOracle, ProofVerifier, TicketConfig, TicketError, TokenCodec};

/// Default module name: hook owner, client-config key, storage prefix.
pub const DEFAULT_MODULE_NAME: &str = "ticket";

/// Session-input field carrying the faucet token.
pub const TOKEN_FIELD: &str = "ticketToken";

/// State shared between the module and its hooks.
struct TicketCore {
    config: TicketConfig,
    grants: GrantEvaluator,
    tokens: TokenCodec,
    store: Arc<dyn TicketSessionStore>,
}

/// Event-ticket admission module.
pub struct TicketModule {
    name: String,
    core: Arc<TicketCore>,
    verifier: ProofVerifier,
}

impl TicketModule {
    /// Builds the module.
    ///
    /// # Errors
    /// [`TicketError::Config`] if `config` doesn't validate.
    pub fn new(
        config: TicketConfig,
        store: Arc<dyn TicketSessionStore>,
        oracle: Arc<dyn ProofOracle>,
    ) -> Result<Self, TicketError> {
        config.validate()?;

        let tokens = match &config.token_secret {
            Some(secret) if !secret.is_empty() => {
                TokenCodec::new(secret.as_bytes().to_vec(), config.token_lifetime)
            }
            _ => {
                tracing::warn!("no tokenSecret configured, tokens won't survive a restart");
                TokenCodec::random(config.token_lifetime)
            }
        };

        let verifier = ProofVerifier::new(&config, oracle, tokens.clone());
        let grants = GrantEvaluator::new(&config);

        Ok(Self {
            name: DEFAULT_MODULE_NAME.to_string(),
            core: Arc::new(TicketCore {
                config,
                grants,
                tokens,
                store,
            }),
            verifier,
        })
    }

    /// Registers the module under another name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// The verifier used by the callback endpoint.
    pub fn verifier(&self) -> &ProofVerifier {
        &self.verifier
    }

    /// Verifies `proof` and returns the result.
    pub async fn verify_proof(&self, proof: Option<&str>) -> AuthResult {
        self.verifier.verify(proof).await
    }

    /// Verifies `proof` and renders the handshake page for the browser.
    pub async fn callback_page(&self, proof: Option<&str>) -> String {
        let result = self.verify_proof(proof).await;
        render_callback_page(&self.core.config.faucet_title, &self.name, &result)
    }

    /// The sub-object this module exports to the frontend.
    pub fn client_config(&self) -> Value {
        let config = &self.core.config;
        let mut out = Map::new();
        out.insert("url".into(), json!(config.wallet_url));
        out.insert("api".into(), json!(config.wallet_api_url));
        if let Some(redirect) = &config.redirect_url {
            out.insert("redirectUrl".into(), json!(redirect));
        }
        out.insert("event".into(), json!(config.event));
        out.insert("watermark".into(), json!(self.verifier.watermark()));
        out.insert("nullifier".into(), json!(self.verifier.nullifier()));
        Value::Object(out)
    }
}

#[async_trait]
impl FaucetModule for TicketModule {
    fn name(&self) -> &str {
        &self.name
    }

    fn enabled(&self) -> bool {
        self.core.config.enabled
    }

    async fn start(&self, ctx: &ModuleContext) -> Result<(), HookError> {
        let hooks: Arc<dyn HookCallback> = Arc::new(TicketHooks {
            module: self.name.clone(),
            core: Arc::clone(&self.core),
            client_config: self.client_config(),
            sessions: ctx.sessions.clone(),
        });

        let registry = &ctx.hooks;
        registry
            .register(&self.name, HookAction::ClientConfig, 1, "Ticket login config", Arc::clone(&hooks))
            .await;
        registry
            .register(&self.name, HookAction::SessionStart, 2, "Ticket login check", Arc::clone(&hooks))
            .await;
        registry
            .register(&self.name, HookAction::SessionComplete, 5, "Ticket save session", Arc::clone(&hooks))
            .await;
        registry
            .register(&self.name, HookAction::SessionRewardFactor, 5, "Ticket reward factor", hooks)
            .await;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Hooks
// ---------------------------------------------------------------------------

struct TicketHooks {
    module: String,
    core: Arc<TicketCore>,
    client_config: Value,
    sessions: SharedSessions,
}

impl TicketHooks {
    fn client_config(&self, config: &mut ClientConfig) {
        config.set_module(&self.module, self.client_config.clone());
    }

    async fn session_start(&self, session: &mut Session, input: &SessionInput) -> Result<(), HookError> {
        if session.is_module_skipped(&self.module)? {
            return Ok(());
        }

        let info = match input.field(TOKEN_FIELD) {
            Some(token) => Some(self.core.tokens.parse(token).map_err(|err| {
                tracing::warn!(module = %self.module, session_id = %session.id(), error = %err, "invalid ticket login token");
                AdmissionError::new(TICKET_TOKEN, "Invalid ticket login token")
            })?),
            None => None,
        };

        let Some(info) = info else {
            if self.core.config.require_login {
                return Err(AdmissionError::new(
                    TICKET_REQUIRED,
                    "You need to authenticate with your event ticket to use this faucet.",
                )
                .into());
            }
            return Ok(());
        };

        {
            let sessions = self.sessions.lock().await;
            check_concurrency(
                self.core.config.concurrency_limit,
                &info.attendee_id,
                session.id(),
                sessions.active_sessions(),
            )?;
        }

        let perks = self
            .core
            .grants
            .evaluate(&info.attendee_id, self.core.store.as_ref())
            .await
            .map_err(|err| err.into_hook(&self.module))?;

        session.insert_once::<TicketAuth>(&info)?;
        if let Some(factor) = perks.factor {
            session.set::<TicketFactor>(&factor)?;
        }
        if let Some(skip) = &perks.skip_modules {
            session.add_skip_modules(skip)?;
        }

        tracing::info!(
            module = %self.module,
            session_id = %session.id(),
            attendee_id = %info.attendee_id,
            factor = ?perks.factor,
            "ticket login accepted"
        );
        Ok(())
    }

    async fn session_complete(&self, session: &Session) -> Result<(), HookError> {
        let Some(info) = session.get::<TicketAuth>()? else {
            return Ok(());
        };
        let record = record_for(session, info)?;
        self.core
            .store
            .insert(record)
            .await
            .map_err(|err| err.into_hook(&self.module))
    }

    fn reward_factor(&self, session: &Session, factors: &mut Vec<RewardFactor>) -> Result<(), HookError> {
        if let Some(factor) = session.get::<TicketFactor>()? {
            factors.push(RewardFactor {
                factor,
                module: self.module.clone(),
            });
        }
        Ok(())
    }
}

fn record_for(session: &Session, info: AuthInfo) -> Result<TicketSessionRecord, HookError> {
    Ok(TicketSessionRecord {
        session_id: session.id().to_string(),
        attendee_id: info.attendee_id,
        ticket_id: info.ticket_id,
        event_id: info.event_id,
        product_id: info.product_id,
        timestamp: Utc::now().timestamp(),
        drop_amount: session.get::<DropAmount>()?.unwrap_or_else(|| "0".to_string()),
    })
}

#[async_trait]
impl HookCallback for TicketHooks {
    async fn call(&self, payload: HookPayload<'_>) -> Result<(), HookError> {
        match payload {
            HookPayload::ClientConfig(config) => {
                self.client_config(config);
                Ok(())
            }
            HookPayload::SessionStart { session, input } => self.session_start(session, input).await,
            HookPayload::SessionComplete { session } => self.session_complete(session).await,
            HookPayload::SessionRewardFactor { session, factors } => self.reward_factor(session, factors),
        }
    }
}
