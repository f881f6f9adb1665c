//! `TapgateServer` builder and HTTP routes.
//!
//! | Route | Does |
//! |---|---|
//! | `GET /api/ticketCallback?proof=…` | verifies a wallet proof, returns the handshake page |
//! | `GET /api/clientConfig` | every module's frontend config |
//! | `POST /api/startSession` | runs the start hooks on a [`SessionInput`] |
//! | `POST /api/completeSession` | applies reward factors, persists, evicts |

use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Query, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use num_bigint::BigUint;
use serde::{Deserialize, Serialize};
use tapgate_hooks::{FaucetModule, HookRegistry, ModuleContext, ModuleManager};
use tapgate_protocol::{ClientConfig, RewardFactor, SessionId, SessionInput};
use tapgate_session::{SessionConfig, SessionManager};
use tapgate_ticket::{ProofOracle, TicketModule, CALLBACK_CONTENT_TYPE};
use tokio::net::TcpListener;

use crate::{ServerConfig, SessionController, TapgateError};

/// How often stale sessions are swept.
const EXPIRY_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// Shared state handed to every request handler.
#[derive(Clone)]
struct AppState {
    controller: Arc<SessionController>,
    ticket: Option<Arc<TicketModule>>,
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

/// Builder for configuring and starting a Tapgate server.
///
/// ```rust,ignore
/// let server = TapgateServer::builder()
///     .bind("0.0.0.0:8080")
///     .ticket(TicketModule::new(config, store, oracle)?)
///     .build()
///     .await?;
/// server.run().await
/// ```
pub struct TapgateServerBuilder {
    bind_addr: String,
    session_config: SessionConfig,
    base_amount: BigUint,
    ticket: Option<Arc<TicketModule>>,
    modules: Vec<Arc<dyn FaucetModule>>,
}

impl TapgateServerBuilder {
    pub fn new() -> Self {
        Self {
            bind_addr: "127.0.0.1:8080".to_string(),
            session_config: SessionConfig::default(),
            base_amount: BigUint::from(10u64).pow(18),
            ticket: None,
            modules: Vec::new(),
        }
    }

    /// Takes address, base amount and session timeout from `config`.
    pub fn from_config(config: &ServerConfig) -> Result<Self, TapgateError> {
        Ok(Self::new()
            .bind(&config.bind_addr)
            .base_amount(config.base_amount()?)
            .session_config(config.session_config()))
    }

    /// [`from_config`](Self::from_config), plus the ticket module when
    /// `ticket.enabled` is set, recording sessions in the sled database at
    /// `dbPath`.
    pub fn from_config_with_oracle(
        config: &ServerConfig,
        oracle: Arc<dyn ProofOracle>,
    ) -> Result<Self, TapgateError> {
        let builder = Self::from_config(config)?;
        if !config.ticket.enabled {
            tracing::info!("ticket login disabled");
            return Ok(builder);
        }
        let store = Arc::new(config.open_ticket_store()?);
        let ticket = TicketModule::new(config.ticket.clone(), store, oracle)?;
        Ok(builder.ticket(ticket))
    }

    pub fn bind(mut self, addr: &str) -> Self {
        self.bind_addr = addr.to_string();
        self
    }

    pub fn session_config(mut self, config: SessionConfig) -> Self {
        self.session_config = config;
        self
    }

    /// Drop amount before reward factors, in base units.
    pub fn base_amount(mut self, amount: BigUint) -> Self {
        self.base_amount = amount;
        self
    }

    /// Loads the ticket module and serves its callback route. A module whose
    /// config is disabled is neither started nor routed.
    pub fn ticket(mut self, module: TicketModule) -> Self {
        self.ticket = Some(Arc::new(module));
        self
    }

    /// Loads another admission module. Modules start in the order added,
    /// after the ticket module.
    pub fn module(mut self, module: Arc<dyn FaucetModule>) -> Self {
        self.modules.push(module);
        self
    }

    /// Starts every module and binds the listener.
    pub async fn build(self) -> Result<TapgateServer, TapgateError> {
        let context = ModuleContext {
            hooks: Arc::new(HookRegistry::new()),
            sessions: SessionManager::shared(self.session_config),
        };

        let mut modules = ModuleManager::new(context.clone());
        if let Some(ticket) = &self.ticket {
            modules.load(Arc::clone(ticket) as Arc<dyn FaucetModule>).await?;
        }
        for module in self.modules {
            modules.load(module).await?;
        }

        let listener = TcpListener::bind(&self.bind_addr).await?;
        let controller = Arc::new(SessionController::from_context(&context, self.base_amount));

        Ok(TapgateServer {
            listener,
            modules,
            state: AppState {
                controller,
                ticket: self.ticket.filter(|ticket| ticket.enabled()),
            },
        })
    }
}

impl Default for TapgateServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Server
// ---------------------------------------------------------------------------

/// A bound Tapgate server. Call [`run()`](Self::run) to start serving.
pub struct TapgateServer {
    listener: TcpListener,
    modules: ModuleManager,
    state: AppState,
}

impl TapgateServer {
    pub fn builder() -> TapgateServerBuilder {
        TapgateServerBuilder::new()
    }

    pub fn local_addr(&self) -> std::io::Result<std::net::SocketAddr> {
        self.listener.local_addr()
    }

    pub fn controller(&self) -> &Arc<SessionController> {
        &self.state.controller
    }

    /// Names of the loaded modules, in start order.
    pub fn module_names(&self) -> Vec<String> {
        self.modules.module_names()
    }

    /// The HTTP routes, without the listener.
    pub fn router(&self) -> Router {
        router(self.state.clone())
    }

    /// Serves until Ctrl-C, then stops every module.
    pub async fn run(mut self) -> Result<(), TapgateError> {
        tracing::info!(addr = ?self.listener.local_addr().ok(), modules = ?self.module_names(), "Tapgate server running");

        let sweeper = tokio::spawn(sweep_stale(Arc::clone(&self.state.controller)));
        let served = axum::serve(self.listener, router(self.state.clone()))
            .with_graceful_shutdown(shutdown_signal())
            .await;
        sweeper.abort();

        self.modules.stop_all().await?;
        served?;
        Ok(())
    }
}

async fn sweep_stale(controller: Arc<SessionController>) {
    let mut interval = tokio::time::interval(EXPIRY_SWEEP_INTERVAL);
    loop {
        interval.tick().await;
        let expired = controller.expire_stale().await;
        if !expired.is_empty() {
            tracing::info!(count = expired.len(), "expired stale sessions");
        }
    }
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown requested");
}

// ---------------------------------------------------------------------------
// Routes
// ---------------------------------------------------------------------------

fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/ticketCallback", get(ticket_callback))
        .route("/api/clientConfig", get(client_config))
        .route("/api/startSession", post(start_session))
        .route("/api/completeSession", post(complete_session))
        .with_state(state)
}

#[derive(Debug, Deserialize)]
struct CallbackQuery {
    proof: Option<String>,
}

async fn ticket_callback(
    State(state): State<AppState>,
    Query(query): Query<CallbackQuery>,
) -> Result<Response, TapgateError> {
    let ticket = state
        .ticket
        .as_ref()
        .ok_or_else(|| TapgateError::ModuleDisabled(tapgate_ticket::DEFAULT_MODULE_NAME.into()))?;

    let page = ticket.callback_page(query.proof.as_deref()).await;
    Ok(([(header::CONTENT_TYPE, CALLBACK_CONTENT_TYPE)], page).into_response())
}

async fn client_config(State(state): State<AppState>) -> Result<Json<ClientConfig>, TapgateError> {
    Ok(Json(state.controller.client_config().await?))
}

#[derive(Debug, Serialize, Deserialize)]
pub struct StartSessionResponse {
    pub session: String,
    pub status: String,
    pub target: String,
}

async fn start_session(
    State(state): State<AppState>,
    Json(input): Json<SessionInput>,
) -> Result<Json<StartSessionResponse>, TapgateError> {
    let target = input.addr.clone();
    let session = state.controller.start(input).await?;
    Ok(Json(StartSessionResponse {
        session: session.id().to_string(),
        status: session.status().to_string(),
        target,
    }))
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CompleteSessionRequest {
    pub session: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CompleteSessionResponse {
    pub session: String,
    /// Drop amount in base units, as a decimal string.
    pub amount: String,
    pub factors: Vec<RewardFactor>,
}

async fn complete_session(
    State(state): State<AppState>,
    Json(request): Json<CompleteSessionRequest>,
) -> Result<Json<CompleteSessionResponse>, TapgateError> {
    let id = SessionId(request.session);
    let completed = state.controller.complete(&id).await?;
    Ok(Json(CompleteSessionResponse {
        session: id.to_string(),
        amount: completed.amount.to_string(),
        factors: completed.factors,
    }))
}
