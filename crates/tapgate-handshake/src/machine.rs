//! The login state machine.
//!
//! [`LoginMachine::handle`] takes a [`Trigger`], updates the state and
//! the fallback slots, and returns the [`Effect`]s the host must carry out
//! (open or close the popup, start or stop the liveness poll, show an error).
//!
//! | From | Trigger | To |
//! |---|---|---|
//! | Idle, Closed | `LoginClicked` | PopupOpen |
//! | PopupOpen | `PollTick` (alive) | AwaitingMessage |
//! | PopupOpen, AwaitingMessage | `PollTick` (closed) | Closed |
//! | any | `Message` with data | Authenticated |
//! | PopupOpen, AwaitingMessage | `Message` with error | Closed |
//! | any | `Logout` | Idle |

use serde_json::Value;
use tapgate_protocol::{AdmissionError, AuthInfo, AuthMessage, AuthResult};

use crate::storage::AuthSlots;
use crate::{HandshakeError, LoginConfig, ProofRequest};

/// Where the login currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginState {
    /// No identity, no popup.
    Idle,
    /// Popup opened, not yet seen alive by the poll.
    PopupOpen,
    /// Popup confirmed alive; waiting for the callback page's message.
    AwaitingMessage,
    /// The popup went away without producing an identity.
    Closed,
    /// An identity is loaded.
    Authenticated,
}

impl LoginState {
    /// Whether a popup is (believed to be) open.
    pub fn popup_active(self) -> bool {
        matches!(self, Self::PopupOpen | Self::AwaitingMessage)
    }
}

/// Inputs that drive the machine.
#[derive(Debug, Clone, PartialEq)]
pub enum Trigger {
    /// The login component was mounted; restore from fallback storage.
    Mounted,
    LoginClicked,
    /// The liveness poll fired.
    PollTick { popup_closed: bool },
    /// A cross-window message arrived. Untrusted: anything that isn't an
    /// [`AuthMessage`] for this module is ignored.
    Message(Value),
    Logout,
}

/// Side effects the host carries out.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    OpenPopup { url: String },
    ClosePopup,
    StartPolling,
    StopPolling,
    ShowError(AdmissionError),
}

/// Client-side login state for one auth module.
pub struct LoginMachine {
    module: String,
    config: LoginConfig,
    callback_url: String,
    slots: AuthSlots,
    state: LoginState,
    auth: Option<AuthInfo>,
}

impl LoginMachine {
    /// `callback_url` is the return URL used when the config has no
    /// `redirectUrl`.
    pub fn new(
        module: impl Into<String>,
        config: LoginConfig,
        callback_url: impl Into<String>,
        slots: AuthSlots,
    ) -> Self {
        Self {
            module: module.into(),
            config,
            callback_url: callback_url.into(),
            slots,
            state: LoginState::Idle,
            auth: None,
        }
    }

    pub fn module(&self) -> &str {
        &self.module
    }

    pub fn state(&self) -> LoginState {
        self.state
    }

    pub fn auth_info(&self) -> Option<&AuthInfo> {
        self.auth.as_ref()
    }

    /// Bearer token to send as `ticketToken` with session-start input.
    pub fn token(&self) -> Option<&str> {
        self.auth.as_ref().map(|info| info.token.as_str())
    }

    /// Applies `trigger` and returns the effects to carry out, in order.
    ///
    /// # Errors
    /// Only `LoginClicked` can fail, when the popup URL can't be built.
    pub fn handle(&mut self, trigger: Trigger) -> Result<Vec<Effect>, HandshakeError> {
        let before = self.state;
        let effects = match trigger {
            Trigger::Mounted => self.on_mounted(),
            Trigger::LoginClicked => self.on_login_clicked()?,
            Trigger::PollTick { popup_closed } => self.on_poll(popup_closed),
            Trigger::Message(value) => self.on_message(value),
            Trigger::Logout => self.on_logout(),
        };
        if before != self.state {
            tracing::debug!(module = %self.module, from = ?before, to = ?self.state, "login state changed");
        }
        Ok(effects)
    }

    fn on_mounted(&mut self) -> Vec<Effect> {
        if let Some(result) = self.slots.take_result() {
            return self.process_result(result);
        }
        if let Some(info) = self.slots.load_info() {
            self.auth = Some(info);
            self.state = LoginState::Authenticated;
        }
        Vec::new()
    }

    fn on_login_clicked(&mut self) -> Result<Vec<Effect>, HandshakeError> {
        if self.state == LoginState::Authenticated {
            return Ok(Vec::new());
        }

        let url = ProofRequest::new(&self.config, &self.callback_url).popup_url(&self.config.url)?;
        let mut effects = vec![Effect::OpenPopup { url }];
        if !self.state.popup_active() {
            effects.push(Effect::StartPolling);
        }
        self.state = LoginState::PopupOpen;
        Ok(effects)
    }

    fn on_poll(&mut self, popup_closed: bool) -> Vec<Effect> {
        if !self.state.popup_active() {
            return vec![Effect::StopPolling];
        }
        if popup_closed {
            self.state = LoginState::Closed;
            return vec![Effect::StopPolling];
        }
        self.state = LoginState::AwaitingMessage;
        Vec::new()
    }

    fn on_message(&mut self, value: Value) -> Vec<Effect> {
        let Ok(message) = serde_json::from_value::<AuthMessage>(value) else {
            return Vec::new();
        };
        if message.auth_module != self.module {
            return Vec::new();
        }
        self.process_result(message.auth_result)
    }

    fn on_logout(&mut self) -> Vec<Effect> {
        self.slots.clear_info();
        self.auth = None;
        let effects = if self.state.popup_active() {
            vec![Effect::ClosePopup, Effect::StopPolling]
        } else {
            Vec::new()
        };
        self.state = LoginState::Idle;
        effects
    }

    fn process_result(&mut self, result: AuthResult) -> Vec<Effect> {
        let mut effects = Vec::new();
        let popup_was_active = self.state.popup_active();
        if popup_was_active {
            effects.push(Effect::ClosePopup);
            effects.push(Effect::StopPolling);
        }

        if let Some(info) = result.data {
            self.slots.save_info(&info);
            tracing::info!(module = %self.module, attendee_id = %info.attendee_id, "ticket login completed");
            self.auth = Some(info);
            self.state = LoginState::Authenticated;
            return effects;
        }

        if let Some(code) = result.error_code {
            let message = result.error_message.unwrap_or_default();
            tracing::warn!(module = %self.module, %code, %message, "ticket login failed");
            effects.push(Effect::ShowError(AdmissionError::new(code, message)));
        }
        if popup_was_active {
            self.state = LoginState::Closed;
        }
        effects
    }
}
