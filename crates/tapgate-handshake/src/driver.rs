//! Runs a [`LoginMachine`] against a real popup and message channel.

use serde_json::Value;
use tapgate_protocol::AdmissionError;
use tokio::sync::mpsc;

use crate::{Effect, HandshakeError, LivenessPoller, LoginMachine, Trigger};

/// The popup window the wallet is opened in.
pub trait PopupWindow: Send {
    fn open(&mut self, url: &str);
    fn is_closed(&self) -> bool;
    fn close(&mut self);
}

enum Wake {
    Message(Option<Value>),
    Poll,
}

/// Carries out a machine's effects: opens and closes the popup, runs the
/// liveness poll, and collects errors for the host to show.
pub struct LoginDriver<P> {
    machine: LoginMachine,
    popup: P,
    poller: LivenessPoller,
    errors: Vec<AdmissionError>,
}

impl<P: PopupWindow> LoginDriver<P> {
    pub fn new(machine: LoginMachine, popup: P) -> Self {
        Self::with_poller(machine, popup, LivenessPoller::default())
    }

    pub fn with_poller(machine: LoginMachine, popup: P, poller: LivenessPoller) -> Self {
        Self {
            machine,
            popup,
            poller,
            errors: Vec::new(),
        }
    }

    pub fn machine(&self) -> &LoginMachine {
        &self.machine
    }

    pub fn popup(&self) -> &P {
        &self.popup
    }

    pub fn poller(&self) -> &LivenessPoller {
        &self.poller
    }

    /// Drains the errors surfaced so far.
    pub fn take_errors(&mut self) -> Vec<AdmissionError> {
        std::mem::take(&mut self.errors)
    }

    /// Feeds `trigger` to the machine and applies the resulting effects.
    pub fn handle(&mut self, trigger: Trigger) -> Result<(), HandshakeError> {
        for effect in self.machine.handle(trigger)? {
            self.apply(effect);
        }
        Ok(())
    }

    /// Waits for the next message or poll and handles it.
    ///
    /// Returns `false` once the message channel is closed.
    pub async fn step(&mut self, messages: &mut mpsc::Receiver<Value>) -> Result<bool, HandshakeError> {
        let wake = tokio::select! {
            message = messages.recv() => Wake::Message(message),
            _ = self.poller.wait_for_poll() => Wake::Poll,
        };

        match wake {
            Wake::Message(Some(value)) => self.handle(Trigger::Message(value))?,
            Wake::Message(None) => return Ok(false),
            Wake::Poll => {
                let popup_closed = self.popup.is_closed();
                self.handle(Trigger::PollTick { popup_closed })?;
            }
        }
        Ok(true)
    }

    /// Steps until the popup flow settles (no popup, no poll) or the
    /// channel closes.
    pub async fn run_until_settled(
        &mut self,
        messages: &mut mpsc::Receiver<Value>,
    ) -> Result<(), HandshakeError> {
        while self.machine.state().popup_active() || self.poller.is_active() {
            if !self.step(messages).await? {
                break;
            }
        }
        Ok(())
    }

    fn apply(&mut self, effect: Effect) {
        match effect {
            Effect::OpenPopup { url } => self.popup.open(&url),
            Effect::ClosePopup => self.popup.close(),
            Effect::StartPolling => self.poller.start(),
            Effect::StopPolling => self.poller.stop(),
            Effect::ShowError(error) => self.errors.push(error),
        }
    }
}
