//! Error types for the hook layer.

use tapgate_protocol::AdmissionError;
use tapgate_session::SessionError;

/// Why a hook (or a module's start/stop) failed.
///
/// Only [`HookError::Rejected`] is an intended outcome: a module decided
/// the session must not proceed. Everything else is a fault that aborts the
/// lifecycle step it happened in.
#[derive(Debug, thiserror::Error)]
pub enum HookError {
    /// Typed admission error, surfaced verbatim to the end user.
    #[error(transparent)]
    Rejected(#[from] AdmissionError),

    /// Reading or writing session data failed.
    #[error(transparent)]
    Session(#[from] SessionError),

    /// A module failed for a reason of its own (storage, I/O, ...).
    #[error("module {module} failed: {source}")]
    Module {
        module: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Two modules were registered under the same name.
    #[error("module {0} is already loaded")]
    DuplicateModule(String),
}

impl HookError {
    /// Wraps a module-specific error.
    pub fn module(
        module: impl Into<String>,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Self::Module {
            module: module.into(),
            source: source.into(),
        }
    }

    /// Returns the admission error if this is a rejection.
    pub fn as_admission(&self) -> Option<&AdmissionError> {
        match self {
            Self::Rejected(err) => Some(err),
            _ => None,
        }
    }
}
