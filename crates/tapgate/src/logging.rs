//! Tracing setup.

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use crate::TapgateError;

/// Installs the global subscriber: `RUST_LOG` if set, else `default_filter`,
/// formatted to stdout.
///
/// # Errors
/// [`TapgateError::Config`] if the filter doesn't parse or a subscriber is
/// already installed.
pub fn init(default_filter: &str) -> Result<(), TapgateError> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(default_filter)
            .map_err(|err| TapgateError::Config(format!("invalid log filter {default_filter:?}: {err}")))?,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .try_init()
        .map_err(|err| TapgateError::Config(format!("logging already initialized: {err}")))
}
