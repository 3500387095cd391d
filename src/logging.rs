use std::sync::OnceLock;

use failure::Fail;
use tracing_subscriber::EnvFilter;

static INITIALISED: OnceLock<()> = OnceLock::new();

/// Variable read for the filter directives, e.g. `CONVKIT_LOG=convkit=trace`.
pub const LOG_ENV_VAR: &str = "CONVKIT_LOG";

const DEFAULT_FILTER: &str = "info";

/// Installs a formatting subscriber as the global default. Only the first
/// call in a process succeeds.
pub fn init_tracing() -> Result<(), InitError> {
    INITIALISED
        .set(())
        .map_err(|_| InitError::AlreadyInitialised)?;

    let filter =
        EnvFilter::try_from_env(LOG_ENV_VAR).unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init()
        .map_err(|e| InitError::Subscriber(e.to_string()))
}

#[derive(Debug, Fail, PartialEq, Eq)]
pub enum InitError {
    #[fail(display = "tracing has already been initialised")]
    AlreadyInitialised,

    #[fail(display = "failed to install tracing subscriber: {}", _0)]
    Subscriber(String),
}
