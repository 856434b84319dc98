//! Engine errors.

use crate::builder::ConfigError;
use thiserror::Error;

/// Errors that abort an engine operation.
///
/// Only identity and configuration problems are errors. Unroutable input,
/// invalid transition targets and deferral misuse are reported as events.
#[derive(Debug, Error)]
pub enum FsmError {
    #[error("Client identity could not be resolved")]
    ClientNotFound,

    #[error("No initial state specified. Call .initial_state(name) on the definition")]
    MissingInitialState,

    #[error("Initial state '{state}' does not exist in the states map")]
    UnknownInitialState { state: String },

    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),
}
