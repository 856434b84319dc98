//! Configuration errors for declarative FSM definitions.

use thiserror::Error;

/// Errors that can occur when loading an FSM configuration.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("Failed to parse configuration: {0}")]
    Parse(String),

    #[error("State names must not be empty")]
    EmptyStateName,

    #[error("Input '{input}' in state '{state}' has an empty target state")]
    EmptyTarget { state: String, input: String },
}
