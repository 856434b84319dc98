//! Building FSM definitions.
//!
//! - [`FsmBlueprint`] composes definitions layer by layer and hands every
//!   instance its own merged copy.
//! - [`FsmConfig`] loads shorthand definitions from JSON.

pub mod blueprint;
pub mod config;
pub mod error;

pub use blueprint::FsmBlueprint;
pub use config::FsmConfig;
pub use error::ConfigError;
