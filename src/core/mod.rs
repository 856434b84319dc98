//! Core FSM data model.
//!
//! This module contains the plain data the engine operates on:
//! - Definitions: states, handlers, entry/exit hooks
//! - Client identity and the per-client metadata record
//! - Deferred input records
//!
//! Nothing here dispatches input or emits events; that lives in
//! [`crate::engine`].

mod client;
mod definition;
mod meta;

pub use client::{Client, ClientId};
pub use definition::{
    next_namespace, Action, FsmDefinition, Handler, Hook, StateDefinition, CATCH_ALL,
    DEFAULT_INITIAL_STATE,
};
pub use meta::{ClientMeta, Input, QueueKind, QueuedInput};
