//! Lifecycle events published by the engine.

use crate::core::{ClientId, ClientMeta, QueuedInput};
use crate::engine::BehavioralFsm;
use serde_json::Value;
use std::fmt;

/// Subscription key that matches every event.
pub const WILDCARD: &str = "*";

/// Discriminant of an [`Event`], mapped to its wire name.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EventKind {
    Handling,
    Handled,
    Transition,
    InvalidState,
    Deferred,
    NoHandler,
    NewFsm,
    Registered,
}

impl EventKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Handling => "handling",
            Self::Handled => "handled",
            Self::Transition => "transition",
            Self::InvalidState => "invalidState",
            Self::Deferred => "deferred",
            Self::NoHandler => "noHandler",
            Self::NewFsm => "newFsm",
            Self::Registered => "registered",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An event as seen by listeners. Borrowed fields point at the client or
/// FSM that produced it and are only valid for the duration of the call.
pub enum Event<'a, C> {
    Handling {
        client: &'a C,
        input_type: String,
    },
    Handled {
        client: &'a C,
        input_type: String,
    },
    Transition {
        client_id: ClientId,
        from_state: Option<String>,
        action: String,
        to_state: String,
    },
    InvalidState {
        client_id: ClientId,
        state: Option<String>,
        attempted_state: String,
    },
    Deferred {
        client_id: ClientId,
        state: Option<String>,
        queued: QueuedInput,
    },
    NoHandler {
        client_id: ClientId,
        state: Option<String>,
        input_type: String,
    },
    NewFsm {
        fsm: &'a BehavioralFsm<C>,
    },
    Registered {
        meta: ClientMeta,
    },
    /// Host- or handler-defined event.
    Custom {
        name: String,
        payload: Value,
    },
}

impl<C> Event<'_, C> {
    /// Name listeners subscribe with.
    pub fn name(&self) -> &str {
        match self {
            Self::Custom { name, .. } => name.as_str(),
            other => other.kind().map_or(WILDCARD, EventKind::as_str),
        }
    }

    /// Built-in kind, or `None` for custom events.
    pub fn kind(&self) -> Option<EventKind> {
        Some(match self {
            Self::Handling { .. } => EventKind::Handling,
            Self::Handled { .. } => EventKind::Handled,
            Self::Transition { .. } => EventKind::Transition,
            Self::InvalidState { .. } => EventKind::InvalidState,
            Self::Deferred { .. } => EventKind::Deferred,
            Self::NoHandler { .. } => EventKind::NoHandler,
            Self::NewFsm { .. } => EventKind::NewFsm,
            Self::Registered { .. } => EventKind::Registered,
            Self::Custom { .. } => return None,
        })
    }
}

impl<C> fmt::Debug for Event<'_, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Handling { input_type, .. } => f
                .debug_struct("Handling")
                .field("input_type", input_type)
                .finish_non_exhaustive(),
            Self::Handled { input_type, .. } => f
                .debug_struct("Handled")
                .field("input_type", input_type)
                .finish_non_exhaustive(),
            Self::Transition {
                client_id,
                from_state,
                action,
                to_state,
            } => f
                .debug_struct("Transition")
                .field("client_id", client_id)
                .field("from_state", from_state)
                .field("action", action)
                .field("to_state", to_state)
                .finish(),
            Self::InvalidState {
                client_id,
                state,
                attempted_state,
            } => f
                .debug_struct("InvalidState")
                .field("client_id", client_id)
                .field("state", state)
                .field("attempted_state", attempted_state)
                .finish(),
            Self::Deferred {
                client_id,
                state,
                queued,
            } => f
                .debug_struct("Deferred")
                .field("client_id", client_id)
                .field("state", state)
                .field("queued", queued)
                .finish(),
            Self::NoHandler {
                client_id,
                state,
                input_type,
            } => f
                .debug_struct("NoHandler")
                .field("client_id", client_id)
                .field("state", state)
                .field("input_type", input_type)
                .finish(),
            Self::NewFsm { fsm } => f
                .debug_struct("NewFsm")
                .field("namespace", &fsm.namespace())
                .finish(),
            Self::Registered { meta } => {
                f.debug_struct("Registered").field("meta", meta).finish()
            }
            Self::Custom { name, payload } => f
                .debug_struct("Custom")
                .field("name", name)
                .field("payload", payload)
                .finish(),
        }
    }
}
