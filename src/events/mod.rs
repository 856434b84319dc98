//! Event emission.
//!
//! Every FSM instance owns an [`Emitter`]. The engine publishes lifecycle
//! events through it (`handling`, `handled`, `transition`, `invalidState`,
//! `deferred`, `noHandler`, `newFsm`, `registered`), and hosts or handlers
//! may publish their own [`Event::Custom`] events alongside.

mod emitter;
mod event;

pub use emitter::{Emitter, Listener, ListenerId, Subscription};
pub use event::{Event, EventKind, WILDCARD};
