//! Dispatch, transition and deferral engine.
//!
//! [`BehavioralFsm`] drives any number of clients against one definition;
//! [`Fsm`] wraps it for the common case of a machine that is its own client.
//!
//! # Dispatch in brief
//!
//! `handle` resolves a handler for the client's current state (exact input,
//! state-level `"*"`, FSM-level `"*"`), emits `handling`, runs it, performs
//! any requested transition, emits `handled`, then replays next-handler
//! deferrals. `transition` runs the exit hook, updates the client, emits
//! `transition`, runs the entry hook and replays transition deferrals once
//! the chain of transitions has settled.

mod behavioral;
mod context;
mod error;
mod fsm;
mod queue;

pub use behavioral::BehavioralFsm;
pub use context::HandlerContext;
pub use error::FsmError;
pub use fsm::{Fsm, Machine, MachineDefinition};
