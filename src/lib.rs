//! Statewise: a behavioral finite state machine engine
//!
//! A definition maps states to input handlers plus optional entry and exit
//! hooks. The engine tracks the current state of each client, routes named
//! inputs to the right handler, runs transitions, and lets handlers defer an
//! input until a later transition or handling cycle.
//!
//! # Core Concepts
//!
//! - **Definition**: states, handlers (`"target"` shorthand or actions), hooks
//! - **Clients**: entities identified by a [`core::ClientId`]; their runtime
//!   data lives in a side table owned by the engine
//! - **Events**: synchronous lifecycle notifications with wildcard listeners
//! - **Blueprints**: layered definitions merged per instance
//!
//! # Example
//!
//! ```rust
//! use statewise::core::StateDefinition;
//! use statewise::engine::{Fsm, MachineDefinition};
//!
//! let fsm = Fsm::new(
//!     MachineDefinition::new()
//!         .initial_state("uninitialized")
//!         .state(
//!             "uninitialized",
//!             StateDefinition::new()
//!                 .on("start", "ready")
//!                 .action("work", |ctx| {
//!                     ctx.defer_until_transition(Some("ready"));
//!                     None
//!                 }),
//!         )
//!         .state(
//!             "ready",
//!             StateDefinition::new().action("work", |_| Some("done".to_string())),
//!         )
//!         .state("done", StateDefinition::new()),
//! )
//! .unwrap();
//!
//! fsm.handle("work");
//! assert_eq!(fsm.state().as_deref(), Some("uninitialized"));
//!
//! // Entering "ready" replays the deferred "work" input.
//! fsm.handle("start");
//! assert_eq!(fsm.state().as_deref(), Some("done"));
//! ```

pub mod builder;
pub mod core;
pub mod engine;
pub mod events;

// Re-export commonly used types
pub use builder::{FsmBlueprint, FsmConfig};
pub use core::{Client, ClientId, FsmDefinition, Handler, Input, QueueKind, StateDefinition};
pub use engine::{BehavioralFsm, Fsm, FsmError, HandlerContext, MachineDefinition};
pub use events::{Event, EventKind};
