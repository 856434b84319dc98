//! Single-entity FSM: the machine is its own (and only) client.

use crate::builder::FsmConfig;
use crate::core::{Client, ClientId, ClientMeta, FsmDefinition, Input, QueueKind};
use crate::engine::behavioral::BehavioralFsm;
use crate::engine::error::FsmError;
use crate::events::{Event, ListenerId, Subscription};
use serde_json::Value;

/// Client identity of a single-entity [`Fsm`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Machine {
    id: ClientId,
}

impl Machine {
    pub fn id(&self) -> &ClientId {
        &self.id
    }
}

impl Client for Machine {
    fn client_id(&self) -> Option<ClientId> {
        Some(self.id.clone())
    }
}

/// Definition type for single-entity machines.
pub type MachineDefinition = FsmDefinition<Machine>;

/// A state machine tracking exactly one entity: itself.
///
/// Construction validates the initial state and enters it immediately, so
/// listeners that must see the initial transition belong on the definition.
///
/// # Example
///
/// ```rust
/// use statewise::core::StateDefinition;
/// use statewise::engine::{Fsm, MachineDefinition};
///
/// let fsm = Fsm::new(
///     MachineDefinition::new()
///         .initial_state("offline")
///         .state("offline", StateDefinition::new().on("connect", "online"))
///         .state("online", StateDefinition::new().on("drop", "offline")),
/// )
/// .unwrap();
///
/// assert_eq!(fsm.state().as_deref(), Some("offline"));
/// fsm.handle("connect");
/// assert_eq!(fsm.state().as_deref(), Some("online"));
/// assert_eq!(fsm.prior_state().as_deref(), Some("offline"));
/// ```
pub struct Fsm {
    engine: BehavioralFsm<Machine>,
    machine: Machine,
}

impl Fsm {
    pub fn new(definition: MachineDefinition) -> Result<Self, FsmError> {
        let initial = definition.initial().ok_or(FsmError::MissingInitialState)?;
        if !definition.has_state(initial) {
            return Err(FsmError::UnknownInitialState {
                state: initial.to_string(),
            });
        }

        let engine = BehavioralFsm::new(definition);
        let machine = Machine {
            id: ClientId::new(engine.namespace()),
        };
        engine.register(&machine)?;
        Ok(Self { engine, machine })
    }

    /// Build from a declarative configuration.
    pub fn from_config(config: FsmConfig) -> Result<Self, FsmError> {
        Self::new(config.into_definition()?)
    }

    pub fn namespace(&self) -> &str {
        self.engine.namespace()
    }

    pub fn initial_state(&self) -> Option<&str> {
        self.engine.initial_state()
    }

    pub fn machine(&self) -> &Machine {
        &self.machine
    }

    /// The underlying engine, for operations shared with multi-client FSMs.
    pub fn engine(&self) -> &BehavioralFsm<Machine> {
        &self.engine
    }

    /// Snapshot of the machine's metadata. Empty if the machine was
    /// forgotten through [`Fsm::engine`].
    pub fn meta(&self) -> ClientMeta {
        self.engine
            .meta_for(&self.machine.id)
            .unwrap_or_else(|| ClientMeta::new(self.machine.id.clone()))
    }

    pub fn state(&self) -> Option<String> {
        self.meta().state
    }

    pub fn prior_state(&self) -> Option<String> {
        self.meta().prior_state
    }

    pub fn handle(&self, input: impl Into<Input>) {
        self.engine
            .handle_resolved(&self.machine, &self.machine.id, input.into());
    }

    pub fn transition(&self, state: &str) {
        self.engine
            .transition_resolved(&self.machine, &self.machine.id, state);
    }

    pub fn defer_until_transition(&self, state: Option<&str>) {
        self.engine
            .defer_resolved(&self.machine.id, QueueKind::UntilTransition, state);
    }

    pub fn defer_until_next_handler(&self) {
        self.engine
            .defer_resolved(&self.machine.id, QueueKind::UntilNextHandler, None);
    }

    pub fn process_queue(&self, kind: QueueKind) {
        self.engine
            .process_queue_resolved(&self.machine, &self.machine.id, kind);
    }

    pub fn clear_queue(&self, kind: Option<QueueKind>, state: Option<&str>) {
        self.engine
            .with_meta(&self.machine.id, |meta| meta.clear_queue(kind, state));
    }

    pub fn on<F>(&self, event_name: impl Into<String>, f: F) -> Subscription<Machine>
    where
        F: Fn(&Event<'_, Machine>) + Send + Sync + 'static,
    {
        self.engine.on(event_name, f)
    }

    pub fn off(&self, event_name: Option<&str>, id: Option<ListenerId>) {
        self.engine.off(event_name, id);
    }

    pub fn emit(&self, name: impl Into<String>, payload: Value) {
        self.engine.emit(name, payload);
    }
}
