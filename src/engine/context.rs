//! Context handed to action handlers and entry/exit hooks.

use crate::core::{ClientId, ClientMeta, Input, QueueKind};
use crate::engine::behavioral::BehavioralFsm;
use serde_json::Value;

/// View of the engine bound to one client for the duration of a handler or
/// hook call.
///
/// Every method re-enters the engine for the bound client, so a handler can
/// transition, defer its own input, dispatch further input or emit events
/// without resolving the client again.
///
/// # Example
///
/// ```rust
/// use statewise::core::{FsmDefinition, StateDefinition};
/// use statewise::engine::BehavioralFsm;
///
/// let fsm: BehavioralFsm<&str> = BehavioralFsm::new(
///     FsmDefinition::new()
///         .initial_state("idle")
///         .state(
///             "idle",
///             StateDefinition::new().action("ping", |ctx| {
///                 ctx.emit("pong", ctx.arg(0).cloned().unwrap_or_default());
///                 Some("busy".to_string())
///             }),
///         )
///         .state("busy", StateDefinition::new()),
/// );
///
/// fsm.handle(&"worker", "ping").unwrap();
/// assert_eq!(fsm.state_of(&"worker").as_deref(), Some("busy"));
/// ```
pub struct HandlerContext<'a, C> {
    fsm: &'a BehavioralFsm<C>,
    client: &'a C,
    client_id: &'a ClientId,
    input: Option<&'a Input>,
    catch_all: bool,
}

impl<'a, C> HandlerContext<'a, C> {
    pub(crate) fn new(
        fsm: &'a BehavioralFsm<C>,
        client: &'a C,
        client_id: &'a ClientId,
        input: Option<&'a Input>,
        catch_all: bool,
    ) -> Self {
        Self {
            fsm,
            client,
            client_id,
            input,
            catch_all,
        }
    }

    pub fn fsm(&self) -> &'a BehavioralFsm<C> {
        self.fsm
    }

    pub fn client(&self) -> &'a C {
        self.client
    }

    pub fn client_id(&self) -> &'a ClientId {
        self.client_id
    }

    /// Name of the dispatched input. Catch-all handlers use this to learn
    /// which input they caught; hooks have none.
    pub fn input_type(&self) -> Option<&'a str> {
        self.input.map(|input| input.input_type.as_str())
    }

    /// Caller-supplied arguments, without the input name.
    pub fn args(&self) -> &'a [Value] {
        match self.input {
            Some(input) => &input.args,
            None => &[],
        }
    }

    pub fn arg(&self, index: usize) -> Option<&'a Value> {
        self.args().get(index)
    }

    /// Whether this call was routed to a `"*"` handler.
    pub fn is_catch_all(&self) -> bool {
        self.catch_all
    }

    /// Snapshot of the client's metadata, `None` once the client has been
    /// forgotten.
    pub fn meta(&self) -> Option<ClientMeta> {
        self.fsm.meta_for(self.client_id)
    }

    pub fn state(&self) -> Option<String> {
        self.fsm
            .with_meta(self.client_id, |meta| meta.state.clone())
            .flatten()
    }

    pub fn transition(&self, state: &str) {
        self.fsm.transition_resolved(self.client, self.client_id, state);
    }

    pub fn handle(&self, input: impl Into<Input>) {
        self.fsm.handle_resolved(self.client, self.client_id, input.into());
    }

    /// Queue the current input until the next transition, or until the
    /// transition into `state` when given.
    pub fn defer_until_transition(&self, state: Option<&str>) {
        self.fsm
            .defer_resolved(self.client_id, QueueKind::UntilTransition, state);
    }

    /// Queue the current input until the next `handle` call completes.
    pub fn defer_until_next_handler(&self) {
        self.fsm
            .defer_resolved(self.client_id, QueueKind::UntilNextHandler, None);
    }

    pub fn process_queue(&self, kind: QueueKind) {
        self.fsm.process_queue_resolved(self.client, self.client_id, kind);
    }

    pub fn clear_queue(&self, kind: Option<QueueKind>, state: Option<&str>) {
        self.fsm
            .with_meta(self.client_id, |meta| meta.clear_queue(kind, state));
    }

    pub fn emit(&self, name: impl Into<String>, payload: Value) {
        self.fsm.emit(name, payload);
    }
}
