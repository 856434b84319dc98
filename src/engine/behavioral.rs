//! Multi-client FSM engine.

use crate::core::{
    next_namespace, Client, ClientId, ClientMeta, FsmDefinition, Handler, Input, QueueKind,
    CATCH_ALL, DEFAULT_INITIAL_STATE,
};
use crate::engine::context::HandlerContext;
use crate::engine::error::FsmError;
use crate::events::{Emitter, Event, ListenerId, Subscription};
use serde_json::Value;
use std::cell::RefCell;
use std::collections::HashMap;

/// A handler picked for the current state.
struct ResolvedHandler<C> {
    name: String,
    handler: Handler<C>,
    catch_all: bool,
}

/// An FSM that drives many independent clients against one shared
/// definition.
///
/// All per-client runtime data lives in a side table keyed by
/// [`ClientId`]; the engine never holds on to client values. Every operation
/// runs to completion on the caller's stack. Handlers and hooks may re-enter
/// the engine through their [`HandlerContext`].
///
/// # Example
///
/// ```rust
/// use statewise::core::{FsmDefinition, StateDefinition};
/// use statewise::engine::BehavioralFsm;
///
/// let fsm: BehavioralFsm<&str> = BehavioralFsm::new(
///     FsmDefinition::new()
///         .initial_state("offline")
///         .state("offline", StateDefinition::new().on("connect", "online"))
///         .state("online", StateDefinition::new().on("drop", "offline")),
/// );
///
/// fsm.handle(&"conn-a", "connect").unwrap();
/// fsm.handle(&"conn-b", "drop").unwrap();
///
/// assert_eq!(fsm.state_of(&"conn-a").as_deref(), Some("online"));
/// assert_eq!(fsm.state_of(&"conn-b").as_deref(), Some("offline"));
/// ```
pub struct BehavioralFsm<C> {
    definition: FsmDefinition<C>,
    namespace: String,
    emitter: Emitter<C>,
    clients: RefCell<HashMap<ClientId, ClientMeta>>,
}

impl<C> BehavioralFsm<C> {
    /// Build an engine from a definition. A missing initial state defaults
    /// to `"uninitialized"` and a missing namespace to the next `fsm.<n>`.
    /// Listeners attached to the definition are subscribed before `newFsm`
    /// is emitted.
    pub fn new(mut definition: FsmDefinition<C>) -> Self {
        let namespace = definition
            .namespace_name()
            .map_or_else(next_namespace, str::to_string);
        if definition.initial().is_none() {
            definition = definition.initial_state(DEFAULT_INITIAL_STATE);
        }

        let emitter = Emitter::new();
        for (event_name, listener) in definition.take_listeners() {
            emitter.subscribe(event_name, listener);
        }

        let fsm = Self {
            definition,
            namespace,
            emitter,
            clients: RefCell::new(HashMap::new()),
        };
        tracing::debug!(namespace = %fsm.namespace, "Created FSM");
        fsm.emitter.emit(&Event::NewFsm { fsm: &fsm });
        fsm
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn initial_state(&self) -> Option<&str> {
        self.definition.initial()
    }

    pub fn definition(&self) -> &FsmDefinition<C> {
        &self.definition
    }

    pub fn on<F>(&self, event_name: impl Into<String>, f: F) -> Subscription<C>
    where
        F: Fn(&Event<'_, C>) + Send + Sync + 'static,
    {
        self.emitter.on(event_name, f)
    }

    pub fn off(&self, event_name: Option<&str>, id: Option<ListenerId>) {
        self.emitter.off(event_name, id);
    }

    /// Publish a custom event to this FSM's listeners.
    pub fn emit(&self, name: impl Into<String>, payload: Value) {
        self.emitter.emit(&Event::Custom {
            name: name.into(),
            payload,
        });
    }

    pub fn emitter(&self) -> &Emitter<C> {
        &self.emitter
    }

    /// Snapshot of the metadata for `id`, if the client is known.
    pub fn meta_for(&self, id: &ClientId) -> Option<ClientMeta> {
        self.clients.borrow().get(id).cloned()
    }

    /// Known client ids, sorted.
    pub fn clients(&self) -> Vec<ClientId> {
        let mut ids: Vec<ClientId> = self.clients.borrow().keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Run `f` against the client's metadata. Only [`Self::register`]
    /// creates metadata, so unknown or forgotten clients yield `None`.
    pub(crate) fn with_meta<R>(
        &self,
        id: &ClientId,
        f: impl FnOnce(&mut ClientMeta) -> R,
    ) -> Option<R> {
        self.clients.borrow_mut().get_mut(id).map(f)
    }

    fn resolve_handler(&self, state: Option<&str>, input_type: &str) -> Option<ResolvedHandler<C>> {
        let state_def = state.and_then(|name| self.definition.get_state(name));
        if let Some(handler) = state_def.and_then(|def| def.handler(input_type)) {
            return Some(ResolvedHandler {
                name: input_type.to_string(),
                handler: handler.clone(),
                catch_all: false,
            });
        }
        state_def
            .and_then(|def| def.catch_all_handler())
            .or_else(|| self.definition.fsm_catch_all())
            .map(|handler| ResolvedHandler {
                name: CATCH_ALL.to_string(),
                handler: handler.clone(),
                catch_all: true,
            })
    }

    pub(crate) fn handle_resolved(&self, client: &C, id: &ClientId, input: Input) {
        let Some((in_exit_handler, state)) =
            self.with_meta(id, |meta| (meta.in_exit_handler, meta.state.clone()))
        else {
            tracing::debug!(
                namespace = %self.namespace,
                client_id = %id,
                input = %input.input_type,
                "Ignored input for untracked client"
            );
            return;
        };
        if in_exit_handler {
            tracing::debug!(
                namespace = %self.namespace,
                client_id = %id,
                input = %input.input_type,
                "Suppressed input during exit hook"
            );
            return;
        }

        let Some(resolved) = self.resolve_handler(state.as_deref(), &input.input_type) else {
            tracing::warn!(
                namespace = %self.namespace,
                client_id = %id,
                state = ?state,
                input = %input.input_type,
                "No handler for input"
            );
            self.emitter.emit(&Event::NoHandler {
                client_id: id.clone(),
                state,
                input_type: input.input_type,
            });
            return;
        };

        let action = format!("{}.{}", state.as_deref().unwrap_or_default(), resolved.name);
        let outer_args = self
            .with_meta(id, |meta| {
                meta.current_action = action;
                meta.current_action_args.replace(input.clone())
            })
            .flatten();

        tracing::debug!(
            namespace = %self.namespace,
            client_id = %id,
            state = ?state,
            input = %input.input_type,
            "Handling input"
        );
        self.emitter.emit(&Event::Handling {
            client,
            input_type: input.input_type.clone(),
        });

        match &resolved.handler {
            Handler::Transition(target) => self.transition_resolved(client, id, target),
            Handler::Action(action) => {
                let ctx = HandlerContext::new(self, client, id, Some(&input), resolved.catch_all);
                if let Some(target) = action(&ctx) {
                    self.transition_resolved(client, id, &target);
                }
            }
        }

        self.with_meta(id, |meta| meta.current_action_args = outer_args);
        self.emitter.emit(&Event::Handled {
            client,
            input_type: input.input_type,
        });
        self.with_meta(id, |meta| {
            meta.prior_action = std::mem::take(&mut meta.current_action);
        });
        self.process_queue_resolved(client, id, QueueKind::UntilNextHandler);
    }

    pub(crate) fn transition_resolved(&self, client: &C, id: &ClientId, new_state: &str) {
        let Some((in_exit_handler, current)) =
            self.with_meta(id, |meta| (meta.in_exit_handler, meta.state.clone()))
        else {
            return;
        };
        if in_exit_handler || current.as_deref() == Some(new_state) {
            return;
        }

        if !self.definition.has_state(new_state) {
            tracing::warn!(
                namespace = %self.namespace,
                client_id = %id,
                state = ?current,
                attempted = %new_state,
                "Attempted transition to unknown state"
            );
            self.emitter.emit(&Event::InvalidState {
                client_id: id.clone(),
                state: current,
                attempted_state: new_state.to_string(),
            });
            return;
        }

        let exit_hook = current
            .as_deref()
            .and_then(|name| self.definition.get_state(name))
            .and_then(|def| def.exit_hook())
            .cloned();
        if let Some(on_exit) = exit_hook {
            self.with_meta(id, |meta| meta.in_exit_handler = true);
            on_exit(&HandlerContext::new(self, client, id, None, false));
            self.with_meta(id, |meta| meta.in_exit_handler = false);
        }

        // The exit hook may have forgotten the client.
        let Some((from_state, action)) = self.with_meta(id, |meta| {
            meta.prior_state = meta.state.replace(new_state.to_string());
            meta.target_replay_state = Some(new_state.to_string());
            (meta.prior_state.clone(), meta.current_action.clone())
        }) else {
            return;
        };
        tracing::debug!(
            namespace = %self.namespace,
            client_id = %id,
            from = ?from_state,
            to = %new_state,
            "Transition"
        );
        self.emitter.emit(&Event::Transition {
            client_id: id.clone(),
            from_state,
            action,
            to_state: new_state.to_string(),
        });

        let enter_hook = self
            .definition
            .get_state(new_state)
            .and_then(|def| def.enter_hook())
            .cloned();
        if let Some(on_enter) = enter_hook {
            on_enter(&HandlerContext::new(self, client, id, None, false));
        }

        let settled = self
            .with_meta(id, |meta| meta.target_replay_state.as_deref() == Some(new_state))
            .unwrap_or(false);
        if settled {
            self.process_queue_resolved(client, id, QueueKind::UntilTransition);
        }
    }
}

impl<C: Client> BehavioralFsm<C> {
    /// Resolve `client` and create its metadata on first contact, which
    /// emits `registered` and transitions into the initial state.
    pub fn register(&self, client: &C) -> Result<ClientId, FsmError> {
        let id = client.client_id().ok_or(FsmError::ClientNotFound)?;
        let snapshot = {
            let mut clients = self.clients.borrow_mut();
            if clients.contains_key(&id) {
                None
            } else {
                let meta = ClientMeta::new(id.clone());
                clients.insert(id.clone(), meta.clone());
                Some(meta)
            }
        };

        if let Some(meta) = snapshot {
            tracing::debug!(namespace = %self.namespace, client_id = %id, "Registered client");
            self.emitter.emit(&Event::Registered { meta });
            if let Some(initial) = self.definition.initial().map(str::to_string) {
                self.transition_resolved(client, &id, &initial);
            }
        }
        Ok(id)
    }

    /// Dispatch `input` to the handler for the client's current state.
    ///
    /// Resolution order is the exact input name, then the state's `"*"`
    /// handler, then the FSM-level `"*"` handler. With none of them a
    /// `noHandler` event is emitted and the state is left alone.
    pub fn handle(&self, client: &C, input: impl Into<Input>) -> Result<(), FsmError> {
        let id = self.register(client)?;
        self.handle_resolved(client, &id, input.into());
        Ok(())
    }

    /// Move the client into `state`, running exit and entry hooks and
    /// replaying any transition-deferred input the new state unlocks.
    pub fn transition(&self, client: &C, state: &str) -> Result<(), FsmError> {
        let id = self.register(client)?;
        self.transition_resolved(client, &id, state);
        Ok(())
    }

    pub fn defer_until_transition(&self, client: &C, state: Option<&str>) -> Result<(), FsmError> {
        let id = self.register(client)?;
        self.defer_resolved(&id, QueueKind::UntilTransition, state);
        Ok(())
    }

    pub fn defer_until_next_handler(&self, client: &C) -> Result<(), FsmError> {
        let id = self.register(client)?;
        self.defer_resolved(&id, QueueKind::UntilNextHandler, None);
        Ok(())
    }

    pub fn process_queue(&self, client: &C, kind: QueueKind) -> Result<(), FsmError> {
        let id = self.register(client)?;
        self.process_queue_resolved(client, &id, kind);
        Ok(())
    }

    pub fn clear_queue(
        &self,
        client: &C,
        kind: Option<QueueKind>,
        state: Option<&str>,
    ) -> Result<(), FsmError> {
        let id = self.register(client)?;
        self.with_meta(&id, |meta| meta.clear_queue(kind, state));
        Ok(())
    }

    /// Metadata snapshot without registering the client.
    pub fn client_meta(&self, client: &C) -> Option<ClientMeta> {
        client.client_id().and_then(|id| self.meta_for(&id))
    }

    pub fn state_of(&self, client: &C) -> Option<String> {
        self.client_meta(client).and_then(|meta| meta.state)
    }

    /// Drop the client's metadata, including anything still queued.
    pub fn forget(&self, client: &C) -> Option<ClientMeta> {
        let id = client.client_id()?;
        let removed = self.clients.borrow_mut().remove(&id);
        if removed.is_some() {
            tracing::debug!(namespace = %self.namespace, client_id = %id, "Forgot client");
        }
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::StateDefinition;
    use std::sync::{Arc, Mutex};

    fn record(fsm: &BehavioralFsm<&'static str>) -> Arc<Mutex<Vec<String>>> {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        fsm.on("*", move |event| sink.lock().unwrap().push(event.name().to_string()));
        seen
    }

    fn light() -> BehavioralFsm<&'static str> {
        BehavioralFsm::new(
            FsmDefinition::new()
                .initial_state("red")
                .state("red", StateDefinition::new().on("next", "green"))
                .state("green", StateDefinition::new().on("next", "yellow"))
                .state("yellow", StateDefinition::new().on("next", "red")),
        )
    }

    #[test]
    fn first_contact_registers_and_enters_initial_state() {
        let fsm = light();
        let events = record(&fsm);

        fsm.transition(&"a", "red").unwrap();

        assert_eq!(fsm.state_of(&"a").as_deref(), Some("red"));
        assert_eq!(*events.lock().unwrap(), ["registered", "transition"]);
    }

    #[test]
    fn clients_progress_independently() {
        let fsm = light();
        fsm.handle(&"a", "next").unwrap();
        fsm.handle(&"a", "next").unwrap();
        fsm.handle(&"b", "next").unwrap();

        assert_eq!(fsm.state_of(&"a").as_deref(), Some("yellow"));
        assert_eq!(fsm.state_of(&"b").as_deref(), Some("green"));
        assert_eq!(fsm.clients(), [ClientId::new("a"), ClientId::new("b")]);
    }

    #[test]
    fn missing_initial_state_defaults_to_uninitialized() {
        let fsm: BehavioralFsm<&str> = BehavioralFsm::new(
            FsmDefinition::new().state("uninitialized", StateDefinition::new()),
        );
        assert_eq!(fsm.initial_state(), Some("uninitialized"));
        assert!(fsm.namespace().starts_with("fsm."));

        fsm.register(&"x").unwrap();
        assert_eq!(fsm.state_of(&"x").as_deref(), Some("uninitialized"));
    }

    #[test]
    fn transition_to_current_state_is_silent() {
        let fsm = light();
        fsm.register(&"a").unwrap();
        let events = record(&fsm);

        fsm.transition(&"a", "red").unwrap();
        assert!(events.lock().unwrap().is_empty());
    }

    #[test]
    fn unknown_target_emits_invalid_state() {
        let fsm = light();
        fsm.register(&"a").unwrap();
        let events = record(&fsm);

        fsm.transition(&"a", "blue").unwrap();

        assert_eq!(*events.lock().unwrap(), ["invalidState"]);
        assert_eq!(fsm.state_of(&"a").as_deref(), Some("red"));
    }

    #[test]
    fn forget_drops_metadata() {
        let fsm = light();
        fsm.handle(&"a", "next").unwrap();
        let meta = fsm.forget(&"a").unwrap();
        assert_eq!(meta.state.as_deref(), Some("green"));
        assert!(fsm.client_meta(&"a").is_none());

        // Next contact starts over from the initial state.
        fsm.register(&"a").unwrap();
        assert_eq!(fsm.state_of(&"a").as_deref(), Some("red"));
    }

    #[test]
    fn forget_inside_handler_starts_over_on_next_contact() {
        let fsm = BehavioralFsm::new(
            FsmDefinition::<&'static str>::new()
                .initial_state("idle")
                .state("idle", StateDefinition::new().on("open", "busy"))
                .state(
                    "busy",
                    StateDefinition::new().action("close", |ctx| {
                        ctx.fsm().forget(ctx.client());
                        None
                    }),
                ),
        );

        fsm.handle(&"c", "open").unwrap();
        fsm.handle(&"c", "close").unwrap();
        assert!(fsm.client_meta(&"c").is_none());

        let events = record(&fsm);
        fsm.handle(&"c", "open").unwrap();

        assert_eq!(fsm.state_of(&"c").as_deref(), Some("busy"));
        assert_eq!(
            *events.lock().unwrap(),
            ["registered", "transition", "handling", "transition", "handled"]
        );
    }

    #[test]
    fn forget_inside_exit_hook_abandons_the_transition() {
        let fsm = BehavioralFsm::new(
            FsmDefinition::<&'static str>::new()
                .initial_state("idle")
                .state(
                    "idle",
                    StateDefinition::new()
                        .on("go", "busy")
                        .on_exit(|ctx| {
                            ctx.fsm().forget(ctx.client());
                        }),
                )
                .state("busy", StateDefinition::new()),
        );
        fsm.register(&"c").unwrap();
        let events = record(&fsm);

        fsm.handle(&"c", "go").unwrap();

        assert!(fsm.client_meta(&"c").is_none());
        assert_eq!(*events.lock().unwrap(), ["handling", "handled"]);
    }

    #[test]
    fn action_tracks_state_and_handler_name() {
        let fsm = light();
        let actions = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&actions);
        fsm.on("transition", move |event| {
            if let Event::Transition { action, .. } = event {
                sink.lock().unwrap().push(action.clone());
            }
        });

        fsm.handle(&"a", "next").unwrap();

        assert_eq!(*actions.lock().unwrap(), ["", "red.next"]);
        let meta = fsm.client_meta(&"a").unwrap();
        assert_eq!(meta.prior_action, "red.next");
        assert!(meta.current_action.is_empty());
        assert!(meta.current_action_args.is_none());
    }
}
