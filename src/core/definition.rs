//! Declarative shape of a state machine.
//!
//! A definition maps state names to [`StateDefinition`]s, each of which maps
//! input names to [`Handler`]s. Definitions are plain values: merging and
//! cloning them never shares mutable state between FSM instances, only the
//! immutable handler functions themselves.

use crate::engine::HandlerContext;
use crate::events::Listener;
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Handler and state key for catch-all handlers.
pub const CATCH_ALL: &str = "*";

/// Initial state the multi-client engine uses when none is configured.
pub const DEFAULT_INITIAL_STATE: &str = "uninitialized";

static NAMESPACE_COUNTER: AtomicUsize = AtomicUsize::new(0);

/// Generate the next default namespace (`fsm.0`, `fsm.1`, ...).
pub fn next_namespace() -> String {
    format!("fsm.{}", NAMESPACE_COUNTER.fetch_add(1, Ordering::Relaxed))
}

/// Behavior run for an input. A returned state name requests a transition
/// once the action completes.
pub type Action<C> = Arc<dyn Fn(&HandlerContext<'_, C>) -> Option<String> + Send + Sync>;

/// Entry or exit hook.
pub type Hook<C> = Arc<dyn Fn(&HandlerContext<'_, C>) + Send + Sync>;

/// What to do when an input arrives.
pub enum Handler<C> {
    /// Shorthand: transition straight to the named state.
    Transition(String),
    /// Run user code.
    Action(Action<C>),
}

impl<C> Handler<C> {
    pub fn transition(target: impl Into<String>) -> Self {
        Self::Transition(target.into())
    }

    pub fn action<F>(f: F) -> Self
    where
        F: Fn(&HandlerContext<'_, C>) -> Option<String> + Send + Sync + 'static,
    {
        Self::Action(Arc::new(f))
    }
}

impl<C> Clone for Handler<C> {
    fn clone(&self) -> Self {
        match self {
            Self::Transition(target) => Self::Transition(target.clone()),
            Self::Action(action) => Self::Action(Arc::clone(action)),
        }
    }
}

impl<C> fmt::Debug for Handler<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transition(target) => f.debug_tuple("Transition").field(target).finish(),
            Self::Action(_) => f.write_str("Action(..)"),
        }
    }
}

impl<C> From<&str> for Handler<C> {
    fn from(target: &str) -> Self {
        Self::Transition(target.to_string())
    }
}

impl<C> From<String> for Handler<C> {
    fn from(target: String) -> Self {
        Self::Transition(target)
    }
}

/// Handlers and hooks for a single state.
pub struct StateDefinition<C> {
    handlers: HashMap<String, Handler<C>>,
    catch_all: Option<Handler<C>>,
    on_enter: Option<Hook<C>>,
    on_exit: Option<Hook<C>>,
}

impl<C> StateDefinition<C> {
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
            catch_all: None,
            on_enter: None,
            on_exit: None,
        }
    }

    /// Register a handler for `input`. `"*"` registers the state-level
    /// catch-all.
    pub fn on(mut self, input: impl Into<String>, handler: impl Into<Handler<C>>) -> Self {
        let input = input.into();
        if input == CATCH_ALL {
            self.catch_all = Some(handler.into());
        } else {
            self.handlers.insert(input, handler.into());
        }
        self
    }

    /// Register an action handler for `input`.
    pub fn action<F>(self, input: impl Into<String>, f: F) -> Self
    where
        F: Fn(&HandlerContext<'_, C>) -> Option<String> + Send + Sync + 'static,
    {
        self.on(input, Handler::action(f))
    }

    pub fn catch_all(mut self, handler: impl Into<Handler<C>>) -> Self {
        self.catch_all = Some(handler.into());
        self
    }

    pub fn on_enter<F>(mut self, f: F) -> Self
    where
        F: Fn(&HandlerContext<'_, C>) + Send + Sync + 'static,
    {
        self.on_enter = Some(Arc::new(f));
        self
    }

    pub fn on_exit<F>(mut self, f: F) -> Self
    where
        F: Fn(&HandlerContext<'_, C>) + Send + Sync + 'static,
    {
        self.on_exit = Some(Arc::new(f));
        self
    }

    pub fn handler(&self, input: &str) -> Option<&Handler<C>> {
        self.handlers.get(input)
    }

    pub fn catch_all_handler(&self) -> Option<&Handler<C>> {
        self.catch_all.as_ref()
    }

    pub fn enter_hook(&self) -> Option<&Hook<C>> {
        self.on_enter.as_ref()
    }

    pub fn exit_hook(&self) -> Option<&Hook<C>> {
        self.on_exit.as_ref()
    }

    /// Input names with an exact handler, sorted.
    pub fn inputs(&self) -> Vec<&str> {
        let mut inputs: Vec<&str> = self.handlers.keys().map(String::as_str).collect();
        inputs.sort_unstable();
        inputs
    }

    /// Overlay `other` onto this state: its handlers and hooks win.
    pub fn merge(&mut self, other: &Self) {
        for (input, handler) in &other.handlers {
            self.handlers.insert(input.clone(), handler.clone());
        }
        if let Some(handler) = &other.catch_all {
            self.catch_all = Some(handler.clone());
        }
        if let Some(hook) = &other.on_enter {
            self.on_enter = Some(Arc::clone(hook));
        }
        if let Some(hook) = &other.on_exit {
            self.on_exit = Some(Arc::clone(hook));
        }
    }
}

impl<C> Default for StateDefinition<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C> Clone for StateDefinition<C> {
    fn clone(&self) -> Self {
        Self {
            handlers: self.handlers.clone(),
            catch_all: self.catch_all.clone(),
            on_enter: self.on_enter.clone(),
            on_exit: self.on_exit.clone(),
        }
    }
}

impl<C> fmt::Debug for StateDefinition<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StateDefinition")
            .field("handlers", &self.handlers)
            .field("catch_all", &self.catch_all)
            .field("on_enter", &self.on_enter.is_some())
            .field("on_exit", &self.on_exit.is_some())
            .finish()
    }
}

/// Full (or partial, when used as an extension layer) FSM definition.
///
/// # Example
///
/// ```rust
/// use statewise::core::{FsmDefinition, StateDefinition};
///
/// let definition: FsmDefinition<String> = FsmDefinition::new()
///     .initial_state("offline")
///     .state("offline", StateDefinition::new().on("connect", "online"))
///     .state("online", StateDefinition::new().on("drop", "offline"));
///
/// assert!(definition.has_state("online"));
/// assert_eq!(definition.initial(), Some("offline"));
/// ```
pub struct FsmDefinition<C> {
    states: HashMap<String, StateDefinition<C>>,
    initial_state: Option<String>,
    namespace: Option<String>,
    catch_all: Option<Handler<C>>,
    listeners: Vec<(String, Listener<C>)>,
}

impl<C> FsmDefinition<C> {
    pub fn new() -> Self {
        Self {
            states: HashMap::new(),
            initial_state: None,
            namespace: None,
            catch_all: None,
            listeners: Vec::new(),
        }
    }

    /// Add a state, merging into any existing definition of the same name.
    pub fn state(mut self, name: impl Into<String>, state: StateDefinition<C>) -> Self {
        let name = name.into();
        match self.states.get_mut(&name) {
            Some(existing) => existing.merge(&state),
            None => {
                self.states.insert(name, state);
            }
        }
        self
    }

    pub fn initial_state(mut self, name: impl Into<String>) -> Self {
        self.initial_state = Some(name.into());
        self
    }

    pub fn namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    /// FSM-level catch-all, used when the current state has neither an exact
    /// handler nor its own catch-all.
    pub fn catch_all(mut self, handler: impl Into<Handler<C>>) -> Self {
        self.catch_all = Some(handler.into());
        self
    }

    /// Subscribe a listener before the FSM exists, so it also observes
    /// construction-time events.
    pub fn listen<F>(mut self, event_name: impl Into<String>, f: F) -> Self
    where
        F: Fn(&crate::events::Event<'_, C>) + Send + Sync + 'static,
    {
        self.listeners.push((event_name.into(), Arc::new(f)));
        self
    }

    pub fn get_state(&self, name: &str) -> Option<&StateDefinition<C>> {
        self.states.get(name)
    }

    pub fn has_state(&self, name: &str) -> bool {
        self.states.contains_key(name)
    }

    /// State names, sorted.
    pub fn state_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.states.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn initial(&self) -> Option<&str> {
        self.initial_state.as_deref()
    }

    pub fn namespace_name(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    pub fn fsm_catch_all(&self) -> Option<&Handler<C>> {
        self.catch_all.as_ref()
    }

    pub(crate) fn take_listeners(&mut self) -> Vec<(String, Listener<C>)> {
        std::mem::take(&mut self.listeners)
    }

    /// Overlay `other` onto this definition. State name sets are unioned,
    /// handlers within a shared state are overridden by `other`, and scalar
    /// settings present in `other` win. Listeners accumulate.
    pub fn merge(&mut self, other: &Self) {
        for (name, state) in &other.states {
            match self.states.get_mut(name) {
                Some(existing) => existing.merge(state),
                None => {
                    self.states.insert(name.clone(), state.clone());
                }
            }
        }
        if let Some(initial) = &other.initial_state {
            self.initial_state = Some(initial.clone());
        }
        if let Some(namespace) = &other.namespace {
            self.namespace = Some(namespace.clone());
        }
        if let Some(handler) = &other.catch_all {
            self.catch_all = Some(handler.clone());
        }
        self.listeners.extend(
            other
                .listeners
                .iter()
                .map(|(name, listener)| (name.clone(), Arc::clone(listener))),
        );
    }
}

impl<C> Default for FsmDefinition<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C> Clone for FsmDefinition<C> {
    fn clone(&self) -> Self {
        let mut copy = Self::new();
        copy.merge(self);
        copy
    }
}

impl<C> fmt::Debug for FsmDefinition<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FsmDefinition")
            .field("states", &self.states)
            .field("initial_state", &self.initial_state)
            .field("namespace", &self.namespace)
            .field("catch_all", &self.catch_all)
            .field("listeners", &self.listeners.len())
            .finish()
    }
}
