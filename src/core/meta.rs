//! Per-client runtime metadata and the deferred-input records it holds.

use super::client::ClientId;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A named input together with its caller-supplied arguments.
///
/// # Example
///
/// ```rust
/// use statewise::core::Input;
/// use serde_json::json;
///
/// let input = Input::new("connect").with_arg(json!("db-1")).with_arg(json!(5432));
/// assert_eq!(input.input_type, "connect");
/// assert_eq!(input.args.len(), 2);
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Input {
    pub input_type: String,
    #[serde(default)]
    pub args: Vec<Value>,
}

impl Input {
    pub fn new(input_type: impl Into<String>) -> Self {
        Self {
            input_type: input_type.into(),
            args: Vec::new(),
        }
    }

    pub fn with_arg(mut self, arg: Value) -> Self {
        self.args.push(arg);
        self
    }

    pub fn with_args(mut self, args: impl IntoIterator<Item = Value>) -> Self {
        self.args.extend(args);
        self
    }
}

impl From<&str> for Input {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for Input {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

/// When a deferred input becomes eligible for replay.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum QueueKind {
    /// Replayed after a transition (optionally into a specific state).
    UntilTransition,
    /// Replayed once the current `handle` call has emitted `handled`.
    UntilNextHandler,
}

/// An input postponed by a handler, captured verbatim for replay.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueuedInput {
    #[serde(rename = "type")]
    pub kind: QueueKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub until_state: Option<String>,
    pub args: Input,
}

impl QueuedInput {
    /// Check whether this item should replay for `kind` while the client
    /// sits in `current_state`.
    pub fn is_ready(&self, kind: QueueKind, current_state: Option<&str>) -> bool {
        if self.kind != kind {
            return false;
        }
        match kind {
            QueueKind::UntilNextHandler => true,
            QueueKind::UntilTransition => match self.until_state.as_deref() {
                Some(target) => Some(target) == current_state,
                None => true,
            },
        }
    }
}

/// Transient runtime state the engine keeps for one client.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientMeta {
    pub id: Option<ClientId>,
    pub state: Option<String>,
    pub prior_state: Option<String>,
    /// Last state entered; gates transition replay so chained transitions
    /// replay only into the settled state.
    pub target_replay_state: Option<String>,
    pub current_action: String,
    pub current_action_args: Option<Input>,
    pub prior_action: String,
    pub in_exit_handler: bool,
    pub input_queue: Vec<QueuedInput>,
    /// Set while next-handler deferrals replay; items deferred again during
    /// that replay wait for the following `handle` call.
    #[serde(skip)]
    pub(crate) draining_next_handler: bool,
}

impl ClientMeta {
    pub fn new(id: ClientId) -> Self {
        Self {
            id: Some(id),
            ..Self::default()
        }
    }

    /// Remove and return the queued items ready for `kind`, preserving
    /// insertion order in both the result and the remaining queue.
    pub fn take_ready(&mut self, kind: QueueKind) -> Vec<QueuedInput> {
        let state = self.state.clone();
        let (ready, pending): (Vec<_>, Vec<_>) = std::mem::take(&mut self.input_queue)
            .into_iter()
            .partition(|item| item.is_ready(kind, state.as_deref()));
        self.input_queue = pending;
        ready
    }

    /// Drop queued items. With no `kind` everything goes; with a kind only
    /// matching items go, further narrowed by `until_state` for transition
    /// deferrals.
    pub fn clear_queue(&mut self, kind: Option<QueueKind>, until_state: Option<&str>) {
        match kind {
            None => self.input_queue.clear(),
            Some(kind) => self.input_queue.retain(|item| {
                let matches = item.kind == kind
                    && match (kind, until_state) {
                        (QueueKind::UntilTransition, Some(name)) => {
                            item.until_state.as_deref() == Some(name)
                        }
                        _ => true,
                    };
                !matches
            }),
        }
    }
}
