//! Definition composition.
//!
//! A blueprint is an ordered chain of definition layers. Extending a
//! blueprint appends a layer; building an instance merges every layer, most
//! derived last, into a brand new [`FsmDefinition`] and then applies the
//! instance options. Each instance therefore owns its handler tables, and
//! siblings built from the same blueprint share nothing mutable.

use crate::core::FsmDefinition;
use crate::engine::{BehavioralFsm, Fsm, FsmError, Machine};
use std::sync::Arc;

/// Reusable, extendable FSM definition.
///
/// # Example
///
/// ```rust
/// use statewise::builder::FsmBlueprint;
/// use statewise::core::{FsmDefinition, StateDefinition};
///
/// let base: FsmBlueprint<&str> = FsmBlueprint::new(
///     FsmDefinition::new()
///         .initial_state("offline")
///         .state("offline", StateDefinition::new().on("connect", "online"))
///         .state("online", StateDefinition::new()),
/// );
/// let monitored = base.extend(
///     FsmDefinition::new().state("online", StateDefinition::new().on("drop", "offline")),
/// );
///
/// let fsm = monitored.behavioral(FsmDefinition::new());
/// fsm.handle(&"link", "connect").unwrap();
/// fsm.handle(&"link", "drop").unwrap();
/// assert_eq!(fsm.state_of(&"link").as_deref(), Some("offline"));
/// ```
pub struct FsmBlueprint<C> {
    layers: Vec<Arc<FsmDefinition<C>>>,
}

impl<C> FsmBlueprint<C> {
    pub fn new(definition: FsmDefinition<C>) -> Self {
        Self {
            layers: vec![Arc::new(definition)],
        }
    }

    /// Derive a new blueprint whose layer overrides this one's.
    pub fn extend(&self, layer: FsmDefinition<C>) -> Self {
        let mut layers = self.layers.clone();
        layers.push(Arc::new(layer));
        Self { layers }
    }

    /// Number of layers in the chain.
    pub fn depth(&self) -> usize {
        self.layers.len()
    }

    /// Merge the chain and `options` into a fresh definition.
    pub fn definition(&self, options: FsmDefinition<C>) -> FsmDefinition<C> {
        let mut merged = FsmDefinition::new();
        for layer in &self.layers {
            merged.merge(layer);
        }
        merged.merge(&options);
        merged
    }

    pub fn behavioral(&self, options: FsmDefinition<C>) -> BehavioralFsm<C> {
        BehavioralFsm::new(self.definition(options))
    }
}

impl FsmBlueprint<Machine> {
    pub fn fsm(&self, options: FsmDefinition<Machine>) -> Result<Fsm, FsmError> {
        Fsm::new(self.definition(options))
    }
}

impl<C> Clone for FsmBlueprint<C> {
    fn clone(&self) -> Self {
        Self {
            layers: self.layers.clone(),
        }
    }
}

impl<C> Default for FsmBlueprint<C> {
    fn default() -> Self {
        Self { layers: Vec::new() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Handler, StateDefinition};

    fn grandparent() -> FsmBlueprint<&'static str> {
        FsmBlueprint::new(
            FsmDefinition::new().state(
                "uninitialized",
                StateDefinition::new().on("start", "ready"),
            ),
        )
    }

    #[test]
    fn layers_merge_most_derived_last() {
        let child = grandparent()
            .extend(FsmDefinition::new().state("ready", StateDefinition::new()))
            .extend(
                FsmDefinition::new()
                    .initial_state("uninitialized")
                    .state("uninitialized", StateDefinition::new().on("start", "done"))
                    .state("done", StateDefinition::new()),
            );

        assert_eq!(child.depth(), 3);
        let definition = child.definition(FsmDefinition::new());
        assert_eq!(definition.state_names(), ["done", "ready", "uninitialized"]);
        assert!(matches!(
            definition.get_state("uninitialized").unwrap().handler("start"),
            Some(Handler::Transition(t)) if t == "done"
        ));
    }

    #[test]
    fn options_override_layers() {
        let blueprint = grandparent().extend(FsmDefinition::new().initial_state("uninitialized"));
        let definition = blueprint.definition(FsmDefinition::new().initial_state("ready"));
        assert_eq!(definition.initial(), Some("ready"));
    }

    #[test]
    fn extending_leaves_parent_untouched() {
        let parent = grandparent();
        let _child = parent.extend(FsmDefinition::new().state("extra", StateDefinition::new()));
        assert!(!parent.definition(FsmDefinition::new()).has_state("extra"));
    }

    #[test]
    fn fsm_from_blueprint_validates_initial_state() {
        let blueprint: FsmBlueprint<Machine> = FsmBlueprint::new(
            FsmDefinition::new().state("a", StateDefinition::new()),
        );
        assert!(matches!(
            blueprint.fsm(FsmDefinition::new()),
            Err(FsmError::MissingInitialState)
        ));
        let fsm = blueprint
            .fsm(FsmDefinition::new().initial_state("a"))
            .unwrap();
        assert_eq!(fsm.state().as_deref(), Some("a"));
    }
}
