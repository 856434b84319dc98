//! Declarative configuration loaded through serde.
//!
//! Only shorthand handlers ("on this input, go to that state") can be
//! expressed as data. The resulting [`FsmDefinition`] can be extended with
//! action handlers and hooks afterwards.

use crate::builder::error::ConfigError;
use crate::core::{FsmDefinition, StateDefinition, CATCH_ALL};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Serializable FSM configuration.
///
/// # Example
///
/// ```rust
/// use statewise::builder::FsmConfig;
/// use statewise::core::FsmDefinition;
///
/// let config = FsmConfig::from_json(r#"{
///     "initialState": "offline",
///     "states": {
///         "offline": { "connect": "online" },
///         "online": { "drop": "offline", "*": "online" }
///     }
/// }"#).unwrap();
///
/// let definition: FsmDefinition<String> = config.into_definition().unwrap();
/// assert_eq!(definition.initial(), Some("offline"));
/// assert_eq!(definition.state_names(), ["offline", "online"]);
/// ```
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FsmConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initial_state: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,

    /// state name -> input name -> target state
    #[serde(default)]
    pub states: BTreeMap<String, BTreeMap<String, String>>,

    /// FSM-level catch-all target.
    #[serde(rename = "*", default, skip_serializing_if = "Option::is_none")]
    pub catch_all: Option<String>,
}

impl FsmConfig {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(json).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    pub fn from_value(value: serde_json::Value) -> Result<Self, ConfigError> {
        serde_json::from_value(value).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Validate and convert into a definition.
    pub fn into_definition<C>(self) -> Result<FsmDefinition<C>, ConfigError> {
        let mut definition = FsmDefinition::new();

        for (state, inputs) in self.states {
            if state.is_empty() {
                return Err(ConfigError::EmptyStateName);
            }
            let mut state_def = StateDefinition::new();
            for (input, target) in inputs {
                if target.is_empty() {
                    return Err(ConfigError::EmptyTarget { state, input });
                }
                state_def = state_def.on(input, target);
            }
            definition = definition.state(state, state_def);
        }

        if let Some(initial) = self.initial_state {
            if initial.is_empty() {
                return Err(ConfigError::EmptyStateName);
            }
            definition = definition.initial_state(initial);
        }
        if let Some(namespace) = self.namespace {
            definition = definition.namespace(namespace);
        }
        if let Some(target) = self.catch_all {
            if target.is_empty() {
                return Err(ConfigError::EmptyTarget {
                    state: CATCH_ALL.to_string(),
                    input: CATCH_ALL.to_string(),
                });
            }
            definition = definition.catch_all(target);
        }

        Ok(definition)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Handler;
    use serde_json::json;

    #[test]
    fn parses_shorthand_states() {
        let config = FsmConfig::from_value(json!({
            "initialState": "uninitialized",
            "namespace": "conn",
            "states": {
                "uninitialized": { "start": "ready", "*": "uninitialized" },
                "ready": {}
            },
            "*": "ready"
        }))
        .unwrap();

        let definition: FsmDefinition<String> = config.into_definition().unwrap();
        assert_eq!(definition.namespace_name(), Some("conn"));
        assert!(matches!(definition.fsm_catch_all(), Some(Handler::Transition(t)) if t == "ready"));

        let uninitialized = definition.get_state("uninitialized").unwrap();
        assert!(matches!(uninitialized.handler("start"), Some(Handler::Transition(t)) if t == "ready"));
        assert!(uninitialized.catch_all_handler().is_some());
    }

    #[test]
    fn rejects_empty_targets() {
        let config = FsmConfig::from_value(json!({
            "states": { "a": { "go": "" } }
        }))
        .unwrap();

        let result = config.into_definition::<String>();
        assert_eq!(
            result.err(),
            Some(ConfigError::EmptyTarget {
                state: "a".into(),
                input: "go".into()
            })
        );
    }

    #[test]
    fn rejects_empty_state_names() {
        let config = FsmConfig::from_value(json!({ "states": { "": {} } })).unwrap();
        assert_eq!(
            config.into_definition::<String>().err(),
            Some(ConfigError::EmptyStateName)
        );
    }

    #[test]
    fn malformed_json_is_a_parse_error() {
        assert!(matches!(
            FsmConfig::from_json("{ not json"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn config_round_trips_through_json() {
        let config = FsmConfig {
            initial_state: Some("a".into()),
            namespace: None,
            states: BTreeMap::from([(
                "a".to_string(),
                BTreeMap::from([("go".to_string(), "a".to_string())]),
            )]),
            catch_all: None,
        };
        let json = serde_json::to_value(&config).unwrap();
        assert_eq!(json, json!({ "initialState": "a", "states": { "a": { "go": "a" } } }));
    }
}
