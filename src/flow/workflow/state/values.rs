// SPDX-License-Identifier: MIT

//! Runtime state threaded through a workflow run

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::engine::StateMap;

/// Open-ended key/value state of one run.
///
/// Step results are shallow-merged on top: returned keys overwrite, all other
/// keys persist. Nothing removes a key once set.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WorkflowState {
    fields: StateMap,
}

impl WorkflowState {
    /// Create state from an initial mapping
    pub fn new(fields: StateMap) -> Self {
        Self { fields }
    }

    /// Create an empty WorkflowState
    pub fn empty() -> Self {
        Self::default()
    }

    /// Overwrite a single field
    pub fn update(&mut self, key: &str, value: Value) {
        self.fields.insert(key.to_string(), value);
    }

    /// Shallow-merge a step result into state
    pub fn merge(&mut self, result: StateMap) {
        for (key, value) in result {
            self.fields.insert(key, value);
        }
    }

    /// Get a field value
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// Get a nested field value using dot notation (e.g., "result.intent")
    pub fn get_path(&self, path: &str) -> Option<&Value> {
        let mut parts = path.split('.');
        let mut current = self.fields.get(parts.next()?)?;
        for part in parts {
            current = match current {
                Value::Array(items) => items.get(part.parse::<usize>().ok()?)?,
                other => other.get(part)?,
            };
        }
        Some(current)
    }

    pub fn as_map(&self) -> &StateMap {
        &self.fields
    }

    pub fn into_map(self) -> StateMap {
        self.fields
    }

    /// Get all field names
    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.fields.keys()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl From<StateMap> for WorkflowState {
    fn from(fields: StateMap) -> Self {
        Self::new(fields)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn map(value: Value) -> StateMap {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_empty_state() {
        let state = WorkflowState::empty();
        assert!(state.get("anything").is_none());
        assert!(state.is_empty());
    }

    #[test]
    fn test_merge_overwrites_and_keeps() {
        let mut state = WorkflowState::new(map(json!({"a": 1, "b": 2})));
        state.merge(map(json!({"b": 20, "c": 30})));

        assert_eq!(state.get("a"), Some(&json!(1)));
        assert_eq!(state.get("b"), Some(&json!(20)));
        assert_eq!(state.get("c"), Some(&json!(30)));
        assert_eq!(state.len(), 3);
    }

    #[test]
    fn test_merge_is_shallow() {
        let mut state = WorkflowState::new(map(json!({"meta": {"a": 1, "b": 2}})));
        state.merge(map(json!({"meta": {"a": 10}})));
        assert_eq!(state.get("meta"), Some(&json!({"a": 10})));
    }

    #[test]
    fn test_merge_same_result_twice_is_idempotent() {
        let result = map(json!({"x": 1, "y": [1, 2]}));
        let mut state = WorkflowState::new(map(json!({"seed": true})));

        state.merge(result.clone());
        let once = state.clone();
        state.merge(result);

        assert_eq!(state, once);
    }

    #[test]
    fn test_get_path() {
        let mut state = WorkflowState::empty();
        state.update("result", json!({"data": {"value": 42}, "items": ["a", "b"]}));

        assert_eq!(state.get_path("result.data"), Some(&json!({"value": 42})));
        assert_eq!(state.get_path("result.data.value"), Some(&json!(42)));
        assert_eq!(state.get_path("result.items.1"), Some(&json!("b")));
        assert_eq!(state.get_path("result.nonexistent"), None);
        assert_eq!(state.get_path("missing"), None);
    }

    #[test]
    fn test_serializes_as_plain_object() {
        let state = WorkflowState::new(map(json!({"a": 1})));
        assert_eq!(serde_json::to_value(&state).unwrap(), json!({"a": 1}));
    }
}
