use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

use super::node::GameNode;

#[derive(Debug, Error)]
pub enum ScenarioError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON deserialization error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("scenario failed validation with {} error(s): {}", .0.len(), .0.join("; "))]
    Invalid(Vec<String>),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScenarioMeta {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub author: String,
}

/// Immutable authored content: a directed graph of nodes keyed by id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scenario {
    #[serde(default)]
    pub meta: ScenarioMeta,
    pub start: String,
    pub nodes: FxHashMap<String, GameNode>,
}

impl Scenario {
    /// Load a scenario from a JSON file.
    pub fn load_from_json(path: &Path) -> Result<Scenario, ScenarioError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse_json(&contents)
    }

    /// Parse a scenario from a JSON string.
    ///
    /// Nodes that omit their `id` inherit the key they are stored under.
    /// No structural checks happen here; run the validator before play.
    pub fn parse_json(input: &str) -> Result<Scenario, ScenarioError> {
        let mut scenario: Scenario = serde_json::from_str(input)?;
        scenario.fill_missing_ids();
        Ok(scenario)
    }

    /// Build a scenario from nodes, keying each by its own id.
    pub fn from_nodes(
        meta: ScenarioMeta,
        start: impl Into<String>,
        nodes: impl IntoIterator<Item = GameNode>,
    ) -> Scenario {
        Scenario {
            meta,
            start: start.into(),
            nodes: nodes
                .into_iter()
                .map(|node| (node.id().to_string(), node))
                .collect(),
        }
    }

    pub fn to_json_pretty(&self) -> Result<String, ScenarioError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn get_node(&self, id: &str) -> Option<&GameNode> {
        self.nodes.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.nodes.contains_key(id)
    }

    /// Node ids in sorted order, for reports that must be stable.
    pub fn sorted_ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.nodes.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }

    fn fill_missing_ids(&mut self) {
        for (key, node) in self.nodes.iter_mut() {
            let id = node.id_mut();
            if id.is_empty() {
                id.clone_from(key);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::node::NodeKind;

    const TINY: &str = r#"{
        "meta": {"title": "Tiny", "version": "1.0.0", "author": "tester"},
        "start": "S1",
        "nodes": {
            "S1": {"type": "scene", "speaker": "", "text": "It begins.", "next": "E1"},
            "E1": {"type": "end", "id": "E1", "endingId": "E1", "endingTitle": "T", "endingText": "D"}
        }
    }"#;

    #[test]
    fn parse_fills_missing_ids_from_keys() {
        let scenario = Scenario::parse_json(TINY).unwrap();
        assert_eq!(scenario.meta.title, "Tiny");
        assert_eq!(scenario.start, "S1");
        assert_eq!(scenario.get_node("S1").unwrap().id(), "S1");
        assert_eq!(scenario.get_node("E1").unwrap().kind(), NodeKind::End);
    }

    #[test]
    fn parse_error_is_reported() {
        let err = Scenario::parse_json("{\"start\": 3}").unwrap_err();
        assert!(matches!(err, ScenarioError::Json(_)));
    }

    #[test]
    fn sorted_ids_are_stable() {
        let scenario = Scenario::parse_json(TINY).unwrap();
        assert_eq!(scenario.sorted_ids(), vec!["E1", "S1"]);
    }

    #[test]
    fn missing_meta_defaults() {
        let scenario = Scenario::parse_json(
            r#"{"start":"E","nodes":{"E":{"type":"end","endingId":"E","endingTitle":"","endingText":""}}}"#,
        )
        .unwrap();
        assert_eq!(scenario.meta, ScenarioMeta::default());
    }

    #[test]
    fn invalid_error_lists_messages() {
        let err = ScenarioError::Invalid(vec!["a".to_string(), "b".to_string()]);
        assert_eq!(
            err.to_string(),
            "scenario failed validation with 2 error(s): a; b"
        );
    }
}
