use serde::{Deserialize, Serialize};

use super::flags::GameFlags;
use super::node::EndNode;
use super::variables::GameVariables;

/// One transcript line, recorded when a scene node is visited.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEntry {
    pub speaker: String,
    pub text: String,
    pub node_id: String,
}

/// Everything that distinguishes one playthrough from another.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameState {
    pub current_node_id: String,
    pub variables: GameVariables,
    #[serde(default)]
    pub flags: GameFlags,
    /// Append-only transcript in visitation order.
    #[serde(default)]
    pub log: Vec<LogEntry>,
    #[serde(default)]
    pub chapter: u32,
}

impl GameState {
    /// Fresh playthrough state positioned at `start`. Out-of-range
    /// starting values are clamped.
    pub fn new(start: impl Into<String>, variables: GameVariables) -> Self {
        Self {
            current_node_id: start.into(),
            variables: variables.clamped(),
            flags: GameFlags::new(),
            log: Vec::new(),
            chapter: 0,
        }
    }
}

/// Display data for a reached ending.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndingInfo {
    pub id: String,
    pub title: String,
    pub text: String,
}

impl From<&EndNode> for EndingInfo {
    fn from(node: &EndNode) -> Self {
        Self {
            id: node.ending_id.clone(),
            title: node.ending_title.clone(),
            text: node.ending_text.clone(),
        }
    }
}

/// A persisted snapshot, stored once per slot and once for the autosave.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaveData {
    pub state: GameState,
    /// Milliseconds since the Unix epoch.
    pub timestamp: i64,
    pub version: String,
}

/// Summary of an occupied save slot for a load/save menu.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlotInfo {
    pub timestamp: i64,
    pub chapter_label: String,
    pub node_id: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_state_is_empty() {
        let state = GameState::new("P_001", GameVariables::default());
        assert_eq!(state.current_node_id, "P_001");
        assert!(state.flags.is_empty());
        assert!(state.log.is_empty());
        assert_eq!(state.chapter, 0);
    }

    #[test]
    fn save_data_document_shape() {
        let mut state = GameState::new("C1", GameVariables::default());
        state.flags.insert("met_yuna");
        state.log.push(LogEntry {
            speaker: "유나".to_string(),
            text: "hi".to_string(),
            node_id: "S1".to_string(),
        });
        let save = SaveData {
            state,
            timestamp: 1_700_000_000_000,
            version: "1.0.0".to_string(),
        };
        let json = serde_json::to_value(&save).unwrap();
        assert_eq!(json["state"]["currentNodeId"], "C1");
        assert_eq!(json["state"]["flags"]["met_yuna"], true);
        assert_eq!(json["state"]["log"][0]["nodeId"], "S1");
        assert_eq!(json["state"]["variables"]["honesty"], 50);
        assert_eq!(json["timestamp"], 1_700_000_000_000i64);

        let back: SaveData = serde_json::from_value(json).unwrap();
        assert_eq!(back, save);
    }

    #[test]
    fn ending_info_from_end_node() {
        let node = EndNode {
            id: "END_A".to_string(),
            ending_id: "E1".to_string(),
            ending_title: "Promise".to_string(),
            ending_text: "Together".to_string(),
        };
        let info = EndingInfo::from(&node);
        assert_eq!(info.id, "E1");
        assert_eq!(info.title, "Promise");
    }
}
