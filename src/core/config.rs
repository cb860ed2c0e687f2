/// Session configuration, loadable from RON.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

use crate::core::traversal::DEFAULT_MAX_CHAIN_STEPS;
use crate::schema::variables::GameVariables;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("RON deserialization error: {0}")]
    Ron(#[from] ron::error::SpannedError),
}

/// Maps node ids starting with `prefix` to a human-readable chapter name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChapterLabel {
    pub prefix: String,
    pub label: String,
}

impl ChapterLabel {
    pub fn new(prefix: &str, label: &str) -> Self {
        Self {
            prefix: prefix.to_string(),
            label: label.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub slot_count: usize,
    pub save_version: String,
    /// Prefix of every storage key the session writes.
    pub key_prefix: String,
    /// Jump/branch hops allowed per transition before it is abandoned.
    pub max_chain_steps: usize,
    pub initial_variables: GameVariables,
    /// Checked in order; the first matching prefix wins.
    pub chapter_labels: Vec<ChapterLabel>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            slot_count: 6,
            save_version: "1.0.0".to_string(),
            key_prefix: "vn".to_string(),
            max_chain_steps: DEFAULT_MAX_CHAIN_STEPS,
            initial_variables: GameVariables::default(),
            chapter_labels: vec![
                ChapterLabel::new("P", "Prologue"),
                ChapterLabel::new("C1", "Chapter 1"),
                ChapterLabel::new("C2", "Chapter 2"),
                ChapterLabel::new("C3", "Chapter 3"),
            ],
        }
    }
}

impl SessionConfig {
    pub fn load_from_ron(path: &Path) -> Result<SessionConfig, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse_ron(&contents)
    }

    /// Parse a config from RON. Omitted fields keep their defaults.
    pub fn parse_ron(input: &str) -> Result<SessionConfig, ConfigError> {
        Ok(ron::from_str(input)?)
    }

    /// Chapter name for a node id, or an empty string when nothing matches.
    pub fn chapter_label(&self, node_id: &str) -> &str {
        self.chapter_labels
            .iter()
            .find(|entry| node_id.starts_with(entry.prefix.as_str()))
            .map(|entry| entry.label.as_str())
            .unwrap_or("")
    }

    pub fn gallery_key(&self) -> String {
        format!("{}_gallery", self.key_prefix)
    }

    pub fn endings_key(&self) -> String {
        format!("{}_endings", self.key_prefix)
    }
}
