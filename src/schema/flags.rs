use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Story-progress flags with presence semantics: a flag is set iff its key
/// is present. Absent keys read as `false`.
///
/// Serialized as a JSON object mapping each set key to `true`. Keys stored
/// with `false` are dropped on load, so a document never resurrects an
/// unset flag.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "BTreeMap<String, bool>", into = "BTreeMap<String, bool>")]
pub struct GameFlags {
    set: FxHashSet<String>,
}

impl GameFlags {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_set(&self, key: &str) -> bool {
        self.set.contains(key)
    }

    pub fn insert(&mut self, key: impl Into<String>) {
        self.set.insert(key.into());
    }

    /// Remove the key entirely. Removing an absent key is a no-op.
    pub fn remove(&mut self, key: &str) {
        self.set.remove(key);
    }

    pub fn len(&self) -> usize {
        self.set.len()
    }

    pub fn is_empty(&self) -> bool {
        self.set.is_empty()
    }

    /// Set keys in sorted order.
    pub fn keys(&self) -> Vec<&str> {
        let mut keys: Vec<&str> = self.set.iter().map(String::as_str).collect();
        keys.sort_unstable();
        keys
    }
}

impl From<BTreeMap<String, bool>> for GameFlags {
    fn from(map: BTreeMap<String, bool>) -> Self {
        Self {
            set: map
                .into_iter()
                .filter_map(|(key, present)| present.then_some(key))
                .collect(),
        }
    }
}

impl From<GameFlags> for BTreeMap<String, bool> {
    fn from(flags: GameFlags) -> Self {
        flags.set.into_iter().map(|key| (key, true)).collect()
    }
}

impl<S: Into<String>> FromIterator<S> for GameFlags {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self {
            set: iter.into_iter().map(Into::into).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absent_key_reads_false() {
        let flags = GameFlags::new();
        assert!(!flags.is_set("met_yuna"));
    }

    #[test]
    fn insert_and_remove() {
        let mut flags = GameFlags::new();
        flags.insert("met_yuna");
        assert!(flags.is_set("met_yuna"));
        flags.remove("met_yuna");
        assert!(!flags.is_set("met_yuna"));
        assert!(flags.is_empty());
    }

    #[test]
    fn serializes_as_map_of_true() {
        let flags: GameFlags = ["b", "a"].into_iter().collect();
        let json = serde_json::to_string(&flags).unwrap();
        assert_eq!(json, r#"{"a":true,"b":true}"#);
    }

    #[test]
    fn false_entries_dropped_on_load() {
        let flags: GameFlags = serde_json::from_str(r#"{"kept":true,"gone":false}"#).unwrap();
        assert!(flags.is_set("kept"));
        assert!(!flags.is_set("gone"));
        assert_eq!(flags.len(), 1);
    }

    #[test]
    fn keys_sorted() {
        let flags: GameFlags = ["zeta", "alpha", "mid"].into_iter().collect();
        assert_eq!(flags.keys(), vec!["alpha", "mid", "zeta"]);
    }
}
