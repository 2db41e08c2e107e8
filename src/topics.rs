//! Topic mapping table: import source key -> catalog metadata

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use crate::error::QuizResult;
use crate::fuzzy::closest_key;

const BUNDLED_TOPICS: &str = include_str!("../data/topics.json");

/// Catalog metadata a source file maps to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopicInfo {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
}

/// Lookup table keyed by source file base name
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TopicTable {
    entries: BTreeMap<String, TopicInfo>,
}

impl TopicTable {
    /// Table shipped with the crate
    pub fn bundled() -> QuizResult<Self> {
        Self::from_json(BUNDLED_TOPICS)
    }

    pub fn from_json(json: &str) -> QuizResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> QuizResult<Self> {
        let raw = fs::read_to_string(path)?;
        Self::from_json(&raw)
    }

    pub fn insert(&mut self, key: impl Into<String>, info: TopicInfo) {
        self.entries.insert(key.into(), info);
    }

    pub fn resolve(&self, key: &str) -> Option<&TopicInfo> {
        self.entries.get(key)
    }

    /// Closest known key for a source that has no entry
    pub fn suggest(&self, key: &str) -> Option<&str> {
        closest_key(key, self.entries.keys().map(String::as_str))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
