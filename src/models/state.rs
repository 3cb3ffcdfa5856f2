//! Persisted summary of previously observed postings.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// What the detector remembers between cycles.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(tag = "mode", content = "value", rename_all = "snake_case")]
pub enum SeenState {
    /// Nothing observed yet
    #[default]
    Empty,
    /// Links seen in the last changed cycle (identity-set strategy)
    Links(BTreeSet<String>),
    /// Hex SHA-256 over the canonical record set (content-hash strategy)
    Digest(String),
}

impl SeenState {
    pub fn is_empty(&self) -> bool {
        matches!(self, SeenState::Empty)
    }

    /// Short human-readable description for logs.
    pub fn describe(&self) -> String {
        match self {
            SeenState::Empty => "empty".to_string(),
            SeenState::Links(links) => format!("{} known links", links.len()),
            SeenState::Digest(digest) => {
                format!("digest {}", digest.get(..12).unwrap_or(digest))
            }
        }
    }
}

/// On-disk state document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StateDocument {
    /// When the document was last written
    pub updated_at: DateTime<Utc>,
    /// Postings in the last scrape that passed the guard
    pub record_count: usize,
    /// Detector state
    pub state: SeenState,
}

impl StateDocument {
    pub fn new(state: SeenState, record_count: usize) -> Self {
        Self {
            updated_at: Utc::now(),
            record_count,
            state,
        }
    }

    /// Document used on first run or after an unreadable state file.
    pub fn empty() -> Self {
        Self::new(SeenState::Empty, 0)
    }

    /// Same detector state observed over a different number of records.
    pub fn with_record_count(&self, record_count: usize) -> Self {
        Self::new(self.state.clone(), record_count)
    }
}

impl Default for StateDocument {
    fn default() -> Self {
        Self::empty()
    }
}
