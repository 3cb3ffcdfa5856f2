//! Change detection between scrapes.
//!
//! Reduces the current scrape to the postings worth notifying about, and
//! computes the state to remember for the next cycle. Two strategies:
//!
//! - **Content hash** (default): a SHA-256 over the sorted canonical record
//!   set. Any difference notifies every keyword-matching posting.
//! - **Identity set**: remembers posting links and notifies only links not
//!   seen in the previous state.

use std::collections::BTreeSet;

use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::models::{DetectionStrategy, JobRecord, SeenState};

/// Outcome of comparing a scrape against the previous state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DetectionResult {
    /// Nothing to notify; keep the previous state.
    Unchanged,
    /// Persist `new_state` and notify `to_notify`.
    Changed {
        to_notify: Vec<JobRecord>,
        new_state: SeenState,
    },
    /// The set changed but no posting matched the keyword filter.
    ChangedNoMatch { new_state: SeenState },
}

impl DetectionResult {
    /// Records to hand to the notification fanout.
    pub fn to_notify(&self) -> &[JobRecord] {
        match self {
            DetectionResult::Changed { to_notify, .. } => to_notify,
            _ => &[],
        }
    }

    /// State to persist, if it changed.
    pub fn new_state(&self) -> Option<&SeenState> {
        match self {
            DetectionResult::Unchanged => None,
            DetectionResult::Changed { new_state, .. }
            | DetectionResult::ChangedNoMatch { new_state } => Some(new_state),
        }
    }
}

/// Case-insensitive substring filter over title and department.
#[derive(Debug, Clone, Default)]
pub struct KeywordFilter {
    keywords: Vec<String>,
}

impl KeywordFilter {
    pub fn new<S: AsRef<str>>(keywords: &[S]) -> Self {
        let keywords = keywords
            .iter()
            .map(|k| k.as_ref().trim().to_lowercase())
            .filter(|k| !k.is_empty())
            .collect();
        Self { keywords }
    }

    pub fn is_empty(&self) -> bool {
        self.keywords.is_empty()
    }

    pub fn matches(&self, record: &JobRecord) -> bool {
        if self.keywords.is_empty() {
            return true;
        }
        let haystack = record.keyword_haystack();
        self.keywords.iter().any(|k| haystack.contains(k.as_str()))
    }

    /// Keep matching records, preserving input order.
    pub fn apply<'a>(&self, records: impl IntoIterator<Item = &'a JobRecord>) -> Vec<JobRecord> {
        records
            .into_iter()
            .filter(|r| self.matches(r))
            .cloned()
            .collect()
    }
}

/// Stateless detector; the previous state is always passed in.
#[derive(Debug, Clone, Default)]
pub struct ChangeDetector {
    strategy: DetectionStrategy,
    filter: KeywordFilter,
}

impl ChangeDetector {
    pub fn new<S: AsRef<str>>(strategy: DetectionStrategy, keywords: &[S]) -> Self {
        Self {
            strategy,
            filter: KeywordFilter::new(keywords),
        }
    }

    pub fn strategy(&self) -> DetectionStrategy {
        self.strategy
    }

    /// True when `previous` holds nothing this strategy can compare against
    /// (first run, or state written by the other strategy).
    pub fn is_baseline(&self, previous: &SeenState) -> bool {
        !matches!(
            (self.strategy, previous),
            (DetectionStrategy::ContentHash, SeenState::Digest(_))
                | (DetectionStrategy::IdentitySet, SeenState::Links(_))
        )
    }

    /// Compare `current` against `previous`.
    ///
    /// Callers are expected to skip empty scrapes; an empty `current`
    /// yields `Unchanged` so state is never wiped.
    pub fn detect(&self, current: &[JobRecord], previous: &SeenState) -> DetectionResult {
        if current.is_empty() {
            return DetectionResult::Unchanged;
        }
        match self.strategy {
            DetectionStrategy::ContentHash => self.detect_by_hash(current, previous),
            DetectionStrategy::IdentitySet => self.detect_by_identity(current, previous),
        }
    }

    fn detect_by_hash(&self, current: &[JobRecord], previous: &SeenState) -> DetectionResult {
        let digest = content_digest(current);
        if let SeenState::Digest(prev) = previous {
            if *prev == digest {
                return DetectionResult::Unchanged;
            }
        }

        let new_state = SeenState::Digest(digest);
        let to_notify = self.filter.apply(current);
        Self::finish(to_notify, new_state)
    }

    fn detect_by_identity(&self, current: &[JobRecord], previous: &SeenState) -> DetectionResult {
        let empty = BTreeSet::new();
        let known = match previous {
            SeenState::Links(links) => links,
            // Digest or empty state carries no links
            _ => &empty,
        };

        let added: Vec<&JobRecord> = current
            .iter()
            .filter(|r| !known.contains(&r.link))
            .collect();
        if added.is_empty() {
            return DetectionResult::Unchanged;
        }

        let new_state = SeenState::Links(current.iter().map(|r| r.link.clone()).collect());
        let to_notify = self.filter.apply(added);
        Self::finish(to_notify, new_state)
    }

    fn finish(to_notify: Vec<JobRecord>, new_state: SeenState) -> DetectionResult {
        if to_notify.is_empty() {
            DetectionResult::ChangedNoMatch { new_state }
        } else {
            DetectionResult::Changed {
                to_notify,
                new_state,
            }
        }
    }
}

/// Canonical form hashed by the content-hash strategy. Field order is fixed.
#[derive(Serialize, PartialEq, Eq, PartialOrd, Ord)]
struct CanonicalRecord<'a> {
    title: &'a str,
    link: &'a str,
    department: &'a str,
    location: &'a str,
}

/// Hex SHA-256 over the records sorted by link; independent of input order
/// and of `scraped_at`.
pub fn content_digest(records: &[JobRecord]) -> String {
    let mut canonical: Vec<CanonicalRecord<'_>> = records
        .iter()
        .map(|r| CanonicalRecord {
            link: &r.link,
            title: &r.title,
            department: &r.department,
            location: &r.location,
        })
        .collect();
    canonical.sort_by(|a, b| a.link.cmp(b.link).then_with(|| a.cmp(b)));

    // Serializing borrowed strings into a Vec cannot fail
    let bytes = serde_json::to_vec(&canonical).unwrap_or_default();
    hex::encode(Sha256::digest(&bytes))
}

/// Convenience function to run detection.
pub fn detect_changes<S: AsRef<str>>(
    strategy: DetectionStrategy,
    current: &[JobRecord],
    previous: &SeenState,
    keywords: &[S],
) -> DetectionResult {
    ChangeDetector::new(strategy, keywords).detect(current, previous)
}
