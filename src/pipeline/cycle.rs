// src/pipeline/cycle.rs

//! One watch cycle: scrape → guard → detect → notify → persist.
//!
//! The previous state is passed in and the state to carry forward is
//! returned in the [`CycleReport`]; the watcher itself holds no mutable
//! state between cycles. Nothing here returns an error: every failure is
//! logged and reflected in the [`CycleOutcome`].

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::error::Result;
use crate::models::{Config, JobRecord, StateDocument};
use crate::notify::{NotifyContext, Sink, build_sinks};
use crate::services::{HtmlJobScraper, JobSource};
use crate::storage::{LocalStateStore, StateStore};
use crate::utils::http;

use super::detect::{ChangeDetector, DetectionResult};
use super::fanout::{self, SinkReport};
use super::guard::{GuardVerdict, ScrapeGuard};

/// What a cycle ended with.
#[derive(Debug, Clone, PartialEq)]
pub enum CycleOutcome {
    /// Shutdown was requested before the scrape finished
    Interrupted,
    /// The listing could not be fetched or parsed
    ScrapeFailed(String),
    /// The scrape returned no postings
    EmptyScrape,
    /// The posting count dropped beyond the guard threshold
    GuardTriggered {
        current_count: usize,
        previous_count: usize,
        drop_percent: f64,
    },
    /// Nothing changed since the previous state
    Unchanged,
    /// The set changed but no posting matched the keywords
    NoMatch,
    /// First run with notifications suppressed; state recorded only
    Baseline,
    /// Sinks were invoked for `count` postings
    Notified { count: usize },
    /// Shutdown was requested while sinks were running
    Abandoned { count: usize },
}

impl fmt::Display for CycleOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CycleOutcome::Interrupted => write!(f, "interrupted"),
            CycleOutcome::ScrapeFailed(e) => write!(f, "scrape failed: {e}"),
            CycleOutcome::EmptyScrape => write!(f, "empty scrape, skipped"),
            CycleOutcome::GuardTriggered {
                current_count,
                previous_count,
                drop_percent,
            } => write!(
                f,
                "guard triggered: {previous_count} → {current_count} postings ({drop_percent:.1}% drop)"
            ),
            CycleOutcome::Unchanged => write!(f, "unchanged"),
            CycleOutcome::NoMatch => write!(f, "changed, no keyword match"),
            CycleOutcome::Baseline => write!(f, "baseline recorded"),
            CycleOutcome::Notified { count } => write!(f, "notified {count} postings"),
            CycleOutcome::Abandoned { count } => {
                write!(f, "deliveries of {count} postings abandoned")
            }
        }
    }
}

/// Result of one cycle.
#[derive(Debug, Clone)]
pub struct CycleReport {
    pub outcome: CycleOutcome,
    /// Valid postings after sanitizing
    pub scraped: usize,
    /// One entry per enabled sink, when sinks ran
    pub reports: Vec<SinkReport>,
    /// State to pass into the next cycle
    pub state: StateDocument,
    /// Whether a new state was written successfully
    pub persisted: bool,
}

impl CycleReport {
    fn skipped(outcome: CycleOutcome, scraped: usize, previous: &StateDocument) -> Self {
        Self {
            outcome,
            scraped,
            reports: Vec::new(),
            state: previous.clone(),
            persisted: false,
        }
    }

    /// Key/value pairs for a summary display.
    pub fn summary_items(&self) -> Vec<(&'static str, String)> {
        let delivered = self.reports.iter().filter(|r| r.result.is_delivered()).count();
        vec![
            ("Outcome", self.outcome.to_string()),
            ("Postings scraped", self.scraped.to_string()),
            (
                "Sinks delivered",
                format!("{}/{}", delivered, self.reports.len()),
            ),
            ("State", self.state.state.describe()),
            ("State saved", self.persisted.to_string()),
        ]
    }
}

/// Drop postings without a link and duplicate links, keeping the first.
pub fn sanitize(records: Vec<JobRecord>) -> Vec<JobRecord> {
    let total = records.len();
    let mut seen = HashSet::new();
    let sanitized: Vec<JobRecord> = records
        .into_iter()
        .filter(|r| r.is_valid() && seen.insert(r.link.clone()))
        .collect();

    if sanitized.len() < total {
        log::debug!(
            "Discarded {} postings without link or with duplicate link",
            total - sanitized.len()
        );
    }
    sanitized
}

/// Runs watch cycles against a job source, a state store and sinks.
pub struct Watcher {
    source: Arc<dyn JobSource>,
    store: Arc<dyn StateStore>,
    sinks: Vec<Arc<dyn Sink>>,
    detector: ChangeDetector,
    guard: ScrapeGuard,
    keywords: Vec<String>,
    notify_on_first_run: bool,
    sink_timeout: Duration,
}

impl Watcher {
    /// Assemble a watcher from explicit collaborators.
    pub fn new(
        config: &Config,
        source: Arc<dyn JobSource>,
        store: Arc<dyn StateStore>,
        sinks: Vec<Arc<dyn Sink>>,
    ) -> Self {
        let detector = &config.detector;
        Self {
            source,
            store,
            sinks,
            detector: ChangeDetector::new(detector.strategy, &detector.keywords),
            guard: ScrapeGuard::new(config.guard.clone()),
            keywords: detector.keywords.clone(),
            notify_on_first_run: detector.notify_on_first_run,
            sink_timeout: Duration::from_secs(config.notifications.timeout_secs),
        }
    }

    /// Build the HTML scraper, local state file and configured sinks.
    pub fn from_config(config: &Config) -> Result<Self> {
        let client = http::create_async_client(&config.scraper)?;
        let source = HtmlJobScraper::new(&config.scraper, client.clone())?;
        let store = LocalStateStore::new(&config.storage.state_file);
        let sinks = build_sinks(&config.notifications, &client);
        Ok(Self::new(config, Arc::new(source), Arc::new(store), sinks))
    }

    pub fn sinks(&self) -> &[Arc<dyn Sink>] {
        &self.sinks
    }

    pub fn sink_timeout(&self) -> Duration {
        self.sink_timeout
    }

    /// Load the persisted state. Missing or unreadable state is a fresh start.
    pub async fn load_state(&self) -> StateDocument {
        match self.store.load().await {
            Ok(Some(document)) => {
                log::info!(
                    "Loaded state from {} ({})",
                    document.updated_at,
                    document.state.describe()
                );
                document
            }
            Ok(None) => StateDocument::empty(),
            Err(e) => {
                log::warn!("Failed to load state, starting fresh: {}", e);
                StateDocument::empty()
            }
        }
    }

    /// Run one full cycle against `previous`.
    pub async fn run_cycle(
        &self,
        previous: &StateDocument,
        shutdown: &CancellationToken,
    ) -> CycleReport {
        let scraped = tokio::select! {
            biased;
            _ = shutdown.cancelled() => {
                log::info!("Shutdown requested before scrape completed");
                return CycleReport::skipped(CycleOutcome::Interrupted, 0, previous);
            }
            result = self.source.scrape() => result,
        };

        let records = match scraped {
            Ok(records) => sanitize(records),
            Err(e) => {
                log::error!("Scrape failed, skipping cycle: {}", e);
                return CycleReport::skipped(CycleOutcome::ScrapeFailed(e.to_string()), 0, previous);
            }
        };
        let count = records.len();

        match self.guard.check(count, previous.record_count) {
            GuardVerdict::EmptyResult => {
                log::warn!("Scrape returned no postings; keeping previous state");
                return CycleReport::skipped(CycleOutcome::EmptyScrape, 0, previous);
            }
            GuardVerdict::Triggered {
                current_count,
                previous_count,
                drop_percent,
            } => {
                log::error!(
                    "Guard triggered: {} → {} postings ({:.1}% drop); skipping cycle",
                    previous_count,
                    current_count,
                    drop_percent
                );
                let outcome = CycleOutcome::GuardTriggered {
                    current_count,
                    previous_count,
                    drop_percent,
                };
                return CycleReport::skipped(outcome, count, previous);
            }
            GuardVerdict::Safe { .. } | GuardVerdict::ColdStart { .. } => {}
        }

        let first_run = self.detector.is_baseline(&previous.state);
        let (to_notify, new_state) = match self.detector.detect(&records, &previous.state) {
            DetectionResult::Unchanged => {
                log::info!("No changes in {} postings", count);
                return self.refresh_count(previous, count).await;
            }
            DetectionResult::ChangedNoMatch { new_state } => (Vec::new(), new_state),
            DetectionResult::Changed {
                to_notify,
                new_state,
            } => (to_notify, new_state),
        };
        let document = StateDocument::new(new_state, count);

        let mut reports = Vec::new();
        let outcome = if to_notify.is_empty() {
            log::info!("Postings changed but none matched keywords {:?}", self.keywords);
            CycleOutcome::NoMatch
        } else if first_run && !self.notify_on_first_run {
            log::info!("First run: recording {} postings without notifying", count);
            CycleOutcome::Baseline
        } else {
            log::info!("Notifying {} postings", to_notify.len());
            let ctx = NotifyContext::new(self.keywords.clone());
            tokio::select! {
                biased;
                _ = shutdown.cancelled() => {
                    log::warn!("Shutdown requested; abandoning in-flight deliveries");
                    CycleOutcome::Abandoned { count: to_notify.len() }
                }
                delivered = fanout::notify(&to_notify, &self.sinks, &ctx, self.sink_timeout) => {
                    reports = delivered;
                    CycleOutcome::Notified { count: to_notify.len() }
                }
            }
        };

        let persisted = self.persist(&document).await;

        CycleReport {
            outcome,
            scraped: count,
            reports,
            state: document,
            persisted,
        }
    }

    /// Keep the seen state but track the current posting count, so the
    /// guard compares the next scrape against what was actually observed.
    async fn refresh_count(&self, previous: &StateDocument, count: usize) -> CycleReport {
        if previous.record_count == count {
            return CycleReport::skipped(CycleOutcome::Unchanged, count, previous);
        }

        let document = previous.with_record_count(count);
        let persisted = self.persist(&document).await;
        CycleReport {
            outcome: CycleOutcome::Unchanged,
            scraped: count,
            reports: Vec::new(),
            state: document,
            persisted,
        }
    }

    async fn persist(&self, document: &StateDocument) -> bool {
        match self.store.save(document).await {
            Ok(()) => true,
            Err(e) => {
                log::error!("Failed to save state (next run may repeat notifications): {}", e);
                false
            }
        }
    }
}
