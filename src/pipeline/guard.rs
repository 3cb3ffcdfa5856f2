//! Scrape sanity guard.
//!
//! Runs before detection. An empty scrape is treated as an upstream failure
//! rather than "every posting was removed", and an optional drop threshold
//! rejects scrapes that lost too many postings compared to the last
//! remembered count.

use crate::models::GuardConfig;

/// Result of a guard check.
#[derive(Debug, Clone, PartialEq)]
pub enum GuardVerdict {
    /// Safe to run detection
    Safe {
        current_count: usize,
        previous_count: usize,
    },
    /// No usable previous count (first run or below baseline)
    ColdStart { current_count: usize },
    /// Drop exceeds the configured threshold
    Triggered {
        current_count: usize,
        previous_count: usize,
        drop_percent: f64,
    },
    /// Scrape returned nothing
    EmptyResult,
}

impl GuardVerdict {
    pub fn is_safe(&self) -> bool {
        matches!(
            self,
            GuardVerdict::Safe { .. } | GuardVerdict::ColdStart { .. }
        )
    }
}

#[derive(Debug, Clone, Default)]
pub struct ScrapeGuard {
    config: GuardConfig,
}

impl ScrapeGuard {
    pub fn new(config: GuardConfig) -> Self {
        Self { config }
    }

    /// Check a scrape of `current_count` records against the count the
    /// previous state was computed from.
    pub fn check(&self, current_count: usize, previous_count: usize) -> GuardVerdict {
        if current_count == 0 {
            return GuardVerdict::EmptyResult;
        }

        let Some(max_drop) = self.config.max_drop_percent else {
            return GuardVerdict::Safe {
                current_count,
                previous_count,
            };
        };

        if previous_count == 0 || previous_count < self.config.min_baseline {
            return GuardVerdict::ColdStart { current_count };
        }

        if current_count < previous_count {
            let drop = previous_count - current_count;
            let drop_percent = (drop as f64 / previous_count as f64) * 100.0;

            if drop_percent > max_drop as f64 {
                return GuardVerdict::Triggered {
                    current_count,
                    previous_count,
                    drop_percent,
                };
            }
        }

        GuardVerdict::Safe {
            current_count,
            previous_count,
        }
    }
}
