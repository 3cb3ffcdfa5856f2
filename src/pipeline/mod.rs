//! Pipeline stages for the watcher.
//!
//! - `detect`: change detection between scrapes
//! - `fanout`: concurrent delivery to notification sinks
//! - `guard`: scrape sanity checks before detection
//! - `cycle`: one scrape → detect → notify → persist cycle
//! - `schedule`: interval loop with graceful shutdown

pub mod cycle;
pub mod detect;
pub mod fanout;
pub mod guard;
pub mod schedule;

pub use cycle::{CycleOutcome, CycleReport, Watcher, sanitize};
pub use detect::{ChangeDetector, DetectionResult, KeywordFilter, content_digest, detect_changes};
pub use fanout::{SinkReport, SinkResult, notify};
pub use guard::{GuardVerdict, ScrapeGuard};
pub use schedule::{ScheduleSummary, run_every, run_scheduled, shutdown_on_ctrl_c};
