//! Concurrent, best-effort delivery to all enabled sinks.
//!
//! Each enabled sink runs in its own task with its own timeout. A failure,
//! timeout or panic in one sink is captured as a [`SinkResult::Failed`]
//! and never affects the others. Failure is data here, not an error.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use serde::Serialize;
use tokio_util::task::AbortOnDropHandle;

use crate::models::JobRecord;
use crate::notify::{NotifyContext, Sink};

/// Outcome of one sink invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SinkResult {
    Delivered { details: String },
    Failed { reason: String },
}

impl SinkResult {
    pub fn is_delivered(&self) -> bool {
        matches!(self, SinkResult::Delivered { .. })
    }
}

impl fmt::Display for SinkResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SinkResult::Delivered { details } => write!(f, "delivered ({details})"),
            SinkResult::Failed { reason } => write!(f, "failed ({reason})"),
        }
    }
}

/// Sink outcome tagged with the sink name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SinkReport {
    pub sink: String,
    #[serde(flatten)]
    pub result: SinkResult,
}

impl fmt::Display for SinkReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.sink, self.result)
    }
}

/// Deliver `to_notify` to every enabled sink concurrently.
///
/// Disabled sinks produce no report. Reports follow the order of the
/// enabled sinks in `sinks`. Dropping the returned future aborts every
/// delivery still in flight.
pub async fn notify(
    to_notify: &[JobRecord],
    sinks: &[Arc<dyn Sink>],
    ctx: &NotifyContext,
    timeout: Duration,
) -> Vec<SinkReport> {
    let records: Arc<[JobRecord]> = Arc::from(to_notify);
    let ctx = Arc::new(ctx.clone());

    let deliveries = sinks.iter().filter(|s| s.is_enabled()).map(|sink| {
        let name = sink.name().to_string();
        let handle = AbortOnDropHandle::new(tokio::spawn(deliver(
            Arc::clone(sink),
            Arc::clone(&records),
            Arc::clone(&ctx),
            timeout,
        )));

        async move {
            let result = handle.await.unwrap_or_else(|e| SinkResult::Failed {
                reason: if e.is_panic() {
                    "sink panicked".to_string()
                } else {
                    format!("sink task cancelled: {e}")
                },
            });
            SinkReport { sink: name, result }
        }
    });

    let reports = join_all(deliveries).await;
    for report in &reports {
        if report.result.is_delivered() {
            log::info!("Sink {}", report);
        } else {
            log::warn!("Sink {}", report);
        }
    }
    reports
}

async fn deliver(
    sink: Arc<dyn Sink>,
    records: Arc<[JobRecord]>,
    ctx: Arc<NotifyContext>,
    timeout: Duration,
) -> SinkResult {
    match tokio::time::timeout(timeout, sink.send(&records, &ctx)).await {
        Ok(Ok(details)) => SinkResult::Delivered { details },
        Ok(Err(e)) => SinkResult::Failed {
            reason: e.to_string(),
        },
        Err(_) => SinkResult::Failed {
            reason: format!("timed out after {timeout:?}"),
        },
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use tokio::time::Instant;

    use super::*;
    use crate::error::{AppError, Result};
    use crate::notify::DisabledSink;

    enum Behavior {
        Succeed,
        Fail,
        Panic,
        Hang,
        Sleep(Duration),
    }

    struct MockSink {
        name: String,
        behavior: Behavior,
        calls: AtomicUsize,
        seen: Mutex<Vec<String>>,
        finished_at: Mutex<Option<Instant>>,
    }

    impl MockSink {
        fn new(name: &str, behavior: Behavior) -> Arc<Self> {
            Arc::new(Self {
                name: name.to_string(),
                behavior,
                calls: AtomicUsize::new(0),
                seen: Mutex::new(Vec::new()),
                finished_at: Mutex::new(None),
            })
        }
    }

    #[async_trait]
    impl Sink for MockSink {
        fn name(&self) -> &str {
            &self.name
        }

        fn target(&self) -> String {
            "mock".to_string()
        }

        async fn send(&self, records: &[JobRecord], _ctx: &NotifyContext) -> Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            *self.seen.lock().unwrap() = records.iter().map(|r| r.link.clone()).collect();
            match self.behavior {
                Behavior::Succeed => Ok(format!("{} records", records.len())),
                Behavior::Sleep(delay) => {
                    tokio::time::sleep(delay).await;
                    *self.finished_at.lock().unwrap() = Some(Instant::now());
                    Ok(format!("slept {delay:?}"))
                }
                Behavior::Fail => Err(AppError::sink(&self.name, "boom")),
                Behavior::Panic => panic!("sink exploded"),
                Behavior::Hang => {
                    tokio::time::sleep(Duration::from_secs(3600)).await;
                    Ok("late".to_string())
                }
            }
        }
    }

    fn records() -> Vec<JobRecord> {
        vec![
            JobRecord::new("A", "https://example.com/a", "Eng", "Remote"),
            JobRecord::new("B", "https://example.com/b", "Eng", "Remote"),
        ]
    }

    fn as_sinks(sinks: &[Arc<MockSink>]) -> Vec<Arc<dyn Sink>> {
        sinks.iter().map(|s| Arc::clone(s) as Arc<dyn Sink>).collect()
    }

    #[tokio::test]
    async fn test_failing_sink_is_isolated() {
        let mocks = [
            MockSink::new("one", Behavior::Succeed),
            MockSink::new("two", Behavior::Fail),
            MockSink::new("three", Behavior::Succeed),
        ];
        let ctx = NotifyContext::new(vec![]);

        let reports = notify(&records(), &as_sinks(&mocks), &ctx, Duration::from_secs(5)).await;

        assert_eq!(reports.len(), 3);
        assert_eq!(reports[0].sink, "one");
        assert!(reports[0].result.is_delivered());
        assert_eq!(
            reports[1].result,
            SinkResult::Failed {
                reason: "Sink 'two' failed: boom".to_string()
            }
        );
        assert!(reports[2].result.is_delivered());
    }

    #[tokio::test]
    async fn test_panic_and_timeout_are_failures() {
        let mocks = [
            MockSink::new("panics", Behavior::Panic),
            MockSink::new("hangs", Behavior::Hang),
            MockSink::new("ok", Behavior::Succeed),
        ];
        let ctx = NotifyContext::new(vec![]);

        let reports =
            notify(&records(), &as_sinks(&mocks), &ctx, Duration::from_millis(50)).await;

        assert_eq!(
            reports[0].result,
            SinkResult::Failed {
                reason: "sink panicked".to_string()
            }
        );
        assert_eq!(
            reports[1].result,
            SinkResult::Failed {
                reason: "timed out after 50ms".to_string()
            }
        );
        assert_eq!(
            reports[2].result,
            SinkResult::Delivered {
                details: "2 records".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_disabled_sinks_are_skipped() {
        let enabled = MockSink::new("enabled", Behavior::Succeed);
        let sinks: Vec<Arc<dyn Sink>> = vec![
            Arc::new(DisabledSink::new("off", "disabled in config")),
            Arc::clone(&enabled) as Arc<dyn Sink>,
            Arc::new(DisabledSink::new("broken", "missing api_key")),
        ];
        let ctx = NotifyContext::new(vec![]);

        let reports = notify(&records(), &sinks, &ctx, Duration::from_secs(5)).await;

        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].sink, "enabled");
        assert_eq!(enabled.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_every_sink_receives_same_records() {
        let mocks = [
            MockSink::new("one", Behavior::Succeed),
            MockSink::new("two", Behavior::Fail),
        ];
        let ctx = NotifyContext::new(vec![]);
        let input = records();

        notify(&input, &as_sinks(&mocks), &ctx, Duration::from_secs(5)).await;

        let expected: Vec<String> = input.iter().map(|r| r.link.clone()).collect();
        for mock in &mocks {
            assert_eq!(*mock.seen.lock().unwrap(), expected);
        }
    }

    #[tokio::test]
    async fn test_slow_sink_does_not_delay_others() {
        let mocks = [
            MockSink::new("fast-1", Behavior::Sleep(Duration::from_millis(100))),
            MockSink::new("slow", Behavior::Sleep(Duration::from_millis(400))),
            MockSink::new("fast-2", Behavior::Sleep(Duration::from_millis(100))),
        ];
        let ctx = NotifyContext::new(vec![]);

        let started = Instant::now();
        let reports = notify(&records(), &as_sinks(&mocks), &ctx, Duration::from_secs(5)).await;
        let elapsed = started.elapsed();

        assert!(reports.iter().all(|r| r.result.is_delivered()));
        // Sequential delivery would take 600ms
        assert!(elapsed < Duration::from_millis(550), "took {elapsed:?}");

        let finished = |i: usize| mocks[i].finished_at.lock().unwrap().unwrap();
        assert!(finished(0) < finished(1));
        assert!(finished(2) < finished(1));
    }

    #[tokio::test]
    async fn test_dropping_notify_aborts_deliveries() {
        let mock = MockSink::new("slow", Behavior::Sleep(Duration::from_millis(100)));
        let sinks = as_sinks(std::slice::from_ref(&mock));
        let ctx = NotifyContext::new(vec![]);

        let dropped = tokio::time::timeout(
            Duration::from_millis(20),
            notify(&records(), &sinks, &ctx, Duration::from_secs(5)),
        )
        .await;
        assert!(dropped.is_err());

        tokio::time::sleep(Duration::from_millis(250)).await;
        assert_eq!(mock.calls.load(Ordering::SeqCst), 1);
        assert!(mock.finished_at.lock().unwrap().is_none());
    }

    #[test]
    fn test_report_display() {
        let delivered = SinkReport {
            sink: "file".to_string(),
            result: SinkResult::Delivered {
                details: "appended 2 postings".to_string(),
            },
        };
        let failed = SinkReport {
            sink: "chat".to_string(),
            result: SinkResult::Failed {
                reason: "timed out after 30s".to_string(),
            },
        };

        assert_eq!(delivered.to_string(), "file: delivered (appended 2 postings)");
        assert_eq!(failed.to_string(), "chat: failed (timed out after 30s)");
    }

    #[tokio::test]
    async fn test_no_sinks_no_reports() {
        let ctx = NotifyContext::new(vec![]);
        let reports = notify(&records(), &[], &ctx, Duration::from_secs(5)).await;
        assert!(reports.is_empty());
    }
}
