// src/pipeline/schedule.rs

//! Interval scheduler for watch cycles.
//!
//! Cycles run sequentially on one task. Ticks missed while a cycle is
//! still running are skipped, so cycles never overlap.

use std::time::Duration;

use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::models::{ScheduleConfig, StateDocument};
use crate::utils::display;

use super::cycle::Watcher;

/// Totals returned when the scheduler stops.
#[derive(Debug, Clone)]
pub struct ScheduleSummary {
    pub cycles: u64,
    pub state: StateDocument,
}

/// Cancel the returned token on Ctrl-C.
pub fn shutdown_on_ctrl_c() -> CancellationToken {
    let token = CancellationToken::new();
    let trigger = token.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => log::info!("Ctrl-C received, shutting down"),
            Err(e) => log::error!("Failed to listen for Ctrl-C: {}", e),
        }
        trigger.cancel();
    });
    token
}

/// Run cycles on the configured interval until `shutdown` is cancelled.
pub async fn run_scheduled(
    watcher: &Watcher,
    schedule: &ScheduleConfig,
    shutdown: CancellationToken,
) -> ScheduleSummary {
    let period = Duration::from_secs(schedule.interval_minutes.max(1) * 60);
    run_every(watcher, period, schedule.run_on_start, shutdown).await
}

/// Run cycles every `period` until `shutdown` is cancelled.
pub async fn run_every(
    watcher: &Watcher,
    period: Duration,
    run_on_start: bool,
    shutdown: CancellationToken,
) -> ScheduleSummary {
    let mut state = watcher.load_state().await;
    let start = if run_on_start {
        Instant::now()
    } else {
        Instant::now() + period
    };
    let mut ticker = tokio::time::interval_at(start, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    log::info!("Watching every {:?}", period);
    let mut cycles = 0u64;

    loop {
        tokio::select! {
            biased;
            _ = shutdown.cancelled() => break,
            _ = ticker.tick() => {
                cycles += 1;
                log::info!("Cycle {} starting", cycles);
                let report = watcher.run_cycle(&state, &shutdown).await;
                log::info!(
                    "{}",
                    display::summary(&format!("Cycle {cycles}"), &report.summary_items())
                );
                state = report.state;
            }
        }
    }

    log::info!("Scheduler stopped after {} cycles", cycles);
    ScheduleSummary { cycles, state }
}
