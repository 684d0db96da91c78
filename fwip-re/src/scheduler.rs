//! Background job scheduling
//!
//! The analyzer and the rollback monitor run on fixed intervals with
//! `MissedTickBehavior::Skip`, so a slow run never produces a burst of
//! catch-up runs. The analyzer additionally holds an in-process lock: at
//! most one analysis batch is in flight at a time.

use std::time::Duration;

use tokio::time::interval;
use tracing::{debug, error, info};

use crate::services::{pattern_analyzer, rollback_monitor};
use crate::AppState;

/// Spawn the periodic pattern analyzer
pub fn spawn_analyzer(state: AppState) {
    let secs = state.params.analyzer_interval_secs;
    info!("Starting pattern analyzer (interval: {}s)", secs);

    tokio::spawn(async move {
        let mut timer = interval(Duration::from_secs(secs));
        timer.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            timer.tick().await;

            // Skip rather than queue if a run (scheduled or manual) is live
            let Ok(_guard) = state.analyzer_lock.try_lock() else {
                debug!("Pattern analyzer: previous run still in progress, skipping");
                continue;
            };

            if let Err(e) =
                pattern_analyzer::run_batch(&state.db, &state.event_bus, &state.params).await
            {
                error!("Pattern analyzer run failed: {}", e);
            }
        }
    });
}

/// Spawn the periodic rollback monitor
pub fn spawn_rollback_monitor(state: AppState) {
    let secs = state.params.monitor_interval_secs;
    info!("Starting rollback monitor (interval: {}s)", secs);

    tokio::spawn(async move {
        let mut timer = interval(Duration::from_secs(secs));
        timer.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            timer.tick().await;

            if let Err(e) =
                rollback_monitor::run_once(&state.db, &state.event_bus, &state.params).await
            {
                error!("Rollback monitor sweep failed: {}", e);
            }
        }
    });
}
