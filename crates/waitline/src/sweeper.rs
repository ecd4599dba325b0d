// SPDX-FileCopyrightText: 2026 Waitline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Periodic expiry sweep runner.
//!
//! The sweep itself is idempotent and race-safe, so this loop needs no
//! coordination with other workers running the same thing.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use waitline_engine::ExpirySweep;

/// Run sweep passes on `interval` until `cancel` fires.
pub async fn run_loop(sweep: Arc<ExpirySweep>, interval: Duration, cancel: CancellationToken) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {
                if let Err(e) = sweep.run_once(Utc::now()).await {
                    warn!(error = %e, "sweep pass failed");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration as ChronoDuration;
    use waitline_engine::SweepConfig;
    use waitline_test_utils::MemoryStore;
    use waitline_test_utils::fixtures::entry;

    #[tokio::test]
    async fn loop_runs_passes_and_stops_on_cancel() {
        let store = Arc::new(MemoryStore::new());
        let now = Utc::now();
        store.put_entry(
            entry("e-lapsed")
                .notified(now - ChronoDuration::minutes(30), now - ChronoDuration::minutes(15))
                .build(),
        );

        let sweep = Arc::new(ExpirySweep::new(
            store.clone(),
            store.clone(),
            store.clone(),
            SweepConfig::default(),
        ));
        let cancel = CancellationToken::new();
        let handle = tokio::spawn(run_loop(
            sweep,
            Duration::from_millis(20),
            cancel.clone(),
        ));

        // Give the loop a couple of ticks, then stop it.
        tokio::time::sleep(Duration::from_millis(100)).await;
        cancel.cancel();
        handle.await.unwrap();

        assert_eq!(
            store.entry("e-lapsed").unwrap().status,
            waitline_core::EntryStatus::Expired
        );
    }
}
