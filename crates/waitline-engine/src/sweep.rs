// SPDX-FileCopyrightText: 2026 Waitline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Periodic reconciliation of lapsed claims and crash orphans.
//!
//! Safe to run redundantly on any number of workers: every mutation is the
//! same conditional transition the resolver uses, so a concurrent
//! accept/decline wins or loses cleanly and the loser's update affects zero
//! rows.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, info, warn};

use waitline_core::{
    EntryRepository, EntryStatus, EventRepository, LifecycleEvent, OfferRepository, OfferStatus,
    TransitionFields, WaitlineError,
};

/// Tunables for the sweep.
#[derive(Debug, Clone)]
pub struct SweepConfig {
    /// Maximum entries processed per pass, per category.
    pub batch_limit: u32,
    /// When true, lapsed claims requeue the entry behind a cooldown instead
    /// of expiring it.
    pub requeue_lapsed: bool,
    /// Cooldown applied when `requeue_lapsed` returns an entry to the pool.
    pub lapse_cooldown: Duration,
    /// How long a `notified` entry may sit without an offer row before it
    /// counts as a crash orphan.
    pub orphan_grace: Duration,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            batch_limit: 100,
            requeue_lapsed: false,
            lapse_cooldown: Duration::minutes(60),
            orphan_grace: Duration::minutes(10),
        }
    }
}

/// What one sweep pass did.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Lapsed entries seen in this pass.
    pub lapsed_seen: usize,
    pub expired: usize,
    pub requeued: usize,
    pub orphans_reverted: usize,
    /// Conditional updates that affected zero rows (a resolver got there
    /// first). Benign by design.
    pub lost_races: usize,
}

/// Reclaims entries whose claim window lapsed unattended, and reverts
/// entries stranded in `notified` by a crash between the transition and
/// offer persistence.
pub struct ExpirySweep {
    entries: Arc<dyn EntryRepository>,
    offers: Arc<dyn OfferRepository>,
    events: Arc<dyn EventRepository>,
    config: SweepConfig,
}

impl ExpirySweep {
    pub fn new(
        entries: Arc<dyn EntryRepository>,
        offers: Arc<dyn OfferRepository>,
        events: Arc<dyn EventRepository>,
        config: SweepConfig,
    ) -> Self {
        Self {
            entries,
            offers,
            events,
            config,
        }
    }

    /// Run one full pass at `now`.
    pub async fn run_once(&self, now: DateTime<Utc>) -> Result<SweepReport, WaitlineError> {
        let mut report = SweepReport::default();
        self.reclaim_lapsed(now, &mut report).await?;
        self.revert_orphans(now, &mut report).await?;

        if report != SweepReport::default() {
            info!(
                lapsed = report.lapsed_seen,
                expired = report.expired,
                requeued = report.requeued,
                orphans = report.orphans_reverted,
                lost_races = report.lost_races,
                "sweep pass complete"
            );
        }
        Ok(report)
    }

    async fn reclaim_lapsed(
        &self,
        now: DateTime<Utc>,
        report: &mut SweepReport,
    ) -> Result<(), WaitlineError> {
        let lapsed = self
            .entries
            .list_lapsed(now, self.config.batch_limit)
            .await?;
        report.lapsed_seen = lapsed.len();

        for entry in lapsed {
            let (to_status, fields) = if self.config.requeue_lapsed {
                (
                    EntryStatus::Waiting,
                    TransitionFields {
                        clear_claim: true,
                        cooldown_until: Some(now + self.config.lapse_cooldown),
                        cooldown_reason: Some("claim_expired".to_string()),
                        ..TransitionFields::default()
                    },
                )
            } else {
                (EntryStatus::Expired, TransitionFields::default())
            };

            let affected = self
                .entries
                .conditional_transition(&entry.id, EntryStatus::Notified, to_status, fields)
                .await?;
            if affected == 0 {
                // A concurrent accept/decline resolved this entry first.
                debug!(entry_id = %entry.id, "lapsed entry resolved concurrently");
                report.lost_races += 1;
                continue;
            }
            if self.config.requeue_lapsed {
                report.requeued += 1;
            } else {
                report.expired += 1;
            }

            if let Some(offer) = self.offers.find_pending_for_entry(&entry.id).await? {
                let n = self
                    .offers
                    .conditional_update_status(&offer.id, OfferStatus::Pending, OfferStatus::Expired)
                    .await?;
                if n == 0 {
                    debug!(offer_id = %offer.id, "offer resolved concurrently during sweep");
                }
            }

            self.append_event(
                &entry.id,
                &entry.salon_id,
                to_status,
                "claim_window_lapsed",
                serde_json::json!({ "expired_at": entry.expires_at }),
                now,
            )
            .await;
        }
        Ok(())
    }

    async fn revert_orphans(
        &self,
        now: DateTime<Utc>,
        report: &mut SweepReport,
    ) -> Result<(), WaitlineError> {
        let cutoff = now - self.config.orphan_grace;
        let orphans = self
            .entries
            .list_orphaned(cutoff, self.config.batch_limit)
            .await?;

        for entry in orphans {
            let affected = self
                .entries
                .conditional_transition(
                    &entry.id,
                    EntryStatus::Notified,
                    EntryStatus::Waiting,
                    TransitionFields::clear_orphaned_claim(),
                )
                .await?;
            if affected == 0 {
                report.lost_races += 1;
                continue;
            }
            report.orphans_reverted += 1;
            warn!(
                entry_id = %entry.id,
                notified_at = ?entry.notified_at,
                "reverted notified entry with no offer row"
            );

            self.append_event(
                &entry.id,
                &entry.salon_id,
                EntryStatus::Waiting,
                "orphaned_claim_reverted",
                serde_json::json!({ "notified_at": entry.notified_at }),
                now,
            )
            .await;
        }
        Ok(())
    }

    async fn append_event(
        &self,
        entry_id: &str,
        salon_id: &str,
        to_status: EntryStatus,
        reason: &str,
        metadata: serde_json::Value,
        now: DateTime<Utc>,
    ) {
        let event = LifecycleEvent {
            id: None,
            entry_id: entry_id.to_string(),
            salon_id: salon_id.to_string(),
            from_status: EntryStatus::Notified,
            to_status,
            reason: reason.to_string(),
            metadata: Some(metadata),
            created_at: now,
        };
        if let Err(e) = self.events.append(&event).await {
            warn!(entry_id, error = %e, "lifecycle event append failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use waitline_test_utils::MemoryStore;
    use waitline_test_utils::fixtures::{at, entry, pending_offer};

    fn sweep(store: &Arc<MemoryStore>, config: SweepConfig) -> ExpirySweep {
        ExpirySweep::new(store.clone(), store.clone(), store.clone(), config)
    }

    /// A notified entry whose window lapsed at 12:00, with its pending offer.
    fn seed_lapsed(store: &MemoryStore, entry_id: &str) {
        store.put_entry(
            entry(entry_id)
                .notified(at(11, 30), at(11, 45))
                .build(),
        );
        let mut offer = pending_offer(&format!("o-{entry_id}"), entry_id);
        offer.created_at = at(11, 30);
        offer.token_expires_at = at(11, 45);
        offer.slot_start = at(11, 30);
        store.put_offer(offer);
    }

    #[tokio::test]
    async fn lapsed_claim_expires_entry_and_offer() {
        let store = Arc::new(MemoryStore::new());
        seed_lapsed(&store, "e-1");

        let report = sweep(&store, SweepConfig::default())
            .run_once(at(12, 0))
            .await
            .unwrap();
        assert_eq!(report.lapsed_seen, 1);
        assert_eq!(report.expired, 1);
        assert_eq!(report.lost_races, 0);

        assert_eq!(store.entry("e-1").unwrap().status, EntryStatus::Expired);
        assert_eq!(store.offer("o-e-1").unwrap().status, OfferStatus::Expired);
        assert_eq!(store.events()[0].reason, "claim_window_lapsed");
    }

    #[tokio::test]
    async fn requeue_policy_returns_entry_with_cooldown() {
        let store = Arc::new(MemoryStore::new());
        seed_lapsed(&store, "e-1");

        let config = SweepConfig {
            requeue_lapsed: true,
            lapse_cooldown: Duration::minutes(60),
            ..SweepConfig::default()
        };
        let report = sweep(&store, config).run_once(at(12, 0)).await.unwrap();
        assert_eq!(report.requeued, 1);
        assert_eq!(report.expired, 0);

        let stored = store.entry("e-1").unwrap();
        assert_eq!(stored.status, EntryStatus::Waiting);
        assert_eq!(stored.cooldown_until, Some(at(13, 0)));
        assert_eq!(stored.cooldown_reason.as_deref(), Some("claim_expired"));
        assert!(stored.expires_at.is_none());
    }

    #[tokio::test]
    async fn live_claims_are_untouched() {
        let store = Arc::new(MemoryStore::new());
        store.put_entry(entry("e-live").notified(at(11, 55), at(12, 10)).build());

        let report = sweep(&store, SweepConfig::default())
            .run_once(at(12, 0))
            .await
            .unwrap();
        assert_eq!(report, SweepReport::default());
        assert_eq!(store.entry("e-live").unwrap().status, EntryStatus::Notified);
    }

    #[tokio::test]
    async fn sweep_is_idempotent_across_repeated_runs() {
        let store = Arc::new(MemoryStore::new());
        seed_lapsed(&store, "e-1");
        let sweeper = sweep(&store, SweepConfig::default());

        let first = sweeper.run_once(at(12, 0)).await.unwrap();
        assert_eq!(first.expired, 1);

        // Nothing left to do; a redundant worker sees a clean pass.
        let second = sweeper.run_once(at(12, 0)).await.unwrap();
        assert_eq!(second, SweepReport::default());
    }

    #[tokio::test]
    async fn orphaned_entry_reverts_to_waiting_after_grace() {
        let store = Arc::new(MemoryStore::new());
        // Notified 11:00, no offer row anywhere: the crash scenario.
        store.put_entry(entry("e-orphan").notified(at(11, 0), at(11, 15)).build());
        // Trim the lapsed path away so only the orphan pass acts.
        let config = SweepConfig {
            batch_limit: 100,
            orphan_grace: Duration::minutes(10),
            ..SweepConfig::default()
        };

        let report = sweep(&store, config).run_once(at(12, 0)).await.unwrap();
        assert_eq!(report.orphans_reverted, 0, "lapsed pass claims it first");
        // The entry lapsed too (expires 11:15 < 12:00), so the lapsed pass
        // expired it before the orphan pass ran.
        assert_eq!(store.entry("e-orphan").unwrap().status, EntryStatus::Expired);
    }

    #[tokio::test]
    async fn orphan_with_live_window_is_reverted_not_expired() {
        let store = Arc::new(MemoryStore::new());
        // Notified 11:30 with a window still open at sweep time, but no
        // offer row was ever written.
        store.put_entry(entry("e-orphan").notified(at(11, 30), at(12, 30)).build());

        let report = sweep(&store, SweepConfig::default())
            .run_once(at(12, 0))
            .await
            .unwrap();
        assert_eq!(report.orphans_reverted, 1);

        let stored = store.entry("e-orphan").unwrap();
        assert_eq!(stored.status, EntryStatus::Waiting);
        assert!(stored.notified_at.is_none());
        assert!(stored.expires_at.is_none());
        assert_eq!(store.events()[0].reason, "orphaned_claim_reverted");
    }

    #[tokio::test]
    async fn notified_entry_with_offer_is_not_an_orphan() {
        let store = Arc::new(MemoryStore::new());
        store.put_entry(entry("e-1").notified(at(11, 30), at(12, 30)).build());
        let mut offer = pending_offer("o-1", "e-1");
        offer.created_at = at(11, 30);
        store.put_offer(offer);

        let report = sweep(&store, SweepConfig::default())
            .run_once(at(12, 0))
            .await
            .unwrap();
        assert_eq!(report.orphans_reverted, 0);
        assert_eq!(store.entry("e-1").unwrap().status, EntryStatus::Notified);
    }

    #[tokio::test]
    async fn batch_limit_bounds_one_pass() {
        let store = Arc::new(MemoryStore::new());
        for i in 0..5 {
            seed_lapsed(&store, &format!("e-{i}"));
        }
        let config = SweepConfig {
            batch_limit: 2,
            ..SweepConfig::default()
        };
        let report = sweep(&store, config).run_once(at(12, 0)).await.unwrap();
        assert_eq!(report.lapsed_seen, 2);
        assert_eq!(report.expired, 2);
    }
}
