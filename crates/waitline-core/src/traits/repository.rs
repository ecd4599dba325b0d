// SPDX-FileCopyrightText: 2026 Waitline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Repository traits for waitlist entries, offers, and lifecycle events.
//!
//! All exclusivity in the system flows through
//! [`EntryRepository::conditional_transition`]: a single conditional write
//! (`UPDATE ... WHERE id = ? AND status = ?`) whose affected-row count tells
//! the caller whether it won the race. Implementations MUST make this a
//! genuine compare-and-swap in the backing store -- a read-then-write
//! sequence is not equivalent.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};

use crate::error::WaitlineError;
use crate::types::{
    EntryStatus, FreedSlot, LifecycleEvent, OfferStatus, WaitlistEntry, WaitlistOffer,
};

/// Column values applied alongside a conditional status transition.
///
/// `None` leaves a column untouched; `clear_claim` nulls the claim window
/// (`notified_at`/`expires_at`) when an entry returns to the pool.
#[derive(Debug, Clone, Default)]
pub struct TransitionFields {
    pub notified_at: Option<DateTime<Utc>>,
    pub expires_at: Option<DateTime<Utc>>,
    pub clear_claim: bool,
    pub cooldown_until: Option<DateTime<Utc>>,
    pub cooldown_reason: Option<String>,
    pub decline_count: Option<i64>,
    pub booking_id: Option<String>,
}

impl TransitionFields {
    /// Fields for `waiting -> notified`: stamp the claim window.
    pub fn notify(notified_at: DateTime<Utc>, expires_at: DateTime<Utc>) -> Self {
        Self {
            notified_at: Some(notified_at),
            expires_at: Some(expires_at),
            ..Self::default()
        }
    }

    /// Fields for `notified -> booked`: attach the booking reference.
    pub fn book(booking_id: String) -> Self {
        Self {
            booking_id: Some(booking_id),
            ..Self::default()
        }
    }

    /// Fields for `notified -> waiting` after a decline: clear the claim
    /// window, bump the decline count, start the cooldown.
    pub fn requeue_declined(
        cooldown_until: DateTime<Utc>,
        decline_count: i64,
    ) -> Self {
        Self {
            clear_claim: true,
            cooldown_until: Some(cooldown_until),
            cooldown_reason: Some("declined".to_string()),
            decline_count: Some(decline_count),
            ..Self::default()
        }
    }

    /// Fields for `notified -> waiting` when a crashed round left the entry
    /// with no offer row: just clear the claim window.
    pub fn clear_orphaned_claim() -> Self {
        Self {
            clear_claim: true,
            ..Self::default()
        }
    }
}

/// Persistence seam for waitlist entries.
#[async_trait]
pub trait EntryRepository: Send + Sync {
    async fn insert(&self, entry: &WaitlistEntry) -> Result<(), WaitlineError>;

    async fn get(&self, salon_id: &str, id: &str)
        -> Result<Option<WaitlistEntry>, WaitlineError>;

    /// Entries eligible to enter matching: `waiting` status, same
    /// salon/service/date, and `cooldown_until` absent or elapsed at `now`.
    /// Ordered by `created_at` ascending.
    async fn list_candidates(
        &self,
        salon_id: &str,
        service_id: &str,
        date: NaiveDate,
        now: DateTime<Utc>,
    ) -> Result<Vec<WaitlistEntry>, WaitlineError>;

    /// An existing `waiting`/`notified` request for the same
    /// customer+service+date, used by intake deduplication.
    async fn find_active_request(
        &self,
        salon_id: &str,
        customer_id: &str,
        service_id: &str,
        date: NaiveDate,
    ) -> Result<Option<WaitlistEntry>, WaitlineError>;

    /// The compare-and-swap primitive. Updates the entry to `to` plus
    /// `fields` only where its current status is `from`, and returns the
    /// number of rows affected (0 = lost the race, 1 = won).
    async fn conditional_transition(
        &self,
        id: &str,
        from: EntryStatus,
        to: EntryStatus,
        fields: TransitionFields,
    ) -> Result<u64, WaitlineError>;

    /// `notified` entries whose claim window lapsed before `now`.
    async fn list_lapsed(
        &self,
        now: DateTime<Utc>,
        limit: u32,
    ) -> Result<Vec<WaitlistEntry>, WaitlineError>;

    /// `notified` entries with no offer row created at or after their
    /// `notified_at`, notified before `cutoff`. These are the survivors of a
    /// crash between the status transition and offer persistence.
    async fn list_orphaned(
        &self,
        cutoff: DateTime<Utc>,
        limit: u32,
    ) -> Result<Vec<WaitlistEntry>, WaitlineError>;

    async fn delete(&self, salon_id: &str, id: &str) -> Result<(), WaitlineError>;
}

/// Persistence seam for claim offers.
#[async_trait]
pub trait OfferRepository: Send + Sync {
    async fn insert(&self, offer: &WaitlistOffer) -> Result<(), WaitlineError>;

    /// The `pending` offer for this exact (salon, service, employee, slot)
    /// tuple, if one exists. At most one can: the coordinator's idempotency
    /// guard and the storage invariant both hang off this lookup.
    async fn find_pending_for_slot(
        &self,
        slot: &FreedSlot,
    ) -> Result<Option<WaitlistOffer>, WaitlineError>;

    /// The `pending` offer bound to an entry's current claim, if any. Used
    /// by the sweep to retire the offer alongside the entry.
    async fn find_pending_for_entry(
        &self,
        entry_id: &str,
    ) -> Result<Option<WaitlistOffer>, WaitlineError>;

    /// Salon-scoped lookup by token hash. The raw token is never stored, so
    /// this is the only way a claim finds its offer.
    async fn find_by_token_hash(
        &self,
        salon_id: &str,
        token_hash: &str,
    ) -> Result<Option<WaitlistOffer>, WaitlineError>;

    async fn update_status(
        &self,
        id: &str,
        status: OfferStatus,
        last_error: Option<String>,
    ) -> Result<(), WaitlineError>;

    /// Guarded offer-status update, for sweep/resolver races over the same
    /// offer. Returns the number of rows affected.
    async fn conditional_update_status(
        &self,
        id: &str,
        from: OfferStatus,
        to: OfferStatus,
    ) -> Result<u64, WaitlineError>;
}

/// Persistence seam for the append-only lifecycle audit trail.
#[async_trait]
pub trait EventRepository: Send + Sync {
    async fn append(&self, event: &LifecycleEvent) -> Result<(), WaitlineError>;

    async fn list_for_entry(
        &self,
        salon_id: &str,
        entry_id: &str,
    ) -> Result<Vec<LifecycleEvent>, WaitlineError>;
}
