// SPDX-FileCopyrightText: 2026 Waitline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-memory implementation of the repository traits for deterministic tests.
//!
//! All three seams share one mutex, so the conditional transitions have the
//! same atomicity the SQL layer provides: a check-and-mutate under the lock
//! is one indivisible step to every other task. The pending-offer uniqueness
//! the schema enforces with a partial index is simulated on insert.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};

use waitline_core::{
    EntryRepository, EntryStatus, EventRepository, FreedSlot, LifecycleEvent, OfferRepository,
    OfferStatus, TransitionFields, WaitlineError, WaitlistEntry, WaitlistOffer,
};

#[derive(Default)]
struct Inner {
    entries: HashMap<String, WaitlistEntry>,
    offers: HashMap<String, WaitlistOffer>,
    events: Vec<LifecycleEvent>,
    next_event_id: i64,
}

/// In-memory repository set implementing all three persistence seams.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of one entry, for assertions.
    pub fn entry(&self, id: &str) -> Option<WaitlistEntry> {
        self.inner.lock().unwrap().entries.get(id).cloned()
    }

    /// Snapshot of one offer, for assertions.
    pub fn offer(&self, id: &str) -> Option<WaitlistOffer> {
        self.inner.lock().unwrap().offers.get(id).cloned()
    }

    /// All offers, in unspecified order.
    pub fn offers(&self) -> Vec<WaitlistOffer> {
        self.inner.lock().unwrap().offers.values().cloned().collect()
    }

    /// All recorded events, in append order.
    pub fn events(&self) -> Vec<LifecycleEvent> {
        self.inner.lock().unwrap().events.clone()
    }

    /// Seed an entry directly, bypassing intake.
    pub fn put_entry(&self, entry: WaitlistEntry) {
        self.inner
            .lock()
            .unwrap()
            .entries
            .insert(entry.id.clone(), entry);
    }

    /// Seed an offer directly, bypassing the coordinator.
    pub fn put_offer(&self, offer: WaitlistOffer) {
        self.inner
            .lock()
            .unwrap()
            .offers
            .insert(offer.id.clone(), offer);
    }
}

fn storage_err(message: &str) -> WaitlineError {
    WaitlineError::Storage {
        source: message.to_string().into(),
    }
}

#[async_trait]
impl EntryRepository for MemoryStore {
    async fn insert(&self, entry: &WaitlistEntry) -> Result<(), WaitlineError> {
        let mut inner = self.inner.lock().unwrap();
        if inner.entries.contains_key(&entry.id) {
            return Err(storage_err("UNIQUE constraint failed: waitlist_entries.id"));
        }
        inner.entries.insert(entry.id.clone(), entry.clone());
        Ok(())
    }

    async fn get(
        &self,
        salon_id: &str,
        id: &str,
    ) -> Result<Option<WaitlistEntry>, WaitlineError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .entries
            .get(id)
            .filter(|e| e.salon_id == salon_id)
            .cloned())
    }

    async fn list_candidates(
        &self,
        salon_id: &str,
        service_id: &str,
        date: NaiveDate,
        now: DateTime<Utc>,
    ) -> Result<Vec<WaitlistEntry>, WaitlineError> {
        let inner = self.inner.lock().unwrap();
        let mut matches: Vec<WaitlistEntry> = inner
            .entries
            .values()
            .filter(|e| {
                e.salon_id == salon_id
                    && e.service_id == service_id
                    && e.preferred_date == date
                    && e.status == EntryStatus::Waiting
                    && e.cooldown_until.is_none_or(|until| until <= now)
            })
            .cloned()
            .collect();
        matches.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(matches)
    }

    async fn find_active_request(
        &self,
        salon_id: &str,
        customer_id: &str,
        service_id: &str,
        date: NaiveDate,
    ) -> Result<Option<WaitlistEntry>, WaitlineError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .entries
            .values()
            .find(|e| {
                e.salon_id == salon_id
                    && e.customer.customer_id == customer_id
                    && e.service_id == service_id
                    && e.preferred_date == date
                    && matches!(e.status, EntryStatus::Waiting | EntryStatus::Notified)
            })
            .cloned())
    }

    async fn conditional_transition(
        &self,
        id: &str,
        from: EntryStatus,
        to: EntryStatus,
        fields: TransitionFields,
    ) -> Result<u64, WaitlineError> {
        let mut inner = self.inner.lock().unwrap();
        let Some(entry) = inner.entries.get_mut(id) else {
            return Ok(0);
        };
        if entry.status != from {
            return Ok(0);
        }
        entry.status = to;
        if let Some(ts) = fields.notified_at {
            entry.notified_at = Some(ts);
        }
        if let Some(ts) = fields.expires_at {
            entry.expires_at = Some(ts);
        }
        if fields.clear_claim {
            entry.notified_at = None;
            entry.expires_at = None;
        }
        if let Some(ts) = fields.cooldown_until {
            entry.cooldown_until = Some(ts);
        }
        if let Some(reason) = fields.cooldown_reason {
            entry.cooldown_reason = Some(reason);
        }
        if let Some(count) = fields.decline_count {
            entry.decline_count = count;
        }
        if let Some(booking_id) = fields.booking_id {
            entry.booking_id = Some(booking_id);
        }
        Ok(1)
    }

    async fn list_lapsed(
        &self,
        now: DateTime<Utc>,
        limit: u32,
    ) -> Result<Vec<WaitlistEntry>, WaitlineError> {
        let inner = self.inner.lock().unwrap();
        let mut lapsed: Vec<WaitlistEntry> = inner
            .entries
            .values()
            .filter(|e| {
                e.status == EntryStatus::Notified
                    && e.expires_at.is_some_and(|expires| expires < now)
            })
            .cloned()
            .collect();
        lapsed.sort_by_key(|e| e.expires_at);
        lapsed.truncate(limit as usize);
        Ok(lapsed)
    }

    async fn list_orphaned(
        &self,
        cutoff: DateTime<Utc>,
        limit: u32,
    ) -> Result<Vec<WaitlistEntry>, WaitlineError> {
        let inner = self.inner.lock().unwrap();
        let mut orphans: Vec<WaitlistEntry> = inner
            .entries
            .values()
            .filter(|e| {
                e.status == EntryStatus::Notified
                    && e.notified_at.is_some_and(|at| at < cutoff)
                    && !inner.offers.values().any(|o| {
                        o.entry_id == e.id
                            && e.notified_at.is_some_and(|at| o.created_at >= at)
                    })
            })
            .cloned()
            .collect();
        orphans.sort_by_key(|e| e.notified_at);
        orphans.truncate(limit as usize);
        Ok(orphans)
    }

    async fn delete(&self, salon_id: &str, id: &str) -> Result<(), WaitlineError> {
        let mut inner = self.inner.lock().unwrap();
        if inner
            .entries
            .get(id)
            .is_some_and(|e| e.salon_id == salon_id)
        {
            inner.entries.remove(id);
        }
        Ok(())
    }
}

#[async_trait]
impl OfferRepository for MemoryStore {
    async fn insert(&self, offer: &WaitlistOffer) -> Result<(), WaitlineError> {
        let mut inner = self.inner.lock().unwrap();
        if offer.status == OfferStatus::Pending {
            let duplicate = inner.offers.values().any(|o| {
                o.status == OfferStatus::Pending
                    && o.salon_id == offer.salon_id
                    && o.service_id == offer.service_id
                    && o.employee_id == offer.employee_id
                    && o.slot_start == offer.slot_start
            });
            if duplicate {
                return Err(storage_err(
                    "UNIQUE constraint failed: idx_offers_one_pending_per_slot",
                ));
            }
        }
        inner.offers.insert(offer.id.clone(), offer.clone());
        Ok(())
    }

    async fn find_pending_for_slot(
        &self,
        slot: &FreedSlot,
    ) -> Result<Option<WaitlistOffer>, WaitlineError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .offers
            .values()
            .find(|o| {
                o.status == OfferStatus::Pending
                    && o.salon_id == slot.salon_id
                    && o.service_id == slot.service_id
                    && o.employee_id == slot.employee_id
                    && o.slot_start == slot.start
            })
            .cloned())
    }

    async fn find_pending_for_entry(
        &self,
        entry_id: &str,
    ) -> Result<Option<WaitlistOffer>, WaitlineError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .offers
            .values()
            .find(|o| o.entry_id == entry_id && o.status == OfferStatus::Pending)
            .cloned())
    }

    async fn find_by_token_hash(
        &self,
        salon_id: &str,
        token_hash: &str,
    ) -> Result<Option<WaitlistOffer>, WaitlineError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .offers
            .values()
            .find(|o| o.salon_id == salon_id && o.token_hash == token_hash)
            .cloned())
    }

    async fn update_status(
        &self,
        id: &str,
        status: OfferStatus,
        last_error: Option<String>,
    ) -> Result<(), WaitlineError> {
        let mut inner = self.inner.lock().unwrap();
        if let Some(offer) = inner.offers.get_mut(id) {
            offer.status = status;
            if last_error.is_some() {
                offer.last_error = last_error;
            }
        }
        Ok(())
    }

    async fn conditional_update_status(
        &self,
        id: &str,
        from: OfferStatus,
        to: OfferStatus,
    ) -> Result<u64, WaitlineError> {
        let mut inner = self.inner.lock().unwrap();
        match inner.offers.get_mut(id) {
            Some(offer) if offer.status == from => {
                offer.status = to;
                Ok(1)
            }
            _ => Ok(0),
        }
    }
}

#[async_trait]
impl EventRepository for MemoryStore {
    async fn append(&self, event: &LifecycleEvent) -> Result<(), WaitlineError> {
        let mut inner = self.inner.lock().unwrap();
        inner.next_event_id += 1;
        let mut event = event.clone();
        event.id = Some(inner.next_event_id);
        inner.events.push(event);
        Ok(())
    }

    async fn list_for_entry(
        &self,
        salon_id: &str,
        entry_id: &str,
    ) -> Result<Vec<LifecycleEvent>, WaitlineError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .events
            .iter()
            .filter(|e| e.salon_id == salon_id && e.entry_id == entry_id)
            .cloned()
            .collect())
    }
}
