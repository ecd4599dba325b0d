// SPDX-FileCopyrightText: 2026 Waitline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite implementation of the core repository traits.
//!
//! `SqliteStore` wraps a [`Database`] handle and delegates every operation
//! to the typed query modules. One store instance implements all three
//! repository seams, so the engine can hold it behind three `Arc`s or one.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use std::sync::Arc;

use waitline_core::{
    EntryRepository, EntryStatus, EventRepository, FreedSlot, LifecycleEvent, OfferRepository,
    OfferStatus, TransitionFields, WaitlineError, WaitlistEntry, WaitlistOffer,
};

use crate::database::Database;
use crate::queries;

/// SQLite-backed repository set.
pub struct SqliteStore {
    db: Database,
}

impl SqliteStore {
    /// Open (creating if needed) the database at `path` and wrap it.
    pub async fn open(path: &str) -> Result<Arc<Self>, WaitlineError> {
        let db = Database::open(path).await?;
        Ok(Arc::new(Self { db }))
    }

    pub fn from_database(db: Database) -> Arc<Self> {
        Arc::new(Self { db })
    }

    /// The underlying database handle.
    pub fn database(&self) -> &Database {
        &self.db
    }
}

#[async_trait]
impl EntryRepository for SqliteStore {
    async fn insert(&self, entry: &WaitlistEntry) -> Result<(), WaitlineError> {
        queries::entries::insert(&self.db, entry).await
    }

    async fn get(
        &self,
        salon_id: &str,
        id: &str,
    ) -> Result<Option<WaitlistEntry>, WaitlineError> {
        queries::entries::get(&self.db, salon_id, id).await
    }

    async fn list_candidates(
        &self,
        salon_id: &str,
        service_id: &str,
        date: NaiveDate,
        now: DateTime<Utc>,
    ) -> Result<Vec<WaitlistEntry>, WaitlineError> {
        queries::entries::list_candidates(&self.db, salon_id, service_id, date, now).await
    }

    async fn find_active_request(
        &self,
        salon_id: &str,
        customer_id: &str,
        service_id: &str,
        date: NaiveDate,
    ) -> Result<Option<WaitlistEntry>, WaitlineError> {
        queries::entries::find_active_request(&self.db, salon_id, customer_id, service_id, date)
            .await
    }

    async fn conditional_transition(
        &self,
        id: &str,
        from: EntryStatus,
        to: EntryStatus,
        fields: TransitionFields,
    ) -> Result<u64, WaitlineError> {
        queries::entries::conditional_transition(&self.db, id, from, to, fields).await
    }

    async fn list_lapsed(
        &self,
        now: DateTime<Utc>,
        limit: u32,
    ) -> Result<Vec<WaitlistEntry>, WaitlineError> {
        queries::entries::list_lapsed(&self.db, now, limit).await
    }

    async fn list_orphaned(
        &self,
        cutoff: DateTime<Utc>,
        limit: u32,
    ) -> Result<Vec<WaitlistEntry>, WaitlineError> {
        queries::entries::list_orphaned(&self.db, cutoff, limit).await
    }

    async fn delete(&self, salon_id: &str, id: &str) -> Result<(), WaitlineError> {
        queries::entries::delete(&self.db, salon_id, id).await
    }
}

#[async_trait]
impl OfferRepository for SqliteStore {
    async fn insert(&self, offer: &WaitlistOffer) -> Result<(), WaitlineError> {
        queries::offers::insert(&self.db, offer).await
    }

    async fn find_pending_for_slot(
        &self,
        slot: &FreedSlot,
    ) -> Result<Option<WaitlistOffer>, WaitlineError> {
        queries::offers::find_pending_for_slot(&self.db, slot).await
    }

    async fn find_pending_for_entry(
        &self,
        entry_id: &str,
    ) -> Result<Option<WaitlistOffer>, WaitlineError> {
        queries::offers::find_pending_for_entry(&self.db, entry_id).await
    }

    async fn find_by_token_hash(
        &self,
        salon_id: &str,
        token_hash: &str,
    ) -> Result<Option<WaitlistOffer>, WaitlineError> {
        queries::offers::find_by_token_hash(&self.db, salon_id, token_hash).await
    }

    async fn update_status(
        &self,
        id: &str,
        status: OfferStatus,
        last_error: Option<String>,
    ) -> Result<(), WaitlineError> {
        queries::offers::update_status(&self.db, id, status, last_error).await
    }

    async fn conditional_update_status(
        &self,
        id: &str,
        from: OfferStatus,
        to: OfferStatus,
    ) -> Result<u64, WaitlineError> {
        queries::offers::conditional_update_status(&self.db, id, from, to).await
    }
}

#[async_trait]
impl EventRepository for SqliteStore {
    async fn append(&self, event: &LifecycleEvent) -> Result<(), WaitlineError> {
        queries::events::append(&self.db, event).await
    }

    async fn list_for_entry(
        &self,
        salon_id: &str,
        entry_id: &str,
    ) -> Result<Vec<LifecycleEvent>, WaitlineError> {
        queries::events::list_for_entry(&self.db, salon_id, entry_id).await
    }
}
