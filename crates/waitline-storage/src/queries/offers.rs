// SPDX-FileCopyrightText: 2026 Waitline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Claim offer operations.
//!
//! The schema enforces at most one `pending` offer per freed slot tuple via
//! a partial unique index; the lookup here backs the coordinator's
//! idempotency guard on top of that.

use std::str::FromStr;

use rusqlite::params;
use rusqlite::types::Type;
use waitline_core::{FreedSlot, OfferStatus, WaitlineError, WaitlistOffer};

use crate::database::{Database, map_tr_err};
use crate::timefmt;

pub(crate) const OFFER_COLUMNS: &str = "id, entry_id, salon_id, service_id, employee_id, \
     slot_date, slot_start, slot_end, token_hash, token_expires_at, status, \
     attempt_no, last_error, created_at";

/// Map one row (selected via [`OFFER_COLUMNS`]) into a domain offer.
pub(crate) fn offer_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<WaitlistOffer> {
    let status_text: String = row.get(10)?;
    let status = OfferStatus::from_str(&status_text)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(10, Type::Text, Box::new(e)))?;

    Ok(WaitlistOffer {
        id: row.get(0)?,
        entry_id: row.get(1)?,
        salon_id: row.get(2)?,
        service_id: row.get(3)?,
        employee_id: row.get(4)?,
        slot_date: timefmt::parse_date(5, &row.get::<_, String>(5)?)?,
        slot_start: timefmt::parse_ts(6, &row.get::<_, String>(6)?)?,
        slot_end: row
            .get::<_, Option<String>>(7)?
            .map(|s| timefmt::parse_ts(7, &s))
            .transpose()?,
        token_hash: row.get(8)?,
        token_expires_at: timefmt::parse_ts(9, &row.get::<_, String>(9)?)?,
        status,
        attempt_no: row.get(11)?,
        last_error: row.get(12)?,
        created_at: timefmt::parse_ts(13, &row.get::<_, String>(13)?)?,
    })
}

/// Insert a new offer.
pub async fn insert(db: &Database, offer: &WaitlistOffer) -> Result<(), WaitlineError> {
    let offer = offer.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO waitlist_offers (
                     id, entry_id, salon_id, service_id, employee_id, slot_date,
                     slot_start, slot_end, token_hash, token_expires_at, status,
                     attempt_no, last_error, created_at
                 ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
                params![
                    offer.id,
                    offer.entry_id,
                    offer.salon_id,
                    offer.service_id,
                    offer.employee_id,
                    timefmt::format_date(offer.slot_date),
                    timefmt::format_ts(offer.slot_start),
                    offer.slot_end.map(timefmt::format_ts),
                    offer.token_hash,
                    timefmt::format_ts(offer.token_expires_at),
                    offer.status.to_string(),
                    offer.attempt_no,
                    offer.last_error,
                    timefmt::format_ts(offer.created_at),
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// The `pending` offer for this exact (salon, service, employee, slot start)
/// tuple, if one exists.
pub async fn find_pending_for_slot(
    db: &Database,
    slot: &FreedSlot,
) -> Result<Option<WaitlistOffer>, WaitlineError> {
    let salon_id = slot.salon_id.clone();
    let service_id = slot.service_id.clone();
    let employee_id = slot.employee_id.clone();
    let slot_start = timefmt::format_ts(slot.start);
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {OFFER_COLUMNS} FROM waitlist_offers
                 WHERE salon_id = ?1 AND service_id = ?2 AND employee_id IS ?3
                   AND slot_start = ?4 AND status = 'pending'
                 LIMIT 1"
            ))?;
            let result = stmt.query_row(
                params![salon_id, service_id, employee_id, slot_start],
                offer_from_row,
            );
            match result {
                Ok(offer) => Ok(Some(offer)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e.into()),
            }
        })
        .await
        .map_err(map_tr_err)
}

/// The `pending` offer bound to an entry's current claim, if any.
pub async fn find_pending_for_entry(
    db: &Database,
    entry_id: &str,
) -> Result<Option<WaitlistOffer>, WaitlineError> {
    let entry_id = entry_id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {OFFER_COLUMNS} FROM waitlist_offers
                 WHERE entry_id = ?1 AND status = 'pending'
                 ORDER BY created_at DESC
                 LIMIT 1"
            ))?;
            let result = stmt.query_row(params![entry_id], offer_from_row);
            match result {
                Ok(offer) => Ok(Some(offer)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e.into()),
            }
        })
        .await
        .map_err(map_tr_err)
}

/// Salon-scoped lookup by token hash.
pub async fn find_by_token_hash(
    db: &Database,
    salon_id: &str,
    token_hash: &str,
) -> Result<Option<WaitlistOffer>, WaitlineError> {
    let salon_id = salon_id.to_string();
    let token_hash = token_hash.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {OFFER_COLUMNS} FROM waitlist_offers
                 WHERE salon_id = ?1 AND token_hash = ?2"
            ))?;
            let result = stmt.query_row(params![salon_id, token_hash], offer_from_row);
            match result {
                Ok(offer) => Ok(Some(offer)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e.into()),
            }
        })
        .await
        .map_err(map_tr_err)
}

/// Update an offer's status, recording an error string when one is given.
pub async fn update_status(
    db: &Database,
    id: &str,
    status: OfferStatus,
    last_error: Option<String>,
) -> Result<(), WaitlineError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE waitlist_offers
                 SET status = ?1, last_error = COALESCE(?2, last_error)
                 WHERE id = ?3",
                params![status.to_string(), last_error, id],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Guarded offer-status update for resolver/sweep races. Returns the number
/// of rows affected (0 = the offer already left `from`).
pub async fn conditional_update_status(
    db: &Database,
    id: &str,
    from: OfferStatus,
    to: OfferStatus,
) -> Result<u64, WaitlineError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            let affected = conn.execute(
                "UPDATE waitlist_offers SET status = ?1 WHERE id = ?2 AND status = ?3",
                params![to.to_string(), id, from.to_string()],
            )?;
            Ok(affected as u64)
        })
        .await
        .map_err(map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate, TimeZone, Utc};
    use tempfile::tempdir;

    async fn setup_db() -> (Database, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let db = Database::open(db_path.to_str().unwrap()).await.unwrap();
        (db, dir)
    }

    fn make_offer(id: &str, entry_id: &str) -> WaitlistOffer {
        let start = Utc.with_ymd_and_hms(2025, 6, 1, 14, 0, 0).unwrap();
        WaitlistOffer {
            id: id.to_string(),
            entry_id: entry_id.to_string(),
            salon_id: "salon-1".to_string(),
            service_id: "svc-1".to_string(),
            employee_id: Some("emp-1".to_string()),
            slot_date: NaiveDate::from_ymd_opt(2025, 6, 1).unwrap(),
            slot_start: start,
            slot_end: Some(start + Duration::hours(1)),
            token_hash: format!("hash-{id}"),
            token_expires_at: start + Duration::minutes(15),
            status: OfferStatus::Pending,
            attempt_no: 1,
            last_error: None,
            created_at: start,
        }
    }

    fn slot_of(offer: &WaitlistOffer) -> FreedSlot {
        offer.slot()
    }

    async fn insert_backing_entry(db: &Database, entry_id: &str) {
        // Offers carry a foreign key to entries.
        let mut entry = crate::queries::entries::tests_support::make_entry(entry_id);
        entry.salon_id = "salon-1".to_string();
        crate::queries::entries::insert(db, &entry).await.unwrap();
    }

    #[tokio::test]
    async fn insert_and_find_pending_round_trips() {
        let (db, _dir) = setup_db().await;
        insert_backing_entry(&db, "e-1").await;
        let offer = make_offer("o-1", "e-1");
        insert(&db, &offer).await.unwrap();

        let found = find_pending_for_slot(&db, &slot_of(&offer))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found, offer);

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn pending_lookup_distinguishes_employee_null_from_set() {
        let (db, _dir) = setup_db().await;
        insert_backing_entry(&db, "e-1").await;
        let mut offer = make_offer("o-any", "e-1");
        offer.employee_id = None;
        insert(&db, &offer).await.unwrap();

        // Same slot but employee-specific: no pending offer recorded.
        let mut slot = slot_of(&offer);
        slot.employee_id = Some("emp-9".to_string());
        assert!(find_pending_for_slot(&db, &slot).await.unwrap().is_none());

        slot.employee_id = None;
        assert!(find_pending_for_slot(&db, &slot).await.unwrap().is_some());

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn second_pending_offer_for_same_slot_is_rejected_by_schema() {
        let (db, _dir) = setup_db().await;
        insert_backing_entry(&db, "e-1").await;
        insert_backing_entry(&db, "e-2").await;

        insert(&db, &make_offer("o-1", "e-1")).await.unwrap();

        let mut second = make_offer("o-2", "e-2");
        second.token_hash = "hash-other".to_string();
        let result = insert(&db, &second).await;
        assert!(
            result.is_err(),
            "partial unique index must reject a second pending offer"
        );

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn resolved_offer_frees_the_slot_for_a_new_pending_offer() {
        let (db, _dir) = setup_db().await;
        insert_backing_entry(&db, "e-1").await;
        insert_backing_entry(&db, "e-2").await;

        let first = make_offer("o-1", "e-1");
        insert(&db, &first).await.unwrap();
        update_status(&db, "o-1", OfferStatus::Declined, None)
            .await
            .unwrap();

        let mut second = make_offer("o-2", "e-2");
        second.token_hash = "hash-other".to_string();
        insert(&db, &second).await.unwrap();

        let found = find_pending_for_slot(&db, &slot_of(&first))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.id, "o-2");

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn find_by_token_hash_is_salon_scoped() {
        let (db, _dir) = setup_db().await;
        insert_backing_entry(&db, "e-1").await;
        let offer = make_offer("o-1", "e-1");
        insert(&db, &offer).await.unwrap();

        assert!(
            find_by_token_hash(&db, "salon-1", "hash-o-1")
                .await
                .unwrap()
                .is_some()
        );
        assert!(
            find_by_token_hash(&db, "salon-2", "hash-o-1")
                .await
                .unwrap()
                .is_none()
        );
        assert!(
            find_by_token_hash(&db, "salon-1", "no-such-hash")
                .await
                .unwrap()
                .is_none()
        );

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn conditional_update_wins_exactly_once() {
        let (db, _dir) = setup_db().await;
        insert_backing_entry(&db, "e-1").await;
        insert(&db, &make_offer("o-1", "e-1")).await.unwrap();

        let first = conditional_update_status(&db, "o-1", OfferStatus::Pending, OfferStatus::Expired)
            .await
            .unwrap();
        assert_eq!(first, 1);

        let second = conditional_update_status(&db, "o-1", OfferStatus::Pending, OfferStatus::Expired)
            .await
            .unwrap();
        assert_eq!(second, 0);

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn update_status_records_last_error() {
        let (db, _dir) = setup_db().await;
        insert_backing_entry(&db, "e-1").await;
        insert(&db, &make_offer("o-1", "e-1")).await.unwrap();

        update_status(
            &db,
            "o-1",
            OfferStatus::NotificationFailed,
            Some("sms: provider 500".to_string()),
        )
        .await
        .unwrap();

        let offer = find_by_token_hash(&db, "salon-1", "hash-o-1")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(offer.status, OfferStatus::NotificationFailed);
        assert_eq!(offer.last_error.as_deref(), Some("sms: provider 500"));

        db.close().await.unwrap();
    }
}
