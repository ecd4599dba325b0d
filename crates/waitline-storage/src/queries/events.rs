// SPDX-FileCopyrightText: 2026 Waitline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Lifecycle event operations. Append and read only -- the audit trail has
//! no update or delete path.

use std::str::FromStr;

use rusqlite::params;
use rusqlite::types::Type;
use waitline_core::{EntryStatus, LifecycleEvent, WaitlineError};

use crate::database::{Database, map_tr_err};
use crate::timefmt;

fn event_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<LifecycleEvent> {
    let from_text: String = row.get(3)?;
    let from_status = EntryStatus::from_str(&from_text)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(3, Type::Text, Box::new(e)))?;
    let to_text: String = row.get(4)?;
    let to_status = EntryStatus::from_str(&to_text)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(4, Type::Text, Box::new(e)))?;

    let metadata = row
        .get::<_, Option<String>>(6)?
        .map(|s| {
            serde_json::from_str(&s).map_err(|e| {
                rusqlite::Error::FromSqlConversionFailure(6, Type::Text, Box::new(e))
            })
        })
        .transpose()?;

    Ok(LifecycleEvent {
        id: Some(row.get(0)?),
        entry_id: row.get(1)?,
        salon_id: row.get(2)?,
        from_status,
        to_status,
        reason: row.get(5)?,
        metadata,
        created_at: timefmt::parse_ts(7, &row.get::<_, String>(7)?)?,
    })
}

/// Append one event to the audit trail.
pub async fn append(db: &Database, event: &LifecycleEvent) -> Result<(), WaitlineError> {
    let event = event.clone();
    let metadata = match &event.metadata {
        Some(value) => Some(serde_json::to_string(value).map_err(|e| {
            WaitlineError::Storage {
                source: Box::new(e),
            }
        })?),
        None => None,
    };
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO lifecycle_events (
                     entry_id, salon_id, from_status, to_status, reason, metadata, created_at
                 ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    event.entry_id,
                    event.salon_id,
                    event.from_status.to_string(),
                    event.to_status.to_string(),
                    event.reason,
                    metadata,
                    timefmt::format_ts(event.created_at),
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// All events for one entry, oldest first.
pub async fn list_for_entry(
    db: &Database,
    salon_id: &str,
    entry_id: &str,
) -> Result<Vec<LifecycleEvent>, WaitlineError> {
    let salon_id = salon_id.to_string();
    let entry_id = entry_id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, entry_id, salon_id, from_status, to_status, reason, metadata, created_at
                 FROM lifecycle_events
                 WHERE salon_id = ?1 AND entry_id = ?2
                 ORDER BY id ASC",
            )?;
            let rows = stmt.query_map(params![salon_id, entry_id], event_from_row)?;
            let mut events = Vec::new();
            for row in rows {
                events.push(row?);
            }
            Ok(events)
        })
        .await
        .map_err(map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use tempfile::tempdir;

    async fn setup_db() -> (Database, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let db = Database::open(db_path.to_str().unwrap()).await.unwrap();
        (db, dir)
    }

    fn make_event(entry_id: &str, reason: &str) -> LifecycleEvent {
        LifecycleEvent {
            id: None,
            entry_id: entry_id.to_string(),
            salon_id: "salon-1".to_string(),
            from_status: EntryStatus::Waiting,
            to_status: EntryStatus::Notified,
            reason: reason.to_string(),
            metadata: Some(serde_json::json!({"offer_id": "o-1"})),
            created_at: Utc.with_ymd_and_hms(2025, 6, 1, 14, 0, 0).unwrap(),
        }
    }

    #[tokio::test]
    async fn append_and_list_preserve_order_and_metadata() {
        let (db, _dir) = setup_db().await;

        append(&db, &make_event("e-1", "offer_created")).await.unwrap();
        append(&db, &make_event("e-1", "offer_declined")).await.unwrap();
        append(&db, &make_event("e-other", "offer_created"))
            .await
            .unwrap();

        let events = list_for_entry(&db, "salon-1", "e-1").await.unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].reason, "offer_created");
        assert_eq!(events[1].reason, "offer_declined");
        assert!(events[0].id.unwrap() < events[1].id.unwrap());
        assert_eq!(
            events[0].metadata.as_ref().unwrap()["offer_id"],
            serde_json::json!("o-1")
        );

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn list_for_unknown_entry_is_empty() {
        let (db, _dir) = setup_db().await;
        let events = list_for_entry(&db, "salon-1", "nope").await.unwrap();
        assert!(events.is_empty());
        db.close().await.unwrap();
    }
}
