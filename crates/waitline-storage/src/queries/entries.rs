// SPDX-FileCopyrightText: 2026 Waitline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Waitlist entry operations, including the conditional status transition
//! every state change in the system goes through.

use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::params;
use rusqlite::types::Type;
use waitline_core::{
    CustomerContact, EntryStatus, PreferenceMode, PriorityOverride, TransitionFields,
    WaitlineError, WaitlistEntry,
};

use crate::database::{Database, map_tr_err};
use crate::timefmt;

pub(crate) const ENTRY_COLUMNS: &str = "id, salon_id, customer_id, customer_name, \
     customer_email, customer_phone, service_id, employee_id, preferred_date, \
     preference_mode, preferred_time_start, preferred_time_end, flex_window_minutes, \
     status, priority_override_score, priority_override_reason, priority_override_by, \
     priority_override_at, priority_score_snapshot, notified_at, expires_at, \
     cooldown_until, cooldown_reason, decline_count, booking_id, created_at";

/// Map one row (selected via [`ENTRY_COLUMNS`]) into a domain entry.
pub(crate) fn entry_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<WaitlistEntry> {
    let created_at = timefmt::parse_ts(25, &row.get::<_, String>(25)?)?;

    let status_text: String = row.get(13)?;
    let status = EntryStatus::from_str(&status_text)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(13, Type::Text, Box::new(e)))?;
    let mode_text: String = row.get(9)?;
    let preference_mode = PreferenceMode::from_str(&mode_text)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(9, Type::Text, Box::new(e)))?;

    let priority_override = match row.get::<_, Option<i64>>(14)? {
        Some(score) => Some(PriorityOverride {
            score,
            reason: row.get::<_, Option<String>>(15)?.unwrap_or_default(),
            set_by: row.get::<_, Option<String>>(16)?.unwrap_or_default(),
            set_at: opt_ts(17, row.get(17)?)?.unwrap_or(created_at),
        }),
        None => None,
    };

    Ok(WaitlistEntry {
        id: row.get(0)?,
        salon_id: row.get(1)?,
        customer: CustomerContact {
            customer_id: row.get(2)?,
            display_name: row.get(3)?,
            email: row.get(4)?,
            phone: row.get(5)?,
        },
        service_id: row.get(6)?,
        employee_id: row.get(7)?,
        preferred_date: timefmt::parse_date(8, &row.get::<_, String>(8)?)?,
        preference_mode,
        preferred_time_start: opt_time(10, row.get(10)?)?,
        preferred_time_end: opt_time(11, row.get(11)?)?,
        flex_window_minutes: row.get(12)?,
        status,
        priority_override,
        priority_score_snapshot: row.get(18)?,
        notified_at: opt_ts(19, row.get(19)?)?,
        expires_at: opt_ts(20, row.get(20)?)?,
        cooldown_until: opt_ts(21, row.get(21)?)?,
        cooldown_reason: row.get(22)?,
        decline_count: row.get(23)?,
        booking_id: row.get(24)?,
        created_at,
    })
}

fn opt_ts(
    idx: usize,
    value: Option<String>,
) -> rusqlite::Result<Option<DateTime<Utc>>> {
    value.map(|s| timefmt::parse_ts(idx, &s)).transpose()
}

fn opt_time(
    idx: usize,
    value: Option<String>,
) -> rusqlite::Result<Option<chrono::NaiveTime>> {
    value.map(|s| timefmt::parse_time(idx, &s)).transpose()
}

/// Insert a new entry.
pub async fn insert(db: &Database, entry: &WaitlistEntry) -> Result<(), WaitlineError> {
    let entry = entry.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO waitlist_entries (
                     id, salon_id, customer_id, customer_name, customer_email,
                     customer_phone, service_id, employee_id, preferred_date,
                     preference_mode, preferred_time_start, preferred_time_end,
                     flex_window_minutes, status, priority_override_score,
                     priority_override_reason, priority_override_by,
                     priority_override_at, priority_score_snapshot, notified_at,
                     expires_at, cooldown_until, cooldown_reason, decline_count,
                     booking_id, created_at
                 ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13,
                           ?14, ?15, ?16, ?17, ?18, ?19, ?20, ?21, ?22, ?23, ?24,
                           ?25, ?26)",
                params![
                    entry.id,
                    entry.salon_id,
                    entry.customer.customer_id,
                    entry.customer.display_name,
                    entry.customer.email,
                    entry.customer.phone,
                    entry.service_id,
                    entry.employee_id,
                    timefmt::format_date(entry.preferred_date),
                    entry.preference_mode.to_string(),
                    entry.preferred_time_start.map(timefmt::format_time),
                    entry.preferred_time_end.map(timefmt::format_time),
                    entry.flex_window_minutes,
                    entry.status.to_string(),
                    entry.priority_override.as_ref().map(|o| o.score),
                    entry.priority_override.as_ref().map(|o| o.reason.clone()),
                    entry.priority_override.as_ref().map(|o| o.set_by.clone()),
                    entry
                        .priority_override
                        .as_ref()
                        .map(|o| timefmt::format_ts(o.set_at)),
                    entry.priority_score_snapshot,
                    entry.notified_at.map(timefmt::format_ts),
                    entry.expires_at.map(timefmt::format_ts),
                    entry.cooldown_until.map(timefmt::format_ts),
                    entry.cooldown_reason,
                    entry.decline_count,
                    entry.booking_id,
                    timefmt::format_ts(entry.created_at),
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Get an entry by id, scoped to its salon.
pub async fn get(
    db: &Database,
    salon_id: &str,
    id: &str,
) -> Result<Option<WaitlistEntry>, WaitlineError> {
    let salon_id = salon_id.to_string();
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {ENTRY_COLUMNS} FROM waitlist_entries
                 WHERE salon_id = ?1 AND id = ?2"
            ))?;
            let result = stmt.query_row(params![salon_id, id], entry_from_row);
            match result {
                Ok(entry) => Ok(Some(entry)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e.into()),
            }
        })
        .await
        .map_err(map_tr_err)
}

/// Entries eligible to enter a matching round: `waiting` status, matching
/// salon/service/date, cooldown absent or elapsed. Ordered oldest first so
/// downstream tie-breaks are deterministic.
pub async fn list_candidates(
    db: &Database,
    salon_id: &str,
    service_id: &str,
    date: NaiveDate,
    now: DateTime<Utc>,
) -> Result<Vec<WaitlistEntry>, WaitlineError> {
    let salon_id = salon_id.to_string();
    let service_id = service_id.to_string();
    let date = timefmt::format_date(date);
    let now = timefmt::format_ts(now);
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {ENTRY_COLUMNS} FROM waitlist_entries
                 WHERE salon_id = ?1 AND service_id = ?2 AND preferred_date = ?3
                   AND status = 'waiting'
                   AND (cooldown_until IS NULL OR cooldown_until <= ?4)
                 ORDER BY created_at ASC, id ASC"
            ))?;
            let rows = stmt.query_map(params![salon_id, service_id, date, now], entry_from_row)?;
            let mut entries = Vec::new();
            for row in rows {
                entries.push(row?);
            }
            Ok(entries)
        })
        .await
        .map_err(map_tr_err)
}

/// An existing active request for the same customer+service+date, used by
/// intake deduplication.
pub async fn find_active_request(
    db: &Database,
    salon_id: &str,
    customer_id: &str,
    service_id: &str,
    date: NaiveDate,
) -> Result<Option<WaitlistEntry>, WaitlineError> {
    let salon_id = salon_id.to_string();
    let customer_id = customer_id.to_string();
    let service_id = service_id.to_string();
    let date = timefmt::format_date(date);
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {ENTRY_COLUMNS} FROM waitlist_entries
                 WHERE salon_id = ?1 AND customer_id = ?2 AND service_id = ?3
                   AND preferred_date = ?4 AND status IN ('waiting', 'notified')
                 LIMIT 1"
            ))?;
            let result = stmt.query_row(
                params![salon_id, customer_id, service_id, date],
                entry_from_row,
            );
            match result {
                Ok(entry) => Ok(Some(entry)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e.into()),
            }
        })
        .await
        .map_err(map_tr_err)
}

/// The compare-and-swap primitive behind every state transition.
///
/// One `UPDATE ... WHERE id = ? AND status = ?` statement; the returned
/// affected-row count tells the caller whether it won the race. Never a
/// read-then-write sequence.
pub async fn conditional_transition(
    db: &Database,
    id: &str,
    from: EntryStatus,
    to: EntryStatus,
    fields: TransitionFields,
) -> Result<u64, WaitlineError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            let mut sets = vec!["status = ?1".to_string()];
            let mut values: Vec<Box<dyn rusqlite::types::ToSql>> =
                vec![Box::new(to.to_string())];

            let push = |sets: &mut Vec<String>,
                            values: &mut Vec<Box<dyn rusqlite::types::ToSql>>,
                            column: &str,
                            value: Box<dyn rusqlite::types::ToSql>| {
                values.push(value);
                sets.push(format!("{column} = ?{}", values.len()));
            };

            if let Some(ts) = fields.notified_at {
                push(&mut sets, &mut values, "notified_at", Box::new(timefmt::format_ts(ts)));
            }
            if let Some(ts) = fields.expires_at {
                push(&mut sets, &mut values, "expires_at", Box::new(timefmt::format_ts(ts)));
            }
            if fields.clear_claim {
                sets.push("notified_at = NULL".to_string());
                sets.push("expires_at = NULL".to_string());
            }
            if let Some(ts) = fields.cooldown_until {
                push(&mut sets, &mut values, "cooldown_until", Box::new(timefmt::format_ts(ts)));
            }
            if let Some(reason) = fields.cooldown_reason {
                push(&mut sets, &mut values, "cooldown_reason", Box::new(reason));
            }
            if let Some(count) = fields.decline_count {
                push(&mut sets, &mut values, "decline_count", Box::new(count));
            }
            if let Some(booking_id) = fields.booking_id {
                push(&mut sets, &mut values, "booking_id", Box::new(booking_id));
            }

            values.push(Box::new(id));
            let id_pos = values.len();
            values.push(Box::new(from.to_string()));
            let from_pos = values.len();

            let sql = format!(
                "UPDATE waitlist_entries SET {} WHERE id = ?{id_pos} AND status = ?{from_pos}",
                sets.join(", ")
            );
            let affected = conn.execute(
                &sql,
                rusqlite::params_from_iter(values.iter().map(|v| v.as_ref())),
            )?;
            Ok(affected as u64)
        })
        .await
        .map_err(map_tr_err)
}

/// `notified` entries whose claim window lapsed before `now`.
pub async fn list_lapsed(
    db: &Database,
    now: DateTime<Utc>,
    limit: u32,
) -> Result<Vec<WaitlistEntry>, WaitlineError> {
    let now = timefmt::format_ts(now);
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {ENTRY_COLUMNS} FROM waitlist_entries
                 WHERE status = 'notified' AND expires_at IS NOT NULL AND expires_at < ?1
                 ORDER BY expires_at ASC
                 LIMIT ?2"
            ))?;
            let rows = stmt.query_map(params![now, limit], entry_from_row)?;
            let mut entries = Vec::new();
            for row in rows {
                entries.push(row?);
            }
            Ok(entries)
        })
        .await
        .map_err(map_tr_err)
}

/// `notified` entries with no offer row created at or after `notified_at`,
/// notified before `cutoff`: the survivors of a crash between the status
/// transition and offer persistence. Offers from earlier notification
/// rounds do not mask orphanhood.
pub async fn list_orphaned(
    db: &Database,
    cutoff: DateTime<Utc>,
    limit: u32,
) -> Result<Vec<WaitlistEntry>, WaitlineError> {
    let cutoff = timefmt::format_ts(cutoff);
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {ENTRY_COLUMNS} FROM waitlist_entries e
                 WHERE e.status = 'notified'
                   AND e.notified_at IS NOT NULL AND e.notified_at < ?1
                   AND NOT EXISTS (
                       SELECT 1 FROM waitlist_offers o
                       WHERE o.entry_id = e.id AND o.created_at >= e.notified_at
                   )
                 ORDER BY e.notified_at ASC
                 LIMIT ?2"
            ))?;
            let rows = stmt.query_map(params![cutoff, limit], entry_from_row)?;
            let mut entries = Vec::new();
            for row in rows {
                entries.push(row?);
            }
            Ok(entries)
        })
        .await
        .map_err(map_tr_err)
}

/// Delete an entry, scoped to its salon.
pub async fn delete(db: &Database, salon_id: &str, id: &str) -> Result<(), WaitlineError> {
    let salon_id = salon_id.to_string();
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "DELETE FROM waitlist_entries WHERE salon_id = ?1 AND id = ?2",
                params![salon_id, id],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}
