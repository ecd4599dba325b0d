// SPDX-FileCopyrightText: 2026 Waitline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Entry, slot, and offer fixtures for tests.

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, TimeZone, Utc};

use waitline_core::{
    CustomerContact, EntryStatus, FreedSlot, OfferStatus, PreferenceMode, PriorityOverride,
    WaitlistEntry, WaitlistOffer,
};

/// The date most fixtures anchor to.
pub fn fixture_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 6, 1).unwrap()
}

/// An instant on the fixture date.
pub fn at(hour: u32, minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 1, hour, minute, 0).unwrap()
}

/// Builder for a waitlist entry with sensible test defaults: `waiting`,
/// day-flexible, reachable by phone and email, created the day before the
/// fixture date.
pub fn entry(id: &str) -> EntryBuilder {
    EntryBuilder {
        entry: WaitlistEntry {
            id: id.to_string(),
            salon_id: "salon-1".to_string(),
            customer: CustomerContact {
                customer_id: format!("cust-{id}"),
                display_name: "Ada Lovelace".to_string(),
                email: Some("ada@example.com".to_string()),
                phone: Some("+15551230001".to_string()),
            },
            service_id: "svc-1".to_string(),
            employee_id: None,
            preferred_date: fixture_date(),
            preference_mode: PreferenceMode::DayFlexible,
            preferred_time_start: None,
            preferred_time_end: None,
            flex_window_minutes: 120,
            status: EntryStatus::Waiting,
            priority_override: None,
            priority_score_snapshot: None,
            notified_at: None,
            expires_at: None,
            cooldown_until: None,
            cooldown_reason: None,
            decline_count: 0,
            booking_id: None,
            created_at: Utc.with_ymd_and_hms(2025, 5, 31, 10, 0, 0).unwrap(),
        },
    }
}

pub struct EntryBuilder {
    entry: WaitlistEntry,
}

impl EntryBuilder {
    pub fn salon(mut self, salon_id: &str) -> Self {
        self.entry.salon_id = salon_id.to_string();
        self
    }

    pub fn service(mut self, service_id: &str) -> Self {
        self.entry.service_id = service_id.to_string();
        self
    }

    pub fn customer(mut self, customer_id: &str) -> Self {
        self.entry.customer.customer_id = customer_id.to_string();
        self
    }

    pub fn employee(mut self, employee_id: &str) -> Self {
        self.entry.employee_id = Some(employee_id.to_string());
        self
    }

    /// Switch to `specific_time` mode with the given preferred start.
    pub fn specific_time(mut self, hour: u32, minute: u32) -> Self {
        self.entry.preference_mode = PreferenceMode::SpecificTime;
        self.entry.preferred_time_start = NaiveTime::from_hms_opt(hour, minute, 0);
        self
    }

    pub fn time_end(mut self, hour: u32, minute: u32) -> Self {
        self.entry.preferred_time_end = NaiveTime::from_hms_opt(hour, minute, 0);
        self
    }

    pub fn flex(mut self, minutes: i64) -> Self {
        self.entry.flex_window_minutes = minutes;
        self
    }

    pub fn status(mut self, status: EntryStatus) -> Self {
        self.entry.status = status;
        self
    }

    pub fn created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.entry.created_at = created_at;
        self
    }

    pub fn snapshot(mut self, score: i64) -> Self {
        self.entry.priority_score_snapshot = Some(score);
        self
    }

    pub fn override_score(mut self, score: i64) -> Self {
        self.entry.priority_override = Some(PriorityOverride {
            score,
            reason: "manual".to_string(),
            set_by: "mgr-1".to_string(),
            set_at: self.entry.created_at,
        });
        self
    }

    pub fn phone(mut self, phone: Option<&str>) -> Self {
        self.entry.customer.phone = phone.map(String::from);
        self
    }

    pub fn email(mut self, email: Option<&str>) -> Self {
        self.entry.customer.email = email.map(String::from);
        self
    }

    pub fn cooldown_until(mut self, until: DateTime<Utc>) -> Self {
        self.entry.cooldown_until = Some(until);
        self
    }

    pub fn decline_count(mut self, count: i64) -> Self {
        self.entry.decline_count = count;
        self
    }

    pub fn notified(mut self, notified_at: DateTime<Utc>, expires_at: DateTime<Utc>) -> Self {
        self.entry.status = EntryStatus::Notified;
        self.entry.notified_at = Some(notified_at);
        self.entry.expires_at = Some(expires_at);
        self
    }

    pub fn build(self) -> WaitlistEntry {
        self.entry
    }
}

/// A freed slot at 14:00-15:00 on the fixture date, any employee.
pub fn slot() -> FreedSlot {
    FreedSlot {
        salon_id: "salon-1".to_string(),
        service_id: "svc-1".to_string(),
        employee_id: None,
        date: fixture_date(),
        start: at(14, 0),
        end: Some(at(15, 0)),
    }
}

/// A pending offer for the fixture slot.
pub fn pending_offer(id: &str, entry_id: &str) -> WaitlistOffer {
    let start = at(14, 0);
    WaitlistOffer {
        id: id.to_string(),
        entry_id: entry_id.to_string(),
        salon_id: "salon-1".to_string(),
        service_id: "svc-1".to_string(),
        employee_id: None,
        slot_date: fixture_date(),
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
