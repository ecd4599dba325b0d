// SPDX-FileCopyrightText: 2026 Waitline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Domain types shared across the Waitline workspace.
//!
//! Statuses are exhaustive enums with snake_case wire forms; any transition
//! site that forgets a variant fails to compile rather than at runtime.

use chrono::{DateTime, NaiveDate, NaiveTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Lifecycle status of a waitlist entry.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum EntryStatus {
    Waiting,
    Notified,
    Booked,
    Expired,
    Cancelled,
    Cooldown,
}

/// How strictly an entry is bound to its preferred time.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum PreferenceMode {
    /// The customer wants a specific start time, within `flex_window_minutes`.
    SpecificTime,
    /// Any time on the preferred date works.
    DayFlexible,
}

/// Lifecycle status of a claim offer.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum OfferStatus {
    Pending,
    Accepted,
    Declined,
    Expired,
    NotificationFailed,
}

/// Customer identity attached to a waitlist entry.
///
/// At least one of `email`/`phone` must be present; intake enforces this.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerContact {
    pub customer_id: String,
    pub display_name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
}

/// A manual priority override set by salon staff. Always wins over scoring.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriorityOverride {
    pub score: i64,
    pub reason: String,
    pub set_by: String,
    pub set_at: DateTime<Utc>,
}

/// A customer's standing request to be notified when a matching slot frees up.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WaitlistEntry {
    pub id: String,
    pub salon_id: String,
    pub customer: CustomerContact,
    pub service_id: String,
    /// `None` means any employee is acceptable.
    pub employee_id: Option<String>,
    pub preferred_date: NaiveDate,
    pub preference_mode: PreferenceMode,
    /// Start of the preferred window. Required for `SpecificTime` entries.
    pub preferred_time_start: Option<NaiveTime>,
    pub preferred_time_end: Option<NaiveTime>,
    /// Tolerance around the preferred start, in minutes. 0 means exact.
    pub flex_window_minutes: i64,
    pub status: EntryStatus,
    pub priority_override: Option<PriorityOverride>,
    /// Score cached at creation (or when an override is applied).
    pub priority_score_snapshot: Option<i64>,
    pub notified_at: Option<DateTime<Utc>>,
    /// End of the exclusive claim window. Set iff the entry is `Notified`.
    pub expires_at: Option<DateTime<Utc>>,
    pub cooldown_until: Option<DateTime<Utc>>,
    pub cooldown_reason: Option<String>,
    pub decline_count: i64,
    /// Set once the entry is fulfilled into a booking.
    pub booking_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl WaitlistEntry {
    /// The preferred start as a UTC instant, when a start time is set.
    pub fn preferred_start(&self) -> Option<DateTime<Utc>> {
        self.preferred_time_start
            .map(|t| Utc.from_utc_datetime(&self.preferred_date.and_time(t)))
    }

    /// The preferred end as a UTC instant, when an end time is set.
    pub fn preferred_end(&self) -> Option<DateTime<Utc>> {
        self.preferred_time_end
            .map(|t| Utc.from_utc_datetime(&self.preferred_date.and_time(t)))
    }

    /// Whether the entry is still inside a decline cooldown at `now`.
    pub fn in_cooldown(&self, now: DateTime<Utc>) -> bool {
        self.cooldown_until.is_some_and(|until| until > now)
    }
}

/// A slot freed by a booking cancellation, the trigger for one matching round.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FreedSlot {
    pub salon_id: String,
    pub service_id: String,
    /// The employee whose slot freed up, when the caller knows it.
    pub employee_id: Option<String>,
    pub date: NaiveDate,
    pub start: DateTime<Utc>,
    pub end: Option<DateTime<Utc>>,
}

/// One notification of one entry about one specific freed slot, bound to a
/// single-use claim token. Only the token's keyed hash is ever persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WaitlistOffer {
    pub id: String,
    pub entry_id: String,
    pub salon_id: String,
    pub service_id: String,
    pub employee_id: Option<String>,
    pub slot_date: NaiveDate,
    pub slot_start: DateTime<Utc>,
    pub slot_end: Option<DateTime<Utc>>,
    pub token_hash: String,
    pub token_expires_at: DateTime<Utc>,
    pub status: OfferStatus,
    pub attempt_no: i64,
    pub last_error: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl WaitlistOffer {
    /// The offer's slot, reassembled for collaborators that take slots.
    pub fn slot(&self) -> FreedSlot {
        FreedSlot {
            salon_id: self.salon_id.clone(),
            service_id: self.service_id.clone(),
            employee_id: self.employee_id.clone(),
            date: self.slot_date,
            start: self.slot_start,
            end: self.slot_end,
        }
    }
}

/// Append-only audit record written by every entry transition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LifecycleEvent {
    /// Assigned by storage; `None` until persisted.
    pub id: Option<i64>,
    pub entry_id: String,
    pub salon_id: String,
    pub from_status: EntryStatus,
    pub to_status: EntryStatus,
    pub reason: String,
    pub metadata: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
}

/// What happened on one notification channel during an offer round.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelOutcome {
    pub attempted: bool,
    pub succeeded: bool,
    pub error: Option<String>,
}

impl ChannelOutcome {
    /// The channel was skipped (no address, or channel disabled).
    pub fn skipped() -> Self {
        Self {
            attempted: false,
            succeeded: false,
            error: None,
        }
    }

    pub fn success() -> Self {
        Self {
            attempted: true,
            succeeded: true,
            error: None,
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            attempted: true,
            succeeded: false,
            error: Some(error.into()),
        }
    }
}

/// Joined per-channel outcomes for one offer notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryReport {
    pub sms: ChannelOutcome,
    pub email: ChannelOutcome,
}

impl DeliveryReport {
    pub fn any_succeeded(&self) -> bool {
        self.sms.succeeded || self.email.succeeded
    }

    /// The first channel's error, in attempt order, for `offer.last_error`.
    pub fn first_error(&self) -> Option<&str> {
        self.sms
            .error
            .as_deref()
            .or(self.email.error.as_deref())
    }
}
