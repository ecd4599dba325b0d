// SPDX-FileCopyrightText: 2026 Waitline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Entry intake: validation, deduplication, rate limiting, and creation.
//!
//! Requests arrive stringly-typed from the HTTP surface and leave as fully
//! typed entries or `Validation` errors. The priority score snapshot is
//! cached here at creation, as the scorer contract requires.

use std::collections::HashMap;
use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::Mutex;

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use tracing::debug;
use uuid::Uuid;

use waitline_core::{
    CustomerContact, EntryRepository, EntryStatus, PreferenceMode, WaitlineError, WaitlistEntry,
};

use crate::scoring;

/// Tunables for intake.
#[derive(Debug, Clone)]
pub struct IntakeConfig {
    /// Requests allowed per customer identifier per hour.
    pub rate_limit_per_hour: u32,
}

impl Default for IntakeConfig {
    fn default() -> Self {
        Self {
            rate_limit_per_hour: 5,
        }
    }
}

/// A raw intake request, as received from the outer surface.
#[derive(Debug, Clone)]
pub struct IntakeRequest {
    pub salon_id: String,
    pub customer_id: String,
    pub display_name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub service_id: String,
    pub employee_id: Option<String>,
    /// `YYYY-MM-DD`.
    pub preferred_date: String,
    /// `specific_time` or `day_flexible`.
    pub preference_mode: String,
    /// `HH:MM` or `HH:MM:SS`. Required for `specific_time`.
    pub preferred_time_start: Option<String>,
    pub preferred_time_end: Option<String>,
    pub flex_window_minutes: Option<i64>,
}

/// Validates and persists new waitlist entries.
pub struct IntakeService {
    entries: Arc<dyn EntryRepository>,
    recent: Mutex<HashMap<String, VecDeque<DateTime<Utc>>>>,
    config: IntakeConfig,
}

impl IntakeService {
    pub fn new(entries: Arc<dyn EntryRepository>, config: IntakeConfig) -> Self {
        Self {
            entries,
            recent: Mutex::new(HashMap::new()),
            config,
        }
    }

    /// Create a waitlist entry from a raw request.
    pub async fn submit(&self, request: IntakeRequest) -> Result<WaitlistEntry, WaitlineError> {
        let now = Utc::now();
        let parsed = parse_request(&request)?;
        self.check_rate_limit(&request.customer_id, now)?;

        if self
            .entries
            .find_active_request(
                &request.salon_id,
                &request.customer_id,
                &request.service_id,
                parsed.preferred_date,
            )
            .await?
            .is_some()
        {
            return Err(WaitlineError::Validation(
                "an identical request for this customer, service, and date is already active"
                    .to_string(),
            ));
        }

        let mut entry = WaitlistEntry {
            id: Uuid::new_v4().to_string(),
            salon_id: request.salon_id,
            customer: CustomerContact {
                customer_id: request.customer_id,
                display_name: request.display_name.trim().to_string(),
                email: request.email,
                phone: request.phone,
            },
            service_id: request.service_id,
            employee_id: request.employee_id,
            preferred_date: parsed.preferred_date,
            preference_mode: parsed.preference_mode,
            preferred_time_start: parsed.preferred_time_start,
            preferred_time_end: parsed.preferred_time_end,
            flex_window_minutes: parsed.flex_window_minutes,
            status: EntryStatus::Waiting,
            priority_override: None,
            priority_score_snapshot: None,
            notified_at: None,
            expires_at: None,
            cooldown_until: None,
            cooldown_reason: None,
            decline_count: 0,
            booking_id: None,
            created_at: now,
        };
        entry.priority_score_snapshot = Some(scoring::priority_score(&entry, now));

        self.entries.insert(&entry).await?;
        debug!(entry_id = %entry.id, salon_id = %entry.salon_id, "waitlist entry created");
        Ok(entry)
    }

    /// Sliding one-hour window per customer identifier.
    fn check_rate_limit(
        &self,
        customer_id: &str,
        now: DateTime<Utc>,
    ) -> Result<(), WaitlineError> {
        let mut recent = self.recent.lock().unwrap();
        let window = recent.entry(customer_id.to_string()).or_default();
        let horizon = now - Duration::hours(1);
        while window.front().is_some_and(|t| *t < horizon) {
            window.pop_front();
        }
        if window.len() >= self.config.rate_limit_per_hour as usize {
            return Err(WaitlineError::Validation(
                "too many waitlist requests; try again later".to_string(),
            ));
        }
        window.push_back(now);
        Ok(())
    }
}

struct ParsedPreferences {
    preferred_date: NaiveDate,
    preference_mode: PreferenceMode,
    preferred_time_start: Option<NaiveTime>,
    preferred_time_end: Option<NaiveTime>,
    flex_window_minutes: i64,
}

fn parse_request(request: &IntakeRequest) -> Result<ParsedPreferences, WaitlineError> {
    for (field, value) in [
        ("salon_id", Some(&request.salon_id)),
        ("customer_id", Some(&request.customer_id)),
        ("service_id", Some(&request.service_id)),
        ("employee_id", request.employee_id.as_ref()),
    ] {
        if let Some(value) = value
            && Uuid::parse_str(value).is_err()
        {
            return Err(WaitlineError::Validation(format!(
                "{field} must be a valid UUID, got `{value}`"
            )));
        }
    }

    if request.display_name.trim().is_empty() {
        return Err(WaitlineError::Validation(
            "display_name must not be empty".to_string(),
        ));
    }
    if request.email.is_none() && request.phone.is_none() {
        return Err(WaitlineError::Validation(
            "at least one of email or phone is required".to_string(),
        ));
    }

    let preferred_date = NaiveDate::parse_from_str(&request.preferred_date, "%Y-%m-%d")
        .map_err(|_| {
            WaitlineError::Validation(format!(
                "preferred_date must be YYYY-MM-DD, got `{}`",
                request.preferred_date
            ))
        })?;

    let preference_mode = request
        .preference_mode
        .parse::<PreferenceMode>()
        .map_err(|_| {
            WaitlineError::Validation(format!(
                "preference_mode must be `specific_time` or `day_flexible`, got `{}`",
                request.preference_mode
            ))
        })?;

    let preferred_time_start = request
        .preferred_time_start
        .as_deref()
        .map(parse_clock_time)
        .transpose()?;
    let preferred_time_end = request
        .preferred_time_end
        .as_deref()
        .map(parse_clock_time)
        .transpose()?;

    if preference_mode == PreferenceMode::SpecificTime && preferred_time_start.is_none() {
        return Err(WaitlineError::Validation(
            "preferred_time_start is required for specific_time requests".to_string(),
        ));
    }
    if let (Some(start), Some(end)) = (preferred_time_start, preferred_time_end)
        && end <= start
    {
        return Err(WaitlineError::Validation(
            "preferred_time_end must be after preferred_time_start".to_string(),
        ));
    }

    let flex_window_minutes = request.flex_window_minutes.unwrap_or(0);
    if flex_window_minutes < 0 {
        return Err(WaitlineError::Validation(
            "flex_window_minutes must be non-negative".to_string(),
        ));
    }

    Ok(ParsedPreferences {
        preferred_date,
        preference_mode,
        preferred_time_start,
        preferred_time_end,
        flex_window_minutes,
    })
}

fn parse_clock_time(value: &str) -> Result<NaiveTime, WaitlineError> {
    NaiveTime::parse_from_str(value, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(value, "%H:%M"))
        .map_err(|_| {
            WaitlineError::Validation(format!("time must be HH:MM or HH:MM:SS, got `{value}`"))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use waitline_test_utils::MemoryStore;

    fn request() -> IntakeRequest {
        IntakeRequest {
            salon_id: "0d2a7e6a-57a5-4f3e-9f07-0e1e60761001".to_string(),
            customer_id: "0d2a7e6a-57a5-4f3e-9f07-0e1e60761002".to_string(),
            display_name: "Ada Lovelace".to_string(),
            email: Some("ada@example.com".to_string()),
            phone: None,
            service_id: "0d2a7e6a-57a5-4f3e-9f07-0e1e60761003".to_string(),
            employee_id: None,
            preferred_date: "2025-06-01".to_string(),
            preference_mode: "specific_time".to_string(),
            preferred_time_start: Some("14:00".to_string()),
            preferred_time_end: None,
            flex_window_minutes: Some(30),
        }
    }

    fn service(store: &Arc<MemoryStore>) -> IntakeService {
        IntakeService::new(store.clone(), IntakeConfig::default())
    }

    #[tokio::test]
    async fn valid_request_creates_waiting_entry_with_snapshot() {
        let store = Arc::new(MemoryStore::new());
        let entry = service(&store).submit(request()).await.unwrap();

        assert_eq!(entry.status, EntryStatus::Waiting);
        assert_eq!(entry.preference_mode, PreferenceMode::SpecificTime);
        assert_eq!(
            entry.preferred_time_start,
            NaiveTime::from_hms_opt(14, 0, 0)
        );
        // Fresh entries have no queue age: snapshot is the urgency weight.
        assert_eq!(entry.priority_score_snapshot, Some(10));
        assert!(Uuid::parse_str(&entry.id).is_ok());
        assert!(store.entry(&entry.id).is_some());
    }

    #[tokio::test]
    async fn rejects_malformed_uuid_date_and_time() {
        let store = Arc::new(MemoryStore::new());
        let svc = service(&store);

        let mut bad_salon = request();
        bad_salon.salon_id = "salon-1".to_string();
        assert!(matches!(
            svc.submit(bad_salon).await.unwrap_err(),
            WaitlineError::Validation(msg) if msg.contains("salon_id")
        ));

        let mut bad_date = request();
        bad_date.preferred_date = "01/06/2025".to_string();
        assert!(matches!(
            svc.submit(bad_date).await.unwrap_err(),
            WaitlineError::Validation(msg) if msg.contains("preferred_date")
        ));

        let mut bad_time = request();
        bad_time.preferred_time_start = Some("2pm".to_string());
        assert!(matches!(
            svc.submit(bad_time).await.unwrap_err(),
            WaitlineError::Validation(msg) if msg.contains("HH:MM")
        ));
    }

    #[tokio::test]
    async fn requires_at_least_one_contact() {
        let store = Arc::new(MemoryStore::new());
        let mut req = request();
        req.email = None;
        req.phone = None;
        let err = service(&store).submit(req).await.unwrap_err();
        assert!(matches!(
            err,
            WaitlineError::Validation(msg) if msg.contains("email or phone")
        ));
    }

    #[tokio::test]
    async fn specific_time_requires_a_start() {
        let store = Arc::new(MemoryStore::new());
        let mut req = request();
        req.preferred_time_start = None;
        let err = service(&store).submit(req).await.unwrap_err();
        assert!(matches!(
            err,
            WaitlineError::Validation(msg) if msg.contains("preferred_time_start")
        ));
    }

    #[tokio::test]
    async fn duplicate_active_request_is_rejected() {
        let store = Arc::new(MemoryStore::new());
        let svc = service(&store);
        svc.submit(request()).await.unwrap();

        let err = svc.submit(request()).await.unwrap_err();
        assert!(matches!(
            err,
            WaitlineError::Validation(msg) if msg.contains("already active")
        ));
    }

    #[tokio::test]
    async fn day_flexible_needs_no_times() {
        let store = Arc::new(MemoryStore::new());
        let mut req = request();
        req.preference_mode = "day_flexible".to_string();
        req.preferred_time_start = None;
        req.flex_window_minutes = Some(240);

        let entry = service(&store).submit(req).await.unwrap();
        assert_eq!(entry.preference_mode, PreferenceMode::DayFlexible);
        // Day-flexible snapshot at zero age: -penalty for a 240-minute window.
        assert_eq!(entry.priority_score_snapshot, Some(-7));
    }

    #[tokio::test]
    async fn rate_limit_kicks_in_per_customer() {
        let store = Arc::new(MemoryStore::new());
        let svc = service(&store);

        for day in 1..=5 {
            let mut req = request();
            req.preferred_date = format!("2025-06-{day:02}");
            svc.submit(req).await.unwrap();
        }

        let mut sixth = request();
        sixth.preferred_date = "2025-06-06".to_string();
        let err = svc.submit(sixth).await.unwrap_err();
        assert!(matches!(
            err,
            WaitlineError::Validation(msg) if msg.contains("too many")
        ));

        // A different customer is unaffected.
        let mut other = request();
        other.customer_id = "0d2a7e6a-57a5-4f3e-9f07-0e1e60761099".to_string();
        assert!(svc.submit(other).await.is_ok());
    }
}
