// SPDX-FileCopyrightText: 2026 Waitline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Priority scoring for waitlist entries. Higher scores are more urgent.

use chrono::{DateTime, Utc};
use waitline_core::{PreferenceMode, WaitlistEntry};

/// Extra weight for entries bound to a specific time.
const SPECIFIC_TIME_URGENCY_WEIGHT: i64 = 10;

/// Compute an entry's priority score at `now`.
///
/// A manual override always wins verbatim. Otherwise the score is
/// `queue_age_minutes + urgency_weight - flexibility_penalty`: age rewards
/// waiting, the urgency weight favors time-bound requests, and the penalty
/// grows with how easy the entry is to place later. No side effects.
pub fn priority_score(entry: &WaitlistEntry, now: DateTime<Utc>) -> i64 {
    if let Some(override_) = &entry.priority_override {
        return override_.score;
    }

    let queue_age_minutes = (now - entry.created_at).num_minutes().max(0);
    let urgency_weight = match entry.preference_mode {
        PreferenceMode::SpecificTime => SPECIFIC_TIME_URGENCY_WEIGHT,
        PreferenceMode::DayFlexible => 0,
    };
    let flexibility_penalty = match entry.preference_mode {
        PreferenceMode::SpecificTime => 0,
        PreferenceMode::DayFlexible => match entry.flex_window_minutes {
            m if m <= 120 => 5,
            m if m <= 720 => 7,
            _ => 10,
        },
    };

    queue_age_minutes + urgency_weight - flexibility_penalty
}
