// SPDX-FileCopyrightText: 2026 Waitline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Eligibility of a candidate entry for one specific freed slot.
//!
//! Date matching and cooldown exclusion happen in the candidate query; this
//! filter only positions a candidate's time preference against the slot.

use waitline_core::{FreedSlot, PreferenceMode, WaitlistEntry};

/// Whether `entry` may be offered `slot`.
///
/// Day-flexible entries are always eligible once the date matched upstream.
/// Specific-time entries must land within `flex_window_minutes` of the slot
/// start (exactly on it when the window is zero), and when both the entry
/// and the slot carry an end time the two intervals must overlap.
pub fn is_eligible(entry: &WaitlistEntry, slot: &FreedSlot) -> bool {
    match entry.preference_mode {
        PreferenceMode::DayFlexible => true,
        PreferenceMode::SpecificTime => {
            // An entry with no start time cannot be positioned.
            let Some(preferred_start) = entry.preferred_start() else {
                return false;
            };

            let diff_seconds = (slot.start - preferred_start).num_seconds().abs();
            if entry.flex_window_minutes == 0 {
                if diff_seconds != 0 {
                    return false;
                }
            } else if diff_seconds > entry.flex_window_minutes * 60 {
                return false;
            }

            if let (Some(preferred_end), Some(slot_end)) = (entry.preferred_end(), slot.end)
                && (slot.start > preferred_end || preferred_start > slot_end)
            {
                return false;
            }

            true
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use waitline_test_utils::fixtures::{at, entry, slot};

    #[test]
    fn day_flexible_is_always_eligible() {
        let e = entry("e-1").build();
        assert!(is_eligible(&e, &slot()));
    }

    #[test]
    fn zero_flex_requires_exact_start() {
        let exact = entry("e-1").specific_time(14, 0).flex(0).build();
        assert!(is_eligible(&exact, &slot()));

        let off_by_one = entry("e-2").specific_time(14, 1).flex(0).build();
        assert!(!is_eligible(&off_by_one, &slot()));
    }

    #[test]
    fn flex_window_accepts_the_boundary_and_rejects_beyond() {
        // Slot starts 14:00; preference 14:30 with 30-minute flex sits
        // exactly on the boundary.
        let boundary = entry("e-1").specific_time(14, 30).flex(30).build();
        assert!(is_eligible(&boundary, &slot()));

        let beyond = entry("e-2").specific_time(14, 31).flex(30).build();
        assert!(!is_eligible(&beyond, &slot()));
    }

    #[test]
    fn interval_overlap_required_when_both_ends_known() {
        // Preferred 12:00-13:00, slot 14:00-15:00: within a generous flex
        // window but the intervals never touch.
        let disjoint = entry("e-1")
            .specific_time(12, 0)
            .time_end(13, 0)
            .flex(240)
            .build();
        assert!(!is_eligible(&disjoint, &slot()));

        // Preferred 13:30-14:30 overlaps the 14:00-15:00 slot.
        let overlapping = entry("e-2")
            .specific_time(13, 30)
            .time_end(14, 30)
            .flex(240)
            .build();
        assert!(is_eligible(&overlapping, &slot()));
    }

    #[test]
    fn open_ended_slot_skips_overlap_check() {
        let mut open_slot = slot();
        open_slot.end = None;
        open_slot.start = at(14, 0);

        let e = entry("e-1")
            .specific_time(13, 30)
            .time_end(13, 45)
            .flex(60)
            .build();
        // Within flex; no slot end, so no overlap requirement applies.
        assert!(is_eligible(&e, &open_slot));
    }

    #[test]
    fn specific_time_without_start_is_ineligible() {
        let mut e = entry("e-1").specific_time(14, 0).build();
        e.preferred_time_start = None;
        assert!(!is_eligible(&e, &slot()));
    }
}
