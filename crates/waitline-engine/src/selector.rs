// SPDX-FileCopyrightText: 2026 Waitline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Winner selection for one freed slot.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::debug;
use waitline_core::{EntryRepository, FreedSlot, WaitlineError, WaitlistEntry};

use crate::{eligibility, scoring};

/// Queries the candidate pool for a freed slot and picks exactly one winner.
pub struct MatchSelector {
    entries: Arc<dyn EntryRepository>,
}

impl MatchSelector {
    pub fn new(entries: Arc<dyn EntryRepository>) -> Self {
        Self { entries }
    }

    /// Select the best-fit waiting entry for `slot`, or `None`.
    ///
    /// Candidates come pre-filtered on status/salon/service/date/cooldown.
    /// When the slot names an employee, entries asking for exactly that
    /// employee take priority; only if none exist do any-employee entries
    /// get a turn. Survivors of the eligibility filter are ranked by score
    /// descending, then `created_at` ascending (older requests win), then id
    /// ascending so results are reproducible.
    pub async fn select_for_slot(
        &self,
        slot: &FreedSlot,
        now: DateTime<Utc>,
    ) -> Result<Option<WaitlistEntry>, WaitlineError> {
        let candidates = self
            .entries
            .list_candidates(&slot.salon_id, &slot.service_id, slot.date, now)
            .await?;

        let pool: Vec<WaitlistEntry> = match &slot.employee_id {
            Some(employee_id) => {
                let exact: Vec<WaitlistEntry> = candidates
                    .iter()
                    .filter(|e| e.employee_id.as_deref() == Some(employee_id.as_str()))
                    .cloned()
                    .collect();
                if exact.is_empty() {
                    candidates
                        .into_iter()
                        .filter(|e| e.employee_id.is_none())
                        .collect()
                } else {
                    exact
                }
            }
            None => candidates,
        };

        let mut scored: Vec<(i64, WaitlistEntry)> = pool
            .into_iter()
            .filter(|e| eligibility::is_eligible(e, slot))
            .map(|e| {
                let score = e
                    .priority_score_snapshot
                    .unwrap_or_else(|| scoring::priority_score(&e, now));
                (score, e)
            })
            .collect();

        if scored.is_empty() {
            debug!(
                salon_id = %slot.salon_id,
                service_id = %slot.service_id,
                "no eligible candidates for freed slot"
            );
            return Ok(None);
        }

        scored.sort_by(|(score_a, a), (score_b, b)| {
            score_b
                .cmp(score_a)
                .then_with(|| a.created_at.cmp(&b.created_at))
                .then_with(|| a.id.cmp(&b.id))
        });

        Ok(scored.into_iter().next().map(|(_, entry)| entry))
    }
}
