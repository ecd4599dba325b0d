// SPDX-FileCopyrightText: 2026 Waitline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The cancellation-to-notification protocol.
//!
//! One call to [`OfferCoordinator::handle_cancellation`] runs the whole
//! round for a freed slot: idempotency guard, match selection, policy
//! resolution, the conditional `waiting -> notified` transition, token
//! issuance, dual-channel notification, offer persistence, and the audit
//! event. Exclusivity comes entirely from the conditional write: losing the
//! race is a quiet no-op, and all notification I/O happens strictly after
//! the entry has already transitioned, so a delivery failure can degrade the
//! offer record but never the queue state.

use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::{Duration, Utc};
use tracing::{debug, warn};
use uuid::Uuid;

use waitline_core::{
    ChannelOutcome, ClaimPolicy, DeliveryReport, EmailSender, EntryRepository, EntryStatus,
    EventRepository, FreedSlot, LifecycleEvent, OfferRepository, OfferStatus, PolicyResolver,
    SlotAvailability, SmsSender, TransitionFields, WaitlineError, WaitlistEntry, WaitlistOffer,
};

use crate::copy::{self, ClaimLinks};
use crate::selector::MatchSelector;
use crate::token::ClaimTokens;

/// Tunables for one coordinator instance.
#[derive(Debug, Clone)]
pub struct OfferConfig {
    /// Fallback claim policy when resolution fails.
    pub default_policy: ClaimPolicy,
    /// Per-send timeout for the SMS channel.
    pub sms_timeout: StdDuration,
    /// Per-send timeout for the email channel.
    pub email_timeout: StdDuration,
    /// Base URL for the accept/decline links.
    pub claim_base_url: String,
}

impl Default for OfferConfig {
    fn default() -> Self {
        Self {
            default_policy: ClaimPolicy::default(),
            sms_timeout: StdDuration::from_secs(10),
            email_timeout: StdDuration::from_secs(15),
            claim_base_url: "http://127.0.0.1:8620".to_string(),
        }
    }
}

/// Result of one offer round. Never an `Err`: failures are carried in
/// `error` so callers can log and move on.
#[derive(Debug)]
pub struct OfferOutcome {
    /// Whether an entry was claimed and an offer created for this slot.
    pub notified: bool,
    /// The winning entry as transitioned, when one was claimed.
    pub entry: Option<WaitlistEntry>,
    pub error: Option<String>,
}

impl OfferOutcome {
    fn no_op() -> Self {
        Self {
            notified: false,
            entry: None,
            error: None,
        }
    }
}

/// Orchestrates the cancellation-to-notification protocol.
pub struct OfferCoordinator {
    entries: Arc<dyn EntryRepository>,
    offers: Arc<dyn OfferRepository>,
    events: Arc<dyn EventRepository>,
    policies: Arc<dyn PolicyResolver>,
    sms: Arc<dyn SmsSender>,
    email: Arc<dyn EmailSender>,
    availability: Option<Arc<dyn SlotAvailability>>,
    selector: MatchSelector,
    tokens: ClaimTokens,
    config: OfferConfig,
}

impl OfferCoordinator {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        entries: Arc<dyn EntryRepository>,
        offers: Arc<dyn OfferRepository>,
        events: Arc<dyn EventRepository>,
        policies: Arc<dyn PolicyResolver>,
        sms: Arc<dyn SmsSender>,
        email: Arc<dyn EmailSender>,
        tokens: ClaimTokens,
        config: OfferConfig,
    ) -> Self {
        let selector = MatchSelector::new(entries.clone());
        Self {
            entries,
            offers,
            events,
            policies,
            sms,
            email,
            availability: None,
            selector,
            tokens,
            config,
        }
    }

    /// Wire a scheduling-side availability check, consulted before matching.
    pub fn with_availability(mut self, availability: Arc<dyn SlotAvailability>) -> Self {
        self.availability = Some(availability);
        self
    }

    /// Run one offer round for a freed slot.
    pub async fn handle_cancellation(&self, slot: &FreedSlot) -> OfferOutcome {
        match self.run_round(slot).await {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!(
                    salon_id = %slot.salon_id,
                    service_id = %slot.service_id,
                    error = %e,
                    "offer round failed"
                );
                OfferOutcome {
                    notified: false,
                    entry: None,
                    error: Some(e.to_string()),
                }
            }
        }
    }

    async fn run_round(&self, slot: &FreedSlot) -> Result<OfferOutcome, WaitlineError> {
        // The slot can be rebooked through regular scheduling between the
        // cancellation event and this round.
        if let Some(availability) = &self.availability {
            match availability.is_slot_open(slot).await {
                Ok(true) => {}
                Ok(false) => {
                    debug!(salon_id = %slot.salon_id, "slot no longer open, skipping round");
                    return Ok(OfferOutcome::no_op());
                }
                Err(e) => {
                    warn!(error = %e, "availability check failed, continuing round");
                }
            }
        }

        // Idempotency guard: one pending offer per freed slot, ever.
        if self.offers.find_pending_for_slot(slot).await?.is_some() {
            debug!(
                salon_id = %slot.salon_id,
                slot_start = %slot.start,
                "pending offer already exists for slot, skipping round"
            );
            return Ok(OfferOutcome::no_op());
        }

        let now = Utc::now();
        let Some(winner) = self.selector.select_for_slot(slot, now).await? else {
            return Ok(OfferOutcome::no_op());
        };

        let policy = match self
            .policies
            .resolve_policy(&slot.salon_id, &slot.service_id)
            .await
        {
            Ok(policy) => policy,
            Err(e) => {
                warn!(error = %e, "claim policy resolution failed, using default");
                self.config.default_policy
            }
        };

        // The only write that decides the race. Zero rows affected means a
        // concurrent cancellation claimed this entry first.
        let notified_at = Utc::now();
        let expires_at = notified_at + Duration::minutes(policy.claim_expiry_minutes);
        let affected = self
            .entries
            .conditional_transition(
                &winner.id,
                EntryStatus::Waiting,
                EntryStatus::Notified,
                TransitionFields::notify(notified_at, expires_at),
            )
            .await?;
        if affected == 0 {
            debug!(entry_id = %winner.id, "entry claimed by a concurrent round");
            return Ok(OfferOutcome::no_op());
        }

        let mut entry = winner;
        entry.status = EntryStatus::Notified;
        entry.notified_at = Some(notified_at);
        entry.expires_at = Some(expires_at);

        // From here on the entry is notified; nothing below is allowed to
        // fail the round, only to degrade what gets recorded.
        let minted = self.tokens.mint();
        let report = self.notify(&entry, slot, &minted.raw, expires_at).await;

        let offer = WaitlistOffer {
            id: Uuid::new_v4().to_string(),
            entry_id: entry.id.clone(),
            salon_id: slot.salon_id.clone(),
            service_id: slot.service_id.clone(),
            employee_id: slot.employee_id.clone(),
            slot_date: slot.date,
            slot_start: slot.start,
            slot_end: slot.end,
            token_hash: minted.hash,
            token_expires_at: expires_at,
            status: if report.any_succeeded() {
                OfferStatus::Pending
            } else {
                OfferStatus::NotificationFailed
            },
            attempt_no: 1,
            last_error: if report.any_succeeded() {
                None
            } else {
                report.first_error().map(String::from)
            },
            created_at: Utc::now(),
        };

        if let Err(e) = self.offers.insert(&offer).await {
            // The entry stays notified with no offer row; the sweep's orphan
            // pass reverts it after the grace period.
            warn!(entry_id = %entry.id, error = %e, "offer persistence failed after transition");
            return Ok(OfferOutcome {
                notified: false,
                entry: Some(entry),
                error: Some(e.to_string()),
            });
        }

        let event = LifecycleEvent {
            id: None,
            entry_id: entry.id.clone(),
            salon_id: entry.salon_id.clone(),
            from_status: EntryStatus::Waiting,
            to_status: EntryStatus::Notified,
            reason: "offer_created".to_string(),
            metadata: Some(serde_json::json!({
                "offer_id": offer.id,
                "channels": report,
                "slot": { "start": slot.start, "end": slot.end },
            })),
            created_at: Utc::now(),
        };
        if let Err(e) = self.events.append(&event).await {
            warn!(entry_id = %entry.id, error = %e, "lifecycle event append failed");
        }

        Ok(OfferOutcome {
            notified: true,
            entry: Some(entry),
            error: None,
        })
    }

    /// SMS first when a phone exists, then email when an address exists,
    /// regardless of the SMS outcome. Sequential sends, independent
    /// timeouts; failures become warnings and channel outcomes, never
    /// errors.
    async fn notify(
        &self,
        entry: &WaitlistEntry,
        slot: &FreedSlot,
        raw_token: &str,
        expires_at: chrono::DateTime<Utc>,
    ) -> DeliveryReport {
        let links = ClaimLinks::build(&self.config.claim_base_url, &entry.salon_id, raw_token);

        let sms = match &entry.customer.phone {
            Some(phone) => {
                let body = copy::sms_body(entry, slot, expires_at, &links);
                match tokio::time::timeout(self.config.sms_timeout, self.sms.send_sms(phone, &body))
                    .await
                {
                    Ok(delivery) if delivery.succeeded() => ChannelOutcome::success(),
                    Ok(delivery) => {
                        let reason = delivery.error.clone().unwrap_or_else(|| {
                            format!(
                                "not allowed ({})",
                                delivery.status.as_deref().unwrap_or("no reason")
                            )
                        });
                        warn!(entry_id = %entry.id, error = %reason, "sms delivery failed");
                        ChannelOutcome::failure(format!("sms: {reason}"))
                    }
                    Err(_) => {
                        warn!(
                            entry_id = %entry.id,
                            timeout = ?self.config.sms_timeout,
                            "sms delivery timed out"
                        );
                        ChannelOutcome::failure(format!(
                            "sms: timed out after {:?}",
                            self.config.sms_timeout
                        ))
                    }
                }
            }
            None => ChannelOutcome::skipped(),
        };

        let email = match &entry.customer.email {
            Some(address) => {
                let message = waitline_core::EmailMessage {
                    to: address.clone(),
                    subject: copy::email_subject(slot),
                    body: copy::email_body(entry, slot, expires_at, &links, sms.succeeded),
                };
                match tokio::time::timeout(
                    self.config.email_timeout,
                    self.email.send_email(&message),
                )
                .await
                {
                    Ok(Ok(())) => ChannelOutcome::success(),
                    Ok(Err(e)) => {
                        warn!(entry_id = %entry.id, error = %e, "email delivery failed");
                        ChannelOutcome::failure(format!("email: {e}"))
                    }
                    Err(_) => {
                        warn!(
                            entry_id = %entry.id,
                            timeout = ?self.config.email_timeout,
                            "email delivery timed out"
                        );
                        ChannelOutcome::failure(format!(
                            "email: timed out after {:?}",
                            self.config.email_timeout
                        ))
                    }
                }
            }
            None => ChannelOutcome::skipped(),
        };

        DeliveryReport { sms, email }
    }
}
