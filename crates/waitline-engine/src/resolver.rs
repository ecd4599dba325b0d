// SPDX-FileCopyrightText: 2026 Waitline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Resolution of incoming accept/decline claim tokens.
//!
//! The resolver races the expiry sweep over the same entries; both sides
//! guard with the same conditional transition, so exactly one wins and the
//! loser surfaces `AlreadyResolved` instead of double-processing.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use strum::{Display, EnumString};
use tracing::{debug, warn};

use waitline_core::{
    BookingGateway, ClaimRejection, EntryRepository, EntryStatus, EventRepository, LifecycleEvent,
    OfferRepository, OfferStatus, TransitionFields, WaitlineError, WaitlistEntry, WaitlistOffer,
};

use crate::token::ClaimTokens;

/// The customer's answer to an offer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum ClaimAction {
    Accept,
    Decline,
}

/// Tunables for claim resolution.
#[derive(Debug, Clone)]
pub struct ResolverConfig {
    /// Declines at which an entry is expired instead of requeued.
    pub max_declines: i64,
    /// Cooldown applied when a decline requeues the entry.
    pub decline_cooldown: Duration,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            max_declines: 3,
            decline_cooldown: Duration::minutes(30),
        }
    }
}

/// What a successfully resolved claim did.
#[derive(Debug)]
pub enum ClaimResolution {
    /// The entry was booked; carries the fulfilled entry.
    Accepted {
        entry: WaitlistEntry,
        booking_id: String,
    },
    /// The decline requeued the entry behind a cooldown.
    DeclinedRequeued { cooldown_until: DateTime<Utc> },
    /// The decline exhausted the allowance and expired the entry.
    DeclinedExpired,
}

/// Resolves a raw claim token into a state transition.
pub struct ClaimResolver {
    entries: Arc<dyn EntryRepository>,
    offers: Arc<dyn OfferRepository>,
    events: Arc<dyn EventRepository>,
    bookings: Arc<dyn BookingGateway>,
    tokens: ClaimTokens,
    config: ResolverConfig,
}

impl ClaimResolver {
    pub fn new(
        entries: Arc<dyn EntryRepository>,
        offers: Arc<dyn OfferRepository>,
        events: Arc<dyn EventRepository>,
        bookings: Arc<dyn BookingGateway>,
        tokens: ClaimTokens,
        config: ResolverConfig,
    ) -> Self {
        Self {
            entries,
            offers,
            events,
            bookings,
            tokens,
            config,
        }
    }

    /// Resolve a presented token within a salon.
    ///
    /// Rejects with [`ClaimRejection`] when the token is unknown, the offer
    /// already resolved, or the claim window lapsed -- the last even when
    /// the offer row still reads `pending`, since an unswept row does not
    /// excuse an expired token.
    pub async fn resolve(
        &self,
        salon_id: &str,
        raw_token: &str,
        action: ClaimAction,
    ) -> Result<ClaimResolution, WaitlineError> {
        let hash = self.tokens.hash(raw_token);
        let offer = self
            .offers
            .find_by_token_hash(salon_id, &hash)
            .await?
            .ok_or(ClaimRejection::NotFound)?;

        if offer.status != OfferStatus::Pending {
            return Err(ClaimRejection::AlreadyResolved {
                status: offer.status,
            }
            .into());
        }

        let now = Utc::now();
        if now > offer.token_expires_at {
            return Err(ClaimRejection::Expired.into());
        }

        let entry = self
            .entries
            .get(salon_id, &offer.entry_id)
            .await?
            .ok_or_else(|| {
                WaitlineError::Internal(format!(
                    "offer {} references missing entry {}",
                    offer.id, offer.entry_id
                ))
            })?;

        match action {
            ClaimAction::Accept => self.accept(now, entry, offer).await,
            ClaimAction::Decline => self.decline(now, entry, offer).await,
        }
    }

    async fn accept(
        &self,
        now: DateTime<Utc>,
        entry: WaitlistEntry,
        offer: WaitlistOffer,
    ) -> Result<ClaimResolution, WaitlineError> {
        let booking_id = self.bookings.create_booking(&entry, &offer).await?;

        let affected = self
            .entries
            .conditional_transition(
                &entry.id,
                EntryStatus::Notified,
                EntryStatus::Booked,
                TransitionFields::book(booking_id.clone()),
            )
            .await?;
        if affected == 0 {
            warn!(
                entry_id = %entry.id,
                booking_id,
                "accept lost the claim race; booking reference goes unused"
            );
            return Err(self.already_resolved(&offer).await.into());
        }

        self.offers
            .update_status(&offer.id, OfferStatus::Accepted, None)
            .await?;

        self.append_event(
            &entry,
            EntryStatus::Notified,
            EntryStatus::Booked,
            "offer_accepted",
            serde_json::json!({ "offer_id": offer.id, "booking_id": booking_id }),
            now,
        )
        .await;

        let mut fulfilled = entry;
        fulfilled.status = EntryStatus::Booked;
        fulfilled.booking_id = Some(booking_id.clone());

        Ok(ClaimResolution::Accepted {
            entry: fulfilled,
            booking_id,
        })
    }

    async fn decline(
        &self,
        now: DateTime<Utc>,
        entry: WaitlistEntry,
        offer: WaitlistOffer,
    ) -> Result<ClaimResolution, WaitlineError> {
        let decline_count = entry.decline_count + 1;

        if decline_count < self.config.max_declines {
            // Back into the pool, but not for the very next cancellation.
            let cooldown_until = now + self.config.decline_cooldown;
            let affected = self
                .entries
                .conditional_transition(
                    &entry.id,
                    EntryStatus::Notified,
                    EntryStatus::Waiting,
                    TransitionFields::requeue_declined(cooldown_until, decline_count),
                )
                .await?;
            if affected == 0 {
                return Err(self.already_resolved(&offer).await.into());
            }

            self.offers
                .update_status(&offer.id, OfferStatus::Declined, None)
                .await?;
            self.append_event(
                &entry,
                EntryStatus::Notified,
                EntryStatus::Waiting,
                "offer_declined",
                serde_json::json!({
                    "offer_id": offer.id,
                    "decline_count": decline_count,
                    "cooldown_until": cooldown_until,
                }),
                now,
            )
            .await;

            Ok(ClaimResolution::DeclinedRequeued { cooldown_until })
        } else {
            let affected = self
                .entries
                .conditional_transition(
                    &entry.id,
                    EntryStatus::Notified,
                    EntryStatus::Expired,
                    TransitionFields {
                        decline_count: Some(decline_count),
                        ..TransitionFields::default()
                    },
                )
                .await?;
            if affected == 0 {
                return Err(self.already_resolved(&offer).await.into());
            }

            self.offers
                .update_status(&offer.id, OfferStatus::Declined, None)
                .await?;
            self.append_event(
                &entry,
                EntryStatus::Notified,
                EntryStatus::Expired,
                "decline_limit_reached",
                serde_json::json!({
                    "offer_id": offer.id,
                    "decline_count": decline_count,
                }),
                now,
            )
            .await;

            Ok(ClaimResolution::DeclinedExpired)
        }
    }

    /// The losing side of a resolution race reports the offer's current
    /// status rather than a stale `pending`.
    async fn already_resolved(&self, offer: &WaitlistOffer) -> ClaimRejection {
        let status = self
            .offers
            .find_by_token_hash(&offer.salon_id, &offer.token_hash)
            .await
            .ok()
            .flatten()
            .map(|o| o.status)
            .unwrap_or(offer.status);
        debug!(offer_id = %offer.id, %status, "claim lost the resolution race");
        ClaimRejection::AlreadyResolved { status }
    }

    async fn append_event(
        &self,
        entry: &WaitlistEntry,
        from_status: EntryStatus,
        to_status: EntryStatus,
        reason: &str,
        metadata: serde_json::Value,
        now: DateTime<Utc>,
    ) {
        let event = LifecycleEvent {
            id: None,
            entry_id: entry.id.clone(),
            salon_id: entry.salon_id.clone(),
            from_status,
            to_status,
            reason: reason.to_string(),
            metadata: Some(metadata),
            created_at: now,
        };
        if let Err(e) = self.events.append(&event).await {
            warn!(entry_id = %entry.id, error = %e, "lifecycle event append failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use std::str::FromStr;
    use waitline_test_utils::fixtures::{entry, pending_offer};
    use waitline_test_utils::{MemoryStore, MockBookings};

    struct Harness {
        store: Arc<MemoryStore>,
        bookings: Arc<MockBookings>,
        resolver: ClaimResolver,
        tokens: ClaimTokens,
    }

    fn harness() -> Harness {
        let store = Arc::new(MemoryStore::new());
        let bookings = Arc::new(MockBookings::new());
        let tokens = ClaimTokens::new("test-secret-0123456789");
        let resolver = ClaimResolver::new(
            store.clone(),
            store.clone(),
            store.clone(),
            bookings.clone(),
            tokens.clone(),
            ResolverConfig::default(),
        );
        Harness {
            store,
            bookings,
            resolver,
            tokens,
        }
    }

    /// Seed a notified entry with a live pending offer; returns the raw token.
    fn seed_claim(h: &Harness, entry_id: &str, decline_count: i64) -> String {
        let now = Utc::now();
        h.store.put_entry(
            entry(entry_id)
                .notified(now, now + Duration::minutes(15))
                .decline_count(decline_count)
                .build(),
        );
        let minted = h.tokens.mint();
        let mut offer = pending_offer(&format!("o-{entry_id}"), entry_id);
        offer.token_hash = minted.hash;
        offer.token_expires_at = now + Duration::minutes(15);
        h.store.put_offer(offer);
        minted.raw
    }

    #[tokio::test]
    async fn accept_books_entry_and_marks_offer() {
        let h = harness();
        let token = seed_claim(&h, "e-1", 0);

        let resolution = h
            .resolver
            .resolve("salon-1", &token, ClaimAction::Accept)
            .await
            .unwrap();

        match resolution {
            ClaimResolution::Accepted { entry, booking_id } => {
                assert_eq!(entry.status, EntryStatus::Booked);
                assert_eq!(entry.booking_id.as_deref(), Some(booking_id.as_str()));
            }
            other => panic!("expected Accepted, got {other:?}"),
        }

        let stored = h.store.entry("e-1").unwrap();
        assert_eq!(stored.status, EntryStatus::Booked);
        assert!(stored.booking_id.is_some());
        assert_eq!(h.store.offer("o-e-1").unwrap().status, OfferStatus::Accepted);
        assert_eq!(h.bookings.created_count(), 1);

        let events = h.store.events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].reason, "offer_accepted");
    }

    #[tokio::test]
    async fn unknown_token_is_rejected_without_mutation() {
        let h = harness();
        seed_claim(&h, "e-1", 0);

        let err = h
            .resolver
            .resolve("salon-1", "no-such-token", ClaimAction::Accept)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            WaitlineError::Claim(ClaimRejection::NotFound)
        ));

        assert_eq!(h.store.entry("e-1").unwrap().status, EntryStatus::Notified);
        assert_eq!(h.bookings.created_count(), 0);
        assert!(h.store.events().is_empty());
    }

    #[tokio::test]
    async fn token_is_salon_scoped() {
        let h = harness();
        let token = seed_claim(&h, "e-1", 0);

        let err = h
            .resolver
            .resolve("salon-other", &token, ClaimAction::Accept)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            WaitlineError::Claim(ClaimRejection::NotFound)
        ));
    }

    #[tokio::test]
    async fn expired_token_is_rejected_even_while_offer_is_pending() {
        let h = harness();
        let token = seed_claim(&h, "e-1", 0);
        // Push the window into the past; the sweep has not run yet.
        let mut offer = h.store.offer("o-e-1").unwrap();
        offer.token_expires_at = Utc::now() - Duration::minutes(1);
        h.store.put_offer(offer);

        for _ in 0..2 {
            let err = h
                .resolver
                .resolve("salon-1", &token, ClaimAction::Accept)
                .await
                .unwrap_err();
            assert!(matches!(err, WaitlineError::Claim(ClaimRejection::Expired)));
        }
        assert_eq!(h.store.entry("e-1").unwrap().status, EntryStatus::Notified);
    }

    #[tokio::test]
    async fn resolved_offer_reports_already_resolved() {
        let h = harness();
        let token = seed_claim(&h, "e-1", 0);
        h.resolver
            .resolve("salon-1", &token, ClaimAction::Accept)
            .await
            .unwrap();

        let err = h
            .resolver
            .resolve("salon-1", &token, ClaimAction::Decline)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            WaitlineError::Claim(ClaimRejection::AlreadyResolved {
                status: OfferStatus::Accepted
            })
        ));
    }

    #[tokio::test]
    async fn decline_requeues_with_cooldown() {
        let h = harness();
        let token = seed_claim(&h, "e-1", 0);

        let resolution = h
            .resolver
            .resolve("salon-1", &token, ClaimAction::Decline)
            .await
            .unwrap();
        let ClaimResolution::DeclinedRequeued { cooldown_until } = resolution else {
            panic!("expected DeclinedRequeued");
        };

        let stored = h.store.entry("e-1").unwrap();
        assert_eq!(stored.status, EntryStatus::Waiting);
        assert_eq!(stored.decline_count, 1);
        assert_eq!(stored.cooldown_until, Some(cooldown_until));
        assert_eq!(stored.cooldown_reason.as_deref(), Some("declined"));
        assert!(stored.notified_at.is_none(), "claim fields are cleared");
        assert!(stored.expires_at.is_none());

        assert_eq!(h.store.offer("o-e-1").unwrap().status, OfferStatus::Declined);
        assert_eq!(h.store.events()[0].reason, "offer_declined");
    }

    #[tokio::test]
    async fn decline_at_limit_expires_the_entry() {
        let h = harness();
        // Two declines already recorded; the third is final with max = 3.
        let token = seed_claim(&h, "e-1", 2);

        let resolution = h
            .resolver
            .resolve("salon-1", &token, ClaimAction::Decline)
            .await
            .unwrap();
        assert!(matches!(resolution, ClaimResolution::DeclinedExpired));

        let stored = h.store.entry("e-1").unwrap();
        assert_eq!(stored.status, EntryStatus::Expired);
        assert_eq!(stored.decline_count, 3);
        assert_eq!(h.store.offer("o-e-1").unwrap().status, OfferStatus::Declined);
        assert_eq!(h.store.events()[0].reason, "decline_limit_reached");
    }

    #[tokio::test]
    async fn booking_gateway_failure_propagates_and_leaves_claim_intact() {
        let h = harness();
        let token = seed_claim(&h, "e-1", 0);
        h.bookings.fail_creation();

        let err = h
            .resolver
            .resolve("salon-1", &token, ClaimAction::Accept)
            .await
            .unwrap_err();
        assert!(matches!(err, WaitlineError::Internal(_)));

        // Nothing moved: the claim can be retried within its window.
        let stored = h.store.entry("e-1").unwrap();
        assert_eq!(stored.status, EntryStatus::Notified);
        assert_eq!(h.store.offer("o-e-1").unwrap().status, OfferStatus::Pending);
    }

    #[test]
    fn claim_action_parses_wire_form() {
        assert_eq!(ClaimAction::from_str("accept").unwrap(), ClaimAction::Accept);
        assert_eq!(
            ClaimAction::from_str("decline").unwrap(),
            ClaimAction::Decline
        );
        assert!(ClaimAction::from_str("maybe").is_err());
    }
}
