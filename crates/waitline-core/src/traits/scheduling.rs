// SPDX-FileCopyrightText: 2026 Waitline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Seams toward the scheduling side of the platform.
//!
//! Booking CRUD lives outside this engine; these traits are the only points
//! of contact.

use async_trait::async_trait;

use crate::error::WaitlineError;
use crate::types::{FreedSlot, WaitlistEntry, WaitlistOffer};

/// Creates the booking when an accepted claim fulfills an entry.
///
/// Returns the booking reference attached to the entry on the
/// `notified -> booked` transition.
#[async_trait]
pub trait BookingGateway: Send + Sync {
    async fn create_booking(
        &self,
        entry: &WaitlistEntry,
        offer: &WaitlistOffer,
    ) -> Result<String, WaitlineError>;
}

/// Answers whether a freed slot is still open at match time.
///
/// Consulted defensively by the coordinator before matching, since a slot
/// can be rebooked through regular scheduling between the cancellation event
/// and the offer round.
#[async_trait]
pub trait SlotAvailability: Send + Sync {
    async fn is_slot_open(&self, slot: &FreedSlot) -> Result<bool, WaitlineError>;
}
