// SPDX-FileCopyrightText: 2026 Waitline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Collaborator trait definitions for the Waitline engine.
//!
//! Everything the engine touches beyond its own logic -- persistence,
//! notification transports, claim-expiry policy, the scheduling side --
//! sits behind one of these seams and is injected explicitly. There is no
//! ambient global state.

pub mod notify;
pub mod policy;
pub mod repository;
pub mod scheduling;

pub use notify::{EmailMessage, EmailSender, SmsDelivery, SmsSender};
pub use policy::{ClaimPolicy, PolicyResolver};
pub use repository::{EntryRepository, EventRepository, OfferRepository, TransitionFields};
pub use scheduling::{BookingGateway, SlotAvailability};
