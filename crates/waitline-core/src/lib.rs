// SPDX-FileCopyrightText: 2026 Waitline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Waitline waitlist matching & claim-offer engine.
//!
//! This crate provides the domain types, error types, and collaborator trait
//! definitions used throughout the Waitline workspace. The engine crate
//! holds the protocol logic; storage and notification crates implement the
//! seams defined here.

pub mod error;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use error::{ClaimRejection, WaitlineError};
pub use types::{
    ChannelOutcome, CustomerContact, DeliveryReport, EntryStatus, FreedSlot, LifecycleEvent,
    OfferStatus, PreferenceMode, PriorityOverride, WaitlistEntry, WaitlistOffer,
};

// Re-export all collaborator traits at crate root.
pub use traits::{
    BookingGateway, ClaimPolicy, EmailMessage, EmailSender, EntryRepository, EventRepository,
    OfferRepository, PolicyResolver, SlotAvailability, SmsDelivery, SmsSender, TransitionFields,
};
