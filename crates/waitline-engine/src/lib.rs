// SPDX-FileCopyrightText: 2026 Waitline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Waitlist matching & claim-offer engine.
//!
//! When a booked slot is cancelled, [`coordinator::OfferCoordinator`] picks
//! the best-fit waiting customer ([`selector::MatchSelector`] over
//! [`scoring`] and [`eligibility`]), issues a time-boxed exclusive claim
//! ([`token`]), and delivers a dual-channel notification.
//! [`resolver::ClaimResolver`] consumes the accept/decline token later, and
//! [`sweep::ExpirySweep`] reclaims whatever was left unattended. All
//! exclusivity rests on conditional writes against the store -- there are
//! no in-process locks, so any number of worker processes can run the same
//! protocol concurrently.

pub mod coordinator;
pub mod copy;
pub mod eligibility;
pub mod intake;
pub mod resolver;
pub mod scoring;
pub mod selector;
pub mod sweep;
pub mod token;

pub use coordinator::{OfferConfig, OfferCoordinator, OfferOutcome};
pub use intake::{IntakeConfig, IntakeRequest, IntakeService};
pub use resolver::{ClaimAction, ClaimResolution, ClaimResolver, ResolverConfig};
pub use selector::MatchSelector;
pub use sweep::{ExpirySweep, SweepConfig, SweepReport};
pub use token::ClaimTokens;
