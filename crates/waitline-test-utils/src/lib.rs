// SPDX-FileCopyrightText: 2026 Waitline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for the Waitline workspace: an in-memory repository set
//! with genuine compare-and-swap semantics, recording mock senders, and
//! fixture builders. Intended for dev-dependencies only.

pub mod collaborators;
pub mod fixtures;
pub mod memory;
pub mod mock_notify;

pub use collaborators::{FixedPolicies, MockAvailability, MockBookings};
pub use memory::MemoryStore;
pub use mock_notify::{EmailBehavior, MockEmail, MockSms, SmsBehavior};
