// SPDX-FileCopyrightText: 2026 Waitline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock policy, booking, and availability collaborators.

use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use async_trait::async_trait;

use waitline_core::{
    BookingGateway, ClaimPolicy, FreedSlot, PolicyResolver, SlotAvailability, WaitlineError,
    WaitlistEntry, WaitlistOffer,
};

/// Policy resolver returning one fixed policy, or failing on demand.
pub struct FixedPolicies {
    policy: Mutex<ClaimPolicy>,
    fail: AtomicBool,
}

impl FixedPolicies {
    pub fn minutes(claim_expiry_minutes: i64) -> Self {
        Self {
            policy: Mutex::new(ClaimPolicy {
                claim_expiry_minutes,
            }),
            fail: AtomicBool::new(false),
        }
    }

    /// Make every subsequent resolution fail, to exercise the default
    /// fallback path.
    pub fn fail_resolution(&self) {
        self.fail.store(true, Ordering::SeqCst);
    }
}

impl Default for FixedPolicies {
    fn default() -> Self {
        Self::minutes(ClaimPolicy::default().claim_expiry_minutes)
    }
}

#[async_trait]
impl PolicyResolver for FixedPolicies {
    async fn resolve_policy(
        &self,
        _salon_id: &str,
        _service_id: &str,
    ) -> Result<ClaimPolicy, WaitlineError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(WaitlineError::Policy {
                message: "policy backend unavailable".to_string(),
            });
        }
        Ok(*self.policy.lock().unwrap())
    }
}

/// Booking gateway minting sequential references.
#[derive(Default)]
pub struct MockBookings {
    counter: AtomicU64,
    fail: AtomicBool,
}

impl MockBookings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_creation(&self) {
        self.fail.store(true, Ordering::SeqCst);
    }

    pub fn created_count(&self) -> u64 {
        self.counter.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BookingGateway for MockBookings {
    async fn create_booking(
        &self,
        _entry: &WaitlistEntry,
        _offer: &WaitlistOffer,
    ) -> Result<String, WaitlineError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(WaitlineError::Internal(
                "booking service unavailable".to_string(),
            ));
        }
        let n = self.counter.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(format!("booking-{n}"))
    }
}

/// Availability checker with a switchable answer.
pub struct MockAvailability {
    open: AtomicBool,
}

impl MockAvailability {
    pub fn open() -> Self {
        Self {
            open: AtomicBool::new(true),
        }
    }

    pub fn close_slot(&self) {
        self.open.store(false, Ordering::SeqCst);
    }
}

#[async_trait]
impl SlotAvailability for MockAvailability {
    async fn is_slot_open(&self, _slot: &FreedSlot) -> Result<bool, WaitlineError> {
        Ok(self.open.load(Ordering::SeqCst))
    }
}
