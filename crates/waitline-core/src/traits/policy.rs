// SPDX-FileCopyrightText: 2026 Waitline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Claim-expiry policy resolution.

use async_trait::async_trait;

use crate::error::WaitlineError;

/// Fallback claim window when no policy resolves for a (salon, service).
pub const DEFAULT_CLAIM_EXPIRY_MINUTES: i64 = 15;

/// How long a notified customer holds an exclusive claim on a freed slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClaimPolicy {
    pub claim_expiry_minutes: i64,
}

impl Default for ClaimPolicy {
    fn default() -> Self {
        Self {
            claim_expiry_minutes: DEFAULT_CLAIM_EXPIRY_MINUTES,
        }
    }
}

/// Resolves the claim policy for a (salon, service) pair.
///
/// Resolution failure is non-fatal by contract: callers fall back to
/// [`ClaimPolicy::default`] rather than aborting the offer round.
#[async_trait]
pub trait PolicyResolver: Send + Sync {
    async fn resolve_policy(
        &self,
        salon_id: &str,
        service_id: &str,
    ) -> Result<ClaimPolicy, WaitlineError>;
}
