// SPDX-FileCopyrightText: 2026 Waitline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Waitline engine.

use thiserror::Error;

use crate::types::OfferStatus;

/// The primary error type used across all Waitline components.
///
/// Lost compare-and-swap races are deliberately NOT represented here:
/// a conditional update that affects zero rows is a benign no-op reported
/// through the affected-row count, never through an error.
#[derive(Debug, Error)]
pub enum WaitlineError {
    /// Malformed input (bad UUID, unparsable date/time, missing contact, ...).
    #[error("validation error: {0}")]
    Validation(String),

    /// A claim token was presented but cannot be honored.
    #[error("claim rejected: {0}")]
    Claim(#[from] ClaimRejection),

    /// Storage backend errors (database connection, query failure, serialization).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Per-channel notification delivery errors. Callers capture these into
    /// the offer record; they never fail the surrounding operation.
    #[error("notification error on {channel}: {message}")]
    Notification {
        channel: &'static str,
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Claim-expiry policy could not be resolved. Callers fall back to the
    /// default claim window instead of aborting.
    #[error("policy resolution error: {message}")]
    Policy { message: String },

    /// Configuration errors (invalid TOML, missing required fields, type mismatches).
    #[error("configuration error: {0}")]
    Config(String),

    /// Operation timed out.
    #[error("operation timed out after {duration:?}")]
    Timeout { duration: std::time::Duration },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

/// Why a presented claim token was rejected.
///
/// Validation-class: reported to the caller, never retried. The claim-action
/// endpoint maps each variant to its own response.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClaimRejection {
    /// No offer matches the presented token within the salon.
    #[error("no offer matches the presented token")]
    NotFound,

    /// The offer was already resolved (or lost to a concurrent resolution).
    #[error("offer already resolved to `{status}`")]
    AlreadyResolved { status: OfferStatus },

    /// The claim window lapsed. Rejected even when the offer row still reads
    /// `pending` -- an unswept row does not excuse an expired token.
    #[error("claim window expired")]
    Expired,
}
