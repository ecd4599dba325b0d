// SPDX-FileCopyrightText: 2026 Waitline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Notification sender traits for the SMS and email channels.
//!
//! The two contracts are deliberately asymmetric, matching the upstream
//! providers: SMS reports an outcome value and never fails the caller, while
//! email returns a `Result`. The coordinator folds both into a
//! [`crate::types::DeliveryReport`] and treats every failure as a warning.

use async_trait::async_trait;

use crate::error::WaitlineError;

/// Result of one SMS send attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SmsDelivery {
    /// Whether the send was permitted at all (channel enabled, recipient
    /// reachable, not opted out). A disallowed send is not an error.
    pub allowed: bool,
    /// Provider-reported delivery status (e.g. `queued`), when available.
    pub status: Option<String>,
    pub error: Option<String>,
}

impl SmsDelivery {
    pub fn sent(status: impl Into<String>) -> Self {
        Self {
            allowed: true,
            status: Some(status.into()),
            error: None,
        }
    }

    pub fn not_allowed(reason: impl Into<String>) -> Self {
        Self {
            allowed: false,
            status: Some(reason.into()),
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            allowed: true,
            status: None,
            error: Some(error.into()),
        }
    }

    /// A delivery counts as succeeded only when it was allowed and error-free.
    pub fn succeeded(&self) -> bool {
        self.allowed && self.error.is_none()
    }
}

/// Outbound SMS transport.
#[async_trait]
pub trait SmsSender: Send + Sync {
    async fn send_sms(&self, to: &str, body: &str) -> SmsDelivery;
}

/// An outbound email.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailMessage {
    pub to: String,
    pub subject: String,
    pub body: String,
}

/// Outbound email transport.
#[async_trait]
pub trait EmailSender: Send + Sync {
    async fn send_email(&self, message: &EmailMessage) -> Result<(), WaitlineError>;
}
