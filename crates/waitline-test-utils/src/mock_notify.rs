// SPDX-FileCopyrightText: 2026 Waitline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock notification senders with injectable behavior.
//!
//! `MockSms` and `MockEmail` capture everything passed to them for
//! assertion, and can be told to fail, disallow, or stall to exercise the
//! coordinator's per-channel error handling and timeouts.

use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use waitline_core::{EmailMessage, EmailSender, SmsDelivery, SmsSender, WaitlineError};

/// What the next SMS sends should do.
#[derive(Debug, Clone)]
pub enum SmsBehavior {
    Succeed,
    Fail(String),
    Disallow(String),
    /// Sleep before succeeding, to trip the caller's timeout.
    Stall(Duration),
}

/// Recording SMS sender.
pub struct MockSms {
    behavior: Mutex<SmsBehavior>,
    sent: Mutex<Vec<(String, String)>>,
}

impl MockSms {
    pub fn new() -> Self {
        Self {
            behavior: Mutex::new(SmsBehavior::Succeed),
            sent: Mutex::new(Vec::new()),
        }
    }

    pub fn set_behavior(&self, behavior: SmsBehavior) {
        *self.behavior.lock().unwrap() = behavior;
    }

    /// `(to, body)` pairs captured from every attempted send.
    pub fn sent(&self) -> Vec<(String, String)> {
        self.sent.lock().unwrap().clone()
    }

    pub fn sent_count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }
}

impl Default for MockSms {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SmsSender for MockSms {
    async fn send_sms(&self, to: &str, body: &str) -> SmsDelivery {
        let behavior = self.behavior.lock().unwrap().clone();
        self.sent
            .lock()
            .unwrap()
            .push((to.to_string(), body.to_string()));
        match behavior {
            SmsBehavior::Succeed => SmsDelivery::sent("queued"),
            SmsBehavior::Fail(message) => SmsDelivery::failed(message),
            SmsBehavior::Disallow(reason) => SmsDelivery::not_allowed(reason),
            SmsBehavior::Stall(duration) => {
                tokio::time::sleep(duration).await;
                SmsDelivery::sent("queued")
            }
        }
    }
}

/// What the next email sends should do.
#[derive(Debug, Clone)]
pub enum EmailBehavior {
    Succeed,
    Fail(String),
    /// Sleep before succeeding, to trip the caller's timeout.
    Stall(Duration),
}

/// Recording email sender.
pub struct MockEmail {
    behavior: Mutex<EmailBehavior>,
    sent: Mutex<Vec<EmailMessage>>,
}

impl MockEmail {
    pub fn new() -> Self {
        Self {
            behavior: Mutex::new(EmailBehavior::Succeed),
            sent: Mutex::new(Vec::new()),
        }
    }

    pub fn set_behavior(&self, behavior: EmailBehavior) {
        *self.behavior.lock().unwrap() = behavior;
    }

    pub fn sent(&self) -> Vec<EmailMessage> {
        self.sent.lock().unwrap().clone()
    }

    pub fn sent_count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }
}

impl Default for MockEmail {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EmailSender for MockEmail {
    async fn send_email(&self, message: &EmailMessage) -> Result<(), WaitlineError> {
        let behavior = self.behavior.lock().unwrap().clone();
        self.sent.lock().unwrap().push(message.clone());
        match behavior {
            EmailBehavior::Succeed => Ok(()),
            EmailBehavior::Fail(reason) => Err(WaitlineError::Notification {
                channel: "email",
                message: reason,
                source: None,
            }),
            EmailBehavior::Stall(duration) => {
                tokio::time::sleep(duration).await;
                Ok(())
            }
        }
    }
}
