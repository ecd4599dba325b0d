// SPDX-FileCopyrightText: 2026 Waitline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Notification transports for the Waitline engine.
//!
//! Production implementations of the `SmsSender`/`EmailSender` seams: a
//! Twilio-compatible SMS sender and an SMTP email sender, plus disabled
//! stand-ins for deployments that run a single channel.

pub mod email;
pub mod sms;

pub use email::{DisabledEmail, SmtpEmail};
pub use sms::{DisabledSms, TwilioSms};
