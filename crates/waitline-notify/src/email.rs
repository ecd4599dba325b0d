// SPDX-FileCopyrightText: 2026 Waitline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SMTP email transport via lettre.

use async_trait::async_trait;
use lettre::message::Mailbox;
use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use tracing::debug;

use waitline_core::{EmailMessage, EmailSender, WaitlineError};

/// Email sender over SMTP submission with STARTTLS.
pub struct SmtpEmail {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpEmail {
    pub fn new(
        host: &str,
        port: u16,
        username: Option<String>,
        password: Option<String>,
        from_address: &str,
    ) -> Result<Self, WaitlineError> {
        let from = from_address
            .parse::<Mailbox>()
            .map_err(|e| WaitlineError::Config(format!("invalid email.from_address: {e}")))?;

        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host)
            .map_err(|e| WaitlineError::Config(format!("invalid email.smtp_host: {e}")))?
            .port(port);
        if let (Some(username), Some(password)) = (username, password) {
            builder = builder.credentials(Credentials::new(username, password));
        }

        Ok(Self {
            transport: builder.build(),
            from,
        })
    }
}

#[async_trait]
impl EmailSender for SmtpEmail {
    async fn send_email(&self, message: &EmailMessage) -> Result<(), WaitlineError> {
        let to = message
            .to
            .parse::<Mailbox>()
            .map_err(|e| WaitlineError::Notification {
                channel: "email",
                message: format!("invalid recipient address `{}`: {e}", message.to),
                source: None,
            })?;

        let email = Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(message.subject.clone())
            .header(ContentType::TEXT_PLAIN)
            .body(message.body.clone())
            .map_err(|e| WaitlineError::Notification {
                channel: "email",
                message: format!("message build failed: {e}"),
                source: Some(Box::new(e)),
            })?;

        self.transport
            .send(email)
            .await
            .map_err(|e| WaitlineError::Notification {
                channel: "email",
                message: format!("smtp send failed: {e}"),
                source: Some(Box::new(e)),
            })?;

        debug!(to = %message.to, "email accepted for delivery");
        Ok(())
    }
}

/// Sender used when the email channel is not configured.
pub struct DisabledEmail;

#[async_trait]
impl EmailSender for DisabledEmail {
    async fn send_email(&self, _message: &EmailMessage) -> Result<(), WaitlineError> {
        Err(WaitlineError::Notification {
            channel: "email",
            message: "email channel disabled".to_string(),
            source: None,
        })
    }
}
