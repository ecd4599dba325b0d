// SPDX-FileCopyrightText: 2026 Waitline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Twilio-compatible SMS transport.
//!
//! Sends via the Messages API with basic auth and form encoding. Every
//! failure mode folds into the returned [`SmsDelivery`]; this sender never
//! fails its caller.

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, warn};

use waitline_core::{SmsDelivery, SmsSender};

const DEFAULT_API_BASE_URL: &str = "https://api.twilio.com";

/// SMS sender backed by a Twilio-compatible Messages API.
pub struct TwilioSms {
    http: reqwest::Client,
    account_sid: String,
    auth_token: String,
    from_number: String,
    api_base_url: String,
}

#[derive(Debug, Deserialize)]
struct MessageResponse {
    status: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorResponse {
    message: Option<String>,
}

impl TwilioSms {
    pub fn new(
        account_sid: impl Into<String>,
        auth_token: impl Into<String>,
        from_number: impl Into<String>,
    ) -> Self {
        Self {
            http: reqwest::Client::new(),
            account_sid: account_sid.into(),
            auth_token: auth_token.into(),
            from_number: from_number.into(),
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
        }
    }

    /// Point the sender at a different API host (tests, regional endpoints).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.api_base_url = base_url.into();
        self
    }

    fn messages_url(&self) -> String {
        format!(
            "{}/2010-04-01/Accounts/{}/Messages.json",
            self.api_base_url.trim_end_matches('/'),
            self.account_sid
        )
    }
}

#[async_trait]
impl SmsSender for TwilioSms {
    async fn send_sms(&self, to: &str, body: &str) -> SmsDelivery {
        if to.trim().is_empty() {
            return SmsDelivery::not_allowed("no recipient number");
        }

        let params = [("To", to), ("From", self.from_number.as_str()), ("Body", body)];
        let response = self
            .http
            .post(self.messages_url())
            .basic_auth(&self.account_sid, Some(&self.auth_token))
            .form(&params)
            .send()
            .await;

        match response {
            Ok(resp) if resp.status().is_success() => {
                let status = resp
                    .json::<MessageResponse>()
                    .await
                    .ok()
                    .and_then(|m| m.status)
                    .unwrap_or_else(|| "queued".to_string());
                debug!(to, %status, "sms accepted by provider");
                SmsDelivery::sent(status)
            }
            Ok(resp) => {
                let code = resp.status();
                let detail = resp
                    .json::<ApiErrorResponse>()
                    .await
                    .ok()
                    .and_then(|e| e.message)
                    .unwrap_or_else(|| "no detail".to_string());
                warn!(to, %code, %detail, "sms rejected by provider");
                SmsDelivery::failed(format!("provider returned {code}: {detail}"))
            }
            Err(e) => {
                warn!(to, error = %e, "sms transport error");
                SmsDelivery::failed(format!("transport: {e}"))
            }
        }
    }
}

/// Sender used when the SMS channel is not configured. Reports the send as
/// disallowed so the coordinator records the skip rather than an error.
pub struct DisabledSms;

#[async_trait]
impl SmsSender for DisabledSms {
    async fn send_sms(&self, _to: &str, _body: &str) -> SmsDelivery {
        SmsDelivery::not_allowed("sms channel disabled")
    }
}
