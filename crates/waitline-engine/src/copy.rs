// SPDX-FileCopyrightText: 2026 Waitline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Customer-facing offer copy for the SMS and email channels.

use chrono::{DateTime, Utc};
use waitline_core::{FreedSlot, WaitlistEntry};

/// Accept/decline links carrying the raw claim token.
pub struct ClaimLinks {
    pub accept: String,
    pub decline: String,
}

impl ClaimLinks {
    pub fn build(base_url: &str, salon_id: &str, raw_token: &str) -> Self {
        let base = base_url.trim_end_matches('/');
        Self {
            accept: format!(
                "{base}/v1/salons/{salon_id}/claim?action=accept&token={raw_token}"
            ),
            decline: format!(
                "{base}/v1/salons/{salon_id}/claim?action=decline&token={raw_token}"
            ),
        }
    }
}

fn slot_description(slot: &FreedSlot) -> String {
    match slot.end {
        Some(end) => format!(
            "{} from {} to {}",
            slot.date.format("%A, %B %-d"),
            slot.start.format("%H:%M"),
            end.format("%H:%M")
        ),
        None => format!(
            "{} at {}",
            slot.date.format("%A, %B %-d"),
            slot.start.format("%H:%M")
        ),
    }
}

/// SMS body: short, links only, hold deadline up front.
pub fn sms_body(
    entry: &WaitlistEntry,
    slot: &FreedSlot,
    expires_at: DateTime<Utc>,
    links: &ClaimLinks,
) -> String {
    format!(
        "{name}, an appointment opened up on {slot}. It's held for you until {deadline} UTC.\n\
         Book: {accept}\nPass: {decline}",
        name = entry.customer.display_name,
        slot = slot_description(slot),
        deadline = expires_at.format("%H:%M"),
        accept = links.accept,
        decline = links.decline,
    )
}

pub fn email_subject(slot: &FreedSlot) -> String {
    format!("An appointment opened up on {}", slot_description(slot))
}

/// Email body. When the SMS channel already succeeded the email says so, so
/// the customer understands why they were reached twice.
pub fn email_body(
    entry: &WaitlistEntry,
    slot: &FreedSlot,
    expires_at: DateTime<Utc>,
    links: &ClaimLinks,
    sms_already_sent: bool,
) -> String {
    let sms_note = if sms_already_sent {
        "\n(We also sent this offer to your phone by text message.)\n"
    } else {
        ""
    };
    format!(
        "Hi {name},\n\n\
         A slot matching your waitlist request just opened up: {slot}.\n\
         It is held exclusively for you until {deadline} UTC.\n\n\
         Book it: {accept}\n\
         Not interested: {decline}\n\
         {sms_note}\n\
         If the hold expires, the slot is offered to the next person in line.\n",
        name = entry.customer.display_name,
        slot = slot_description(slot),
        deadline = expires_at.format("%Y-%m-%d %H:%M"),
        accept = links.accept,
        decline = links.decline,
    )
}
