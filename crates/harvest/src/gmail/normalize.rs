//! Message normalization and attachment-tree flattening
//!
//! Converts a raw Gmail message into an [`EmailDetail`]: header fields,
//! a timezone-localized display date, a numeric sort key, and the
//! flattened list of attachments found anywhere in the nested part tree.

use base64::Engine as _;
use chrono::DateTime;
use log::warn;

use super::api::{GmailMessage, Header, MessagePart};
use super::{MailSource, ist_offset};
use crate::models::{AttachmentDescriptor, EmailDetail, MessageId};

/// Fallback header values, matching what the harvester displays when a
/// message omits the field entirely.
const NO_SUBJECT: &str = "No subject";
const UNKNOWN_SENDER: &str = "Unknown sender";
const UNKNOWN_DATE: &str = "Unknown date";

/// Fetch one message and normalize it.
///
/// Returns `None` (never an error) when the detail fetch fails: a single
/// message's failure must not abort a batch. Callers filter the `None`s
/// and report how many were dropped.
pub fn extract_detail(source: &dyn MailSource, id: &MessageId) -> Option<EmailDetail> {
    match source.get_message(id) {
        Ok(message) => Some(detail_from_message(&message)),
        Err(e) => {
            warn!("Dropping message {}: {}", id.as_str(), e);
            None
        }
    }
}

/// Normalize an already-fetched message.
pub fn detail_from_message(message: &GmailMessage) -> EmailDetail {
    let message_id = MessageId::new(&message.id);
    let headers: &[Header] = message
        .payload
        .as_ref()
        .and_then(|p| p.headers.as_deref())
        .unwrap_or(&[]);

    let subject = header_value(headers, "Subject").unwrap_or(NO_SUBJECT).to_string();
    let from = header_value(headers, "From").unwrap_or(UNKNOWN_SENDER);
    let raw_date = header_value(headers, "Date").unwrap_or(UNKNOWN_DATE).to_string();

    let (from_name, from_email) = split_sender(from);

    let sort_key = parse_date(&raw_date).map(|dt| dt.timestamp_millis());
    let display_date = display_date(&raw_date);

    let mut attachments = Vec::new();
    if let Some(parts) = message.payload.as_ref().and_then(|p| p.parts.as_deref()) {
        collect_attachments(parts, &message_id, &mut attachments);
    }

    EmailDetail {
        subject,
        from_name,
        from_email,
        raw_date,
        sort_key,
        display_date,
        attachments,
    }
}

/// Look up a header by exact, case-sensitive name; first match wins.
///
/// The mail store delivers canonical header keys, so no case folding.
fn header_value<'a>(headers: &'a [Header], name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|h| h.name == name)
        .map(|h| h.value.as_str())
}

/// Split a From header into display name and address.
///
/// The name is the text before the first `<`, trimmed; the address is
/// the text inside the first pair of angle brackets, or empty.
fn split_sender(from: &str) -> (String, String) {
    let name = from.split('<').next().unwrap_or("").trim();
    let name = if name.is_empty() {
        UNKNOWN_SENDER.to_string()
    } else {
        name.to_string()
    };

    let email = from
        .split_once('<')
        .and_then(|(_, rest)| rest.split_once('>'))
        .map(|(addr, _)| addr.trim().to_string())
        .unwrap_or_default();

    (name, email)
}

/// Parse a Date header as RFC 2822, falling back to RFC 3339.
fn parse_date(raw: &str) -> Option<DateTime<chrono::FixedOffset>> {
    DateTime::parse_from_rfc2822(raw)
        .or_else(|_| DateTime::parse_from_rfc3339(raw))
        .ok()
}

/// Render a raw date as an IST-localized display string, e.g.
/// "15 Mar 2024 (Friday), 05:30 pm". An unparsable date comes back
/// unmodified; this never fails.
fn display_date(raw: &str) -> String {
    match parse_date(raw) {
        Some(dt) => dt
            .with_timezone(&ist_offset())
            .format("%d %b %Y (%A), %I:%M %P")
            .to_string(),
        None => raw.to_string(),
    }
}

/// Flatten a part tree into attachment descriptors.
///
/// Any part with a non-empty filename and a resolvable attachment id
/// becomes one descriptor; nested `parts` are always walked afterward,
/// whether or not the part itself carried a filename, so mixed
/// multipart/nested-multipart messages are fully covered. Sibling order
/// is preserved at every level.
fn collect_attachments(
    parts: &[MessagePart],
    message_id: &MessageId,
    acc: &mut Vec<AttachmentDescriptor>,
) {
    for part in parts {
        if let Some(filename) = &part.filename
            && !filename.is_empty()
        {
            // Inline parts carry data instead of an attachment id; only
            // id-bearing parts can be fetched later.
            match part.body.as_ref().and_then(|b| b.attachment_id.clone()) {
                Some(attachment_id) => acc.push(AttachmentDescriptor {
                    filename: filename.clone(),
                    attachment_id,
                    message_id: message_id.clone(),
                }),
                None => warn!(
                    "Part {:?} in message {} has no attachment id, skipping",
                    filename,
                    message_id.as_str()
                ),
            }
        }
        if let Some(nested) = &part.parts {
            collect_attachments(nested, message_id, acc);
        }
    }
}

/// Decode base64 payload data.
///
/// The mail store uses URL-safe base64 but padding can vary, so several
/// engines are tried in turn.
pub fn decode_base64(data: &str) -> Option<Vec<u8>> {
    use base64::engine::general_purpose::{STANDARD, STANDARD_NO_PAD, URL_SAFE, URL_SAFE_NO_PAD};

    let engines: &[&base64::engine::GeneralPurpose] =
        &[&URL_SAFE_NO_PAD, &URL_SAFE, &STANDARD, &STANDARD_NO_PAD];

    for engine in engines {
        if let Ok(decoded) = engine.decode(data) {
            return Some(decoded);
        }
    }

    None
}
