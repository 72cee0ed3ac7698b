//! Message and attachment models
//!
//! An [`EmailDetail`] is built once per harvested message and owns the
//! attachment descriptors found in that message's part tree. Details
//! live in memory for the session and are discarded on a new search.

use chrono::{Datelike, TimeZone, Utc};
use std::cmp::Ordering;

/// Unique identifier for a message (Gmail message ID)
///
/// Opaque; no other message attribute is assumed stable.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MessageId(pub String);

impl MessageId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for MessageId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for MessageId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// One attachment found while walking a message's part tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachmentDescriptor {
    pub filename: String,
    /// Remote attachment id, resolvable against the owning message.
    pub attachment_id: String,
    /// The message this attachment was found in.
    pub message_id: MessageId,
}

/// Normalized metadata and attachments for one harvested message.
#[derive(Debug, Clone)]
pub struct EmailDetail {
    pub subject: String,
    /// Sender display name (text before the `<` in the From header).
    pub from_name: String,
    /// Sender address (text inside the angle brackets), or empty.
    pub from_email: String,
    /// The Date header exactly as delivered.
    pub raw_date: String,
    /// Epoch milliseconds of the parsed date; `None` when unparsable.
    pub sort_key: Option<i64>,
    /// IST-localized human-readable date, or the raw string when the
    /// date did not parse.
    pub display_date: String,
    pub attachments: Vec<AttachmentDescriptor>,
}

impl EmailDetail {
    /// Descending date order. Entries with unparsable dates compare
    /// below every parsed date, so they sort last, deterministically.
    pub fn cmp_by_date_desc(a: &Self, b: &Self) -> Ordering {
        b.sort_key.cmp(&a.sort_key)
    }

    /// Calendar year and month (1-12) of the message date, or `None`
    /// when the date did not parse.
    pub fn year_month(&self) -> Option<(i32, u32)> {
        let millis = self.sort_key?;
        let utc = Utc.timestamp_millis_opt(millis).single()?;
        let local = utc.with_timezone(&crate::gmail::ist_offset());
        Some((local.year(), local.month()))
    }
}
