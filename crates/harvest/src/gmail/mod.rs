//! Gmail API integration
//!
//! This module provides:
//! - OAuth2 authentication flow shared with the Drive client
//! - Gmail API client for searching messages and fetching attachments
//! - Normalization of raw messages into [`EmailDetail`] records
//!
//! [`EmailDetail`]: crate::models::EmailDetail

mod auth;
mod client;
mod normalize;

pub use auth::GoogleAuth;
pub use client::GmailClient;
pub use normalize::{decode_base64, detail_from_message, extract_detail};

use anyhow::Result;
use chrono::FixedOffset;

use crate::models::MessageId;

/// India Standard Time (+05:30), the fixed display timezone.
pub fn ist_offset() -> FixedOffset {
    // Offset is a compile-time constant well inside the valid range.
    FixedOffset::east_opt(5 * 3600 + 30 * 60).unwrap()
}

/// Read access to the remote mail store.
///
/// Implemented by [`GmailClient`]; tests substitute an in-memory fake.
pub trait MailSource: Send + Sync {
    /// Fetch one page of search results for a query.
    fn search_page(&self, query: &str, page_token: Option<&str>) -> Result<api::SearchResponse>;

    /// Fetch one message's full representation, part tree included.
    fn get_message(&self, id: &MessageId) -> Result<api::GmailMessage>;

    /// Fetch one attachment's base64-encoded payload.
    fn get_attachment(&self, message_id: &MessageId, attachment_id: &str) -> Result<String>;
}

/// Gmail API response types
pub mod api {
    use serde::Deserialize;

    /// Response from the message search endpoint
    #[derive(Debug, Default, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct SearchResponse {
        pub messages: Option<Vec<MessageRef>>,
        pub next_page_token: Option<String>,
        pub result_size_estimate: Option<u32>,
    }

    /// Reference to a matching message; only the id is stable
    #[derive(Debug, Deserialize)]
    pub struct MessageRef {
        pub id: String,
    }

    /// Full message from the Gmail API
    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct GmailMessage {
        pub id: String,
        pub payload: Option<MessagePayload>,
    }

    /// Message payload containing headers and the root of the part tree
    #[derive(Debug, Default, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct MessagePayload {
        pub headers: Option<Vec<Header>>,
        pub parts: Option<Vec<MessagePart>>,
    }

    /// Email header (name-value pair)
    #[derive(Debug, Deserialize)]
    pub struct Header {
        pub name: String,
        pub value: String,
    }

    /// One node of the nested MIME part tree
    #[derive(Debug, Default, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct MessagePart {
        pub filename: Option<String>,
        pub mime_type: Option<String>,
        pub body: Option<PartBody>,
        pub parts: Option<Vec<MessagePart>>,
    }

    /// Body of one part; attachments carry an id instead of inline data
    #[derive(Debug, Default, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct PartBody {
        pub attachment_id: Option<String>,
        pub size: Option<u32>,
        pub data: Option<String>,
    }

    /// Response from the attachment content endpoint
    #[derive(Debug, Deserialize)]
    pub struct AttachmentResponse {
        pub size: Option<u32>,
        pub data: Option<String>,
    }
}
