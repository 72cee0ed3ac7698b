//! Gmail API HTTP client
//!
//! Uses synchronous HTTP (ureq) to be executor-agnostic. Every method
//! maps a non-success status to a [`FetchError`] naming the operation;
//! transport failures surface with context attached.

use anyhow::{Context, Result};
use std::sync::Arc;

use super::api::{AttachmentResponse, GmailMessage, SearchResponse};
use super::{GoogleAuth, MailSource};
use crate::error::FetchError;
use crate::models::MessageId;

/// Gmail API client for read-only message access
pub struct GmailClient {
    auth: Arc<GoogleAuth>,
}

impl GmailClient {
    /// Gmail API base URL
    const BASE_URL: &'static str = "https://gmail.googleapis.com/gmail/v1";

    /// Create a new Gmail client sharing the given auth state
    pub fn new(auth: Arc<GoogleAuth>) -> Self {
        Self { auth }
    }
}

impl MailSource for GmailClient {
    /// Fetch one page of message search results
    ///
    /// # Arguments
    /// * `query` - Gmail search predicate (e.g. `from:*@acme.com has:attachment`)
    /// * `page_token` - Continuation token from the previous page, if any
    fn search_page(&self, query: &str, page_token: Option<&str>) -> Result<SearchResponse> {
        let access_token = self.auth.access_token()?;

        let mut url = format!(
            "{}/users/me/messages?q={}",
            Self::BASE_URL,
            urlencoding::encode(query)
        );
        if let Some(token) = page_token {
            url.push_str(&format!("&pageToken={}", token));
        }

        let mut response = match ureq::get(&url)
            .header("Authorization", &format!("Bearer {}", access_token))
            .call()
        {
            Ok(response) => response,
            Err(ureq::Error::StatusCode(status)) => {
                return Err(FetchError::new("message search", status).into());
            }
            Err(e) => return Err(anyhow::Error::new(e).context("Failed to send search request")),
        };

        response
            .body_mut()
            .read_json()
            .context("Failed to parse search response")
    }

    /// Get full message details by ID
    fn get_message(&self, id: &MessageId) -> Result<GmailMessage> {
        let access_token = self.auth.access_token()?;

        let url = format!(
            "{}/users/me/messages/{}?format=full",
            Self::BASE_URL,
            id.as_str()
        );

        let mut response = match ureq::get(&url)
            .header("Authorization", &format!("Bearer {}", access_token))
            .call()
        {
            Ok(response) => response,
            Err(ureq::Error::StatusCode(status)) => {
                return Err(FetchError::new("message fetch", status).into());
            }
            Err(e) => {
                return Err(anyhow::Error::new(e).context("Failed to send get message request"));
            }
        };

        response
            .body_mut()
            .read_json()
            .context("Failed to parse message response")
    }

    /// Get one attachment's base64 payload
    fn get_attachment(&self, message_id: &MessageId, attachment_id: &str) -> Result<String> {
        let access_token = self.auth.access_token()?;

        let url = format!(
            "{}/users/me/messages/{}/attachments/{}",
            Self::BASE_URL,
            message_id.as_str(),
            attachment_id
        );

        let mut response = match ureq::get(&url)
            .header("Authorization", &format!("Bearer {}", access_token))
            .call()
        {
            Ok(response) => response,
            Err(ureq::Error::StatusCode(status)) => {
                return Err(FetchError::new("attachment fetch", status).into());
            }
            Err(e) => {
                return Err(anyhow::Error::new(e).context("Failed to send attachment request"));
            }
        };

        let attachment: AttachmentResponse = response
            .body_mut()
            .read_json()
            .context("Failed to parse attachment response")?;

        attachment
            .data
            .context("Attachment response carried no data")
    }
}
