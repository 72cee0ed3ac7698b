//! Error types shared across the pipeline
//!
//! Two failures are worth a dedicated type: a rejected search input
//! (surfaced to the user before any network call) and a non-success
//! HTTP response from a collaborator. Per-item failures inside a batch
//! are not errors at this level; they are logged and counted where they
//! occur.

use thiserror::Error;

/// A search input that matched none of the accepted forms.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid search input {input:?}: expected an email address, a domain, or a company name")]
pub struct ValidationError {
    pub input: String,
}

impl ValidationError {
    pub fn new(input: impl Into<String>) -> Self {
        Self {
            input: input.into(),
        }
    }
}

/// A non-success HTTP status from Gmail, Drive, or the analysis service.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{operation} failed with HTTP status {status}")]
pub struct FetchError {
    /// Which remote operation was being issued.
    pub operation: &'static str,
    pub status: u16,
}

impl FetchError {
    pub fn new(operation: &'static str, status: u16) -> Self {
        Self { operation, status }
    }
}
