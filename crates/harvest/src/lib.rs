//! Harvest crate - Gmail attachment harvesting and Drive organization
//!
//! This crate provides platform-independent logic for locating messages
//! with attachments, extracting every nested attachment from their MIME
//! part trees, categorizing attachments by filename, and reorganizing
//! them into a folder hierarchy in Google Drive:
//! - Domain models (SearchCriterion, EmailDetail, AttachmentDescriptor)
//! - Gmail and Drive API clients behind store traits
//! - OAuth authentication shared by both clients
//! - Filename categorization and date inference
//! - The organize pipeline with incremental progress reporting
//! - The spreadsheet analysis path (OpenAI-backed, black box)
//!
//! This crate has zero UI dependencies; the sift CLI is one consumer.

pub mod analyze;
pub mod categorize;
pub mod credentials;
pub mod drive;
pub mod error;
pub mod gmail;
pub mod models;
pub mod organize;
pub mod search;

pub use analyze::{AnalysisClient, MetricTable, extract_metrics, render_context};
pub use categorize::{CategoryPath, NO_DATE, categorize};
pub use credentials::GoogleCredentials;
pub use drive::{DriveClient, FileStore};
pub use error::{FetchError, ValidationError};
pub use gmail::{GmailClient, GoogleAuth, MailSource, detail_from_message, extract_detail};
pub use models::{
    AttachmentDescriptor, CriterionKind, EmailDetail, FolderNode, MessageId, Progress,
    SearchCriterion,
};
pub use organize::{OrganizeMode, OrganizeStats, organize};
pub use search::{HarvestOutcome, search_emails, search_message_ids};
