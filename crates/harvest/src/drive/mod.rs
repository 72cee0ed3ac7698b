//! Google Drive API integration
//!
//! This module provides:
//! - Drive API client for folder and file management
//! - The [`FileStore`] trait the organizer runs against

mod client;

pub use client::DriveClient;

use anyhow::Result;

use crate::models::FolderNode;

/// Write access to the remote file store.
///
/// Implemented by [`DriveClient`]; tests substitute an in-memory fake.
pub trait FileStore: Send + Sync {
    /// Create a folder, optionally under a parent, returning its node.
    fn create_folder(&self, name: &str, parent_id: Option<&str>) -> Result<FolderNode>;

    /// Rename an existing node.
    fn rename(&self, id: &str, new_name: &str) -> Result<()>;

    /// Upload a file's bytes under the given parent folder.
    fn upload(&self, parent_id: &str, name: &str, bytes: &[u8]) -> Result<()>;

    /// List all non-trashed folders visible to the credential.
    fn list_folders(&self) -> Result<Vec<FolderNode>>;

    /// Re-parent a folder under a new destination.
    fn move_folder(&self, id: &str, destination_id: &str) -> Result<()>;

    /// Download a file's raw content.
    fn download(&self, id: &str) -> Result<Vec<u8>>;

    /// List spreadsheet files directly inside a folder.
    fn list_spreadsheets(&self, folder_id: &str) -> Result<Vec<api::DriveFile>>;
}

/// Drive API response types
pub mod api {
    use serde::Deserialize;

    /// One file or folder entry
    #[derive(Debug, Clone, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct DriveFile {
        pub id: String,
        pub name: String,
        pub mime_type: Option<String>,
    }

    /// Response from the file list endpoint
    #[derive(Debug, Default, Deserialize)]
    pub struct FileList {
        pub files: Option<Vec<DriveFile>>,
    }
}
