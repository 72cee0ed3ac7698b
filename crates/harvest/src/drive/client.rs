//! Drive API HTTP client
//!
//! Uses synchronous HTTP (ureq) to be executor-agnostic. Uploads use
//! the multipart endpoint with a hand-built `multipart/related` body:
//! one JSON metadata part naming the file and its parent, one binary
//! content part.

use anyhow::{Context, Result};
use std::sync::Arc;

use super::FileStore;
use super::api::{DriveFile, FileList};
use crate::error::FetchError;
use crate::gmail::GoogleAuth;
use crate::models::FolderNode;

/// Mime type Drive uses to mark folders
const FOLDER_MIME_TYPE: &str = "application/vnd.google-apps.folder";

/// Mime types accepted by the analysis path
const SPREADSHEET_MIME_TYPES: &[&str] = &[
    "application/vnd.ms-excel",
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
    "text/csv",
];

/// Boundary for multipart upload bodies
const UPLOAD_BOUNDARY: &str = "sift_upload_boundary";

/// Drive API client for folder and file management
pub struct DriveClient {
    auth: Arc<GoogleAuth>,
}

impl DriveClient {
    /// Drive API base URLs
    const BASE_URL: &'static str = "https://www.googleapis.com/drive/v3";
    const UPLOAD_URL: &'static str =
        "https://www.googleapis.com/upload/drive/v3/files?uploadType=multipart";

    /// Create a new Drive client sharing the given auth state
    pub fn new(auth: Arc<GoogleAuth>) -> Self {
        Self { auth }
    }

    fn bearer(&self) -> Result<String> {
        let access_token = self.auth.access_token()?;
        Ok(format!("Bearer {}", access_token))
    }

    /// Assemble a multipart/related body: JSON metadata + raw content.
    fn multipart_body(metadata: &serde_json::Value, bytes: &[u8]) -> Vec<u8> {
        let mut body = Vec::with_capacity(bytes.len() + 512);
        body.extend_from_slice(format!("--{}\r\n", UPLOAD_BOUNDARY).as_bytes());
        body.extend_from_slice(b"Content-Type: application/json; charset=UTF-8\r\n\r\n");
        body.extend_from_slice(metadata.to_string().as_bytes());
        body.extend_from_slice(format!("\r\n--{}\r\n", UPLOAD_BOUNDARY).as_bytes());
        body.extend_from_slice(b"Content-Type: application/octet-stream\r\n\r\n");
        body.extend_from_slice(bytes);
        body.extend_from_slice(format!("\r\n--{}--\r\n", UPLOAD_BOUNDARY).as_bytes());
        body
    }

    /// List files matching a Drive query expression.
    fn list_files(&self, query: &str, operation: &'static str) -> Result<Vec<DriveFile>> {
        let url = format!(
            "{}/files?q={}&fields=files(id,name,mimeType)",
            Self::BASE_URL,
            urlencoding::encode(query)
        );

        let mut response = match ureq::get(&url).header("Authorization", &self.bearer()?).call() {
            Ok(response) => response,
            Err(ureq::Error::StatusCode(status)) => {
                return Err(FetchError::new(operation, status).into());
            }
            Err(e) => return Err(anyhow::Error::new(e).context("Failed to send list request")),
        };

        let list: FileList = response
            .body_mut()
            .read_json()
            .context("Failed to parse file list response")?;

        Ok(list.files.unwrap_or_default())
    }
}

impl FileStore for DriveClient {
    /// Create a folder, optionally under a parent
    fn create_folder(&self, name: &str, parent_id: Option<&str>) -> Result<FolderNode> {
        let url = format!("{}/files?fields=id,name", Self::BASE_URL);

        let mut metadata = serde_json::json!({
            "name": name,
            "mimeType": FOLDER_MIME_TYPE,
        });
        if let Some(parent) = parent_id {
            metadata["parents"] = serde_json::json!([parent]);
        }

        let mut response = match ureq::post(&url)
            .header("Authorization", &self.bearer()?)
            .send_json(&metadata)
        {
            Ok(response) => response,
            Err(ureq::Error::StatusCode(status)) => {
                return Err(FetchError::new("folder creation", status).into());
            }
            Err(e) => {
                return Err(anyhow::Error::new(e).context("Failed to send create folder request"));
            }
        };

        let created: DriveFile = response
            .body_mut()
            .read_json()
            .context("Failed to parse create folder response")?;

        Ok(FolderNode {
            id: created.id,
            name: created.name,
            parent_id: parent_id.map(str::to_string),
        })
    }

    /// Rename an existing node
    fn rename(&self, id: &str, new_name: &str) -> Result<()> {
        let url = format!("{}/files/{}", Self::BASE_URL, id);

        match ureq::patch(&url)
            .header("Authorization", &self.bearer()?)
            .send_json(serde_json::json!({ "name": new_name }))
        {
            Ok(_) => Ok(()),
            Err(ureq::Error::StatusCode(status)) => {
                Err(FetchError::new("folder rename", status).into())
            }
            Err(e) => Err(anyhow::Error::new(e).context("Failed to send rename request")),
        }
    }

    /// Upload one file's bytes under a parent folder
    fn upload(&self, parent_id: &str, name: &str, bytes: &[u8]) -> Result<()> {
        let metadata = serde_json::json!({
            "name": name,
            "parents": [parent_id],
        });
        let body = Self::multipart_body(&metadata, bytes);

        match ureq::post(Self::UPLOAD_URL)
            .header("Authorization", &self.bearer()?)
            .header(
                "Content-Type",
                &format!("multipart/related; boundary={}", UPLOAD_BOUNDARY),
            )
            .send(&body[..])
        {
            Ok(_) => Ok(()),
            Err(ureq::Error::StatusCode(status)) => {
                Err(FetchError::new("file upload", status).into())
            }
            Err(e) => Err(anyhow::Error::new(e).context("Failed to send upload request")),
        }
    }

    /// List all non-trashed folders
    fn list_folders(&self) -> Result<Vec<FolderNode>> {
        let query = format!("mimeType='{}' and trashed=false", FOLDER_MIME_TYPE);
        let files = self.list_files(&query, "folder listing")?;

        Ok(files
            .into_iter()
            .map(|f| FolderNode {
                id: f.id,
                name: f.name,
                parent_id: None,
            })
            .collect())
    }

    /// Move a folder from the root under a new destination
    fn move_folder(&self, id: &str, destination_id: &str) -> Result<()> {
        let url = format!(
            "{}/files/{}?addParents={}&removeParents=root",
            Self::BASE_URL,
            id,
            destination_id
        );

        match ureq::patch(&url)
            .header("Authorization", &self.bearer()?)
            .send_empty()
        {
            Ok(_) => Ok(()),
            Err(ureq::Error::StatusCode(status)) => {
                Err(FetchError::new("folder move", status).into())
            }
            Err(e) => Err(anyhow::Error::new(e).context("Failed to send move request")),
        }
    }

    /// Download a file's raw content
    fn download(&self, id: &str) -> Result<Vec<u8>> {
        let url = format!("{}/files/{}?alt=media", Self::BASE_URL, id);

        let mut response = match ureq::get(&url).header("Authorization", &self.bearer()?).call() {
            Ok(response) => response,
            Err(ureq::Error::StatusCode(status)) => {
                return Err(FetchError::new("file download", status).into());
            }
            Err(e) => return Err(anyhow::Error::new(e).context("Failed to send download request")),
        };

        response
            .body_mut()
            .read_to_vec()
            .context("Failed to read file content")
    }

    /// List spreadsheet files directly inside a folder
    fn list_spreadsheets(&self, folder_id: &str) -> Result<Vec<DriveFile>> {
        let mime_filter = SPREADSHEET_MIME_TYPES
            .iter()
            .map(|m| format!("mimeType='{}'", m))
            .collect::<Vec<_>>()
            .join(" or ");
        let query = format!("'{}' in parents and ({})", folder_id, mime_filter);

        self.list_files(&query, "spreadsheet listing")
    }
}
