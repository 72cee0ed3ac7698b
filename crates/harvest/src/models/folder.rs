//! Remote folder model

/// A folder created in the remote file store.
///
/// Identities are owned by one organize run; nothing persists them
/// across runs, so a rerun cannot detect or reuse prior folders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FolderNode {
    pub id: String,
    pub name: String,
    pub parent_id: Option<String>,
}
