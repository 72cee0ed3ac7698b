//! Domain models for the harvest pipeline

mod criterion;
mod email;
mod folder;
mod progress;

pub use criterion::{CriterionKind, SearchCriterion};
pub use email::{AttachmentDescriptor, EmailDetail, MessageId};
pub use folder::FolderNode;
pub use progress::Progress;
