//! Pagetree core: naming, page metadata and the remote tree walk.
mod error;
mod metadata;
mod sanitize;
mod source;
mod walk;

pub use error::{ActionError, SourceError, WalkError};
pub use metadata::{PageMetadata, INDEX_NAME};
pub use sanitize::{sanitize_filename, IgnorePatterns};
pub use source::{
    Attachment, AttachmentSource, DocumentSource, Page, PageUpdater, Space, SpaceListing,
};
pub use walk::{PageAction, WalkSession, WalkSettings, WalkSummary};
