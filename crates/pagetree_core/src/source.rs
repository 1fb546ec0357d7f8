//! Boundary of the remote document system.
//!
//! The walker and the page actions only talk to these traits; the REST client
//! in `pagetree_engine` implements them, and tests substitute in-memory fakes.
use std::io::Write;

use crate::SourceError;

/// One document as fetched from the remote system, body in storage format.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    pub id: String,
    pub title: String,
    pub body: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Space {
    pub key: String,
    pub homepage_id: Option<String>,
}

/// One page of a space listing. `size` is the number of results the server reported.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SpaceListing {
    pub spaces: Vec<Space>,
    pub size: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    pub title: String,
    /// Download path relative to the instance base URL, as reported by the server.
    pub download_path: String,
}

pub trait DocumentSource {
    fn fetch_page(&self, id: &str) -> Result<Page, SourceError>;

    /// Ordered ids of the direct children of `id`.
    fn child_ids(&self, id: &str) -> Result<Vec<String>, SourceError>;

    fn list_spaces(&self, start: usize, limit: usize) -> Result<SpaceListing, SourceError>;
}

pub trait AttachmentSource {
    fn list_attachments(&self, page_id: &str) -> Result<Vec<Attachment>, SourceError>;

    /// Stream the attachment body into `sink`, returning the number of bytes written.
    ///
    /// A missing attachment is reported as [`SourceError::NotFound`] before anything
    /// is written.
    fn download_attachment(
        &self,
        attachment: &Attachment,
        sink: &mut dyn Write,
    ) -> Result<u64, SourceError>;
}

pub trait PageUpdater {
    fn update_page(&self, id: &str, title: &str, body: &str) -> Result<(), SourceError>;
}
