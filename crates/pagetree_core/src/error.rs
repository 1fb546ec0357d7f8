use std::io;

use thiserror::Error;

/// Failure talking to the remote document system.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("not found: {url}")]
    NotFound { url: String },
    #[error("http status {status} for {url}")]
    HttpStatus { status: u16, url: String },
    #[error("invalid url: {0}")]
    InvalidUrl(String),
    #[error("network error: {0}")]
    Network(String),
    #[error("unexpected response: {0}")]
    Decode(String),
    #[error("io error while streaming: {0}")]
    Io(#[from] io::Error),
}

impl SourceError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, SourceError::NotFound { .. })
    }
}

/// Failure raised by a per-page action.
#[derive(Debug, Error)]
pub enum ActionError {
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error(transparent)]
    Source(#[from] SourceError),
    #[error("persist error: {0}")]
    Persist(String),
}

/// Failure that aborts a traversal.
#[derive(Debug, Error)]
pub enum WalkError {
    /// The same id showed up twice; ids are not unique or the tree has a cycle.
    #[error("duplicate page id {id} found")]
    DuplicatePage { id: String },
    #[error("space {space} has no home page")]
    NoRootPage { space: String },
    #[error(transparent)]
    Source(#[from] SourceError),
    #[error("action failed for page {page_id}: {source}")]
    Action {
        page_id: String,
        #[source]
        source: ActionError,
    },
}

impl WalkError {
    /// Tree-shape violations, as opposed to remote or local I/O failures.
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            WalkError::DuplicatePage { .. } | WalkError::NoRootPage { .. }
        )
    }
}
