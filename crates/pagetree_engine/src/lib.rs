//! Pagetree engine: remote client, file output and storage-format conversion.
mod client;
mod convert;
mod export;
mod index;
mod links;
mod mark;
mod persist;
mod pipeline;
mod rewrite;

pub use client::{ClientSettings, ConfluenceClient, DOWNLOAD_CHUNK_SIZE};
pub use convert::{Converter, Html2MdConverter};
pub use export::ExportAction;
pub use index::OutputFileIndex;
pub use links::{attachment_href, relative_path, LinkResolver, ATTACHMENT_FOLDER_NAME};
pub use mark::{MigrationFlagAction, MIGRATED_TITLE_SUFFIX, TEMPLATE_CONTENT_TOKEN};
pub use persist::{ensure_output_dir, write_atomic, AtomicFileWriter, PersistError};
pub use pipeline::{
    ConversionSummary, ConvertError, MarkdownPipeline, PipelineSettings, DEBUG_EXTENSION,
};
pub use rewrite::{
    normalize_cdata, Construct, ImageSource, LinkLabel, LinkTarget, ProtectedItems, Replacement,
    RewriteOutput, Rewriter, Rule, HIGHLIGHT_STYLE, RULE_ORDER, SKIP_PLACEHOLDER,
};
