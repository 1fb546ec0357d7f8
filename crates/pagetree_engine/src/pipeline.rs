use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use engine_logging::{engine_debug, engine_info};
use thiserror::Error;

use crate::convert::{Converter, Html2MdConverter};
use crate::index::OutputFileIndex;
use crate::links::LinkResolver;
use crate::persist::{write_atomic, PersistError};
use crate::rewrite::Rewriter;

/// Extension of the rewritten-HTML debug artifact written next to a document.
pub const DEBUG_EXTENSION: &str = "adjusted.htm";

#[derive(Debug, Error)]
pub enum ConvertError {
    #[error("io error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("persist error: {0}")]
    Persist(#[from] PersistError),
    #[error("failed to scan output directory: {0}")]
    Scan(#[from] walkdir::Error),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PipelineSettings {
    /// Write `<name>.adjusted.htm` with the rewritten HTML beside each document.
    pub write_debug_html: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConversionSummary {
    pub converted: Vec<PathBuf>,
}

/// Storage format to Markdown over one output tree.
///
/// The file index used for link resolution is taken when the pipeline is built;
/// pages written afterwards are only seen by a new pipeline.
pub struct MarkdownPipeline {
    index: OutputFileIndex,
    converter: Box<dyn Converter>,
    settings: PipelineSettings,
}

impl MarkdownPipeline {
    pub fn new(root: &Path, settings: PipelineSettings) -> Result<Self, ConvertError> {
        let index = OutputFileIndex::scan(root)?;
        engine_debug!("Indexed {} files under {}", index.len(), root.display());
        Ok(Self::with_index(index, Box::new(Html2MdConverter), settings))
    }

    pub fn with_index(
        index: OutputFileIndex,
        converter: Box<dyn Converter>,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            index,
            converter,
            settings,
        }
    }

    pub fn index(&self) -> &OutputFileIndex {
        &self.index
    }

    /// Convert the storage-format `raw` content of the page stored at `document`.
    pub fn convert_html(&self, raw: &str, document: &Path) -> String {
        let resolver = LinkResolver::new(&self.index);
        let rewritten = Rewriter::new(Some(resolver), document).rewrite(raw);

        if self.settings.write_debug_html {
            let debug_path = document.with_extension(DEBUG_EXTENSION);
            if let Err(err) = fs::write(&debug_path, &rewritten.html) {
                engine_debug!(
                    "Could not write debug file {}: {}",
                    debug_path.display(),
                    err
                );
            }
        }

        let markdown = self.converter.to_markdown(&rewritten.html);
        rewritten.protected.restore(&markdown)
    }

    /// Convert one exported `.html` file into its sibling `.md` file.
    pub fn convert_file(&self, path: &Path) -> Result<PathBuf, ConvertError> {
        engine_info!("Converting {}", path.display());
        let raw = fs::read_to_string(path).map_err(|source| ConvertError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let markdown = self.convert_html(&raw, path);
        Ok(write_atomic(&path.with_extension("md"), markdown)?)
    }

    /// Convert every `.html` file of the index.
    pub fn convert_all(&self) -> Result<ConversionSummary, ConvertError> {
        let mut summary = ConversionSummary::default();
        for path in self.index.html_files() {
            summary.converted.push(self.convert_file(path)?);
        }
        engine_info!("Converted {} files", summary.converted.len());
        Ok(summary)
    }
}
