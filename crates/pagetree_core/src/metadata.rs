use std::path::{Path, PathBuf};

use crate::sanitize::sanitize_filename;
use crate::source::Page;

/// Base name given to any page that has children, so the children can live
/// in a directory named after it.
pub const INDEX_NAME: &str = "index";

/// Everything the page actions need to know about one visited page.
///
/// Built once per visit, right before the action runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageMetadata {
    pub title: String,
    pub id: String,
    pub child_ids: Vec<String>,
    pub raw_content: String,
    pub base_name: String,
    pub sanitized_ancestor_path: Vec<String>,
    pub relative_location: Vec<String>,
    pub absolute_path: PathBuf,
    pub output_directory: PathBuf,
}

impl PageMetadata {
    pub fn build(
        page: Page,
        child_ids: Vec<String>,
        ancestors: &[String],
        out_dir: &Path,
        extension: &str,
    ) -> Self {
        let base_name = if child_ids.is_empty() {
            sanitize_filename(&page.title)
        } else {
            INDEX_NAME.to_string()
        };
        let mut sanitized_ancestor_path: Vec<String> =
            ancestors.iter().map(|a| sanitize_filename(a)).collect();
        // Children are written next to the index file, inside a directory named after us.
        if !child_ids.is_empty() {
            sanitized_ancestor_path.push(sanitize_filename(&page.title));
        }

        let mut relative_location = sanitized_ancestor_path.clone();
        relative_location.push(format!("{base_name}{extension}"));

        let absolute_path = relative_location
            .iter()
            .fold(out_dir.to_path_buf(), |path, segment| path.join(segment));
        let output_directory = absolute_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| out_dir.to_path_buf());

        Self {
            title: page.title,
            id: page.id,
            child_ids,
            raw_content: page.body,
            base_name,
            sanitized_ancestor_path,
            relative_location,
            absolute_path,
            output_directory,
        }
    }

    pub fn has_children(&self) -> bool {
        !self.child_ids.is_empty()
    }

    /// Ancestor path handed to this page's children.
    ///
    /// For a page with children `sanitized_ancestor_path` already ends with its own title.
    pub fn child_ancestor_path(&self) -> &[String] {
        &self.sanitized_ancestor_path
    }

    /// `relative_location` joined with `/`, for log lines.
    pub fn display_location(&self) -> String {
        self.relative_location.join("/")
    }
}
