use std::collections::HashSet;
use std::path::{Path, PathBuf};

use engine_logging::{engine_debug, engine_error, engine_info, engine_warn};

use crate::error::{ActionError, WalkError};
use crate::metadata::PageMetadata;
use crate::sanitize::IgnorePatterns;
use crate::source::{DocumentSource, Space};

/// Per-page behaviour plugged into a [`WalkSession`].
pub trait PageAction {
    fn on_page(&mut self, page: &PageMetadata) -> Result<(), ActionError>;
}

impl<F> PageAction for F
where
    F: FnMut(&PageMetadata) -> Result<(), ActionError>,
{
    fn on_page(&mut self, page: &PageMetadata) -> Result<(), ActionError> {
        self(page)
    }
}

#[derive(Debug, Clone)]
pub struct WalkSettings {
    /// Only walk this space key; `None` walks every space.
    pub space: Option<String>,
    pub ignore_titles: IgnorePatterns,
    /// Offset of the first space listing request.
    pub start_offset: usize,
    pub page_size: usize,
    /// Extension of the files the pages are written to, including the dot.
    pub extension: String,
}

impl Default for WalkSettings {
    fn default() -> Self {
        Self {
            space: None,
            ignore_titles: IgnorePatterns::default(),
            start_offset: 0,
            page_size: 50,
            extension: ".html".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WalkSummary {
    pub spaces_processed: usize,
    pub pages_visited: usize,
    pub pages_ignored: usize,
    /// Keys of spaces skipped because they have no home page.
    pub spaces_without_root: Vec<String>,
}

/// One traversal of the remote tree.
///
/// Owns the visited-id set for its lifetime; a fresh session starts with nothing visited.
pub struct WalkSession<'s, S: DocumentSource + ?Sized> {
    source: &'s S,
    out_dir: PathBuf,
    settings: WalkSettings,
    seen: HashSet<String>,
    summary: WalkSummary,
}

impl<'s, S: DocumentSource + ?Sized> WalkSession<'s, S> {
    pub fn new(source: &'s S, out_dir: impl Into<PathBuf>, settings: WalkSettings) -> Self {
        Self {
            source,
            out_dir: out_dir.into(),
            settings,
            seen: HashSet::new(),
            summary: WalkSummary::default(),
        }
    }

    pub fn out_dir(&self) -> &Path {
        &self.out_dir
    }

    pub fn summary(&self) -> &WalkSummary {
        &self.summary
    }

    pub fn into_summary(self) -> WalkSummary {
        self.summary
    }

    /// Walk every space of the instance, or only the configured one.
    pub fn walk_instance(&mut self, action: &mut dyn PageAction) -> Result<(), WalkError> {
        let limit = self.settings.page_size.max(1);
        let mut start = self.settings.start_offset;
        let wanted = self.settings.space.clone();

        loop {
            engine_debug!("Listing spaces start={} limit={}", start, limit);
            let listing = self.source.list_spaces(start, limit)?;
            if listing.size == 0 || listing.spaces.is_empty() {
                break;
            }
            for space in &listing.spaces {
                match wanted.as_deref() {
                    Some(key) if space.key == key => return self.walk_space(space, action),
                    Some(_) => {}
                    None => match self.walk_space(space, action) {
                        Err(WalkError::NoRootPage { space }) => {
                            self.summary.spaces_without_root.push(space);
                        }
                        other => other?,
                    },
                }
            }
            start += limit;
        }

        if let Some(key) = wanted {
            engine_warn!("Space {} was not found on the instance", key);
        }
        Ok(())
    }

    /// Walk one space from its home page; the space key becomes the top directory.
    pub fn walk_space(
        &mut self,
        space: &Space,
        action: &mut dyn PageAction,
    ) -> Result<(), WalkError> {
        engine_info!("Processing space {}", space.key);
        let Some(homepage_id) = space.homepage_id.as_deref() else {
            engine_error!(
                "Skipping space {}: no home page found, a root page is required",
                space.key
            );
            return Err(WalkError::NoRootPage {
                space: space.key.clone(),
            });
        };
        self.summary.spaces_processed += 1;
        self.walk(homepage_id, &[space.key.clone()], action)
    }

    /// Depth-first walk from `root_id`, visiting children in server order.
    pub fn walk(
        &mut self,
        root_id: &str,
        ancestors: &[String],
        action: &mut dyn PageAction,
    ) -> Result<(), WalkError> {
        if self.seen.contains(root_id) {
            return Err(WalkError::DuplicatePage {
                id: root_id.to_string(),
            });
        }
        let page = self.source.fetch_page(root_id)?;
        self.seen.insert(root_id.to_string());

        if self.settings.ignore_titles.matches(&page.title) {
            engine_info!("Ignoring page {:?} and its subtree", page.title);
            self.summary.pages_ignored += 1;
            return Ok(());
        }

        let child_ids = match self.source.child_ids(root_id) {
            Ok(ids) => ids,
            Err(err) => {
                engine_error!("Error getting child ids for page {}: {}", root_id, err);
                Vec::new()
            }
        };

        let meta = PageMetadata::build(
            page,
            child_ids,
            ancestors,
            &self.out_dir,
            &self.settings.extension,
        );
        engine_debug!("Visiting {} ({})", meta.display_location(), meta.id);
        action.on_page(&meta).map_err(|source| WalkError::Action {
            page_id: meta.id.clone(),
            source,
        })?;
        self.summary.pages_visited += 1;

        for child_id in &meta.child_ids {
            self.walk(child_id, meta.child_ancestor_path(), action)?;
        }
        Ok(())
    }
}
