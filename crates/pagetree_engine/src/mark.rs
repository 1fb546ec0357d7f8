use engine_logging::{engine_debug, engine_info};

use pagetree_core::{ActionError, PageAction, PageMetadata, PageUpdater};

use crate::persist::write_atomic;
use crate::pipeline::MarkdownPipeline;

/// Appended to the title of a page once it has been marked as migrated.
pub const MIGRATED_TITLE_SUFFIX: &str = " (migrated)";
/// Replaced by the page's original storage-format body in the annotation template.
pub const TEMPLATE_CONTENT_TOKEN: &str = "{{content}}";

/// Re-converts pages that already have a Markdown export and annotates them at the source.
pub struct MigrationFlagAction<'a> {
    pipeline: &'a MarkdownPipeline,
    updater: &'a dyn PageUpdater,
    template: String,
    marked: usize,
}

impl<'a> MigrationFlagAction<'a> {
    pub fn new(
        pipeline: &'a MarkdownPipeline,
        updater: &'a dyn PageUpdater,
        template: impl Into<String>,
    ) -> Self {
        Self {
            pipeline,
            updater,
            template: template.into(),
            marked: 0,
        }
    }

    pub fn marked(&self) -> usize {
        self.marked
    }

    pub fn annotated_body(&self, raw_content: &str) -> String {
        self.template.replace(TEMPLATE_CONTENT_TOKEN, raw_content)
    }
}

impl PageAction for MigrationFlagAction<'_> {
    fn on_page(&mut self, page: &PageMetadata) -> Result<(), ActionError> {
        let markdown_path = page.absolute_path.with_extension("md");
        if !markdown_path.exists() {
            engine_debug!(
                "No markdown export for {}, not marking it",
                page.display_location()
            );
            return Ok(());
        }

        let markdown = self
            .pipeline
            .convert_html(&page.raw_content, &page.absolute_path);
        write_atomic(&markdown_path, markdown)?;

        let title = format!("{}{}", page.title, MIGRATED_TITLE_SUFFIX);
        let body = self.annotated_body(&page.raw_content);
        self.updater.update_page(&page.id, &title, &body)?;
        self.marked += 1;
        engine_info!("Marked {} as migrated", page.display_location());
        Ok(())
    }
}
