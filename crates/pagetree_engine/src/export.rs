use engine_logging::{engine_debug, engine_warn};

use pagetree_core::{sanitize_filename, ActionError, AttachmentSource, PageAction, PageMetadata};

use crate::links::ATTACHMENT_FOLDER_NAME;
use crate::persist::{write_atomic, AtomicFileWriter};

/// Writes each page's raw storage-format content to disk, plus its attachments.
pub struct ExportAction<'a> {
    attachments: &'a dyn AttachmentSource,
    skip_attachments: bool,
    pages_written: usize,
    attachments_written: usize,
}

impl<'a> ExportAction<'a> {
    pub fn new(attachments: &'a dyn AttachmentSource, skip_attachments: bool) -> Self {
        Self {
            attachments,
            skip_attachments,
            pages_written: 0,
            attachments_written: 0,
        }
    }

    pub fn pages_written(&self) -> usize {
        self.pages_written
    }

    pub fn attachments_written(&self) -> usize {
        self.attachments_written
    }

    fn save_attachments(&mut self, page: &PageMetadata) -> Result<(), ActionError> {
        let writer = AtomicFileWriter::new(page.output_directory.join(ATTACHMENT_FOLDER_NAME));
        for attachment in self.attachments.list_attachments(&page.id)? {
            let name = sanitize_filename(&attachment.title);
            engine_debug!(
                "Saving attachment {} to {}",
                attachment.title,
                page.display_location()
            );
            let mut tmp = writer.temp_file()?;
            match self
                .attachments
                .download_attachment(&attachment, tmp.as_file_mut())
            {
                Ok(_) => {
                    writer.persist(tmp, &name)?;
                    self.attachments_written += 1;
                }
                Err(err) if err.is_not_found() => {
                    engine_warn!("Attachment {} not found (404)! {}", attachment.title, err);
                }
                Err(err) => return Err(err.into()),
            }
        }
        Ok(())
    }
}

impl PageAction for ExportAction<'_> {
    fn on_page(&mut self, page: &PageMetadata) -> Result<(), ActionError> {
        if page.raw_content.trim().is_empty() {
            engine_debug!("Skipping empty page {}", page.display_location());
            return Ok(());
        }
        engine_debug!("Saving to {}", page.display_location());
        write_atomic(&page.absolute_path, &page.raw_content)?;
        self.pages_written += 1;

        if !self.skip_attachments {
            self.save_attachments(page)?;
        }
        Ok(())
    }
}
