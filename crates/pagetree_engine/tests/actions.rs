use std::cell::RefCell;
use std::fs;
use std::io::Write;
use std::path::Path;

use pagetree_core::{
    ActionError, Attachment, AttachmentSource, Page, PageAction, PageMetadata, PageUpdater,
    SourceError,
};
use pagetree_engine::{
    ExportAction, MarkdownPipeline, MigrationFlagAction, PipelineSettings, MIGRATED_TITLE_SUFFIX,
    TEMPLATE_CONTENT_TOKEN,
};
use pretty_assertions::assert_eq;
use tempfile::TempDir;

#[derive(Default)]
struct FakeAttachments {
    files: Vec<(String, Result<Vec<u8>, u16>)>,
    listed: RefCell<Vec<String>>,
}

impl AttachmentSource for FakeAttachments {
    fn list_attachments(&self, page_id: &str) -> Result<Vec<Attachment>, SourceError> {
        self.listed.borrow_mut().push(page_id.to_string());
        Ok(self
            .files
            .iter()
            .map(|(title, _)| Attachment {
                title: title.clone(),
                download_path: format!("/download/{title}"),
            })
            .collect())
    }

    fn download_attachment(
        &self,
        attachment: &Attachment,
        sink: &mut dyn Write,
    ) -> Result<u64, SourceError> {
        let (_, content) = self
            .files
            .iter()
            .find(|(title, _)| *title == attachment.title)
            .expect("listed attachment");
        match content {
            Ok(bytes) => {
                sink.write_all(bytes)?;
                Ok(bytes.len() as u64)
            }
            Err(404) => Err(SourceError::NotFound {
                url: attachment.download_path.clone(),
            }),
            Err(status) => Err(SourceError::HttpStatus {
                status: *status,
                url: attachment.download_path.clone(),
            }),
        }
    }
}

#[derive(Default)]
struct RecordingUpdater {
    updates: RefCell<Vec<(String, String, String)>>,
}

impl PageUpdater for RecordingUpdater {
    fn update_page(&self, id: &str, title: &str, body: &str) -> Result<(), SourceError> {
        self.updates
            .borrow_mut()
            .push((id.to_string(), title.to_string(), body.to_string()));
        Ok(())
    }
}

fn page(out: &Path, title: &str, body: &str) -> PageMetadata {
    PageMetadata::build(
        Page {
            id: "11".to_string(),
            title: title.to_string(),
            body: body.to_string(),
        },
        Vec::new(),
        &["DOC".to_string()],
        out,
        ".html",
    )
}

#[test]
fn export_writes_raw_content_and_sanitized_attachments() {
    let temp = TempDir::new().unwrap();
    let source = FakeAttachments {
        files: vec![
            ("a:b.png".to_string(), Ok(b"one".to_vec())),
            ("missing.pdf".to_string(), Err(404)),
            ("c.txt".to_string(), Ok(b"three".to_vec())),
        ],
        ..FakeAttachments::default()
    };
    let meta = page(temp.path(), "Home", "<p>raw <b>content</b></p>");
    let mut action = ExportAction::new(&source, false);
    action.on_page(&meta).unwrap();

    let dir = temp.path().join("DOC");
    assert_eq!(
        fs::read_to_string(dir.join("Home.html")).unwrap(),
        "<p>raw <b>content</b></p>"
    );
    assert_eq!(fs::read(dir.join("attachments/a_b.png")).unwrap(), b"one");
    assert!(!dir.join("attachments/missing.pdf").exists());
    assert_eq!(fs::read(dir.join("attachments/c.txt")).unwrap(), b"three");
    assert_eq!(action.pages_written(), 1);
    assert_eq!(action.attachments_written(), 2);
}

#[test]
fn export_skips_blank_pages_entirely() {
    let temp = TempDir::new().unwrap();
    let source = FakeAttachments::default();
    let meta = page(temp.path(), "Blank", "  \n\t ");
    let mut action = ExportAction::new(&source, false);
    action.on_page(&meta).unwrap();

    assert!(!temp.path().join("DOC").exists());
    assert!(source.listed.borrow().is_empty());
    assert_eq!(action.pages_written(), 0);
}

#[test]
fn export_can_skip_attachments() {
    let temp = TempDir::new().unwrap();
    let source = FakeAttachments {
        files: vec![("x.png".to_string(), Ok(b"x".to_vec()))],
        ..FakeAttachments::default()
    };
    let meta = page(temp.path(), "Home", "<p>x</p>");
    let mut action = ExportAction::new(&source, true);
    action.on_page(&meta).unwrap();

    assert!(temp.path().join("DOC/Home.html").exists());
    assert!(!temp.path().join("DOC/attachments").exists());
    assert!(source.listed.borrow().is_empty());
}

#[test]
fn export_propagates_non_404_download_errors() {
    let temp = TempDir::new().unwrap();
    let source = FakeAttachments {
        files: vec![
            ("broken.png".to_string(), Err(403)),
            ("later.png".to_string(), Ok(b"l".to_vec())),
        ],
        ..FakeAttachments::default()
    };
    let meta = page(temp.path(), "Home", "<p>x</p>");
    let mut action = ExportAction::new(&source, false);
    let err = action.on_page(&meta).unwrap_err();

    assert!(matches!(
        err,
        ActionError::Source(SourceError::HttpStatus { status: 403, .. })
    ));
    assert!(!temp.path().join("DOC/attachments/later.png").exists());
}

#[test]
fn migration_flag_reconverts_and_annotates_exported_pages() {
    let temp = TempDir::new().unwrap();
    let meta = page(temp.path(), "Home", "<p>fresh body</p>");
    let md_path = temp.path().join("DOC/Home.md");
    fs::create_dir_all(md_path.parent().unwrap()).unwrap();
    fs::write(&md_path, "stale").unwrap();

    let pipeline = MarkdownPipeline::new(temp.path(), PipelineSettings::default()).unwrap();
    let updater = RecordingUpdater::default();
    let template = format!("<p>Moved to git.</p>{TEMPLATE_CONTENT_TOKEN}");
    let mut action = MigrationFlagAction::new(&pipeline, &updater, template);
    action.on_page(&meta).unwrap();

    let markdown = fs::read_to_string(&md_path).unwrap();
    assert!(markdown.contains("fresh body"), "{markdown}");
    assert!(!markdown.contains("stale"));
    assert_eq!(
        updater.updates.borrow().clone(),
        vec![(
            "11".to_string(),
            format!("Home{MIGRATED_TITLE_SUFFIX}"),
            "<p>Moved to git.</p><p>fresh body</p>".to_string()
        )]
    );
    assert_eq!(action.marked(), 1);
}

#[test]
fn migration_flag_ignores_pages_without_markdown() {
    let temp = TempDir::new().unwrap();
    let meta = page(temp.path(), "Never exported", "<p>x</p>");
    let pipeline = MarkdownPipeline::new(temp.path(), PipelineSettings::default()).unwrap();
    let updater = RecordingUpdater::default();
    let mut action = MigrationFlagAction::new(&pipeline, &updater, TEMPLATE_CONTENT_TOKEN);
    action.on_page(&meta).unwrap();

    assert!(updater.updates.borrow().is_empty());
    assert!(!temp.path().join("DOC/Never exported.md").exists());
    assert_eq!(action.marked(), 0);
}
