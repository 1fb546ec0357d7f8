use std::fs;
use std::path::Path;

use pagetree_engine::{
    Converter, MarkdownPipeline, OutputFileIndex, PipelineSettings, DEBUG_EXTENSION,
    HIGHLIGHT_STYLE, SKIP_PLACEHOLDER,
};
use tempfile::TempDir;

fn write(root: &Path, rel: &str, content: &str) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

/// Echoes the rewritten HTML, so restoration can be checked independently of html2md.
struct EchoConverter;

impl Converter for EchoConverter {
    fn to_markdown(&self, html: &str) -> String {
        html.to_string()
    }
}

#[test]
fn convert_all_writes_markdown_siblings_and_resolves_links() {
    engine_logging::initialize_for_tests();
    let temp = TempDir::new().unwrap();
    let root = temp.path();
    write(
        root,
        "DOC/Guide/index.html",
        concat!(
            "<h1>Guide</h1>",
            r#"<p>See <ac:link><ri:page ri:content-title="Setup" /><ac:plain-text-link-body><![CDATA[Installation]]></ac:plain-text-link-body></ac:link>.</p>"#,
            r#"<p><ac:image><ri:attachment ri:filename="diagram.png" /></ac:image></p>"#
        ),
    );
    write(root, "DOC/Guide/Setup.html", "<p>Setup steps</p>");

    let pipeline = MarkdownPipeline::new(root, PipelineSettings::default()).unwrap();
    assert_eq!(pipeline.index().len(), 2);
    let summary = pipeline.convert_all().unwrap();
    assert_eq!(summary.converted.len(), 2);

    let index_md = fs::read_to_string(root.join("DOC/Guide/index.md")).unwrap();
    assert!(index_md.contains("Guide"), "{index_md}");
    assert!(index_md.contains("Setup.md"), "{index_md}");
    assert!(index_md.contains("Installation"), "{index_md}");
    assert!(index_md.contains("attachments/diagram.png"), "{index_md}");
    assert!(!index_md.contains("ac:link"), "{index_md}");

    let setup_md = fs::read_to_string(root.join("DOC/Guide/Setup.md")).unwrap();
    assert!(setup_md.contains("Setup steps"));
    assert!(!root.join("DOC/Guide/index.adjusted.htm").exists());
}

#[test]
fn index_is_fixed_at_construction() {
    let temp = TempDir::new().unwrap();
    let root = temp.path();
    write(root, "A.html", "<p>a</p>");
    let pipeline = MarkdownPipeline::new(root, PipelineSettings::default()).unwrap();
    write(root, "B.html", "<p>b</p>");

    let summary = pipeline.convert_all().unwrap();
    assert_eq!(summary.converted, vec![root.join("A.md")]);
    assert!(!root.join("B.md").exists());

    let fresh = MarkdownPipeline::new(root, PipelineSettings::default()).unwrap();
    assert_eq!(fresh.index().html_files().count(), 2);
    assert_eq!(fresh.index().len(), 3);
}

#[test]
fn protected_fragments_survive_conversion() {
    let temp = TempDir::new().unwrap();
    let root = temp.path();
    write(
        root,
        "Colors.html",
        r#"<p>One <span style="color: red">hot</span> and <span style="color: blue">cold</span>.</p>"#,
    );
    let pipeline = MarkdownPipeline::new(root, PipelineSettings::default()).unwrap();
    let md_path = pipeline.convert_file(&root.join("Colors.html")).unwrap();
    let markdown = fs::read_to_string(md_path).unwrap();

    let hot = markdown.find(">hot</span>").expect("hot fragment restored");
    let cold = markdown.find(">cold</span>").expect("cold fragment restored");
    assert!(hot < cold);
    assert!(!markdown.contains(SKIP_PLACEHOLDER));
}

#[test]
fn table_lists_are_restored_as_literal_html() {
    let temp = TempDir::new().unwrap();
    let root = temp.path();
    let pipeline = MarkdownPipeline::with_index(
        OutputFileIndex::default(),
        Box::new(EchoConverter),
        PipelineSettings::default(),
    );
    let raw = concat!(
        "<table><tbody><tr>",
        "<td><ul><li>x</li></ul></td><td><ul><li>x</li></ul></td>",
        "</tr></tbody></table>"
    );
    let output = pipeline.convert_html(raw, &root.join("T.html"));
    assert_eq!(output.matches("<ul><li>x</li></ul>").count(), 2);
    assert!(!output.contains(SKIP_PLACEHOLDER));
}

#[test]
fn placeholder_text_in_the_page_is_left_where_it_was() {
    let temp = TempDir::new().unwrap();
    let pipeline = MarkdownPipeline::with_index(
        OutputFileIndex::default(),
        Box::new(EchoConverter),
        PipelineSettings::default(),
    );
    let raw = format!(
        r#"<p>{SKIP_PLACEHOLDER}</p><p><span style="color: red">hot</span></p>"#
    );
    let output = pipeline.convert_html(&raw, &temp.path().join("P.html"));
    assert_eq!(
        output,
        format!(
            r#"<p>{SKIP_PLACEHOLDER}</p><p><span style="{HIGHLIGHT_STYLE}">hot</span></p>"#
        )
    );
}

#[test]
fn debug_artifact_is_written_when_enabled() {
    let temp = TempDir::new().unwrap();
    let root = temp.path();
    write(
        root,
        "Pics.html",
        r#"<ac:image><ri:attachment ri:filename="a.png" /></ac:image>"#,
    );
    let settings = PipelineSettings {
        write_debug_html: true,
    };
    let pipeline = MarkdownPipeline::new(root, settings).unwrap();
    pipeline.convert_all().unwrap();

    let debug = fs::read_to_string(root.join(format!("Pics.{DEBUG_EXTENSION}"))).unwrap();
    assert!(debug.contains(r#"src="attachments/a.png""#), "{debug}");
}

#[test]
fn debug_artifact_failure_is_swallowed() {
    let temp = TempDir::new().unwrap();
    let pipeline = MarkdownPipeline::with_index(
        OutputFileIndex::default(),
        Box::new(EchoConverter),
        PipelineSettings {
            write_debug_html: true,
        },
    );
    let missing_dir_doc = temp.path().join("missing").join("Doc.html");
    let output = pipeline.convert_html("<p>ok</p>", &missing_dir_doc);
    assert_eq!(output, "<p>ok</p>");
}

#[test]
fn missing_root_gives_empty_index() {
    let temp = TempDir::new().unwrap();
    let pipeline =
        MarkdownPipeline::new(&temp.path().join("nothing"), PipelineSettings::default()).unwrap();
    assert!(pipeline.index().is_empty());
    assert!(pipeline.convert_all().unwrap().converted.is_empty());
}
