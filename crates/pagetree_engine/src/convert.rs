//! Last step of the pipeline: generic HTML to Markdown.

/// Turns already rewritten HTML into Markdown.
pub trait Converter: Send + Sync {
    fn to_markdown(&self, html: &str) -> String;
}

/// Converter backed by `html2md`.
///
/// Out of the box `html2md` renders an `<img>` where it stands, so images inside
/// tables, paragraphs and the `<div>` wrappers made by the rewriter stay inline.
/// There is nothing to configure for that.
#[derive(Debug, Default, Clone, Copy)]
pub struct Html2MdConverter;

impl Converter for Html2MdConverter {
    fn to_markdown(&self, html: &str) -> String {
        html2md::parse_html(html)
    }
}

