use std::path::{Component, Path};

use engine_logging::{engine_debug, engine_warn};

use crate::index::OutputFileIndex;

pub const ATTACHMENT_FOLDER_NAME: &str = "attachments";

/// Resolves cross-page links against the files of one output tree.
#[derive(Debug, Clone, Copy)]
pub struct LinkResolver<'a> {
    index: &'a OutputFileIndex,
}

impl<'a> LinkResolver<'a> {
    pub fn new(index: &'a OutputFileIndex) -> Self {
        Self { index }
    }

    /// Relative Markdown href from `document` to the page titled `title`.
    ///
    /// `None` when no file in the index carries that title; the caller keeps the
    /// original link markup in that case.
    pub fn resolve_page(&self, title: &str, document: &Path) -> Option<String> {
        let matches = self.index.find_page(title);
        if matches.len() > 2 {
            engine_warn!(
                "Link to {:?} is ambiguous, {} candidate files; using {}",
                title,
                matches.len(),
                matches[0].display()
            );
        }
        let Some(target) = matches.first() else {
            engine_debug!("No file found for link to page {:?}", title);
            return None;
        };
        let from_dir = document.parent().unwrap_or_else(|| Path::new(""));
        let relative = relative_path(target, from_dir);
        let relative = match relative.strip_suffix(".html") {
            Some(stem) => format!("{stem}.md"),
            None => relative,
        };
        Some(encode_spaces(&relative))
    }
}

/// Href of an attachment stored beside the converted document.
pub fn attachment_href(filename: &str) -> String {
    format!("{ATTACHMENT_FOLDER_NAME}/{}", encode_spaces(filename))
}

pub fn encode_spaces(href: &str) -> String {
    href.replace(' ', "%20")
}

/// `target` relative to the directory `from_dir`, joined with forward slashes.
pub fn relative_path(target: &Path, from_dir: &Path) -> String {
    let target: Vec<Component> = target.components().collect();
    let base: Vec<Component> = from_dir
        .components()
        .filter(|c| !matches!(c, Component::CurDir))
        .collect();
    let common = target
        .iter()
        .zip(base.iter())
        .take_while(|(a, b)| a == b)
        .count();

    let mut parts: Vec<String> = std::iter::repeat("..".to_string())
        .take(base.len() - common)
        .collect();
    parts.extend(
        target[common..]
            .iter()
            .map(|c| c.as_os_str().to_string_lossy().into_owned()),
    );
    parts.join("/")
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::{attachment_href, relative_path, LinkResolver};
    use crate::index::OutputFileIndex;

    #[test]
    fn relative_path_walks_up_and_down() {
        assert_eq!(
            relative_path(Path::new("/out/A/b.md"), Path::new("/out/C/D")),
            "../../A/b.md"
        );
        assert_eq!(
            relative_path(Path::new("/out/A/b.md"), Path::new("/out/A")),
            "b.md"
        );
        assert_eq!(
            relative_path(Path::new("/out/A/B/c.md"), Path::new("/out/A")),
            "B/c.md"
        );
    }

    #[test]
    fn attachment_href_encodes_spaces() {
        assert_eq!(attachment_href("my diagram.png"), "attachments/my%20diagram.png");
    }

    #[test]
    fn export_and_conversion_of_one_page_resolve_to_markdown() {
        let index = OutputFileIndex::from_paths(
            Path::new("/out"),
            ["/out/A/Setup.html", "/out/A/Setup.md"],
        );
        let href = LinkResolver::new(&index).resolve_page("Setup", Path::new("/out/A/index.html"));
        assert_eq!(href.as_deref(), Some("Setup.md"));
    }

    #[test]
    fn ambiguous_title_picks_first_file_in_sorted_order() {
        let index = OutputFileIndex::from_paths(
            Path::new("/out"),
            [
                "/out/B/Setup.md",
                "/out/B/Setup.html",
                "/out/A/Setup.md",
                "/out/A/Setup.html",
            ],
        );
        let href = LinkResolver::new(&index).resolve_page("Setup", Path::new("/out/C/Doc.html"));
        assert_eq!(href.as_deref(), Some("../A/Setup.md"));
    }

    #[test]
    fn spaces_in_resolved_paths_are_encoded() {
        let index = OutputFileIndex::from_paths(
            Path::new("/out"),
            ["/out/Team Notes/Weekly Sync.html"],
        );
        let href =
            LinkResolver::new(&index).resolve_page("Weekly Sync", Path::new("/out/Other.html"));
        assert_eq!(href.as_deref(), Some("Team%20Notes/Weekly%20Sync.md"));
    }
}
