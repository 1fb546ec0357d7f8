use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use pagetree_core::{sanitize_filename, INDEX_NAME};

/// Extensions of the files a page can be materialised as.
const INDEXED_EXTENSIONS: &[&str] = &[".html", ".md"];

/// Every `.html`/`.md` file under an output root, taken in one scan.
///
/// The set is sorted, which makes "first match" lookups deterministic. It never
/// changes after construction; files written later need a fresh scan.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OutputFileIndex {
    root: PathBuf,
    files: BTreeSet<PathBuf>,
}

impl OutputFileIndex {
    pub fn scan(root: &Path) -> Result<Self, walkdir::Error> {
        let mut files = BTreeSet::new();
        if root.exists() {
            for entry in WalkDir::new(root).follow_links(false) {
                let entry = entry?;
                if !entry.file_type().is_file() {
                    continue;
                }
                if is_indexed(entry.path()) {
                    files.insert(entry.into_path());
                }
            }
        }
        Ok(Self {
            root: root.to_path_buf(),
            files,
        })
    }

    pub fn from_paths<I, P>(root: &Path, paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        let files = paths
            .into_iter()
            .map(Into::into)
            .filter(|p: &PathBuf| is_indexed(p))
            .collect();
        Self {
            root: root.to_path_buf(),
            files,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Path> {
        self.files.iter().map(PathBuf::as_path)
    }

    /// The raw exports, i.e. the conversion inputs.
    pub fn html_files(&self) -> impl Iterator<Item = &Path> {
        self.iter().filter(|p| has_suffix(p, ".html"))
    }

    /// Files a page titled `title` may have been written to: `<title>.md|.html`
    /// or `<title>/index.md|.html`, anywhere under the root.
    pub fn find_page(&self, title: &str) -> Vec<&Path> {
        let name = sanitize_filename(title);
        self.iter().filter(|p| names_page(p, &name)).collect()
    }
}

fn is_indexed(path: &Path) -> bool {
    INDEXED_EXTENSIONS.iter().any(|ext| has_suffix(path, ext))
}

fn has_suffix(path: &Path, suffix: &str) -> bool {
    path.to_string_lossy().ends_with(suffix)
}

fn names_page(path: &Path, name: &str) -> bool {
    let full = path.to_string_lossy();
    let Some(stem) = INDEXED_EXTENSIONS
        .iter()
        .find_map(|ext| full.strip_suffix(ext))
    else {
        return false;
    };
    let index_forms = [format!("/{INDEX_NAME}"), format!("\\{INDEX_NAME}")];
    let mut candidates = vec![stem];
    candidates.extend(index_forms.iter().filter_map(|f| stem.strip_suffix(f.as_str())));
    candidates
        .iter()
        .any(|c| c.ends_with(&format!("/{name}")) || c.ends_with(&format!("\\{name}")))
}
