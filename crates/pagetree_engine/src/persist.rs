use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use thiserror::Error;

use pagetree_core::ActionError;

#[derive(Debug, Error)]
pub enum PersistError {
    #[error("output directory missing or not writable: {0}")]
    OutputDir(String),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

impl From<PersistError> for ActionError {
    fn from(err: PersistError) -> Self {
        match err {
            PersistError::Io(io) => ActionError::Io(io),
            other => ActionError::Persist(other.to_string()),
        }
    }
}

/// Ensure output directory exists; create it and any parents if missing.
pub fn ensure_output_dir(dir: &Path) -> Result<(), PersistError> {
    if dir.exists() {
        let meta = fs::metadata(dir).map_err(|e| PersistError::OutputDir(e.to_string()))?;
        if !meta.is_dir() {
            return Err(PersistError::OutputDir(format!(
                "{} is not a directory",
                dir.display()
            )));
        }
    } else {
        fs::create_dir_all(dir).map_err(|e| PersistError::OutputDir(e.to_string()))?;
    }
    Ok(())
}

/// Writes files into one directory through a temp file and a rename, so a
/// reader never sees a half written page or attachment.
pub struct AtomicFileWriter {
    dir: PathBuf,
}

impl AtomicFileWriter {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn write(&self, filename: &str, content: impl AsRef<[u8]>) -> Result<PathBuf, PersistError> {
        let mut tmp = self.temp_file()?;
        tmp.write_all(content.as_ref())?;
        self.persist(tmp, filename)
    }

    /// Temp file in the target directory, for callers that stream their content.
    ///
    /// Dropping it without [`AtomicFileWriter::persist`] removes it.
    pub fn temp_file(&self) -> Result<NamedTempFile, PersistError> {
        ensure_output_dir(&self.dir)?;
        Ok(NamedTempFile::new_in(&self.dir)?)
    }

    pub fn persist(&self, mut tmp: NamedTempFile, filename: &str) -> Result<PathBuf, PersistError> {
        let target = self.dir.join(filename);
        tmp.flush()?;
        tmp.as_file_mut().sync_all()?;

        // Replace existing file if present to keep re-runs deterministic.
        if target.exists() {
            fs::remove_file(&target)?;
        }
        tmp.persist(&target).map_err(|e| PersistError::Io(e.error))?;
        Ok(target)
    }
}

/// Write `content` to `path` atomically, creating the parent directory.
pub fn write_atomic(path: &Path, content: impl AsRef<[u8]>) -> Result<PathBuf, PersistError> {
    let (dir, filename) = split_target(path)?;
    AtomicFileWriter::new(dir).write(&filename, content)
}

fn split_target(path: &Path) -> Result<(PathBuf, String), PersistError> {
    let filename = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| PersistError::OutputDir(format!("{} has no file name", path.display())))?;
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));
    Ok((dir, filename))
}
