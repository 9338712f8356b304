//! Process-wide scratch directory for recordings and synthesized speech.
//!
//! Every file handed out is a [`TempPath`] guard: it is removed when the guard
//! drops, whichever way the owning operation exits. At shutdown
//! [`TempWorkspace::cleanup`] removes leftover files of ours and then the
//! directory, but only if nothing else lives in it.

use std::io;
use std::path::{Path, PathBuf};

use tempfile::TempPath;
use tracing::{debug, warn};

const PREFIX: &str = "voicetask-";

/// Scratch directory owned by one process
#[derive(Debug, Clone)]
pub struct TempWorkspace {
    dir: PathBuf,
}

impl TempWorkspace {
    /// Use (and create if needed) `dir`
    pub fn new(dir: impl Into<PathBuf>) -> io::Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// A fresh, uniquely named file ending in `suffix` (e.g. ".wav")
    pub fn scoped(&self, suffix: &str) -> io::Result<TempPath> {
        // Recreate in case something removed the directory mid-run
        std::fs::create_dir_all(&self.dir)?;
        let file = tempfile::Builder::new()
            .prefix(PREFIX)
            .suffix(suffix)
            .tempfile_in(&self.dir)?;
        let path = file.into_temp_path();
        debug!(path = %path.display(), "Allocated temp file");
        Ok(path)
    }

    /// Files of ours currently in the workspace
    fn owned_files(&self) -> io::Result<Vec<PathBuf>> {
        let entries = match std::fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e),
        };

        Ok(entries
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().map(|t| t.is_file()).unwrap_or(false))
            .filter(|e| e.file_name().to_string_lossy().starts_with(PREFIX))
            .map(|e| e.path())
            .collect())
    }

    /// Number of our files currently in the workspace
    pub fn file_count(&self) -> io::Result<usize> {
        Ok(self.owned_files()?.len())
    }

    /// Remove leftover files of ours, then the directory if it is empty.
    ///
    /// Anything else in the directory (other files, subdirectories) is left
    /// alone, and so is the directory holding it.
    pub fn cleanup(&self) {
        let files = match self.owned_files() {
            Ok(files) => files,
            Err(e) => {
                warn!(dir = %self.dir.display(), error = %e, "Failed to list temp workspace");
                return;
            }
        };

        for path in files {
            match std::fs::remove_file(&path) {
                Ok(()) => debug!(path = %path.display(), "Removed leftover temp file"),
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => warn!(path = %path.display(), error = %e, "Failed to remove temp file"),
            }
        }

        match std::fs::remove_dir(&self.dir) {
            Ok(()) => debug!(dir = %self.dir.display(), "Removed temp workspace"),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => warn!(
                dir = %self.dir.display(),
                error = %e,
                "Temp workspace not removed (directory not empty?)"
            ),
        }
    }
}
