//! Staged file lifecycle.
//!
//! A download is written to `<staging>/<name>`, synced, then atomically renamed
//! to `<completed>/<name>`. On failure the staged file is removed so the staging
//! directory never holds stray partial files.

use anyhow::{Context, Result};
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// Creates the staging and completed directories if absent.
pub fn ensure_dirs(staging: &Path, completed: &Path) -> Result<()> {
    for dir in [staging, completed] {
        fs::create_dir_all(dir).with_context(|| format!("create dir: {}", dir.display()))?;
    }
    Ok(())
}

/// File being downloaded. Writes append sequentially.
pub struct StagedFile {
    file: File,
    path: PathBuf,
}

impl StagedFile {
    /// Create (or truncate) the staged file at `path`.
    pub fn create(path: &Path) -> io::Result<Self> {
        let file = File::options()
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)?;
        Ok(StagedFile {
            file,
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Sync data and rename into `final_path`. Consumes the writer and closes the file.
    /// Fails if `final_path` is on a different filesystem.
    pub fn finalize(self, final_path: &Path) -> io::Result<()> {
        self.file.sync_all()?;
        let StagedFile { file, path } = self;
        drop(file);
        fs::rename(&path, final_path)
    }

    /// Close and delete the staged file.
    pub fn discard(self) -> io::Result<()> {
        let StagedFile { file, path } = self;
        drop(file);
        match fs::remove_file(&path) {
            Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e),
            _ => Ok(()),
        }
    }
}

impl Write for StagedFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.file.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.file.flush()
    }
}
