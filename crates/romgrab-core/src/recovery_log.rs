//! Append-only URL logs that let a later run pick up where this one stopped.
//!
//! Two newline-delimited files: discovered items (the replay queue) and failed
//! attempts (the retry queue). Both hold item page URLs only. Lines already
//! present, on disk or appended earlier in this run, are not written again.

use anyhow::{Context, Result};
use std::collections::HashSet;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Suffix for the previous failed-attempts log when a retry run starts.
pub const PREVIOUS_SUFFIX: &str = ".prev";

struct LogState {
    file: File,
    seen: HashSet<String>,
}

/// One append-only, duplicate-suppressing URL file.
pub struct AppendLog {
    path: PathBuf,
    state: Mutex<LogState>,
}

impl AppendLog {
    /// Opens (creating if absent) the log at `path` and loads its current lines.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .with_context(|| format!("create log dir: {}", parent.display()))?;
            }
        }
        let seen: HashSet<String> = read_entries(path)?.into_iter().collect();
        // A hand-edited file may lack the final newline.
        let unterminated = fs::read(path)
            .map(|b| b.last().is_some_and(|c| *c != b'\n'))
            .unwrap_or(false);
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("open log: {}", path.display()))?;
        if unterminated {
            file.write_all(b"\n")
                .with_context(|| format!("write log: {}", path.display()))?;
        }
        Ok(Self {
            path: path.to_path_buf(),
            state: Mutex::new(LogState { file, seen }),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Appends `url` as one line. Returns `false` if the line was already present.
    pub fn append(&self, url: &str) -> std::io::Result<bool> {
        let url = url.trim();
        if url.is_empty() {
            return Ok(false);
        }
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        if state.seen.contains(url) {
            return Ok(false);
        }
        state.file.write_all(format!("{}\n", url).as_bytes())?;
        state.file.flush()?;
        state.seen.insert(url.to_string());
        Ok(true)
    }

    /// Number of distinct lines known to this log.
    pub fn len(&self) -> usize {
        self.state.lock().unwrap_or_else(|e| e.into_inner()).seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Reads a log as an ordered, duplicate-free list of URLs. A missing file is empty.
pub fn read_entries(path: &Path) -> Result<Vec<String>> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let data = fs::read_to_string(path)
        .with_context(|| format!("read log: {}", path.display()))?;
    let mut seen = HashSet::new();
    Ok(data
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .filter(|l| seen.insert(l.to_string()))
        .map(String::from)
        .collect())
}

/// `<path>.prev`: the queue a retry run is working through.
pub fn previous_path(path: &Path) -> PathBuf {
    let mut prev = path.as_os_str().to_owned();
    prev.push(PREVIOUS_SUFFIX);
    PathBuf::from(prev)
}

/// Moves the failed-attempts log aside and returns the retry queue, so a retry run
/// starts a fresh log containing only what fails again.
///
/// An existing `<path>.prev` means an earlier retry run did not drain; its entries
/// come first in the queue and stay in `.prev` together with the current log's,
/// until [`clear_previous`] is called.
pub fn rotate(path: &Path) -> Result<Vec<String>> {
    let prev = previous_path(path);
    let mut entries = read_entries(&prev)?;
    let mut seen: HashSet<String> = entries.iter().cloned().collect();
    entries.extend(
        read_entries(path)?
            .into_iter()
            .filter(|e| seen.insert(e.clone())),
    );
    if !path.exists() && !prev.exists() {
        return Ok(entries);
    }

    let mut tmp = prev.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);
    let mut data = entries.join("\n");
    if !data.is_empty() {
        data.push('\n');
    }
    {
        let mut file = File::create(&tmp)
            .with_context(|| format!("write log: {}", tmp.display()))?;
        file.write_all(data.as_bytes())
            .and_then(|()| file.sync_all())
            .with_context(|| format!("write log: {}", tmp.display()))?;
    }
    fs::rename(&tmp, &prev).with_context(|| format!("rotate log: {}", path.display()))?;
    if path.exists() {
        fs::remove_file(path).with_context(|| format!("rotate log: {}", path.display()))?;
    }
    Ok(entries)
}

/// Drops `<path>.prev` once every entry of the retry queue reached a terminal state.
pub fn clear_previous(path: &Path) -> Result<()> {
    let prev = previous_path(path);
    match fs::remove_file(&prev) {
        Err(e) if e.kind() != std::io::ErrorKind::NotFound => {
            Err(e).with_context(|| format!("remove log: {}", prev.display()))
        }
        _ => Ok(()),
    }
}

/// The pair of logs used by one run.
pub struct RecoveryLog {
    discovered: AppendLog,
    failed: AppendLog,
}

impl RecoveryLog {
    pub fn open(discovered_path: &Path, failed_path: &Path) -> Result<Self> {
        Ok(Self {
            discovered: AppendLog::open(discovered_path)?,
            failed: AppendLog::open(failed_path)?,
        })
    }

    /// Records an item page whose media id was found. Errors are logged, not returned:
    /// losing a log line must not fail the item.
    pub fn record_discovered(&self, item_url: &str) {
        match self.discovered.append(item_url) {
            Ok(true) => tracing::debug!(item = item_url, "discovered item logged"),
            Ok(false) => {}
            Err(e) => tracing::warn!(item = item_url, "could not append to {}: {}", self.discovered.path().display(), e),
        }
    }

    /// Records an item page whose pipeline failed.
    pub fn record_failed(&self, item_url: &str) {
        match self.failed.append(item_url) {
            Ok(_) => {}
            Err(e) => tracing::warn!(item = item_url, "could not append to {}: {}", self.failed.path().display(), e),
        }
    }

    pub fn discovered(&self) -> &AppendLog {
        &self.discovered
    }

    pub fn failed(&self) -> &AppendLog {
        &self.failed
    }
}
