//! Streams a resolved download into staging, then moves it to the completed dir.

use std::path::{Path, PathBuf};

use crate::config::GrabConfig;
use crate::error::{HttpError, PipelineError};
use crate::headers;
use crate::http::{self, Headers, TransferLimits};
use crate::storage::StagedFile;
use crate::types::ResolvedDownload;

/// A file that reached the completed directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletedDownload {
    pub filename: String,
    pub path: PathBuf,
    pub bytes: u64,
}

#[derive(Debug, Clone)]
pub struct Downloader {
    headers: Headers,
    limits: TransferLimits,
    staging_dir: PathBuf,
    completed_dir: PathBuf,
    cleanup_failed: bool,
}

impl Downloader {
    pub fn new(cfg: &GrabConfig) -> Self {
        let referer = format!("{}/", cfg.site.base_url.trim_end_matches('/'));
        Self {
            headers: headers::navigation(&cfg.http, Some(&referer)),
            limits: TransferLimits::for_downloads(&cfg.http),
            staging_dir: cfg.staging_dir(),
            completed_dir: cfg.completed_dir(),
            cleanup_failed: cfg.cleanup_failed_staging,
        }
    }

    /// Downloads `resolved`. On failure the staged file is deleted (unless cleanup is
    /// disabled) and the error carries the originating item page URL.
    pub async fn download(&self, resolved: &ResolvedDownload) -> Result<CompletedDownload, PipelineError> {
        let this = self.clone();
        let job = resolved.clone();
        let result = tokio::task::spawn_blocking(move || this.download_blocking(&job))
            .await
            .map_err(HttpError::from)
            .and_then(|r| r);
        match result {
            Ok(done) => {
                tracing::info!(
                    item = %resolved.item_url,
                    file = %done.filename,
                    bytes = done.bytes,
                    "download completed"
                );
                Ok(done)
            }
            Err(source) => Err(PipelineError::DownloadStream {
                url: resolved.item_url.clone(),
                source,
            }),
        }
    }

    fn download_blocking(&self, resolved: &ResolvedDownload) -> Result<CompletedDownload, HttpError> {
        let staged_path = self.staging_dir.join(&resolved.filename);
        let final_path = self.completed_dir.join(&resolved.filename);
        let mut staged = StagedFile::create(&staged_path)?;

        match http::stream_to(&resolved.url, &self.headers, &mut staged, self.limits) {
            Ok(bytes) => {
                if let Err(e) = staged.finalize(&final_path) {
                    if self.cleanup_failed {
                        let _ = std::fs::remove_file(&staged_path);
                    }
                    return Err(e.into());
                }
                Ok(CompletedDownload {
                    filename: resolved.filename.clone(),
                    path: final_path,
                    bytes,
                })
            }
            Err(e) => {
                self.cleanup(staged);
                Err(e)
            }
        }
    }

    fn cleanup(&self, staged: StagedFile) {
        if !self.cleanup_failed {
            tracing::debug!(path = %staged.path().display(), "keeping failed staging file");
            return;
        }
        let path: PathBuf = staged.path().to_path_buf();
        if let Err(e) = staged.discard() {
            tracing::warn!("could not remove staging file {}: {}", path.display(), e);
        }
    }

    pub fn staging_dir(&self) -> &Path {
        &self.staging_dir
    }

    pub fn completed_dir(&self) -> &Path {
        &self.completed_dir
    }
}
