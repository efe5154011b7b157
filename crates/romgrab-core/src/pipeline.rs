//! Run driver: one pipeline for all three modes.
//!
//! An input source (catalog walk, discovered-items log, or failed-attempts log)
//! feeds item page URLs to the scheduler. Each item then runs
//! fetch → resolve → download in order. Every item-level failure goes through
//! [`ItemContext::record_failure`], which persists the item page URL for a later
//! retry run and reports the failure to the progress aggregator.

use anyhow::Result;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc;

use crate::catalog::{CatalogWalker, WalkReport};
use crate::config::{GrabConfig, RunMode};
use crate::downloader::{CompletedDownload, Downloader};
use crate::error::PipelineError;
use crate::item_page::ItemPageFetcher;
use crate::progress::{run_progress_loop, ProgressEvent, ProgressSnapshot};
use crate::record::{DownloadRecord, RecordState};
use crate::recovery_log::{self, RecoveryLog};
use crate::resolver::MediaResolver;
use crate::scheduler::Scheduler;
use crate::storage;

/// Bound on item URLs buffered between the input source and the scheduler.
const INPUT_BUFFER: usize = 64;

/// Totals for one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub mode: RunMode,
    /// Items that entered the pipeline.
    pub started: u64,
    pub completed: u64,
    pub failed: u64,
    /// Listing pages that could not be loaded (discover mode only).
    pub catalog_pages_failed: usize,
}

impl RunSummary {
    /// True when every item completed and no listing page failed.
    pub fn is_success(&self) -> bool {
        self.failed == 0 && self.catalog_pages_failed == 0 && self.completed == self.started
    }

    /// Process exit code: 0 on full success, 1 if anything failed.
    pub fn exit_code(&self) -> i32 {
        if self.is_success() {
            0
        } else {
            1
        }
    }
}

/// Where item URLs come from.
enum Input {
    Catalog(CatalogWalker),
    Queue(Vec<String>),
}

/// Shared, read-only state for every item task.
struct ItemContext {
    log: RecoveryLog,
    fetcher: ItemPageFetcher,
    resolver: MediaResolver,
    downloader: Downloader,
    progress: mpsc::UnboundedSender<ProgressEvent>,
}

impl ItemContext {
    fn advance(record: &mut DownloadRecord, next: RecordState) {
        if let Err(e) = record.advance(next) {
            tracing::error!(item = record.item_url(), "{}", e);
        }
    }

    async fn drive(&self, record: &mut DownloadRecord) -> Result<CompletedDownload, PipelineError> {
        let intent = self.fetcher.fetch(record.item_url()).await?;
        self.log.record_discovered(&intent.item_url);

        Self::advance(record, RecordState::Resolving);
        let resolved = self.resolver.resolve(&intent).await?;

        Self::advance(record, RecordState::Downloading);
        self.downloader.download(&resolved).await
    }

    async fn process(&self, item_url: String) {
        let mut record = DownloadRecord::new(item_url);
        match self.drive(&mut record).await {
            Ok(done) => {
                Self::advance(&mut record, RecordState::Completed);
                let _ = self.progress.send(ProgressEvent::Completed {
                    filename: done.filename,
                });
            }
            Err(e) => {
                if let Err(t) = record.fail() {
                    tracing::error!(item = record.item_url(), "{}", t);
                }
                self.record_failure(&e);
            }
        }
    }

    /// Single persistence point for item failures.
    fn record_failure(&self, err: &PipelineError) {
        tracing::warn!(kind = err.kind(), "{}", err);
        if let Some(url) = err.item_url() {
            self.log.record_failed(url);
            let _ = self.progress.send(ProgressEvent::Failed {
                item_url: url.to_string(),
            });
        }
    }
}

pub struct Pipeline {
    mode: RunMode,
    failed_log: PathBuf,
    scheduler: Scheduler,
    input: Input,
    ctx: ItemContext,
    progress_rx: mpsc::UnboundedReceiver<ProgressEvent>,
}

impl Pipeline {
    /// Prepares a run: creates directories and logs, and for replay/retry reads
    /// the input queue. In retry mode the failed-attempts log is rotated so it
    /// ends up holding only what fails again.
    pub fn new(cfg: &GrabConfig, mode: RunMode) -> Result<Self> {
        storage::ensure_dirs(&cfg.staging_dir(), &cfg.completed_dir())?;

        let input = match mode {
            RunMode::Discover => Input::Catalog(CatalogWalker::new(&cfg.site, &cfg.http)?),
            RunMode::Replay => Input::Queue(recovery_log::read_entries(&cfg.discovered_log_path())?),
            RunMode::Retry => Input::Queue(recovery_log::rotate(&cfg.failed_log_path())?),
        };
        let log = RecoveryLog::open(&cfg.discovered_log_path(), &cfg.failed_log_path())?;

        let (progress_tx, progress_rx) = mpsc::unbounded_channel();
        let ctx = ItemContext {
            log,
            fetcher: ItemPageFetcher::new(&cfg.site, &cfg.http)?,
            resolver: MediaResolver::new(&cfg.site, &cfg.http),
            downloader: Downloader::new(cfg),
            progress: progress_tx,
        };

        Ok(Self {
            mode,
            failed_log: cfg.failed_log_path(),
            scheduler: Scheduler::new(cfg.max_concurrent_items, cfg.stagger(mode)),
            input,
            ctx,
            progress_rx,
        })
    }

    /// Runs until every item reached a terminal state. Completion and "all done"
    /// snapshots are forwarded to `report_tx` if given.
    pub async fn run(self, report_tx: Option<mpsc::UnboundedSender<ProgressSnapshot>>) -> Result<RunSummary> {
        let Pipeline {
            mode,
            failed_log,
            scheduler,
            input,
            ctx,
            progress_rx,
        } = self;
        tracing::info!(mode = mode.as_str(), "run starting");

        let progress_handle = tokio::spawn(run_progress_loop(progress_rx, report_tx));
        let (items_tx, items_rx) = mpsc::channel::<String>(INPUT_BUFFER);

        let producer = tokio::spawn(async move {
            match input {
                Input::Catalog(walker) => walker.walk(items_tx).await,
                Input::Queue(urls) => {
                    let mut report = WalkReport::default();
                    for url in urls {
                        report.items_found += 1;
                        if items_tx.send(url).await.is_err() {
                            break;
                        }
                    }
                    report
                }
            }
        });

        let ctx = Arc::new(ctx);
        let progress = ctx.progress.clone();
        let closed_progress = ctx.progress.clone();
        let dispatched = scheduler
            .run(
                items_rx,
                |index, item_url: String| {
                    tracing::debug!(index, item = %item_url, "item enqueued");
                    let _ = progress.send(ProgressEvent::Enqueued {
                        item_url: item_url.clone(),
                    });
                    let ctx = Arc::clone(&ctx);
                    async move { ctx.process(item_url).await }
                },
                move || {
                    let _ = closed_progress.send(ProgressEvent::EnumerationFinished);
                },
            )
            .await;

        let report = producer
            .await
            .map_err(|e| anyhow::anyhow!("input task join: {}", e))?;
        for failure in &report.failures {
            tracing::warn!(kind = failure.kind(), "{}", failure);
        }

        let logged_discovered = ctx.log.discovered().len();
        let logged_failed = ctx.log.failed().len();

        // Close the progress channel so the aggregator returns.
        drop(progress);
        drop(ctx);
        let tracker = progress_handle
            .await
            .map_err(|e| anyhow::anyhow!("progress task join: {}", e))?;

        // Every queued item reached a terminal state; re-failures are in the fresh log.
        if mode == RunMode::Retry && tracker.is_drained() {
            recovery_log::clear_previous(&failed_log)?;
        } else if !tracker.is_drained() {
            tracing::warn!(
                started = tracker.started(),
                completed = tracker.completed(),
                failed = tracker.failed(),
                "run ended before every item reached a terminal state"
            );
        }

        let summary = RunSummary {
            mode,
            started: tracker.started(),
            completed: tracker.completed(),
            failed: tracker.failed(),
            catalog_pages_failed: report.failures.len(),
        };
        tracing::info!(
            mode = mode.as_str(),
            dispatched,
            completed = summary.completed,
            failed = summary.failed,
            catalog_pages_failed = summary.catalog_pages_failed,
            logged_discovered,
            logged_failed,
            "run finished"
        );
        Ok(summary)
    }
}
