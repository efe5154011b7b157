//! Run-level progress: items started vs. completed, and the "all done" signal.
//!
//! Counters are owned by one aggregator task that receives [`ProgressEvent`]s
//! over a channel, so no counter is shared between workers. "All done" needs
//! two separate facts: enumeration has finished AND every started item has
//! completed. Counter equality alone is not enough while the catalog walk is
//! still producing items.

use tokio::sync::mpsc;

/// Message sent to the aggregator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgressEvent {
    /// An item entered the pipeline.
    Enqueued { item_url: String },
    /// A file reached the completed directory.
    Completed { filename: String },
    /// An item ended in failure.
    Failed { item_url: String },
    /// No more items will be enqueued this run.
    EnumerationFinished,
}

/// View of the counters after applying one event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressSnapshot {
    pub started: u64,
    pub completed: u64,
    pub failed: u64,
    /// Rounded percent complete, never decreasing within a run. Reaches 100 only
    /// together with "all done".
    pub percent: u8,
    pub enumeration_finished: bool,
    /// Set on the one snapshot where "all done" first became true.
    pub all_done_now: bool,
    /// File name when this snapshot was produced by a completion.
    pub completed_file: Option<String>,
}

#[derive(Debug, Default, Clone)]
pub struct ProgressTracker {
    started: u64,
    completed: u64,
    failed: u64,
    enumeration_finished: bool,
    percent: u8,
    done_reported: bool,
}

impl ProgressTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn started(&self) -> u64 {
        self.started
    }

    pub fn completed(&self) -> u64 {
        self.completed
    }

    pub fn failed(&self) -> u64 {
        self.failed
    }

    pub fn percent(&self) -> u8 {
        self.percent
    }

    /// Every discovered item completed and no more will be discovered.
    pub fn is_all_done(&self) -> bool {
        self.enumeration_finished && self.completed == self.started
    }

    /// Every discovered item reached a terminal state and no more will be discovered.
    pub fn is_drained(&self) -> bool {
        self.enumeration_finished && self.completed + self.failed == self.started
    }

    /// `round(completed / started * 100)`, 0 when nothing has started.
    fn raw_percent(&self) -> u8 {
        if self.started == 0 {
            return 0;
        }
        let pct = (self.completed * 200 + self.started) / (self.started * 2);
        pct.min(100) as u8
    }

    pub fn apply(&mut self, event: ProgressEvent) -> ProgressSnapshot {
        let mut completed_file = None;
        match event {
            ProgressEvent::Enqueued { .. } => self.started += 1,
            ProgressEvent::Completed { filename } => {
                self.completed += 1;
                // 100 is reserved for "all done"; more items may still arrive.
                self.percent = self.percent.max(self.raw_percent()).min(99);
                completed_file = Some(filename);
            }
            ProgressEvent::Failed { .. } => self.failed += 1,
            ProgressEvent::EnumerationFinished => self.enumeration_finished = true,
        }

        let all_done_now = !self.done_reported && self.is_all_done();
        if all_done_now {
            self.done_reported = true;
            self.percent = 100;
        }

        ProgressSnapshot {
            started: self.started,
            completed: self.completed,
            failed: self.failed,
            percent: self.percent,
            enumeration_finished: self.enumeration_finished,
            all_done_now,
            completed_file,
        }
    }
}

/// Aggregator loop: applies events until every sender is dropped, forwarding
/// snapshots produced by completions and by the "all done" transition to
/// `report_tx`. Returns the final counters. Spawn this with `tokio::spawn`.
pub async fn run_progress_loop(
    mut events: mpsc::UnboundedReceiver<ProgressEvent>,
    report_tx: Option<mpsc::UnboundedSender<ProgressSnapshot>>,
) -> ProgressTracker {
    let mut tracker = ProgressTracker::new();
    while let Some(event) = events.recv().await {
        let snapshot = tracker.apply(event);
        if let Some(file) = &snapshot.completed_file {
            tracing::info!(
                file = %file,
                completed = snapshot.completed,
                started = snapshot.started,
                "{}% complete",
                snapshot.percent
            );
        }
        if snapshot.all_done_now {
            tracing::info!(completed = snapshot.completed, "all files downloaded");
        }
        if snapshot.completed_file.is_some() || snapshot.all_done_now {
            if let Some(tx) = &report_tx {
                let _ = tx.send(snapshot);
            }
        }
    }
    tracker
}
