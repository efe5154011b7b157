//! Per-item state machine.
//!
//! `Pending → Resolving → Downloading → Completed`, and any non-terminal state
//! may move to `Failed`. Nothing leaves `Completed` or `Failed`.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordState {
    Pending,
    Resolving,
    Downloading,
    Completed,
    Failed,
}

impl RecordState {
    pub fn as_str(self) -> &'static str {
        match self {
            RecordState::Pending => "pending",
            RecordState::Resolving => "resolving",
            RecordState::Downloading => "downloading",
            RecordState::Completed => "completed",
            RecordState::Failed => "failed",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, RecordState::Completed | RecordState::Failed)
    }

    fn can_move_to(self, next: RecordState) -> bool {
        use RecordState::*;
        matches!(
            (self, next),
            (Pending, Resolving)
                | (Resolving, Downloading)
                | (Downloading, Completed)
                | (Pending | Resolving | Downloading, Failed)
        )
    }
}

/// Rejected state change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidTransition {
    pub from: RecordState,
    pub to: RecordState,
}

impl fmt::Display for InvalidTransition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid transition {} -> {}", self.from.as_str(), self.to.as_str())
    }
}

impl std::error::Error for InvalidTransition {}

/// Tracks one item through the pipeline.
#[derive(Debug, Clone)]
pub struct DownloadRecord {
    item_url: String,
    state: RecordState,
}

impl DownloadRecord {
    pub fn new(item_url: impl Into<String>) -> Self {
        Self {
            item_url: item_url.into(),
            state: RecordState::Pending,
        }
    }

    pub fn item_url(&self) -> &str {
        &self.item_url
    }

    pub fn state(&self) -> RecordState {
        self.state
    }

    pub fn advance(&mut self, next: RecordState) -> Result<(), InvalidTransition> {
        if !self.state.can_move_to(next) {
            return Err(InvalidTransition {
                from: self.state,
                to: next,
            });
        }
        tracing::trace!(item = %self.item_url, from = self.state.as_str(), to = next.as_str(), "record transition");
        self.state = next;
        Ok(())
    }

    /// Moves to `Failed` from any non-terminal state.
    pub fn fail(&mut self) -> Result<(), InvalidTransition> {
        self.advance(RecordState::Failed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn happy_path_reaches_completed() {
        let mut r = DownloadRecord::new("https://site.example/roms/ds/a/");
        r.advance(RecordState::Resolving).unwrap();
        r.advance(RecordState::Downloading).unwrap();
        r.advance(RecordState::Completed).unwrap();
        assert!(r.state().is_terminal());
    }

    #[test]
    fn any_active_state_can_fail() {
        for steps in 0..3 {
            let mut r = DownloadRecord::new("u");
            let path = [RecordState::Resolving, RecordState::Downloading];
            for s in path.iter().take(steps.min(2)) {
                r.advance(*s).unwrap();
            }
            r.fail().unwrap();
            assert_eq!(r.state(), RecordState::Failed);
        }
    }

    #[test]
    fn terminal_states_are_final() {
        let mut done = DownloadRecord::new("u");
        done.advance(RecordState::Resolving).unwrap();
        done.advance(RecordState::Downloading).unwrap();
        done.advance(RecordState::Completed).unwrap();
        assert!(done.fail().is_err());

        let mut failed = DownloadRecord::new("u");
        failed.fail().unwrap();
        let err = failed.advance(RecordState::Resolving).unwrap_err();
        assert_eq!(err.from, RecordState::Failed);
        assert_eq!(err.to, RecordState::Resolving);
    }

    #[test]
    fn stages_cannot_be_skipped() {
        let mut r = DownloadRecord::new("u");
        assert!(r.advance(RecordState::Downloading).is_err());
        assert!(r.advance(RecordState::Completed).is_err());
        assert_eq!(r.state(), RecordState::Pending);
    }
}
