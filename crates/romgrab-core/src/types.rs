//! Values passed between pipeline stages.

use std::fmt;

/// Opaque per-item token read from the item page; required to resolve a download.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MediaId(String);

impl MediaId {
    /// Returns `None` for empty or whitespace-only values.
    pub fn new(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(MediaId(trimmed.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MediaId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// An item whose page yielded a media id and is ready to resolve.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadIntent {
    pub media_id: MediaId,
    /// Absolute item page URL; the stable identity used in both logs.
    pub item_url: String,
}

/// Result of a successful resolve: where to fetch and what to call the file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedDownload {
    /// Time-limited fetch URL, including `mediaId` and `attach` parameters.
    pub url: String,
    /// Canonical file name as given by the resolving service.
    pub filename: String,
    /// Originating item page URL, carried through for failure logging.
    pub item_url: String,
}
