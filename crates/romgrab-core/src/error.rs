//! Error types for transport calls and pipeline stages.

use thiserror::Error;

/// Failure of a single HTTP exchange.
#[derive(Debug, Error)]
pub enum HttpError {
    /// Curl reported an error (timeout, connection, DNS, aborted write, etc.).
    #[error("{0}")]
    Curl(#[from] curl::Error),
    /// Response had a non-2xx status.
    #[error("HTTP {0}")]
    Status(u32),
    /// Local file could not be written.
    #[error("storage: {0}")]
    Io(#[from] std::io::Error),
    /// The blocking task running the transfer panicked or was cancelled.
    #[error("transfer task: {0}")]
    Join(String),
}

impl From<tokio::task::JoinError> for HttpError {
    fn from(e: tokio::task::JoinError) -> Self {
        HttpError::Join(e.to_string())
    }
}

/// Why a resolve response could not be turned into a download.
#[derive(Debug, Error)]
pub enum ResolveFailure {
    #[error(transparent)]
    Http(#[from] HttpError),
    #[error("malformed resolve response: {0}")]
    Body(#[from] serde_json::Error),
    #[error("unusable download name {0:?}")]
    Filename(String),
}

/// A failure isolated to one unit of work. The URL is the stable identity of that
/// unit: the listing page for `CatalogFetch`, the item page for everything else.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("catalog page {url}: {source}")]
    CatalogFetch {
        url: String,
        #[source]
        source: HttpError,
    },
    #[error("item page {url}: {source}")]
    ItemFetch {
        url: String,
        #[source]
        source: HttpError,
    },
    #[error("item page {url}: no media identifier")]
    MissingMediaId { url: String },
    #[error("resolve {url}: {source}")]
    Resolve {
        url: String,
        #[source]
        source: ResolveFailure,
    },
    #[error("download for {url}: {source}")]
    DownloadStream {
        url: String,
        #[source]
        source: HttpError,
    },
}

impl PipelineError {
    /// Short stage label for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            PipelineError::CatalogFetch { .. } => "catalog_fetch",
            PipelineError::ItemFetch { .. } => "item_fetch",
            PipelineError::MissingMediaId { .. } => "missing_media_id",
            PipelineError::Resolve { .. } => "resolve",
            PipelineError::DownloadStream { .. } => "download_stream",
        }
    }

    /// Item page URL to persist for a later retry run, if this failure has one.
    pub fn item_url(&self) -> Option<&str> {
        match self {
            PipelineError::CatalogFetch { .. } => None,
            PipelineError::ItemFetch { url, .. }
            | PipelineError::MissingMediaId { url }
            | PipelineError::Resolve { url, .. }
            | PipelineError::DownloadStream { url, .. } => Some(url),
        }
    }
}
