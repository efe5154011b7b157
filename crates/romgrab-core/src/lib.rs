pub mod config;
pub mod logging;

// Pipeline stages, leaves first.
pub mod catalog;
pub mod downloader;
pub mod error;
pub mod headers;
pub mod http;
pub mod item_page;
pub mod pipeline;
pub mod progress;
pub mod record;
pub mod recovery_log;
pub mod resolver;
pub mod scheduler;
pub mod storage;
pub mod types;

pub use config::{GrabConfig, RunMode};
pub use pipeline::{Pipeline, RunSummary};
