//! CLI command handlers, one file per command.

mod config_path;
mod run;
mod status;

pub use config_path::run_config_path;
pub use run::run_pipeline;
pub use status::run_status;
