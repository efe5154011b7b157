//! CLI for the romgrab catalog downloader.

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use romgrab_core::config::{self, GrabConfig};
use romgrab_core::RunMode;
use std::path::{Path, PathBuf};

use commands::{run_config_path, run_pipeline, run_status};

/// Top-level CLI for the romgrab catalog downloader.
#[derive(Debug, Parser)]
#[command(name = "romgrab")]
#[command(about = "romgrab: walk a ROM catalog, resolve media, download files", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Run the pipeline: discover from the catalog, replay the discovered log, or retry failures.
    Run {
        /// Input source: discover, replay or retry (default: `mode` from the config file).
        #[arg(long, value_name = "MODE")]
        mode: Option<RunMode>,
        /// Config file to use instead of the XDG default.
        #[arg(long, value_name = "PATH")]
        config: Option<PathBuf>,
        /// Process up to N items concurrently (default: `max_concurrent_items` from the config).
        #[arg(long, value_name = "N")]
        jobs: Option<usize>,
    },

    /// Show log and directory counts for the configured work dir.
    Status {
        /// Config file to use instead of the XDG default.
        #[arg(long, value_name = "PATH")]
        config: Option<PathBuf>,
    },

    /// Print the default config file path.
    ConfigPath,
}

fn load_config(path: Option<&Path>) -> Result<GrabConfig> {
    let cfg = match path {
        Some(p) => config::load_from_path(p)?,
        None => config::load_or_init()?,
    };
    tracing::debug!("loaded config: {:?}", cfg);
    Ok(cfg)
}

impl CliCommand {
    /// Parses arguments and runs the command. Returns the process exit code.
    pub async fn run_from_args() -> Result<i32> {
        let cli = Cli::parse();

        match cli.command {
            CliCommand::Run { mode, config, jobs } => {
                let mut cfg = load_config(config.as_deref())?;
                if let Some(jobs) = jobs {
                    cfg.max_concurrent_items = jobs.max(1);
                }
                let mode = mode.unwrap_or(cfg.mode);
                run_pipeline(&cfg, mode).await
            }
            CliCommand::Status { config } => {
                let cfg = load_config(config.as_deref())?;
                run_status(&cfg)?;
                Ok(0)
            }
            CliCommand::ConfigPath => {
                run_config_path()?;
                Ok(0)
            }
        }
    }
}
