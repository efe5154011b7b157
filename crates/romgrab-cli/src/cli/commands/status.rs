//! `romgrab status` – summarize logs and directories of the work dir.

use anyhow::Result;
use romgrab_core::config::GrabConfig;
use romgrab_core::recovery_log;
use std::path::Path;

fn count_files(dir: &Path) -> usize {
    std::fs::read_dir(dir)
        .map(|rd| {
            rd.flatten()
                .filter(|e| e.file_type().map(|t| t.is_file()).unwrap_or(false))
                .count()
        })
        .unwrap_or(0)
}

pub fn run_status(cfg: &GrabConfig) -> Result<()> {
    let discovered = recovery_log::read_entries(&cfg.discovered_log_path())?;
    let failed = recovery_log::read_entries(&cfg.failed_log_path())?;

    println!("{:<12} {:<8} {}", "WHAT", "COUNT", "PATH");
    let rows = [
        ("discovered", discovered.len(), cfg.discovered_log_path()),
        ("failed", failed.len(), cfg.failed_log_path()),
        ("staged", count_files(&cfg.staging_dir()), cfg.staging_dir()),
        ("completed", count_files(&cfg.completed_dir()), cfg.completed_dir()),
    ];
    for (what, count, path) in rows {
        println!("{:<12} {:<8} {}", what, count, path.display());
    }
    Ok(())
}
