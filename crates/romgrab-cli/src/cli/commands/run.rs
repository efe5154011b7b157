//! `romgrab run` – run the pipeline in the chosen mode.

use anyhow::Result;
use romgrab_core::config::GrabConfig;
use romgrab_core::progress::ProgressSnapshot;
use romgrab_core::{Pipeline, RunMode};

/// One stdout line per finished file, plus a final line when everything is done.
fn progress_line(snap: &ProgressSnapshot, completed_dir: &str) -> Option<String> {
    let file = snap.completed_file.as_deref()?;
    Some(format!(
        "Downloaded {} to {}/{} - {}% complete",
        file, completed_dir, file, snap.percent
    ))
}

pub async fn run_pipeline(cfg: &GrabConfig, mode: RunMode) -> Result<i32> {
    let pipeline = Pipeline::new(cfg, mode)?;
    let completed_dir = cfg.completed_dir().display().to_string();

    let (report_tx, mut report_rx) = tokio::sync::mpsc::unbounded_channel::<ProgressSnapshot>();
    let printer = tokio::spawn(async move {
        while let Some(snap) = report_rx.recv().await {
            if let Some(line) = progress_line(&snap, &completed_dir) {
                println!("{}", line);
            }
            if snap.all_done_now {
                println!("All files downloaded! DONE");
            }
        }
    });

    let summary = pipeline.run(Some(report_tx)).await?;
    if let Err(e) = printer.await {
        tracing::warn!("progress printer failed: {}", e);
    }

    println!(
        "{}: {} started, {} completed, {} failed, {} catalog page(s) failed",
        summary.mode.as_str(),
        summary.started,
        summary.completed,
        summary.failed,
        summary.catalog_pages_failed
    );
    if summary.failed > 0 {
        println!(
            "Failed items were written to {}; run with --mode retry to try them again.",
            cfg.failed_log_path().display()
        );
    }
    Ok(summary.exit_code())
}
