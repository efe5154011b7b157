#![allow(dead_code)]

pub mod site_server;

use romgrab_core::config::GrabConfig;
use std::path::Path;

pub const CATEGORY: &str = "/roms/nintendo-ds/";
pub const CATALOG_TARGET: &str = "/roms/nintendo-ds/?sort=popularity";

/// Config pointed at the test server and a scratch work dir, with no stagger.
pub fn test_config(base_url: &str, work_dir: &Path) -> GrabConfig {
    let mut cfg = GrabConfig {
        work_dir: work_dir.to_path_buf(),
        ..GrabConfig::default()
    };
    cfg.site.base_url = base_url.to_string();
    cfg.schedule.discover_stagger_ms = 0;
    cfg.schedule.replay_stagger_ms = 0;
    cfg.http.connect_timeout_secs = 5;
    cfg.http.request_timeout_secs = 10;
    cfg.http.download_timeout_secs = 10;
    cfg
}

/// Listing page with the given item and pagination hrefs.
pub fn listing_html(items: &[&str], pages: &[&str]) -> String {
    let items: String = items
        .iter()
        .map(|h| format!(r#"<a href="{}">item</a>"#, h))
        .collect();
    let pages: String = pages
        .iter()
        .map(|h| format!(r#"<a href="{}">page</a>"#, h))
        .collect();
    format!(
        r#"<html><body><a href="{cat}">Nintendo DS</a>
<div class="grid gap-6 lg:gap-8 grid-cols-2 md:grid-cols-3 lg:grid-cols-4 text-center">{items}</div>
<nav aria-label="Page Navigation">{pages}</nav></body></html>"#,
        cat = CATEGORY,
        items = items,
        pages = pages
    )
}

/// Item page carrying `media_id` on its download button.
pub fn item_html(media_id: &str) -> String {
    format!(
        r#"<html><body><h1>Game</h1><button class="btn" data-media-id="{}">Download</button></body></html>"#,
        media_id
    )
}

pub fn resolve_json(download_url: &str, name: &str) -> String {
    format!(r#"{{"downloadUrl":"{}","downloadName":"{}"}}"#, download_url, name)
}

/// Non-empty lines of a log file.
pub fn log_lines(path: &Path) -> Vec<String> {
    std::fs::read_to_string(path)
        .unwrap_or_default()
        .lines()
        .filter(|l| !l.trim().is_empty())
        .map(String::from)
        .collect()
}

/// Sorted file names in a directory.
pub fn file_names(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .map(|rd| {
            rd.flatten()
                .map(|e| e.file_name().to_string_lossy().into_owned())
                .collect()
        })
        .unwrap_or_default();
    names.sort();
    names
}
