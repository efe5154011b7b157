use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Which input queue a run draws item pages from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunMode {
    /// Walk the catalog and download every item found.
    #[default]
    Discover,
    /// Re-process every line of the discovered-items log.
    Replay,
    /// Re-process every line of the failed-attempts log.
    Retry,
}

impl RunMode {
    pub fn as_str(self) -> &'static str {
        match self {
            RunMode::Discover => "discover",
            RunMode::Replay => "replay",
            RunMode::Retry => "retry",
        }
    }
}

impl std::str::FromStr for RunMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "discover" => Ok(RunMode::Discover),
            "replay" => Ok(RunMode::Replay),
            "retry" => Ok(RunMode::Retry),
            other => anyhow::bail!("unknown run mode: {}", other),
        }
    }
}

/// Site layout: where the catalog lives and how to find links and ids in its markup.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    /// Scheme + host, no trailing slash (e.g. `https://www.romsgames.net`).
    pub base_url: String,
    /// Category listing path; also the prefix every item link must start with.
    pub category_path: String,
    /// Value of the `sort` query parameter on the root listing page.
    pub sort: String,
    /// Anchors that lead to further listing pages.
    pub pagination_selector: String,
    /// Anchors that lead to item pages.
    pub item_selector: String,
    /// Element carrying the media identifier on an item page.
    pub media_selector: String,
    /// Attribute of `media_selector` holding the identifier.
    pub media_attribute: String,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            base_url: "https://www.romsgames.net".to_string(),
            category_path: "/roms/nintendo-ds/".to_string(),
            sort: "popularity".to_string(),
            pagination_selector: r#"nav[aria-label="Page Navigation"] a[href]"#.to_string(),
            item_selector: "div.grid a[href]".to_string(),
            media_selector: "button[data-media-id]".to_string(),
            media_attribute: "data-media-id".to_string(),
        }
    }
}

impl SiteConfig {
    /// Root listing URL including the sort parameter.
    pub fn catalog_url(&self) -> String {
        format!(
            "{}{}?sort={}",
            self.base_url.trim_end_matches('/'),
            self.category_path,
            urlencoding::encode(&self.sort)
        )
    }
}

/// File layout relative to `work_dir`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    pub staging_dir: PathBuf,
    pub completed_dir: PathBuf,
    pub discovered_log: PathBuf,
    pub failed_log: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            staging_dir: PathBuf::from("downloads"),
            completed_dir: PathBuf::from("downloaded"),
            discovered_log: PathBuf::from("downloads_paths.log"),
            failed_log: PathBuf::from("failed_downloads.log"),
        }
    }
}

/// Start-time stagger per item index, in milliseconds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScheduleConfig {
    pub discover_stagger_ms: u64,
    pub replay_stagger_ms: u64,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            discover_stagger_ms: 3600,
            replay_stagger_ms: 1000,
        }
    }
}

/// Request identity and timeouts shared by every outbound call.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub user_agent: String,
    /// `sec-ch-ua` client hint; should name the same browser as `user_agent`.
    pub sec_ch_ua: String,
    /// `sec-ch-ua-platform` client hint (quoted, e.g. `"Linux"`).
    pub sec_ch_ua_platform: String,
    pub accept_language: String,
    pub connect_timeout_secs: u64,
    /// Total timeout for page fetches and resolve calls.
    pub request_timeout_secs: u64,
    /// Total timeout for one file download.
    pub download_timeout_secs: u64,
    /// Abort a download that stays below this rate for `low_speed_time_secs`.
    pub low_speed_limit_bytes: u32,
    pub low_speed_time_secs: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            user_agent: "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/129.0.0.0 Safari/537.36".to_string(),
            sec_ch_ua: r#""Google Chrome";v="129", "Not=A?Brand";v="8", "Chromium";v="129""#.to_string(),
            sec_ch_ua_platform: r#""Linux""#.to_string(),
            accept_language: "en-US,en;q=0.9".to_string(),
            connect_timeout_secs: 15,
            request_timeout_secs: 60,
            download_timeout_secs: 3600,
            low_speed_limit_bytes: 1024,
            low_speed_time_secs: 60,
        }
    }
}

/// Global configuration loaded from `~/.config/romgrab/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GrabConfig {
    pub mode: RunMode,
    /// Directory that `[paths]` entries are relative to.
    pub work_dir: PathBuf,
    /// Upper bound on item pipelines in flight at once.
    pub max_concurrent_items: usize,
    /// Delete the staging file when a download fails.
    pub cleanup_failed_staging: bool,
    pub site: SiteConfig,
    pub paths: PathsConfig,
    pub schedule: ScheduleConfig,
    pub http: HttpConfig,
}

impl Default for GrabConfig {
    fn default() -> Self {
        Self {
            mode: RunMode::Discover,
            work_dir: PathBuf::from("."),
            max_concurrent_items: 4,
            cleanup_failed_staging: true,
            site: SiteConfig::default(),
            paths: PathsConfig::default(),
            schedule: ScheduleConfig::default(),
            http: HttpConfig::default(),
        }
    }
}

impl GrabConfig {
    pub fn staging_dir(&self) -> PathBuf {
        self.work_dir.join(&self.paths.staging_dir)
    }

    pub fn completed_dir(&self) -> PathBuf {
        self.work_dir.join(&self.paths.completed_dir)
    }

    pub fn discovered_log_path(&self) -> PathBuf {
        self.work_dir.join(&self.paths.discovered_log)
    }

    pub fn failed_log_path(&self) -> PathBuf {
        self.work_dir.join(&self.paths.failed_log)
    }

    /// Stagger between consecutive item starts for the given mode.
    pub fn stagger(&self, mode: RunMode) -> Duration {
        match mode {
            RunMode::Discover => Duration::from_millis(self.schedule.discover_stagger_ms),
            RunMode::Replay | RunMode::Retry => {
                Duration::from_millis(self.schedule.replay_stagger_ms)
            }
        }
    }
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("romgrab")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<GrabConfig> {
    let path = config_path()?;
    if !path.exists() {
        let default_cfg = GrabConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, toml)?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }
    load_from_path(&path)
}

/// Load configuration from an explicit file. Missing keys take their defaults.
pub fn load_from_path(path: &Path) -> Result<GrabConfig> {
    let data = fs::read_to_string(path)
        .with_context(|| format!("read config: {}", path.display()))?;
    let cfg: GrabConfig =
        toml::from_str(&data).with_context(|| format!("parse config: {}", path.display()))?;
    Ok(cfg)
}
