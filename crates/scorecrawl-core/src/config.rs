use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

/// Global configuration loaded from `~/.config/scorecrawl/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlConfig {
    /// Subreddit (feed) to crawl for score posts.
    pub subreddit: String,
    /// Directory downloads are materialized under.
    pub download_dir: PathBuf,
    /// Path of the resume ledger file.
    pub ledger_path: PathBuf,
    /// Maximum number of download jobs in flight at once.
    pub max_concurrent_downloads: usize,
    /// Page size requested from the feed API.
    pub page_size: usize,
    /// Per-request HTTP timeout in seconds.
    pub request_timeout_secs: u64,
    /// Seconds to pause the crawl after a rate-limited (429) response.
    pub rate_limit_backoff_secs: u64,
    /// User-Agent sent on all HTTP requests.
    pub user_agent: String,
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            subreddit: "MusicalScores".to_string(),
            download_dir: PathBuf::from("downloads"),
            ledger_path: PathBuf::from("downloads.jsonl"),
            max_concurrent_downloads: 15,
            page_size: 50,
            request_timeout_secs: 60,
            rate_limit_backoff_secs: 60,
            user_agent: "scorecrawl/0.1 (score archive downloader)".to_string(),
        }
    }
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("scorecrawl")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<CrawlConfig> {
    let path = config_path()?;
    if !path.exists() {
        let default_cfg = CrawlConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, toml)?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }

    let data = fs::read_to_string(&path)?;
    let cfg: CrawlConfig = toml::from_str(&data)?;
    Ok(cfg)
}
