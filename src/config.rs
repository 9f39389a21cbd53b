//! Configuration loader and validator for the archivers.
use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML parse error: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("Invalid configuration: {0}")]
    Invalid(&'static str),
}

/// Root configuration struct mirroring the YAML schema exactly.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Config {
    pub archive: Archive,
    pub http: Http,
    pub church: Church,
    pub moltbook: Moltbook,
}

/// Where archived files land on disk.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Archive {
    pub root_dir: String,
    pub data_dir: String,
    pub html_dir: String,
}

/// Shared HTTP client settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Http {
    pub timeout_seconds: u64,
}

/// molt.church pipeline settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Church {
    pub base_url: String,
    pub user_agent: String,
    pub page_size: usize,
    pub delay_ms: u64,
    pub log_file: String,
}

/// moltbook pipeline settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Moltbook {
    pub base_url: String,
    pub user_agent: String,
    pub submolt_page_size: usize,
    pub post_page_size: usize,
    pub post_limit: usize,
    pub delay_ms: u64,
    pub log_file: String,
}

impl Archive {
    /// Root directory with a leading `~/` expanded to `$HOME`.
    pub fn resolved_root_dir(&self) -> PathBuf {
        if let Some(rest) = self.root_dir.strip_prefix("~/") {
            if let Ok(home) = std::env::var("HOME") {
                return Path::new(&home).join(rest);
            }
        }
        PathBuf::from(&self.root_dir)
    }

    pub fn resolved_data_dir(&self) -> PathBuf {
        self.resolved_root_dir().join(&self.data_dir)
    }

    pub fn resolved_html_dir(&self) -> PathBuf {
        self.resolved_root_dir().join(&self.html_dir)
    }
}

impl Http {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

impl Church {
    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }
}

impl Moltbook {
    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }
}

impl Config {
    /// Ensure the archive root, data and html directories exist.
    pub fn ensure_dirs(&self) -> Result<(), std::io::Error> {
        fs::create_dir_all(self.archive.resolved_root_dir())?;
        fs::create_dir_all(self.archive.resolved_data_dir())?;
        fs::create_dir_all(self.archive.resolved_html_dir())
    }
}

/// Load configuration from a YAML file and validate it.
/// - If `path` is None, the built-in [`example`] defaults are used.
pub fn load(path: Option<&Path>) -> Result<Config, ConfigError> {
    let cfg: Config = match path {
        Some(path) => {
            let content = fs::read_to_string(path)?;
            serde_yaml::from_str(&content)?
        }
        None => serde_yaml::from_str(example())?,
    };
    validate(&cfg)?;
    Ok(cfg)
}

fn is_blank(s: &str) -> bool {
    s.trim().is_empty()
}

fn is_valid_url(s: &str) -> bool {
    Url::parse(s).is_ok()
}

/// Validate a configuration instance.
fn validate(cfg: &Config) -> Result<(), ConfigError> {
    if is_blank(&cfg.archive.root_dir) {
        return Err(ConfigError::Invalid("archive.root_dir must be non-empty"));
    }
    if is_blank(&cfg.archive.data_dir) {
        return Err(ConfigError::Invalid("archive.data_dir must be non-empty"));
    }
    if is_blank(&cfg.archive.html_dir) {
        return Err(ConfigError::Invalid("archive.html_dir must be non-empty"));
    }

    if cfg.http.timeout_seconds == 0 {
        return Err(ConfigError::Invalid("http.timeout_seconds must be > 0"));
    }

    let church = &cfg.church;
    if !is_valid_url(&church.base_url) {
        return Err(ConfigError::Invalid("church.base_url must be a valid URL"));
    }
    if is_blank(&church.user_agent) {
        return Err(ConfigError::Invalid("church.user_agent must be non-empty"));
    }
    if church.page_size == 0 {
        return Err(ConfigError::Invalid("church.page_size must be > 0"));
    }
    if is_blank(&church.log_file) {
        return Err(ConfigError::Invalid("church.log_file must be non-empty"));
    }

    let moltbook = &cfg.moltbook;
    if !is_valid_url(&moltbook.base_url) {
        return Err(ConfigError::Invalid("moltbook.base_url must be a valid URL"));
    }
    if is_blank(&moltbook.user_agent) {
        return Err(ConfigError::Invalid("moltbook.user_agent must be non-empty"));
    }
    if moltbook.submolt_page_size == 0 {
        return Err(ConfigError::Invalid("moltbook.submolt_page_size must be > 0"));
    }
    if moltbook.post_page_size == 0 {
        return Err(ConfigError::Invalid("moltbook.post_page_size must be > 0"));
    }
    if moltbook.post_limit == 0 {
        return Err(ConfigError::Invalid("moltbook.post_limit must be > 0"));
    }
    if is_blank(&moltbook.log_file) {
        return Err(ConfigError::Invalid("moltbook.log_file must be non-empty"));
    }

    Ok(())
}

/// Returns the default configuration as YAML.
pub fn example() -> &'static str {
    r#"archive:
  root_dir: "."
  data_dir: "data"
  html_dir: "html"

http:
  timeout_seconds: 30

church:
  base_url: "https://molt.church"
  user_agent: "MoltChurchArchiver/1.0"
  page_size: 50
  delay_ms: 500
  log_file: "sync_log.json"

moltbook:
  base_url: "https://www.moltbook.com"
  user_agent: "MoltbookArchiver/1.0"
  submolt_page_size: 100
  post_page_size: 50
  post_limit: 1000
  delay_ms: 300
  log_file: "moltbook_sync_log.json"
"#
}
