//! Run configuration, read from a TOML file
//!
//! Lookup order: `--config`, `$STOCKWATCH_CONFIG`, `~/.stockwatch/config.toml`.
//! A missing default file means built-in defaults.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

const ENV_PATH: &str = "STOCKWATCH_CONFIG";

pub const REDDIT_LISTING_URL: &str = "https://www.reddit.com/r/ausstocks/new/";
pub const REDDIT_BASE_URL: &str = "https://www.reddit.com";
pub const HOTCOPPER_LISTING_URL: &str = "https://hotcopper.com.au/postview/";
pub const HOTCOPPER_BASE_URL: &str = "https://hotcopper.com.au";

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// SQLite file, defaults to ~/.stockwatch/data.db
    pub database: Option<PathBuf>,
    /// Header-less CSV with one ticker symbol per line
    pub watchlist: PathBuf,
    /// Directory for per-run log files
    pub log_dir: Option<PathBuf>,
    pub browser: BrowserConfig,
    pub reddit: RedditConfig,
    pub hotcopper: HotCopperConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database: None,
            watchlist: PathBuf::from("input.csv"),
            log_dir: None,
            browser: BrowserConfig::default(),
            reddit: RedditConfig::default(),
            hotcopper: HotCopperConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct BrowserConfig {
    pub headless: bool,
    /// Chrome/Chromium binary; auto-detected when unset
    pub chrome_path: Option<PathBuf>,
    /// Pause after navigation so client-side rendering can finish
    pub settle_ms: u64,
    pub timeout_secs: u64,
    pub window_size: (u32, u32),
    pub user_agent: String,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            headless: true,
            chrome_path: None,
            settle_ms: 2_000,
            timeout_secs: 30,
            window_size: (1920, 1080),
            user_agent: "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct RedditConfig {
    pub enabled: bool,
    pub listing_url: String,
    pub base_url: String,
}

impl Default for RedditConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            listing_url: REDDIT_LISTING_URL.to_string(),
            base_url: REDDIT_BASE_URL.to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct HotCopperConfig {
    pub enabled: bool,
    pub listing_url: String,
    pub base_url: String,
}

impl Default for HotCopperConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            listing_url: HOTCOPPER_LISTING_URL.to_string(),
            base_url: HOTCOPPER_BASE_URL.to_string(),
        }
    }
}

impl Config {
    pub fn from_toml(s: &str) -> Result<Self> {
        toml::from_str(s).context("Failed to parse config")
    }

    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading config from {}", path.display()))?;
        Self::from_toml(&content).with_context(|| format!("in {}", path.display()))
    }

    /// Resolve the config file and load it.
    ///
    /// An explicit path (argument or env var) must exist; the default one may not.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::load_from_file(path);
        }
        if let Ok(p) = std::env::var(ENV_PATH) {
            return Self::load_from_file(Path::new(&p));
        }
        if let Ok(home) = std::env::var("HOME") {
            let default_path = PathBuf::from(home).join(".stockwatch").join("config.toml");
            if default_path.exists() {
                return Self::load_from_file(&default_path);
            }
        }
        Ok(Self::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_file_gives_defaults() {
        let cfg = Config::from_toml("").unwrap();
        assert_eq!(cfg, Config::default());
        assert_eq!(cfg.reddit.listing_url, REDDIT_LISTING_URL);
        assert!(cfg.hotcopper.enabled);
    }

    #[test]
    fn test_partial_sections_keep_site_defaults() {
        let cfg = Config::from_toml(
            r#"
            watchlist = "tickers.csv"
            log_dir = "logs"

            [reddit]
            enabled = false

            [browser]
            settle_ms = 500
            window_size = [800, 600]
            "#,
        )
        .unwrap();
        assert_eq!(cfg.watchlist, PathBuf::from("tickers.csv"));
        assert_eq!(cfg.log_dir, Some(PathBuf::from("logs")));
        assert!(!cfg.reddit.enabled);
        assert_eq!(cfg.reddit.base_url, REDDIT_BASE_URL);
        assert_eq!(cfg.browser.settle_ms, 500);
        assert_eq!(cfg.browser.window_size, (800, 600));
        assert!(cfg.browser.headless);
        assert_eq!(cfg.hotcopper, HotCopperConfig::default());
    }

    #[test]
    fn test_invalid_toml_is_an_error() {
        assert!(Config::from_toml("watchlist = [").is_err());
    }

    #[test]
    fn test_explicit_missing_file_is_an_error() {
        let dir = tempfile::TempDir::new().unwrap();
        assert!(Config::load(Some(&dir.path().join("nope.toml"))).is_err());
    }
}
