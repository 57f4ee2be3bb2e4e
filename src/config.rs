use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use crate::constants::{DEFAULT_SEARCH_URL_TEMPLATE, QUERY_PLACEHOLDER};
use crate::extract::CollectLimits;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),
    #[error("invalid value for {name}: {message}")]
    InvalidValue { name: String, message: String },
    #[error("failed to parse {name} as integer: {source}")]
    ParseInt {
        name: String,
        #[source]
        source: std::num::ParseIntError,
    },
    #[error("failed to parse {name} as number: {value}")]
    ParseFloat { name: String, value: String },
    #[error("failed to parse {name} as boolean: {value}")]
    ParseBool { name: String, value: String },
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config file: {0}")]
    Toml(#[from] toml::de::Error),
}

/// Application configuration.
#[derive(Debug, Clone)]
pub struct Config {
    // Queries
    pub keywords: Vec<String>,
    pub search_url_template: String,

    // Scrape limits
    pub max_items: usize,
    pub max_scrolls: usize,
    pub min_recent_hours: u32,
    pub query_pause: Duration,

    // Browser
    pub headless: bool,
    pub proxy: Option<String>,
    pub chrome_path: Option<String>,
    pub page_timeout: Duration,

    // Storage
    pub database_path: PathBuf,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if required environment variables are missing or invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            // Queries
            keywords: parse_keywords(&required_env("KEYWORDS")?),
            search_url_template: env_or_default(
                "SEARCH_URL_TEMPLATE",
                DEFAULT_SEARCH_URL_TEMPLATE,
            ),

            // Scrape limits
            max_items: parse_env_usize("MAX_ITEMS", defaults::MAX_ITEMS)?,
            max_scrolls: parse_env_usize("MAX_SCROLLS", defaults::MAX_SCROLLS)?,
            min_recent_hours: parse_env_u32("MIN_RECENT_HOURS", defaults::MIN_RECENT_HOURS)?,
            query_pause: Duration::from_secs_f64(parse_env_f64(
                "QUERY_PAUSE_SECS",
                defaults::QUERY_PAUSE_SECS,
            )?),

            // Browser
            headless: parse_env_bool("HEADLESS", true)?,
            proxy: optional_env("PROXY"),
            chrome_path: optional_env("CHROME_PATH"),
            page_timeout: Duration::from_secs(parse_env_u64(
                "PAGE_TIMEOUT_SECS",
                defaults::PAGE_TIMEOUT_SECS,
            )?),

            // Storage
            database_path: PathBuf::from(env_or_default(
                "DATABASE_PATH",
                defaults::DATABASE_PATH,
            )),
        })
    }

    /// Load configuration from a TOML file.
    ///
    /// Missing sections and keys fall back to the same defaults as [`Config::from_env`].
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not valid TOML.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&raw)
    }

    /// Parse configuration from TOML text.
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not valid TOML or has the wrong shape.
    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        let file: FileConfig = toml::from_str(raw)?;
        if !file.scrape.window_seconds.is_finite() || file.scrape.window_seconds < 0.0 {
            return Err(ConfigError::InvalidValue {
                name: "scrape.window_seconds".to_string(),
                message: "must be a non-negative number".to_string(),
            });
        }
        Ok(Self {
            keywords: file
                .keywords
                .into_iter()
                .map(|k| k.trim().to_string())
                .filter(|k| !k.is_empty())
                .collect(),
            search_url_template: file.scrape.search_url_template,
            max_items: file.scrape.max_tweets,
            max_scrolls: file.scrape.max_scrolls,
            min_recent_hours: file.scrape.min_recent_hours,
            query_pause: Duration::from_secs_f64(file.scrape.window_seconds),
            headless: file.browser.headless,
            proxy: file.browser.proxy.filter(|s| !s.is_empty()),
            chrome_path: file.browser.chrome_path.filter(|s| !s.is_empty()),
            page_timeout: Duration::from_secs(file.browser.page_timeout_secs),
            database_path: file.storage.database_path,
        })
    }

    /// Load from `CONFIG_PATH` when it is set, otherwise from the environment.
    ///
    /// # Errors
    ///
    /// Returns an error if the chosen source is missing or invalid.
    pub fn load() -> Result<Self, ConfigError> {
        match optional_env("CONFIG_PATH") {
            Some(path) => Self::from_file(Path::new(&path)),
            None => Self::from_env(),
        }
    }

    /// Validate that the configuration is usable.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.keywords.is_empty() {
            return Err(ConfigError::InvalidValue {
                name: "KEYWORDS".to_string(),
                message: "at least one keyword is required".to_string(),
            });
        }
        if self.max_items == 0 {
            return Err(ConfigError::InvalidValue {
                name: "MAX_ITEMS".to_string(),
                message: "must be at least 1".to_string(),
            });
        }
        if self.max_scrolls == 0 {
            return Err(ConfigError::InvalidValue {
                name: "MAX_SCROLLS".to_string(),
                message: "must be at least 1".to_string(),
            });
        }
        if self.page_timeout.is_zero() {
            return Err(ConfigError::InvalidValue {
                name: "PAGE_TIMEOUT_SECS".to_string(),
                message: "must be at least 1".to_string(),
            });
        }
        if !self.search_url_template.contains(QUERY_PLACEHOLDER) {
            return Err(ConfigError::InvalidValue {
                name: "SEARCH_URL_TEMPLATE".to_string(),
                message: format!("must contain the {QUERY_PLACEHOLDER} placeholder"),
            });
        }
        Ok(())
    }

    /// Per-query collection limits.
    #[must_use]
    pub fn limits(&self) -> CollectLimits {
        CollectLimits {
            max_items: self.max_items,
            max_scrolls: self.max_scrolls,
            min_recent_hours: self.min_recent_hours,
        }
    }

    /// Configuration suitable for tests: one keyword, defaults everywhere else.
    #[must_use]
    pub fn for_testing() -> Self {
        Self {
            keywords: vec!["#rust".to_string()],
            search_url_template: DEFAULT_SEARCH_URL_TEMPLATE.to_string(),
            max_items: defaults::MAX_ITEMS,
            max_scrolls: defaults::MAX_SCROLLS,
            min_recent_hours: defaults::MIN_RECENT_HOURS,
            query_pause: Duration::ZERO,
            headless: true,
            proxy: None,
            chrome_path: None,
            page_timeout: Duration::from_secs(defaults::PAGE_TIMEOUT_SECS),
            database_path: PathBuf::from(defaults::DATABASE_PATH),
        }
    }
}

mod defaults {
    pub const MAX_ITEMS: usize = 1000;
    pub const MAX_SCROLLS: usize = 200;
    pub const MIN_RECENT_HOURS: u32 = 24;
    pub const QUERY_PAUSE_SECS: f64 = 2.0;
    pub const PAGE_TIMEOUT_SECS: u64 = 60;
    pub const DATABASE_PATH: &str = "./data/posts.sqlite";

    pub fn max_items() -> usize {
        MAX_ITEMS
    }
    pub fn max_scrolls() -> usize {
        MAX_SCROLLS
    }
    pub fn min_recent_hours() -> u32 {
        MIN_RECENT_HOURS
    }
    pub fn query_pause_secs() -> f64 {
        QUERY_PAUSE_SECS
    }
    pub fn page_timeout_secs() -> u64 {
        PAGE_TIMEOUT_SECS
    }
    pub fn database_path() -> std::path::PathBuf {
        std::path::PathBuf::from(DATABASE_PATH)
    }
    pub fn search_url_template() -> String {
        crate::constants::DEFAULT_SEARCH_URL_TEMPLATE.to_string()
    }
    pub const fn yes() -> bool {
        true
    }
}

/// On-disk layout of the TOML config file.
#[derive(Debug, Deserialize)]
struct FileConfig {
    keywords: Vec<String>,
    #[serde(default)]
    scrape: ScrapeSection,
    #[serde(default)]
    browser: BrowserSection,
    #[serde(default)]
    storage: StorageSection,
}

#[derive(Debug, Deserialize)]
struct ScrapeSection {
    #[serde(default = "defaults::max_items")]
    max_tweets: usize,
    #[serde(default = "defaults::max_scrolls")]
    max_scrolls: usize,
    #[serde(default = "defaults::min_recent_hours")]
    min_recent_hours: u32,
    #[serde(default = "defaults::query_pause_secs")]
    window_seconds: f64,
    #[serde(default = "defaults::search_url_template")]
    search_url_template: String,
}

impl Default for ScrapeSection {
    fn default() -> Self {
        Self {
            max_tweets: defaults::MAX_ITEMS,
            max_scrolls: defaults::MAX_SCROLLS,
            min_recent_hours: defaults::MIN_RECENT_HOURS,
            window_seconds: defaults::QUERY_PAUSE_SECS,
            search_url_template: defaults::search_url_template(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct BrowserSection {
    #[serde(default = "defaults::yes")]
    headless: bool,
    #[serde(default)]
    proxy: Option<String>,
    #[serde(default)]
    chrome_path: Option<String>,
    #[serde(default = "defaults::page_timeout_secs")]
    page_timeout_secs: u64,
}

impl Default for BrowserSection {
    fn default() -> Self {
        Self {
            headless: true,
            proxy: None,
            chrome_path: None,
            page_timeout_secs: defaults::PAGE_TIMEOUT_SECS,
        }
    }
}

#[derive(Debug, Deserialize)]
struct StorageSection {
    #[serde(default = "defaults::database_path")]
    database_path: PathBuf,
}

impl Default for StorageSection {
    fn default() -> Self {
        Self {
            database_path: defaults::database_path(),
        }
    }
}

fn required_env(name: &str) -> Result<String, ConfigError> {
    std::env::var(name).map_err(|_| ConfigError::MissingEnvVar(name.to_string()))
}

fn optional_env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|s| !s.is_empty())
}

fn env_or_default(name: &str, default: &str) -> String {
    std::env::var(name)
        .ok()
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn parse_env_u64(name: &str, default: u64) -> Result<u64, ConfigError> {
    match std::env::var(name) {
        Ok(val) if !val.is_empty() => val.parse().map_err(|e| ConfigError::ParseInt {
            name: name.to_string(),
            source: e,
        }),
        _ => Ok(default),
    }
}

fn parse_env_u32(name: &str, default: u32) -> Result<u32, ConfigError> {
    match std::env::var(name) {
        Ok(val) if !val.is_empty() => val.parse().map_err(|e| ConfigError::ParseInt {
            name: name.to_string(),
            source: e,
        }),
        _ => Ok(default),
    }
}

fn parse_env_usize(name: &str, default: usize) -> Result<usize, ConfigError> {
    match std::env::var(name) {
        Ok(val) if !val.is_empty() => val.parse().map_err(|e| ConfigError::ParseInt {
            name: name.to_string(),
            source: e,
        }),
        _ => Ok(default),
    }
}

fn parse_env_f64(name: &str, default: f64) -> Result<f64, ConfigError> {
    match std::env::var(name) {
        Ok(val) if !val.is_empty() => match val.parse::<f64>() {
            Ok(v) if v.is_finite() && v >= 0.0 => Ok(v),
            _ => Err(ConfigError::ParseFloat {
                name: name.to_string(),
                value: val,
            }),
        },
        _ => Ok(default),
    }
}

fn parse_env_bool(name: &str, default: bool) -> Result<bool, ConfigError> {
    match std::env::var(name) {
        Ok(val) if !val.is_empty() => match val.to_lowercase().as_str() {
            "true" | "1" | "yes" | "on" => Ok(true),
            "false" | "0" | "no" | "off" => Ok(false),
            _ => Err(ConfigError::ParseBool {
                name: name.to_string(),
                value: val,
            }),
        },
        _ => Ok(default),
    }
}

/// Split a comma-separated keyword list, dropping blanks.
fn parse_keywords(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .map(str::to_string)
        .collect()
}
