//! Application configuration structures.

use std::fs;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::models::SiteSelectors;

/// Root application configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Where modules are scraped from
    #[serde(default)]
    pub source: SourceConfig,

    /// HTTP client behavior
    #[serde(default)]
    pub crawler: CrawlerConfig,

    /// Refresh cadence and cache sizing
    #[serde(default)]
    pub refresh: RefreshConfig,

    /// Raw record normalization
    #[serde(default)]
    pub normalize: NormalizeConfig,

    /// Slash command integration
    #[serde(default)]
    pub slack: SlackConfig,

    /// HTTP listener
    #[serde(default)]
    pub server: ServerConfig,

    /// Listing and detail page selectors
    #[serde(default)]
    pub selectors: SiteSelectors,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Load configuration or return default if loading fails.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        Self::load(&path).unwrap_or_else(|e| {
            log::warn!(
                "Config load failed from {:?}: {}. Using defaults.",
                path.as_ref(),
                e
            );
            Self::default()
        })
    }

    /// Apply `MOTW_*` overrides from the process environment.
    pub fn apply_env(&mut self) -> Result<()> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary key lookup.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(url) = lookup("MOTW_BASE_URL") {
            self.source.base_url = url;
        }
        if let Some(secs) = lookup("MOTW_REFRESH_INTERVAL_SECS") {
            self.refresh.interval_secs = parse_env("MOTW_REFRESH_INTERVAL_SECS", &secs)?;
        }
        if let Some(capacity) = lookup("MOTW_CACHE_CAPACITY") {
            self.refresh.cache_capacity = parse_env("MOTW_CACHE_CAPACITY", &capacity)?;
        }
        if let Some(secs) = lookup("MOTW_CALLBACK_DELAY_SECS") {
            self.slack.callback_delay_secs = parse_env("MOTW_CALLBACK_DELAY_SECS", &secs)?;
        }
        if let Some(url) = lookup("MOTW_PUBLIC_BASE_URL") {
            self.slack.public_base_url = Some(url);
        }
        if let Some(client_id) = lookup("MOTW_SLACK_CLIENT_ID") {
            self.slack.client_id = client_id;
        }
        if let Some(bind) = lookup("MOTW_BIND") {
            self.server.bind = bind;
        }
        Ok(())
    }

    /// Validate configuration values for basic sanity.
    pub fn validate(&self) -> Result<()> {
        url::Url::parse(&self.source.base_url)
            .map_err(|e| AppError::validation(format!("source.base_url: {e}")))?;
        if self.crawler.user_agent.trim().is_empty() {
            return Err(AppError::validation("crawler.user_agent is empty"));
        }
        if self.crawler.timeout_secs == 0 {
            return Err(AppError::validation("crawler.timeout_secs must be > 0"));
        }
        if self.crawler.max_concurrent == 0 {
            return Err(AppError::validation("crawler.max_concurrent must be > 0"));
        }
        if self.refresh.interval_secs == 0 {
            return Err(AppError::validation("refresh.interval_secs must be > 0"));
        }
        if self.refresh.cache_capacity == 0 {
            return Err(AppError::validation("refresh.cache_capacity must be > 0"));
        }
        if self.normalize.date_formats.is_empty() {
            return Err(AppError::validation("normalize.date_formats is empty"));
        }
        if let Some(public) = &self.slack.public_base_url {
            url::Url::parse(public)
                .map_err(|e| AppError::validation(format!("slack.public_base_url: {e}")))?;
        }
        Ok(())
    }

    /// Base URL used to resolve relative image references in chat payloads.
    pub fn public_base_url(&self) -> &str {
        self.slack
            .public_base_url
            .as_deref()
            .unwrap_or(&self.source.base_url)
    }
}

fn parse_env<T: FromStr>(key: &str, value: &str) -> Result<T>
where
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e| AppError::config(format!("{key}={value:?}: {e}")))
}

/// Source site settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Listing page, also the root for image redirects
    #[serde(default = "defaults::base_url")]
    pub base_url: String,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            base_url: defaults::base_url(),
        }
    }
}

/// HTTP client and crawling behavior settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlerConfig {
    /// User-Agent header for HTTP requests
    #[serde(default = "defaults::user_agent")]
    pub user_agent: String,

    /// Request timeout in seconds
    #[serde(default = "defaults::timeout")]
    pub timeout_secs: u64,

    /// Maximum concurrent detail page requests
    #[serde(default = "defaults::max_concurrent")]
    pub max_concurrent: usize,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            user_agent: defaults::user_agent(),
            timeout_secs: defaults::timeout(),
            max_concurrent: defaults::max_concurrent(),
        }
    }
}

/// Refresh cycle settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshConfig {
    /// Seconds between scheduled refreshes
    #[serde(default = "defaults::interval")]
    pub interval_secs: u64,

    /// Maximum distinct module observations kept
    #[serde(default = "defaults::cache_capacity")]
    pub cache_capacity: usize,
}

impl RefreshConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            interval_secs: defaults::interval(),
            cache_capacity: defaults::cache_capacity(),
        }
    }
}

/// Normalization settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NormalizeConfig {
    /// chrono patterns accepted for raw dates, tried in order
    #[serde(default = "defaults::date_formats")]
    pub date_formats: Vec<String>,
}

impl Default for NormalizeConfig {
    fn default() -> Self {
        Self {
            date_formats: defaults::date_formats(),
        }
    }
}

/// Slash command settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlackConfig {
    /// Seconds to wait before posting to the response URL
    #[serde(default = "defaults::callback_delay")]
    pub callback_delay_secs: u64,

    /// Root for relative image references (defaults to `source.base_url`)
    #[serde(default)]
    pub public_base_url: Option<String>,

    /// Link target for a module title
    #[serde(default = "defaults::package_url_template")]
    pub package_url_template: String,

    /// OAuth client id for the install button
    #[serde(default)]
    pub client_id: String,
}

impl SlackConfig {
    pub fn callback_delay(&self) -> Duration {
        Duration::from_secs(self.callback_delay_secs)
    }
}

impl Default for SlackConfig {
    fn default() -> Self {
        Self {
            callback_delay_secs: defaults::callback_delay(),
            public_base_url: None,
            package_url_template: defaults::package_url_template(),
            client_id: String::new(),
        }
    }
}

/// HTTP listener settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Socket address to listen on
    #[serde(default = "defaults::bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: defaults::bind(),
        }
    }
}

mod defaults {
    // Source defaults
    pub fn base_url() -> String {
        "https://nmotw.in/".into()
    }

    // Crawler defaults
    pub fn user_agent() -> String {
        "Mozilla/5.0 (compatible; motw/0.1)".into()
    }
    pub fn timeout() -> u64 {
        30
    }
    pub fn max_concurrent() -> usize {
        5
    }

    // Refresh defaults
    pub fn interval() -> u64 {
        10 * 60
    }
    pub fn cache_capacity() -> usize {
        500
    }

    // Normalize defaults
    pub fn date_formats() -> Vec<String> {
        vec!["%Y %b %d".into(), "%b %d %Y".into(), "%b %d, %Y".into()]
    }

    // Slack defaults
    pub fn callback_delay() -> u64 {
        5
    }
    pub fn package_url_template() -> String {
        "https://www.npmjs.com/package/{name}".into()
    }

    // Server defaults
    pub fn bind() -> String {
        "0.0.0.0:3000".into()
    }
}
