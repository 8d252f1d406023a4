/*!
common/src/lib.rs

Shared configuration types for NewsMonitor.

This file provides:
- Config data structures (deserialized from TOML)
- An async loader that merges a default file with an optional override file
- Validation of the feed list (url is the natural key of a feed source)
*/

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

/// One configured RSS/Atom endpoint paired with its display label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedSource {
    pub url: String,
    /// Display label; may be empty.
    #[serde(default)]
    pub label: String,
}

impl FeedSource {
    pub fn new(url: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            label: label.into(),
        }
    }
}

/// Longest accepted lookback window, one century.
pub const MAX_LOOKBACK_HOURS: u64 = 24 * 366 * 100;

/// Recency window configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RecencyConfig {
    /// Entries published before `now - lookback_hours` are ignored
    pub lookback_hours: u64,
}

impl Default for RecencyConfig {
    fn default() -> Self {
        Self { lookback_hours: 18 }
    }
}

/// What to do with a title whose language could not be detected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UndetectedPolicy {
    /// Send it to the translation API, which detects the source itself
    Translate,
    /// Keep the title unchanged
    Keep,
}

/// Title translation configuration (LibreTranslate-compatible API)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TranslationConfig {
    pub enabled: bool,
    pub target_lang: String,
    /// Languages accepted as-is in addition to the target language
    pub bypass_langs: Vec<String>,
    pub api_url: String,
    /// Name of the environment variable holding the API key, if the endpoint needs one
    pub api_key_env: Option<String>,
    pub timeout_seconds: u64,
    pub on_undetected: UndetectedPolicy,
}

impl Default for TranslationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            target_lang: "en".to_string(),
            bypass_langs: vec!["zh".to_string()],
            api_url: "https://libretranslate.de/translate".to_string(),
            api_key_env: None,
            timeout_seconds: 10,
            on_undetected: UndetectedPolicy::Translate,
        }
    }
}

/// Full-text retrieval configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EnrichmentConfig {
    pub enabled: bool,
    /// Number of characters of body text kept for the excerpt
    pub excerpt_chars: usize,
    pub timeout_seconds: u64,
}

impl Default for EnrichmentConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            excerpt_chars: 150,
            timeout_seconds: 10,
        }
    }
}

/// Politeness / fetching configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PolitenessConfig {
    /// Pause between two feed sources, some feeds share hosting infrastructure
    pub delay_seconds: u64,
    pub fetch_timeout_seconds: u64,
    pub user_agent: String,
}

impl Default for PolitenessConfig {
    fn default() -> Self {
        Self {
            delay_seconds: 1,
            fetch_timeout_seconds: 30,
            user_agent: "NewsMonitor/0.1.0".to_string(),
        }
    }
}

/// What the run does when the seen-link snapshot cannot be written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PersistFailurePolicy {
    /// Log at error level and keep going with the in-memory set
    Continue,
    /// Stop after the failing feed and report the error
    Abort,
}

/// Seen-link state file configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StateConfig {
    /// Path to the JSON array of already processed links
    pub path: String,
    pub on_persist_failure: PersistFailurePolicy,
}

impl Default for StateConfig {
    fn default() -> Self {
        Self {
            path: "seen_articles.json".to_string(),
            on_persist_failure: PersistFailurePolicy::Continue,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    /// Log file appended to in addition to stdout
    pub file: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: Some("rss_monitoring.log".to_string()),
        }
    }
}

/// Top-level application configuration (deserialized from config.toml)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub feeds: Vec<FeedSource>,
    #[serde(default)]
    pub recency: RecencyConfig,
    #[serde(default)]
    pub translation: TranslationConfig,
    #[serde(default)]
    pub enrichment: EnrichmentConfig,
    #[serde(default)]
    pub politeness: PolitenessConfig,
    #[serde(default)]
    pub state: StateConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a TOML file asynchronously.
    ///
    /// Example:
    ///   let cfg = Config::from_file("config.toml").await?;
    pub async fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let data = tokio::fs::read_to_string(path.as_ref())
            .await
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;
        Self::from_toml_str(&data)
    }

    pub fn from_toml_str(data: &str) -> Result<Self> {
        let cfg: Config = toml::from_str(data).context("Failed to parse TOML configuration")?;
        Ok(cfg)
    }

    /// Load configuration with an optional default file and an optional override file.
    /// If both are present, they are merged (override takes precedence).
    pub async fn load_with_defaults(default_path: Option<&Path>, override_path: Option<&Path>) -> Result<Self> {
        let mut config_value = toml::Value::Table(toml::map::Map::new());

        for path in [default_path, override_path].into_iter().flatten() {
            if !path.exists() {
                continue;
            }
            let data = tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("Failed to read config: {}", path.display()))?;
            let val: toml::Value = toml::from_str(&data)
                .with_context(|| format!("Failed to parse configuration: {}", path.display()))?;
            merge_toml(&mut config_value, val);
        }

        let cfg: Config = config_value.try_into().context("Failed to parse merged configuration")?;
        Ok(cfg)
    }

    /// Reject feed lists the run cannot process deterministically.
    pub fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for feed in &self.feeds {
            url::Url::parse(&feed.url).with_context(|| format!("invalid feed url: {}", feed.url))?;
            if !seen.insert(feed.url.as_str()) {
                bail!("feed url configured twice: {}", feed.url);
            }
        }
        if self.translation.target_lang.trim().is_empty() {
            bail!("translation.target_lang must not be empty");
        }
        let lookback = self.recency.lookback_hours;
        if lookback == 0 || lookback > MAX_LOOKBACK_HOURS {
            bail!(
                "recency.lookback_hours must be between 1 and {}, got {}",
                MAX_LOOKBACK_HOURS,
                lookback
            );
        }
        for (key, seconds) in [
            ("translation.timeout_seconds", self.translation.timeout_seconds),
            ("enrichment.timeout_seconds", self.enrichment.timeout_seconds),
            ("politeness.fetch_timeout_seconds", self.politeness.fetch_timeout_seconds),
        ] {
            if seconds == 0 {
                bail!("{} must be greater than zero", key);
            }
        }
        Ok(())
    }
}

/// Deep-merge `b` into `a`. Arrays are replaced, not concatenated, so an
/// override file redefining `[[feeds]]` replaces the whole default list.
fn merge_toml(a: &mut toml::Value, b: toml::Value) {
    match (a, b) {
        (toml::Value::Table(a_map), toml::Value::Table(b_map)) => {
            for (k, v) in b_map {
                if let Some(a_val) = a_map.get_mut(&k) {
                    merge_toml(a_val, v);
                } else {
                    a_map.insert(k, v);
                }
            }
        }
        (a_val, b_val) => *a_val = b_val,
    }
}
