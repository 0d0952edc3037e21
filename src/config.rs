use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::types::MoneylineWindow;
use crate::{KALSHI_API_URL, KALSHI_WEB_URL, ODDS_API_KEY_VAR, ODDS_API_URL};

/// Default config file path.
pub const CONFIG_PATH: &str = "config.toml";

/// Top-level application config deserialized from `config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub settings: SettingsConfig,
}

/// Runtime settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SettingsConfig {
    /// Kalshi market listing endpoint.
    #[serde(default = "default_kalshi_api_url")]
    pub kalshi_api_url: String,
    /// Base for market page links; the ticker is appended.
    #[serde(default = "default_kalshi_web_url")]
    pub kalshi_web_url: String,
    /// The Odds API per-sport base URL.
    #[serde(default = "default_odds_api_url")]
    pub odds_api_url: String,
    /// League identifiers to fetch odds for, in request order.
    #[serde(default = "default_leagues")]
    pub leagues: Vec<String>,
    /// Bookmaker region passed to the odds feed.
    #[serde(default = "default_regions")]
    pub regions: String,
    /// Markets keep only when `min_price_cents < yes_price < max_price_cents`.
    #[serde(default = "default_min_price_cents")]
    pub min_price_cents: i64,
    #[serde(default = "default_max_price_cents")]
    pub max_price_cents: i64,
    /// Optional lower-case substring a market title must contain (e.g. " win ").
    #[serde(default)]
    pub title_keyword: Option<String>,
    /// Moneyline range logged as highlights.
    #[serde(default = "default_highlight")]
    pub highlight: MoneylineWindow,
    /// Output file consumed by the website.
    #[serde(default = "default_output_path")]
    pub output_path: String,
}

fn default_kalshi_api_url() -> String {
    KALSHI_API_URL.to_string()
}

fn default_kalshi_web_url() -> String {
    KALSHI_WEB_URL.to_string()
}

fn default_odds_api_url() -> String {
    ODDS_API_URL.to_string()
}

fn default_leagues() -> Vec<String> {
    [
        "americanfootball_nfl",
        "basketball_nba",
        "baseball_mlb",
        "icehockey_nhl",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

fn default_regions() -> String {
    "us".to_string()
}

fn default_min_price_cents() -> i64 {
    0
}

fn default_max_price_cents() -> i64 {
    40
}

fn default_highlight() -> MoneylineWindow {
    MoneylineWindow { min: 100, max: 300 }
}

fn default_output_path() -> String {
    "opportunities.json".to_string()
}

impl Default for SettingsConfig {
    fn default() -> Self {
        Self {
            kalshi_api_url: default_kalshi_api_url(),
            kalshi_web_url: default_kalshi_web_url(),
            odds_api_url: default_odds_api_url(),
            leagues: default_leagues(),
            regions: default_regions(),
            min_price_cents: default_min_price_cents(),
            max_price_cents: default_max_price_cents(),
            title_keyword: None,
            highlight: default_highlight(),
            output_path: default_output_path(),
        }
    }
}

impl AppConfig {
    /// Load config from the given TOML file path.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let config: Self = toml::from_str(&contents)
            .with_context(|| format!("failed to parse {}", path.display()))?;
        Ok(config)
    }

    /// Load config if the file exists, otherwise fall back to defaults.
    ///
    /// A config that fails to parse is logged and replaced by defaults so a
    /// run still produces its output file.
    pub fn load_or_default(path: &Path) -> Self {
        if !path.exists() {
            info!("No {} found, using default settings", path.display());
            return Self::default();
        }
        match Self::load(path) {
            Ok(config) => {
                info!("Loaded config from {}", path.display());
                config
            }
            Err(e) => {
                warn!("{e:#}; using default settings");
                Self::default()
            }
        }
    }
}

/// Read The Odds API key from the environment. Empty values count as unset.
pub fn odds_api_key() -> Option<String> {
    std::env::var(ODDS_API_KEY_VAR)
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}
