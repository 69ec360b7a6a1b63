mod env;
mod settings;

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::strategy::{SizingRule, StrategyError};

pub use env::EnvVars;
pub use settings::{
    DcaAmounts, ExchangeCredentials, SecretKey, Settings, API_KEY_VAR, API_SECRET_VAR,
    BASE_AMOUNT_VAR, DRY_RUN_VAR, MAX_AMOUNT_VAR, MIN_AMOUNT_VAR, PRIVATE_KEY_VAR,
    SENSITIVE_VARS,
};

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("env file not found: {}", path.display())]
    EnvFileNotFound { path: PathBuf },

    #[error("env file could not be read: {reason}")]
    EnvFileUnreadable { reason: String },

    #[error("malformed line in env file near '{key}' (column {column})")]
    MalformedLine { key: String, column: usize },

    #[error("missing required environment variables: {}", .0.join(", "))]
    MissingVariables(Vec<String>),

    #[error("BTCMARKETS_PRIVATE_KEY and BTCMARKETS_API_SECRET are both set with different values")]
    ConflictingSecrets,

    #[error("invalid value for {name}: {reason}")]
    InvalidValue { name: String, reason: String },
}

impl ConfigError {
    pub(crate) fn invalid(name: &str, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            name: name.to_string(),
            reason: reason.into(),
        }
    }
}

/// Non-secret tuning loaded from `config/default.toml`. Every section falls
/// back to built-in defaults, so an absent file is not an error.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub exchange: ExchangeConfig,
    pub market: MarketConfig,
    pub sentiment: SentimentConfig,
    pub strategy: StrategyConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ExchangeConfig {
    pub base_url: String,
    pub timeout_secs: u64,
}

impl Default for ExchangeConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.btcmarkets.net".to_string(),
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MarketConfig {
    pub market_id: String,
    pub base_asset: String,
    pub quote_asset: String,
    pub candle_window: String,
    pub candle_limit: u32,
    pub btc_precision: u32,
}

impl Default for MarketConfig {
    fn default() -> Self {
        Self {
            market_id: "BTC-AUD".to_string(),
            base_asset: "BTC".to_string(),
            quote_asset: "AUD".to_string(),
            candle_window: "1d".to_string(),
            candle_limit: 200,
            btc_precision: 8,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SentimentConfig {
    pub url: String,
    pub timeout_secs: u64,
    pub neutral_value: u8,
}

impl Default for SentimentConfig {
    fn default() -> Self {
        Self {
            url: "https://api.alternative.me/fng/".to_string(),
            timeout_secs: 10,
            neutral_value: 50,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StrategyConfig {
    /// Moving-average window for the Mayer Multiple, in candles.
    pub ma_period: usize,
    /// Fewer closes than this and the multiple is not computed at all.
    pub min_history: usize,
    pub rules: Vec<SizingRule>,
}

impl Default for StrategyConfig {
    fn default() -> Self {
        Self {
            ma_period: 200,
            min_history: 50,
            rules: SizingRule::default_ladder(),
        }
    }
}

impl StrategyConfig {
    pub fn validate(&self) -> Result<(), StrategyError> {
        if self.min_history == 0 || self.ma_period == 0 {
            return Err(StrategyError::InvalidConfig(
                "ma_period and min_history must be positive".to_string(),
            ));
        }

        for rule in &self.rules {
            if rule.multiplier.is_sign_negative() {
                return Err(StrategyError::InvalidConfig(format!(
                    "rule '{}' has negative multiplier {}",
                    rule.label, rule.multiplier
                )));
            }
            if rule.fear_greed_below.is_some_and(|v| v > 101) {
                return Err(StrategyError::InvalidConfig(format!(
                    "rule '{}' has fear_greed_below outside 0..=101",
                    rule.label
                )));
            }
        }

        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub file_enabled: bool,
    pub directory: String,
    pub file_prefix: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file_enabled: true,
            directory: "logs".to_string(),
            file_prefix: "btc_bot.log".to_string(),
        }
    }
}

impl AppConfig {
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::from(path.as_ref()).required(false))
            .build()
            .context("Failed to build configuration")?;

        let app: AppConfig = settings
            .try_deserialize()
            .context("Failed to deserialize configuration")?;

        app.strategy
            .validate()
            .context("Invalid strategy configuration")?;

        Ok(app)
    }
}
