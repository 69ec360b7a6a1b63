use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};

use crate::config::SentimentConfig;

#[derive(Error, Debug)]
pub enum SentimentError {
    #[error("request timed out")]
    Timeout,

    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("parse error: {0}")]
    Parse(String),
}

/// Source of the 0-100 Fear & Greed reading. Implementations never fail:
/// any problem degrades to a neutral reading.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SentimentSource: Send + Sync {
    async fn fear_greed_index(&self) -> u8;
}

#[derive(Debug, Deserialize)]
struct FngResponse {
    data: Vec<FngEntry>,
}

#[derive(Debug, Deserialize)]
struct FngEntry {
    value: String,
    #[serde(default)]
    value_classification: Option<String>,
}

/// Client for the alternative.me Fear & Greed endpoint.
pub struct FearGreedClient {
    client: Client,
    url: String,
    neutral: u8,
}

impl FearGreedClient {
    pub fn new(config: &SentimentConfig) -> Result<Self, SentimentError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            url: config.url.clone(),
            neutral: config.neutral_value,
        })
    }

    pub async fn fetch(&self) -> Result<u8, SentimentError> {
        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| {
                if e.is_timeout() {
                    SentimentError::Timeout
                } else {
                    SentimentError::Network(e)
                }
            })?;

        let body: FngResponse = response
            .json()
            .await
            .map_err(|e| SentimentError::Parse(e.to_string()))?;

        let entry = body
            .data
            .first()
            .ok_or_else(|| SentimentError::Parse("empty data array".to_string()))?;

        let value: u8 = entry
            .value
            .trim()
            .parse()
            .map_err(|_| SentimentError::Parse(format!("'{}' is not an index value", entry.value)))?;

        if value > 100 {
            return Err(SentimentError::Parse(format!("{value} is outside 0-100")));
        }

        info!(
            "😱 Fear & Greed Index: {} ({})",
            value,
            entry.value_classification.as_deref().unwrap_or("unclassified")
        );
        Ok(value)
    }
}

#[async_trait]
impl SentimentSource for FearGreedClient {
    async fn fear_greed_index(&self) -> u8 {
        match self.fetch().await {
            Ok(value) => value,
            Err(e) => {
                warn!("Fear & Greed Index {} - using neutral value {}", e, self.neutral);
                self.neutral
            }
        }
    }
}
