mod btcmarkets;
mod models;

use async_trait::async_trait;
use thiserror::Error;

pub use btcmarkets::BtcMarketsClient;
pub use models::*;

#[derive(Error, Debug)]
pub enum ExchangeError {
    #[error("HTTP transport error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error {status} {code}: {message}")]
    Api {
        status: u16,
        code: String,
        message: String,
    },

    #[error("Failed to decode {context} response: {source}")]
    Decode {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Malformed response: {0}")]
    Malformed(String),

    #[error("Invalid request URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("Invalid signing key")]
    InvalidSecret,
}

impl ExchangeError {
    /// Builds an `Api` error from a non-2xx body, falling back to the raw
    /// text when it is not the usual `{code, message}` shape.
    pub fn from_response(status: u16, body: &str) -> Self {
        match serde_json::from_str::<ApiErrorBody>(body) {
            Ok(err) => Self::Api {
                status,
                code: err.code,
                message: err.message,
            },
            Err(_) => Self::Api {
                status,
                code: "Unknown".to_string(),
                message: body.chars().take(200).collect(),
            },
        }
    }
}

/// Exchange operations the accumulation bot depends on.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Exchange: Send + Sync {
    async fn get_ticker(&self, market_id: &str) -> Result<Ticker, ExchangeError>;

    /// Candles newest first, as the exchange returns them.
    async fn get_candles(
        &self,
        market_id: &str,
        time_window: &str,
        limit: u32,
    ) -> Result<Vec<Candle>, ExchangeError>;

    async fn get_balances(&self) -> Result<Vec<AssetBalance>, ExchangeError>;

    async fn place_order(&self, order: &OrderRequest) -> Result<OrderResponse, ExchangeError>;

    async fn get_orders(&self, filter: OrderFilter) -> Result<Vec<OrderResponse>, ExchangeError>;

    async fn cancel_order(&self, order_id: &str) -> Result<CancelOrderResponse, ExchangeError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_from_api_body() {
        let err = ExchangeError::from_response(
            400,
            r#"{"code":"InsufficientFund","message":"insufficient funds"}"#,
        );

        match err {
            ExchangeError::Api {
                status,
                code,
                message,
            } => {
                assert_eq!(status, 400);
                assert_eq!(code, "InsufficientFund");
                assert_eq!(message, "insufficient funds");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_error_from_unstructured_body() {
        let err = ExchangeError::from_response(502, "Bad Gateway");
        assert!(matches!(err, ExchangeError::Api { status: 502, ref code, .. } if code == "Unknown"));
    }
}
