use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use hmac::{Hmac, Mac};
use reqwest::{Client, Method};
use serde::de::DeserializeOwned;
use sha2::Sha512;
use std::time::Duration;
use tracing::{debug, instrument};
use url::Url;

use crate::config::{ExchangeConfig, ExchangeCredentials};

use super::models::*;
use super::{Exchange, ExchangeError};

type HmacSha512 = Hmac<Sha512>;

const USER_AGENT: &str = concat!("btc-accumulator/", env!("CARGO_PKG_VERSION"));

/// BTCMarkets v3 REST client. Every request is signed, public endpoints
/// included, which doubles as a credential check.
pub struct BtcMarketsClient {
    client: Client,
    credentials: ExchangeCredentials,
    base_url: Url,
}

impl BtcMarketsClient {
    pub fn new(
        credentials: ExchangeCredentials,
        config: &ExchangeConfig,
    ) -> Result<Self, ExchangeError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(USER_AGENT)
            .build()?;

        let base_url = Url::parse(&config.base_url)?;

        Ok(Self {
            client,
            credentials,
            base_url,
        })
    }

    fn timestamp() -> String {
        chrono::Utc::now().timestamp_millis().to_string()
    }

    /// base64(HMAC-SHA512(secret, message))
    fn sign(&self, message: &str) -> Result<String, ExchangeError> {
        let mut mac = HmacSha512::new_from_slice(self.credentials.private_key.expose())
            .map_err(|_| ExchangeError::InvalidSecret)?;
        mac.update(message.as_bytes());
        Ok(STANDARD.encode(mac.finalize().into_bytes()))
    }

    fn url(&self, path: &str, query: &[(&str, String)]) -> Result<Url, ExchangeError> {
        let mut url = self.base_url.join(path)?;
        if !query.is_empty() {
            url.query_pairs_mut()
                .extend_pairs(query.iter().map(|(k, v)| (*k, v.as_str())));
        }
        Ok(url)
    }

    /// The signed message is `METHOD + path + timestamp + body`; the query
    /// string is not part of it.
    #[instrument(skip(self, query, body))]
    async fn request<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, String)],
        body: Option<String>,
    ) -> Result<T, ExchangeError> {
        let url = self.url(path, query)?;
        let timestamp = Self::timestamp();

        let mut message = format!("{}{}{}", method.as_str(), path, timestamp);
        if let Some(body) = &body {
            message.push_str(body);
        }
        let signature = self.sign(&message)?;

        debug!("Sending {} {}", method, url);

        let mut request = self
            .client
            .request(method, url)
            .header("Accept", "application/json")
            .header("Accept-Charset", "UTF-8")
            .header("Content-Type", "application/json")
            .header("BM-AUTH-APIKEY", &self.credentials.api_key)
            .header("BM-AUTH-TIMESTAMP", &timestamp)
            .header("BM-AUTH-SIGNATURE", signature);

        if let Some(body) = body {
            request = request.body(body);
        }

        let response = request.send().await?;
        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            return Err(ExchangeError::from_response(status.as_u16(), &text));
        }

        serde_json::from_str(&text).map_err(|source| ExchangeError::Decode {
            context: path.to_string(),
            source,
        })
    }
}

#[async_trait]
impl Exchange for BtcMarketsClient {
    async fn get_ticker(&self, market_id: &str) -> Result<Ticker, ExchangeError> {
        let path = format!("/v3/markets/{market_id}/ticker");
        self.request(Method::GET, &path, &[], None).await
    }

    async fn get_candles(
        &self,
        market_id: &str,
        time_window: &str,
        limit: u32,
    ) -> Result<Vec<Candle>, ExchangeError> {
        let path = format!("/v3/markets/{market_id}/candles");
        let query = [
            ("timeWindow", time_window.to_string()),
            ("limit", limit.to_string()),
        ];

        let rows: Vec<Vec<String>> = self.request(Method::GET, &path, &query, None).await?;
        rows.iter().map(|row| Candle::from_row(row)).collect()
    }

    async fn get_balances(&self) -> Result<Vec<AssetBalance>, ExchangeError> {
        self.request(Method::GET, "/v3/accounts/me/balances", &[], None)
            .await
    }

    async fn place_order(&self, order: &OrderRequest) -> Result<OrderResponse, ExchangeError> {
        let body = serde_json::to_string(order).map_err(|source| ExchangeError::Decode {
            context: "order request".to_string(),
            source,
        })?;

        debug!("Placing order: {:?}", order);
        self.request(Method::POST, "/v3/orders", &[], Some(body))
            .await
    }

    async fn get_orders(&self, filter: OrderFilter) -> Result<Vec<OrderResponse>, ExchangeError> {
        let query = [("status", filter.as_str().to_string())];
        self.request(Method::GET, "/v3/orders", &query, None).await
    }

    async fn cancel_order(&self, order_id: &str) -> Result<CancelOrderResponse, ExchangeError> {
        let path = format!("/v3/orders/{order_id}");
        self.request(Method::DELETE, &path, &[], None).await
    }
}
