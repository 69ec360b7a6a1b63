use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use tracing::warn;

use super::ExchangeError;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ticker {
    pub market_id: String,
    pub last_price: Decimal,
    #[serde(default)]
    pub best_bid: Option<Decimal>,
    #[serde(default)]
    pub best_ask: Option<Decimal>,
    #[serde(default)]
    pub volume24h: Option<Decimal>,
    #[serde(default)]
    pub timestamp: Option<String>,
}

/// One OHLCV row. The API sends `[time, open, high, low, close, volume]`
/// as strings, newest row first.
#[derive(Debug, Clone, PartialEq)]
pub struct Candle {
    pub time: String,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
    pub volume: Decimal,
}

impl Candle {
    pub fn from_row(row: &[String]) -> Result<Self, ExchangeError> {
        if row.len() < 6 {
            return Err(ExchangeError::Malformed(format!(
                "candle row has {} fields, expected 6",
                row.len()
            )));
        }

        let field = |i: usize, name: &str| {
            Decimal::from_str(&row[i]).map_err(|e| {
                ExchangeError::Malformed(format!("candle {name} '{}': {e}", row[i]))
            })
        };

        Ok(Self {
            time: row[0].clone(),
            open: field(1, "open")?,
            high: field(2, "high")?,
            low: field(3, "low")?,
            close: field(4, "close")?,
            volume: field(5, "volume")?,
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetBalance {
    pub asset_name: String,
    #[serde(default)]
    pub balance: Option<String>,
    #[serde(default)]
    pub available: Option<String>,
    #[serde(default)]
    pub locked: Option<String>,
}

impl AssetBalance {
    /// Spendable amount, falling back to the total balance. Unparseable
    /// values count as zero.
    pub fn available_decimal(&self) -> Decimal {
        let raw = self
            .available
            .as_deref()
            .or(self.balance.as_deref())
            .unwrap_or("0");

        Decimal::from_str(raw).unwrap_or_else(|e| {
            warn!("Could not parse balance for {}: {} - {}", self.asset_name, raw, e);
            Decimal::ZERO
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderSide {
    Bid,
    Ask,
}

impl std::fmt::Display for OrderSide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrderSide::Bid => write!(f, "Bid"),
            OrderSide::Ask => write!(f, "Ask"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderType {
    Market,
    Limit,
}

impl std::fmt::Display for OrderType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrderType::Market => write!(f, "Market"),
            OrderType::Limit => write!(f, "Limit"),
        }
    }
}

/// Body of `POST /v3/orders`. Amounts go over the wire as strings.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderRequest {
    pub market_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<Decimal>,
    pub amount: Decimal,
    #[serde(rename = "type")]
    pub order_type: OrderType,
    pub side: OrderSide,
}

impl OrderRequest {
    pub fn market_buy(market_id: &str, amount: Decimal) -> Self {
        Self {
            market_id: market_id.to_string(),
            price: None,
            amount,
            order_type: OrderType::Market,
            side: OrderSide::Bid,
        }
    }

    pub fn limit_buy(market_id: &str, amount: Decimal, price: Decimal) -> Self {
        Self {
            market_id: market_id.to_string(),
            price: Some(price),
            amount,
            order_type: OrderType::Limit,
            side: OrderSide::Bid,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderResponse {
    pub order_id: String,
    pub market_id: String,
    pub side: String,
    #[serde(rename = "type")]
    pub order_type: String,
    #[serde(default)]
    pub creation_time: Option<String>,
    #[serde(default)]
    pub price: Option<String>,
    pub amount: String,
    #[serde(default)]
    pub open_amount: Option<String>,
    pub status: String,
}

/// Status filter for `GET /v3/orders`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderFilter {
    Open,
    All,
}

impl OrderFilter {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderFilter::Open => "open",
            OrderFilter::All => "all",
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CancelOrderResponse {
    pub order_id: String,
    #[serde(default)]
    pub client_order_id: Option<String>,
}

/// Error body returned with non-2xx responses.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorBody {
    pub code: String,
    #[serde(default)]
    pub message: String,
}
