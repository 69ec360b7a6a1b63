mod indicators;
mod sizing;

use rust_decimal::Decimal;
use thiserror::Error;

pub use indicators::{calculate_sma, mayer_multiple, MayerMultiple};
pub use sizing::{BuyDecision, DcaSizer, SizingRule};

#[derive(Error, Debug)]
pub enum StrategyError {
    #[error("Insufficient price data: only {available} candles available, need {required}")]
    InsufficientHistory { available: usize, required: usize },

    #[error("Price must be positive, got {0}")]
    NonPositivePrice(Decimal),

    #[error("Invalid strategy configuration: {0}")]
    InvalidConfig(String),
}
