use rust_decimal::Decimal;

use super::StrategyError;

/// Simple moving average over the last `period` prices (oldest first).
pub fn calculate_sma(prices: &[Decimal], period: usize) -> Option<Decimal> {
    if period == 0 || prices.len() < period {
        return None;
    }

    let sum: Decimal = prices.iter().rev().take(period).sum();
    Some(sum / Decimal::from(period))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MayerMultiple {
    pub value: Decimal,
    pub moving_average: Decimal,
    /// Candles actually averaged; shorter than the configured window while
    /// the market has less history.
    pub period: usize,
    pub current_price: Decimal,
}

/// Ratio of `current_price` to the moving average of `closes`.
///
/// `closes` are oldest first. At least `min_history` closes are required;
/// beyond that the window is `min(ma_period, closes.len())`.
pub fn mayer_multiple(
    closes: &[Decimal],
    current_price: Decimal,
    ma_period: usize,
    min_history: usize,
) -> Result<MayerMultiple, StrategyError> {
    if closes.len() < min_history {
        return Err(StrategyError::InsufficientHistory {
            available: closes.len(),
            required: min_history,
        });
    }

    if current_price <= Decimal::ZERO {
        return Err(StrategyError::NonPositivePrice(current_price));
    }

    let period = ma_period.min(closes.len());
    let moving_average = calculate_sma(closes, period).ok_or(StrategyError::InsufficientHistory {
        available: closes.len(),
        required: period,
    })?;

    if moving_average <= Decimal::ZERO {
        return Err(StrategyError::NonPositivePrice(moving_average));
    }

    Ok(MayerMultiple {
        value: current_price / moving_average,
        moving_average,
        period,
        current_price,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_calculate_sma() {
        let prices = vec![dec!(10), dec!(11), dec!(12), dec!(13), dec!(14)];
        let sma = calculate_sma(&prices, 3);
        assert_eq!(sma, Some(dec!(13))); // (12 + 13 + 14) / 3 = 13
    }

    #[test]
    fn test_calculate_sma_insufficient_data() {
        let prices = vec![dec!(10), dec!(11)];
        assert!(calculate_sma(&prices, 3).is_none());
        assert!(calculate_sma(&prices, 0).is_none());
    }

    #[test]
    fn test_mayer_multiple_uses_available_history() {
        // 60 closes at 100 followed by nothing else: window shrinks to 60.
        let closes = vec![dec!(100); 60];
        let mayer = mayer_multiple(&closes, dec!(80), 200, 50).unwrap();

        assert_eq!(mayer.period, 60);
        assert_eq!(mayer.moving_average, dec!(100));
        assert_eq!(mayer.value, dec!(0.8));
    }

    #[test]
    fn test_mayer_multiple_uses_most_recent_window() {
        let mut closes = vec![dec!(1000); 50];
        closes.extend(vec![dec!(200); 200]);

        let mayer = mayer_multiple(&closes, dec!(300), 200, 50).unwrap();
        assert_eq!(mayer.period, 200);
        assert_eq!(mayer.moving_average, dec!(200));
        assert_eq!(mayer.value, dec!(1.5));
    }

    #[test]
    fn test_mayer_multiple_insufficient_history() {
        let closes = vec![dec!(100); 49];
        let err = mayer_multiple(&closes, dec!(100), 200, 50).unwrap_err();

        assert!(matches!(
            err,
            StrategyError::InsufficientHistory {
                available: 49,
                required: 50
            }
        ));
    }

    #[test]
    fn test_mayer_multiple_rejects_zero_price() {
        let closes = vec![dec!(100); 50];
        assert!(matches!(
            mayer_multiple(&closes, dec!(0), 200, 50),
            Err(StrategyError::NonPositivePrice(_))
        ));
    }
}
