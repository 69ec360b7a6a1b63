use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, info};

use crate::config::DcaAmounts;

/// One rung of the sizing ladder. Every condition that is set must hold;
/// unset conditions are ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SizingRule {
    pub label: String,
    #[serde(default)]
    pub mayer_below: Option<Decimal>,
    #[serde(default)]
    pub mayer_above: Option<Decimal>,
    #[serde(default)]
    pub fear_greed_below: Option<u8>,
    pub multiplier: Decimal,
}

impl SizingRule {
    fn new(label: &str, multiplier: Decimal) -> Self {
        Self {
            label: label.to_string(),
            mayer_below: None,
            mayer_above: None,
            fear_greed_below: None,
            multiplier,
        }
    }

    fn below(mut self, mayer: Decimal) -> Self {
        self.mayer_below = Some(mayer);
        self
    }

    fn above(mut self, mayer: Decimal) -> Self {
        self.mayer_above = Some(mayer);
        self
    }

    fn fear_below(mut self, index: u8) -> Self {
        self.fear_greed_below = Some(index);
        self
    }

    pub fn matches(&self, mayer: Decimal, fear_greed: u8) -> bool {
        self.mayer_below.map_or(true, |t| mayer < t)
            && self.mayer_above.map_or(true, |t| mayer > t)
            && self.fear_greed_below.map_or(true, |t| fear_greed < t)
    }

    /// The stock ladder: buy harder the further below its long-run average
    /// the price sits, harder still in fearful markets, and taper off or
    /// stop when it runs far above.
    pub fn default_ladder() -> Vec<SizingRule> {
        vec![
            Self::new("PERFECT STORM", dec!(4.0)).below(dec!(0.8)).fear_below(25),
            Self::new("EXTREME OVERSOLD + FEAR", dec!(3.5)).below(dec!(0.8)).fear_below(35),
            Self::new("EXTREME OVERSOLD", dec!(3.0)).below(dec!(0.8)),
            Self::new("UNDERSOLD + FEAR", dec!(2.5)).below(dec!(1.0)).fear_below(30),
            Self::new("UNDERSOLD", dec!(1.8)).below(dec!(1.0)),
            Self::new("FAIR VALUE + FEAR", dec!(1.2)).below(dec!(1.2)).fear_below(40),
            Self::new("EXTREME BUBBLE", dec!(0.0)).above(dec!(2.4)),
            Self::new("OVERBOUGHT", dec!(0.2)).above(dec!(1.6)),
        ]
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BuyDecision {
    /// Quote-currency amount to spend; zero means sit this one out.
    pub amount: Decimal,
    pub multiplier: Decimal,
    pub signal: String,
    pub mayer: Decimal,
    pub fear_greed: u8,
}

impl BuyDecision {
    pub fn should_buy(&self) -> bool {
        self.amount > Decimal::ZERO
    }
}

impl fmt::Display for BuyDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} -> {:.2} (multiplier {:.1}x)",
            self.signal, self.amount, self.multiplier
        )
    }
}

pub struct DcaSizer {
    amounts: DcaAmounts,
    rules: Vec<SizingRule>,
}

impl DcaSizer {
    pub const FALLBACK_LABEL: &'static str = "FAIR VALUE";

    pub fn new(amounts: DcaAmounts, rules: Vec<SizingRule>) -> Self {
        Self { amounts, rules }
    }

    pub fn amounts(&self) -> &DcaAmounts {
        &self.amounts
    }

    pub fn size(&self, mayer: Decimal, fear_greed: u8) -> BuyDecision {
        let rule = self.rules.iter().find(|r| r.matches(mayer, fear_greed));

        let (label, multiplier, uses_sentiment) = match rule {
            Some(r) => (r.label.as_str(), r.multiplier, r.fear_greed_below.is_some()),
            None => (Self::FALLBACK_LABEL, Decimal::ONE, false),
        };

        let signal = if uses_sentiment {
            format!("{label}: Mayer {mayer:.3} + F&G {fear_greed}")
        } else {
            format!("{label}: Mayer {mayer:.3}")
        };

        let amount = self.clamp(self.amounts.base * multiplier, multiplier);

        debug!(
            "Sizing: base={}, multiplier={}, clamped={}",
            self.amounts.base, multiplier, amount
        );
        info!("Signal - {}", signal);

        BuyDecision {
            amount,
            multiplier,
            signal,
            mayer,
            fear_greed,
        }
    }

    /// Caps at `max`. The `min` floor applies only while the ladder still
    /// wants to buy; a zero multiplier stays at zero.
    fn clamp(&self, raw: Decimal, multiplier: Decimal) -> Decimal {
        let floor = if multiplier > Decimal::ZERO {
            self.amounts.min
        } else {
            Decimal::ZERO
        };

        raw.min(self.amounts.max).max(floor)
    }
}
