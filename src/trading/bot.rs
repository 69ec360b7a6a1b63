use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Local, Utc};
use rust_decimal::Decimal;
use std::collections::BTreeMap;
use tracing::{debug, error, info, warn};

use crate::config::{AppConfig, DcaAmounts, MarketConfig};
use crate::exchange::{Exchange, OrderRequest};
use crate::launcher::Bot;
use crate::sentiment::SentimentSource;
use crate::strategy::{mayer_multiple, BuyDecision, DcaSizer, MayerMultiple};

#[derive(Debug, Clone, PartialEq)]
pub struct PortfolioSummary {
    pub btc_balance: Decimal,
    pub btc_value: Decimal,
    pub quote_balance: Decimal,
    pub total_value: Decimal,
    pub price: Decimal,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PurchaseOutcome {
    Placed {
        order_id: String,
        status: String,
        btc_amount: Decimal,
        quote_amount: Decimal,
        price: Decimal,
    },
    /// Dry run: everything up to the order was done, the order was not sent.
    Simulated {
        btc_amount: Decimal,
        quote_amount: Decimal,
        price: Decimal,
    },
    BelowMinimum {
        amount: Decimal,
        min: Decimal,
    },
    InsufficientBalance {
        available: Decimal,
        required: Decimal,
    },
    Failed {
        reason: String,
    },
}

impl PurchaseOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Placed { .. } | Self::Simulated { .. })
    }
}

#[derive(Debug, Clone)]
pub struct RunReport {
    pub started_at: DateTime<Utc>,
    pub dry_run: bool,
    pub decision: BuyDecision,
    /// `None` when the ladder decided not to buy at all.
    pub outcome: Option<PurchaseOutcome>,
    pub portfolio: Option<PortfolioSummary>,
}

/// Weekly accumulation cycle: read indicators, size the buy, place it.
pub struct AccumulationBot<E, S> {
    exchange: E,
    sentiment: S,
    sizer: DcaSizer,
    market: MarketConfig,
    ma_period: usize,
    min_history: usize,
    dry_run: bool,
}

impl<E: Exchange, S: SentimentSource> AccumulationBot<E, S> {
    pub fn new(
        exchange: E,
        sentiment: S,
        amounts: DcaAmounts,
        dry_run: bool,
        config: &AppConfig,
    ) -> Self {
        Self {
            exchange,
            sentiment,
            sizer: DcaSizer::new(amounts, config.strategy.rules.clone()),
            market: config.market.clone(),
            ma_period: config.strategy.ma_period,
            min_history: config.strategy.min_history,
            dry_run,
        }
    }

    pub async fn current_price(&self) -> Result<Decimal> {
        let ticker = self
            .exchange
            .get_ticker(&self.market.market_id)
            .await
            .context("Failed to get current price")?;

        if ticker.last_price <= Decimal::ZERO {
            bail!("Exchange reported non-positive price {}", ticker.last_price);
        }

        debug!("Current {} price: {}", self.market.market_id, ticker.last_price);
        Ok(ticker.last_price)
    }

    pub async fn mayer_multiple(&self) -> Result<MayerMultiple> {
        let candles = self
            .exchange
            .get_candles(
                &self.market.market_id,
                &self.market.candle_window,
                self.market.candle_limit,
            )
            .await
            .context("Failed to fetch candles")?;

        // Exchange sends newest first
        let closes: Vec<Decimal> = candles.iter().rev().map(|c| c.close).collect();
        let price = self.current_price().await?;

        let mayer = mayer_multiple(&closes, price, self.ma_period, self.min_history)
            .context("Failed to calculate Mayer Multiple")?;

        info!("📊 {}-day MA: {:.2}", mayer.period, mayer.moving_average);
        info!("📊 Current Price: {:.2}", mayer.current_price);
        info!("📊 Mayer Multiple: {:.3}", mayer.value);

        Ok(mayer)
    }

    pub async fn calculate_buy_amount(&self) -> Result<BuyDecision> {
        let amounts = self.sizer.amounts();
        info!(
            "Buy bounds: min {:.2} / base {:.2} / max {:.2} {}",
            amounts.min, amounts.base, amounts.max, self.market.quote_asset
        );

        let mayer = self.mayer_multiple().await?;
        let fear_greed = self.sentiment.fear_greed_index().await;
        let decision = self.sizer.size(mayer.value, fear_greed);

        info!(
            "💰 Calculated buy amount: {:.2} {} (multiplier: {:.1}x)",
            decision.amount, self.market.quote_asset, decision.multiplier
        );

        Ok(decision)
    }

    /// Available balance per asset. A failed lookup is logged and yields
    /// an empty map, which downstream reads as zero.
    pub async fn account_balances(&self) -> BTreeMap<String, Decimal> {
        match self.exchange.get_balances().await {
            Ok(balances) => {
                let parsed: BTreeMap<String, Decimal> = balances
                    .iter()
                    .map(|b| (b.asset_name.clone(), b.available_decimal()))
                    .collect();
                debug!("Parsed {} account balances", parsed.len());
                parsed
            }
            Err(e) => {
                error!("Error getting account balance: {}", e);
                BTreeMap::new()
            }
        }
    }

    pub async fn portfolio_summary(&self) -> Option<PortfolioSummary> {
        let balances = self.account_balances().await;
        let price = match self.current_price().await {
            Ok(price) => price,
            Err(e) => {
                error!("Error getting portfolio summary: {:#}", e);
                return None;
            }
        };

        let btc_balance = balances
            .get(&self.market.base_asset)
            .copied()
            .unwrap_or_default();
        let quote_balance = balances
            .get(&self.market.quote_asset)
            .copied()
            .unwrap_or_default();
        let btc_value = btc_balance * price;

        Some(PortfolioSummary {
            btc_balance,
            btc_value,
            quote_balance,
            total_value: btc_value + quote_balance,
            price,
        })
    }

    /// Spends `amount` of quote currency on a market buy. Never errors:
    /// every failure is folded into the returned outcome.
    pub async fn execute_buy(&self, amount: Decimal) -> PurchaseOutcome {
        let min = self.sizer.amounts().min;
        if amount < min {
            info!("Amount {:.2} below minimum {:.2}, skipping", amount, min);
            return PurchaseOutcome::BelowMinimum { amount, min };
        }

        match self.try_execute_buy(amount).await {
            Ok(outcome) => outcome,
            Err(e) => {
                error!("❌ Order execution error: {:#}", e);
                PurchaseOutcome::Failed {
                    reason: format!("{e:#}"),
                }
            }
        }
    }

    async fn try_execute_buy(&self, amount: Decimal) -> Result<PurchaseOutcome> {
        let balances = self.account_balances().await;
        let available = balances
            .get(&self.market.quote_asset)
            .copied()
            .unwrap_or_default();

        if available < amount {
            warn!(
                "Insufficient {} balance: {:.2} < {:.2}",
                self.market.quote_asset, available, amount
            );
            return Ok(PurchaseOutcome::InsufficientBalance {
                available,
                required: amount,
            });
        }

        let price = self.current_price().await?;
        let btc_amount = (amount / price).round_dp(self.market.btc_precision);

        if self.dry_run {
            info!(
                "[DRY RUN] Would place market buy: {} {} (~{:.2} {}) at {:.2}",
                btc_amount, self.market.base_asset, amount, self.market.quote_asset, price
            );
            return Ok(PurchaseOutcome::Simulated {
                btc_amount,
                quote_amount: amount,
                price,
            });
        }

        info!(
            "🔄 Placing market buy order: {} {} (~{:.2} {})",
            btc_amount, self.market.base_asset, amount, self.market.quote_asset
        );

        let order = OrderRequest::market_buy(&self.market.market_id, btc_amount);
        match self.exchange.place_order(&order).await {
            Ok(response) => {
                info!(
                    "✅ Order placed successfully: ID={}, Status={}",
                    response.order_id, response.status
                );
                Ok(PurchaseOutcome::Placed {
                    order_id: response.order_id,
                    status: response.status,
                    btc_amount,
                    quote_amount: amount,
                    price,
                })
            }
            Err(e) => {
                error!("❌ Order failed: {}", e);
                Ok(PurchaseOutcome::Failed {
                    reason: e.to_string(),
                })
            }
        }
    }

    /// Public and private endpoint round trip.
    pub async fn test_connection(&self) -> Result<()> {
        info!("🔍 Testing API connection...");

        self.exchange
            .get_ticker(&self.market.market_id)
            .await
            .context("Public API test failed")?;

        let balances = self
            .exchange
            .get_balances()
            .await
            .context("Private API test failed")?;

        if balances.is_empty() {
            warn!("⚠️ API connection successful but no balances found");
        } else {
            info!(
                "✅ API connection test successful - found {} asset balances",
                balances.len()
            );
        }

        Ok(())
    }

    pub async fn run_once(&self) -> Result<RunReport> {
        let started_at = Utc::now();

        info!("{}", "=".repeat(70));
        info!("🚀 BTC Accumulation Bot v{}", env!("CARGO_PKG_VERSION"));
        info!(
            "⏰ Execution Time: {}",
            started_at.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S %:z")
        );
        info!(
            "🎯 Market: {}{}",
            self.market.market_id,
            if self.dry_run { " (DRY RUN)" } else { "" }
        );
        info!("{}", "=".repeat(70));

        let result = self.cycle(started_at).await;

        if let Err(e) = &result {
            error!("{}", "=".repeat(50));
            error!("🚨 CRITICAL ERROR: {:#}", e);
            error!("Please check the configuration and API credentials.");
            error!("{}", "=".repeat(50));
        }

        result
    }

    async fn cycle(&self, started_at: DateTime<Utc>) -> Result<RunReport> {
        self.test_connection()
            .await
            .context("API connection test failed")?;

        info!("📊 Calculating market signals...");
        let decision = self.calculate_buy_amount().await?;

        if let Some(portfolio) = self.portfolio_summary().await {
            self.log_portfolio("📋 CURRENT PORTFOLIO", &portfolio);
        }

        let outcome = if decision.should_buy() {
            info!("🎯 EXECUTING BUY STRATEGY");
            let outcome = self.execute_buy(decision.amount).await;
            self.log_outcome(&outcome);
            Some(outcome)
        } else {
            info!("⏸️ NO PURCHASE TODAY - waiting for a better entry point");
            None
        };

        let portfolio = self.portfolio_summary().await;
        if let Some(portfolio) = &portfolio {
            self.log_portfolio("📋 FINAL PORTFOLIO SUMMARY", portfolio);
        }

        info!("🏁 Bot execution completed successfully");

        Ok(RunReport {
            started_at,
            dry_run: self.dry_run,
            decision,
            outcome,
            portfolio,
        })
    }

    fn log_portfolio(&self, title: &str, p: &PortfolioSummary) {
        let quote = &self.market.quote_asset;
        info!("{}", "-".repeat(50));
        info!("{}", title);
        info!("🪙 {} Holdings: {:.8}", self.market.base_asset, p.btc_balance);
        info!("💰 {} Value: {:.2} {}", self.market.base_asset, p.btc_value, quote);
        info!("💵 {} Balance: {:.2}", quote, p.quote_balance);
        info!("📈 Total Portfolio: {:.2} {}", p.total_value, quote);
        info!("{}", "-".repeat(50));
    }

    fn log_outcome(&self, outcome: &PurchaseOutcome) {
        match outcome {
            PurchaseOutcome::Placed {
                order_id,
                status,
                btc_amount,
                quote_amount,
                price,
            } => {
                info!("✅ BTC PURCHASE SUCCESSFUL!");
                info!("📦 Purchased: {} {}", btc_amount, self.market.base_asset);
                info!("💵 Amount: {:.2} {}", quote_amount, self.market.quote_asset);
                info!("📊 Price: {:.2}", price);
                info!("🔗 Order ID: {} ({})", order_id, status);
            }
            PurchaseOutcome::Simulated { btc_amount, .. } => {
                info!("✅ DRY RUN complete - {} {} not bought", btc_amount, self.market.base_asset);
            }
            other => {
                error!("❌ BTC PURCHASE FAILED!");
                error!("🚨 Reason: {:?}", other);
            }
        }
    }
}

#[async_trait]
impl<E: Exchange, S: SentimentSource> Bot for AccumulationBot<E, S> {
    fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    async fn run(&mut self) -> Result<RunReport> {
        self.run_once().await
    }
}
