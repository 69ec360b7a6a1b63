mod bot;

use anyhow::{Context, Result};

use crate::config::{AppConfig, Settings};
use crate::exchange::BtcMarketsClient;
use crate::launcher::BotFactory;
use crate::sentiment::FearGreedClient;

pub use bot::{AccumulationBot, PortfolioSummary, PurchaseOutcome, RunReport};

pub type LiveBot = AccumulationBot<BtcMarketsClient, FearGreedClient>;

/// Builds a bot wired to BTCMarkets and alternative.me.
pub struct LiveBotFactory {
    config: AppConfig,
}

impl LiveBotFactory {
    pub fn new(config: AppConfig) -> Self {
        Self { config }
    }
}

impl BotFactory for LiveBotFactory {
    type Bot = LiveBot;

    fn build(&self, settings: Settings) -> Result<Self::Bot> {
        let Settings {
            credentials,
            amounts,
            dry_run,
        } = settings;

        let exchange = BtcMarketsClient::new(credentials, &self.config.exchange)
            .context("Failed to create exchange client")?;
        let sentiment = FearGreedClient::new(&self.config.sentiment)
            .context("Failed to create sentiment client")?;

        Ok(AccumulationBot::new(
            exchange,
            sentiment,
            amounts,
            dry_run,
            &self.config,
        ))
    }
}
