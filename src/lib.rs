pub mod config;
pub mod exchange;
pub mod launcher;
pub mod sentiment;
pub mod strategy;
pub mod telemetry;
pub mod trading;

pub use config::{AppConfig, ConfigError, EnvVars, Settings};
pub use launcher::{Bot, BotFactory, LaunchError, Launcher};
pub use trading::{LiveBotFactory, RunReport};
