use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info, warn};

use btc_accumulator::{
    config::{AppConfig, LoggingConfig},
    telemetry, Launcher, LiveBotFactory,
};

#[derive(Parser, Debug)]
#[command(name = "btc-accumulator")]
#[command(about = "Weekly BTC accumulation using Mayer Multiple and Fear & Greed weighted DCA")]
struct Args {
    /// Env file holding exchange credentials and purchase amounts
    #[arg(long, default_value = ".env")]
    env_file: PathBuf,

    /// Path to the strategy/tuning configuration file
    #[arg(short, long, default_value = "config/default.toml")]
    config: PathBuf,

    /// Compute everything but do not place the order (same as DRY_RUN=1)
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    let (config, config_error) = match AppConfig::load_from_path(&args.config) {
        Ok(config) => (config, None),
        Err(e) => (AppConfig::default(), Some(e)),
    };

    let logging = if config_error.is_some() {
        LoggingConfig {
            file_enabled: false,
            ..LoggingConfig::default()
        }
    } else {
        config.logging.clone()
    };

    let _log_guard = match telemetry::init(&logging) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("❌ {e:#}");
            return ExitCode::from(1);
        }
    };

    if let Some(e) = config_error {
        error!("❌ Failed to load {}: {:#}", args.config.display(), e);
        return ExitCode::from(1);
    }
    info!("Configuration loaded from {}", args.config.display());

    let launcher = Launcher::new(&args.env_file).force_dry_run(args.dry_run);
    let factory = LiveBotFactory::new(config);

    match launcher.launch(&factory).await {
        Ok(report) => {
            match &report.outcome {
                Some(outcome) if outcome.is_success() => {
                    info!("✅ Run finished: {} ({:?})", report.decision, outcome)
                }
                Some(outcome) => warn!("Run finished without a purchase: {:?}", outcome),
                None => info!("Run finished: {}", report.decision),
            }
            ExitCode::SUCCESS
        }
        Err(e) => ExitCode::from(e.exit_code()),
    }
}
