use anyhow::{Context, Result};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::LoggingConfig;

/// Console logging plus, when enabled, a daily rolling file
/// (`<directory>/<prefix>.YYYY-MM-DD`). `RUST_LOG` overrides the level.
///
/// The returned guard flushes the file writer; hold it until exit.
pub fn init(config: &LoggingConfig) -> Result<Option<WorkerGuard>> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("btc_accumulator={}", config.level)));

    let console = tracing_subscriber::fmt::layer().with_target(false);

    if !config.file_enabled {
        tracing_subscriber::registry()
            .with(filter)
            .with(console)
            .try_init()
            .context("Failed to install tracing subscriber")?;
        return Ok(None);
    }

    std::fs::create_dir_all(&config.directory)
        .with_context(|| format!("Failed to create log directory {}", config.directory))?;

    let appender = tracing_appender::rolling::daily(&config.directory, &config.file_prefix);
    let (writer, guard) = tracing_appender::non_blocking(appender);

    tracing_subscriber::registry()
        .with(filter)
        .with(console)
        .with(
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(writer),
        )
        .try_init()
        .context("Failed to install tracing subscriber")?;

    Ok(Some(guard))
}
