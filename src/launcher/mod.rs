mod scrub;

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{error, info, warn};

use crate::config::{ConfigError, EnvVars, Settings, SENSITIVE_VARS};
use crate::trading::RunReport;

pub use scrub::CredentialScrubber;

/// A bot constructed from validated [`Settings`] (dry-run flag included)
/// and run exactly once per launch.
#[async_trait]
pub trait Bot: Send {
    fn is_dry_run(&self) -> bool;

    async fn run(&mut self) -> anyhow::Result<RunReport>;
}

pub trait BotFactory {
    type Bot: Bot;

    /// Takes ownership of the settings; credentials live exactly as long
    /// as the bot built from them.
    fn build(&self, settings: Settings) -> anyhow::Result<Self::Bot>;
}

#[derive(Error, Debug)]
pub enum LaunchError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("bot construction failed: {0:#}")]
    Build(anyhow::Error),

    #[error("bot run failed: {0:#}")]
    Run(anyhow::Error),
}

impl LaunchError {
    /// Process exit code. Every failure exits 1, configuration and runtime
    /// alike; success is 0.
    pub fn exit_code(&self) -> u8 {
        match self {
            LaunchError::Config(_) => 1,
            LaunchError::Build(_) | LaunchError::Run(_) => 1,
        }
    }

    pub fn is_config(&self) -> bool {
        matches!(self, LaunchError::Config(_))
    }
}

/// Load, validate, build, run once. No scheduling loop; cron drives it.
#[derive(Debug, Clone)]
pub struct Launcher {
    env_file: PathBuf,
    inherit_process_env: bool,
    force_dry_run: bool,
    scrub_vars: Vec<String>,
}

impl Launcher {
    pub fn new(env_file: impl Into<PathBuf>) -> Self {
        Self {
            env_file: env_file.into(),
            inherit_process_env: true,
            force_dry_run: false,
            scrub_vars: SENSITIVE_VARS.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Whether inherited process variables may fill keys the file lacks.
    pub fn inherit_process_env(mut self, inherit: bool) -> Self {
        self.inherit_process_env = inherit;
        self
    }

    /// Forces dry-run regardless of `DRY_RUN`.
    pub fn force_dry_run(mut self, force: bool) -> Self {
        self.force_dry_run = force;
        self
    }

    pub fn scrub_vars<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.scrub_vars = names.into_iter().map(Into::into).collect();
        self
    }

    pub fn env_file(&self) -> &Path {
        &self.env_file
    }

    pub fn load_settings(&self) -> Result<Settings, ConfigError> {
        let mut vars = EnvVars::from_file(&self.env_file)?;
        if self.inherit_process_env {
            vars = vars.with_process_fallback();
        }

        let mut settings = Settings::from_env(&vars)?;
        settings.dry_run |= self.force_dry_run;
        Ok(settings)
    }

    pub async fn launch<F: BotFactory>(&self, factory: &F) -> Result<RunReport, LaunchError> {
        let _scrubber = CredentialScrubber::new(self.scrub_vars.iter().cloned());

        info!("🔐 Loading environment from {}", self.env_file().display());
        let settings = self.load_settings().map_err(|e| {
            error!("❌ {}", e);
            LaunchError::Config(e)
        })?;
        info!("✅ Environment variables loaded successfully");

        if settings.dry_run {
            warn!("🧪 DRY RUN mode - no real orders will be placed");
        } else {
            info!("🚀 LIVE mode - orders will be placed");
        }

        let mut bot = factory.build(settings).map_err(|e| {
            error!("❌ Failed to construct bot: {:#}", e);
            LaunchError::Build(e)
        })?;

        bot.run().await.map_err(|e| {
            error!("🚨 Fatal error: {:#}", e);
            LaunchError::Run(e)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_scrubs_every_credential_name() {
        let launcher = Launcher::new(".env");

        assert_eq!(launcher.env_file(), Path::new(".env"));
        assert_eq!(launcher.scrub_vars, SENSITIVE_VARS.map(String::from).to_vec());
        assert!(launcher.inherit_process_env);
        assert!(!launcher.force_dry_run);
    }

    #[test]
    fn test_every_failure_exits_one() {
        let config = LaunchError::from(ConfigError::MissingVariables(vec!["X".into()]));
        let run = LaunchError::Run(anyhow::anyhow!("boom"));

        assert!(config.is_config());
        assert_eq!(config.exit_code(), 1);
        assert_eq!(run.exit_code(), 1);
    }
}
