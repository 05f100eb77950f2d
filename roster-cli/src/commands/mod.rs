pub mod canonicalize;
pub mod enroll;
pub mod plan;
pub mod sync;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use roster_core::config::load_values_at;
use roster_core::{ConfigValues, Environment, Function};
use roster_providers::{MetadataAuth, SecretManager};

/// Where configuration comes from. Shared by commands that talk to real
/// services.
#[derive(Args, Debug, Clone)]
pub struct EnvArgs {
    /// Deployment environment (production, development, test). Defaults to
    /// the ENVIRONMENT variable.
    #[arg(long = "env")]
    pub environment: Option<String>,

    /// YAML file of config values; wins over the secret store.
    #[arg(long)]
    pub config: Option<PathBuf>,
}

impl EnvArgs {
    pub fn environment(&self) -> Result<Environment> {
        let environment = match self.environment.as_deref() {
            Some(raw) => raw.parse::<Environment>()?,
            None => Environment::from_env()?,
        };
        Ok(environment)
    }

    /// Merge the config file over the environment's secret document.
    pub fn load(&self, function: Function) -> Result<(Environment, ConfigValues)> {
        let environment = self.environment()?;
        if environment == Environment::Development {
            if let Ok(path) = dotenvy::dotenv() {
                tracing::debug!("loaded {}", path.display());
            }
        }

        let from_file = match &self.config {
            Some(path) => load_values_at(path)
                .with_context(|| format!("failed to load config file {}", path.display()))?,
            None => ConfigValues::default(),
        };

        let from_secret = if environment.secret_id(function).is_some() {
            SecretManager::new(MetadataAuth::default())
                .load_values(environment, function)
                .with_context(|| {
                    format!("failed to load {environment} config from the secret store")
                })?
        } else {
            ConfigValues::default()
        };

        tracing::info!("environment: {environment}");
        Ok((environment, from_file.merge(from_secret)))
    }
}
