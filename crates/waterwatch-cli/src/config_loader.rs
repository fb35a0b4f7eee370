//! Configuration loading for CLI commands

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use waterwatch_core::config::{CliConfigOverrides, LayeredConfig, ProviderSettings};

use crate::cli::Cli;

/// Config file picked up from the working directory when `--config` is absent
pub const DEFAULT_CONFIG_FILE: &str = "waterwatch.toml";

/// Everything a command needs to know about its environment
pub struct Settings {
    pub config: LayeredConfig,
    pub providers: ProviderSettings,
    pub config_file: Option<PathBuf>,
}

/// Defaults, then the config file, then the environment, then CLI flags
pub fn load(cli: &Cli, overrides: CliConfigOverrides) -> Result<Settings> {
    let config_file = match &cli.config {
        Some(path) => Some(path.clone()),
        None => Some(PathBuf::from(DEFAULT_CONFIG_FILE)).filter(|p| p.is_file()),
    };

    let mut config = match &config_file {
        Some(path) => load_file(path)?,
        None => LayeredConfig::with_defaults(),
    }
    .load_from_env();

    config.update_from_cli(CliConfigOverrides {
        cache_dir: cli.cache_dir.clone(),
        provider_timeout_secs: cli.timeout,
        ..overrides
    });
    config.validate().context("Invalid configuration")?;

    Ok(Settings {
        config,
        providers: ProviderSettings::from_env(),
        config_file,
    })
}

fn load_file(path: &Path) -> Result<LayeredConfig> {
    LayeredConfig::with_defaults()
        .load_from_file(path)
        .with_context(|| format!("Failed to load configuration file {}", path.display()))
}
