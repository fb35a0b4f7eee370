//! Acquire command implementation

use crate::cli::{AcquireArgs, Cli};
use crate::config_loader;
use crate::output::OutputWriter;
use anyhow::{bail, Result};
use waterwatch_core::config::CliConfigOverrides;
use waterwatch_core::models::AttemptOutcome;
use waterwatch_core::WaterwatchError;
use waterwatch_imagery::ImageryOrchestrator;

use super::{print_attempts, today};

pub async fn execute(cli: &Cli, args: &AcquireArgs, output: &OutputWriter) -> Result<()> {
    let settings = config_loader::load(cli, CliConfigOverrides::default())?;
    let orchestrator = ImageryOrchestrator::from_config(&settings.config, &settings.providers)?;
    let date = args.date.clone().unwrap_or_else(today);

    match orchestrator.acquire_raw(args.lat, args.lon, &date).await {
        Ok(acquisition) => {
            if output.is_json() {
                return output.result(&acquisition);
            }

            let image = &acquisition.image;
            output.success(format!("Image saved to {}", image.path.display()));
            output.kv("Provider", &image.provider);
            output.kv("Location", &image.location);
            output.kv("Date", image.date);
            if let Some(resolution) = image.resolution {
                output.kv("Resolution", resolution);
            }
            if acquisition.from_cache {
                output.info("Served from cache");
            }
            print_attempts(&acquisition.attempts, output)
        }
        Err(WaterwatchError::AcquisitionFailed { attempts }) => {
            output.failure("No imagery provider succeeded", &attempts)?;
            print_attempts(&attempts, output)?;
            if attempts.iter().all(|a| a.outcome == AttemptOutcome::NotConfigured) {
                output.info("No provider has credentials; run `waterwatch doctor`");
            }
            bail!("Acquisition failed for ({}, {}) on {}", args.lat, args.lon, date)
        }
        Err(e) => Err(e.into()),
    }
}
