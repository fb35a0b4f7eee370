//! Verify command implementation

use crate::cli::{Cli, VerifyArgs};
use crate::config_loader;
use crate::output::OutputWriter;
use anyhow::{bail, Result};
use std::sync::Arc;
use waterwatch_core::config::{CliConfigOverrides, LayeredConfig};
use waterwatch_core::models::{parse_date, Coordinate, PollutionReport, RecordId, Taxonomy};
use waterwatch_core::ports::Classifier;
use waterwatch_core::WaterwatchError;
use waterwatch_imagery::ImageryOrchestrator;
use waterwatch_verify::{
    ColorHeuristicClassifier, HttpClassifier, ReconcilePolicy, Reconciler, VerificationPipeline,
};

use super::reconcile::print_verdict;
use super::{print_attempts, today};

pub async fn execute(cli: &Cli, args: &VerifyArgs, output: &OutputWriter) -> Result<()> {
    let settings = config_loader::load(
        cli,
        CliConfigOverrides {
            classifier_url: args.classifier_url.clone(),
            ..Default::default()
        },
    )?;
    let config = &settings.config;

    let report = PollutionReport {
        report_id: args
            .report_id
            .clone()
            .unwrap_or_else(|| format!("report-{}", RecordId::new())),
        coordinate: Coordinate::new(args.lat, args.lon)?,
        date: parse_date(&args.date.clone().unwrap_or_else(today))?,
        user_image: args.image.clone(),
    };

    let taxonomy = config.taxonomy()?;
    let classifier = build_classifier(config, &taxonomy)?;
    let reconciler = Reconciler::new(taxonomy, ReconcilePolicy::from_config(config)?);
    let orchestrator = ImageryOrchestrator::from_config(config, &settings.providers)?;

    let pipeline = VerificationPipeline::new(Arc::new(orchestrator), classifier, reconciler)?;

    let outcome = match pipeline.verify(&report).await {
        Ok(outcome) => outcome,
        Err(WaterwatchError::AcquisitionFailed { attempts }) => {
            output.failure("No satellite image could be acquired", &attempts)?;
            print_attempts(&attempts, output)?;
            bail!("Verification of {} aborted", report.report_id)
        }
        Err(e) => return Err(e.into()),
    };

    if output.is_json() {
        return output.result(&outcome);
    }

    output.section(format!("Report {}", outcome.record.report_id));
    output.kv("Location", report.coordinate);
    output.kv("Date", report.date);
    output.kv("Classifier", pipeline.classifier().name());
    if let Some(provider) = &outcome.record.satellite_provider {
        let cached = if outcome.from_cache { " (cached)" } else { "" };
        output.kv("Satellite provider", format!("{}{}", provider, cached));
    }
    if let Some(path) = &outcome.record.satellite_image_path {
        output.kv("Satellite image", path.display());
    }
    println!();
    print_verdict(&outcome.record.verdict, output);
    print_attempts(&outcome.attempts, output)
}

/// The model server when one is configured, else the colour heuristic
fn build_classifier(config: &LayeredConfig, taxonomy: &Taxonomy) -> Result<Arc<dyn Classifier>> {
    match &config.classifier_url.value {
        Some(url) => {
            tracing::info!(url = %url, "Using HTTP classifier");
            Ok(Arc::new(HttpClassifier::new(
                url.clone(),
                config.classifier_labels.value.clone(),
                config.provider_timeout(),
            )?))
        }
        None => {
            tracing::info!("No classifier URL configured, using colour heuristic");
            Ok(Arc::new(ColorHeuristicClassifier::new(taxonomy)?))
        }
    }
}
