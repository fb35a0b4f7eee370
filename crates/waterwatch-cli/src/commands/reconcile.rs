//! Reconcile command implementation

use crate::cli::{Cli, ReconcileArgs};
use crate::config_loader;
use crate::output::OutputWriter;
use anyhow::Result;
use chrono::Utc;
use waterwatch_core::config::CliConfigOverrides;
use waterwatch_core::models::{ClassificationResult, VerificationVerdict};
use waterwatch_verify::Reconciler;

pub fn execute(cli: &Cli, args: &ReconcileArgs, output: &OutputWriter) -> Result<()> {
    let settings = config_loader::load(
        cli,
        CliConfigOverrides {
            confidence_threshold: args.confidence_threshold,
            similarity_threshold: args.similarity_threshold,
            ..Default::default()
        },
    )?;
    let reconciler = Reconciler::from_config(&settings.config)?;

    let user = ClassificationResult {
        category: args.user_category.clone(),
        confidence: args.user_confidence,
    };
    let satellite = ClassificationResult {
        category: args.satellite_category.clone(),
        confidence: args.satellite_confidence,
    };

    let verdict = reconciler.reconcile(&user, &satellite, Utc::now())?;

    if output.is_json() {
        return output.result(&verdict);
    }
    print_verdict(&verdict, output);
    Ok(())
}

/// Human rendering of a verdict, shared with the verify command
pub fn print_verdict(verdict: &VerificationVerdict, output: &OutputWriter) {
    if verdict.verified {
        output.success(format!("Verified: {}", verdict.reason));
    } else {
        output.error(format!("Not verified: {}", verdict.reason));
    }

    output.kv(
        "User",
        format!(
            "{} ({:.2})",
            verdict.user_category.as_deref().unwrap_or("-"),
            verdict.user_confidence
        ),
    );
    output.kv(
        "Satellite",
        format!(
            "{} ({:.2})",
            verdict.satellite_category.as_deref().unwrap_or("-"),
            verdict.satellite_confidence
        ),
    );
}
