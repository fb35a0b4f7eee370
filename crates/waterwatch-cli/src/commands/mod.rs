//! Command implementations

mod acquire;
mod categories;
mod config;
mod doctor;
mod reconcile;
mod verify;

use crate::cli::{Cli, Commands};
use crate::output::OutputWriter;
use anyhow::Result;
use serde::Serialize;
use tabled::Tabled;
use waterwatch_core::models::ProviderAttempt;

/// Execute a CLI command
pub async fn execute(cli: Cli) -> Result<()> {
    let output = OutputWriter::new(cli.json);

    match &cli.command {
        Commands::Acquire(args) => acquire::execute(&cli, args, &output).await,
        Commands::Reconcile(args) => reconcile::execute(&cli, args, &output),
        Commands::Verify(args) => verify::execute(&cli, args, &output).await,
        Commands::Doctor(args) => doctor::execute(&cli, args, &output),
        Commands::Config => config::execute(&cli, &output),
        Commands::Categories => categories::execute(&cli, &output),
    }
}

/// Today's date in UTC, the default for commands that take `--date`
fn today() -> String {
    chrono::Utc::now().date_naive().format("%Y-%m-%d").to_string()
}

#[derive(Tabled, Serialize)]
struct AttemptRow {
    #[tabled(rename = "Provider")]
    provider: String,
    #[tabled(rename = "Outcome")]
    outcome: String,
    #[tabled(rename = "Elapsed (ms)")]
    elapsed_ms: u64,
}

/// Render the provider attempt log in human mode
fn print_attempts(attempts: &[ProviderAttempt], output: &OutputWriter) -> Result<()> {
    if attempts.is_empty() || output.is_json() {
        return Ok(());
    }

    output.section("Provider Attempts");
    let rows: Vec<AttemptRow> = attempts
        .iter()
        .map(|a| AttemptRow {
            provider: a.provider.to_string(),
            outcome: a.outcome.to_string(),
            elapsed_ms: a.elapsed_ms,
        })
        .collect();
    output.table(rows)
}
