//! Categories command implementation

use crate::cli::Cli;
use crate::config_loader;
use crate::output::OutputWriter;
use anyhow::Result;
use serde::Serialize;
use tabled::Tabled;
use waterwatch_core::config::CliConfigOverrides;

#[derive(Tabled, Serialize)]
struct CategoryRow {
    #[tabled(rename = "Category")]
    name: String,
    #[tabled(rename = "Group")]
    group: String,
    #[tabled(rename = "Clean")]
    clean: bool,
}

pub fn execute(cli: &Cli, output: &OutputWriter) -> Result<()> {
    let settings = config_loader::load(cli, CliConfigOverrides::default())?;
    let taxonomy = settings.config.taxonomy()?;

    output.section(format!("Pollution Categories (taxonomy v{})", taxonomy.version()));

    let rows: Vec<CategoryRow> = taxonomy
        .entries()
        .into_iter()
        .map(|entry| CategoryRow {
            clean: entry.group.is_clean(),
            group: entry.group.to_string(),
            name: entry.name,
        })
        .collect();

    output.table(rows)
}
