//! Config command implementation

use crate::cli::Cli;
use crate::config_loader;
use crate::output::OutputWriter;
use anyhow::Result;
use serde::Serialize;
use tabled::Tabled;
use waterwatch_core::config::CliConfigOverrides;

#[derive(Tabled, Serialize)]
struct ConfigRow {
    #[tabled(rename = "Key")]
    key: String,
    #[tabled(rename = "Value")]
    value: String,
    #[tabled(rename = "Source")]
    source: String,
}

pub fn execute(cli: &Cli, output: &OutputWriter) -> Result<()> {
    let settings = config_loader::load(cli, CliConfigOverrides::default())?;

    output.section("Configuration Values");
    if let Some(path) = &settings.config_file {
        output.kv("Config file", path.display());
    }

    let mut rows: Vec<ConfigRow> = settings
        .config
        .to_inspection_map()
        .into_iter()
        .map(|(key, (value, source))| ConfigRow {
            key,
            value,
            source: format!("{:?}", source),
        })
        .collect();

    // Sort by key for consistent output
    rows.sort_by(|a, b| a.key.cmp(&b.key));

    output.table(rows)?;

    output.section("Configuration Precedence");
    output.info("CLI arguments > Environment variables > Config file > Defaults");

    Ok(())
}
