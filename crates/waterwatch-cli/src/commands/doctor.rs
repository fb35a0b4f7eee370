use crate::cli::{Cli, DoctorArgs};
use crate::config_loader;
use crate::output::OutputWriter;
use anyhow::Result;
use console::style;
use serde::Serialize;
use waterwatch_core::config::{CliConfigOverrides, LayeredConfig};
use waterwatch_core::models::Taxonomy;
use waterwatch_imagery::ImageryOrchestrator;
use waterwatch_verify::ColorHeuristicClassifier;

/// Outcome of one health check
#[derive(Debug, Serialize)]
struct Check {
    name: String,
    passed: bool,
    detail: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    hint: Option<String>,
}

impl Check {
    fn pass(name: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            passed: true,
            detail: detail.into(),
            hint: None,
        }
    }

    fn fail(name: impl Into<String>, detail: impl Into<String>, hint: Option<String>) -> Self {
        Self {
            name: name.into(),
            passed: false,
            detail: detail.into(),
            hint,
        }
    }
}

#[derive(Debug, Serialize)]
struct DoctorOutput {
    checks: Vec<Check>,
    passed: usize,
    total: usize,
}

pub fn execute(cli: &Cli, args: &DoctorArgs, output: &OutputWriter) -> Result<()> {
    let settings = config_loader::load(cli, CliConfigOverrides::default())?;
    let config = &settings.config;

    let mut checks = Vec::new();

    // Providers, in the order the orchestrator tries them
    let orchestrator = ImageryOrchestrator::from_config(config, &settings.providers)?;
    for status in orchestrator.provider_status() {
        let name = format!("Provider {} ({})", status.priority, status.provider);
        if status.configured {
            checks.push(Check::pass(name, "credentials set"));
        } else {
            checks.push(Check::fail(
                name,
                "not configured, will be skipped",
                Some(format!("Set {}", credential_hint(status.provider.as_str()))),
            ));
        }
    }

    checks.push(check_cache_dir(config));

    match config.taxonomy() {
        Ok(taxonomy) => {
            checks.push(Check::pass(
                "Taxonomy",
                format!("v{} with {} categories", taxonomy.version(), taxonomy.len()),
            ));
            checks.push(check_classifier(config, &taxonomy));
        }
        Err(e) => checks.push(Check::fail(
            "Taxonomy",
            e.to_string(),
            Some("Fix the [[taxonomy]] entries in the config file".to_string()),
        )),
    }

    let passed = checks.iter().filter(|c| c.passed).count();
    let total = checks.len();

    if output.is_json() {
        return output.result(DoctorOutput {
            checks,
            passed,
            total,
        });
    }

    println!("\n{}", style("Waterwatch Health Check").bold().underlined());
    println!("{}", style("═".repeat(60)).dim());
    println!();

    for check in &checks {
        let mark = if check.passed {
            style("✓").green()
        } else {
            style("⚠").yellow()
        };
        println!("{} {}: {}", mark, check.name, check.detail);
        if let Some(hint) = &check.hint {
            println!("  → {}", hint);
        }
    }

    if args.verbose {
        output.section("Details");
        output.kv("Providers", format!("{:?}", settings.providers));
        output.kv("Classifier labels", config.classifier_labels.value.join(", "));
        output.kv("Attempt timeout", format!("{}s", config.provider_timeout_secs.value));
    }

    println!();
    println!("{}", style("─".repeat(60)).dim());
    let summary = format!("{}/{} checks passed", passed, total);
    if passed == total {
        println!("{} {}", style("✓").green().bold(), summary);
    } else {
        println!("{} {}", style("⚠").yellow().bold(), summary);
    }

    Ok(())
}

fn credential_hint(provider: &str) -> &'static str {
    match provider {
        "earth_engine" => "EARTH_ENGINE_PROJECT and EARTH_ENGINE_TOKEN",
        "sentinel_hub" => "SENTINEL_HUB_CLIENT_ID and SENTINEL_HUB_CLIENT_SECRET",
        "nasa_earth" => "NASA_API_KEY",
        _ => "the provider's credentials",
    }
}

fn check_cache_dir(config: &LayeredConfig) -> Check {
    let dir = &config.cache_dir.value;
    match std::fs::create_dir_all(dir).and_then(|_| std::fs::metadata(dir)) {
        Ok(meta) if meta.permissions().readonly() => Check::fail(
            "Cache directory",
            format!("{} is read-only", dir.display()),
            Some("Point --cache-dir or WATERWATCH_CACHE_DIR at a writable directory".to_string()),
        ),
        Ok(_) => Check::pass("Cache directory", dir.display().to_string()),
        Err(e) => Check::fail(
            "Cache directory",
            format!("{}: {}", dir.display(), e),
            Some("Point --cache-dir or WATERWATCH_CACHE_DIR at a writable directory".to_string()),
        ),
    }
}

/// Every label the active classifier can emit must have a group
fn check_classifier(config: &LayeredConfig, taxonomy: &Taxonomy) -> Check {
    let (name, coverage) = match &config.classifier_url.value {
        Some(url) => (
            format!("Classifier (http at {})", url),
            taxonomy.ensure_covers(&config.classifier_labels.value),
        ),
        None => (
            "Classifier (colour heuristic)".to_string(),
            ColorHeuristicClassifier::new(taxonomy).map(|_| ()),
        ),
    };

    match coverage {
        Ok(()) => Check::pass(name, "all labels covered by the taxonomy"),
        Err(e) => Check::fail(
            name,
            e.to_string(),
            Some("Register the category under [[taxonomy]] in the config file".to_string()),
        ),
    }
}
