//! Integration tests for layered configuration
//!
//! These tests verify that configuration loading follows the correct precedence:
//! CLI arguments > Environment variables > Config file > Defaults

use serial_test::serial;
use std::env;
use std::io::Write;
use std::path::PathBuf;
use tempfile::NamedTempFile;
use waterwatch_core::config::{CliConfigOverrides, ConfigSource, LayeredConfig, ProviderSettings};

const ENV_KEYS: &[&str] = &[
    "WATERWATCH_CACHE_DIR",
    "WATERWATCH_PROVIDER_TIMEOUT_SECS",
    "WATERWATCH_CONFIDENCE_THRESHOLD",
    "WATERWATCH_SIMILARITY_THRESHOLD",
    "WATERWATCH_CLASSIFIER_LABELS",
];

fn clear_env() {
    for key in ENV_KEYS {
        env::remove_var(key);
    }
}

fn config_file(body: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "{}", body).unwrap();
    file
}

#[test]
fn test_partial_file_configuration() {
    let file = config_file("similarity_threshold = 0.4\n# everything else stays default");

    let config = LayeredConfig::with_defaults().load_from_file(file.path()).unwrap();

    assert_eq!(config.similarity_threshold.value, 0.4);
    assert_eq!(config.similarity_threshold.source, ConfigSource::File);
    assert_eq!(config.confidence_threshold.value, 0.7);
    assert_eq!(config.confidence_threshold.source, ConfigSource::Default);
}

#[test]
#[serial]
fn test_environment_overrides_file() {
    clear_env();
    env::set_var("WATERWATCH_CACHE_DIR", "/var/cache/waterwatch");
    env::set_var("WATERWATCH_CONFIDENCE_THRESHOLD", "0.65");
    env::set_var("WATERWATCH_CLASSIFIER_LABELS", "clean_water, oil_spill");

    let file = config_file(
        r#"
cache_dir = "/from/file"
confidence_threshold = 0.9
provider_timeout_secs = 12
"#,
    );

    let config = LayeredConfig::with_defaults().load_from_file(file.path()).unwrap().load_from_env();

    assert_eq!(config.cache_dir.value, PathBuf::from("/var/cache/waterwatch"));
    assert_eq!(config.cache_dir.source, ConfigSource::Environment);
    assert_eq!(config.confidence_threshold.value, 0.65);
    assert_eq!(config.provider_timeout_secs.value, 12);
    assert_eq!(config.provider_timeout_secs.source, ConfigSource::File);
    assert_eq!(config.classifier_labels.value, vec!["clean_water", "oil_spill"]);

    clear_env();
}

#[test]
#[serial]
fn test_invalid_environment_value_is_ignored() {
    clear_env();
    env::set_var("WATERWATCH_PROVIDER_TIMEOUT_SECS", "soon");

    let config = LayeredConfig::with_defaults().load_from_env();

    assert_eq!(config.provider_timeout_secs.value, 30);
    assert_eq!(config.provider_timeout_secs.source, ConfigSource::Default);

    clear_env();
}

#[test]
#[serial]
fn test_cli_overrides_everything() {
    clear_env();
    env::set_var("WATERWATCH_SIMILARITY_THRESHOLD", "0.5");

    let file = config_file("similarity_threshold = 0.6");
    let mut config =
        LayeredConfig::with_defaults().load_from_file(file.path()).unwrap().load_from_env();

    config.update_from_cli(CliConfigOverrides {
        similarity_threshold: Some(0.3),
        ..Default::default()
    });

    assert_eq!(config.similarity_threshold.value, 0.3);
    assert_eq!(config.similarity_threshold.source, ConfigSource::Cli);

    clear_env();
}

#[test]
#[serial]
fn test_provider_settings_from_env() {
    env::set_var("NASA_API_KEY", "DEMO_KEY");
    env::remove_var("SENTINEL_HUB_CLIENT_ID");

    let settings = ProviderSettings::from_env();

    assert_eq!(settings.nasa_earth.api_key.as_deref(), Some("DEMO_KEY"));
    assert!(settings.sentinel_hub.client_id.is_none());

    env::remove_var("NASA_API_KEY");
}
