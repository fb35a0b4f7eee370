use crate::error::{Result, WaterwatchError};
use crate::models::{Taxonomy, TaxonomyEntry, DEFAULT_COORDINATE_PRECISION};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::env;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

/// Configuration source for tracking where values come from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfigSource {
    /// Default value
    Default,
    /// Loaded from config file
    File,
    /// Loaded from environment variable
    Environment,
    /// Provided via CLI argument
    Cli,
}

impl ConfigSource {
    /// Returns the precedence level (higher = higher priority)
    pub fn precedence(&self) -> u8 {
        match self {
            ConfigSource::Default => 0,
            ConfigSource::File => 1,
            ConfigSource::Environment => 2,
            ConfigSource::Cli => 3,
        }
    }
}

/// A configuration value with its source
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigValue<T> {
    pub value: T,
    pub source: ConfigSource,
}

impl<T> ConfigValue<T> {
    pub fn new(value: T, source: ConfigSource) -> Self {
        Self { value, source }
    }

    /// Update the value if the new source has higher precedence
    pub fn update(&mut self, value: T, source: ConfigSource) {
        if source.precedence() > self.source.precedence() {
            self.value = value;
            self.source = source;
        }
    }
}

pub const DEFAULT_CACHE_DIR: &str = "./data/satellite_images";
pub const DEFAULT_PROVIDER_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_IMAGE_SIZE: u32 = 512;
pub const DEFAULT_CONFIDENCE_THRESHOLD: f64 = 0.7;
pub const DEFAULT_SIMILARITY_THRESHOLD: f64 = 0.8;

const MAX_IMAGE_SIZE: u32 = 2500;

/// Layered configuration for Waterwatch
#[derive(Debug, Clone)]
pub struct LayeredConfig {
    pub cache_dir: ConfigValue<PathBuf>,
    pub provider_timeout_secs: ConfigValue<u64>,
    pub image_size: ConfigValue<u32>,
    pub coordinate_precision: ConfigValue<u32>,
    pub confidence_threshold: ConfigValue<f64>,
    pub similarity_threshold: ConfigValue<f64>,
    pub classifier_url: ConfigValue<Option<String>>,
    pub classifier_labels: ConfigValue<Vec<String>>,
    /// Extra categories registered in the config file
    pub taxonomy_extensions: Vec<TaxonomyEntry>,
}

impl LayeredConfig {
    /// Create a new configuration with default values
    pub fn with_defaults() -> Self {
        Self {
            cache_dir: ConfigValue::new(PathBuf::from(DEFAULT_CACHE_DIR), ConfigSource::Default),
            provider_timeout_secs: ConfigValue::new(
                DEFAULT_PROVIDER_TIMEOUT_SECS,
                ConfigSource::Default,
            ),
            image_size: ConfigValue::new(DEFAULT_IMAGE_SIZE, ConfigSource::Default),
            coordinate_precision: ConfigValue::new(
                DEFAULT_COORDINATE_PRECISION,
                ConfigSource::Default,
            ),
            confidence_threshold: ConfigValue::new(
                DEFAULT_CONFIDENCE_THRESHOLD,
                ConfigSource::Default,
            ),
            similarity_threshold: ConfigValue::new(
                DEFAULT_SIMILARITY_THRESHOLD,
                ConfigSource::Default,
            ),
            classifier_url: ConfigValue::new(None, ConfigSource::Default),
            classifier_labels: ConfigValue::new(
                vec!["clean".to_string(), "polluted".to_string()],
                ConfigSource::Default,
            ),
            taxonomy_extensions: Vec::new(),
        }
    }

    /// Load configuration from a TOML file
    pub fn load_from_file<P: AsRef<Path>>(mut self, path: P) -> Result<Self> {
        let content =
            fs::read_to_string(path.as_ref()).map_err(|e| WaterwatchError::ConfigInvalid {
                key: "file".to_string(),
                reason: format!("Failed to read config file: {}", e),
            })?;

        let file_config: FileConfig =
            toml::from_str(&content).map_err(|e| WaterwatchError::ConfigInvalid {
                key: "file".to_string(),
                reason: format!("Failed to parse TOML: {}", e),
            })?;

        if let Some(cache_dir) = file_config.cache_dir {
            self.cache_dir.update(cache_dir, ConfigSource::File);
        }

        if let Some(timeout) = file_config.provider_timeout_secs {
            self.provider_timeout_secs.update(timeout, ConfigSource::File);
        }

        if let Some(size) = file_config.image_size {
            self.image_size.update(size, ConfigSource::File);
        }

        if let Some(precision) = file_config.coordinate_precision {
            self.coordinate_precision.update(precision, ConfigSource::File);
        }

        if let Some(threshold) = file_config.confidence_threshold {
            self.confidence_threshold.update(threshold, ConfigSource::File);
        }

        if let Some(threshold) = file_config.similarity_threshold {
            self.similarity_threshold.update(threshold, ConfigSource::File);
        }

        if let Some(url) = file_config.classifier_url {
            self.classifier_url.update(Some(url), ConfigSource::File);
        }

        if let Some(labels) = file_config.classifier_labels {
            self.classifier_labels.update(labels, ConfigSource::File);
        }

        self.taxonomy_extensions.extend(file_config.taxonomy);

        Ok(self)
    }

    /// Load configuration from environment variables
    pub fn load_from_env(mut self) -> Self {
        // WATERWATCH_CACHE_DIR
        if let Ok(dir) = env::var("WATERWATCH_CACHE_DIR") {
            self.cache_dir.update(PathBuf::from(dir), ConfigSource::Environment);
        }

        // WATERWATCH_PROVIDER_TIMEOUT_SECS
        if let Some(timeout) = env_parsed("WATERWATCH_PROVIDER_TIMEOUT_SECS", "whole seconds") {
            self.provider_timeout_secs.update(timeout, ConfigSource::Environment);
        }

        // WATERWATCH_IMAGE_SIZE
        if let Some(size) = env_parsed("WATERWATCH_IMAGE_SIZE", "pixel count") {
            self.image_size.update(size, ConfigSource::Environment);
        }

        // WATERWATCH_COORDINATE_PRECISION
        if let Some(precision) = env_parsed("WATERWATCH_COORDINATE_PRECISION", "decimal places")
        {
            self.coordinate_precision.update(precision, ConfigSource::Environment);
        }

        // WATERWATCH_CONFIDENCE_THRESHOLD
        if let Some(threshold) = env_parsed("WATERWATCH_CONFIDENCE_THRESHOLD", "number in [0, 1]")
        {
            self.confidence_threshold.update(threshold, ConfigSource::Environment);
        }

        // WATERWATCH_SIMILARITY_THRESHOLD
        if let Some(threshold) = env_parsed("WATERWATCH_SIMILARITY_THRESHOLD", "number in [0, 1]")
        {
            self.similarity_threshold.update(threshold, ConfigSource::Environment);
        }

        // WATERWATCH_CLASSIFIER_URL
        if let Ok(url) = env::var("WATERWATCH_CLASSIFIER_URL") {
            self.classifier_url.update(Some(url), ConfigSource::Environment);
        }

        // WATERWATCH_CLASSIFIER_LABELS (comma separated)
        if let Ok(labels) = env::var("WATERWATCH_CLASSIFIER_LABELS") {
            self.classifier_labels.update(parse_label_list(&labels), ConfigSource::Environment);
        }

        self
    }

    /// Update configuration from CLI arguments
    pub fn update_from_cli(&mut self, overrides: CliConfigOverrides) {
        if let Some(cache_dir) = overrides.cache_dir {
            self.cache_dir.update(cache_dir, ConfigSource::Cli);
        }

        if let Some(timeout) = overrides.provider_timeout_secs {
            self.provider_timeout_secs.update(timeout, ConfigSource::Cli);
        }

        if let Some(threshold) = overrides.confidence_threshold {
            self.confidence_threshold.update(threshold, ConfigSource::Cli);
        }

        if let Some(threshold) = overrides.similarity_threshold {
            self.similarity_threshold.update(threshold, ConfigSource::Cli);
        }

        if let Some(url) = overrides.classifier_url {
            self.classifier_url.update(Some(url), ConfigSource::Cli);
        }
    }

    /// Check value ranges after all layers are applied
    pub fn validate(&self) -> Result<()> {
        check_unit_interval("confidence_threshold", self.confidence_threshold.value)?;
        check_unit_interval("similarity_threshold", self.similarity_threshold.value)?;

        if self.provider_timeout_secs.value == 0 {
            return Err(WaterwatchError::ConfigInvalid {
                key: "provider_timeout_secs".to_string(),
                reason: "must be at least 1 second".to_string(),
            });
        }

        if self.image_size.value == 0 || self.image_size.value > MAX_IMAGE_SIZE {
            return Err(WaterwatchError::ConfigInvalid {
                key: "image_size".to_string(),
                reason: format!("{} is outside 1..={}", self.image_size.value, MAX_IMAGE_SIZE),
            });
        }

        if self.coordinate_precision.value > 9 {
            return Err(WaterwatchError::ConfigInvalid {
                key: "coordinate_precision".to_string(),
                reason: format!("{} decimal places is more than 9", self.coordinate_precision.value),
            });
        }

        Ok(())
    }

    /// Built-in taxonomy plus the categories registered in the config file
    pub fn taxonomy(&self) -> Result<Taxonomy> {
        Taxonomy::builtin().extend(self.taxonomy_extensions.iter().cloned())
    }

    pub fn provider_timeout(&self) -> Duration {
        Duration::from_secs(self.provider_timeout_secs.value)
    }

    /// Get all configuration values as a map for inspection
    pub fn to_inspection_map(&self) -> HashMap<String, (String, ConfigSource)> {
        let mut map = HashMap::new();

        map.insert(
            "cache_dir".to_string(),
            (self.cache_dir.value.display().to_string(), self.cache_dir.source),
        );

        map.insert(
            "provider_timeout_secs".to_string(),
            (self.provider_timeout_secs.value.to_string(), self.provider_timeout_secs.source),
        );

        map.insert(
            "image_size".to_string(),
            (self.image_size.value.to_string(), self.image_size.source),
        );

        map.insert(
            "coordinate_precision".to_string(),
            (self.coordinate_precision.value.to_string(), self.coordinate_precision.source),
        );

        map.insert(
            "confidence_threshold".to_string(),
            (format!("{:.2}", self.confidence_threshold.value), self.confidence_threshold.source),
        );

        map.insert(
            "similarity_threshold".to_string(),
            (format!("{:.2}", self.similarity_threshold.value), self.similarity_threshold.source),
        );

        map.insert(
            "classifier_url".to_string(),
            (
                self.classifier_url.value.clone().unwrap_or_else(|| "(colour heuristic)".to_string()),
                self.classifier_url.source,
            ),
        );

        map.insert(
            "classifier_labels".to_string(),
            (self.classifier_labels.value.join(","), self.classifier_labels.source),
        );

        map
    }
}

/// Configuration loaded from TOML file
#[derive(Debug, Deserialize, Serialize)]
struct FileConfig {
    cache_dir: Option<PathBuf>,
    provider_timeout_secs: Option<u64>,
    image_size: Option<u32>,
    coordinate_precision: Option<u32>,
    confidence_threshold: Option<f64>,
    similarity_threshold: Option<f64>,
    classifier_url: Option<String>,
    classifier_labels: Option<Vec<String>>,
    #[serde(default)]
    taxonomy: Vec<TaxonomyEntry>,
}

/// CLI configuration overrides
#[derive(Debug, Default)]
pub struct CliConfigOverrides {
    pub cache_dir: Option<PathBuf>,
    pub provider_timeout_secs: Option<u64>,
    pub confidence_threshold: Option<f64>,
    pub similarity_threshold: Option<f64>,
    pub classifier_url: Option<String>,
}

fn env_parsed<T: FromStr>(key: &str, expected: &str) -> Option<T> {
    let raw = env::var(key).ok()?;
    match raw.trim().parse::<T>() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!("Invalid {} value '{}': expected {}", key, raw, expected);
            None
        }
    }
}

fn check_unit_interval(key: &str, value: f64) -> Result<()> {
    if !(0.0..=1.0).contains(&value) {
        return Err(WaterwatchError::ConfigInvalid {
            key: key.to_string(),
            reason: format!("{} is outside [0, 1]", value),
        });
    }
    Ok(())
}

/// Parse a comma separated label list, dropping blanks
pub fn parse_label_list(s: &str) -> Vec<String> {
    s.split(',').map(str::trim).filter(|l| !l.is_empty()).map(str::to_string).collect()
}

pub const DEFAULT_EARTH_ENGINE_URL: &str = "https://earthengine.googleapis.com";
pub const DEFAULT_SENTINEL_HUB_TOKEN_URL: &str =
    "https://services.sentinel-hub.com/auth/realms/main/protocol/openid-connect/token";
pub const DEFAULT_SENTINEL_HUB_PROCESS_URL: &str =
    "https://services.sentinel-hub.com/api/v1/process";
pub const DEFAULT_NASA_EARTH_URL: &str = "https://api.nasa.gov";

/// Provider credentials and endpoints.
///
/// Read from the environment only; secrets never come from the config file.
#[derive(Clone, Default)]
pub struct ProviderSettings {
    pub earth_engine: EarthEngineSettings,
    pub sentinel_hub: SentinelHubSettings,
    pub nasa_earth: NasaEarthSettings,
}

#[derive(Clone)]
pub struct EarthEngineSettings {
    pub project: Option<String>,
    pub access_token: Option<String>,
    pub base_url: String,
}

impl Default for EarthEngineSettings {
    fn default() -> Self {
        Self {
            project: None,
            access_token: None,
            base_url: DEFAULT_EARTH_ENGINE_URL.to_string(),
        }
    }
}

#[derive(Clone)]
pub struct SentinelHubSettings {
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub token_url: String,
    pub process_url: String,
    pub max_cloud_coverage: f32,
}

impl Default for SentinelHubSettings {
    fn default() -> Self {
        Self {
            client_id: None,
            client_secret: None,
            token_url: DEFAULT_SENTINEL_HUB_TOKEN_URL.to_string(),
            process_url: DEFAULT_SENTINEL_HUB_PROCESS_URL.to_string(),
            max_cloud_coverage: 20.0,
        }
    }
}

#[derive(Clone)]
pub struct NasaEarthSettings {
    pub api_key: Option<String>,
    pub base_url: String,
}

impl Default for NasaEarthSettings {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_NASA_EARTH_URL.to_string(),
        }
    }
}

impl ProviderSettings {
    /// Load provider settings from the process environment
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load provider settings through an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let mut settings = Self::default();

        settings.earth_engine.project = get("EARTH_ENGINE_PROJECT");
        settings.earth_engine.access_token = get("EARTH_ENGINE_TOKEN");
        if let Some(url) = get("EARTH_ENGINE_URL") {
            settings.earth_engine.base_url = url;
        }

        settings.sentinel_hub.client_id = get("SENTINEL_HUB_CLIENT_ID");
        settings.sentinel_hub.client_secret = get("SENTINEL_HUB_CLIENT_SECRET");
        if let Some(url) = get("SENTINEL_HUB_TOKEN_URL") {
            settings.sentinel_hub.token_url = url;
        }
        if let Some(url) = get("SENTINEL_HUB_URL") {
            settings.sentinel_hub.process_url = url;
        }
        if let Some(coverage) = get("SENTINEL_HUB_MAX_CLOUD_COVERAGE") {
            match coverage.parse::<f32>() {
                Ok(value) if (0.0..=100.0).contains(&value) => {
                    settings.sentinel_hub.max_cloud_coverage = value
                }
                _ => tracing::warn!(
                    "Invalid SENTINEL_HUB_MAX_CLOUD_COVERAGE value '{}': expected a percentage in 0..=100",
                    coverage
                ),
            }
        }

        settings.nasa_earth.api_key = get("NASA_API_KEY");
        if let Some(url) = get("NASA_EARTH_URL") {
            settings.nasa_earth.base_url = url;
        }

        settings
    }
}

fn redact(secret: &Option<String>) -> &'static str {
    if secret.is_some() {
        "<set>"
    } else {
        "<unset>"
    }
}

impl fmt::Debug for ProviderSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderSettings")
            .field("earth_engine.project", &self.earth_engine.project)
            .field("earth_engine.access_token", &redact(&self.earth_engine.access_token))
            .field("earth_engine.base_url", &self.earth_engine.base_url)
            .field("sentinel_hub.client_id", &redact(&self.sentinel_hub.client_id))
            .field("sentinel_hub.client_secret", &redact(&self.sentinel_hub.client_secret))
            .field("sentinel_hub.process_url", &self.sentinel_hub.process_url)
            .field("nasa_earth.api_key", &redact(&self.nasa_earth.api_key))
            .field("nasa_earth.base_url", &self.nasa_earth.base_url)
            .finish()
    }
}
