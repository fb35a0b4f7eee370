//! Satellite imagery models: provider results, cache entries and attempt logs.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

use super::coordinate::{CoordinateKey, ImageDimensions};
use crate::error::ProviderError;

/// Identifier of an imagery provider (e.g. "earth_engine")
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProviderId(String);

impl ProviderId {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Filesystem-safe form used in cache file names
    pub fn tag(&self) -> String {
        self.0
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c.to_ascii_lowercase() } else { '_' })
            .collect()
    }
}

impl fmt::Display for ProviderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Encoded image formats providers return
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    Png,
    Jpeg,
    Tiff,
}

impl ImageFormat {
    pub const ALL: [ImageFormat; 3] = [ImageFormat::Png, ImageFormat::Jpeg, ImageFormat::Tiff];

    pub fn extension(&self) -> &'static str {
        match self {
            ImageFormat::Png => "png",
            ImageFormat::Jpeg => "jpg",
            ImageFormat::Tiff => "tif",
        }
    }

    pub fn from_content_type(content_type: &str) -> Option<Self> {
        let mime = content_type.split(';').next().unwrap_or("").trim().to_ascii_lowercase();
        match mime.as_str() {
            "image/png" => Some(ImageFormat::Png),
            "image/jpeg" | "image/jpg" => Some(ImageFormat::Jpeg),
            "image/tiff" => Some(ImageFormat::Tiff),
            _ => None,
        }
    }

    /// Detect the format from magic bytes
    pub fn sniff(bytes: &[u8]) -> Option<Self> {
        if bytes.starts_with(&[0x89, b'P', b'N', b'G']) {
            Some(ImageFormat::Png)
        } else if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
            Some(ImageFormat::Jpeg)
        } else if bytes.starts_with(b"II*\0") || bytes.starts_with(b"MM\0*") {
            Some(ImageFormat::Tiff)
        } else {
            None
        }
    }
}

/// The output of exactly one successful provider attempt
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderImage {
    pub provider: ProviderId,
    pub bytes: Vec<u8>,
    pub format: ImageFormat,
    pub resolution: ImageDimensions,
    pub cloud_coverage: Option<f32>,
}

impl ProviderImage {
    pub fn new(
        provider: ProviderId,
        bytes: Vec<u8>,
        format: ImageFormat,
        resolution: ImageDimensions,
    ) -> Self {
        Self {
            provider,
            bytes,
            format,
            resolution,
            cloud_coverage: None,
        }
    }

    pub fn with_cloud_coverage(mut self, cloud_coverage: f32) -> Self {
        self.cloud_coverage = Some(cloud_coverage);
        self
    }
}

/// Cache key: (rounded coordinate, date, provider)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub coordinate: CoordinateKey,
    pub date: NaiveDate,
    pub provider: ProviderId,
}

impl CacheKey {
    pub fn new(coordinate: CoordinateKey, date: NaiveDate, provider: ProviderId) -> Self {
        Self {
            coordinate,
            date,
            provider,
        }
    }

    /// Deterministic file name, e.g. `sentinel_hub_40.7128_-74.0060_20250120.png`
    pub fn file_name(&self, format: ImageFormat) -> String {
        format!(
            "{}_{}_{}_{}.{}",
            self.provider.tag(),
            self.coordinate.latitude_label(),
            self.coordinate.longitude_label(),
            self.date.format("%Y%m%d"),
            format.extension()
        )
    }
}

/// A provider result persisted in the image cache
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedImage {
    pub provider: ProviderId,
    pub path: PathBuf,
    pub date: NaiveDate,
    /// Rounded coordinate the entry is keyed on ("lat,lon")
    pub location: String,
    pub format: ImageFormat,
    /// Unknown for entries found on disk from an earlier run
    pub resolution: Option<ImageDimensions>,
    pub cloud_coverage: Option<f32>,
}

/// Outcome of one provider in an acquisition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AttemptOutcome {
    Succeeded,
    Failed { error: ProviderError },
    NotConfigured,
}

impl fmt::Display for AttemptOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttemptOutcome::Succeeded => f.write_str("succeeded"),
            AttemptOutcome::Failed { error } => write!(f, "failed ({})", error),
            AttemptOutcome::NotConfigured => f.write_str("not configured"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderAttempt {
    pub provider: ProviderId,
    pub outcome: AttemptOutcome,
    pub elapsed_ms: u64,
}

impl ProviderAttempt {
    pub fn is_failure(&self) -> bool {
        matches!(self.outcome, AttemptOutcome::Failed { .. })
    }

    pub fn error(&self) -> Option<&ProviderError> {
        match &self.outcome {
            AttemptOutcome::Failed { error } => Some(error),
            _ => None,
        }
    }
}

impl fmt::Display for ProviderAttempt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.provider, self.outcome)
    }
}

/// Result of a successful acquisition, with the log of every provider touched
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Acquisition {
    pub image: CachedImage,
    pub attempts: Vec<ProviderAttempt>,
    pub from_cache: bool,
}

impl Acquisition {
    /// Providers that failed before the winning one
    pub fn failures(&self) -> impl Iterator<Item = &ProviderAttempt> {
        self.attempts.iter().filter(|a| a.is_failure())
    }
}

/// Configuration status of a provider, in priority order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderStatus {
    pub priority: usize,
    pub provider: ProviderId,
    pub configured: bool,
}
