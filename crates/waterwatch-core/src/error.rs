//! Error types for Waterwatch

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

use crate::models::ProviderAttempt;

#[derive(Debug, Error)]
pub enum WaterwatchError {
    // Validation errors
    #[error("Invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    // Acquisition errors
    #[error("No imagery provider succeeded: {}", describe_attempts(.attempts))]
    AcquisitionFailed { attempts: Vec<ProviderAttempt> },

    // Classification errors
    #[error("Classifier '{classifier}' failed: {reason}")]
    Classification { classifier: String, reason: String },

    // Taxonomy errors
    #[error("Category '{category}' has no similarity group assignment")]
    UnknownCategory { category: String },

    #[error("Category '{category}' is assigned to more than one similarity group")]
    DuplicateCategory { category: String },

    // Configuration errors
    #[error("Missing required configuration: {key}")]
    ConfigMissing { key: String },

    #[error("Invalid configuration value for {key}: {reason}")]
    ConfigInvalid { key: String, reason: String },

    // Cache errors
    #[error("Cache write failed for {path}: {reason}")]
    Cache { path: PathBuf, reason: String },

    // Storage errors
    #[error("Verdict store error: {0}")]
    Store(String),

    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl WaterwatchError {
    pub fn validation(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// True for configuration errors, taxonomy gaps included
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::UnknownCategory { .. }
                | Self::DuplicateCategory { .. }
                | Self::ConfigMissing { .. }
                | Self::ConfigInvalid { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, WaterwatchError>;

/// Failure of a single provider attempt. Recovered locally by the orchestrator.
#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ProviderError {
    #[error("timed out after {seconds:.1}s")]
    Timeout { seconds: f64 },

    #[error("authentication failed: {reason}")]
    Unauthorized { reason: String },

    #[error("no imagery available for {date}")]
    NoImagery { date: NaiveDate },

    #[error("unexpected HTTP status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("network error: {reason}")]
    Network { reason: String },

    #[error("invalid response: {reason}")]
    InvalidResponse { reason: String },
}

fn describe_attempts(attempts: &[ProviderAttempt]) -> String {
    if attempts.is_empty() {
        return "no providers registered".to_string();
    }
    attempts.iter().map(|a| a.to_string()).collect::<Vec<_>>().join("; ")
}
