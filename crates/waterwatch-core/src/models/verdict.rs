use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use uuid::Uuid;

use super::coordinate::Coordinate;
use super::imagery::ProviderId;

/// Outcome of reconciling the user and satellite classifications
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerificationVerdict {
    pub verified: bool,
    pub reason: String,
    pub user_category: Option<String>,
    pub satellite_category: Option<String>,
    pub user_confidence: f64,
    pub satellite_confidence: f64,
    pub timestamp: DateTime<Utc>,
}

/// A user-submitted pollution report awaiting verification
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PollutionReport {
    pub report_id: String,
    pub coordinate: Coordinate,
    pub date: NaiveDate,
    pub user_image: PathBuf,
}

/// Unique identifier for a stored verification record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RecordId(pub Uuid);

impl RecordId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RecordId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// What the persistence collaborator stores for each verification
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerificationRecord {
    pub id: RecordId,
    pub report_id: String,
    pub user_image_path: PathBuf,
    pub satellite_image_path: Option<PathBuf>,
    pub satellite_provider: Option<ProviderId>,
    pub verdict: VerificationVerdict,
}

/// Aggregate counts over stored verifications
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerificationStats {
    pub total: usize,
    pub verified: usize,
    pub rejected: usize,
    /// Percentage of verified records, 0 when there are none
    pub verification_rate: f64,
    /// Records per user-image category
    pub category_breakdown: BTreeMap<String, usize>,
}

impl VerificationStats {
    pub fn from_records<'a>(records: impl IntoIterator<Item = &'a VerificationRecord>) -> Self {
        let mut total = 0;
        let mut verified = 0;
        let mut category_breakdown = BTreeMap::new();

        for record in records {
            total += 1;
            if record.verdict.verified {
                verified += 1;
            }
            let category =
                record.verdict.user_category.clone().unwrap_or_else(|| "unknown".to_string());
            *category_breakdown.entry(category).or_insert(0) += 1;
        }

        let verification_rate =
            if total > 0 { verified as f64 / total as f64 * 100.0 } else { 0.0 };

        Self {
            total,
            verified,
            rejected: total - verified,
            verification_rate,
            category_breakdown,
        }
    }
}
