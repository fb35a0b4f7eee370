//! Verification reconciler.
//!
//! Compares the user-image and satellite-image classifications and decides
//! whether the report is verified. Rules apply in order and the first match
//! wins:
//!
//! 1. a missing or malformed prediction on either side rejects the report
//! 2. the user confidence must reach the confidence threshold
//! 3. so must the satellite confidence
//! 4. identical categories verify
//! 5. different categories verify only if their similarity reaches the
//!    similarity threshold
//!
//! Reconciliation is a pure function of its inputs, the evaluation timestamp
//! included.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use waterwatch_core::config::{
    LayeredConfig, DEFAULT_CONFIDENCE_THRESHOLD, DEFAULT_SIMILARITY_THRESHOLD,
};
use waterwatch_core::error::{Result, WaterwatchError};
use waterwatch_core::models::{
    ClassificationResult, SimilarityGroup, Taxonomy, VerificationVerdict,
};

const SAME_GROUP_SIMILARITY: f64 = 0.8;
const CLEAN_MISMATCH_SIMILARITY: f64 = 0.2;
const CROSS_GROUP_SIMILARITY: f64 = 0.4;

/// Thresholds applied by the reconciler
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReconcilePolicy {
    pub confidence_threshold: f64,
    pub similarity_threshold: f64,
}

impl Default for ReconcilePolicy {
    fn default() -> Self {
        Self {
            confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
            similarity_threshold: DEFAULT_SIMILARITY_THRESHOLD,
        }
    }
}

impl ReconcilePolicy {
    /// Both thresholds must be finite and within [0, 1]
    pub fn new(confidence_threshold: f64, similarity_threshold: f64) -> Result<Self> {
        for (key, value) in [
            ("confidence_threshold", confidence_threshold),
            ("similarity_threshold", similarity_threshold),
        ] {
            if !value.is_finite() || !(0.0..=1.0).contains(&value) {
                return Err(WaterwatchError::ConfigInvalid {
                    key: key.to_string(),
                    reason: format!("{} is not within [0, 1]", value),
                });
            }
        }

        Ok(Self {
            confidence_threshold,
            similarity_threshold,
        })
    }

    pub fn from_config(config: &LayeredConfig) -> Result<Self> {
        Self::new(config.confidence_threshold.value, config.similarity_threshold.value)
    }
}

/// Similarity score between two similarity groups
pub fn category_similarity(a: SimilarityGroup, b: SimilarityGroup) -> f64 {
    if a == b {
        SAME_GROUP_SIMILARITY
    } else if a.is_clean() != b.is_clean() {
        CLEAN_MISMATCH_SIMILARITY
    } else {
        CROSS_GROUP_SIMILARITY
    }
}

/// Reconcile a user classification against a satellite classification.
///
/// # Errors
/// `UnknownCategory` when a well-formed prediction names a category the
/// taxonomy does not know. Malformed predictions never error; they produce a
/// rejected verdict.
pub fn reconcile(
    taxonomy: &Taxonomy,
    user: &ClassificationResult,
    satellite: &ClassificationResult,
    policy: &ReconcilePolicy,
    evaluated_at: DateTime<Utc>,
) -> Result<VerificationVerdict> {
    let verdict = |verified: bool, reason: String| VerificationVerdict {
        verified,
        reason,
        user_category: user.category.clone(),
        satellite_category: satellite.category.clone(),
        user_confidence: user.confidence,
        satellite_confidence: satellite.confidence,
        timestamp: evaluated_at,
    };

    let (user_label, satellite_label) = match (user.label(), satellite.label()) {
        (Some(u), Some(s)) => (u.to_ascii_lowercase(), s.to_ascii_lowercase()),
        _ => {
            return Ok(verdict(false, "invalid predictions from one or both images".to_string()))
        }
    };

    let user_group = taxonomy.group_of(&user_label)?;
    let satellite_group = taxonomy.group_of(&satellite_label)?;

    let threshold = policy.confidence_threshold;
    if user.confidence < threshold {
        return Ok(verdict(false, low_confidence("user", user.confidence, threshold)));
    }
    if satellite.confidence < threshold {
        return Ok(verdict(false, low_confidence("satellite", satellite.confidence, threshold)));
    }

    if user_label == satellite_label {
        let reason = if user_group.is_clean() {
            "no pollution detected, confirmed by both sources".to_string()
        } else {
            format!("{}: pollution type confirmed by both sources", user_label)
        };
        return Ok(verdict(true, reason));
    }

    let score = category_similarity(user_group, satellite_group);
    if score >= policy.similarity_threshold {
        let reason = if user_group.is_clean() && satellite_group.is_clean() {
            format!(
                "no pollution detected by either source: {} vs {} (similarity {:.2})",
                user_label, satellite_label, score
            )
        } else {
            format!(
                "related pollution types detected: {} vs {} (similarity {:.2})",
                user_label, satellite_label, score
            )
        };
        Ok(verdict(true, reason))
    } else {
        Ok(verdict(
            false,
            format!(
                "mismatch: user image shows {} but satellite shows {} (similarity {:.2} < {:.2})",
                user_label, satellite_label, score, policy.similarity_threshold
            ),
        ))
    }
}

fn low_confidence(side: &str, confidence: f64, threshold: f64) -> String {
    format!(
        "{} image confidence too low ({:.2} < {:.2}, short by {:.2})",
        side,
        confidence,
        threshold,
        threshold - confidence
    )
}

/// Taxonomy and policy bundled for repeated reconciliation
#[derive(Debug, Clone)]
pub struct Reconciler {
    taxonomy: Taxonomy,
    policy: ReconcilePolicy,
}

impl Reconciler {
    pub fn new(taxonomy: Taxonomy, policy: ReconcilePolicy) -> Self {
        Self { taxonomy, policy }
    }

    pub fn from_config(config: &LayeredConfig) -> Result<Self> {
        Ok(Self::new(config.taxonomy()?, ReconcilePolicy::from_config(config)?))
    }

    pub fn taxonomy(&self) -> &Taxonomy {
        &self.taxonomy
    }

    pub fn policy(&self) -> &ReconcilePolicy {
        &self.policy
    }

    pub fn reconcile(
        &self,
        user: &ClassificationResult,
        satellite: &ClassificationResult,
        evaluated_at: DateTime<Utc>,
    ) -> Result<VerificationVerdict> {
        reconcile(&self.taxonomy, user, satellite, &self.policy, evaluated_at)
    }
}

impl Default for Reconciler {
    fn default() -> Self {
        Self::new(Taxonomy::builtin(), ReconcilePolicy::default())
    }
}
