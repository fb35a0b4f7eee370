use serde::{Deserialize, Serialize};

/// Output of an image classifier: a category label and its confidence.
///
/// The category stays a raw label here; the taxonomy decides whether it is
/// known. A missing or blank label is what the reconciler calls an invalid
/// prediction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationResult {
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub confidence: f64,
}

impl ClassificationResult {
    pub fn new(category: impl Into<String>, confidence: f64) -> Self {
        Self {
            category: Some(category.into()),
            confidence,
        }
    }

    /// A result with no category, e.g. when a classifier returned nothing usable
    pub fn missing() -> Self {
        Self {
            category: None,
            confidence: 0.0,
        }
    }

    /// The trimmed label, if the result is well formed
    pub fn label(&self) -> Option<&str> {
        if !self.confidence.is_finite() || !(0.0..=1.0).contains(&self.confidence) {
            return None;
        }
        self.category.as_deref().map(str::trim).filter(|c| !c.is_empty())
    }

    pub fn is_well_formed(&self) -> bool {
        self.label().is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_trims() {
        let result = ClassificationResult::new("  oil_spill ", 0.8);
        assert_eq!(result.label(), Some("oil_spill"));
    }

    #[test]
    fn test_malformed_results() {
        assert!(!ClassificationResult::missing().is_well_formed());
        assert!(!ClassificationResult::new("   ", 0.9).is_well_formed());
        assert!(!ClassificationResult::new("clean", f64::NAN).is_well_formed());
        assert!(!ClassificationResult::new("clean", 1.2).is_well_formed());
        assert!(ClassificationResult::new("clean", 1.0).is_well_formed());
    }

    #[test]
    fn test_deserialize_defaults() {
        let result: ClassificationResult = serde_json::from_str(r#"{"category": "turbidity"}"#).unwrap();
        assert_eq!(result.category.as_deref(), Some("turbidity"));
        assert_eq!(result.confidence, 0.0);
    }
}
