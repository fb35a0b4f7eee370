//! Colour-heuristic classifier.
//!
//! A fallback for when no trained model is available. Each pollution type has
//! a simple indicator over the image's mean red, green and blue values; the
//! first indicator that fires names the category.

use async_trait::async_trait;
use serde::Serialize;
use std::path::{Path, PathBuf};
use waterwatch_core::error::{Result, WaterwatchError};
use waterwatch_core::models::{ClassificationResult, Taxonomy};
use waterwatch_core::ports::Classifier;

pub const COLOR_HEURISTIC_NAME: &str = "color_heuristic";

const DETECTED_CONFIDENCE: f64 = 0.6;
const UNDETECTED_CONFIDENCE: f64 = 0.3;
const FALLBACK_CATEGORY: &str = "clean_water";

/// Pollution categories in the order their indicators are checked
pub const INDICATOR_ORDER: [&str; 5] =
    ["oil_spill", "algae_bloom", "sewage_discharge", "turbidity", "plastic_pollution"];

/// Mean value of each colour channel, 0 to 255
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ChannelMeans {
    pub red: f64,
    pub green: f64,
    pub blue: f64,
}

impl ChannelMeans {
    pub fn new(red: f64, green: f64, blue: f64) -> Self {
        Self { red, green, blue }
    }

    /// Means over every pixel of an RGB image; `None` for an empty image
    pub fn of_image(image: &image::RgbImage) -> Option<Self> {
        let pixels = u64::from(image.width()) * u64::from(image.height());
        if pixels == 0 {
            return None;
        }

        let mut sums = [0u64; 3];
        for pixel in image.pixels() {
            for (sum, channel) in sums.iter_mut().zip(pixel.0) {
                *sum += u64::from(channel);
            }
        }

        let n = pixels as f64;
        Some(Self::new(sums[0] as f64 / n, sums[1] as f64 / n, sums[2] as f64 / n))
    }

    /// Whether the indicator for `category` fires. Unknown categories never do.
    pub fn indicates(&self, category: &str) -> bool {
        let (r, g, b) = (self.red, self.green, self.blue);
        match category {
            "oil_spill" => r < 100.0 && g < 100.0 && b < 100.0,
            "algae_bloom" => g > r && g > b,
            "sewage_discharge" => r > 150.0 && g < 100.0 && b < 100.0,
            "turbidity" => b > r && b > g,
            "plastic_pollution" => r > 200.0 && g > 200.0 && b > 200.0,
            _ => false,
        }
    }
}

/// Result of checking one category's indicator
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ColorIndication {
    pub detected: bool,
    pub confidence: f64,
}

/// Check a single category against the channel means
pub fn detect(means: &ChannelMeans, category: &str) -> ColorIndication {
    let detected = means.indicates(category);
    ColorIndication {
        detected,
        confidence: if detected { DETECTED_CONFIDENCE } else { UNDETECTED_CONFIDENCE },
    }
}

/// Classify channel means: the first firing indicator, else clean water
pub fn classify_means(means: &ChannelMeans) -> ClassificationResult {
    INDICATOR_ORDER
        .iter()
        .find(|category| means.indicates(category))
        .map(|category| ClassificationResult::new(*category, DETECTED_CONFIDENCE))
        .unwrap_or_else(|| ClassificationResult::new(FALLBACK_CATEGORY, UNDETECTED_CONFIDENCE))
}

#[derive(Debug, Clone)]
pub struct ColorHeuristicClassifier {
    labels: Vec<String>,
}

impl ColorHeuristicClassifier {
    /// Fails unless the taxonomy assigns every category this classifier emits
    pub fn new(taxonomy: &Taxonomy) -> Result<Self> {
        let labels: Vec<String> = INDICATOR_ORDER
            .iter()
            .chain(std::iter::once(&FALLBACK_CATEGORY))
            .map(|c| c.to_string())
            .collect();
        taxonomy.ensure_covers(&labels)?;
        Ok(Self { labels })
    }
}

#[async_trait]
impl Classifier for ColorHeuristicClassifier {
    fn name(&self) -> &str {
        COLOR_HEURISTIC_NAME
    }

    fn labels(&self) -> Vec<String> {
        self.labels.clone()
    }

    async fn classify(&self, image: &Path) -> Result<ClassificationResult> {
        let path: PathBuf = image.to_path_buf();
        let means = tokio::task::spawn_blocking(move || channel_means(&path))
            .await
            .map_err(|e| classification_error(format!("decoder task failed: {}", e)))??;

        let result = classify_means(&means);
        tracing::debug!(
            image = %image.display(),
            red = means.red,
            green = means.green,
            blue = means.blue,
            category = result.category.as_deref().unwrap_or_default(),
            "Colour heuristic classification"
        );
        Ok(result)
    }
}

fn channel_means(path: &Path) -> Result<ChannelMeans> {
    let decoded = image::open(path).map_err(|e| {
        classification_error(format!("failed to decode {}: {}", path.display(), e))
    })?;

    ChannelMeans::of_image(&decoded.to_rgb8())
        .ok_or_else(|| classification_error(format!("{} has no pixels", path.display())))
}

fn classification_error(reason: String) -> WaterwatchError {
    WaterwatchError::Classification {
        classifier: COLOR_HEURISTIC_NAME.to_string(),
        reason,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};
    use tempfile::TempDir;
    use waterwatch_core::models::{SimilarityGroup, TaxonomyEntry};

    #[test]
    fn test_indicator_table() {
        let dark = ChannelMeans::new(40.0, 40.0, 40.0);
        assert!(detect(&dark, "oil_spill").detected);
        assert_eq!(detect(&dark, "oil_spill").confidence, 0.6);

        let green = ChannelMeans::new(60.0, 180.0, 90.0);
        assert!(detect(&green, "algae_bloom").detected);
        assert!(!detect(&green, "turbidity").detected);
        assert_eq!(detect(&green, "turbidity").confidence, 0.3);

        let red = ChannelMeans::new(200.0, 50.0, 50.0);
        assert!(detect(&red, "sewage_discharge").detected);

        let blue = ChannelMeans::new(100.0, 120.0, 200.0);
        assert!(detect(&blue, "turbidity").detected);

        let white = ChannelMeans::new(230.0, 230.0, 230.0);
        assert!(detect(&white, "plastic_pollution").detected);

        assert!(!detect(&white, "no_such_category").detected);
    }

    #[test]
    fn test_first_match_wins() {
        // Dark and reddish: oil_spill is checked before sewage_discharge.
        let result = classify_means(&ChannelMeans::new(90.0, 20.0, 20.0));
        assert_eq!(result, ClassificationResult::new("oil_spill", 0.6));

        // Dark green fires both oil_spill and algae_bloom.
        let result = classify_means(&ChannelMeans::new(20.0, 90.0, 20.0));
        assert_eq!(result.category.as_deref(), Some("oil_spill"));
    }

    #[test]
    fn test_nothing_detected_is_clean_water() {
        // Grey, bright enough to escape oil_spill, not bright enough for plastic.
        let result = classify_means(&ChannelMeans::new(150.0, 150.0, 150.0));
        assert_eq!(result, ClassificationResult::new("clean_water", 0.3));
    }

    #[test]
    fn test_means_of_image() {
        let mut image = RgbImage::new(2, 1);
        image.put_pixel(0, 0, Rgb([0, 100, 200]));
        image.put_pixel(1, 0, Rgb([100, 200, 0]));

        let means = ChannelMeans::of_image(&image).unwrap();
        assert_eq!(means, ChannelMeans::new(50.0, 150.0, 100.0));
        assert!(ChannelMeans::of_image(&RgbImage::new(0, 0)).is_none());
    }

    #[test]
    fn test_construction_checks_taxonomy() {
        assert!(ColorHeuristicClassifier::new(&Taxonomy::builtin()).is_ok());

        let only_oil = TaxonomyEntry::new("oil_spill", SimilarityGroup::SurfacePollution);
        let partial = Taxonomy::from_entries(1, [only_oil]).unwrap();
        let err = ColorHeuristicClassifier::new(&partial).unwrap_err();
        assert!(err.is_configuration());
    }

    #[tokio::test]
    async fn test_classify_png_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bloom.png");
        RgbImage::from_pixel(8, 8, Rgb([30, 160, 60])).save(&path).unwrap();

        let classifier = ColorHeuristicClassifier::new(&Taxonomy::builtin()).unwrap();
        let result = classifier.classify(&path).await.unwrap();

        assert_eq!(result, ClassificationResult::new("algae_bloom", 0.6));
    }

    #[tokio::test]
    async fn test_undecodable_file_is_classification_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("broken.png");
        std::fs::write(&path, b"definitely not a png").unwrap();

        let classifier = ColorHeuristicClassifier::new(&Taxonomy::builtin()).unwrap();
        let err = classifier.classify(&path).await.unwrap_err();

        assert!(matches!(
            err,
            WaterwatchError::Classification { ref classifier, .. }
                if classifier == COLOR_HEURISTIC_NAME
        ));
    }
}
