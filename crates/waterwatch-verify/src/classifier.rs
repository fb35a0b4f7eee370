use async_trait::async_trait;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use waterwatch_core::error::{Result, WaterwatchError};
use waterwatch_core::models::{ClassificationResult, ImageFormat};
use waterwatch_core::ports::Classifier;

pub const HTTP_CLASSIFIER_NAME: &str = "http";

/// Classifier backed by a model server.
///
/// The image bytes are posted to `{base_url}/classify`; the server answers
/// with `{"category": ..., "confidence": ...}`.
pub struct HttpClassifier {
    /// Base URL of the model server (e.g., "http://localhost:8501")
    base_url: String,

    /// Labels the served model can emit
    labels: Vec<String>,

    /// HTTP client
    client: reqwest::Client,
}

impl HttpClassifier {
    /// Create a classifier whose requests give up after `timeout`
    pub fn new(
        base_url: impl Into<String>,
        labels: Vec<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build().map_err(|e| {
            WaterwatchError::ConfigInvalid {
                key: "classifier_url".to_string(),
                reason: format!("Failed to build HTTP client: {}", e),
            }
        })?;

        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            labels,
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn error(&self, reason: String) -> WaterwatchError {
        WaterwatchError::Classification {
            classifier: HTTP_CLASSIFIER_NAME.to_string(),
            reason,
        }
    }
}

#[async_trait]
impl Classifier for HttpClassifier {
    fn name(&self) -> &str {
        HTTP_CLASSIFIER_NAME
    }

    fn labels(&self) -> Vec<String> {
        self.labels.clone()
    }

    async fn classify(&self, image: &Path) -> Result<ClassificationResult> {
        let bytes = tokio::fs::read(image)
            .await
            .map_err(|e| self.error(format!("failed to read {}: {}", image.display(), e)))?;

        let content_type = ImageFormat::sniff(&bytes)
            .map(|format| match format {
                ImageFormat::Png => "image/png",
                ImageFormat::Jpeg => "image/jpeg",
                ImageFormat::Tiff => "image/tiff",
            })
            .unwrap_or("application/octet-stream");

        let response = self
            .client
            .post(format!("{}/classify", self.base_url))
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .body(bytes)
            .send()
            .await
            .map_err(|e| {
                self.error(format!("Failed to connect to classifier at {}: {}", self.base_url, e))
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(self.error(format!("classifier API error ({}): {}", status, error_text)));
        }

        let body: ClassifyResponse = response
            .json()
            .await
            .map_err(|e| self.error(format!("Failed to parse classifier response: {}", e)))?;

        tracing::debug!(
            image = %image.display(),
            category = body.category.as_deref().unwrap_or_default(),
            confidence = body.confidence,
            "Model classification"
        );

        Ok(ClassificationResult {
            category: body.category,
            confidence: body.confidence,
        })
    }
}

/// Response from the classify endpoint
#[derive(Debug, Deserialize)]
struct ClassifyResponse {
    #[serde(default)]
    category: Option<String>,
    #[serde(default)]
    confidence: f64,
}
