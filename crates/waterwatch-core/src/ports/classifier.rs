use async_trait::async_trait;
use std::path::Path;

use crate::error::Result;
use crate::models::ClassificationResult;

/// Port for the image classifier
#[async_trait]
pub trait Classifier: Send + Sync {
    /// Name used in logs and errors
    fn name(&self) -> &str;

    /// Every label this classifier can emit; checked against the taxonomy at startup
    fn labels(&self) -> Vec<String>;

    /// Classify the image at `image`
    ///
    /// Failures surface as `WaterwatchError::Classification`, never as an
    /// empty result.
    async fn classify(&self, image: &Path) -> Result<ClassificationResult>;
}
