use async_trait::async_trait;
use chrono::NaiveDate;

use crate::error::ProviderError;
use crate::models::{BoundingBox, ImageDimensions, ProviderId, ProviderImage};

/// Half-width of the default request footprint in degrees (about 1 km)
pub const DEFAULT_HALF_EXTENT_DEG: f64 = 0.01;

/// Port for a satellite imagery source
#[async_trait]
pub trait ImageryProvider: Send + Sync {
    /// Stable identifier, also used in cache file names
    fn id(&self) -> ProviderId;

    /// Whether the credentials this provider needs are present.
    ///
    /// Unconfigured providers are skipped and reported as such.
    fn is_configured(&self) -> bool;

    /// Half-width of the bounding box requested around a coordinate
    fn half_extent_deg(&self) -> f64 {
        DEFAULT_HALF_EXTENT_DEG
    }

    /// Fetch one image covering `bbox` on `date`
    ///
    /// # Arguments
    /// * `bbox` - Area of interest in WGS 84 degrees
    /// * `date` - Calendar day the imagery must come from
    /// * `dimensions` - Requested output size in pixels
    ///
    /// # Returns
    /// The encoded image, or the reason this provider could not supply one
    async fn fetch(
        &self,
        bbox: &BoundingBox,
        date: NaiveDate,
        dimensions: ImageDimensions,
    ) -> Result<ProviderImage, ProviderError>;
}
