use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use waterwatch_core::config::NasaEarthSettings;
use waterwatch_core::models::{BoundingBox, ImageDimensions, ProviderId, ProviderImage};
use waterwatch_core::ports::ImageryProvider;
use waterwatch_core::ProviderError;

use super::{read_image, transport_error};

pub const NASA_EARTH_ID: &str = "nasa_earth";

/// The imagery endpoint takes a tile width (`dim`) of 0.1 degrees
const HALF_EXTENT_DEG: f64 = 0.05;
const TILE_DIM_DEG: f64 = 2.0 * HALF_EXTENT_DEG;

/// NASA Earth imagery API adapter (Landsat 8 tiles)
pub struct NasaEarthProvider {
    settings: NasaEarthSettings,
    client: reqwest::Client,
    timeout: Duration,
}

impl NasaEarthProvider {
    /// `timeout` must match the one `client` was built with
    pub fn new(settings: NasaEarthSettings, client: reqwest::Client, timeout: Duration) -> Self {
        Self {
            settings,
            client,
            timeout,
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/planetary/earth/imagery", self.settings.base_url.trim_end_matches('/'))
    }
}

#[async_trait]
impl ImageryProvider for NasaEarthProvider {
    fn id(&self) -> ProviderId {
        ProviderId::new(NASA_EARTH_ID)
    }

    fn is_configured(&self) -> bool {
        self.settings.api_key.is_some()
    }

    fn half_extent_deg(&self) -> f64 {
        HALF_EXTENT_DEG
    }

    async fn fetch(
        &self,
        bbox: &BoundingBox,
        date: NaiveDate,
        dimensions: ImageDimensions,
    ) -> Result<ProviderImage, ProviderError> {
        let api_key = self.settings.api_key.as_deref().ok_or_else(|| {
            ProviderError::Unauthorized {
                reason: "api key is not set".to_string(),
            }
        })?;

        let (lat, lon) = bbox.center();
        let response = self
            .client
            .get(self.endpoint())
            .query(&[
                ("lat", lat.to_string()),
                ("lon", lon.to_string()),
                ("date", date.format("%Y-%m-%d").to_string()),
                ("dim", TILE_DIM_DEG.to_string()),
                ("api_key", api_key.to_string()),
            ])
            .send()
            .await
            .map_err(|e| transport_error(e, self.timeout))?;

        read_image(response, self.id(), date, dimensions).await
    }
}
