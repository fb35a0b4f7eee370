use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use serde_json::{json, Value};
use waterwatch_core::config::EarthEngineSettings;
use waterwatch_core::models::{BoundingBox, ImageDimensions, ProviderId, ProviderImage};
use waterwatch_core::ports::ImageryProvider;
use waterwatch_core::ProviderError;

use super::{read_image, status_error, transport_error};

pub const EARTH_ENGINE_ID: &str = "earth_engine";

/// Roughly a 1 km buffer around the point
const HALF_EXTENT_DEG: f64 = 0.009;

const COLLECTION: &str = "COPERNICUS/S2_SR_HARMONIZED";

/// Earth Engine `computePixels` adapter over the Sentinel-2 surface reflectance collection
pub struct EarthEngineProvider {
    settings: EarthEngineSettings,
    client: reqwest::Client,
    timeout: Duration,
}

impl EarthEngineProvider {
    /// `timeout` must match the one `client` was built with
    pub fn new(settings: EarthEngineSettings, client: reqwest::Client, timeout: Duration) -> Self {
        Self {
            settings,
            client,
            timeout,
        }
    }

    fn endpoint(&self, project: &str) -> String {
        format!(
            "{}/v1/projects/{}/image:computePixels",
            self.settings.base_url.trim_end_matches('/'),
            project
        )
    }
}

#[async_trait]
impl ImageryProvider for EarthEngineProvider {
    fn id(&self) -> ProviderId {
        ProviderId::new(EARTH_ENGINE_ID)
    }

    fn is_configured(&self) -> bool {
        self.settings.project.is_some() && self.settings.access_token.is_some()
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
        let (project, token) =
            match (self.settings.project.as_deref(), self.settings.access_token.as_deref()) {
                (Some(project), Some(token)) => (project, token),
                _ => {
                    return Err(ProviderError::Unauthorized {
                        reason: "project and access token are not set".to_string(),
                    })
                }
            };

        let response = self
            .client
            .post(self.endpoint(project))
            .bearer_auth(token)
            .json(&compute_pixels_request(bbox, date, dimensions))
            .send()
            .await
            .map_err(|e| transport_error(e, self.timeout))?;

        // An empty mosaic has no bands to select
        if response.status().as_u16() == 400 {
            let body = response.text().await.unwrap_or_default();
            if body.contains("bands") {
                return Err(ProviderError::NoImagery { date });
            }
            return Err(status_error(400, &body, date));
        }

        read_image(response, self.id(), date, dimensions).await
    }
}

/// `computePixels` body: true-colour mosaic of the day's scenes over `bbox`
pub fn compute_pixels_request(
    bbox: &BoundingBox,
    date: NaiveDate,
    dimensions: ImageDimensions,
) -> Value {
    let start = date.format("%Y-%m-%d").to_string();
    let end = date.succ_opt().unwrap_or(date).format("%Y-%m-%d").to_string();

    let collection = invoke("ImageCollection.load", json!({ "id": constant(COLLECTION) }));
    let range = invoke(
        "DateRange",
        json!({ "start": constant(start.as_str()), "end": constant(end.as_str()) }),
    );
    let filter = invoke(
        "Filter.dateRangeContains",
        json!({
            "leftValue": range,
            "rightField": constant("system:time_start")
        }),
    );
    let filtered = invoke("Collection.filter", json!({ "collection": collection, "filter": filter }));
    let mosaic = invoke("ImageCollection.mosaic", json!({ "collection": filtered }));
    let rgb = invoke(
        "Image.select",
        json!({ "input": mosaic, "bandSelectors": constant(json!(["B4", "B3", "B2"])) }),
    );
    let visual = invoke(
        "Image.visualize",
        json!({ "image": rgb, "min": constant(0), "max": constant(3000) }),
    );

    json!({
        "expression": {
            "result": "0",
            "values": { "0": visual }
        },
        "fileFormat": "PNG",
        "grid": {
            "dimensions": { "width": dimensions.width, "height": dimensions.height },
            "affineTransform": {
                "scaleX": bbox.width_deg() / dimensions.width as f64,
                "shearX": 0,
                "translateX": bbox.min_lon,
                "shearY": 0,
                "scaleY": -bbox.height_deg() / dimensions.height as f64,
                "translateY": bbox.max_lat
            },
            "crsCode": "EPSG:4326"
        }
    })
}

fn invoke(function: &str, arguments: Value) -> Value {
    json!({
        "functionInvocationValue": {
            "functionName": function,
            "arguments": arguments
        }
    })
}

fn constant(value: impl Into<Value>) -> Value {
    json!({ "constantValue": value.into() })
}
