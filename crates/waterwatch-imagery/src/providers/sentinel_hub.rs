use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::{json, Value};
use waterwatch_core::config::SentinelHubSettings;
use waterwatch_core::models::{BoundingBox, ImageDimensions, ProviderId, ProviderImage};
use waterwatch_core::ports::ImageryProvider;
use waterwatch_core::ProviderError;

use super::{read_image, status_error, transport_error};
use crate::token::{AccessToken, TokenCache};

pub const SENTINEL_HUB_ID: &str = "sentinel_hub";

/// Token lifetime assumed when the auth server omits `expires_in`
const DEFAULT_TOKEN_TTL_SECS: u64 = 3600;

const TRUE_COLOR_EVALSCRIPT: &str = r#"//VERSION=3
function setup() {
  return {
    input: ["B02", "B03", "B04"],
    output: { bands: 3 }
  };
}

function evaluatePixel(sample) {
  return [2.5 * sample.B04, 2.5 * sample.B03, 2.5 * sample.B02];
}
"#;

/// Sentinel Hub Process API adapter (Sentinel-2 L2A true colour)
pub struct SentinelHubProvider {
    settings: SentinelHubSettings,
    client: reqwest::Client,
    timeout: Duration,
    token: TokenCache,
}

impl SentinelHubProvider {
    /// `timeout` must match the one `client` was built with
    pub fn new(settings: SentinelHubSettings, client: reqwest::Client, timeout: Duration) -> Self {
        Self {
            settings,
            client,
            timeout,
            token: TokenCache::default(),
        }
    }

    async fn access_token(&self) -> Result<String, ProviderError> {
        let (client_id, client_secret) = match (
            self.settings.client_id.as_deref(),
            self.settings.client_secret.as_deref(),
        ) {
            (Some(id), Some(secret)) => (id, secret),
            _ => {
                return Err(ProviderError::Unauthorized {
                    reason: "client id and secret are not set".to_string(),
                })
            }
        };

        self.token
            .get_or_refresh(|| async move {
                let response = self
                    .client
                    .post(&self.settings.token_url)
                    .form(&[
                        ("grant_type", "client_credentials"),
                        ("client_id", client_id),
                        ("client_secret", client_secret),
                    ])
                    .send()
                    .await
                    .map_err(|e| transport_error(e, self.timeout))?;

                let status = response.status();
                if !status.is_success() {
                    let body = response.text().await.unwrap_or_default();
                    return Err(ProviderError::Unauthorized {
                        reason: format!("token request rejected ({}): {}", status, body.trim()),
                    });
                }

                let token: TokenResponse =
                    response.json().await.map_err(|e| ProviderError::InvalidResponse {
                        reason: format!("failed to parse token response: {}", e),
                    })?;

                Ok(AccessToken::new(
                    token.access_token,
                    Duration::from_secs(token.expires_in.unwrap_or(DEFAULT_TOKEN_TTL_SECS)),
                ))
            })
            .await
    }
}

#[async_trait]
impl ImageryProvider for SentinelHubProvider {
    fn id(&self) -> ProviderId {
        ProviderId::new(SENTINEL_HUB_ID)
    }

    fn is_configured(&self) -> bool {
        self.settings.client_id.is_some() && self.settings.client_secret.is_some()
    }

    async fn fetch(
        &self,
        bbox: &BoundingBox,
        date: NaiveDate,
        dimensions: ImageDimensions,
    ) -> Result<ProviderImage, ProviderError> {
        let token = self.access_token().await?;
        let body = process_request(bbox, date, dimensions, self.settings.max_cloud_coverage);

        let response = self
            .client
            .post(&self.settings.process_url)
            .bearer_auth(token)
            .json(&body)
            .send()
            .await
            .map_err(|e| transport_error(e, self.timeout))?;

        if response.status().as_u16() == 401 {
            self.token.invalidate().await;
            let text = response.text().await.unwrap_or_default();
            return Err(status_error(401, &text, date));
        }

        read_image(response, self.id(), date, dimensions).await
    }
}

/// Process API request body for one true-colour PNG on `date`
pub fn process_request(
    bbox: &BoundingBox,
    date: NaiveDate,
    dimensions: ImageDimensions,
    max_cloud_coverage: f32,
) -> Value {
    let day = date.format("%Y-%m-%d");

    json!({
        "input": {
            "bounds": {
                "bbox": bbox.to_array(),
                "properties": { "crs": "http://www.opengis.net/def/crs/EPSG/0/4326" }
            },
            "data": [{
                "type": "sentinel-2-l2a",
                "dataFilter": {
                    "timeRange": {
                        "from": format!("{}T00:00:00Z", day),
                        "to": format!("{}T23:59:59Z", day)
                    },
                    "maxCloudCoverage": max_cloud_coverage
                }
            }]
        },
        "output": {
            "width": dimensions.width,
            "height": dimensions.height,
            "responses": [{
                "identifier": "default",
                "format": { "type": "image/png" }
            }]
        },
        "evalscript": TRUE_COLOR_EVALSCRIPT
    })
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: Option<u64>,
}
