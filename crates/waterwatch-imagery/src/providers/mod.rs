//! Imagery provider adapters
//!
//! Each adapter implements [`ImageryProvider`] over one provider's wire
//! protocol. [`default_providers`] returns them in priority order.

pub mod earth_engine;
pub mod nasa_earth;
pub mod sentinel_hub;

pub use earth_engine::EarthEngineProvider;
pub use nasa_earth::NasaEarthProvider;
pub use sentinel_hub::SentinelHubProvider;

use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use reqwest::header::CONTENT_TYPE;
use waterwatch_core::config::ProviderSettings;
use waterwatch_core::error::{Result, WaterwatchError};
use waterwatch_core::models::{ImageDimensions, ImageFormat, ProviderId, ProviderImage};
use waterwatch_core::ports::ImageryProvider;
use waterwatch_core::ProviderError;

const MAX_ERROR_BODY: usize = 200;

/// Primary, secondary and tertiary providers, in that order
pub fn default_providers(
    settings: &ProviderSettings,
    timeout: Duration,
) -> Result<Vec<Arc<dyn ImageryProvider>>> {
    let client = http_client(timeout)?;

    Ok(vec![
        Arc::new(EarthEngineProvider::new(settings.earth_engine.clone(), client.clone(), timeout)),
        Arc::new(SentinelHubProvider::new(settings.sentinel_hub.clone(), client.clone(), timeout)),
        Arc::new(NasaEarthProvider::new(settings.nasa_earth.clone(), client, timeout)),
    ])
}

/// Shared HTTP client with a per-request timeout
pub fn http_client(timeout: Duration) -> Result<reqwest::Client> {
    reqwest::Client::builder().timeout(timeout).build().map_err(|e| {
        WaterwatchError::ConfigInvalid {
            key: "http_client".to_string(),
            reason: format!("Failed to build HTTP client: {}", e),
        }
    })
}

/// Map a transport-level failure; `timeout` is the one the client was built with
pub(crate) fn transport_error(err: reqwest::Error, timeout: Duration) -> ProviderError {
    if err.is_timeout() {
        ProviderError::Timeout {
            seconds: timeout.as_secs_f64(),
        }
    } else {
        ProviderError::Network {
            reason: err.to_string(),
        }
    }
}

/// Map a non-success HTTP status
pub(crate) fn status_error(status: u16, body: &str, date: NaiveDate) -> ProviderError {
    match status {
        401 | 403 => ProviderError::Unauthorized {
            reason: format!("HTTP {}: {}", status, truncate(body)),
        },
        204 | 404 => ProviderError::NoImagery { date },
        _ => ProviderError::Status {
            status,
            body: truncate(body),
        },
    }
}

/// Turn a provider response into an image, or the reason it is not one
pub(crate) async fn read_image(
    response: reqwest::Response,
    provider: ProviderId,
    date: NaiveDate,
    requested: ImageDimensions,
) -> std::result::Result<ProviderImage, ProviderError> {
    let status = response.status();
    if !status.is_success() || status.as_u16() == 204 {
        let body = response.text().await.unwrap_or_default();
        return Err(status_error(status.as_u16(), &body, date));
    }

    let content_type = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    let bytes = response.bytes().await.map_err(|e| ProviderError::Network {
        reason: format!("failed to read image body: {}", e),
    })?;

    if bytes.is_empty() {
        return Err(ProviderError::NoImagery { date });
    }

    let format = content_type
        .as_deref()
        .and_then(ImageFormat::from_content_type)
        .or_else(|| ImageFormat::sniff(&bytes))
        .ok_or_else(|| ProviderError::InvalidResponse {
            reason: format!(
                "expected an image, got {}",
                content_type.as_deref().unwrap_or("an unknown content type")
            ),
        })?;

    let resolution = match format {
        ImageFormat::Png => png_dimensions(&bytes).unwrap_or(requested),
        _ => requested,
    };

    Ok(ProviderImage::new(provider, bytes.to_vec(), format, resolution))
}

/// Width and height from a PNG IHDR chunk
pub(crate) fn png_dimensions(bytes: &[u8]) -> Option<ImageDimensions> {
    if bytes.len() < 24 || &bytes[12..16] != b"IHDR" {
        return None;
    }
    let width = u32::from_be_bytes(bytes[16..20].try_into().ok()?);
    let height = u32::from_be_bytes(bytes[20..24].try_into().ok()?);
    ImageDimensions::new(width, height).ok()
}

fn truncate(body: &str) -> String {
    let trimmed = body.trim();
    match trimmed.char_indices().nth(MAX_ERROR_BODY) {
        Some((idx, _)) => format!("{}…", &trimmed[..idx]),
        None => trimmed.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 1, 20).unwrap()
    }

    #[test]
    fn test_status_mapping() {
        assert!(matches!(status_error(401, "", date()), ProviderError::Unauthorized { .. }));
        assert!(matches!(status_error(403, "", date()), ProviderError::Unauthorized { .. }));
        assert_eq!(status_error(404, "", date()), ProviderError::NoImagery { date: date() });
        assert_eq!(
            status_error(502, "bad gateway", date()),
            ProviderError::Status {
                status: 502,
                body: "bad gateway".to_string()
            }
        );
    }

    #[test]
    fn test_error_body_is_truncated() {
        let body = "x".repeat(1000);
        match status_error(500, &body, date()) {
            ProviderError::Status { body, .. } => assert!(body.chars().count() <= MAX_ERROR_BODY + 1),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_png_dimensions() {
        let mut header = vec![0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 13];
        header.extend_from_slice(b"IHDR");
        header.extend_from_slice(&640u32.to_be_bytes());
        header.extend_from_slice(&480u32.to_be_bytes());
        assert_eq!(png_dimensions(&header), Some(ImageDimensions::new(640, 480).unwrap()));
        assert_eq!(png_dimensions(b"not a png"), None);
    }

    #[test]
    fn test_default_provider_order() {
        let providers =
            default_providers(&ProviderSettings::default(), Duration::from_secs(5)).unwrap();
        let ids: Vec<String> = providers.iter().map(|p| p.id().to_string()).collect();
        assert_eq!(ids, vec!["earth_engine", "sentinel_hub", "nasa_earth"]);
        assert!(providers.iter().all(|p| !p.is_configured()));
    }
}
