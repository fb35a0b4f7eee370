//! Multi-provider imagery acquisition.
//!
//! Providers are tried strictly in order, one at a time. The first success is
//! written to the cache and returned; failures are logged and collected so a
//! total failure can report every attempt.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use chrono::NaiveDate;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use waterwatch_core::config::{LayeredConfig, ProviderSettings};
use waterwatch_core::error::{Result, WaterwatchError};
use waterwatch_core::models::{
    parse_date, Acquisition, AttemptOutcome, CacheKey, Coordinate, CoordinateKey, ImageDimensions,
    ImageRequest, ProviderAttempt, ProviderStatus, DEFAULT_COORDINATE_PRECISION,
};
use waterwatch_core::ports::ImageryProvider;
use waterwatch_core::ProviderError;

use crate::cache::ImageCache;
use crate::providers::default_providers;

/// Per-attempt timeout when none is configured
pub const DEFAULT_ATTEMPT_TIMEOUT: Duration = Duration::from_secs(30);

type FlightKey = (CoordinateKey, NaiveDate);
type FlightMap = Mutex<HashMap<FlightKey, Arc<AsyncMutex<()>>>>;

pub struct ImageryOrchestrator {
    providers: Vec<Arc<dyn ImageryProvider>>,
    cache: ImageCache,
    timeout: Duration,
    dimensions: ImageDimensions,
    precision: u32,
    in_flight: Arc<FlightMap>,
}

impl ImageryOrchestrator {
    /// An orchestrator with no providers yet
    pub fn new(cache: ImageCache) -> Self {
        Self {
            providers: Vec::new(),
            cache,
            timeout: DEFAULT_ATTEMPT_TIMEOUT,
            dimensions: ImageDimensions::default(),
            precision: DEFAULT_COORDINATE_PRECISION,
            in_flight: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Build the default provider chain from layered configuration
    pub fn from_config(config: &LayeredConfig, settings: &ProviderSettings) -> Result<Self> {
        let timeout = config.provider_timeout();
        let providers = default_providers(settings, timeout)?;

        Ok(Self::new(ImageCache::new(config.cache_dir.value.clone()))
            .with_providers(providers)
            .with_timeout(timeout)
            .with_dimensions(ImageDimensions::new(
                config.image_size.value,
                config.image_size.value,
            )?)
            .with_precision(config.coordinate_precision.value))
    }

    /// Append a provider at the lowest priority
    pub fn with_provider(mut self, provider: Arc<dyn ImageryProvider>) -> Self {
        self.providers.push(provider);
        self
    }

    pub fn with_providers(
        mut self,
        providers: impl IntoIterator<Item = Arc<dyn ImageryProvider>>,
    ) -> Self {
        self.providers.extend(providers);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_dimensions(mut self, dimensions: ImageDimensions) -> Self {
        self.dimensions = dimensions;
        self
    }

    pub fn with_precision(mut self, precision: u32) -> Self {
        self.precision = precision;
        self
    }

    pub fn providers(&self) -> &[Arc<dyn ImageryProvider>] {
        &self.providers
    }

    pub fn cache(&self) -> &ImageCache {
        &self.cache
    }

    /// Configuration status of every provider, in priority order
    pub fn provider_status(&self) -> Vec<ProviderStatus> {
        self.providers
            .iter()
            .enumerate()
            .map(|(idx, provider)| ProviderStatus {
                priority: idx + 1,
                provider: provider.id(),
                configured: provider.is_configured(),
            })
            .collect()
    }

    /// Validate raw inputs, then acquire
    pub async fn acquire_raw(
        &self,
        latitude: f64,
        longitude: f64,
        date: &str,
    ) -> Result<Acquisition> {
        let coordinate = Coordinate::new(latitude, longitude)?;
        let date = parse_date(date)?;
        self.acquire(coordinate, date).await
    }

    /// Acquire an image for `coordinate` on `date` at the configured size
    pub async fn acquire(&self, coordinate: Coordinate, date: NaiveDate) -> Result<Acquisition> {
        self.acquire_request(&ImageRequest::new(coordinate, date, self.dimensions)).await
    }

    /// Acquire an image for an explicit request.
    ///
    /// Concurrent calls for the same rounded coordinate and date are
    /// serialized, so the second caller sees the first caller's cache entry.
    pub async fn acquire_request(&self, request: &ImageRequest) -> Result<Acquisition> {
        let location = request.coordinate().key(self.precision);
        let _flight = self.enter_flight((location, request.date())).await;
        self.acquire_locked(request, location).await
    }

    async fn enter_flight(&self, key: FlightKey) -> FlightGuard {
        let slot = {
            let mut map = self.in_flight.lock().unwrap_or_else(PoisonError::into_inner);
            map.entry(key).or_insert_with(|| Arc::new(AsyncMutex::new(()))).clone()
        };
        let held = slot.clone().lock_owned().await;

        FlightGuard {
            map: self.in_flight.clone(),
            key,
            slot,
            _held: held,
        }
    }

    async fn acquire_locked(
        &self,
        request: &ImageRequest,
        location: CoordinateKey,
    ) -> Result<Acquisition> {
        let date = request.date();

        for provider in &self.providers {
            let key = CacheKey::new(location, date, provider.id());
            if let Some(image) = self.cache.lookup(&key) {
                tracing::debug!(provider = %key.provider, location = %location, %date, "Cache hit");
                return Ok(Acquisition {
                    image,
                    attempts: Vec::new(),
                    from_cache: true,
                });
            }
        }

        let mut attempts = Vec::with_capacity(self.providers.len());

        for provider in &self.providers {
            let id = provider.id();

            if !provider.is_configured() {
                tracing::debug!(provider = %id, "Skipping provider without credentials");
                attempts.push(ProviderAttempt {
                    provider: id,
                    outcome: AttemptOutcome::NotConfigured,
                    elapsed_ms: 0,
                });
                continue;
            }

            let started = Instant::now();
            let bbox = request.bbox(provider.half_extent_deg());
            let attempt = provider.fetch(&bbox, date, request.dimensions());
            let fetched = match tokio::time::timeout(self.timeout, attempt).await {
                Ok(Ok(image)) if image.bytes.is_empty() => Err(ProviderError::InvalidResponse {
                    reason: "provider returned an empty image".to_string(),
                }),
                Ok(result) => result,
                Err(_) => Err(ProviderError::Timeout {
                    seconds: self.timeout.as_secs_f64(),
                }),
            };
            let elapsed_ms = started.elapsed().as_millis() as u64;

            match fetched {
                Ok(image) => {
                    let key = CacheKey::new(location, date, id.clone());
                    let cached = self.cache.store(&key, image).await?;
                    tracing::info!(
                        provider = %id,
                        location = %location,
                        %date,
                        elapsed_ms,
                        path = %cached.path.display(),
                        "Acquired satellite image"
                    );
                    attempts.push(ProviderAttempt {
                        provider: id,
                        outcome: AttemptOutcome::Succeeded,
                        elapsed_ms,
                    });
                    return Ok(Acquisition {
                        image: cached,
                        attempts,
                        from_cache: false,
                    });
                }
                Err(error) => {
                    tracing::warn!(
                        provider = %id,
                        location = %location,
                        %date,
                        elapsed_ms,
                        "Provider failed: {}",
                        error
                    );
                    attempts.push(ProviderAttempt {
                        provider: id,
                        outcome: AttemptOutcome::Failed { error },
                        elapsed_ms,
                    });
                }
            }
        }

        tracing::error!(location = %location, %date, "No imagery provider succeeded");
        Err(WaterwatchError::AcquisitionFailed { attempts })
    }
}

/// Holds the per-key lock; removes the map entry when the last holder leaves
struct FlightGuard {
    map: Arc<FlightMap>,
    key: FlightKey,
    slot: Arc<AsyncMutex<()>>,
    _held: OwnedMutexGuard<()>,
}

impl Drop for FlightGuard {
    fn drop(&mut self) {
        let mut map = self.map.lock().unwrap_or_else(PoisonError::into_inner);
        // Three references while nobody waits: the map, `slot`, and the held guard.
        if let Some(current) = map.get(&self.key) {
            if Arc::ptr_eq(current, &self.slot) && Arc::strong_count(&self.slot) <= 3 {
                map.remove(&self.key);
            }
        }
    }
}
