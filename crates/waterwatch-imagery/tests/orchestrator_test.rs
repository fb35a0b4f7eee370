//! Integration tests for provider fallback, caching and single-flight acquisition

use async_trait::async_trait;
use chrono::NaiveDate;
use proptest::prelude::*;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use waterwatch_core::models::{
    AttemptOutcome, BoundingBox, Coordinate, ImageDimensions, ImageFormat, ProviderId,
    ProviderImage,
};
use waterwatch_core::ports::ImageryProvider;
use waterwatch_core::{ProviderError, WaterwatchError};
use waterwatch_imagery::{ImageCache, ImageryOrchestrator};

const PNG: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 7, 7, 7];

#[derive(Clone, Copy)]
enum Behaviour {
    Succeed,
    Fail,
    Hang,
    Empty,
}

struct FakeProvider {
    name: &'static str,
    configured: bool,
    behaviour: Behaviour,
    delay: Duration,
    calls: AtomicUsize,
}

impl FakeProvider {
    fn new(name: &'static str, behaviour: Behaviour) -> Arc<Self> {
        Arc::new(Self {
            name,
            configured: true,
            behaviour,
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
        })
    }

    fn unconfigured(name: &'static str) -> Arc<Self> {
        Arc::new(Self {
            name,
            configured: false,
            behaviour: Behaviour::Succeed,
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
        })
    }

    fn slow(name: &'static str, delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            name,
            configured: true,
            behaviour: Behaviour::Succeed,
            delay,
            calls: AtomicUsize::new(0),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ImageryProvider for FakeProvider {
    fn id(&self) -> ProviderId {
        ProviderId::new(self.name)
    }

    fn is_configured(&self) -> bool {
        self.configured
    }

    async fn fetch(
        &self,
        _bbox: &BoundingBox,
        date: NaiveDate,
        dimensions: ImageDimensions,
    ) -> Result<ProviderImage, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        match self.behaviour {
            Behaviour::Succeed => Ok(ProviderImage::new(
                self.id(),
                PNG.to_vec(),
                ImageFormat::Png,
                dimensions,
            )),
            Behaviour::Fail => Err(ProviderError::NoImagery { date }),
            Behaviour::Hang => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Err(ProviderError::Network {
                    reason: "unreachable".to_string(),
                })
            }
            Behaviour::Empty => {
                Ok(ProviderImage::new(self.id(), Vec::new(), ImageFormat::Png, dimensions))
            }
        }
    }
}

fn date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 1, 20).unwrap()
}

fn coordinate() -> Coordinate {
    Coordinate::new(40.7128, -74.0060).unwrap()
}

fn orchestrator(dir: &TempDir, providers: Vec<Arc<FakeProvider>>) -> ImageryOrchestrator {
    ImageryOrchestrator::new(ImageCache::new(dir.path()))
        .with_providers(providers.into_iter().map(|p| p as Arc<dyn ImageryProvider>))
        .with_timeout(Duration::from_secs(5))
}

#[tokio::test]
async fn test_second_acquisition_hits_cache() {
    let dir = TempDir::new().unwrap();
    let provider = FakeProvider::new("primary", Behaviour::Succeed);
    let orchestrator = orchestrator(&dir, vec![provider.clone()]);

    let first = orchestrator.acquire(coordinate(), date()).await.unwrap();
    let second = orchestrator.acquire(coordinate(), date()).await.unwrap();

    assert!(!first.from_cache);
    assert!(second.from_cache);
    assert_eq!(first.image.path, second.image.path);
    assert!(second.attempts.is_empty());
    assert_eq!(provider.calls(), 1);
    assert_eq!(
        first.image.path.file_name().unwrap().to_string_lossy(),
        "primary_40.7128_-74.0060_20250120.png"
    );
}

#[tokio::test]
async fn test_float_noise_maps_to_same_cache_entry() {
    let dir = TempDir::new().unwrap();
    let provider = FakeProvider::new("primary", Behaviour::Succeed);
    let orchestrator = orchestrator(&dir, vec![provider.clone()]);

    orchestrator.acquire(coordinate(), date()).await.unwrap();
    let noisy = Coordinate::new(40.71280000001, -74.00599999999).unwrap();
    let again = orchestrator.acquire(noisy, date()).await.unwrap();

    assert!(again.from_cache);
    assert_eq!(provider.calls(), 1);
}

#[tokio::test]
async fn test_falls_back_to_next_provider() {
    let dir = TempDir::new().unwrap();
    let a = FakeProvider::new("a", Behaviour::Fail);
    let b = FakeProvider::new("b", Behaviour::Succeed);
    let orchestrator = orchestrator(&dir, vec![a.clone(), b.clone()]);

    let acquisition = orchestrator.acquire(coordinate(), date()).await.unwrap();

    assert_eq!(acquisition.image.provider.as_str(), "b");
    assert_eq!(acquisition.attempts.len(), 2);
    assert_eq!(
        acquisition.attempts[0].error(),
        Some(&ProviderError::NoImagery { date: date() })
    );
    assert_eq!(acquisition.attempts[1].outcome, AttemptOutcome::Succeeded);
    assert_eq!(acquisition.failures().count(), 1);
    assert_eq!((a.calls(), b.calls()), (1, 1));
}

#[tokio::test]
async fn test_first_success_wins() {
    let dir = TempDir::new().unwrap();
    let a = FakeProvider::new("a", Behaviour::Succeed);
    let b = FakeProvider::new("b", Behaviour::Succeed);
    let orchestrator = orchestrator(&dir, vec![a.clone(), b.clone()]);

    orchestrator.acquire(coordinate(), date()).await.unwrap();

    assert_eq!((a.calls(), b.calls()), (1, 0));
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
}

#[tokio::test]
async fn test_unconfigured_provider_is_reported_not_called() {
    let dir = TempDir::new().unwrap();
    let a = FakeProvider::unconfigured("a");
    let b = FakeProvider::new("b", Behaviour::Succeed);
    let orchestrator = orchestrator(&dir, vec![a.clone(), b.clone()]);

    let acquisition = orchestrator.acquire(coordinate(), date()).await.unwrap();

    assert_eq!(a.calls(), 0);
    assert_eq!(acquisition.attempts[0].outcome, AttemptOutcome::NotConfigured);
    assert_eq!(acquisition.failures().count(), 0);

    let status = orchestrator.provider_status();
    assert_eq!(status.len(), 2);
    assert_eq!(status[0].priority, 1);
    assert!(!status[0].configured);
    assert!(status[1].configured);
}

#[tokio::test]
async fn test_timeout_moves_on() {
    let dir = TempDir::new().unwrap();
    let a = FakeProvider::new("a", Behaviour::Hang);
    let b = FakeProvider::new("b", Behaviour::Succeed);
    let orchestrator =
        orchestrator(&dir, vec![a.clone(), b.clone()]).with_timeout(Duration::from_millis(50));

    let acquisition = orchestrator.acquire(coordinate(), date()).await.unwrap();

    assert_eq!(acquisition.image.provider.as_str(), "b");
    assert!(matches!(acquisition.attempts[0].error(), Some(ProviderError::Timeout { .. })));
}

#[tokio::test]
async fn test_empty_image_counts_as_failure() {
    let dir = TempDir::new().unwrap();
    let a = FakeProvider::new("a", Behaviour::Empty);
    let b = FakeProvider::new("b", Behaviour::Succeed);
    let orchestrator = orchestrator(&dir, vec![a, b]);

    let acquisition = orchestrator.acquire(coordinate(), date()).await.unwrap();

    assert!(matches!(
        acquisition.attempts[0].error(),
        Some(ProviderError::InvalidResponse { .. })
    ));
    assert_eq!(acquisition.image.provider.as_str(), "b");
}

#[tokio::test]
async fn test_all_failing_reports_every_attempt() {
    let dir = TempDir::new().unwrap();
    let orchestrator = orchestrator(
        &dir,
        vec![
            FakeProvider::new("a", Behaviour::Fail),
            FakeProvider::unconfigured("b"),
            FakeProvider::new("c", Behaviour::Fail),
        ],
    );

    let err = orchestrator.acquire(coordinate(), date()).await.unwrap_err();

    match err {
        WaterwatchError::AcquisitionFailed { attempts } => {
            let names: Vec<&str> = attempts.iter().map(|a| a.provider.as_str()).collect();
            assert_eq!(names, vec!["a", "b", "c"]);
            assert_eq!(attempts.iter().filter(|a| a.is_failure()).count(), 2);
        }
        other => panic!("expected AcquisitionFailed, got {:?}", other),
    }
    assert_eq!(std::fs::read_dir(dir.path()).map(|d| d.count()).unwrap_or(0), 0);
}

#[tokio::test]
async fn test_no_providers_is_a_failure() {
    let dir = TempDir::new().unwrap();
    let orchestrator = orchestrator(&dir, Vec::new());

    let err = orchestrator.acquire(coordinate(), date()).await.unwrap_err();
    assert!(matches!(err, WaterwatchError::AcquisitionFailed { ref attempts } if attempts.is_empty()));
}

#[tokio::test]
async fn test_concurrent_same_key_fetches_once() {
    let dir = TempDir::new().unwrap();
    let provider = FakeProvider::slow("primary", Duration::from_millis(50));
    let orchestrator = orchestrator(&dir, vec![provider.clone()]);

    let results =
        futures::future::join_all((0..6).map(|_| orchestrator.acquire(coordinate(), date()))).await;

    assert_eq!(provider.calls(), 1);
    let paths: Vec<_> = results.into_iter().map(|r| r.unwrap().image.path).collect();
    assert!(paths.windows(2).all(|w| w[0] == w[1]));
}

#[tokio::test]
async fn test_concurrent_different_keys_fetch_independently() {
    let dir = TempDir::new().unwrap();
    let provider = FakeProvider::slow("primary", Duration::from_millis(20));
    let orchestrator = orchestrator(&dir, vec![provider.clone()]);

    let coordinates = [
        Coordinate::new(10.0, 10.0).unwrap(),
        Coordinate::new(20.0, 20.0).unwrap(),
        Coordinate::new(30.0, 30.0).unwrap(),
    ];
    let results =
        futures::future::join_all(coordinates.iter().map(|c| orchestrator.acquire(*c, date())))
            .await;

    assert!(results.iter().all(|r| r.is_ok()));
    assert_eq!(provider.calls(), 3);
}

#[tokio::test]
async fn test_cancelled_acquisition_releases_key() {
    let dir = TempDir::new().unwrap();
    let provider = FakeProvider::slow("primary", Duration::from_millis(200));
    let orchestrator = orchestrator(&dir, vec![provider.clone()]);

    // Dropped mid-fetch
    let abandoned =
        tokio::time::timeout(Duration::from_millis(20), orchestrator.acquire(coordinate(), date()))
            .await;
    assert!(abandoned.is_err());

    let acquisition =
        tokio::time::timeout(Duration::from_secs(2), orchestrator.acquire(coordinate(), date()))
            .await
            .expect("key should be free after cancellation")
            .unwrap();

    assert!(!acquisition.from_cache);
    assert_eq!(provider.calls(), 2);

    let leftovers: Vec<_> = std::fs::read_dir(dir.path())
        .unwrap()
        .map(|entry| entry.unwrap().file_name().to_string_lossy().to_string())
        .filter(|name| name.starts_with(".partial-"))
        .collect();
    assert!(leftovers.is_empty(), "{:?}", leftovers);
}

#[tokio::test]
async fn test_acquire_raw_rejects_bad_date() {
    let dir = TempDir::new().unwrap();
    let provider = FakeProvider::new("primary", Behaviour::Succeed);
    let orchestrator = orchestrator(&dir, vec![provider.clone()]);

    let err = orchestrator.acquire_raw(10.0, 10.0, "2025-13-40").await.unwrap_err();

    assert!(matches!(err, WaterwatchError::Validation { ref field, .. } if field == "date"));
    assert_eq!(provider.calls(), 0);
}

#[tokio::test]
async fn test_cache_from_previous_run_is_reused() {
    let dir = TempDir::new().unwrap();
    {
        let provider = FakeProvider::new("primary", Behaviour::Succeed);
        orchestrator(&dir, vec![provider]).acquire(coordinate(), date()).await.unwrap();
    }

    let provider = FakeProvider::new("primary", Behaviour::Succeed);
    let acquisition = orchestrator(&dir, vec![provider.clone()])
        .acquire(coordinate(), date())
        .await
        .unwrap();

    assert!(acquisition.from_cache);
    assert_eq!(provider.calls(), 0);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_out_of_range_coordinates_never_reach_providers(
        lat in prop_oneof![-1000.0f64..-90.0001, 90.0001f64..1000.0],
        lon in -180.0f64..=180.0,
    ) {
        let runtime = tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap();
        let dir = TempDir::new().unwrap();
        let provider = FakeProvider::new("primary", Behaviour::Succeed);
        let orchestrator = orchestrator(&dir, vec![provider.clone()]);

        let result = runtime.block_on(orchestrator.acquire_raw(lat, lon, "2025-01-20"));

        let is_validation = matches!(result, Err(WaterwatchError::Validation { .. }));
        prop_assert!(is_validation);
        prop_assert_eq!(provider.calls(), 0);
    }

    #[test]
    fn prop_out_of_range_longitude_never_reaches_providers(
        lat in -90.0f64..=90.0,
        lon in prop_oneof![-1000.0f64..-180.0001, 180.0001f64..1000.0],
    ) {
        let runtime = tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap();
        let dir = TempDir::new().unwrap();
        let provider = FakeProvider::new("primary", Behaviour::Succeed);
        let orchestrator = orchestrator(&dir, vec![provider.clone()]);

        let result = runtime.block_on(orchestrator.acquire_raw(lat, lon, "2025-01-20"));

        let is_validation = matches!(result, Err(WaterwatchError::Validation { .. }));
        prop_assert!(is_validation);
        prop_assert_eq!(provider.calls(), 0);
    }
}
