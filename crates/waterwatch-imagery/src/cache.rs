//! On-disk satellite image cache.
//!
//! One file per (rounded coordinate, date, provider). Files are written to a
//! temporary name in the cache directory and renamed into place, so readers
//! never observe a partial image.

use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock};

use waterwatch_core::error::{Result, WaterwatchError};
use waterwatch_core::models::{CacheKey, CachedImage, ImageFormat, ProviderImage};

const PARTIAL_PREFIX: &str = ".partial-";

#[derive(Debug)]
pub struct ImageCache {
    root: PathBuf,
    index: RwLock<HashMap<CacheKey, CachedImage>>,
}

impl ImageCache {
    /// Create a cache rooted at `root`. The directory is created on first write.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            index: RwLock::new(HashMap::new()),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path_for(&self, key: &CacheKey, format: ImageFormat) -> PathBuf {
        self.root.join(key.file_name(format))
    }

    /// Find a cached image, first in this process's index, then on disk
    pub fn lookup(&self, key: &CacheKey) -> Option<CachedImage> {
        if let Some(hit) = self.index.read().unwrap_or_else(PoisonError::into_inner).get(key) {
            return Some(hit.clone());
        }

        let (path, format) = ImageFormat::ALL
            .iter()
            .map(|format| (self.path_for(key, *format), *format))
            .find(|(path, _)| path.is_file())?;

        let image = CachedImage {
            provider: key.provider.clone(),
            path,
            date: key.date,
            location: key.coordinate.to_string(),
            format,
            resolution: None,
            cloud_coverage: None,
        };

        self.index
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.clone(), image.clone());

        Some(image)
    }

    /// Persist a provider result under `key`.
    ///
    /// The write runs on a blocking task, so it completes even if the
    /// calling future is dropped half way.
    pub async fn store(&self, key: &CacheKey, image: ProviderImage) -> Result<CachedImage> {
        let path = self.path_for(key, image.format);

        let root = self.root.clone();
        let target = path.clone();
        let bytes = image.bytes;
        tokio::task::spawn_blocking(move || write_atomic(&root, &target, &bytes))
            .await
            .map_err(|e| WaterwatchError::Cache {
                path: path.clone(),
                reason: format!("cache writer task failed: {}", e),
            })??;

        let cached = CachedImage {
            provider: key.provider.clone(),
            path,
            date: key.date,
            location: key.coordinate.to_string(),
            format: image.format,
            resolution: Some(image.resolution),
            cloud_coverage: image.cloud_coverage,
        };

        self.index
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.clone(), cached.clone());

        tracing::debug!(path = %cached.path.display(), "Cached satellite image");
        Ok(cached)
    }

    /// Number of entries known to this process
    pub fn indexed_len(&self) -> usize {
        self.index.read().unwrap_or_else(PoisonError::into_inner).len()
    }
}

fn write_atomic(root: &Path, target: &Path, bytes: &[u8]) -> Result<()> {
    fs::create_dir_all(root)?;

    let mut partial = tempfile::Builder::new().prefix(PARTIAL_PREFIX).tempfile_in(root)?;
    partial.write_all(bytes)?;
    partial.as_file().sync_all()?;

    partial.persist(target).map_err(|e| WaterwatchError::Cache {
        path: target.to_path_buf(),
        reason: e.error.to_string(),
    })?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use tempfile::TempDir;
    use waterwatch_core::models::{Coordinate, ImageDimensions, ProviderId};

    fn key(provider: &str) -> CacheKey {
        CacheKey::new(
            Coordinate::new(-8.65, 115.2167).unwrap().key(4),
            NaiveDate::from_ymd_opt(2025, 3, 1).unwrap(),
            ProviderId::new(provider),
        )
    }

    fn image(provider: &str) -> ProviderImage {
        ProviderImage::new(
            ProviderId::new(provider),
            vec![0x89, b'P', b'N', b'G', 1, 2, 3],
            ImageFormat::Png,
            ImageDimensions::square(64),
        )
        .with_cloud_coverage(12.5)
    }

    #[tokio::test]
    async fn test_store_then_lookup() {
        let dir = TempDir::new().unwrap();
        let cache = ImageCache::new(dir.path().join("sat"));

        let stored = cache.store(&key("sentinel_hub"), image("sentinel_hub")).await.unwrap();
        assert_eq!(
            stored.path,
            dir.path().join("sat").join("sentinel_hub_-8.6500_115.2167_20250301.png")
        );
        assert_eq!(fs::read(&stored.path).unwrap(), image("sentinel_hub").bytes);
        assert_eq!(stored.cloud_coverage, Some(12.5));

        let hit = cache.lookup(&key("sentinel_hub")).unwrap();
        assert_eq!(hit, stored);
        assert!(cache.lookup(&key("nasa_earth")).is_none());
    }

    #[tokio::test]
    async fn test_store_leaves_no_partial_files() {
        let dir = TempDir::new().unwrap();
        let cache = ImageCache::new(dir.path());

        cache.store(&key("earth_engine"), image("earth_engine")).await.unwrap();

        let names: Vec<String> = fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names.len(), 1);
        assert!(!names[0].starts_with(PARTIAL_PREFIX));
    }

    #[tokio::test]
    async fn test_lookup_finds_files_from_earlier_runs() {
        let dir = TempDir::new().unwrap();
        {
            let cache = ImageCache::new(dir.path());
            cache.store(&key("nasa_earth"), image("nasa_earth")).await.unwrap();
        }

        let fresh = ImageCache::new(dir.path());
        assert_eq!(fresh.indexed_len(), 0);

        let hit = fresh.lookup(&key("nasa_earth")).unwrap();
        assert_eq!(hit.format, ImageFormat::Png);
        assert!(hit.resolution.is_none());
        assert_eq!(fresh.indexed_len(), 1);
    }
}
