//! Access-token cache owned by a provider adapter.
//!
//! Holds at most one token behind an async mutex. Callers that find the token
//! missing or about to expire refresh it while holding the lock, so concurrent
//! requests share a single refresh.

use std::fmt;
use std::future::Future;
use std::time::{Duration, Instant};

use tokio::sync::Mutex;
use waterwatch_core::ProviderError;

/// Tokens are refreshed this long before they actually expire
pub const DEFAULT_REFRESH_MARGIN: Duration = Duration::from_secs(60);

#[derive(Clone)]
pub struct AccessToken {
    value: String,
    expires_at: Instant,
}

impl AccessToken {
    /// A token valid for `ttl` from now
    pub fn new(value: impl Into<String>, ttl: Duration) -> Self {
        let now = Instant::now();
        Self {
            value: value.into(),
            expires_at: now.checked_add(ttl).unwrap_or(now),
        }
    }

    pub fn expiring_at(value: impl Into<String>, expires_at: Instant) -> Self {
        Self {
            value: value.into(),
            expires_at,
        }
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    /// Still usable at `now` with `margin` to spare
    pub fn is_fresh(&self, margin: Duration, now: Instant) -> bool {
        match now.checked_add(margin) {
            Some(deadline) => deadline < self.expires_at,
            None => false,
        }
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessToken")
            .field("value", &"<redacted>")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

#[derive(Debug)]
pub struct TokenCache {
    slot: Mutex<Option<AccessToken>>,
    refresh_margin: Duration,
}

impl Default for TokenCache {
    fn default() -> Self {
        Self::new(DEFAULT_REFRESH_MARGIN)
    }
}

impl TokenCache {
    pub fn new(refresh_margin: Duration) -> Self {
        Self {
            slot: Mutex::new(None),
            refresh_margin,
        }
    }

    /// Return the cached token, calling `refresh` first if it is missing or stale
    pub async fn get_or_refresh<F, Fut>(&self, refresh: F) -> Result<String, ProviderError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<AccessToken, ProviderError>>,
    {
        let mut slot = self.slot.lock().await;

        if let Some(token) = slot.as_ref() {
            if token.is_fresh(self.refresh_margin, Instant::now()) {
                return Ok(token.value.clone());
            }
        }

        tracing::debug!("Refreshing provider access token");
        let token = refresh().await?;
        let value = token.value.clone();
        *slot = Some(token);
        Ok(value)
    }

    /// Drop the cached token, e.g. after the provider rejected it
    pub async fn invalidate(&self) {
        *self.slot.lock().await = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_freshness_respects_margin() {
        let now = Instant::now();
        let token = AccessToken::expiring_at("t", now + Duration::from_secs(90));
        assert!(token.is_fresh(Duration::from_secs(60), now));
        assert!(!token.is_fresh(Duration::from_secs(120), now));
    }

    #[test]
    fn test_debug_redacts_value() {
        let token = AccessToken::new("secret-token", Duration::from_secs(10));
        assert!(!format!("{:?}", token).contains("secret-token"));
    }

    #[tokio::test]
    async fn test_fresh_token_is_reused() {
        let cache = TokenCache::default();
        let refreshes = AtomicUsize::new(0);

        for _ in 0..3 {
            let value = cache
                .get_or_refresh(|| async {
                    refreshes.fetch_add(1, Ordering::SeqCst);
                    Ok(AccessToken::new("abc", Duration::from_secs(3600)))
                })
                .await
                .unwrap();
            assert_eq!(value, "abc");
        }

        assert_eq!(refreshes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_stale_token_is_refreshed() {
        let cache = TokenCache::default();

        // Expires inside the refresh margin.
        cache
            .get_or_refresh(|| async { Ok(AccessToken::new("old", Duration::from_secs(30))) })
            .await
            .unwrap();

        let value = cache
            .get_or_refresh(|| async { Ok(AccessToken::new("new", Duration::from_secs(3600))) })
            .await
            .unwrap();
        assert_eq!(value, "new");
    }

    #[tokio::test]
    async fn test_refresh_failure_is_returned_and_not_cached() {
        let cache = TokenCache::default();

        let err = cache
            .get_or_refresh(|| async {
                Err(ProviderError::Unauthorized {
                    reason: "bad secret".to_string(),
                })
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::Unauthorized { .. }));

        let value = cache
            .get_or_refresh(|| async { Ok(AccessToken::new("ok", Duration::from_secs(3600))) })
            .await
            .unwrap();
        assert_eq!(value, "ok");
    }

    #[tokio::test]
    async fn test_concurrent_callers_share_one_refresh() {
        let cache = Arc::new(TokenCache::default());
        let refreshes = Arc::new(AtomicUsize::new(0));

        let tasks: Vec<_> = (0..8)
            .map(|_| {
                let cache = cache.clone();
                let refreshes = refreshes.clone();
                tokio::spawn(async move {
                    cache
                        .get_or_refresh(|| async move {
                            refreshes.fetch_add(1, Ordering::SeqCst);
                            tokio::time::sleep(Duration::from_millis(20)).await;
                            Ok(AccessToken::new("shared", Duration::from_secs(3600)))
                        })
                        .await
                })
            })
            .collect();

        for task in tasks {
            assert_eq!(task.await.unwrap().unwrap(), "shared");
        }
        assert_eq!(refreshes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_invalidate_forces_refresh() {
        let cache = TokenCache::default();
        cache
            .get_or_refresh(|| async { Ok(AccessToken::new("first", Duration::from_secs(3600))) })
            .await
            .unwrap();

        cache.invalidate().await;

        let value = cache
            .get_or_refresh(|| async { Ok(AccessToken::new("second", Duration::from_secs(3600))) })
            .await
            .unwrap();
        assert_eq!(value, "second");
    }
}
