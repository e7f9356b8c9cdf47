//! Per-asset image delivery with escalating retry and placeholder fallback.
//!
//! Each rendered asset owns an [`ImageDelivery`] adapter, not a singleton.
//! A failed load is retried with escalating delay (`2s, 4s, ...` by default)
//! and a fresh cache-busting token on the request URL; once the retry
//! budget is spent the adapter permanently reports a placeholder for that
//! asset instead of erroring the page. Permanent failures bump a shared
//! [`FailureTally`] so the presentation layer can warn when many assets are
//! failing (an advisory signal only).

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, instrument, warn};

use crate::drive::{DriveClient, FetchError};

/// Default number of delivery retries per asset.
pub const DEFAULT_MAX_RETRIES: u32 = 2;

/// Base delay before the first delivery retry; doubles per retry.
pub const RETRY_BASE_DELAY: Duration = Duration::from_secs(2);

/// Loads image bytes for display.
///
/// The presentation layer supplies the real loader; tests script one.
#[async_trait]
pub trait ImageLoader: Send + Sync {
    /// Loads the image at `url`.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError`] when the load fails.
    async fn load(&self, url: &str) -> Result<Vec<u8>, FetchError>;
}

/// [`ImageLoader`] that fetches thumbnails over HTTP.
#[derive(Debug, Clone, Default)]
pub struct HttpImageLoader {
    http: reqwest::Client,
}

impl HttpImageLoader {
    /// Creates a loader with a default HTTP client.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ImageLoader for HttpImageLoader {
    async fn load(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| FetchError::network(url, e))?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::status(url, status.as_u16()));
        }
        let bytes = response
            .bytes()
            .await
            .map_err(|e| FetchError::network(url, e))?;
        Ok(bytes.to_vec())
    }
}

/// Shared counter aggregating permanent delivery failures across a page.
#[derive(Debug, Clone, Default)]
pub struct FailureTally {
    count: Arc<AtomicUsize>,
}

impl FailureTally {
    /// Creates a tally at zero.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one permanent delivery failure.
    pub fn record(&self) {
        self.count.fetch_add(1, Ordering::Relaxed);
    }

    /// Returns how many assets have permanently failed so far.
    #[must_use]
    pub fn count(&self) -> usize {
        self.count.load(Ordering::Relaxed)
    }
}

/// Outcome of a delivery attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageOutcome {
    /// The image loaded; bytes are ready to display.
    Rendered(Vec<u8>),
    /// Retries are spent; show the placeholder for this asset.
    Placeholder,
}

/// Per-rendered-asset delivery adapter.
///
/// Owns its retry counter and error flag. Rebinding to a *different* asset
/// id resets both; rebinding to the same id is a no-op.
pub struct ImageDelivery {
    asset_id: String,
    width: u32,
    thumbnail_url: String,
    bust: Option<u64>,
    retry_count: u32,
    max_retries: u32,
    base_delay: Duration,
    has_error: bool,
    tally: FailureTally,
}

impl ImageDelivery {
    /// Creates an adapter for `asset_id` rendered at `width` pixels.
    #[must_use]
    pub fn new(
        client: &DriveClient,
        asset_id: impl Into<String>,
        width: u32,
        tally: FailureTally,
    ) -> Self {
        let asset_id = asset_id.into();
        Self {
            thumbnail_url: client.thumbnail_url(&asset_id, width),
            asset_id,
            width,
            bust: None,
            retry_count: 0,
            max_retries: DEFAULT_MAX_RETRIES,
            base_delay: RETRY_BASE_DELAY,
            has_error: false,
            tally,
        }
    }

    /// Overrides the retry budget and base delay.
    #[must_use]
    pub fn with_retry_limits(mut self, max_retries: u32, base_delay: Duration) -> Self {
        self.max_retries = max_retries;
        self.base_delay = base_delay;
        self
    }

    /// Returns the asset this adapter delivers.
    #[must_use]
    pub fn asset_id(&self) -> &str {
        &self.asset_id
    }

    /// Returns how many retries have been spent.
    #[must_use]
    pub fn retry_count(&self) -> u32 {
        self.retry_count
    }

    /// Whether the adapter has permanently degraded to the placeholder.
    #[must_use]
    pub fn has_error(&self) -> bool {
        self.has_error
    }

    /// The URL the next request will use.
    ///
    /// Carries a cache-busting token once at least one retry happened, so
    /// intermediaries cannot replay the failed response.
    #[must_use]
    pub fn request_url(&self) -> String {
        match self.bust {
            Some(token) => format!("{}&cb={token:016x}", self.thumbnail_url),
            None => self.thumbnail_url.clone(),
        }
    }

    /// Delivers the asset, retrying with escalating delay before degrading
    /// to a placeholder.
    #[instrument(skip(self, loader), fields(asset = %self.asset_id))]
    pub async fn present(&mut self, loader: &dyn ImageLoader) -> ImageOutcome {
        if self.has_error {
            return ImageOutcome::Placeholder;
        }
        loop {
            match loader.load(&self.request_url()).await {
                Ok(bytes) => {
                    debug!(retries = self.retry_count, "image delivered");
                    return ImageOutcome::Rendered(bytes);
                }
                Err(err) => {
                    if self.retry_count >= self.max_retries {
                        self.has_error = true;
                        self.tally.record();
                        warn!(error = %err, retries = self.retry_count,
                            "image delivery failed, placeholder shown");
                        return ImageOutcome::Placeholder;
                    }
                    let delay = self.base_delay * 2u32.saturating_pow(self.retry_count);
                    debug!(error = %err, retry = self.retry_count + 1,
                        delay_ms = delay.as_millis() as u64,
                        "image load failed, retrying with cache-busting token");
                    tokio::time::sleep(delay).await;
                    self.retry_count += 1;
                    self.bust = Some(rand::random());
                }
            }
        }
    }

    /// Rebinds the adapter to a new asset: a new id means fresh counters.
    pub fn rebind(&mut self, client: &DriveClient, asset_id: impl Into<String>) {
        let asset_id = asset_id.into();
        if asset_id == self.asset_id {
            return;
        }
        self.thumbnail_url = client.thumbnail_url(&asset_id, self.width);
        self.asset_id = asset_id;
        self.bust = None;
        self.retry_count = 0;
        self.has_error = false;
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::config::DriveConfig;

    /// Loader that fails the first `fail_first` loads, then succeeds.
    struct ScriptedLoader {
        calls: AtomicUsize,
        fail_first: usize,
    }

    impl ScriptedLoader {
        fn failing_first(fail_first: usize) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                fail_first,
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ImageLoader for ScriptedLoader {
        async fn load(&self, url: &str) -> Result<Vec<u8>, FetchError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            if n < self.fail_first {
                Err(FetchError::status(url, 500))
            } else {
                Ok(vec![0xAB])
            }
        }
    }

    fn test_client() -> DriveClient {
        DriveClient::new(&DriveConfig::new("k")).unwrap()
    }

    fn fast_delivery(client: &DriveClient, asset_id: &str, tally: FailureTally) -> ImageDelivery {
        ImageDelivery::new(client, asset_id, 640, tally)
            .with_retry_limits(2, Duration::from_millis(1))
    }

    #[tokio::test]
    async fn test_success_without_retries_keeps_plain_url() {
        let client = test_client();
        let mut delivery = fast_delivery(&client, "a1", FailureTally::new());
        let loader = ScriptedLoader::failing_first(0);

        let outcome = delivery.present(&loader).await;
        assert_eq!(outcome, ImageOutcome::Rendered(vec![0xAB]));
        assert_eq!(delivery.retry_count(), 0);
        assert!(!delivery.request_url().contains("cb="));
    }

    #[tokio::test]
    async fn test_recovers_after_failures_with_cache_busting() {
        let client = test_client();
        let mut delivery = fast_delivery(&client, "a1", FailureTally::new());
        let loader = ScriptedLoader::failing_first(2);

        let outcome = delivery.present(&loader).await;
        assert_eq!(outcome, ImageOutcome::Rendered(vec![0xAB]));
        assert_eq!(delivery.retry_count(), 2);
        assert_eq!(loader.calls(), 3);
        assert!(delivery.request_url().contains("&cb="));
        assert!(!delivery.has_error());
    }

    #[tokio::test]
    async fn test_exhausted_retries_degrade_to_placeholder() {
        let client = test_client();
        let tally = FailureTally::new();
        let mut delivery = fast_delivery(&client, "a1", tally.clone());
        let loader = ScriptedLoader::failing_first(usize::MAX);

        let outcome = delivery.present(&loader).await;
        assert_eq!(outcome, ImageOutcome::Placeholder);
        assert!(delivery.has_error());
        assert_eq!(loader.calls(), 3, "initial load plus two retries");
        assert_eq!(tally.count(), 1);

        // The error is permanent for this asset: no further loads happen.
        let outcome = delivery.present(&loader).await;
        assert_eq!(outcome, ImageOutcome::Placeholder);
        assert_eq!(loader.calls(), 3);
        assert_eq!(tally.count(), 1, "tally records each asset once");
    }

    #[tokio::test]
    async fn test_rebind_to_new_asset_resets_state() {
        let client = test_client();
        let mut delivery = fast_delivery(&client, "a1", FailureTally::new());
        let loader = ScriptedLoader::failing_first(usize::MAX);
        delivery.present(&loader).await;
        assert!(delivery.has_error());

        delivery.rebind(&client, "a2");
        assert_eq!(delivery.asset_id(), "a2");
        assert!(!delivery.has_error());
        assert_eq!(delivery.retry_count(), 0);
        assert!(!delivery.request_url().contains("cb="));

        // Same-id rebind changes nothing.
        let fresh = ScriptedLoader::failing_first(usize::MAX);
        delivery.present(&fresh).await;
        assert!(delivery.has_error());
        delivery.rebind(&client, "a2");
        assert!(delivery.has_error());
    }
}
