//! Client configuration for the remote folder store.
//!
//! Everything the engine needs to reach the remote service travels in an
//! explicit [`DriveConfig`] passed into constructors. There are no
//! process-wide globals: independent pipelines (interactive browsing and
//! bulk download) build their own clients and queues from their own
//! configuration.

use std::time::Duration;

/// Default page size for listing requests.
pub const DEFAULT_PAGE_SIZE: u32 = 100;

/// Default base URL of the folder/file listing API.
pub const DEFAULT_API_BASE: &str = "https://www.googleapis.com/drive/v3";

/// Default base URL of the thumbnail endpoint.
pub const DEFAULT_THUMBNAIL_BASE: &str = "https://drive.google.com/thumbnail";

/// Default connect timeout for API requests.
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Default read timeout; listing responses are small but asset content is not.
const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(120);

/// Configuration for [`DriveClient`](crate::drive::DriveClient).
///
/// Construct with [`DriveConfig::new`] and override individual fields with
/// the `with_*` builders where the defaults do not fit (tests point
/// `api_base` at a mock server).
#[derive(Debug, Clone)]
pub struct DriveConfig {
    /// API key appended to every request.
    pub api_key: String,
    /// Base URL of the listing/content API.
    pub api_base: String,
    /// Base URL of the thumbnail endpoint.
    pub thumbnail_base: String,
    /// Page size for listing requests.
    pub page_size: u32,
    /// Connect timeout for API requests.
    pub connect_timeout: Duration,
    /// Read timeout for API requests.
    pub read_timeout: Duration,
}

impl DriveConfig {
    /// Creates a configuration with production defaults and the given API key.
    #[must_use]
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            api_base: DEFAULT_API_BASE.to_string(),
            thumbnail_base: DEFAULT_THUMBNAIL_BASE.to_string(),
            page_size: DEFAULT_PAGE_SIZE,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            read_timeout: DEFAULT_READ_TIMEOUT,
        }
    }

    /// Overrides the listing/content API base URL.
    #[must_use]
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    /// Overrides the thumbnail base URL.
    #[must_use]
    pub fn with_thumbnail_base(mut self, thumbnail_base: impl Into<String>) -> Self {
        self.thumbnail_base = thumbnail_base.into();
        self
    }

    /// Overrides the listing page size.
    #[must_use]
    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size;
        self
    }

    /// Overrides both request timeouts.
    #[must_use]
    pub fn with_timeouts(mut self, connect_timeout: Duration, read_timeout: Duration) -> Self {
        self.connect_timeout = connect_timeout;
        self.read_timeout = read_timeout;
        self
    }
}
