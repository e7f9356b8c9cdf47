//! Error types for remote store operations.
//!
//! [`FetchError`] is the single failure type for everything that crosses the
//! network. Its [`ErrorKind`] classification happens here, at the boundary
//! where the raw transport failure is first observed; downstream retry and
//! reporting logic switch on that closed set.

use thiserror::Error;

use crate::retry::{Classify, ErrorKind};

/// HTTP status the remote service uses for request throttling.
const STATUS_TOO_MANY_REQUESTS: u16 = 429;

/// Errors that can occur talking to the remote store.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Network-level error (DNS resolution, connection refused, TLS errors,
    /// interrupted body).
    #[error("network error requesting {url}: {source}")]
    Network {
        /// The URL that failed.
        url: String,
        /// The underlying network error.
        #[source]
        source: reqwest::Error,
    },

    /// Request timed out before completion.
    #[error("timeout requesting {url}")]
    Timeout {
        /// The URL that timed out.
        url: String,
    },

    /// HTTP error response (4xx client errors, 5xx server errors).
    #[error("HTTP {status} requesting {url}")]
    Status {
        /// The URL that returned an error status.
        url: String,
        /// The HTTP status code.
        status: u16,
    },

    /// Response body did not decode as the expected shape.
    #[error("invalid response body from {url}: {source}")]
    Decode {
        /// The URL whose response failed to decode.
        url: String,
        /// The underlying decode error.
        #[source]
        source: serde_json::Error,
    },
}

impl FetchError {
    /// Creates a network error from a reqwest error, folding timeouts into
    /// their own variant.
    pub fn network(url: impl Into<String>, source: reqwest::Error) -> Self {
        let url = url.into();
        if source.is_timeout() {
            Self::Timeout { url }
        } else {
            Self::Network { url, source }
        }
    }

    /// Creates an HTTP status error.
    pub fn status(url: impl Into<String>, status: u16) -> Self {
        Self::Status {
            url: url.into(),
            status,
        }
    }

    /// Creates a decode error.
    pub fn decode(url: impl Into<String>, source: serde_json::Error) -> Self {
        Self::Decode {
            url: url.into(),
            source,
        }
    }
}

impl Classify for FetchError {
    fn kind(&self) -> ErrorKind {
        match self {
            Self::Status { status, .. } if *status == STATUS_TOO_MANY_REQUESTS => {
                ErrorKind::RateLimited
            }
            _ => ErrorKind::Transient,
        }
    }
}

/// Errors constructing a [`DriveClient`](crate::drive::DriveClient).
#[derive(Debug, Error)]
pub enum ClientError {
    /// A configured base URL is not a valid absolute URL.
    #[error("invalid base URL {url}: {source}")]
    InvalidBaseUrl {
        /// The offending URL string.
        url: String,
        /// The underlying parse error.
        #[source]
        source: url::ParseError,
    },

    /// The underlying HTTP client could not be built.
    #[error("failed to build HTTP client: {0}")]
    Http(#[from] reqwest::Error),
}
