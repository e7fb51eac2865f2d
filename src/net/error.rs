//! Error types for the net module.
//!
//! Transport errors are never recovered inside this crate. The retrieval path
//! returns them to its caller unchanged and the download path reports them
//! through listener failure callbacks.

use thiserror::Error;

/// Network or IO failure while opening, connecting or reading a connection.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Network-level error (DNS resolution, connection refused, TLS errors, etc.)
    #[error("network error fetching {url}: {source}")]
    Network {
        /// The URL that failed.
        url: String,
        /// The underlying network error.
        #[source]
        source: reqwest::Error,
    },

    /// The connection did not produce a response in time.
    #[error("timeout fetching {url}")]
    Timeout {
        /// The URL that timed out.
        url: String,
    },

    /// HTTP error response (4xx client errors, 5xx server errors).
    #[error("HTTP {status} fetching {url}")]
    HttpStatus {
        /// The URL that returned an error status.
        url: String,
        /// The HTTP status code.
        status: u16,
    },

    /// Local IO error (filesystem reads, interrupted streams).
    #[error("IO error fetching {url}: {source}")]
    Io {
        /// The URL being read.
        url: String,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// A `data:` URL could not be decoded.
    #[error("malformed data URL {url}: {reason}")]
    DataUrl {
        /// The offending URL.
        url: String,
        /// Why decoding failed.
        reason: String,
    },

    /// No connection type handles the URL's scheme.
    #[error("unsupported URL scheme '{scheme}' in {url}")]
    UnsupportedScheme {
        /// The offending URL.
        url: String,
        /// The unsupported scheme.
        scheme: String,
    },

    /// The response body was already read from this connection.
    #[error("response body of {url} was already consumed")]
    BodyConsumed {
        /// The URL whose body was consumed.
        url: String,
    },
}

impl TransportError {
    /// Creates a network error from a reqwest error, promoting timeouts.
    pub fn network(url: impl Into<String>, source: reqwest::Error) -> Self {
        if source.is_timeout() {
            Self::timeout(url)
        } else {
            Self::Network {
                url: url.into(),
                source,
            }
        }
    }

    /// Creates a timeout error.
    pub fn timeout(url: impl Into<String>) -> Self {
        Self::Timeout { url: url.into() }
    }

    /// Creates an HTTP status error.
    pub fn http_status(url: impl Into<String>, status: u16) -> Self {
        Self::HttpStatus {
            url: url.into(),
            status,
        }
    }

    /// Creates an IO error.
    pub fn io(url: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            url: url.into(),
            source,
        }
    }

    /// Creates a data URL decoding error.
    pub fn data_url(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::DataUrl {
            url: url.into(),
            reason: reason.into(),
        }
    }

    /// Creates an unsupported scheme error.
    pub fn unsupported_scheme(url: impl Into<String>, scheme: impl Into<String>) -> Self {
        Self::UnsupportedScheme {
            url: url.into(),
            scheme: scheme.into(),
        }
    }

    /// Creates a body-consumed error.
    pub fn body_consumed(url: impl Into<String>) -> Self {
        Self::BodyConsumed { url: url.into() }
    }
}
