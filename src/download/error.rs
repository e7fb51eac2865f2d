//! Error types for the download module.

use thiserror::Error;

use crate::net::TransportError;

/// Boxed error returned by content decoders.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Failure to construct or complete a resource download.
#[derive(Debug, Error)]
pub enum DownloadError {
    /// No usable URL could be extracted from the resource source.
    #[error("invalid resource source: {reason}")]
    InvalidSource {
        /// Why the source was rejected.
        reason: String,
    },

    /// The resource is not a safe origin for the document that wants it.
    #[error("illegal origin: {url}")]
    IllegalOrigin {
        /// The rejected URL.
        url: String,
    },

    /// The resource could not be fetched.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The fetched bytes could not be turned into native content.
    #[error("cannot decode resource {url}: {source}")]
    Decode {
        /// The resource URL.
        url: String,
        /// The decoder's error.
        #[source]
        source: BoxError,
    },
}

impl DownloadError {
    /// Creates an invalid source error.
    pub fn invalid_source(reason: impl Into<String>) -> Self {
        Self::InvalidSource {
            reason: reason.into(),
        }
    }

    /// Creates an illegal origin error.
    pub fn illegal_origin(url: impl Into<String>) -> Self {
        Self::IllegalOrigin { url: url.into() }
    }

    /// Creates a decode error.
    pub fn decode(url: impl Into<String>, source: BoxError) -> Self {
        Self::Decode {
            url: url.into(),
            source,
        }
    }
}
