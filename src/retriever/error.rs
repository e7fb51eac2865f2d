//! Error types for the retriever module.

use thiserror::Error;

use crate::net::TransportError;
use crate::parser::ParseError;

/// Failure to retrieve a document.
#[derive(Debug, Error)]
pub enum DocumentError {
    /// The document could not be fetched. Carries the transport error
    /// unchanged.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The document was fetched but could not be parsed.
    #[error("error parsing document at {url}: {source}")]
    Parse {
        /// Source URL of the document.
        url: String,
        /// The parser's error.
        #[source]
        source: ParseError,
    },
}

impl DocumentError {
    /// Creates a parse error for the document at `url`.
    pub fn parse(url: impl Into<String>, source: ParseError) -> Self {
        Self::Parse {
            url: url.into(),
            source,
        }
    }

    /// Returns true if the failure happened in the transport layer.
    #[must_use]
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_))
    }
}
