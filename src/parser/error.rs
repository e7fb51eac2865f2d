//! Error types for the parser module.

use thiserror::Error;

/// A document that could not be parsed.
///
/// Only the XML path produces these: the HTML tree builder recovers from
/// every error by construction.
#[derive(Debug, Error)]
pub enum ParseError {
    /// The input has no root element.
    #[error("document has no root element")]
    NoRootElement,

    /// The input is not well-formed.
    #[error("malformed XML: {first}{}", more_errors(*.count))]
    Malformed {
        /// The first error reported.
        first: String,
        /// Total number of errors reported.
        count: usize,
    },
}

fn more_errors(count: usize) -> String {
    if count > 1 {
        format!(" (and {} more errors)", count - 1)
    } else {
        String::new()
    }
}
