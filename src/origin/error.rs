//! Error types for the origin module.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while loading a public suffix table.
///
/// There is no degraded mode: a table that cannot be read completely would
/// misclassify origins, so loading aborts instead.
#[derive(Debug, Error)]
pub enum SuffixListError {
    /// The suffix list file could not be opened or read.
    #[error("cannot read public suffix list {path}: {source}")]
    Io {
        /// Path of the suffix list.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// A read error occurred while streaming the list from a reader.
    #[error("error reading public suffix list at line {line}: {source}")]
    Read {
        /// One-based line number where reading failed.
        line: usize,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },
}

impl SuffixListError {
    /// Creates an IO error for the given path.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
