//! Markup Agent Library
//!
//! Retrieves HTML and XML documents together with their secondary
//! resources (fonts, images, style sheets), applying a public-suffix based
//! origin policy to everything fetched on a document's behalf.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//! - [`origin`] - Public suffix table, registrable domains, same/safe-origin checks
//! - [`net`] - Connection opening for `http(s):`, `data:` and `file:` URLs
//! - [`cookies`] - Cookie storage fed from responses
//! - [`parser`] - HTML and XML parsing into a node tree
//! - [`document`] - Parsed documents and their metadata
//! - [`retriever`] - The fetch, classify, decode, parse pipeline
//! - [`download`] - Background download of secondary resources
//! - [`config`] - Timeouts, user agent and suffix list settings

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod cookies;
pub mod document;
pub mod download;
pub mod net;
pub mod origin;
pub mod parser;
pub mod retriever;
mod user_agent;

// Re-export commonly used types
pub use config::{AgentConfig, ConfigError};
pub use document::{Document, MarkupKind, ReferrerPolicy};
pub use download::{
    BytesDecoder, ContentDecoder, DownloadError, DownloadListener, DownloadState, ResourceAgent,
    ResourceDownloader,
};
pub use net::{ConnectionOpener, HttpConnectionOpener, TransportError};
pub use origin::{DefaultOriginPolicy, OriginPolicy};
pub use retriever::{DocumentError, DocumentRetriever};
