//! Asynchronous download of secondary resources (fonts, images, style
//! sheets) on behalf of a document.
//!
//! A [`ResourceDownloader`] fetches one URL on its own Tokio task. Before any
//! connection is opened, the first registered listener that names an owning
//! document decides whether the URL is a safe origin; unsafe URLs fail with
//! [`DownloadError::IllegalOrigin`] without touching the network. Completion
//! is delivered once to every listener; listeners registered after
//! completion are answered immediately. Nothing is retried.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use markup_agent::config::AgentConfig;
//! use markup_agent::download::{BytesDecoder, CssValue, FontFaceRule, ResourceDownloader};
//! use markup_agent::net::HttpConnectionOpener;
//! use url::Url;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let opener = Arc::new(HttpConnectionOpener::new(&AgentConfig::default())?);
//! let base = Url::parse("https://example.com/css/site.css")?;
//! let rule = FontFaceRule::with_src(CssValue::parse_src("url(fonts/a.woff2), url(fonts/a.ttf)"));
//! let downloader = Arc::new(ResourceDownloader::from_font_face(
//!     &rule,
//!     Some(&base),
//!     opener,
//!     Arc::new(BytesDecoder),
//! )?);
//! if let Some(handle) = downloader.start() {
//!     handle.await?;
//! }
//! println!("{:?}", downloader.state());
//! # Ok(())
//! # }
//! ```

mod agent;
mod decoder;
mod error;
mod listener;
mod source;
mod task;

pub use agent::ResourceAgent;
pub use decoder::{BytesDecoder, ContentDecoder, TextDecoder};
pub use error::{BoxError, DownloadError};
pub use listener::DownloadListener;
pub use source::{CssValue, FontFaceRule, extract_urls, font_face_url};
pub use task::{DownloadState, ResourceDownloader};
