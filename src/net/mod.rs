//! Connections to remote and local resources.
//!
//! A [`ConnectionOpener`] turns a URL into an unconnected [`Connection`].
//! Connecting performs the request; the response head and body are then
//! available until the connection is disconnected.
//!
//! Two openers ship with the crate:
//!
//! - [`HttpConnectionOpener`] handles `http`, `https`, `data` and `file`
//!   URLs, using reqwest for the network schemes
//! - [`MemoryConnectionOpener`] serves canned responses, for tests and
//!   embedding
//!
//! # Example
//!
//! ```no_run
//! use markup_agent::config::AgentConfig;
//! use markup_agent::net::{ConnectionOpener, HttpConnectionOpener};
//! use url::Url;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let opener = HttpConnectionOpener::new(&AgentConfig::default())?;
//! let url = Url::parse("https://example.com/")?;
//! let mut connection = opener.open_connection(&url, 0)?;
//! connection.connect().await?;
//! let body = connection.read_body().await?;
//! println!("{} bytes", body.len());
//! # Ok(())
//! # }
//! ```

mod client;
pub mod constants;
mod error;
mod local;
mod memory;

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::header::{CONTENT_ENCODING, CONTENT_TYPE, HeaderMap};
use url::Url;

pub use client::{HttpConnection, HttpConnectionOpener};
pub use constants::{CONNECT_TIMEOUT_SECS, READ_TIMEOUT_SECS};
pub use error::TransportError;
pub use local::{DataConnection, FileConnection};
pub use memory::{MemoryConnectionOpener, MemoryResponse, OpenedConnection};

/// Creates connections for URLs.
///
/// `loading_time` is the epoch-millisecond timestamp of the operation that
/// requested the connection, so that the connection and any cookie handling
/// agree on "now".
pub trait ConnectionOpener: Send + Sync + std::fmt::Debug {
    /// Opens an unconnected connection to `url`.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError`] if no connection can be created for the
    /// URL, for example because its scheme is unsupported.
    fn open_connection(
        &self,
        url: &Url,
        loading_time: u64,
    ) -> Result<Box<dyn Connection>, TransportError>;
}

/// Status line and headers of a completed request.
#[derive(Debug, Clone)]
pub struct ResponseHead {
    /// URL the response was served for.
    pub url: Url,
    /// Status code (200 for non-HTTP schemes).
    pub status: u16,
    /// Response headers.
    pub headers: HeaderMap,
}

impl ResponseHead {
    /// Creates a successful head with no headers.
    #[must_use]
    pub fn ok(url: Url) -> Self {
        Self {
            url,
            status: 200,
            headers: HeaderMap::new(),
        }
    }

    /// Returns the first value of header `name` as text.
    ///
    /// Header names are case-insensitive. Values that are not valid visible
    /// ASCII are treated as absent.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

/// A single request/response exchange.
#[async_trait]
pub trait Connection: Send + std::fmt::Debug {
    /// The URL this connection was opened for.
    fn url(&self) -> &Url;

    /// Bounds the time `connect` may take. `None` means unbounded.
    fn set_connect_timeout(&mut self, timeout: Option<Duration>);

    /// Performs the request and reads the response head.
    ///
    /// Connecting an already connected connection is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError`] on network or IO failure, timeouts and
    /// unsuccessful HTTP statuses.
    async fn connect(&mut self) -> Result<(), TransportError>;

    /// The response head, once connected.
    fn response(&self) -> Option<&ResponseHead>;

    /// Reads the whole response body, connecting first if needed.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError`] if the body cannot be read or was already
    /// consumed.
    async fn read_body(&mut self) -> Result<Bytes, TransportError>;

    /// The `Content-Type` header, once connected.
    fn content_type(&self) -> Option<&str> {
        self.header_field(CONTENT_TYPE.as_str())
    }

    /// The `Content-Encoding` header, once connected.
    fn content_encoding(&self) -> Option<&str> {
        self.header_field(CONTENT_ENCODING.as_str())
    }

    /// The value of response header `name`, once connected.
    fn header_field(&self, name: &str) -> Option<&str> {
        self.response().and_then(|head| head.header(name))
    }

    /// Returns true if this connection speaks HTTP.
    fn is_http(&self) -> bool {
        false
    }

    /// Releases the connection. Further reads fail.
    fn disconnect(&mut self) {}
}

/// Builds a header map from name/value pairs, skipping invalid entries.
pub(crate) fn header_map<'a, I>(pairs: I) -> HeaderMap
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    use reqwest::header::{HeaderName, HeaderValue};

    let mut headers = HeaderMap::new();
    for (name, value) in pairs {
        if let (Ok(name), Ok(value)) = (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            headers.append(name, value);
        }
    }
    headers
}
