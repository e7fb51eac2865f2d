//! In-memory connection opener.
//!
//! Serves registered responses without any IO and records every connection
//! it opens, which makes it the opener of choice for exercising retrieval
//! and download logic in tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use dashmap::DashMap;
use url::Url;

use super::{Connection, ConnectionOpener, ResponseHead, TransportError, header_map};

/// A canned response.
#[derive(Debug, Clone)]
pub struct MemoryResponse {
    status: u16,
    headers: Vec<(String, String)>,
    body: Bytes,
    fail_body: bool,
}

impl MemoryResponse {
    /// A 200 response with the given body and no headers.
    pub fn new(body: impl Into<Bytes>) -> Self {
        Self {
            status: 200,
            headers: Vec::new(),
            body: body.into(),
            fail_body: false,
        }
    }

    /// A 200 `text/html` response.
    pub fn html(body: impl Into<Bytes>) -> Self {
        Self::new(body).with_header("Content-Type", "text/html")
    }

    /// A 200 `application/xml` response.
    pub fn xml(body: impl Into<Bytes>) -> Self {
        Self::new(body).with_header("Content-Type", "application/xml")
    }

    /// Sets the status code.
    #[must_use]
    pub fn with_status(mut self, status: u16) -> Self {
        self.status = status;
        self
    }

    /// Appends a response header.
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Makes body reads fail after a successful connect.
    #[must_use]
    pub fn with_failing_body(mut self) -> Self {
        self.fail_body = true;
        self
    }
}

/// One recorded `open_connection` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenedConnection {
    /// URL that was opened.
    pub url: Url,
    /// Loading time passed by the caller.
    pub loading_time: u64,
}

/// Opener backed by a map of URL to canned response.
///
/// Unregistered URLs connect with a 404 status error.
#[derive(Debug, Default)]
pub struct MemoryConnectionOpener {
    responses: DashMap<String, MemoryResponse>,
    opened: Mutex<Vec<OpenedConnection>>,
    disconnects: Arc<AtomicUsize>,
    connect_delay: Option<Duration>,
}

impl MemoryConnectionOpener {
    /// Creates an empty opener.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Delays every connect by `delay`, to exercise timeouts.
    #[must_use]
    pub fn with_connect_delay(mut self, delay: Duration) -> Self {
        self.connect_delay = Some(delay);
        self
    }

    /// Registers `response` for `url`, replacing any previous entry.
    pub fn register(&self, url: &Url, response: MemoryResponse) {
        self.responses.insert(url.as_str().to_string(), response);
    }

    /// Adds a header to the response registered for `url`.
    ///
    /// Does nothing if no response is registered.
    pub fn set_header(&self, url: &Url, name: &str, value: &str) {
        if let Some(mut response) = self.responses.get_mut(url.as_str()) {
            response.headers.push((name.to_string(), value.to_string()));
        }
    }

    /// Number of connections opened so far.
    #[must_use]
    pub fn open_count(&self) -> usize {
        self.opened
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Every connection opened so far, in order.
    #[must_use]
    pub fn opened(&self) -> Vec<OpenedConnection> {
        self.opened
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Number of connections disconnected so far.
    #[must_use]
    pub fn disconnect_count(&self) -> usize {
        self.disconnects.load(Ordering::SeqCst)
    }
}

impl ConnectionOpener for MemoryConnectionOpener {
    fn open_connection(
        &self,
        url: &Url,
        loading_time: u64,
    ) -> Result<Box<dyn Connection>, TransportError> {
        self.opened
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(OpenedConnection {
                url: url.clone(),
                loading_time,
            });
        Ok(Box::new(MemoryConnection {
            url: url.clone(),
            canned: self.responses.get(url.as_str()).map(|r| r.value().clone()),
            head: None,
            body: None,
            consumed: false,
            connect_delay: self.connect_delay,
            connect_timeout: None,
            disconnects: Arc::clone(&self.disconnects),
        }))
    }
}

#[derive(Debug)]
struct MemoryConnection {
    url: Url,
    canned: Option<MemoryResponse>,
    head: Option<ResponseHead>,
    body: Option<Bytes>,
    consumed: bool,
    connect_delay: Option<Duration>,
    connect_timeout: Option<Duration>,
    disconnects: Arc<AtomicUsize>,
}

#[async_trait]
impl Connection for MemoryConnection {
    fn url(&self) -> &Url {
        &self.url
    }

    fn set_connect_timeout(&mut self, timeout: Option<Duration>) {
        self.connect_timeout = timeout;
    }

    async fn connect(&mut self) -> Result<(), TransportError> {
        if self.head.is_some() || self.consumed {
            return Ok(());
        }
        if let Some(delay) = self.connect_delay {
            match self.connect_timeout {
                Some(limit) if limit < delay => {
                    tokio::time::sleep(limit).await;
                    return Err(TransportError::timeout(self.url.as_str()));
                }
                _ => tokio::time::sleep(delay).await,
            }
        }

        let Some(canned) = &self.canned else {
            return Err(TransportError::http_status(self.url.as_str(), 404));
        };
        if !(200..300).contains(&canned.status) {
            return Err(TransportError::http_status(self.url.as_str(), canned.status));
        }

        self.head = Some(ResponseHead {
            url: self.url.clone(),
            status: canned.status,
            headers: header_map(
                canned
                    .headers
                    .iter()
                    .map(|(name, value)| (name.as_str(), value.as_str())),
            ),
        });
        if !canned.fail_body {
            self.body = Some(canned.body.clone());
        }
        Ok(())
    }

    fn response(&self) -> Option<&ResponseHead> {
        self.head.as_ref()
    }

    async fn read_body(&mut self) -> Result<Bytes, TransportError> {
        self.connect().await?;
        if self.canned.as_ref().is_some_and(|c| c.fail_body) && !self.consumed {
            self.consumed = true;
            return Err(TransportError::io(
                self.url.as_str(),
                std::io::Error::new(std::io::ErrorKind::ConnectionReset, "connection reset"),
            ));
        }
        self.consumed = true;
        self.body
            .take()
            .ok_or_else(|| TransportError::body_consumed(self.url.as_str()))
    }

    fn is_http(&self) -> bool {
        matches!(self.url.scheme(), "http" | "https")
    }

    fn disconnect(&mut self) {
        self.body = None;
        self.consumed = true;
        self.disconnects.fetch_add(1, Ordering::SeqCst);
    }
}
