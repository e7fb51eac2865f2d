//! reqwest-backed connections.
//!
//! [`HttpConnectionOpener`] owns one pooled [`reqwest::Client`] and hands out
//! an [`HttpConnection`] per request. `data:` and `file:` URLs are served by
//! the local connection types so that a single opener covers every scheme a
//! document can reference.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::StreamExt;
use reqwest::cookie::{CookieStore as _, Jar};
use reqwest::header::COOKIE;
use reqwest::{Client, ClientBuilder};
use tracing::{debug, instrument};
use url::Url;

use super::constants::MAX_BODY_BYTES;
use super::local::{DataConnection, FileConnection};
use super::{Connection, ConnectionOpener, ResponseHead, TransportError};
use crate::config::AgentConfig;

/// Opens connections through a shared HTTP client.
///
/// When built with a cookie jar, requests carry the jar's cookies for the
/// target URL. Storing response cookies is left to the caller's cookie
/// store so that it happens exactly once per retrieval.
#[derive(Debug, Clone)]
pub struct HttpConnectionOpener {
    client: Client,
    cookie_jar: Option<Arc<Jar>>,
}

impl HttpConnectionOpener {
    /// Creates an opener with the timeouts and user agent from `config`.
    ///
    /// # Errors
    ///
    /// Returns the reqwest error if the HTTP client cannot be built.
    pub fn new(config: &AgentConfig) -> Result<Self, reqwest::Error> {
        Ok(Self {
            client: base_client_builder(config).build()?,
            cookie_jar: None,
        })
    }

    /// Creates an opener that sends cookies from `cookie_jar`.
    ///
    /// # Errors
    ///
    /// Returns the reqwest error if the HTTP client cannot be built.
    pub fn with_cookie_jar(
        config: &AgentConfig,
        cookie_jar: Arc<Jar>,
    ) -> Result<Self, reqwest::Error> {
        Ok(Self {
            client: base_client_builder(config).build()?,
            cookie_jar: Some(cookie_jar),
        })
    }

    /// Returns the inner reqwest client.
    #[must_use]
    pub fn inner(&self) -> &Client {
        &self.client
    }
}

impl ConnectionOpener for HttpConnectionOpener {
    fn open_connection(
        &self,
        url: &Url,
        loading_time: u64,
    ) -> Result<Box<dyn Connection>, TransportError> {
        debug!(url = %url, loading_time, "opening connection");
        match url.scheme() {
            "http" | "https" => Ok(Box::new(HttpConnection {
                client: self.client.clone(),
                cookie_jar: self.cookie_jar.clone(),
                url: url.clone(),
                connect_timeout: None,
                head: None,
                response: None,
                consumed: false,
            })),
            "data" => Ok(Box::new(DataConnection::new(url.clone()))),
            "file" => Ok(Box::new(FileConnection::new(url.clone()))),
            other => Err(TransportError::unsupported_scheme(url.as_str(), other)),
        }
    }
}

/// One HTTP GET exchange.
#[derive(Debug)]
pub struct HttpConnection {
    client: Client,
    cookie_jar: Option<Arc<Jar>>,
    url: Url,
    connect_timeout: Option<Duration>,
    head: Option<ResponseHead>,
    response: Option<reqwest::Response>,
    consumed: bool,
}

#[async_trait]
impl Connection for HttpConnection {
    fn url(&self) -> &Url {
        &self.url
    }

    fn set_connect_timeout(&mut self, timeout: Option<Duration>) {
        self.connect_timeout = timeout;
    }

    #[instrument(skip(self), fields(url = %self.url))]
    async fn connect(&mut self) -> Result<(), TransportError> {
        if self.head.is_some() || self.consumed {
            return Ok(());
        }

        let mut request = self.client.get(self.url.clone());
        if let Some(jar) = &self.cookie_jar
            && let Some(cookies) = jar.cookies(&self.url)
        {
            request = request.header(COOKIE, cookies);
        }

        let send = request.send();
        let result = match self.connect_timeout {
            Some(limit) => tokio::time::timeout(limit, send)
                .await
                .map_err(|_| TransportError::timeout(self.url.as_str()))?,
            None => send.await,
        };
        let response = result.map_err(|e| TransportError::network(self.url.as_str(), e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::http_status(self.url.as_str(), status.as_u16()));
        }

        debug!(status = status.as_u16(), "connected");
        self.head = Some(ResponseHead {
            url: self.url.clone(),
            status: status.as_u16(),
            headers: response.headers().clone(),
        });
        self.response = Some(response);
        Ok(())
    }

    fn response(&self) -> Option<&ResponseHead> {
        self.head.as_ref()
    }

    async fn read_body(&mut self) -> Result<Bytes, TransportError> {
        self.connect().await?;
        let Some(response) = self.response.take() else {
            return Err(TransportError::body_consumed(self.url.as_str()));
        };
        self.consumed = true;

        let mut stream = response.bytes_stream();
        let mut body = Vec::new();
        while let Some(chunk_result) = stream.next().await {
            let chunk = chunk_result.map_err(|e| TransportError::network(self.url.as_str(), e))?;
            if body.len() + chunk.len() > MAX_BODY_BYTES {
                return Err(TransportError::io(
                    self.url.as_str(),
                    std::io::Error::new(std::io::ErrorKind::FileTooLarge, "response body too large"),
                ));
            }
            body.extend_from_slice(&chunk);
        }
        debug!(bytes = body.len(), "body read");
        Ok(Bytes::from(body))
    }

    fn is_http(&self) -> bool {
        true
    }

    fn disconnect(&mut self) {
        self.response = None;
        self.consumed = true;
    }
}

fn base_client_builder(config: &AgentConfig) -> ClientBuilder {
    Client::builder()
        .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
        .timeout(Duration::from_secs(config.read_timeout_secs))
        .gzip(true)
        .user_agent(config.user_agent.clone())
}
