//! Cookie persistence for HTTP retrievals.
//!
//! After a document is read over HTTP, the retriever hands the response to a
//! [`CookieStore`] together with the retrieval's loading time. The default
//! store records `Set-Cookie` headers into a shared `reqwest::cookie::Jar`;
//! an [`HttpConnectionOpener`](crate::net::HttpConnectionOpener) built over
//! the same jar sends them back on later requests.

use std::sync::Arc;

use reqwest::cookie::{CookieStore as _, Jar};
use reqwest::header::SET_COOKIE;
use tracing::debug;

use crate::net::ResponseHead;

/// Records cookies from HTTP responses.
pub trait CookieStore: Send + Sync + std::fmt::Debug {
    /// Reads the cookies set by `response`.
    ///
    /// `loading_time` is the epoch-millisecond time of the retrieval that
    /// produced the response.
    fn read_cookies(&self, response: &ResponseHead, loading_time: u64);
}

/// Cookie store backed by a reqwest cookie jar.
#[derive(Debug, Clone, Default)]
pub struct JarCookieStore {
    jar: Arc<Jar>,
}

impl JarCookieStore {
    /// Creates a store over a fresh, empty jar.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store over an existing jar.
    #[must_use]
    pub fn with_jar(jar: Arc<Jar>) -> Self {
        Self { jar }
    }

    /// The shared jar, for wiring into an HTTP opener.
    #[must_use]
    pub fn jar(&self) -> Arc<Jar> {
        Arc::clone(&self.jar)
    }

    /// Returns the `Cookie` header value the jar would send to `url`.
    #[must_use]
    pub fn cookie_header(&self, url: &url::Url) -> Option<String> {
        self.jar
            .cookies(url)
            .and_then(|value| value.to_str().ok().map(str::to_string))
    }
}

impl CookieStore for JarCookieStore {
    fn read_cookies(&self, response: &ResponseHead, loading_time: u64) {
        let mut set_cookies = response.headers.get_all(SET_COOKIE).iter().peekable();
        if set_cookies.peek().is_none() {
            return;
        }
        debug!(url = %response.url, loading_time, "storing response cookies");
        self.jar.set_cookies(&mut set_cookies, &response.url);
    }
}

/// Cookie store that discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoCookies;

impl CookieStore for NoCookies {
    fn read_cookies(&self, _response: &ResponseHead, _loading_time: u64) {}
}
