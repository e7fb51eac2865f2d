//! Document retrieval: fetch, classify, decode, parse and annotate.
//!
//! [`DocumentRetriever::read_url`] drives one retrieval end to end:
//!
//! 1. open a connection through the configured [`ConnectionOpener`],
//!    stamped with the retrieval's loading time
//! 2. pick the parser from the bare media type (`text/html` is HTML,
//!    anything else, including no type at all, is XML)
//! 3. decode the body (`Content-Encoding` label, then `charset`, then UTF-8)
//!    and parse it
//! 4. select the style sheet set named by `Default-Style` (header or meta),
//!    forward `Referrer-Policy`, store cookies and release HTTP connections
//!
//! # Example
//!
//! ```no_run
//! use markup_agent::config::AgentConfig;
//! use markup_agent::retriever::DocumentRetriever;
//! use url::Url;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let retriever = DocumentRetriever::new(&AgentConfig::default())?;
//! let document = retriever.read_url(&Url::parse("https://example.com/")?).await?;
//! println!("{:?}", document.title());
//! # Ok(())
//! # }
//! ```

pub mod content_type;
mod error;
pub mod style_set;

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use tracing::{debug, info, instrument};
use url::Url;

use crate::config::{AgentConfig, ConfigError};
use crate::cookies::{CookieStore, JarCookieStore};
use crate::document::{Document, DocumentContext, MarkupKind, VisitedHistory};
use crate::net::{Connection, ConnectionOpener, HttpConnectionOpener, TransportError};
use crate::origin::{DefaultOriginPolicy, OriginPolicy};
use crate::parser::{DefaultEntityResolver, EntityResolver, parse_html, parse_xml};

pub use error::DocumentError;

/// Name of the response header forwarded to the document's referrer policy.
pub const REFERRER_POLICY: &str = "Referrer-Policy";

/// Milliseconds since the Unix epoch.
pub(crate) fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |elapsed| u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX))
}

/// Retrieves and parses markup documents.
///
/// A retriever holds no per-retrieval state; any number of `read_url` calls
/// may run concurrently.
#[derive(Debug, Clone)]
pub struct DocumentRetriever {
    opener: Arc<dyn ConnectionOpener>,
    entity_resolver: Arc<dyn EntityResolver>,
    cookie_store: Arc<dyn CookieStore>,
    origin_policy: Arc<dyn OriginPolicy>,
    history: Arc<VisitedHistory>,
}

impl DocumentRetriever {
    /// Creates a retriever with an HTTP opener built from `config`.
    ///
    /// Cookies received from servers are kept in a jar shared with the
    /// opener and sent back on later requests.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if `config` is invalid, the custom suffix
    /// list cannot be loaded, or the HTTP client cannot be built.
    pub fn new(config: &AgentConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let cookies = JarCookieStore::new();
        let opener = HttpConnectionOpener::with_cookie_jar(config, cookies.jar())
            .map_err(ConfigError::HttpClient)?;
        let origin_policy: Arc<dyn OriginPolicy> = match &config.suffix_list_path {
            Some(path) => Arc::new(DefaultOriginPolicy::from_path(path)?),
            None => DefaultOriginPolicy::shared(),
        };
        Ok(Self::with_opener(Arc::new(opener))
            .with_cookie_store(Arc::new(cookies))
            .with_origin_policy(origin_policy))
    }

    /// Creates a retriever that opens connections through `opener`.
    #[must_use]
    pub fn with_opener(opener: Arc<dyn ConnectionOpener>) -> Self {
        Self {
            opener,
            entity_resolver: Arc::new(DefaultEntityResolver),
            cookie_store: Arc::new(JarCookieStore::new()),
            origin_policy: DefaultOriginPolicy::shared(),
            history: Arc::new(VisitedHistory::new()),
        }
    }

    /// Replaces the cookie store.
    #[must_use]
    pub fn with_cookie_store(mut self, cookie_store: Arc<dyn CookieStore>) -> Self {
        self.cookie_store = cookie_store;
        self
    }

    /// Replaces the origin policy handed to retrieved documents.
    #[must_use]
    pub fn with_origin_policy(mut self, origin_policy: Arc<dyn OriginPolicy>) -> Self {
        self.origin_policy = origin_policy;
        self
    }

    /// Replaces the entity resolver used for XML documents.
    pub fn set_entity_resolver(&mut self, resolver: Arc<dyn EntityResolver>) {
        self.entity_resolver = resolver;
    }

    /// The connection opener.
    #[must_use]
    pub fn opener(&self) -> &Arc<dyn ConnectionOpener> {
        &self.opener
    }

    /// The origin policy.
    #[must_use]
    pub fn origin_policy(&self) -> &Arc<dyn OriginPolicy> {
        &self.origin_policy
    }

    /// Opens a connection to `url` correlated with `loading_time`.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError`] if the opener rejects the URL.
    pub fn open_connection(
        &self,
        url: &Url,
        loading_time: u64,
    ) -> Result<Box<dyn Connection>, TransportError> {
        self.opener.open_connection(url, loading_time)
    }

    /// Records `url` as visited.
    pub fn mark_visited(&self, url: &Url) {
        self.history.mark(url);
    }

    /// Returns true if `url` was visited.
    #[must_use]
    pub fn is_visited_url(&self, url: &Url) -> bool {
        self.history.contains(url)
    }

    /// The context handed to every document this retriever produces.
    #[must_use]
    pub fn context(&self) -> DocumentContext {
        DocumentContext::new(Arc::clone(&self.opener))
            .with_origin_policy(Arc::clone(&self.origin_policy))
            .with_history(Arc::clone(&self.history))
    }

    /// Retrieves and parses the document at `url`.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentError::Transport`] with the transport error
    /// unchanged if the document cannot be fetched, and
    /// [`DocumentError::Parse`] if an XML document is not well-formed.
    #[instrument(skip(self), fields(url = %url))]
    pub async fn read_url(&self, url: &Url) -> Result<Document, DocumentError> {
        let loading_time = now_millis();
        let mut connection = self.open_connection(url, loading_time)?;
        connection.connect().await?;

        let content_type = connection.content_type().map(str::to_string);
        let content_encoding = connection.content_encoding().map(str::to_string);
        let kind = if content_type::is_html(content_type.as_deref()) {
            MarkupKind::Html
        } else {
            MarkupKind::Xml
        };

        let body = connection.read_body().await?;
        let encoding =
            content_type::resolve_encoding(content_encoding.as_deref(), content_type.as_deref());
        let text = content_type::decode(&body, encoding);
        debug!(
            content_type = content_type.as_deref().unwrap_or("<none>"),
            encoding = encoding.name(),
            bytes = body.len(),
            ?kind,
            "decoded document body"
        );

        let tree = match kind {
            MarkupKind::Html => parse_html(&text),
            MarkupKind::Xml => parse_xml(&text, self.entity_resolver.as_ref())
                .map_err(|source| DocumentError::parse(url.as_str(), source))?,
        };
        let mut document = Document::new(kind, tree, url.clone(), loading_time, self.context());

        let default_style = style_set::resolve_default_style(
            connection.header_field(style_set::DEFAULT_STYLE),
            &document.meta_elements(),
        );
        if let Some(name) = default_style {
            document.set_selected_style_sheet_set(&name);
        }
        if let Some(policy) = connection.header_field(REFERRER_POLICY) {
            document.set_referrer_policy_header(policy);
        }

        if connection.is_http() {
            if let Some(response) = connection.response() {
                self.cookie_store.read_cookies(response, loading_time);
            }
            connection.disconnect();
        }

        info!(
            ?kind,
            selected_style_sheet_set = document.selected_style_sheet_set().unwrap_or("<none>"),
            "document retrieved"
        );
        Ok(document)
    }
}
