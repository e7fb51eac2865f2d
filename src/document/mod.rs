//! Retrieved documents and their metadata.
//!
//! A [`Document`] is one type for both markup kinds: HTML and XML documents
//! share the tree representation and every metadata field, and differ only
//! in how element names are matched. Each document carries the
//! [`DocumentContext`] of the retriever that produced it, so resource
//! fetches made on its behalf use the same connection opener, origin policy
//! and visited history.

mod history;
mod referrer;
mod style_sheets;

use std::sync::Arc;

use tracing::debug;
use url::Url;

use crate::net::{Connection, ConnectionOpener, TransportError};
use crate::origin::{self, DefaultOriginPolicy, OriginPolicy};
use crate::parser::{ElementData, NodeId, NodeTree};

pub use history::VisitedHistory;
pub use referrer::ReferrerPolicy;
pub use style_sheets::StyleSheetSets;

/// The markup language a document was parsed as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MarkupKind {
    /// Parsed by the HTML5 tree builder.
    Html,
    /// Parsed by the XML tree builder.
    Xml,
}

/// Collaborators a document uses on its own behalf.
#[derive(Debug, Clone)]
pub struct DocumentContext {
    opener: Arc<dyn ConnectionOpener>,
    origin_policy: Arc<dyn OriginPolicy>,
    history: Arc<VisitedHistory>,
}

impl DocumentContext {
    /// Creates a context with the default origin policy and an empty history.
    #[must_use]
    pub fn new(opener: Arc<dyn ConnectionOpener>) -> Self {
        Self {
            opener,
            origin_policy: DefaultOriginPolicy::shared(),
            history: Arc::new(VisitedHistory::new()),
        }
    }

    /// Replaces the origin policy.
    #[must_use]
    pub fn with_origin_policy(mut self, origin_policy: Arc<dyn OriginPolicy>) -> Self {
        self.origin_policy = origin_policy;
        self
    }

    /// Replaces the visited history.
    #[must_use]
    pub fn with_history(mut self, history: Arc<VisitedHistory>) -> Self {
        self.history = history;
        self
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

    /// The visited history.
    #[must_use]
    pub fn history(&self) -> &Arc<VisitedHistory> {
        &self.history
    }
}

/// A parsed HTML or XML document.
#[derive(Debug, Clone)]
pub struct Document {
    kind: MarkupKind,
    tree: NodeTree,
    document_uri: Url,
    loading_time: u64,
    referrer_policy_header: Option<String>,
    style_sheets: StyleSheetSets,
    context: DocumentContext,
}

impl Document {
    /// Wraps a parsed tree.
    #[must_use]
    pub fn new(
        kind: MarkupKind,
        tree: NodeTree,
        document_uri: Url,
        loading_time: u64,
        context: DocumentContext,
    ) -> Self {
        let style_sheets = StyleSheetSets::from_tree(&tree, kind == MarkupKind::Html);
        Self {
            kind,
            tree,
            document_uri,
            loading_time,
            referrer_policy_header: None,
            style_sheets,
            context,
        }
    }

    /// The markup kind.
    #[must_use]
    pub fn kind(&self) -> MarkupKind {
        self.kind
    }

    /// The node tree.
    #[must_use]
    pub fn tree(&self) -> &NodeTree {
        &self.tree
    }

    /// The URI the document was retrieved from.
    #[must_use]
    pub fn document_uri(&self) -> &Url {
        &self.document_uri
    }

    /// Epoch-millisecond time at which retrieval started.
    #[must_use]
    pub fn loading_time(&self) -> u64 {
        self.loading_time
    }

    /// The context shared with the retriever.
    #[must_use]
    pub fn context(&self) -> &DocumentContext {
        &self.context
    }

    /// The base URI: the first `<base href>` resolved against the document
    /// URI, or the document URI itself.
    #[must_use]
    pub fn base_uri(&self) -> Url {
        self.elements_by_tag_name("base")
            .into_iter()
            .filter_map(|id| self.element(id)?.attr("href"))
            .find_map(|href| self.document_uri.join(href.trim()).ok())
            .unwrap_or_else(|| self.document_uri.clone())
    }

    /// Element data of node `id`.
    #[must_use]
    pub fn element(&self, id: NodeId) -> Option<&ElementData> {
        self.tree.get(id)?.as_element()
    }

    /// Elements named `name` in document order.
    ///
    /// HTML documents match names ASCII case-insensitively; XML documents
    /// match exactly.
    #[must_use]
    pub fn elements_by_tag_name(&self, name: &str) -> Vec<NodeId> {
        match self.kind {
            MarkupKind::Html => self
                .tree
                .elements_where(|e| e.local_name().eq_ignore_ascii_case(name)),
            MarkupKind::Xml => self.tree.elements_where(|e| e.local_name() == name),
        }
    }

    /// All `<meta>` elements in document order.
    #[must_use]
    pub fn meta_elements(&self) -> Vec<&ElementData> {
        self.elements_by_tag_name("meta")
            .into_iter()
            .filter_map(|id| self.element(id))
            .collect()
    }

    /// Text of the first `<title>` element, whitespace-collapsed.
    #[must_use]
    pub fn title(&self) -> Option<String> {
        let id = self.elements_by_tag_name("title").into_iter().next()?;
        let text = self.tree.text_content(id);
        Some(text.split_whitespace().collect::<Vec<_>>().join(" "))
    }

    /// The raw `Referrer-Policy` value, as received.
    #[must_use]
    pub fn referrer_policy_header(&self) -> Option<&str> {
        self.referrer_policy_header.as_deref()
    }

    /// Stores the raw `Referrer-Policy` value.
    pub fn set_referrer_policy_header(&mut self, value: impl Into<String>) {
        self.referrer_policy_header = Some(value.into());
    }

    /// The referrer policy named by the header, if it names a known one.
    #[must_use]
    pub fn referrer_policy(&self) -> Option<ReferrerPolicy> {
        self.referrer_policy_header
            .as_deref()
            .and_then(ReferrerPolicy::from_header)
    }

    /// The policy in force: the header's policy, else the default.
    #[must_use]
    pub fn effective_referrer_policy(&self) -> ReferrerPolicy {
        self.referrer_policy().unwrap_or_default()
    }

    /// Distinct style sheet set names in document order.
    #[must_use]
    pub fn style_sheet_sets(&self) -> &[String] {
        self.style_sheets.names()
    }

    /// The preferred style sheet set.
    #[must_use]
    pub fn preferred_style_sheet_set(&self) -> Option<&str> {
        self.style_sheets.preferred()
    }

    /// The selected style sheet set, defaulting to the preferred one.
    #[must_use]
    pub fn selected_style_sheet_set(&self) -> Option<&str> {
        self.style_sheets.selected()
    }

    /// Selects a style sheet set by name.
    ///
    /// Names that match no set leave the current selection in place.
    pub fn set_selected_style_sheet_set(&mut self, name: &str) {
        if !self.style_sheets.select(name) {
            debug!(name, uri = %self.document_uri, "ignoring unknown style sheet set");
        }
    }

    /// Returns true if `url` shares this document's origin.
    #[must_use]
    pub fn is_same_origin(&self, url: &Url) -> bool {
        origin::same_origin(&self.document_uri, url)
    }

    /// Returns true if `url` may be fetched on this document's behalf.
    #[must_use]
    pub fn is_safe_origin(&self, url: &Url) -> bool {
        origin::is_safe_origin(self.context.origin_policy.as_ref(), &self.document_uri, url)
    }

    /// Opens a connection to `url` on this document's behalf, correlated
    /// with the document's loading time.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError`] if the opener rejects the URL.
    pub fn open_connection(&self, url: &Url) -> Result<Box<dyn Connection>, TransportError> {
        self.context.opener.open_connection(url, self.loading_time)
    }

    /// Returns true if `href`, resolved against the base URI, was visited.
    ///
    /// Malformed references are never visited.
    #[must_use]
    pub fn is_visited_uri(&self, href: &str) -> bool {
        self.base_uri()
            .join(href)
            .is_ok_and(|url| self.context.history.contains(&url))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::net::{MemoryConnectionOpener, MemoryResponse};
    use crate::parser::{DefaultEntityResolver, parse_html, parse_xml};

    fn html_document(url: &str, html: &str) -> Document {
        let opener: Arc<dyn ConnectionOpener> = Arc::new(MemoryConnectionOpener::new());
        Document::new(
            MarkupKind::Html,
            parse_html(html),
            Url::parse(url).unwrap(),
            1_000,
            DocumentContext::new(opener),
        )
    }

    #[test]
    fn test_base_uri_from_base_element() {
        let doc = html_document(
            "http://www.example.com/dir/page.html",
            r#"<head><base href="/assets/"></head>"#,
        );
        assert_eq!(doc.base_uri().as_str(), "http://www.example.com/assets/");
    }

    #[test]
    fn test_base_uri_defaults_to_document_uri() {
        let doc = html_document("http://www.example.com/dir/page.html", "<p>x</p>");
        assert_eq!(doc.base_uri(), *doc.document_uri());
    }

    #[test]
    fn test_html_tag_names_ignore_case_xml_does_not() {
        let doc = html_document("http://example.com/", "<META name=a><Meta name=b>");
        assert_eq!(doc.meta_elements().len(), 2);
        assert_eq!(doc.elements_by_tag_name("META").len(), 2);

        let opener: Arc<dyn ConnectionOpener> = Arc::new(MemoryConnectionOpener::new());
        let xml = Document::new(
            MarkupKind::Xml,
            parse_xml("<doc><meta/><Meta/></doc>", &DefaultEntityResolver).unwrap(),
            Url::parse("http://example.com/doc.xml").unwrap(),
            0,
            DocumentContext::new(opener),
        );
        assert_eq!(xml.meta_elements().len(), 1);
    }

    #[test]
    fn test_referrer_policy_parsing_and_default() {
        let mut doc = html_document("http://example.com/", "");
        assert_eq!(doc.referrer_policy(), None);
        assert_eq!(
            doc.effective_referrer_policy(),
            ReferrerPolicy::StrictOriginWhenCrossOrigin
        );

        doc.set_referrer_policy_header("no-referrer");
        assert_eq!(doc.referrer_policy(), Some(ReferrerPolicy::NoReferrer));

        doc.set_referrer_policy_header("Something-Odd");
        assert_eq!(doc.referrer_policy_header(), Some("Something-Odd"));
        assert_eq!(doc.referrer_policy(), None);
    }

    #[test]
    fn test_unknown_style_sheet_set_keeps_selection() {
        let mut doc = html_document(
            "http://example.com/",
            r#"<link rel="stylesheet" title="Default" href="d.css">
               <link rel="alternate stylesheet" title="Alter 1" href="a.css">"#,
        );
        assert_eq!(doc.selected_style_sheet_set(), Some("Default"));
        doc.set_selected_style_sheet_set("Missing");
        assert_eq!(doc.selected_style_sheet_set(), Some("Default"));
        doc.set_selected_style_sheet_set("Alter 1");
        assert_eq!(doc.selected_style_sheet_set(), Some("Alter 1"));
        doc.set_selected_style_sheet_set("Missing");
        assert_eq!(doc.selected_style_sheet_set(), Some("Alter 1"));
    }

    #[test]
    fn test_title_collapses_whitespace() {
        let doc = html_document("http://example.com/", "<title>\n  A   title\n</title>");
        assert_eq!(doc.title().as_deref(), Some("A title"));
    }

    #[test]
    fn test_is_visited_uri_resolves_against_base() {
        let doc = html_document("http://example.com/dir/index.html", "");
        doc.context()
            .history()
            .mark(&Url::parse("http://example.com/dir/seen.html").unwrap());
        assert!(doc.is_visited_uri("seen.html"));
        assert!(doc.is_visited_uri("http://example.com/dir/seen.html#frag"));
        assert!(!doc.is_visited_uri("unseen.html"));
        assert!(!doc.is_visited_uri("http://[bad"));
    }

    #[test]
    fn test_open_connection_uses_loading_time() {
        let opener = Arc::new(MemoryConnectionOpener::new());
        let font = Url::parse("http://example.com/font.woff").unwrap();
        opener.register(&font, MemoryResponse::new("font"));
        let shared: Arc<dyn ConnectionOpener> = opener.clone();
        let doc = Document::new(
            MarkupKind::Html,
            parse_html(""),
            Url::parse("http://example.com/").unwrap(),
            77,
            DocumentContext::new(shared),
        );
        doc.open_connection(&font).unwrap();
        assert_eq!(opener.opened()[0].loading_time, 77);
    }

    #[test]
    fn test_safe_origin_delegates_to_policy() {
        let doc = html_document("http://www.example.com/", "");
        assert!(doc.is_safe_origin(&Url::parse("http://img.example.com/a.png").unwrap()));
        assert!(!doc.is_safe_origin(&Url::parse("http://evil.test/a.png").unwrap()));
        assert!(doc.is_same_origin(&Url::parse("http://www.example.com/x").unwrap()));
    }
}
