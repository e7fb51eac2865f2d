//! Markup parsing into a [`NodeTree`].
//!
//! Two entry points share one tree sink:
//!
//! - [`parse_html`] runs the HTML5 tree builder, which recovers from any
//!   input and therefore never fails
//! - [`parse_xml`] runs the XML tree builder after rewriting named entity
//!   references through an [`EntityResolver`]; malformed or truncated input
//!   is an error and whitespace-only text nodes are dropped
//!
//! # Example
//!
//! ```
//! use markup_agent::parser::{parse_html, parse_xml, DefaultEntityResolver};
//!
//! let html = parse_html("<title>Hi</title><p>text");
//! assert!(html.document_element().is_some());
//!
//! let xml = parse_xml("<root>\n  <child/>\n</root>", &DefaultEntityResolver).unwrap();
//! let root = xml.document_element().unwrap();
//! assert_eq!(xml.get(root).map(|n| n.children.len()), Some(1));
//! ```

mod entities;
mod error;
mod sink;
mod structure;
mod tree;

use html5ever::ParseOpts;
use html5ever::tendril::TendrilSink;
use html5ever::tree_builder::TreeBuilderOpts;
use tracing::{debug, trace};

pub use entities::{
    DefaultEntityResolver, DtdIdentifier, EntityResolver, expand_entities, read_doctype,
};
pub use error::ParseError;
pub use sink::{NodeTreeSink, ParsedMarkup};
pub use tree::{Attribute, ElementData, Node, NodeData, NodeId, NodeTree};

/// Parses `text` as HTML.
#[must_use]
pub fn parse_html(text: &str) -> NodeTree {
    let opts = ParseOpts {
        tree_builder: TreeBuilderOpts {
            scripting_enabled: false,
            ..TreeBuilderOpts::default()
        },
        ..ParseOpts::default()
    };
    let parsed = html5ever::parse_document(NodeTreeSink::default(), opts).one(text);
    trace!(errors = parsed.errors.len(), "parsed HTML");
    parsed.tree
}

/// Parses `text` as XML, expanding entities known to `resolver`.
///
/// References the resolver does not know, and that the internal subset
/// does not declare, are kept as literal text.
///
/// # Errors
///
/// Returns [`ParseError`] if the document is not well-formed, ends inside
/// an open element, or has no root element.
pub fn parse_xml(text: &str, resolver: &dyn EntityResolver) -> Result<NodeTree, ParseError> {
    let expanded = expand_entities(text, resolver);
    let parsed = xml5ever::driver::parse_document(NodeTreeSink::default(), Default::default())
        .one(expanded.as_ref());

    if let Some(first) = parsed.errors.first() {
        debug!(errors = parsed.errors.len(), first = %first, "XML parse failed");
        return Err(ParseError::Malformed {
            first: first.to_string(),
            count: parsed.errors.len(),
        });
    }
    structure::check_tags(&expanded)?;
    let mut tree = parsed.tree;
    if tree.document_element().is_none() {
        return Err(ParseError::NoRootElement);
    }
    tree.prune_whitespace_text();
    Ok(tree)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn local_names(tree: &NodeTree) -> Vec<String> {
        tree.descendants(tree.document())
            .into_iter()
            .filter_map(|id| tree.get(id)?.as_element().map(|e| e.local_name().to_string()))
            .collect()
    }

    #[test]
    fn test_parse_html_builds_implied_structure() {
        let tree = parse_html("<title>T</title><p>one<p>two");
        assert_eq!(
            local_names(&tree),
            vec!["html", "head", "title", "body", "p", "p"]
        );
    }

    #[test]
    fn test_parse_html_never_fails_on_garbage() {
        let tree = parse_html("</div><<<>>>&&&");
        assert!(tree.document_element().is_some());
    }

    #[test]
    fn test_parse_html_keeps_doctype_and_attributes() {
        let tree = parse_html(
            "<!DOCTYPE html><html><head><meta http-equiv=\"Default-Style\" content=\"Alter 1\"></head></html>",
        );
        assert!(matches!(tree.doctype(), Some(NodeData::Doctype { name, .. }) if name == "html"));
        let metas = tree.elements_where(|e| e.local_name() == "meta");
        assert_eq!(metas.len(), 1);
        let meta = tree.get(metas[0]).and_then(Node::as_element).unwrap();
        assert_eq!(meta.attr("HTTP-EQUIV"), Some("Default-Style"));
        assert_eq!(meta.attr("content"), Some("Alter 1"));
    }

    #[test]
    fn test_parse_xml_drops_whitespace_only_text() {
        let tree = parse_xml("<root>\n  <a>x</a>\n  <b> </b>\n</root>", &DefaultEntityResolver).unwrap();
        let root = tree.document_element().unwrap();
        assert_eq!(tree.get(root).map(|n| n.children.len()), Some(2));
        assert_eq!(tree.text_content(root), "x");
    }

    #[test]
    fn test_parse_xml_preserves_case() {
        let tree = parse_xml("<Root><Child/></Root>", &DefaultEntityResolver).unwrap();
        assert_eq!(local_names(&tree), vec!["Root", "Child"]);
    }

    #[test]
    fn test_parse_xml_empty_input_has_no_root() {
        let result = parse_xml("", &DefaultEntityResolver);
        assert!(result.is_err());
    }

    #[test]
    fn test_parse_xml_resolves_xhtml_entities() {
        let text = "<!DOCTYPE html PUBLIC \"-//W3C//DTD XHTML 1.0 Strict//EN\" \"http://www.w3.org/TR/xhtml1/DTD/xhtml1-strict.dtd\">\
                    <html xmlns=\"http://www.w3.org/1999/xhtml\"><body><p>a&nbsp;b</p></body></html>";
        let tree = parse_xml(text, &DefaultEntityResolver).unwrap();
        let p = tree.elements_where(|e| e.local_name() == "p")[0];
        assert_eq!(tree.text_content(p), "a\u{A0}b");
    }

    #[test]
    fn test_parse_xml_rejects_truncated_input() {
        let truncated = parse_xml("<doc><p>cut off", &DefaultEntityResolver);
        assert!(matches!(truncated, Err(ParseError::Malformed { .. })));
        assert!(parse_xml("<a>", &DefaultEntityResolver).is_err());
        assert!(parse_xml("<a x=1/>", &DefaultEntityResolver).is_err());
    }

    #[test]
    fn test_parse_xml_accepts_internal_subset() {
        let text = "<?xml version=\"1.0\"?><!DOCTYPE svg [<!ENTITY ns \"http://www.w3.org/2000/svg\">]>\
                    <svg xmlns=\"&ns;\"><title>logo</title></svg>";
        let tree = parse_xml(text, &DefaultEntityResolver).unwrap();
        let root = tree.document_element().unwrap();
        let svg = tree.get(root).and_then(Node::as_element).unwrap();
        assert_eq!(svg.local_name(), "svg");
        assert_eq!(svg.name.ns.as_ref(), "http://www.w3.org/2000/svg");
        assert_eq!(tree.text_content(root), "logo");
    }

    #[test]
    fn test_parse_xml_keeps_entities_without_doctype_literal() {
        let tree = parse_xml("<root>&hearts;&sum;</root>", &DefaultEntityResolver).unwrap();
        let root = tree.document_element().unwrap();
        assert_eq!(tree.text_content(root), "&hearts;&sum;");
    }

    #[test]
    fn test_custom_entity_resolver_can_refuse() {
        #[derive(Debug)]
        struct Nothing;
        impl EntityResolver for Nothing {
            fn resolve_entity(&self, _dtd: Option<&DtdIdentifier>, _name: &str) -> Option<String> {
                None
            }
        }
        let text = "<!DOCTYPE html PUBLIC \"-//W3C//DTD XHTML 1.0 Strict//EN\" \"http://www.w3.org/TR/xhtml1/DTD/xhtml1-strict.dtd\">\
                    <html xmlns=\"http://www.w3.org/1999/xhtml\"><p>a&nbsp;b</p></html>";
        let tree = parse_xml(text, &Nothing).unwrap();
        let root = tree.document_element().unwrap();
        assert_eq!(tree.text_content(root), "a&nbsp;b");
    }

    #[test]
    fn test_custom_entity_resolver_is_consulted() {
        #[derive(Debug)]
        struct Brand;
        impl EntityResolver for Brand {
            fn resolve_entity(&self, _dtd: Option<&DtdIdentifier>, name: &str) -> Option<String> {
                (name == "brand").then(|| "Acme".to_string())
            }
        }
        let tree = parse_xml("<p>&brand;</p>", &Brand).unwrap();
        let root = tree.document_element().unwrap();
        assert_eq!(tree.text_content(root), "Acme");
    }
}
