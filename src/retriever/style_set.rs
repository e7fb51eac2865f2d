//! Default-Style precedence between the HTTP header and `<meta>` elements.

use crate::parser::ElementData;

/// Name of the header and `http-equiv` value carrying the preferred set.
pub const DEFAULT_STYLE: &str = "Default-Style";

/// Resolves the style sheet set a document should select.
///
/// The header logically precedes the document, so the last non-empty
/// `<meta http-equiv="Default-Style">` in document order overrides it. A meta
/// element with empty content never clears an earlier value.
#[must_use]
pub fn resolve_default_style(header: Option<&str>, metas: &[&ElementData]) -> Option<String> {
    let from_meta = metas.iter().rev().find_map(|meta| {
        let is_default_style = meta
            .attr("http-equiv")
            .is_some_and(|v| v.eq_ignore_ascii_case(DEFAULT_STYLE));
        if !is_default_style {
            return None;
        }
        meta.attr("content").filter(|content| !content.is_empty())
    });
    from_meta.or(header).map(str::to_string)
}
