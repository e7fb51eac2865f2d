//! Resource sources: `@font-face` rules and their `src` values.

use url::Url;

use super::DownloadError;

/// A CSS value as far as URL extraction is concerned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CssValue {
    /// A `url(...)` token holding the raw, possibly relative, URL.
    Uri(String),
    /// A comma or space separated list.
    List(Vec<CssValue>),
    /// Anything else (`local(...)`, `format(...)`, keywords).
    Other(String),
}

impl CssValue {
    /// Reads a `src` descriptor value such as
    /// `url(a.woff2) format("woff2"), local(Foo), url(b.ttf)`.
    ///
    /// Each comma separated entry becomes one list item; entries with more
    /// than one component are themselves lists.
    #[must_use]
    pub fn parse_src(text: &str) -> Self {
        let entries = split_top_level(text, |c| c == ',')
            .into_iter()
            .filter_map(|entry| {
                let mut components: Vec<CssValue> = split_top_level(entry, is_css_whitespace)
                    .into_iter()
                    .filter(|c| !c.is_empty())
                    .map(Self::component)
                    .collect();
                match components.len() {
                    0 => None,
                    1 => components.pop(),
                    _ => Some(Self::List(components)),
                }
            })
            .collect();
        Self::List(entries)
    }

    fn component(token: &str) -> Self {
        let lower = token.to_ascii_lowercase();
        if lower.starts_with("url(") && token.ends_with(')') {
            let inner = token[4..token.len() - 1].trim();
            let unquoted = inner
                .strip_prefix('"')
                .and_then(|s| s.strip_suffix('"'))
                .or_else(|| inner.strip_prefix('\'').and_then(|s| s.strip_suffix('\'')))
                .unwrap_or(inner);
            Self::Uri(unquoted.to_string())
        } else {
            Self::Other(token.to_string())
        }
    }
}

fn is_css_whitespace(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\n' | '\r' | '\x0C')
}

/// Splits on characters matching `is_separator` outside parentheses and
/// quotes.
fn split_top_level(text: &str, is_separator: impl Fn(char) -> bool) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut start = 0;
    for (i, c) in text.char_indices() {
        match (quote, c) {
            (Some(q), _) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '"' | '\'') => quote = Some(c),
            (None, '(') => depth += 1,
            (None, ')') => depth = depth.saturating_sub(1),
            (None, _) if is_separator(c) && depth == 0 => {
                parts.push(text[start..i].trim());
                start = i + c.len_utf8();
            }
            _ => {}
        }
    }
    parts.push(text[start..].trim());
    parts
}

/// An `@font-face` rule, reduced to what a downloader needs.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FontFaceRule {
    /// The `font-family` descriptor.
    pub family: Option<String>,
    /// The `src` descriptor.
    pub src: Option<CssValue>,
}

impl FontFaceRule {
    /// Creates a rule with the given `src` value.
    #[must_use]
    pub fn with_src(src: CssValue) -> Self {
        Self {
            family: None,
            src: Some(src),
        }
    }
}

/// Collects every URL in `value`, in order, resolving relative ones
/// against `base`. Non-URI items are skipped.
///
/// # Errors
///
/// Returns [`DownloadError::InvalidSource`] if a URI cannot be parsed.
pub fn extract_urls(value: &CssValue, base: Option<&Url>) -> Result<Vec<Url>, DownloadError> {
    let mut urls = Vec::new();
    collect_urls(value, base, &mut urls)?;
    Ok(urls)
}

fn collect_urls(
    value: &CssValue,
    base: Option<&Url>,
    urls: &mut Vec<Url>,
) -> Result<(), DownloadError> {
    match value {
        CssValue::Uri(raw) => {
            let parsed = match base {
                Some(base) => base.join(raw),
                None => Url::parse(raw),
            };
            let url = parsed
                .map_err(|e| DownloadError::invalid_source(format!("bad URL {raw:?}: {e}")))?;
            urls.push(url);
        }
        CssValue::List(items) => {
            for item in items {
                collect_urls(item, base, urls)?;
            }
        }
        CssValue::Other(_) => {}
    }
    Ok(())
}

/// The URL a font download targets: the first one in the rule's `src`.
///
/// # Errors
///
/// Returns [`DownloadError::InvalidSource`] if the rule has no `src`, a
/// URI is malformed, or no URI is present.
pub fn font_face_url(rule: &FontFaceRule, base: Option<&Url>) -> Result<Url, DownloadError> {
    let src = rule
        .src
        .as_ref()
        .ok_or_else(|| DownloadError::invalid_source("font-face rule has no src"))?;
    extract_urls(src, base)?
        .into_iter()
        .next()
        .ok_or_else(|| DownloadError::invalid_source("no URLs to download font"))
}
