//! Content type classification and character decoding.

use std::borrow::Cow;

use encoding_rs::{Encoding, UTF_8};

/// Returns the media type of a `Content-Type` value: the text before any
/// `;` parameter, trimmed.
#[must_use]
pub fn mime_type(content_type: &str) -> &str {
    content_type
        .split_once(';')
        .map_or(content_type, |(mime, _)| mime)
        .trim()
}

/// Returns true if `content_type` names `text/html`.
///
/// Every other type, including a missing one, is XML-family markup.
#[must_use]
pub fn is_html(content_type: Option<&str>) -> bool {
    content_type.is_some_and(|value| mime_type(value).eq_ignore_ascii_case("text/html"))
}

/// Returns the `charset` parameter of a `Content-Type` value, unquoted.
#[must_use]
pub fn charset_param(content_type: &str) -> Option<&str> {
    content_type.split(';').skip(1).find_map(|param| {
        let (name, value) = param.split_once('=')?;
        if name.trim().eq_ignore_ascii_case("charset") {
            let value = value.trim().trim_matches(|c| c == '"' || c == '\'');
            (!value.is_empty()).then_some(value)
        } else {
            None
        }
    })
}

/// Picks the character encoding of a response body.
///
/// Precedence: a `Content-Encoding` value that is a character encoding
/// label, then the `charset` parameter of the content type, then UTF-8.
/// Unrecognised labels fall through to the next source.
#[must_use]
pub fn resolve_encoding(
    content_encoding: Option<&str>,
    content_type: Option<&str>,
) -> &'static Encoding {
    let label = |value: &str| Encoding::for_label(value.trim().as_bytes());
    content_encoding
        .and_then(label)
        .or_else(|| content_type.and_then(charset_param).and_then(label))
        .unwrap_or(UTF_8)
}

/// Decodes `body` with `encoding`, honouring a byte order mark.
///
/// Malformed sequences become U+FFFD.
#[must_use]
pub fn decode<'a>(body: &'a [u8], encoding: &'static Encoding) -> Cow<'a, str> {
    let (text, _used, _had_errors) = encoding.decode(body);
    text
}
