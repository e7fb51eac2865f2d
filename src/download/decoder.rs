//! Conversion of downloaded bytes into native content.

use bytes::Bytes;

use super::error::BoxError;
use crate::retriever::content_type;

/// Turns a response body into the native representation of a resource.
pub trait ContentDecoder<C>: Send + Sync {
    /// Decodes `body`, served with `content_type`.
    ///
    /// # Errors
    ///
    /// Returns an error if `body` is not a valid resource of this kind.
    fn decode(&self, content_type: Option<&str>, body: Bytes) -> Result<C, BoxError>;
}

/// Keeps the raw bytes.
#[derive(Debug, Clone, Copy, Default)]
pub struct BytesDecoder;

impl ContentDecoder<Bytes> for BytesDecoder {
    fn decode(&self, _content_type: Option<&str>, body: Bytes) -> Result<Bytes, BoxError> {
        Ok(body)
    }
}

/// Decodes text resources (style sheets, scripts) using the `charset`
/// parameter of the content type, else UTF-8.
#[derive(Debug, Clone, Copy, Default)]
pub struct TextDecoder;

impl ContentDecoder<String> for TextDecoder {
    fn decode(&self, content_type: Option<&str>, body: Bytes) -> Result<String, BoxError> {
        let encoding = content_type::resolve_encoding(None, content_type);
        Ok(content_type::decode(&body, encoding).into_owned())
    }
}
