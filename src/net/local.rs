//! Connections that never touch the network: `data:` and `file:` URLs.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use data_url::DataUrl;
use reqwest::header::{CONTENT_TYPE, HeaderValue};
use tracing::debug;
use url::Url;

use super::{Connection, ResponseHead, TransportError};

/// Serves the payload embedded in a `data:` URL.
#[derive(Debug)]
pub struct DataConnection {
    url: Url,
    head: Option<ResponseHead>,
    body: Option<Bytes>,
    consumed: bool,
}

impl DataConnection {
    /// Creates an unconnected data connection.
    #[must_use]
    pub fn new(url: Url) -> Self {
        Self {
            url,
            head: None,
            body: None,
            consumed: false,
        }
    }
}

#[async_trait]
impl Connection for DataConnection {
    fn url(&self) -> &Url {
        &self.url
    }

    fn set_connect_timeout(&mut self, _timeout: Option<Duration>) {}

    async fn connect(&mut self) -> Result<(), TransportError> {
        if self.head.is_some() || self.consumed {
            return Ok(());
        }
        let data_url = DataUrl::process(self.url.as_str())
            .map_err(|e| TransportError::data_url(self.url.as_str(), format!("{e:?}")))?;
        let (decoded, _fragment) = data_url
            .decode_to_vec()
            .map_err(|e| TransportError::data_url(self.url.as_str(), format!("{e:?}")))?;

        let mime = data_url.mime_type();
        let mut content_type = format!("{}/{}", mime.type_, mime.subtype);
        for (name, value) in &mime.parameters {
            content_type.push_str(&format!(";{name}={value}"));
        }

        let mut head = ResponseHead::ok(self.url.clone());
        if let Ok(value) = HeaderValue::from_str(&content_type) {
            head.headers.insert(CONTENT_TYPE, value);
        }
        self.head = Some(head);
        self.body = Some(Bytes::from(decoded));
        Ok(())
    }

    fn response(&self) -> Option<&ResponseHead> {
        self.head.as_ref()
    }

    async fn read_body(&mut self) -> Result<Bytes, TransportError> {
        self.connect().await?;
        self.consumed = true;
        self.body
            .take()
            .ok_or_else(|| TransportError::body_consumed(self.url.as_str()))
    }

    fn disconnect(&mut self) {
        self.body = None;
        self.consumed = true;
    }
}

/// Reads a local file named by a `file:` URL.
#[derive(Debug)]
pub struct FileConnection {
    url: Url,
    head: Option<ResponseHead>,
    body: Option<Bytes>,
    consumed: bool,
}

impl FileConnection {
    /// Creates an unconnected file connection.
    #[must_use]
    pub fn new(url: Url) -> Self {
        Self {
            url,
            head: None,
            body: None,
            consumed: false,
        }
    }
}

#[async_trait]
impl Connection for FileConnection {
    fn url(&self) -> &Url {
        &self.url
    }

    fn set_connect_timeout(&mut self, _timeout: Option<Duration>) {}

    async fn connect(&mut self) -> Result<(), TransportError> {
        if self.head.is_some() || self.consumed {
            return Ok(());
        }
        let path = self.url.to_file_path().map_err(|()| {
            TransportError::io(
                self.url.as_str(),
                std::io::Error::new(std::io::ErrorKind::InvalidInput, "not a local file path"),
            )
        })?;
        let contents = tokio::fs::read(&path)
            .await
            .map_err(|e| TransportError::io(self.url.as_str(), e))?;
        debug!(path = %path.display(), bytes = contents.len(), "read local file");

        let mut head = ResponseHead::ok(self.url.clone());
        if let Some(content_type) = guess_content_type(&path) {
            head.headers
                .insert(CONTENT_TYPE, HeaderValue::from_static(content_type));
        }
        self.head = Some(head);
        self.body = Some(Bytes::from(contents));
        Ok(())
    }

    fn response(&self) -> Option<&ResponseHead> {
        self.head.as_ref()
    }

    async fn read_body(&mut self) -> Result<Bytes, TransportError> {
        self.connect().await?;
        self.consumed = true;
        self.body
            .take()
            .ok_or_else(|| TransportError::body_consumed(self.url.as_str()))
    }

    fn disconnect(&mut self) {
        self.body = None;
        self.consumed = true;
    }
}

/// Maps common file extensions to a media type.
fn guess_content_type(path: &Path) -> Option<&'static str> {
    let extension = path.extension()?.to_str()?.to_ascii_lowercase();
    let content_type = match extension.as_str() {
        "html" | "htm" => "text/html",
        "xhtml" | "xht" => "application/xhtml+xml",
        "xml" => "application/xml",
        "svg" => "image/svg+xml",
        "css" => "text/css",
        "txt" => "text/plain",
        "woff" => "font/woff",
        "woff2" => "font/woff2",
        "ttf" => "font/ttf",
        "otf" => "font/otf",
        _ => return None,
    };
    Some(content_type)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_data_connection_decodes_payload() {
        let url = Url::parse("data:text/html;charset=utf-8,%3Cp%3Ehi%3C/p%3E").unwrap();
        let mut connection = DataConnection::new(url);
        connection.connect().await.unwrap();
        assert_eq!(connection.content_type(), Some("text/html;charset=utf-8"));
        let body = connection.read_body().await.unwrap();
        assert_eq!(&body[..], b"<p>hi</p>");
    }

    #[tokio::test]
    async fn test_data_connection_decodes_base64() {
        let url = Url::parse("data:application/octet-stream;base64,AAEC").unwrap();
        let mut connection = DataConnection::new(url);
        let body = connection.read_body().await.unwrap();
        assert_eq!(&body[..], &[0u8, 1, 2]);
    }

    #[tokio::test]
    async fn test_data_connection_rejects_bad_base64() {
        let url = Url::parse("data:;base64,%%%").unwrap();
        let mut connection = DataConnection::new(url);
        let result = connection.connect().await;
        assert!(matches!(result, Err(TransportError::DataUrl { .. })));
    }

    #[tokio::test]
    async fn test_file_connection_reads_file_with_guessed_type() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("page.xhtml");
        std::fs::write(&path, "<html/>").unwrap();

        let mut connection = FileConnection::new(Url::from_file_path(&path).unwrap());
        connection.connect().await.unwrap();
        assert_eq!(connection.content_type(), Some("application/xhtml+xml"));
        assert_eq!(&connection.read_body().await.unwrap()[..], b"<html/>");
    }

    #[tokio::test]
    async fn test_file_connection_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let url = Url::from_file_path(dir.path().join("absent.html")).unwrap();
        let mut connection = FileConnection::new(url);
        let result = connection.connect().await;
        assert!(matches!(result, Err(TransportError::Io { .. })));
    }

    #[test]
    fn test_guess_content_type() {
        assert_eq!(guess_content_type(Path::new("a/b.HTML")), Some("text/html"));
        assert_eq!(guess_content_type(Path::new("font.woff2")), Some("font/woff2"));
        assert_eq!(guess_content_type(Path::new("noext")), None);
        assert_eq!(guess_content_type(Path::new("x.bin")), None);
    }
}
