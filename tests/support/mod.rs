//! Shared helpers for integration tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use bytes::Bytes;
use markup_agent::document::Document;
use markup_agent::download::{DownloadError, DownloadListener};
use markup_agent::net::{ConnectionOpener, MemoryConnectionOpener, MemoryResponse};
use markup_agent::retriever::DocumentRetriever;
use url::Url;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Listener that records every callback it receives.
#[derive(Default)]
pub struct RecordingListener {
    document: Option<Arc<Document>>,
    successes: AtomicUsize,
    failures: AtomicUsize,
    content: Mutex<Option<Arc<Bytes>>>,
    last_error: Mutex<Option<String>>,
}

impl RecordingListener {
    /// A listener acting on behalf of `document`.
    pub fn for_document(document: Arc<Document>) -> Self {
        Self {
            document: Some(document),
            ..Self::default()
        }
    }

    pub fn successes(&self) -> usize {
        self.successes.load(Ordering::SeqCst)
    }

    pub fn failures(&self) -> usize {
        self.failures.load(Ordering::SeqCst)
    }

    pub fn content(&self) -> Option<Arc<Bytes>> {
        self.content.lock().expect("listener lock").clone()
    }

    pub fn last_error(&self) -> Option<String> {
        self.last_error.lock().expect("listener lock").clone()
    }
}

impl DownloadListener<Bytes> for RecordingListener {
    fn on_content_downloaded(&self, content: Arc<Bytes>) {
        self.successes.fetch_add(1, Ordering::SeqCst);
        *self.content.lock().expect("listener lock") = Some(content);
    }

    fn on_failed_download(&self, error: &DownloadError) {
        self.failures.fetch_add(1, Ordering::SeqCst);
        *self.last_error.lock().expect("listener lock") = Some(error.to_string());
    }

    fn native_content(&self) -> Option<Arc<Bytes>> {
        self.content()
    }

    fn owning_document(&self) -> Option<Arc<Document>> {
        self.document.clone()
    }
}

/// Parses a test URL.
pub fn parse_url(text: &str) -> Url {
    Url::parse(text).expect("valid test URL")
}

/// A retriever over an in-memory opener.
pub fn memory_retriever(opener: &Arc<MemoryConnectionOpener>) -> DocumentRetriever {
    let shared: Arc<dyn ConnectionOpener> = opener.clone();
    DocumentRetriever::with_opener(shared)
}

/// Registers an HTML page at `page` and retrieves it as a document.
pub async fn html_document(opener: &Arc<MemoryConnectionOpener>, page: &Url) -> Arc<Document> {
    opener.register(page, MemoryResponse::html("<title>Page</title><p>text</p>"));
    let document = memory_retriever(opener)
        .read_url(page)
        .await
        .expect("document should load");
    Arc::new(document)
}

/// Starts a mock server answering GET `route` with `body` and `content_type`.
pub async fn serve(route: &str, body: impl Into<Vec<u8>>, content_type: &str) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("Content-Type", content_type)
                .set_body_bytes(body.into()),
        )
        .mount(&server)
        .await;
    server
}
