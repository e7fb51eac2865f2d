//! Integration tests for secondary resource downloads.
//!
//! These tests cover the origin gate, single-shot fan-out to listeners,
//! late registration and real HTTP fetches.

mod support;

use std::sync::Arc;

use bytes::Bytes;
use markup_agent::config::AgentConfig;
use markup_agent::download::{
    BytesDecoder, CssValue, DownloadError, DownloadState, FontFaceRule, ResourceAgent,
    ResourceDownloader, TextDecoder,
};
use markup_agent::net::{
    ConnectionOpener, HttpConnectionOpener, MemoryConnectionOpener, MemoryResponse,
};
use support::{RecordingListener, html_document, parse_url, serve};

fn memory_downloader(
    opener: &Arc<MemoryConnectionOpener>,
    target: &str,
) -> ResourceDownloader<Bytes> {
    let shared: Arc<dyn ConnectionOpener> = opener.clone();
    ResourceDownloader::new(parse_url(target), shared, Arc::new(BytesDecoder))
}

#[tokio::test]
async fn test_unsafe_origin_fails_without_network_access() {
    // Setup
    let opener = Arc::new(MemoryConnectionOpener::new());
    let document = html_document(&opener, &parse_url("http://www.example.com/page.html")).await;
    let font = parse_url("http://evil.test/font.woff");
    opener.register(&font, MemoryResponse::new(&b"wOFF"[..]));
    let opened_before = opener.open_count();

    let downloader = memory_downloader(&opener, font.as_str());
    let listener = Arc::new(RecordingListener::for_document(Arc::clone(&document)));
    downloader.add_listener(listener.clone());

    // Execute
    downloader.run().await;

    // Verify
    assert_eq!(downloader.state(), DownloadState::DoneFailure);
    assert!(matches!(
        downloader.error().as_deref(),
        Some(DownloadError::IllegalOrigin { .. })
    ));
    assert_eq!(opener.open_count(), opened_before, "no connection may be opened");
    assert_eq!(listener.failures(), 1);
    assert_eq!(listener.successes(), 0);
}

#[tokio::test]
async fn test_https_document_refuses_http_resource() {
    let opener = Arc::new(MemoryConnectionOpener::new());
    let document = html_document(&opener, &parse_url("https://www.example.com/")).await;
    let image = parse_url("http://img.example.com/logo.png");
    opener.register(&image, MemoryResponse::new(&b"png"[..]));
    let opened_before = opener.open_count();

    let downloader = memory_downloader(&opener, image.as_str());
    downloader.add_listener(Arc::new(RecordingListener::for_document(document)));
    downloader.run().await;

    assert!(matches!(
        downloader.error().as_deref(),
        Some(DownloadError::IllegalOrigin { .. })
    ));
    assert_eq!(opener.open_count(), opened_before);
}

#[tokio::test]
async fn test_safe_origin_opens_through_document() {
    // Setup
    let opener = Arc::new(MemoryConnectionOpener::new());
    let document = html_document(&opener, &parse_url("http://www.example.com/page.html")).await;
    let font = parse_url("http://static.example.com/fonts/a.woff");
    opener.register(
        &font,
        MemoryResponse::new(&b"wOFF"[..]).with_header("Content-Type", "font/woff"),
    );

    // Execute
    let downloader = memory_downloader(&opener, font.as_str());
    let unaffiliated = Arc::new(RecordingListener::default());
    let owner = Arc::new(RecordingListener::for_document(Arc::clone(&document)));
    downloader.add_listener(unaffiliated.clone());
    downloader.add_listener(owner.clone());
    downloader.run().await;

    // Verify
    assert_eq!(downloader.state(), DownloadState::DoneSuccess);
    assert_eq!(downloader.content_type().as_deref(), Some("font/woff"));
    let opened = opener.opened();
    let last = opened.last().expect("font connection recorded");
    assert_eq!(last.url, font);
    assert_eq!(last.loading_time, document.loading_time());
    assert_eq!(unaffiliated.successes(), 1);
    assert_eq!(owner.successes(), 1);
}

#[tokio::test]
async fn test_font_face_uses_first_url_without_fallback() {
    // Setup
    let opener = Arc::new(MemoryConnectionOpener::new());
    let second = parse_url("http://fonts.example.com/b.ttf");
    opener.register(&second, MemoryResponse::new(&b"ttf"[..]));
    let rule = FontFaceRule::with_src(CssValue::parse_src(
        "local(Foo), url(a.woff2) format('woff2'), url(b.ttf)",
    ));
    let base = parse_url("http://fonts.example.com/css/fonts.css");
    let shared: Arc<dyn ConnectionOpener> = opener.clone();

    // Execute
    let downloader =
        ResourceDownloader::from_font_face(&rule, Some(&base), shared, Arc::new(BytesDecoder))
            .expect("rule has URLs");
    let listener = Arc::new(RecordingListener::default());
    downloader.add_listener(listener.clone());
    downloader.run().await;

    // Verify
    assert_eq!(downloader.url().as_str(), "http://fonts.example.com/css/a.woff2");
    assert_eq!(downloader.state(), DownloadState::DoneFailure);
    assert_eq!(listener.failures(), 1);
    let opened: Vec<_> = opener.opened().into_iter().map(|o| o.url).collect();
    assert_eq!(opened, vec![parse_url("http://fonts.example.com/css/a.woff2")]);
}

#[test]
fn test_font_face_without_urls_is_invalid_source() {
    let opener: Arc<dyn ConnectionOpener> = Arc::new(MemoryConnectionOpener::new());
    let rule = FontFaceRule::with_src(CssValue::parse_src("local(Foo), local(Bar)"));

    let result = ResourceDownloader::from_font_face(&rule, None, opener, Arc::new(BytesDecoder));

    assert!(matches!(result, Err(DownloadError::InvalidSource { .. })));
}

#[tokio::test]
async fn test_late_listener_receives_same_content() {
    let opener = Arc::new(MemoryConnectionOpener::new());
    let image = parse_url("http://img.example.com/logo.png");
    opener.register(&image, MemoryResponse::new(&b"png bytes"[..]));
    let downloader = memory_downloader(&opener, image.as_str());
    let early = Arc::new(RecordingListener::default());
    downloader.add_listener(early.clone());
    downloader.run().await;

    let late = Arc::new(RecordingListener::default());
    downloader.add_listener(late.clone());

    // Notified synchronously, before add_listener returned.
    assert_eq!(late.successes(), 1);
    assert_eq!(late.failures(), 0);
    let early_content = early.content().expect("early content");
    let late_content = late.content().expect("late content");
    assert!(Arc::ptr_eq(&early_content, &late_content));
    assert_eq!(late_content.as_ref(), &Bytes::from_static(b"png bytes"));
    assert_eq!(opener.open_count(), 1);
}

#[tokio::test]
async fn test_failure_fans_out_once_to_every_listener() {
    let opener = Arc::new(MemoryConnectionOpener::new());
    let image = parse_url("http://img.example.com/broken.png");
    opener.register(&image, MemoryResponse::new(&b"png"[..]).with_failing_body());
    let downloader = memory_downloader(&opener, image.as_str());
    let listeners: Vec<_> = (0..3).map(|_| Arc::new(RecordingListener::default())).collect();
    for listener in &listeners {
        downloader.add_listener(listener.clone());
    }

    downloader.run().await;

    for listener in &listeners {
        assert_eq!(listener.failures(), 1);
        assert_eq!(listener.successes(), 0);
        assert!(listener.last_error().is_some());
    }
    assert_eq!(opener.open_count(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_registration_notifies_each_listener_once() {
    // Setup
    let opener = Arc::new(MemoryConnectionOpener::new());
    let image = parse_url("http://img.example.com/logo.png");
    opener.register(&image, MemoryResponse::new(&b"png"[..]));
    let downloader = Arc::new(memory_downloader(&opener, image.as_str()));

    // Execute
    let handle = downloader.start().expect("first start spawns");
    let mut registrations = Vec::new();
    for _ in 0..32 {
        let downloader = Arc::clone(&downloader);
        registrations.push(tokio::spawn(async move {
            let listener = Arc::new(RecordingListener::default());
            downloader.add_listener(listener.clone());
            listener
        }));
    }
    let mut listeners = Vec::new();
    for registration in registrations {
        listeners.push(registration.await.expect("registration task"));
    }
    handle.await.expect("download task");

    // Verify
    assert!(downloader.is_done());
    for listener in &listeners {
        assert_eq!(listener.successes() + listener.failures(), 1);
        assert_eq!(listener.successes(), 1);
    }
}

#[tokio::test]
async fn test_agent_shares_one_task_per_url() {
    let opener = Arc::new(MemoryConnectionOpener::new());
    let document = html_document(&opener, &parse_url("http://www.example.com/")).await;
    let image = parse_url("http://www.example.com/logo.png");
    opener.register(&image, MemoryResponse::new(&b"png"[..]));
    let shared: Arc<dyn ConnectionOpener> = opener.clone();
    let agent = ResourceAgent::new(shared, Arc::new(BytesDecoder));

    let first = Arc::new(RecordingListener::for_document(Arc::clone(&document)));
    let second = Arc::new(RecordingListener::for_document(document));
    let task = agent.add_download_listener(&image, first.clone());
    let same = agent.add_download_listener(&image, second.clone());
    assert!(Arc::ptr_eq(&task, &same));

    while !task.is_done() {
        tokio::task::yield_now().await;
    }
    assert_eq!(first.successes(), 1);
    assert_eq!(second.successes(), 1);
    let image_opens = opener.opened().iter().filter(|o| o.url == image).count();
    assert_eq!(image_opens, 1);
}

#[tokio::test]
async fn test_http_style_sheet_download_decodes_charset() {
    // Setup
    let server = serve(
        "/css/site.css",
        &b"p::after { content: '\xa7' }"[..],
        "text/css; charset=iso-8859-1",
    )
    .await;
    let opener: Arc<dyn ConnectionOpener> =
        Arc::new(HttpConnectionOpener::new(&AgentConfig::default()).expect("opener"));
    let target = parse_url(&format!("{}/css/site.css", server.uri()));

    // Execute
    let downloader = ResourceDownloader::new(target, opener, Arc::new(TextDecoder));
    downloader.run().await;

    // Verify
    assert_eq!(downloader.state(), DownloadState::DoneSuccess);
    assert_eq!(
        downloader.content_type().as_deref(),
        Some("text/css; charset=iso-8859-1")
    );
    let sheet = downloader.native_content().expect("style sheet");
    assert_eq!(sheet.as_str(), "p::after { content: '\u{a7}' }");
}

#[tokio::test]
async fn test_http_404_reported_to_listener() {
    let server = serve("/present.woff", &b"wOFF"[..], "font/woff").await;
    let opener: Arc<dyn ConnectionOpener> =
        Arc::new(HttpConnectionOpener::new(&AgentConfig::default()).expect("opener"));
    let downloader = ResourceDownloader::new(
        parse_url(&format!("{}/absent.woff", server.uri())),
        opener,
        Arc::new(BytesDecoder),
    );
    let listener = Arc::new(RecordingListener::default());
    downloader.add_listener(listener.clone());

    downloader.run().await;

    assert_eq!(listener.failures(), 1);
    let message = listener.last_error().expect("error recorded");
    assert!(message.contains("404"), "unexpected error: {message}");
}
