//! Integration tests for the origin policy and custom suffix lists.

mod support;

use std::io::Write;
use std::sync::Arc;

use markup_agent::config::{AgentConfig, ConfigError};
use markup_agent::net::{ConnectionOpener, MemoryConnectionOpener, MemoryResponse};
use markup_agent::origin::{
    DefaultOriginPolicy, OriginPolicy, SuffixListError, SuffixTable, is_safe_origin,
    registrable_domain,
};
use markup_agent::retriever::DocumentRetriever;
use support::parse_url;
use tempfile::NamedTempFile;

fn suffix_file(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("temp file");
    file.write_all(contents.as_bytes()).expect("write suffix list");
    file
}

#[test]
fn test_custom_suffix_list_changes_registrable_domain() {
    // Setup
    let file = suffix_file("// private registry\ncom\n  hosting.com  \n*.cloud\n!www.cloud\n");

    // Execute
    let policy = DefaultOriginPolicy::from_path(file.path()).expect("list loads");

    // Verify
    assert!(policy.is_top_level_suffix("hosting.com"));
    assert_eq!(policy.domain_from_hostname("alice.hosting.com"), "alice.hosting.com");
    assert_eq!(policy.domain_from_hostname("x.eu.cloud"), "x.eu.cloud");
    assert_eq!(policy.domain_from_hostname("a.www.cloud"), "www.cloud");
    assert_eq!(
        registrable_domain(&policy, &parse_url("https://shop.alice.hosting.com/")).as_deref(),
        Some("alice.hosting.com")
    );
}

#[test]
fn test_tenants_of_shared_suffix_are_not_safe_origins() {
    let file = suffix_file("com\nhosting.com\n");
    let policy = DefaultOriginPolicy::from_path(file.path()).expect("list loads");
    let alice = parse_url("https://alice.hosting.com/index.html");

    assert!(!is_safe_origin(
        &policy,
        &alice,
        &parse_url("https://mallory.hosting.com/font.woff")
    ));
    assert!(is_safe_origin(
        &policy,
        &alice,
        &parse_url("https://static.alice.hosting.com/font.woff")
    ));
}

#[test]
fn test_missing_suffix_list_fails_fast() {
    let dir = tempfile::tempdir().expect("temp dir");
    let missing = dir.path().join("absent.dat");

    let result = DefaultOriginPolicy::from_path(&missing);

    assert!(matches!(result, Err(SuffixListError::Io { .. })));
}

#[test]
fn test_retriever_rejects_unreadable_suffix_list() {
    let dir = tempfile::tempdir().expect("temp dir");
    let config = AgentConfig {
        suffix_list_path: Some(dir.path().join("absent.dat")),
        ..AgentConfig::default()
    };

    let result = DocumentRetriever::new(&config);

    assert!(matches!(result, Err(ConfigError::SuffixList(_))));
}

#[tokio::test]
async fn test_documents_use_retriever_origin_policy() {
    // Setup
    let opener = Arc::new(MemoryConnectionOpener::new());
    let page = parse_url("http://alice.hosting.com/");
    opener.register(&page, MemoryResponse::html("<p>hello</p>"));
    let policy = Arc::new(DefaultOriginPolicy::new(SuffixTable::parse("com\nhosting.com\n")));
    let shared: Arc<dyn ConnectionOpener> = opener.clone();
    let retriever = DocumentRetriever::with_opener(shared).with_origin_policy(policy);

    // Execute
    let document = retriever.read_url(&page).await.expect("document loads");

    // Verify
    assert!(!document.is_safe_origin(&parse_url("http://bob.hosting.com/a.png")));
    assert!(document.is_safe_origin(&parse_url("http://img.alice.hosting.com/a.png")));
    assert!(document.is_safe_origin(&parse_url("data:image/png;base64,AAAA")));
    assert!(!document.is_safe_origin(&parse_url("file:///etc/passwd")));
}

#[test]
fn test_bundled_policy_is_shared() {
    let first = DefaultOriginPolicy::instance();
    let second = DefaultOriginPolicy::instance();
    assert!(std::ptr::eq(first, second));
    assert!(!first.table().is_empty());
    assert_eq!(
        registrable_domain(
            DefaultOriginPolicy::shared().as_ref(),
            &parse_url("http://www.example.co.uk/")
        )
        .as_deref(),
        Some("example.co.uk")
    );
}
