//! Origin policy: public suffix classification and origin comparisons.
//!
//! The [`DefaultOriginPolicy`] classifies hostnames against a public suffix
//! table to find their registrable domain. Documents use it to decide
//! whether a resource URL may be fetched on their behalf.
//!
//! # Example
//!
//! ```
//! use markup_agent::origin::{DefaultOriginPolicy, OriginPolicy};
//!
//! let policy = DefaultOriginPolicy::instance();
//! assert!(policy.is_top_level_suffix("co.uk"));
//! assert_eq!(policy.domain_from_hostname("www.example.co.uk"), "example.co.uk");
//! ```

mod error;
mod suffix_table;

use std::path::Path;
use std::sync::{Arc, LazyLock};

use url::Url;

pub use error::SuffixListError;
pub use suffix_table::SuffixTable;

use suffix_table::BUNDLED_SUFFIX_LIST;

/// Hostname classification used for origin decisions.
///
/// Implementations are immutable after construction and safe for
/// unsynchronized concurrent reads.
pub trait OriginPolicy: Send + Sync + std::fmt::Debug {
    /// Returns true if `candidate` is a public suffix.
    fn is_top_level_suffix(&self, candidate: &str) -> bool;

    /// Returns the registrable domain of `host`, or `host` itself when no
    /// suffix boundary exists.
    fn domain_from_hostname<'a>(&self, host: &'a str) -> &'a str;
}

static DEFAULT_POLICY: LazyLock<Arc<DefaultOriginPolicy>> =
    LazyLock::new(|| Arc::new(DefaultOriginPolicy::new(SuffixTable::parse(BUNDLED_SUFFIX_LIST))));

/// Public-suffix based origin policy.
#[derive(Debug, Clone)]
pub struct DefaultOriginPolicy {
    table: SuffixTable,
}

impl DefaultOriginPolicy {
    /// Creates a policy over an already loaded table.
    #[must_use]
    pub fn new(table: SuffixTable) -> Self {
        Self { table }
    }

    /// Loads a policy from a suffix list on disk.
    ///
    /// # Errors
    ///
    /// Returns [`SuffixListError`] if the list cannot be read.
    pub fn from_path(path: &Path) -> Result<Self, SuffixListError> {
        Ok(Self::new(SuffixTable::from_path(path)?))
    }

    /// Returns the process-wide policy built from the bundled suffix list.
    ///
    /// The table is loaded once, on first use.
    #[must_use]
    pub fn instance() -> &'static DefaultOriginPolicy {
        &DEFAULT_POLICY
    }

    /// Returns the process-wide policy as a shareable trait object.
    #[must_use]
    pub fn shared() -> Arc<dyn OriginPolicy> {
        let policy: Arc<DefaultOriginPolicy> = Arc::clone(&*DEFAULT_POLICY);
        policy
    }

    /// The underlying suffix table.
    #[must_use]
    pub fn table(&self) -> &SuffixTable {
        &self.table
    }
}

impl OriginPolicy for DefaultOriginPolicy {
    fn is_top_level_suffix(&self, candidate: &str) -> bool {
        if self.table.is_exact(candidate) || self.table.is_wildcard(candidate) {
            return true;
        }
        // Exceptions only suppress wildcard matches.
        match candidate.find('.') {
            Some(idx) if idx > 0 => {
                self.table.is_wildcard(&candidate[idx + 1..]) && !self.table.is_exception(candidate)
            }
            _ => false,
        }
    }

    fn domain_from_hostname<'a>(&self, host: &'a str) -> &'a str {
        // Walk dot boundaries right to left, growing the candidate one label
        // at a time until it stops being a public suffix.
        for (idx, _) in host.char_indices().rev().filter(|&(_, c)| c == '.') {
            let candidate = &host[idx + 1..];
            if !self.is_top_level_suffix(candidate) {
                return candidate;
            }
        }
        host
    }
}

/// Returns true if both URLs share scheme, host and port.
#[must_use]
pub fn same_origin(a: &Url, b: &Url) -> bool {
    a.origin() == b.origin() && a.origin().is_tuple()
}

/// Returns the registrable domain of the URL's host under `policy`.
///
/// IP addresses are returned verbatim; URLs without a host yield `None`.
#[must_use]
pub fn registrable_domain(policy: &dyn OriginPolicy, url: &Url) -> Option<String> {
    match url.host()? {
        url::Host::Domain(domain) => {
            let domain = domain.trim_end_matches('.').to_ascii_lowercase();
            Some(policy.domain_from_hostname(&domain).to_string())
        }
        other => Some(other.to_string()),
    }
}

/// Decides whether `target` may be fetched on behalf of a document at
/// `document_url`.
///
/// - `data:` URLs are always safe
/// - `file:` URLs are safe only for `file:` documents
/// - same-origin URLs are safe
/// - otherwise both must be HTTP(S), the target must not downgrade from
///   `https` to `http`, and both hosts must share a registrable domain
#[must_use]
pub fn is_safe_origin(policy: &dyn OriginPolicy, document_url: &Url, target: &Url) -> bool {
    match target.scheme() {
        "data" => return true,
        "file" => return document_url.scheme() == "file",
        _ => {}
    }
    if same_origin(document_url, target) {
        return true;
    }
    let web = |scheme: &str| matches!(scheme, "http" | "https");
    if !web(document_url.scheme()) || !web(target.scheme()) {
        return false;
    }
    if document_url.scheme() == "https" && target.scheme() == "http" {
        return false;
    }
    match (
        registrable_domain(policy, document_url),
        registrable_domain(policy, target),
    ) {
        (Some(doc_domain), Some(target_domain)) => doc_domain == target_domain,
        _ => false,
    }
}
