//! Visited-link history shared by a retriever and its documents.

use dashmap::DashSet;
use url::Url;

/// Set of visited URLs, compared without their fragment.
#[derive(Debug, Default)]
pub struct VisitedHistory {
    urls: DashSet<String>,
}

impl VisitedHistory {
    /// Creates an empty history.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `url` as visited.
    pub fn mark(&self, url: &Url) {
        self.urls.insert(Self::key(url));
    }

    /// Returns true if `url` was visited.
    #[must_use]
    pub fn contains(&self, url: &Url) -> bool {
        self.urls.contains(&Self::key(url))
    }

    /// Number of distinct visited URLs.
    #[must_use]
    pub fn len(&self) -> usize {
        self.urls.len()
    }

    /// Returns true if nothing was visited.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.urls.is_empty()
    }

    fn key(url: &Url) -> String {
        let mut url = url.clone();
        url.set_fragment(None);
        url.into()
    }
}
