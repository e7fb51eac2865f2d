//! Observers of resource downloads.

use std::sync::Arc;

use crate::document::Document;

use super::DownloadError;

/// Receives the outcome of a resource download.
///
/// Each registered listener is notified exactly once, either with the
/// decoded content or with the failure.
pub trait DownloadListener<C>: Send + Sync {
    /// Called with the decoded content. Every listener of a task receives
    /// the same shared value.
    fn on_content_downloaded(&self, content: Arc<C>);

    /// Called when the download failed.
    fn on_failed_download(&self, error: &DownloadError);

    /// Content this listener already holds, independent of any task.
    fn native_content(&self) -> Option<Arc<C>>;

    /// The document on whose behalf the resource is wanted.
    ///
    /// The first listener returning a document decides the origin check.
    /// Listeners without one leave the download unchecked.
    fn owning_document(&self) -> Option<Arc<Document>> {
        None
    }
}
