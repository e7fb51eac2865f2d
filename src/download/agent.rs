//! Per-URL registry of download tasks.

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use tracing::debug;
use url::Url;

use super::decoder::ContentDecoder;
use super::listener::DownloadListener;
use super::task::ResourceDownloader;
use crate::net::ConnectionOpener;
use crate::net::constants::CONNECT_TIMEOUT_SECS;

/// Keeps one [`ResourceDownloader`] per URL, created on first use.
///
/// Callers that want deduplication go through an agent; the downloader
/// itself has no registry.
pub struct ResourceAgent<C> {
    opener: Arc<dyn ConnectionOpener>,
    decoder: Arc<dyn ContentDecoder<C>>,
    connect_timeout: Duration,
    downloaders: DashMap<Url, Arc<ResourceDownloader<C>>>,
}

impl<C> std::fmt::Debug for ResourceAgent<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResourceAgent")
            .field("opener", &self.opener)
            .field("downloaders", &self.downloaders.len())
            .finish_non_exhaustive()
    }
}

impl<C: Send + Sync + 'static> ResourceAgent<C> {
    /// Creates an empty agent.
    pub fn new(opener: Arc<dyn ConnectionOpener>, decoder: Arc<dyn ContentDecoder<C>>) -> Self {
        Self {
            opener,
            decoder,
            connect_timeout: Duration::from_secs(CONNECT_TIMEOUT_SECS),
            downloaders: DashMap::new(),
        }
    }

    /// Connect timeout given to tasks created from now on.
    #[must_use]
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Returns the task for `url`, creating and starting it if needed.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn download(&self, url: &Url) -> Arc<ResourceDownloader<C>> {
        let downloader = self.downloader_for(url);
        downloader.start();
        downloader
    }

    /// Registers `listener` on the task for `url`, then starts the task if
    /// it is new.
    ///
    /// Registration happens first, so the listener's owning document takes
    /// part in the origin check of a fresh task.
    pub fn add_download_listener(
        &self,
        url: &Url,
        listener: Arc<dyn DownloadListener<C>>,
    ) -> Arc<ResourceDownloader<C>> {
        let downloader = self.downloader_for(url);
        downloader.add_listener(listener);
        downloader.start();
        downloader
    }

    /// The task for `url`, if one exists.
    #[must_use]
    pub fn get_resource_downloader(&self, url: &Url) -> Option<Arc<ResourceDownloader<C>>> {
        self.downloaders.get(url).map(|entry| Arc::clone(entry.value()))
    }

    /// Number of known tasks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.downloaders.len()
    }

    /// Returns true if no task was created yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.downloaders.is_empty()
    }

    fn downloader_for(&self, url: &Url) -> Arc<ResourceDownloader<C>> {
        let entry = self.downloaders.entry(url.clone()).or_insert_with(|| {
            debug!(url = %url, "creating resource downloader");
            Arc::new(
                ResourceDownloader::new(
                    url.clone(),
                    Arc::clone(&self.opener),
                    Arc::clone(&self.decoder),
                )
                .with_connect_timeout(self.connect_timeout),
            )
        });
        Arc::clone(entry.value())
    }
}
