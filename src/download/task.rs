//! The resource download task.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};
use url::Url;

use super::DownloadError;
use super::decoder::ContentDecoder;
use super::listener::DownloadListener;
use super::source::{FontFaceRule, font_face_url};
use crate::document::Document;
use crate::net::constants::CONNECT_TIMEOUT_SECS;
use crate::net::ConnectionOpener;
use crate::retriever::now_millis;

/// Lifecycle of a download task. Transitions only move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DownloadState {
    /// Created, not started.
    Pending,
    /// Fetching.
    Running,
    /// Content decoded and delivered.
    DoneSuccess,
    /// Failed; listeners were told.
    DoneFailure,
}

impl DownloadState {
    /// Returns true for the two terminal states.
    #[must_use]
    pub fn is_done(self) -> bool {
        matches!(self, Self::DoneSuccess | Self::DoneFailure)
    }
}

struct TaskState<C> {
    running: bool,
    listeners: Vec<Arc<dyn DownloadListener<C>>>,
    content_type: Option<String>,
    outcome: Option<Outcome<C>>,
}

impl<C> TaskState<C> {
    fn state(&self) -> DownloadState {
        match (&self.outcome, self.running) {
            (Some(Outcome::Success(_)), _) => DownloadState::DoneSuccess,
            (Some(Outcome::Failure(_)), _) => DownloadState::DoneFailure,
            (None, true) => DownloadState::Running,
            (None, false) => DownloadState::Pending,
        }
    }
}

enum Outcome<C> {
    Success(Arc<C>),
    Failure(Arc<DownloadError>),
}

impl<C> Clone for Outcome<C> {
    fn clone(&self) -> Self {
        match self {
            Self::Success(content) => Self::Success(Arc::clone(content)),
            Self::Failure(error) => Self::Failure(Arc::clone(error)),
        }
    }
}

impl<C> Outcome<C> {
    fn notify(&self, listener: &dyn DownloadListener<C>) {
        match self {
            Self::Success(content) => listener.on_content_downloaded(Arc::clone(content)),
            Self::Failure(error) => listener.on_failed_download(error),
        }
    }
}

/// Fetches one secondary resource and hands it to every registered
/// listener exactly once.
///
/// The task retains its decoded content after completion, so listeners
/// added late receive the same `Arc` as the ones notified on completion.
pub struct ResourceDownloader<C> {
    url: Url,
    opener: Arc<dyn ConnectionOpener>,
    decoder: Arc<dyn ContentDecoder<C>>,
    connect_timeout: Duration,
    started: AtomicBool,
    inner: Mutex<TaskState<C>>,
}

impl<C> fmt::Debug for ResourceDownloader<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceDownloader")
            .field("url", &self.url.as_str())
            .field(
                "state",
                &self.inner.lock().unwrap_or_else(PoisonError::into_inner).state(),
            )
            .field("connect_timeout", &self.connect_timeout)
            .finish_non_exhaustive()
    }
}

impl<C: Send + Sync + 'static> ResourceDownloader<C> {
    /// Creates a pending task for `url`.
    ///
    /// `opener` is used only when no listener supplies an owning document.
    pub fn new(
        url: Url,
        opener: Arc<dyn ConnectionOpener>,
        decoder: Arc<dyn ContentDecoder<C>>,
    ) -> Self {
        Self {
            url,
            opener,
            decoder,
            connect_timeout: Duration::from_secs(CONNECT_TIMEOUT_SECS),
            started: AtomicBool::new(false),
            inner: Mutex::new(TaskState {
                running: false,
                listeners: Vec::new(),
                content_type: None,
                outcome: None,
            }),
        }
    }

    /// Creates a pending task for the first URL in a font rule's `src`.
    /// Later candidates are never tried.
    ///
    /// # Errors
    ///
    /// Returns [`DownloadError::InvalidSource`] if no URL can be extracted.
    pub fn from_font_face(
        rule: &FontFaceRule,
        base: Option<&Url>,
        opener: Arc<dyn ConnectionOpener>,
        decoder: Arc<dyn ContentDecoder<C>>,
    ) -> Result<Self, DownloadError> {
        let url = font_face_url(rule, base)?;
        Ok(Self::new(url, opener, decoder))
    }

    /// Overrides the connect timeout.
    #[must_use]
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// The resource URL.
    #[must_use]
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> DownloadState {
        self.lock().state()
    }

    /// Returns true once the task has succeeded or failed.
    #[must_use]
    pub fn is_done(&self) -> bool {
        self.state().is_done()
    }

    /// The response content type, once known.
    #[must_use]
    pub fn content_type(&self) -> Option<String> {
        self.lock().content_type.clone()
    }

    /// The decoded content of a successful download.
    #[must_use]
    pub fn native_content(&self) -> Option<Arc<C>> {
        match &self.lock().outcome {
            Some(Outcome::Success(content)) => Some(Arc::clone(content)),
            _ => None,
        }
    }

    /// The failure of an unsuccessful download.
    #[must_use]
    pub fn error(&self) -> Option<Arc<DownloadError>> {
        match &self.lock().outcome {
            Some(Outcome::Failure(error)) => Some(Arc::clone(error)),
            _ => None,
        }
    }

    /// Registers `listener`.
    ///
    /// On a finished task the listener is notified before this returns;
    /// otherwise it is notified when the task completes.
    pub fn add_listener(&self, listener: Arc<dyn DownloadListener<C>>) {
        let outcome = {
            let mut inner = self.lock();
            let Some(outcome) = inner.outcome.clone() else {
                inner.listeners.push(listener);
                return;
            };
            outcome
        };
        debug!(url = %self.url, "late listener notified");
        outcome.notify(listener.as_ref());
    }

    /// Spawns the download on the Tokio runtime. Returns `None` if the task
    /// was already started.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn start(self: &Arc<Self>) -> Option<JoinHandle<()>> {
        if self.started.swap(true, Ordering::AcqRel) {
            return None;
        }
        let task = Arc::clone(self);
        Some(tokio::spawn(async move { task.execute().await }))
    }

    /// Runs the download on the current task. Does nothing if the task was
    /// already started.
    pub async fn run(&self) {
        if self.started.swap(true, Ordering::AcqRel) {
            return;
        }
        self.execute().await;
    }

    #[instrument(skip(self), fields(url = %self.url))]
    async fn execute(&self) {
        self.lock().running = true;
        let result = self.fetch().await;
        self.complete(result);
    }

    async fn fetch(&self) -> Result<Arc<C>, DownloadError> {
        let mut connection = match self.contextual_document() {
            Some(document) => {
                if !document.is_safe_origin(&self.url) {
                    warn!(
                        url = %self.url,
                        document = %document.document_uri(),
                        "refusing download from unsafe origin"
                    );
                    return Err(DownloadError::illegal_origin(self.url.as_str()));
                }
                document.open_connection(&self.url)?
            }
            None => self.opener.open_connection(&self.url, now_millis())?,
        };
        connection.set_connect_timeout(Some(self.connect_timeout));
        connection.connect().await?;

        let content_type = connection.content_type().map(str::to_string);
        self.lock().content_type.clone_from(&content_type);

        let body = connection.read_body().await?;
        let content = self
            .decoder
            .decode(content_type.as_deref(), body)
            .map_err(|source| DownloadError::decode(self.url.as_str(), source))?;
        Ok(Arc::new(content))
    }

    /// The first owning document among the registered listeners.
    fn contextual_document(&self) -> Option<Arc<Document>> {
        let listeners = self.lock().listeners.clone();
        listeners.iter().find_map(|listener| listener.owning_document())
    }

    fn complete(&self, result: Result<Arc<C>, DownloadError>) {
        let outcome = match result {
            Ok(content) => Outcome::Success(content),
            Err(error) => Outcome::Failure(Arc::new(error)),
        };
        let listeners = {
            let mut inner = self.lock();
            inner.outcome = Some(outcome.clone());
            std::mem::take(&mut inner.listeners)
        };

        match &outcome {
            Outcome::Success(_) => {
                info!(url = %self.url, listeners = listeners.len(), "resource downloaded");
            }
            Outcome::Failure(error) => warn!(
                url = %self.url,
                error = %error,
                listeners = listeners.len(),
                "resource download failed"
            ),
        }
        for listener in &listeners {
            outcome.notify(listener.as_ref());
        }
    }

    fn lock(&self) -> MutexGuard<'_, TaskState<C>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
