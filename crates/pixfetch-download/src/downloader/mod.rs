//! Download coordinator implementation.
//!
//! [`ImageDownloader`] owns at most one in-flight request. Starting a new
//! request cancels the previous one first; cancelling suppresses every
//! outcome of the cancelled request.
//!
//! # Concurrency Model
//!
//! - One `std::sync::Mutex` guards the active request, the cancelled flag
//!   and the phase. Every check-then-act on that state happens under it.
//! - Each request gets a lease. The spawned task captures its lease and
//!   commits only if the lease is still current, so a late completion of a
//!   superseded request can never deliver.
//! - Lifecycle events are emitted while the lock is held, which keeps them
//!   ordered per instance. Callbacks run after the lock is released.
//! - The spawned task holds a `Weak` reference to the coordinator state.
//!   Dropping the [`ImageDownloader`] cancels the request and nothing keeps
//!   the state alive afterward.

mod task;

use std::fmt;
use std::future::Future;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::task::{Context, Poll};
use std::time::Duration;

use pixfetch_core::{
    DecodedImage, FetchLogEvent, FetchLoggerPort, FetchRequest, FetchSettings, HttpResponse,
    ImageDecoderPort, ImageFetchError, NoopFetchLogger, ResponseOutcome, TransportError,
    TransportPort, TransportReply,
};
use pixfetch_http::{HttpAdapterError, ReqwestTransport};
use tokio::runtime::Handle;
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;

use crate::decoder::ImageCrateDecoder;
use crate::pipeline::handle_reply;

/// Lease ID for the request currently owned by a downloader.
///
/// Used to reject completions of requests that were cancelled or replaced
/// while their transport call was running.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct LeaseId(u64);

/// Callback receiving the decoded image.
type SuccessHandler = Box<dyn FnOnce(DecodedImage) + Send>;

/// Callback receiving a classified error and the response, if one arrived.
type ErrorHandler = Box<dyn FnOnce(ImageFetchError, Option<HttpResponse>) + Send>;

/// Where the outcome of a request goes. Consumed on delivery.
enum Delivery {
    Callbacks {
        on_success: SuccessHandler,
        on_error: ErrorHandler,
    },
    Channel(oneshot::Sender<ResponseOutcome>),
}

impl Delivery {
    fn deliver(self, outcome: ResponseOutcome) {
        match self {
            Self::Callbacks {
                on_success,
                on_error,
            } => match outcome {
                ResponseOutcome::Success(image) => on_success(image),
                ResponseOutcome::Failure { error, response } => on_error(error, response),
            },
            Self::Channel(tx) => {
                // Receiver dropped: nobody is waiting
                let _ = tx.send(outcome);
            }
        }
    }
}

/// Lifecycle phase of a downloader.
///
/// `Completed`, `Failed` and `Cancelled` describe the last request. A new
/// request can be started from any phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DownloadPhase {
    /// No request has been started.
    #[default]
    Idle,
    /// A transport call is in flight.
    Requesting,
    /// The last request delivered an image.
    Completed,
    /// The last request delivered an error.
    Failed,
    /// The last request was cancelled or superseded.
    Cancelled,
}

impl DownloadPhase {
    /// Whether a request is in flight.
    pub const fn is_requesting(self) -> bool {
        matches!(self, Self::Requesting)
    }

    /// Whether the last request reached an end state.
    pub const fn is_finished(self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }
}

/// The request a downloader currently owns.
struct ActiveRequest {
    lease: LeaseId,
    url: String,
    cancel: CancellationToken,
    delivery: Delivery,
}

#[derive(Default)]
struct DownloadState {
    active: Option<ActiveRequest>,
    /// Set when the current request was cancelled. Reset by every start.
    cancelled: bool,
    phase: DownloadPhase,
}

impl DownloadState {
    fn is_current(&self, lease: LeaseId) -> bool {
        !self.cancelled && self.active.as_ref().is_some_and(|a| a.lease == lease)
    }

    /// Remove the active request if `lease` still owns it.
    fn take_if_current(&mut self, lease: LeaseId) -> Option<ActiveRequest> {
        self.is_current(lease)
            .then(|| self.active.take())
            .flatten()
    }
}

/// Dependencies for building an [`ImageDownloader`].
#[derive(Clone)]
pub struct ImageDownloaderDeps {
    /// Port performing the HTTP GET.
    pub transport: Arc<dyn TransportPort>,
    /// Port decoding validated bytes.
    pub decoder: Arc<dyn ImageDecoderPort>,
    /// Lifecycle event sink.
    pub logger: Arc<dyn FetchLoggerPort>,
    /// Supplies the default per-request timeout.
    pub settings: FetchSettings,
    /// Runtime that request tasks are spawned on. `None` uses the runtime
    /// the downloader is created in.
    pub runtime: Option<Handle>,
}

impl ImageDownloaderDeps {
    /// Dependencies around `transport` with the `image` crate decoder, no
    /// event logging and default settings.
    pub fn new(transport: Arc<dyn TransportPort>) -> Self {
        Self {
            transport,
            decoder: Arc::new(ImageCrateDecoder::new()),
            logger: Arc::new(NoopFetchLogger::new()),
            settings: FetchSettings::default(),
            runtime: None,
        }
    }

    /// Production dependencies: a reqwest transport built from `settings`.
    pub fn from_settings(settings: FetchSettings) -> Result<Self, HttpAdapterError> {
        let transport = ReqwestTransport::new(&settings)?;
        Ok(Self {
            settings,
            ..Self::new(Arc::new(transport))
        })
    }

    /// Replace the lifecycle logger.
    #[must_use]
    pub fn with_logger(mut self, logger: impl FetchLoggerPort + 'static) -> Self {
        self.logger = Arc::new(logger);
        self
    }

    /// Replace the decoder.
    #[must_use]
    pub fn with_decoder(mut self, decoder: impl ImageDecoderPort + 'static) -> Self {
        self.decoder = Arc::new(decoder);
        self
    }

    /// Replace the settings. Only the default timeout is read by the downloader.
    #[must_use]
    pub fn with_settings(mut self, settings: FetchSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Spawn request tasks on `runtime`, so the downloader can be driven
    /// from threads outside it.
    #[must_use]
    pub fn with_runtime(mut self, runtime: Handle) -> Self {
        self.runtime = Some(runtime);
        self
    }
}

/// Build a downloader from its dependencies.
pub fn build_image_downloader(deps: ImageDownloaderDeps) -> ImageDownloader {
    ImageDownloader::new(deps)
}

/// State shared between the downloader handle and its request task.
struct Shared {
    state: Mutex<DownloadState>,
    lease_counter: AtomicU64,
    transport: Arc<dyn TransportPort>,
    decoder: Arc<dyn ImageDecoderPort>,
    logger: Arc<dyn FetchLoggerPort>,
    runtime: Handle,
    default_timeout: Duration,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, DownloadState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Hand an event to the sink. A panicking sink never reaches the caller.
    fn emit(&self, event: FetchLogEvent) {
        let kind = event.kind;
        if catch_unwind(AssertUnwindSafe(|| self.logger.log(event))).is_err() {
            tracing::warn!(
                target: "pixfetch.download",
                kind = kind.as_str(),
                "Fetch logger panicked; event dropped"
            );
        }
    }

    fn begin(self: &Arc<Self>, request: FetchRequest, delivery: Delivery) {
        let FetchRequest { url, timeout } = request;
        let timeout = timeout.unwrap_or(self.default_timeout);

        let (superseded, rejected) = {
            let mut state = self.lock();
            let superseded = self.cancel_locked(&mut state);

            state.cancelled = false;
            self.emit(FetchLogEvent::request_sent(&url));

            if let Err(error) = parse_url(&url) {
                tracing::warn!(target: "pixfetch.download", url = %url, "Rejected invalid URL");
                state.phase = DownloadPhase::Failed;
                self.emit(FetchLogEvent::response_error(&url, None, error.clone()));
                (superseded, Some((delivery, error)))
            } else {
                let lease = LeaseId(self.lease_counter.fetch_add(1, Ordering::Relaxed));
                let cancel = CancellationToken::new();
                tracing::debug!(
                    target: "pixfetch.download",
                    url = %url,
                    lease = lease.0,
                    timeout = ?timeout,
                    "Starting request"
                );

                state.active = Some(ActiveRequest {
                    lease,
                    url: url.clone(),
                    cancel: cancel.clone(),
                    delivery,
                });
                state.phase = DownloadPhase::Requesting;

                self.runtime.spawn(task::run_request(
                    Arc::downgrade(self),
                    Arc::clone(&self.transport),
                    task::RequestJob {
                        lease,
                        url,
                        timeout,
                        cancel,
                    },
                ));
                (superseded, None)
            }
        };

        // Drop the superseded request's handlers outside the lock
        drop(superseded);
        if let Some((delivery, error)) = rejected {
            delivery.deliver(ResponseOutcome::failure(error, None));
        }
    }

    fn cancel(&self) {
        let cancelled = {
            let mut state = self.lock();
            self.cancel_locked(&mut state)
        };
        drop(cancelled);
    }

    /// Cancel the active request, if any. Returns its unused delivery.
    fn cancel_locked(&self, state: &mut DownloadState) -> Option<Delivery> {
        let active = state.active.take()?;

        state.cancelled = true;
        state.phase = DownloadPhase::Cancelled;
        active.cancel.cancel();

        tracing::debug!(
            target: "pixfetch.download",
            url = %active.url,
            lease = active.lease.0,
            "Request cancelled"
        );
        self.emit(FetchLogEvent::request_cancelled(active.url));

        Some(active.delivery)
    }

    /// Commit the result of a transport call made under `lease`.
    fn complete(&self, lease: LeaseId, result: Result<TransportReply, TransportError>) {
        if !self.lock().is_current(lease) {
            tracing::debug!(target: "pixfetch.download", lease = lease.0, "Ignoring stale completion");
            return;
        }

        let (status, outcome) = match result {
            Ok(reply) => {
                let status = reply.response.status_code;
                (Some(status), handle_reply(reply, self.decoder.as_ref()))
            }
            Err(err) => (None, ResponseOutcome::failure(err.into(), None)),
        };

        // Decoding ran unlocked; the request may have been cancelled meanwhile
        let delivery = {
            let mut state = self.lock();
            let Some(active) = state.take_if_current(lease) else {
                tracing::debug!(target: "pixfetch.download", lease = lease.0, "Discarding outcome of cancelled request");
                return;
            };

            match &outcome {
                ResponseOutcome::Success(image) => {
                    state.phase = DownloadPhase::Completed;
                    tracing::info!(
                        target: "pixfetch.download",
                        url = %active.url,
                        width = image.width(),
                        height = image.height(),
                        "Image downloaded"
                    );
                    self.emit(FetchLogEvent::response_success(
                        &active.url,
                        status.unwrap_or(200),
                    ));
                }
                ResponseOutcome::Failure { error, response } => {
                    state.phase = DownloadPhase::Failed;
                    tracing::warn!(
                        target: "pixfetch.download",
                        url = %active.url,
                        error = %error,
                        "Image download failed"
                    );
                    self.emit(FetchLogEvent::response_error(
                        &active.url,
                        response.as_ref().map(|r| r.status_code),
                        error.clone(),
                    ));
                }
            }
            active.delivery
        };

        delivery.deliver(outcome);
    }
}

fn parse_url(url: &str) -> Result<(), ImageFetchError> {
    url::Url::parse(url)
        .map(|_| ())
        .map_err(|_| ImageFetchError::invalid_url(url))
}

/// Coordinates one cancellable image download at a time.
///
/// Requests run on the Tokio runtime captured at construction, so
/// [`start`](Self::start) and [`fetch`](Self::fetch) may be called from any
/// thread. Dropping the downloader cancels the request in flight.
///
/// # Example
///
/// ```ignore
/// let downloader = build_image_downloader(ImageDownloaderDeps::from_settings(settings)?);
///
/// downloader.start(
///     "https://example.com/35px.jpg",
///     |image| println!("{}x{}", image.width(), image.height()),
///     |error, response| eprintln!("{error} ({:?})", response.map(|r| r.status_code)),
/// );
/// ```
pub struct ImageDownloader {
    shared: Arc<Shared>,
}

impl ImageDownloader {
    /// Create a downloader from its dependencies.
    ///
    /// # Panics
    ///
    /// Panics if `deps.runtime` is `None` and this is called outside a
    /// Tokio runtime.
    pub fn new(deps: ImageDownloaderDeps) -> Self {
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(DownloadState::default()),
                lease_counter: AtomicU64::new(1),
                transport: deps.transport,
                decoder: deps.decoder,
                logger: deps.logger,
                runtime: deps.runtime.unwrap_or_else(Handle::current),
                default_timeout: deps.settings.effective_request_timeout(),
            }),
        }
    }

    /// Start downloading, cancelling any request already in flight.
    ///
    /// Exactly one of `on_success` and `on_error` runs unless the request
    /// is cancelled, in which case neither does. Callbacks may call back
    /// into this downloader. They run on a runtime worker, except that an
    /// empty or unparsable URL is reported to `on_error` synchronously,
    /// before `start` returns.
    pub fn start<S, E>(&self, request: impl Into<FetchRequest>, on_success: S, on_error: E)
    where
        S: FnOnce(DecodedImage) + Send + 'static,
        E: FnOnce(ImageFetchError, Option<HttpResponse>) + Send + 'static,
    {
        self.shared.begin(
            request.into(),
            Delivery::Callbacks {
                on_success: Box::new(on_success),
                on_error: Box::new(on_error),
            },
        );
    }

    /// Start downloading and return a future for the outcome.
    ///
    /// The future resolves to `None` if the request is cancelled,
    /// superseded, or the downloader is dropped. Dropping the future does
    /// not cancel the request.
    pub fn fetch(&self, request: impl Into<FetchRequest>) -> PendingImage {
        let (tx, rx) = oneshot::channel();
        self.shared.begin(request.into(), Delivery::Channel(tx));
        PendingImage { rx }
    }

    /// Cancel the request in flight. No-op when idle.
    pub fn cancel(&self) {
        self.shared.cancel();
    }

    /// Current lifecycle phase.
    pub fn phase(&self) -> DownloadPhase {
        self.shared.lock().phase
    }

    /// Whether the last request was cancelled.
    pub fn is_cancelled(&self) -> bool {
        self.shared.lock().cancelled
    }

    /// URL of the request in flight.
    pub fn current_url(&self) -> Option<String> {
        self.shared.lock().active.as_ref().map(|a| a.url.clone())
    }

    /// Timeout used for requests that do not set their own.
    pub fn default_timeout(&self) -> Duration {
        self.shared.default_timeout
    }
}

impl Drop for ImageDownloader {
    fn drop(&mut self) {
        self.shared.cancel();
    }
}

impl fmt::Debug for ImageDownloader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.shared.lock();
        f.debug_struct("ImageDownloader")
            .field("phase", &state.phase)
            .field("cancelled", &state.cancelled)
            .field("url", &state.active.as_ref().map(|a| a.url.as_str()))
            .finish_non_exhaustive()
    }
}

/// Future returned by [`ImageDownloader::fetch`].
#[derive(Debug)]
#[must_use = "futures do nothing unless polled"]
pub struct PendingImage {
    rx: oneshot::Receiver<ResponseOutcome>,
}

impl Future for PendingImage {
    type Output = Option<ResponseOutcome>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.rx).poll(cx).map(Result::ok)
    }
}
