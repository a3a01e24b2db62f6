//! Scripted transport for tests.
//!
//! [`SimulatedTransport`] parks every matching `fetch` until the test answers
//! it, which makes completion/cancellation races reproducible.
//!
//! ```ignore
//! let transport = SimulatedTransport::new();
//! let simulation = transport.simulate("35px.jpg");
//!
//! downloader.start("http://example.com/35px.jpg", on_success, on_error);
//! simulation.wait_for_requests(1).await;
//! simulation.respond_with_image(jpeg_bytes, "image/jpeg");
//! ```

use std::pin::pin;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::{Notify, oneshot};

use crate::fetch::{HttpResponse, TransportError, TransportReply};
use crate::ports::TransportPort;

type Reply = Result<TransportReply, TransportError>;

struct PendingFetch {
    url: String,
    pattern: String,
    responder: oneshot::Sender<Reply>,
}

#[derive(Default)]
struct SimulatorState {
    /// Registered URL fragments, in registration order.
    patterns: Vec<String>,
    /// Every URL that reached the transport, with the pattern it matched.
    requests: Vec<(String, String)>,
    /// Timeouts passed to `fetch`, in call order.
    timeouts: Vec<Duration>,
    pending: Vec<PendingFetch>,
}

/// A transport whose replies are supplied by the test.
///
/// Fetches for URLs that match no registered pattern fail immediately with
/// [`TransportError::Other`].
#[derive(Clone, Default)]
pub struct SimulatedTransport {
    state: Arc<Mutex<SimulatorState>>,
    notify: Arc<Notify>,
}

impl SimulatedTransport {
    /// Create a transport with no registered patterns.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Intercept fetches whose URL contains `url_part`.
    pub fn simulate(&self, url_part: impl Into<String>) -> Simulation {
        let pattern = url_part.into();
        self.lock().patterns.push(pattern.clone());
        Simulation {
            pattern,
            transport: self.clone(),
        }
    }

    /// Timeouts passed to `fetch`, in call order.
    pub fn timeouts(&self) -> Vec<Duration> {
        self.lock().timeouts.clone()
    }

    /// Total number of fetches that reached the transport.
    pub fn request_count(&self) -> usize {
        self.lock().requests.len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, SimulatorState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl TransportPort for SimulatedTransport {
    async fn fetch(&self, url: &str, timeout: Duration) -> Reply {
        let rx = {
            let mut state = self.lock();
            state.timeouts.push(timeout);

            let Some(pattern) = state
                .patterns
                .iter()
                .find(|pattern| url.contains(pattern.as_str()))
                .cloned()
            else {
                return Err(TransportError::other(format!(
                    "no simulation registered for {url}"
                )));
            };

            let (tx, rx) = oneshot::channel();
            state.requests.push((url.to_string(), pattern.clone()));
            state.pending.push(PendingFetch {
                url: url.to_string(),
                pattern,
                responder: tx,
            });
            rx
        };
        self.notify.notify_waiters();

        // A dropped responder means the simulation was discarded
        rx.await.unwrap_or(Err(TransportError::Cancelled))
    }
}

/// Handle for one registered URL fragment.
pub struct Simulation {
    pattern: String,
    transport: SimulatedTransport,
}

impl Simulation {
    /// URLs of every fetch that matched this simulation.
    pub fn requested_urls(&self) -> Vec<String> {
        self.transport
            .lock()
            .requests
            .iter()
            .filter(|(_, pattern)| *pattern == self.pattern)
            .map(|(url, _)| url.clone())
            .collect()
    }

    /// Fetches still waiting for a reply whose caller is still listening.
    pub fn pending_count(&self) -> usize {
        self.transport
            .lock()
            .pending
            .iter()
            .filter(|p| p.pattern == self.pattern && !p.responder.is_closed())
            .count()
    }

    /// Fetches whose caller dropped the future before a reply was sent.
    pub fn cancelled_count(&self) -> usize {
        self.transport
            .lock()
            .pending
            .iter()
            .filter(|p| p.pattern == self.pattern && p.responder.is_closed())
            .count()
    }

    /// Wait until at least `count` fetches matched this simulation.
    pub async fn wait_for_requests(&self, count: usize) {
        loop {
            let mut notified = pin!(self.transport.notify.notified());
            notified.as_mut().enable();
            if self.requested_urls().len() >= count {
                return;
            }
            notified.await;
        }
    }

    /// Answer every pending fetch with `reply`. Returns how many callers received it.
    pub fn respond_with(&self, reply: &Reply) -> usize {
        let pending: Vec<PendingFetch> = {
            let mut state = self.transport.lock();
            let (matching, rest): (Vec<_>, Vec<_>) = std::mem::take(&mut state.pending)
                .into_iter()
                .partition(|p| p.pattern == self.pattern);
            state.pending = rest;
            matching
        };

        pending
            .into_iter()
            .filter_map(|p| {
                let reply = reply.clone().map(|mut r| {
                    r.response.url.clone_from(&p.url);
                    r
                });
                p.responder.send(reply).ok()
            })
            .count()
    }

    /// Answer with a 200 response carrying `body` and the given content type.
    pub fn respond_with_image(&self, body: impl Into<Bytes>, content_type: &str) -> usize {
        let response = HttpResponse::new("", 200).with_header("Content-Type", content_type);
        self.respond_with(&Ok(TransportReply::new(response, body)))
    }

    /// Answer with an arbitrary response.
    pub fn respond_with_response(&self, response: HttpResponse, body: impl Into<Bytes>) -> usize {
        self.respond_with(&Ok(TransportReply::new(response, body)))
    }

    /// Answer with a bodyless response of the given status.
    pub fn respond_with_status(&self, status_code: u16) -> usize {
        self.respond_with(&Ok(TransportReply::new(
            HttpResponse::new("", status_code).with_header("Content-Type", "text/plain"),
            Bytes::from_static(b"error"),
        )))
    }

    /// Fail every pending fetch with a transport error.
    pub fn respond_with_error(&self, error: TransportError) -> usize {
        self.respond_with(&Err(error))
    }
}
