//! The spawned half of a request.
//!
//! Runs the transport call and hands the result back to the coordinator.
//! Cancellation is handled via `tokio::select!` around the transport future,
//! so a cancelled request drops its in-flight HTTP call.

use std::sync::{Arc, Weak};
use std::time::Duration;

use pixfetch_core::TransportPort;
use tokio_util::sync::CancellationToken;

use super::{LeaseId, Shared};

/// Everything a request task needs besides its ports.
pub(super) struct RequestJob {
    pub lease: LeaseId,
    pub url: String,
    pub timeout: Duration,
    pub cancel: CancellationToken,
}

/// Fetch `job.url` and commit the result if the downloader still wants it.
pub(super) async fn run_request(
    shared: Weak<Shared>,
    transport: Arc<dyn TransportPort>,
    job: RequestJob,
) {
    let result = tokio::select! {
        biased;

        () = job.cancel.cancelled() => {
            tracing::debug!(
                target: "pixfetch.download",
                url = %job.url,
                lease = job.lease.0,
                "Transport call abandoned"
            );
            return;
        }

        result = transport.fetch(&job.url, job.timeout) => result,
    };

    // The downloader may have been dropped while the call was running
    let Some(shared) = shared.upgrade() else {
        return;
    };
    shared.complete(job.lease, result);
}
