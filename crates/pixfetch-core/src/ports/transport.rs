//! Transport port definition.
//!
//! The transport performs exactly one HTTP GET per call and reports either
//! the raw response (any status code) or a transport-level failure.

use std::time::Duration;

use async_trait::async_trait;

use crate::fetch::{TransportError, TransportReply};

/// Port for issuing HTTP GET requests.
///
/// # Cancellation
///
/// Dropping the future returned by [`fetch`](TransportPort::fetch) cancels
/// the request. Implementations must release the underlying connection when
/// that happens and must not invoke anything afterwards.
///
/// # Status codes
///
/// Non-2xx responses are *not* transport errors. They are returned as a
/// [`TransportReply`] so the response validator can classify them.
#[async_trait]
pub trait TransportPort: Send + Sync {
    /// Fetch `url`, failing with [`TransportError::TimedOut`] after `timeout`.
    async fn fetch(&self, url: &str, timeout: Duration)
    -> Result<TransportReply, TransportError>;
}
