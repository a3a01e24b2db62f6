//! Error types for the reqwest adapter.
//!
//! Construction errors are local to this crate. Request errors are mapped to
//! the core [`TransportError`] at the port boundary.

use std::error::Error as StdError;

use pixfetch_core::{SettingsError, TransportError};
use thiserror::Error;

/// Errors raised while building a [`ReqwestTransport`](crate::ReqwestTransport).
#[derive(Debug, Error)]
pub enum HttpAdapterError {
    /// The supplied settings failed validation.
    #[error("Invalid fetch settings: {0}")]
    InvalidSettings(#[from] SettingsError),

    /// The underlying HTTP client could not be built.
    #[error("Failed to build HTTP client: {0}")]
    ClientBuild(#[from] reqwest::Error),
}

/// Map a reqwest failure onto the transport taxonomy.
pub(crate) fn map_reqwest_error(err: &reqwest::Error) -> TransportError {
    if err.is_timeout() {
        return TransportError::TimedOut;
    }

    let detail = error_chain(err);
    if err.is_connect() {
        return classify_connect_failure(detail);
    }

    TransportError::other(detail)
}

/// Classify a failed connection attempt from its rendered error chain.
fn classify_connect_failure(detail: String) -> TransportError {
    if is_offline_failure(&detail) {
        TransportError::NotConnected
    } else if is_dns_failure(&detail) {
        TransportError::cannot_find_host(detail)
    } else {
        TransportError::cannot_connect(detail)
    }
}

/// Render an error and all of its sources on one line.
fn error_chain(err: &(dyn StdError + 'static)) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

/// No route to any network (`ENETUNREACH` / `WSAENETUNREACH`).
fn is_offline_failure(detail: &str) -> bool {
    let lower = detail.to_ascii_lowercase();
    lower.contains("network is unreachable")
        || lower.contains("os error 101)")
        || lower.contains("os error 10051)")
}

fn is_dns_failure(detail: &str) -> bool {
    let lower = detail.to_ascii_lowercase();
    lower.contains("dns error")
        || lower.contains("failed to lookup address")
        || lower.contains("name or service not known")
        || lower.contains("no such host")
}
