//! Lifecycle log events emitted by the download coordinator.
//!
//! Every request produces exactly one `RequestSent` followed by exactly one
//! terminal event (`ResponseSuccess`, `ResponseError` or `RequestCancelled`).

use serde::{Deserialize, Serialize};

use super::errors::ImageFetchError;

/// Kind of lifecycle event.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FetchLogKind {
    /// A request was issued.
    RequestSent,
    /// An image was delivered to the success handler.
    ResponseSuccess,
    /// An error was delivered to the error handler.
    ResponseError,
    /// The request was cancelled explicitly, superseded, or torn down.
    RequestCancelled,
}

impl FetchLogKind {
    /// Whether this kind ends a request lifecycle.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        !matches!(self, Self::RequestSent)
    }

    /// String representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::RequestSent => "request_sent",
            Self::ResponseSuccess => "response_success",
            Self::ResponseError => "response_error",
            Self::RequestCancelled => "request_cancelled",
        }
    }
}

/// A single lifecycle event.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchLogEvent {
    /// What happened.
    pub kind: FetchLogKind,
    /// The request URL.
    pub url: String,
    /// HTTP status code, when a response was received.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_code: Option<u16>,
    /// The delivered error, for `ResponseError`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ImageFetchError>,
}

impl FetchLogEvent {
    /// Create a request sent event.
    pub fn request_sent(url: impl Into<String>) -> Self {
        Self {
            kind: FetchLogKind::RequestSent,
            url: url.into(),
            status_code: None,
            error: None,
        }
    }

    /// Create a success event.
    pub fn response_success(url: impl Into<String>, status_code: u16) -> Self {
        Self {
            kind: FetchLogKind::ResponseSuccess,
            url: url.into(),
            status_code: Some(status_code),
            error: None,
        }
    }

    /// Create an error event.
    pub fn response_error(
        url: impl Into<String>,
        status_code: Option<u16>,
        error: ImageFetchError,
    ) -> Self {
        Self {
            kind: FetchLogKind::ResponseError,
            url: url.into(),
            status_code,
            error: Some(error),
        }
    }

    /// Create a cancellation event.
    pub fn request_cancelled(url: impl Into<String>) -> Self {
        Self {
            kind: FetchLogKind::RequestCancelled,
            url: url.into(),
            status_code: None,
            error: None,
        }
    }

    /// Render a one-line, human-readable description.
    #[must_use]
    pub fn message(&self) -> String {
        match (self.kind, self.status_code, &self.error) {
            (FetchLogKind::RequestSent, _, _) => format!("GET {}", self.url),
            (FetchLogKind::ResponseSuccess, Some(code), _) => {
                format!("Received {code} from {}", self.url)
            }
            (FetchLogKind::ResponseSuccess, None, _) => format!("Received {}", self.url),
            (FetchLogKind::ResponseError, Some(code), Some(err)) => {
                format!("Error {code} from {}: {err}", self.url)
            }
            (FetchLogKind::ResponseError, None, Some(err)) => {
                format!("Error from {}: {err}", self.url)
            }
            (FetchLogKind::ResponseError, _, None) => format!("Error from {}", self.url),
            (FetchLogKind::RequestCancelled, _, _) => format!("Cancelled {}", self.url),
        }
    }
}
