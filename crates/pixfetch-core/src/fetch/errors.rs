//! Image fetch error types.
//!
//! Two layers: [`TransportError`] is what the network layer reports (DNS,
//! connect, timeout), [`ImageFetchError`] is the classified taxonomy delivered
//! to callers. Transport errors are wrapped unmodified.
//!
//! Both are serializable and `Clone` so they can travel inside log events.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failure reported by the transport layer before any HTTP response arrived.
///
/// Codes follow the URL-loading convention (negative numbers) so they never
/// collide with [`ImageFetchError::code`].
#[derive(Clone, Debug, Error, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TransportError {
    /// The request did not complete within the configured timeout.
    #[error("The request timed out.")]
    TimedOut,

    /// The host name could not be resolved.
    #[error("A server with the specified hostname could not be found: {message}")]
    CannotFindHost {
        /// Detailed error message.
        message: String,
    },

    /// A connection to the host could not be established.
    #[error("Could not connect to the server: {message}")]
    CannotConnect {
        /// Detailed error message.
        message: String,
    },

    /// No network connection is available.
    #[error("The Internet connection appears to be offline.")]
    NotConnected,

    /// The transport call was cancelled.
    #[error("The request was cancelled.")]
    Cancelled,

    /// Any other transport failure.
    #[error("Transport error: {message}")]
    Other {
        /// Detailed error message.
        message: String,
    },
}

impl TransportError {
    /// Create a host-resolution error.
    pub fn cannot_find_host(message: impl Into<String>) -> Self {
        Self::CannotFindHost {
            message: message.into(),
        }
    }

    /// Create a connection error.
    pub fn cannot_connect(message: impl Into<String>) -> Self {
        Self::CannotConnect {
            message: message.into(),
        }
    }

    /// Create a generic transport error.
    pub fn other(message: impl Into<String>) -> Self {
        Self::Other {
            message: message.into(),
        }
    }

    /// Stable numeric code for this error.
    #[must_use]
    pub const fn code(&self) -> i32 {
        match self {
            Self::TimedOut => -1001,
            Self::CannotFindHost { .. } => -1003,
            Self::CannotConnect { .. } => -1004,
            Self::NotConnected => -1009,
            Self::Cancelled => -999,
            Self::Other { .. } => -1,
        }
    }

    /// Check if this is a timeout.
    #[must_use]
    pub const fn is_timeout(&self) -> bool {
        matches!(self, Self::TimedOut)
    }
}

/// Discriminant of [`ImageFetchError`] without payload.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FetchErrorKind {
    /// URL was empty or could not be parsed.
    InvalidUrl,
    /// Network, DNS or timeout failure.
    Transport,
    /// Status code other than 200.
    HttpStatusNot200,
    /// 200 response without a `Content-Type` header.
    MissingContentTypeHeader,
    /// `Content-Type` present but not an image type.
    NotAnImageContentType,
    /// Body could not be decoded as an image.
    FailedToDecodeImageData,
}

/// Classified error delivered to the caller's error handler.
///
/// All kinds are terminal: the coordinator never retries. Cancellation is not
/// an error kind; a cancelled request simply produces no callback.
#[derive(Clone, Debug, Error, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ImageFetchError {
    /// The URL was empty or could not be parsed.
    #[error("Invalid URL: '{url}'")]
    InvalidUrl {
        /// The rejected URL string.
        url: String,
    },

    /// The response status code was not 200.
    #[error("Response HTTP status code is not 200.")]
    HttpStatusNot200 {
        /// The status code that was received.
        status: u16,
    },

    /// A 200 response had no `Content-Type` header.
    #[error("Response is missing the Content-Type HTTP header.")]
    MissingContentTypeHeader,

    /// The `Content-Type` header does not denote an image.
    #[error("Response Content-Type '{content_type}' is not an image type.")]
    NotAnImageContentType {
        /// The content type that was received.
        content_type: String,
    },

    /// The response body is not a decodable image.
    #[error("Failed to read image data: {reason}")]
    FailedToDecodeImageData {
        /// Decoder error message.
        reason: String,
    },

    /// The transport layer failed; the original error is passed through.
    #[error(transparent)]
    Transport {
        /// The unmodified transport error.
        #[from]
        source: TransportError,
    },
}

impl ImageFetchError {
    /// Create an invalid URL error.
    pub fn invalid_url(url: impl Into<String>) -> Self {
        Self::InvalidUrl { url: url.into() }
    }

    /// Create a status code error.
    #[must_use]
    pub const fn http_status(status: u16) -> Self {
        Self::HttpStatusNot200 { status }
    }

    /// Create a wrong content type error.
    pub fn not_an_image(content_type: impl Into<String>) -> Self {
        Self::NotAnImageContentType {
            content_type: content_type.into(),
        }
    }

    /// Create a decode failure error.
    pub fn decode_failed(reason: impl Into<String>) -> Self {
        Self::FailedToDecodeImageData {
            reason: reason.into(),
        }
    }

    /// The kind of this error.
    #[must_use]
    pub const fn kind(&self) -> FetchErrorKind {
        match self {
            Self::InvalidUrl { .. } => FetchErrorKind::InvalidUrl,
            Self::HttpStatusNot200 { .. } => FetchErrorKind::HttpStatusNot200,
            Self::MissingContentTypeHeader => FetchErrorKind::MissingContentTypeHeader,
            Self::NotAnImageContentType { .. } => FetchErrorKind::NotAnImageContentType,
            Self::FailedToDecodeImageData { .. } => FetchErrorKind::FailedToDecodeImageData,
            Self::Transport { .. } => FetchErrorKind::Transport,
        }
    }

    /// Stable numeric code. Transport errors report their own code.
    #[must_use]
    pub const fn code(&self) -> i32 {
        match self {
            Self::InvalidUrl { .. } => 0,
            Self::HttpStatusNot200 { .. } => 1,
            Self::MissingContentTypeHeader => 2,
            Self::NotAnImageContentType { .. } => 3,
            Self::FailedToDecodeImageData { .. } => 4,
            Self::Transport { source } => source.code(),
        }
    }

    /// The wrapped transport error, if this is one.
    #[must_use]
    pub const fn transport_error(&self) -> Option<&TransportError> {
        match self {
            Self::Transport { source } => Some(source),
            _ => None,
        }
    }

    /// Whether this error was classified from an HTTP response
    /// (as opposed to a transport failure or a bad URL).
    #[must_use]
    pub const fn has_response(&self) -> bool {
        !matches!(self, Self::InvalidUrl { .. } | Self::Transport { .. })
    }
}

/// Convenience result type for image fetch operations.
pub type FetchResult<T> = Result<T, ImageFetchError>;
