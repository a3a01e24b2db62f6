//! Core value types for a single image fetch.

use std::time::Duration;

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use super::errors::ImageFetchError;

/// Metadata of a received HTTP response.
///
/// Attached to every classified error that was produced after a response
/// arrived, so callers can inspect status and headers when deciding how
/// to recover.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HttpResponse {
    /// The URL the response was received from.
    pub url: String,
    /// HTTP status code.
    pub status_code: u16,
    /// Response headers in arrival order. Names keep their original case.
    headers: Vec<(String, String)>,
}

impl HttpResponse {
    /// Create a response with no headers.
    pub fn new(url: impl Into<String>, status_code: u16) -> Self {
        Self {
            url: url.into(),
            status_code,
            headers: Vec::new(),
        }
    }

    /// Append a header.
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Look up the first header with this name (case-insensitive).
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// Iterate over all headers.
    pub fn headers(&self) -> impl Iterator<Item = (&str, &str)> {
        self.headers.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// The `Content-Type` header value, if present.
    pub fn content_type(&self) -> Option<&str> {
        self.header("content-type")
    }

    /// Whether the status code is exactly 200.
    pub const fn is_ok(&self) -> bool {
        self.status_code == 200
    }
}

/// Raw result of one successful transport call: response metadata plus body.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransportReply {
    /// Response metadata.
    pub response: HttpResponse,
    /// Response body bytes.
    pub body: Bytes,
}

impl TransportReply {
    /// Create a new reply.
    pub fn new(response: HttpResponse, body: impl Into<Bytes>) -> Self {
        Self {
            response,
            body: body.into(),
        }
    }
}

/// A decoded raster image.
///
/// Pixels are stored as tightly packed 8-bit RGBA rows.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DecodedImage {
    width: u32,
    height: u32,
    pixels: Bytes,
}

impl DecodedImage {
    /// Create a decoded image from RGBA8 pixel data.
    pub fn new(width: u32, height: u32, pixels: impl Into<Bytes>) -> Self {
        Self {
            width,
            height,
            pixels: pixels.into(),
        }
    }

    /// Width in pixels.
    pub const fn width(&self) -> u32 {
        self.width
    }

    /// Height in pixels.
    pub const fn height(&self) -> u32 {
        self.height
    }

    /// `(width, height)` in pixels.
    pub const fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// RGBA8 pixel data.
    pub const fn pixels(&self) -> &Bytes {
        &self.pixels
    }
}

/// A request to download one image.
///
/// Converts from `&str` and `String`, so most callers pass a URL directly.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FetchRequest {
    /// The image URL.
    pub url: String,
    /// Per-request timeout. `None` uses the coordinator's configured default.
    pub timeout: Option<Duration>,
}

impl FetchRequest {
    /// Create a request using the default timeout.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            timeout: None,
        }
    }

    /// Override the timeout for this request only.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

impl From<&str> for FetchRequest {
    fn from(url: &str) -> Self {
        Self::new(url)
    }
}

impl From<String> for FetchRequest {
    fn from(url: String) -> Self {
        Self::new(url)
    }
}

/// The single outcome of a request that was not cancelled.
///
/// The success path never carries the response: callers receive the image
/// only.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ResponseOutcome {
    /// The image was downloaded, validated and decoded.
    Success(DecodedImage),
    /// The request failed; `response` is present when one was received.
    Failure {
        /// Classified error.
        error: ImageFetchError,
        /// Response metadata when the failure happened after a response arrived.
        response: Option<HttpResponse>,
    },
}

impl ResponseOutcome {
    /// Create a failure outcome.
    pub const fn failure(error: ImageFetchError, response: Option<HttpResponse>) -> Self {
        Self::Failure { error, response }
    }

    /// Whether this is a success.
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    /// The decoded image, if successful.
    pub const fn image(&self) -> Option<&DecodedImage> {
        match self {
            Self::Success(image) => Some(image),
            Self::Failure { .. } => None,
        }
    }

    /// The error, if failed.
    pub const fn error(&self) -> Option<&ImageFetchError> {
        match self {
            Self::Success(_) => None,
            Self::Failure { error, .. } => Some(error),
        }
    }

    /// Convert into a `Result`, dropping the attached response.
    pub fn into_result(self) -> Result<DecodedImage, ImageFetchError> {
        match self {
            Self::Success(image) => Ok(image),
            Self::Failure { error, .. } => Err(error),
        }
    }
}
