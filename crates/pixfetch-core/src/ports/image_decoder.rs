//! Image decoder port definition.

use thiserror::Error;

use crate::fetch::{DecodedImage, ImageFetchError};

/// Error returned when bytes do not parse as an image.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{message}")]
pub struct DecodeError {
    /// Decoder-specific description.
    pub message: String,
}

impl DecodeError {
    /// Create a new decode error.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl From<DecodeError> for ImageFetchError {
    fn from(err: DecodeError) -> Self {
        Self::decode_failed(err.message)
    }
}

/// Port for turning validated response bytes into an image.
///
/// Invoked synchronously, only after the response passed validation.
/// `content_type` is the response's declared type and may be used as a
/// format hint.
pub trait ImageDecoderPort: Send + Sync {
    /// Decode `bytes` into an image.
    fn decode(&self, bytes: &[u8], content_type: Option<&str>)
    -> Result<DecodedImage, DecodeError>;
}
