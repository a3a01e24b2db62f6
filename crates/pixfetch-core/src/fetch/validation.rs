//! Response validation run before any decode attempt.
//!
//! Order matters: status is checked before headers, and header presence is
//! checked before header value.

use super::errors::ImageFetchError;
use super::types::HttpResponse;

/// Decide whether a response may be handed to the image decoder.
///
/// # Examples
///
/// ```rust
/// use pixfetch_core::{HttpResponse, ImageFetchError, validate_response};
///
/// let ok = HttpResponse::new("http://a/b.png", 200).with_header("Content-Type", "image/png");
/// assert!(validate_response(&ok).is_ok());
///
/// let missing = HttpResponse::new("http://a/b.png", 200);
/// assert_eq!(
///     validate_response(&missing),
///     Err(ImageFetchError::MissingContentTypeHeader)
/// );
/// ```
pub fn validate_response(response: &HttpResponse) -> Result<(), ImageFetchError> {
    if !response.is_ok() {
        return Err(ImageFetchError::http_status(response.status_code));
    }

    let Some(content_type) = response.content_type() else {
        return Err(ImageFetchError::MissingContentTypeHeader);
    };

    if !is_image_content_type(content_type) {
        return Err(ImageFetchError::not_an_image(content_type));
    }

    Ok(())
}

/// Whether a `Content-Type` value denotes an image media type.
///
/// Parameters after `;` are ignored and the comparison is case-insensitive.
pub fn is_image_content_type(content_type: &str) -> bool {
    let media_type = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim();

    media_type
        .get(..6)
        .is_some_and(|prefix| prefix.eq_ignore_ascii_case("image/"))
        && media_type.len() > 6
}
