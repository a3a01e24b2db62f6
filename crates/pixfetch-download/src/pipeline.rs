//! Validate-then-decode handling of a received response.
//!
//! This is the synchronous half of a request: once the transport has
//! produced a reply, the status and headers are checked and only an
//! accepted response reaches the decoder.

use pixfetch_core::{ImageDecoderPort, ResponseOutcome, TransportReply, validate_response};

/// Turn a transport reply into the single outcome of a request.
///
/// Every failure carries the response. A success carries the image only.
///
/// # Example
///
/// ```
/// use pixfetch_core::{FetchErrorKind, HttpResponse, TransportReply};
/// use pixfetch_download::{ImageCrateDecoder, pipeline::handle_reply};
///
/// let reply = TransportReply::new(HttpResponse::new("http://example.com/a.png", 404), "");
/// let outcome = handle_reply(reply, &ImageCrateDecoder::new());
///
/// assert_eq!(outcome.error().map(|e| e.kind()), Some(FetchErrorKind::HttpStatusNot200));
/// ```
pub fn handle_reply(reply: TransportReply, decoder: &dyn ImageDecoderPort) -> ResponseOutcome {
    let TransportReply { response, body } = reply;

    if let Err(error) = validate_response(&response) {
        return ResponseOutcome::failure(error, Some(response));
    }

    match decoder.decode(&body, response.content_type()) {
        Ok(image) => ResponseOutcome::Success(image),
        Err(err) => ResponseOutcome::failure(err.into(), Some(response)),
    }
}
