//! Image fetch domain types, events, errors, and response validation.
//!
//! This module contains pure data types and decision functions for the
//! download lifecycle. No I/O, networking, or runtime dependencies allowed.
//!
//! # Structure
//!
//! - `types` - HTTP response metadata, request values, decoded images, outcomes
//! - `errors` - Transport errors and the classified image-fetch taxonomy
//! - `events` - Lifecycle log events (`FetchLogEvent`, `FetchLogKind`)
//! - `validation` - Status / content-type checks run before decoding

pub mod errors;
pub mod events;
pub mod types;
pub mod validation;

// Re-export commonly used types
pub use errors::{FetchErrorKind, FetchResult, ImageFetchError, TransportError};
pub use events::{FetchLogEvent, FetchLogKind};
pub use types::{DecodedImage, FetchRequest, HttpResponse, ResponseOutcome, TransportReply};
pub use validation::{is_image_content_type, validate_response};
