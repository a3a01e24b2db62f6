//! Core domain types and port definitions for pixfetch.
//!
//! This crate holds everything the image download coordinator reasons about
//! without touching the network: the classified error taxonomy, the lifecycle
//! log-event model, the HTTP response validator, and the trait ports through
//! which the transport, the image decoder and the lifecycle logger are
//! injected.
//!
//! Adapters live in sibling crates: `pixfetch-http` implements
//! [`TransportPort`] over reqwest, `pixfetch-download` owns the coordinator.

#![deny(unused_crate_dependencies)]

pub mod fetch;
pub mod ports;
pub mod settings;

#[cfg(any(test, feature = "test-utils"))]
pub mod testing;

// Re-export commonly used types for convenience
pub use fetch::{
    DecodedImage, FetchErrorKind, FetchLogEvent, FetchLogKind, FetchRequest, FetchResult,
    HttpResponse, ImageFetchError, ResponseOutcome, TransportError, TransportReply,
    is_image_content_type, validate_response,
};
pub use ports::{
    ChannelFetchLogger, DecodeError, FetchLoggerPort, ImageDecoderPort, NoopFetchLogger,
    TracingFetchLogger, TransportPort,
};
pub use settings::{
    DEFAULT_REQUEST_TIMEOUT_MS, DEFAULT_USER_AGENT, FetchSettings, SettingsError,
    validate_fetch_settings,
};

// Silence unused dev-dependency warnings for crates only used by some test modules
#[cfg(test)]
use mockall as _;
#[cfg(test)]
use tokio_test as _;
