//! Image download coordinator for pixfetch.
//!
//! [`ImageDownloader`] runs one cancellable request at a time: it fetches a
//! URL through a [`TransportPort`], validates the response, decodes the body
//! and delivers exactly one outcome, or nothing when the request was
//! cancelled or superseded. Every transition is reported to an injected
//! [`FetchLoggerPort`].
//!
//! # Modules
//!
//! - `downloader` - the coordinator, its dependencies and the outcome future
//! - [`pipeline`] - validate-then-decode handling of a received response
//! - `decoder` - the `image` crate decoder adapter
//! - `loader` - url-property facade with reusable handlers

#![deny(unused_crate_dependencies)]

mod decoder;
mod downloader;
mod loader;
pub mod pipeline;

// Re-export core types for convenience
pub use pixfetch_core::{
    DecodedImage, FetchErrorKind, FetchLogEvent, FetchLogKind, FetchLoggerPort, FetchRequest,
    FetchSettings, HttpResponse, ImageDecoderPort, ImageFetchError, ResponseOutcome,
    TransportError, TransportPort,
};

pub use decoder::ImageCrateDecoder;
pub use downloader::{
    DownloadPhase, ImageDownloader, ImageDownloaderDeps, PendingImage, build_image_downloader,
};
pub use loader::ImageLoader;

// Silence unused dev-dependency warnings (used by integration tests only)
#[cfg(test)]
use mockall as _;
