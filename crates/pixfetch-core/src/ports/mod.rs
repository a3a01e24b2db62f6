//! Port definitions (trait abstractions) for external collaborators.
//!
//! Ports define the interfaces that the download coordinator expects from
//! infrastructure. They contain no implementation details and use only
//! domain types.
//!
//! # Design Rules
//!
//! - No reqwest or image-codec types in any signature
//! - Transport cancellation is expressed by dropping the fetch future
//! - Logger sinks never block and never fail visibly

pub mod fetch_logger;
pub mod image_decoder;
pub mod transport;

pub use fetch_logger::{ChannelFetchLogger, FetchLoggerPort, NoopFetchLogger, TracingFetchLogger};
pub use image_decoder::{DecodeError, ImageDecoderPort};
pub use transport::TransportPort;
