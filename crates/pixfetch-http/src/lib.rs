//! reqwest-backed transport for pixfetch.
//!
//! Provides [`ReqwestTransport`], the production implementation of
//! [`pixfetch_core::TransportPort`]. It performs one GET per call, returns
//! every response regardless of status, and maps reqwest failures onto
//! [`pixfetch_core::TransportError`].

#![deny(unsafe_code)]
#![deny(unused_crate_dependencies)]

mod error;
mod transport;

// ============================================================================
// Public API
// ============================================================================

pub use error::HttpAdapterError;
pub use transport::ReqwestTransport;

// Silence unused dev-dependency warnings (used by integration tests only)
#[cfg(test)]
use axum as _;
#[cfg(test)]
use tokio as _;
