//! Fetch settings and validation.
//!
//! Settings are plain values threaded into the transport and the
//! coordinator at construction. There is no process-wide mutable default.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default request timeout (30 seconds).
pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 30_000;

/// Default `User-Agent` header.
pub const DEFAULT_USER_AGENT: &str = concat!("pixfetch/", env!("CARGO_PKG_VERSION"));

/// Settings shared by the transport and the download coordinator.
///
/// All fields are optional to support partial configuration files and
/// graceful defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct FetchSettings {
    /// Request timeout in milliseconds.
    pub request_timeout_ms: Option<u64>,

    /// `User-Agent` header sent with every request.
    pub user_agent: Option<String>,
}

impl FetchSettings {
    /// Create settings with all defaults spelled out.
    #[must_use]
    pub fn with_defaults() -> Self {
        Self {
            request_timeout_ms: Some(DEFAULT_REQUEST_TIMEOUT_MS),
            user_agent: Some(DEFAULT_USER_AGENT.to_string()),
        }
    }

    /// Set the request timeout.
    #[must_use]
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout_ms = Some(u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX));
        self
    }

    /// Set the user agent.
    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    /// Get the effective request timeout (with default fallback).
    #[must_use]
    pub fn effective_request_timeout(&self) -> Duration {
        Duration::from_millis(
            self.request_timeout_ms
                .unwrap_or(DEFAULT_REQUEST_TIMEOUT_MS),
        )
    }

    /// Get the effective user agent (with default fallback).
    #[must_use]
    pub fn effective_user_agent(&self) -> &str {
        self.user_agent.as_deref().unwrap_or(DEFAULT_USER_AGENT)
    }
}

/// Errors that can occur during settings validation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SettingsError {
    /// Request timeout must be greater than zero.
    #[error("Request timeout must be greater than zero")]
    ZeroTimeout,

    /// User agent must not be blank.
    #[error("User agent must not be empty")]
    EmptyUserAgent,
}

/// Validate fetch settings.
pub fn validate_fetch_settings(settings: &FetchSettings) -> Result<(), SettingsError> {
    if settings.request_timeout_ms == Some(0) {
        return Err(SettingsError::ZeroTimeout);
    }

    if settings
        .user_agent
        .as_ref()
        .is_some_and(|agent| agent.trim().is_empty())
    {
        return Err(SettingsError::EmptyUserAgent);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings() {
        let settings = FetchSettings::default();
        assert_eq!(
            settings.effective_request_timeout(),
            Duration::from_secs(30)
        );
        assert!(settings.effective_user_agent().starts_with("pixfetch/"));
        assert_eq!(validate_fetch_settings(&settings), Ok(()));
        assert_eq!(
            FetchSettings::with_defaults().effective_request_timeout(),
            settings.effective_request_timeout()
        );
    }

    #[test]
    fn test_builder_overrides() {
        let settings = FetchSettings::default()
            .with_request_timeout(Duration::from_millis(100))
            .with_user_agent("test-agent");

        assert_eq!(settings.request_timeout_ms, Some(100));
        assert_eq!(settings.effective_user_agent(), "test-agent");
    }

    #[test]
    fn test_validation_rejects_zero_timeout() {
        let settings = FetchSettings {
            request_timeout_ms: Some(0),
            ..Default::default()
        };
        assert_eq!(
            validate_fetch_settings(&settings),
            Err(SettingsError::ZeroTimeout)
        );
    }

    #[test]
    fn test_validation_rejects_blank_user_agent() {
        let settings = FetchSettings::default().with_user_agent("   ");
        assert_eq!(
            validate_fetch_settings(&settings),
            Err(SettingsError::EmptyUserAgent)
        );
    }

    #[test]
    fn test_partial_json() {
        let settings: FetchSettings =
            serde_json::from_str(r#"{"request_timeout_ms": 1500}"#).unwrap();
        assert_eq!(
            settings.effective_request_timeout(),
            Duration::from_millis(1500)
        );
        assert!(settings.user_agent.is_none());
    }
}
