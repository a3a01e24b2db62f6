//! reqwest implementation of the transport port.

use std::time::Duration;

use async_trait::async_trait;
use pixfetch_core::{
    FetchSettings, HttpResponse, TransportError, TransportPort, TransportReply,
    validate_fetch_settings,
};

use crate::error::{HttpAdapterError, map_reqwest_error};

/// Production transport using a shared `reqwest::Client`.
///
/// The client is built once with the settings' user agent and default
/// timeout; each call applies its own timeout on top. Cloning is cheap and
/// shares the connection pool.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
    default_timeout: Duration,
}

impl ReqwestTransport {
    /// Create a transport from validated settings.
    pub fn new(settings: &FetchSettings) -> Result<Self, HttpAdapterError> {
        validate_fetch_settings(settings)?;

        let default_timeout = settings.effective_request_timeout();
        let client = reqwest::Client::builder()
            .user_agent(settings.effective_user_agent())
            .timeout(default_timeout)
            .build()?;

        Ok(Self {
            client,
            default_timeout,
        })
    }

    /// Create a transport with default settings.
    pub fn with_defaults() -> Result<Self, HttpAdapterError> {
        Self::new(&FetchSettings::default())
    }

    /// Timeout applied when the client is used directly.
    pub const fn default_timeout(&self) -> Duration {
        self.default_timeout
    }

    fn response_metadata(url: &str, response: &reqwest::Response) -> HttpResponse {
        response.headers().iter().fold(
            HttpResponse::new(url, response.status().as_u16()),
            |acc, (name, value)| {
                acc.with_header(
                    name.as_str(),
                    String::from_utf8_lossy(value.as_bytes()).into_owned(),
                )
            },
        )
    }
}

#[async_trait]
impl TransportPort for ReqwestTransport {
    async fn fetch(
        &self,
        url: &str,
        timeout: Duration,
    ) -> Result<TransportReply, TransportError> {
        tracing::debug!(target: "pixfetch.http", url, timeout = ?timeout, "GET");

        let response = self
            .client
            .get(url)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| map_reqwest_error(&e))?;

        let metadata = Self::response_metadata(url, &response);
        let body = response.bytes().await.map_err(|e| map_reqwest_error(&e))?;

        tracing::debug!(
            target: "pixfetch.http",
            url,
            status = metadata.status_code,
            bytes = body.len(),
            "Response received"
        );

        Ok(TransportReply::new(metadata, body))
    }
}
