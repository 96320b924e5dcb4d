//! HTTP Backend Implementation
//!
//! Talks to the dashboard's assistant endpoint:
//!
//! - `POST /api/chat` with `{"message": "..."}`
//! - response body streamed as `data: {...}` lines
//!
//! The client carries a connect timeout only. A whole-request timeout would
//! cut long answers short, and the session deliberately imposes none.

use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::Url;

use super::traits::{ByteStream, ChatBackend, ChatRequest, TransportError};
use crate::config::BackendSettings;

/// HTTP chat backend client
#[derive(Clone, Debug)]
pub struct HttpChatBackend {
    /// Full chat endpoint URL
    endpoint: Url,
    /// HTTP client
    http_client: reqwest::Client,
}

impl HttpChatBackend {
    /// Create a backend for `base_url` + `chat_path`
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::InvalidUrl`] if the joined URL does not
    /// parse, or [`TransportError::Connect`] if the HTTP client cannot be
    /// built.
    pub fn new(
        base_url: &str,
        chat_path: &str,
        connect_timeout: Duration,
    ) -> Result<Self, TransportError> {
        let endpoint = join_url(base_url, chat_path)?;
        let http_client = reqwest::Client::builder()
            .connect_timeout(connect_timeout)
            .build()
            .map_err(|e| TransportError::Connect(e.to_string()))?;

        Ok(Self {
            endpoint,
            http_client,
        })
    }

    /// Create from `BackendSettings`
    ///
    /// # Errors
    ///
    /// Same as [`HttpChatBackend::new`].
    pub fn from_settings(settings: &BackendSettings) -> Result<Self, TransportError> {
        Self::new(
            &settings.base_url,
            &settings.chat_path,
            Duration::from_millis(settings.connect_timeout_ms),
        )
    }

    /// The chat endpoint this backend posts to
    #[must_use]
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

/// Join a base URL and an absolute path, keeping any path prefix of the base
pub(crate) fn join_url(base_url: &str, path: &str) -> Result<Url, TransportError> {
    let joined = format!("{}{}", base_url.trim_end_matches('/'), path);
    Url::parse(&joined).map_err(|e| TransportError::InvalidUrl(format!("{joined}: {e}")))
}

#[async_trait]
impl ChatBackend for HttpChatBackend {
    fn name(&self) -> &'static str {
        "HTTP"
    }

    async fn open(&self, request: &ChatRequest) -> Result<ByteStream, TransportError> {
        let response = self
            .http_client
            .post(self.endpoint.clone())
            .header(reqwest::header::ACCEPT, "text/event-stream")
            .json(request)
            .send()
            .await
            .map_err(|e| TransportError::Connect(e.to_string()))?;

        // Check for HTTP errors
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(TransportError::Status { status, body });
        }

        tracing::debug!(endpoint = %self.endpoint, "Chat response stream opened");

        Ok(response
            .bytes_stream()
            .map(|chunk| chunk.map_err(|e| TransportError::Stream(e.to_string())))
            .boxed())
    }
}
