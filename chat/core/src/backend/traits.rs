//! Chat Backend Traits
//!
//! The controller only needs one thing from a backend: open an exchange for a
//! question and hand back the raw response body as a stream of byte
//! fragments. Framing and interpretation belong to the decoder.
//!
//! Dropping the returned stream must release the underlying connection. The
//! controller relies on that to abort an exchange at the transport level.

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Raw response body, fragment by fragment
pub type ByteStream = BoxStream<'static, Result<Bytes, TransportError>>;

/// Transport-level failures of an exchange
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    /// The request could not be delivered (connection refused, DNS, ...)
    #[error("failed to reach chat endpoint: {0}")]
    Connect(String),

    /// The endpoint answered with a non-2xx status
    #[error("chat endpoint returned {status}: {body}")]
    Status {
        /// HTTP status code
        status: u16,
        /// Response body, if it could be read
        body: String,
    },

    /// The response body broke off mid-stream
    #[error("response stream failed: {0}")]
    Stream(String),

    /// The configured endpoint is not a valid URL
    #[error("invalid endpoint URL: {0}")]
    InvalidUrl(String),
}

/// Body of a chat request
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatRequest {
    /// The user's question
    pub message: String,
}

impl ChatRequest {
    /// Create a request for a question
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Chat backend trait
///
/// Implement this trait to point the session at a different transport.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// Backend name for logs
    fn name(&self) -> &str;

    /// Send a question and return the streamed response body
    ///
    /// Resolves once the response headers have arrived and the status was
    /// checked; the body is then read lazily through the returned stream.
    async fn open(&self, request: &ChatRequest) -> Result<ByteStream, TransportError>;
}
