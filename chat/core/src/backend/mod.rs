//! Chat Backend Integration
//!
//! Access to the assistant endpoint through a small trait, so the session
//! controller can be driven by the real HTTP backend or by a scripted one in
//! tests.
//!
//! # Usage
//!
//! ```ignore
//! use chat_core::backend::{ChatBackend, ChatRequest, HttpChatBackend};
//!
//! let backend = HttpChatBackend::new("http://localhost:8001", "/api/chat", Duration::from_secs(10))?;
//! let body = backend.open(&ChatRequest::new("corn outlook?")).await?;
//! ```

mod http;
mod traits;

pub use http::HttpChatBackend;
pub use traits::{ByteStream, ChatBackend, ChatRequest, TransportError};
