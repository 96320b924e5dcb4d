//! Chat Core - Streaming Market-Sentiment Chat Session
//!
//! Headless controller for the dashboard's market assistant. It sends a
//! question to the assistant endpoint, decodes the streamed answer, grows a
//! single reply message in place, and supports stopping mid-stream without
//! leaving the connection or the conversation in a half-finished state.
//!
//! # Architecture
//!
//! ```text
//!  surface (CLI, ...)
//!     │  send / stop / new_conversation        ▲ SessionEvent
//!     ▼                                        │
//! ┌──────────────────────── ChatSession ───────┴──────────────┐
//! │  Mutex<SessionCore { ConversationStore, SessionState,     │
//! │                      Option<Exchange> }>                  │
//! └──────────────┬────────────────────────────▲───────────────┘
//!                │ spawn                      │ apply (re-checked under lock)
//!                ▼                            │
//!         exchange task ── bytes ──▶ EventDecoder ──▶ StreamRecord
//!                │
//!                ▼
//!         ChatBackend::open (HTTP POST /api/chat)
//! ```
//!
//! # Module Overview
//!
//! - [`backend`]: transport abstraction and the HTTP implementation
//! - [`config`]: TOML/env/CLI configuration
//! - [`dashboard`]: read-only dashboard endpoints (cards, series, news, keywords)
//! - [`decoder`]: `data: ` line framing over arbitrary byte fragments
//! - [`events`]: observable session mutations
//! - [`messages`]: identifiers and small shared types
//! - [`session`]: the lifecycle API and exchange driver
//! - [`store`]: the ordered conversation
//!
//! # No UI Dependencies
//!
//! Presentation is left to the surface. The CLI in this workspace is one
//! such surface.

#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod backend;
pub mod config;
pub mod dashboard;
pub mod decoder;
pub mod events;
pub mod messages;
pub mod session;
pub mod store;

// Re-exports for convenience
pub use backend::{ByteStream, ChatBackend, ChatRequest, HttpChatBackend, TransportError};
pub use decoder::{DecoderStats, EventDecoder, RecordError, StreamRecord};
pub use events::SessionEvent;
pub use messages::{ExchangeId, MessageId, MessageRole, Notice, SessionState};
pub use session::{ChatSession, SendOutcome, SendRejection};
pub use store::{ConversationStore, Message, StoreError};

// Dashboard exports
pub use dashboard::{
    DashboardClient, DashboardError, HealthStatus, NewsArticle, SentimentCard, SentimentLevel,
    TimeSeriesPoint, TrendingKeyword,
};

// Config exports
pub use config::{
    default_config_path, load_config, load_config_from_path, BackendSettings, ChatConfig,
    ChatToml, ConfigError, ConfigOverrides, ConfigSource, SessionSettings,
};
