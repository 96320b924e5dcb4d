//! Chat Session
//!
//! The lifecycle API a surface drives: `send`, `stop`, `new_conversation`,
//! plus observation of the conversation and controller state.
//!
//! # Design Philosophy
//!
//! One lock guards the conversation, the controller state, and the current
//! exchange. Every mutation happens under it and is broadcast before it is
//! released, so subscribers see events in the exact order they were applied.
//! The exchange task re-checks under the same lock that its exchange is still
//! current and `Sending` before touching the store; a stopped or superseded
//! exchange can never write into the conversation.
//!
//! Nothing here returns an error. A rejected `send` is a value, and transport
//! problems surface as notice messages in the conversation.

mod exchange;

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::{broadcast, watch};

use crate::backend::{ChatBackend, ChatRequest, HttpChatBackend, TransportError};
use crate::config::{ChatConfig, SessionSettings};
use crate::events::SessionEvent;
use crate::messages::{ExchangeId, MessageId, SessionState};
use crate::store::{ConversationStore, Message};

/// Why a `send` was not started
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SendRejection {
    /// The text was empty or whitespace only
    EmptyInput,
    /// Another exchange is still in flight
    ExchangeActive,
}

impl std::fmt::Display for SendRejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyInput => write!(f, "message is empty"),
            Self::ExchangeActive => write!(f, "a reply is still streaming"),
        }
    }
}

/// Result of [`ChatSession::send`]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SendOutcome {
    /// A new exchange was opened
    Started(ExchangeId),
    /// Nothing happened
    Rejected(SendRejection),
}

impl SendOutcome {
    /// Whether an exchange was started
    #[must_use]
    pub fn is_started(&self) -> bool {
        matches!(self, Self::Started(_))
    }
}

/// The in-flight exchange, owned by the session core
#[derive(Debug)]
struct Exchange {
    id: ExchangeId,
    /// Outgoing text
    prompt: String,
    /// Assistant message being filled
    assistant_id: MessageId,
    /// Cancellation handle; dropping it also cancels
    cancel: watch::Sender<bool>,
    /// Set when the conversation was cleared under this exchange
    suppress_notices: bool,
}

/// State guarded by the session lock
#[derive(Debug, Default)]
struct SessionCore {
    store: ConversationStore,
    state: SessionState,
    exchange: Option<Exchange>,
}

impl SessionCore {
    /// The exchange, if it is `id`
    fn exchange_if(&self, id: ExchangeId) -> Option<&Exchange> {
        self.exchange.as_ref().filter(|exchange| exchange.id == id)
    }
}

/// Shared between the session handle and (weakly) its exchange task
struct SessionInner {
    core: Mutex<SessionCore>,
    events: broadcast::Sender<SessionEvent>,
    state_tx: watch::Sender<SessionState>,
    settings: SessionSettings,
}

impl SessionInner {
    /// Broadcast an event; call with the lock held
    fn emit(&self, event: SessionEvent) {
        // No subscribers is fine
        let _ = self.events.send(event);
    }

    fn set_state(&self, core: &mut SessionCore, state: SessionState) {
        if core.state == state {
            return;
        }
        core.state = state;
        // Broadcast first: a state watcher that wakes up must find the event queued
        self.emit(SessionEvent::StateChanged(state));
        self.state_tx.send_replace(state);
    }

    fn append(&self, core: &mut SessionCore, message: Message) -> MessageId {
        let id = core.store.append(message.clone());
        self.emit(SessionEvent::MessageAppended(message));
        id
    }
}

/// A streaming chat session against one backend
///
/// Cheap to clone; clones share the same conversation. When the last clone
/// is dropped, an in-flight exchange is cancelled and its response body is
/// released.
///
/// `send` spawns the exchange task, so it must be called from within a tokio
/// runtime.
pub struct ChatSession<B: ChatBackend + 'static> {
    inner: Arc<SessionInner>,
    backend: Arc<B>,
}

impl<B: ChatBackend + 'static> Clone for ChatSession<B> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            backend: Arc::clone(&self.backend),
        }
    }
}

impl ChatSession<HttpChatBackend> {
    /// Create a session talking HTTP to the configured backend
    ///
    /// # Errors
    ///
    /// Returns an error if the configured endpoint is not a valid URL.
    pub fn from_config(config: &ChatConfig) -> Result<Self, TransportError> {
        let backend = HttpChatBackend::from_settings(&config.backend)?;
        Ok(Self::with_settings(backend, config.session.clone()))
    }
}

impl<B: ChatBackend + 'static> ChatSession<B> {
    /// Create a session with default settings
    pub fn new(backend: B) -> Self {
        Self::with_settings(backend, SessionSettings::default())
    }

    /// Create a session with explicit settings
    pub fn with_settings(backend: B, settings: SessionSettings) -> Self {
        let (events, _) = broadcast::channel(settings.event_capacity.max(1));
        let (state_tx, _) = watch::channel(SessionState::Idle);

        Self {
            inner: Arc::new(SessionInner {
                core: Mutex::new(SessionCore::default()),
                events,
                state_tx,
                settings,
            }),
            backend: Arc::new(backend),
        }
    }

    /// The backend this session talks to
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Submit a question
    ///
    /// The text is trimmed. Empty input and input arriving while an exchange
    /// is in flight are rejected without touching the conversation; repeated
    /// calls are never queued.
    pub fn send(&self, text: &str) -> SendOutcome {
        let text = text.trim();
        if text.is_empty() {
            return SendOutcome::Rejected(SendRejection::EmptyInput);
        }

        let mut core = self.inner.core.lock();
        if core.exchange.is_some() || core.state.is_busy() {
            tracing::debug!(state = %core.state, "Send rejected, exchange in flight");
            return SendOutcome::Rejected(SendRejection::ExchangeActive);
        }

        self.inner.append(&mut core, Message::user(text));
        let assistant_id = self.inner.append(&mut core, Message::assistant_placeholder());

        let id = ExchangeId::new();
        let (cancel, cancel_rx) = watch::channel(false);
        core.exchange = Some(Exchange {
            id,
            prompt: text.to_string(),
            assistant_id,
            cancel,
            suppress_notices: false,
        });
        self.inner.set_state(&mut core, SessionState::Sending);
        drop(core);

        tracing::info!(
            exchange = %id,
            backend = self.backend.name(),
            chars = text.chars().count(),
            "Exchange started"
        );

        tokio::spawn(exchange::drive(
            Arc::downgrade(&self.inner),
            Arc::clone(&self.backend),
            id,
            ChatRequest::new(text),
            cancel_rx,
        ));

        SendOutcome::Started(id)
    }

    /// Stop the in-flight exchange
    ///
    /// From the moment this returns `true` no further content is applied to
    /// the reply. The session reaches `Idle` once the exchange task has
    /// released the connection and appended the cancellation notice.
    /// Returns `false` when there was nothing to stop.
    pub fn stop(&self) -> bool {
        let mut core = self.inner.core.lock();
        if core.state != SessionState::Sending {
            return false;
        }
        let Some(exchange) = core.exchange.as_ref() else {
            return false;
        };

        exchange.cancel.send_replace(true);
        tracing::info!(exchange = %exchange.id, "Stop requested");
        self.inner.set_state(&mut core, SessionState::Cancelling);
        true
    }

    /// Start over with an empty conversation
    ///
    /// An in-flight exchange is cancelled first; its acknowledgment adds
    /// nothing to the fresh conversation.
    pub fn new_conversation(&self) {
        let mut core = self.inner.core.lock();

        let cancelled = match core.exchange.as_mut() {
            Some(exchange) => {
                exchange.suppress_notices = true;
                exchange.cancel.send_replace(true);
                tracing::info!(exchange = %exchange.id, "Conversation reset during exchange");
                true
            }
            None => false,
        };
        if cancelled && core.state == SessionState::Sending {
            self.inner.set_state(&mut core, SessionState::Cancelling);
        }

        core.store.reset();
        self.inner.emit(SessionEvent::ConversationCleared);
    }

    /// Copy of the conversation
    pub fn snapshot(&self) -> Vec<Message> {
        self.inner.core.lock().store.snapshot()
    }

    /// Current controller state
    pub fn state(&self) -> SessionState {
        self.inner.core.lock().state
    }

    /// Text of the in-flight question, if any
    pub fn pending_prompt(&self) -> Option<String> {
        self.inner
            .core
            .lock()
            .exchange
            .as_ref()
            .map(|exchange| exchange.prompt.clone())
    }

    /// Subscribe to session events
    ///
    /// Only events emitted after this call are received.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.inner.events.subscribe()
    }

    /// Watch the controller state
    pub fn watch_state(&self) -> watch::Receiver<SessionState> {
        self.inner.state_tx.subscribe()
    }

    /// Wait until no exchange is in flight
    pub async fn wait_idle(&self) {
        let mut state = self.watch_state();
        // The sender lives as long as `self`, so this cannot fail
        let _ = state.wait_for(|s| *s == SessionState::Idle).await;
    }
}
