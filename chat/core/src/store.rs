//! Conversation Store
//!
//! Ordered list of the messages in the active conversation. Order of
//! insertion is display order. Content is only ever replaced wholesale:
//! the assistant endpoint sends cumulative snapshots, so a reply grows by
//! swapping in the newest snapshot rather than by appending fragments.
//!
//! The store itself is plain data with no locking. The session owns it behind
//! its lock, which is what makes `reset` atomic for observers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::messages::{MessageId, MessageRole, Notice};

/// Errors from targeted store operations
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    /// No message with this id exists (it may have been cleared by a reset)
    #[error("message {0} not found")]
    NotFound(MessageId),
}

/// A message in the conversation
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Unique message ID
    pub id: MessageId,
    /// Who authored this message
    pub role: MessageRole,
    /// Current content
    pub content: String,
    /// When the message was created
    pub created_at: DateTime<Utc>,
    /// Set on assistant-authored failure/cancellation notices
    pub notice: Option<Notice>,
}

impl Message {
    /// Create a user message
    pub fn user(content: impl Into<String>) -> Self {
        Self::with_role(MessageRole::User, content.into(), None)
    }

    /// Create an empty assistant message that will be filled by a stream
    #[must_use]
    pub fn assistant_placeholder() -> Self {
        Self::with_role(MessageRole::Assistant, String::new(), None)
    }

    /// Create an assistant-authored notice
    pub fn notice(kind: Notice, content: impl Into<String>) -> Self {
        Self::with_role(MessageRole::Assistant, content.into(), Some(kind))
    }

    fn with_role(role: MessageRole, content: String, notice: Option<Notice>) -> Self {
        Self {
            id: MessageId::new(),
            role,
            content,
            created_at: Utc::now(),
            notice,
        }
    }

    /// Whether this message is a failure or cancellation notice
    #[must_use]
    pub fn is_notice(&self) -> bool {
        self.notice.is_some()
    }
}

/// Ordered, append-only (from the outside) sequence of messages
#[derive(Clone, Debug, Default)]
pub struct ConversationStore {
    messages: Vec<Message>,
}

impl ConversationStore {
    /// Create an empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a message at the end and return its id
    pub fn append(&mut self, message: Message) -> MessageId {
        let id = message.id.clone();
        self.messages.push(message);
        id
    }

    /// Overwrite the content of the message with `id`
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] if no message has this id. The store
    /// is left untouched in that case.
    pub fn replace_content(&mut self, id: &MessageId, content: &str) -> Result<(), StoreError> {
        let msg = self
            .messages
            .iter_mut()
            .find(|m| &m.id == id)
            .ok_or_else(|| StoreError::NotFound(id.clone()))?;
        content.clone_into(&mut msg.content);
        Ok(())
    }

    /// Remove every message
    pub fn reset(&mut self) {
        self.messages.clear();
    }

    /// Owned copy of the conversation for rendering
    #[must_use]
    pub fn snapshot(&self) -> Vec<Message> {
        self.messages.clone()
    }

    /// Get message by ID
    #[must_use]
    pub fn get(&self, id: &MessageId) -> Option<&Message> {
        self.messages.iter().find(|m| &m.id == id)
    }

    /// Most recently appended message
    #[must_use]
    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    /// Number of messages
    #[must_use]
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Whether the conversation is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}
