//! Session Events
//!
//! Everything a UI surface needs to re-render the conversation. Events are
//! broadcast while the session lock is held, so every subscriber sees them
//! in exactly the order the mutations were applied.

use serde::{Deserialize, Serialize};

use crate::messages::{MessageId, SessionState};
use crate::store::Message;

/// An observable mutation of the session
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum SessionEvent {
    /// A message was appended to the conversation
    MessageAppended(Message),

    /// The content of an existing message was replaced
    ContentReplaced {
        /// Message that changed
        id: MessageId,
        /// The full new content (not a delta)
        content: String,
    },

    /// The conversation was cleared
    ConversationCleared,

    /// The controller moved to a new state
    StateChanged(SessionState),
}
