//! Identifiers and Small Shared Types
//!
//! Types shared between the store, the session controller, and UI surfaces.
//! Everything here is plain data: cheap to clone and serializable so a
//! surface can forward it over whatever channel it uses.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Message identifier
///
/// Backed by a process-wide counter, so ids never collide within a session
/// (or across sessions in the same process).
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageId(pub String);

impl MessageId {
    /// Generate a new unique message ID
    pub fn new() -> Self {
        use std::sync::atomic::{AtomicU64, Ordering};
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        let id = COUNTER.fetch_add(1, Ordering::SeqCst);
        Self(format!("msg_{id}"))
    }
}

impl Default for MessageId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier of one send/stream/finalize cycle
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ExchangeId(pub uuid::Uuid);

impl ExchangeId {
    /// Generate a new random exchange ID
    #[must_use]
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }
}

impl Default for ExchangeId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ExchangeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Who authored a message
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum MessageRole {
    /// User input
    User,
    /// The market assistant (replies and notices)
    Assistant,
}

/// Marks an assistant message that reports how an exchange ended badly
///
/// Surfaces use this to style notices differently from answers; the notice
/// text itself also differs between the two kinds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Notice {
    /// The transport failed (connect error, non-2xx status, broken stream)
    Failure,
    /// The user stopped the exchange
    Cancelled,
}

/// Controller state of a chat session
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionState {
    /// No exchange in flight; `send` is accepted
    #[default]
    Idle,
    /// An exchange is in flight
    Sending,
    /// Cancellation was requested; waiting for the exchange task to let go
    Cancelling,
}

impl SessionState {
    /// Whether an exchange currently owns the session
    #[must_use]
    pub fn is_busy(self) -> bool {
        !matches!(self, Self::Idle)
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Sending => write!(f, "sending"),
            Self::Cancelling => write!(f, "cancelling"),
        }
    }
}
