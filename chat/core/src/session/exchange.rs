//! Exchange Driver
//!
//! One spawned task per exchange. It has two suspension points, opening the
//! request and awaiting the next body fragment; both race the cancellation
//! handle in a biased `select!` so a stop is observed before more data is read.
//!
//! The task holds only a weak reference to the session. If the session is
//! gone, the task drops the response body and exits.

use std::sync::{Arc, Weak};

use futures::StreamExt;
use tokio::sync::watch;

use super::{SessionCore, SessionInner};
use crate::backend::{ChatBackend, ChatRequest, TransportError};
use crate::decoder::{EventDecoder, StreamRecord};
use crate::events::SessionEvent;
use crate::messages::{ExchangeId, Notice, SessionState};
use crate::store::Message;

/// Whether the driver should keep reading
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Flow {
    Continue,
    Done,
}

/// How an exchange ended, as seen by the driver
#[derive(Debug)]
enum Ending {
    /// `end` record or clean close
    Completed,
    /// Transport failure
    Failed(TransportError),
    /// Cancellation observed
    Cancelled,
}

/// Resolves once cancellation is requested or the handle is dropped
async fn cancelled(cancel: &mut watch::Receiver<bool>) {
    // A dropped handle is an error here, which also means cancel
    let _ = cancel.wait_for(|requested| *requested).await;
}

pub(super) async fn drive<B: ChatBackend + ?Sized>(
    session: Weak<SessionInner>,
    backend: Arc<B>,
    exchange_id: ExchangeId,
    request: ChatRequest,
    mut cancel: watch::Receiver<bool>,
) {
    // Suspension point 1: request establishment
    let opened = tokio::select! {
        biased;
        () = cancelled(&mut cancel) => {
            finish(&session, exchange_id, Ending::Cancelled);
            return;
        }
        result = backend.open(&request) => result,
    };

    let mut body = match opened {
        Ok(body) => body,
        Err(e) => {
            finish(&session, exchange_id, Ending::Failed(e));
            return;
        }
    };

    let mut decoder = EventDecoder::new();

    loop {
        // Suspension point 2: next fragment
        let fragment = tokio::select! {
            biased;
            () = cancelled(&mut cancel) => {
                drop(body);
                finish(&session, exchange_id, Ending::Cancelled);
                return;
            }
            fragment = body.next() => fragment,
        };

        match fragment {
            Some(Ok(bytes)) => {
                decoder.push(&bytes);
                if apply_all(&session, exchange_id, decoder.records()) == Flow::Done {
                    break;
                }
            }
            Some(Err(e)) => {
                drop(body);
                finish(&session, exchange_id, Ending::Failed(e));
                return;
            }
            None => {
                if apply_all(&session, exchange_id, decoder.finish()) == Flow::Continue {
                    finish(&session, exchange_id, Ending::Completed);
                }
                break;
            }
        }
    }

    let stats = decoder.stats();
    tracing::debug!(
        exchange = %exchange_id,
        records = stats.records,
        malformed = stats.malformed,
        unknown_kind = stats.unknown_kind,
        skipped_lines = stats.skipped_lines,
        "Exchange stream released"
    );
}

fn apply_all(
    session: &Weak<SessionInner>,
    exchange_id: ExchangeId,
    records: impl Iterator<Item = StreamRecord>,
) -> Flow {
    for record in records {
        if apply(session, exchange_id, &record) == Flow::Done {
            return Flow::Done;
        }
    }
    Flow::Continue
}

/// Apply one decoded record to the assistant message
fn apply(session: &Weak<SessionInner>, exchange_id: ExchangeId, record: &StreamRecord) -> Flow {
    let Some(inner) = session.upgrade() else {
        return Flow::Done;
    };
    let mut core = inner.core.lock();

    let Some(exchange) = core.exchange_if(exchange_id) else {
        return Flow::Done;
    };
    if core.state != SessionState::Sending {
        // Stop requested; the next select observes it
        return Flow::Continue;
    }

    let assistant_id = exchange.assistant_id.clone();
    let content = record.message();
    match core.store.replace_content(&assistant_id, content) {
        Ok(()) => inner.emit(SessionEvent::ContentReplaced {
            id: assistant_id,
            content: content.to_string(),
        }),
        Err(e) => tracing::warn!(exchange = %exchange_id, error = %e, "Dropping record"),
    }

    if record.is_end() {
        finish_locked(&inner, &mut core, exchange_id, Ending::Completed);
        return Flow::Done;
    }
    Flow::Continue
}

fn finish(session: &Weak<SessionInner>, exchange_id: ExchangeId, ending: Ending) {
    let Some(inner) = session.upgrade() else {
        tracing::debug!(exchange = %exchange_id, "Session dropped before exchange finished");
        return;
    };
    let mut core = inner.core.lock();
    finish_locked(&inner, &mut core, exchange_id, ending);
}

/// Release the exchange and return to `Idle`
///
/// A stop that raced the ending wins: if the session is `Cancelling`, the
/// exchange is acknowledged as cancelled however it ended.
fn finish_locked(
    inner: &SessionInner,
    core: &mut SessionCore,
    exchange_id: ExchangeId,
    ending: Ending,
) {
    if core.exchange_if(exchange_id).is_none() {
        return;
    }
    let Some(exchange) = core.exchange.take() else {
        return;
    };

    let ending = if core.state == SessionState::Cancelling {
        Ending::Cancelled
    } else {
        ending
    };

    let notice = match ending {
        Ending::Completed => {
            tracing::info!(exchange = %exchange_id, "Exchange completed");
            None
        }
        Ending::Failed(e) => {
            tracing::warn!(exchange = %exchange_id, error = %e, "Exchange failed");
            Some((Notice::Failure, &inner.settings.failure_notice))
        }
        Ending::Cancelled => {
            tracing::info!(exchange = %exchange_id, "Exchange cancelled");
            Some((Notice::Cancelled, &inner.settings.cancelled_notice))
        }
    };

    if let Some((kind, text)) = notice {
        if !exchange.suppress_notices {
            inner.append(core, Message::notice(kind, text.as_str()));
        }
    }

    inner.set_state(core, SessionState::Idle);
}
