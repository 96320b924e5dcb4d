//! Shared test infrastructure: a backend whose responses the test feeds by hand
#![allow(dead_code)]

use std::collections::VecDeque;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;
use parking_lot::Mutex;
use tokio::sync::{broadcast, mpsc};
use tokio_stream::wrappers::UnboundedReceiverStream;

use chat_core::{
    ByteStream, ChatBackend, ChatRequest, ChatSession, SessionEvent, TransportError,
};

/// Upper bound for anything a test waits on
pub const TEST_TIMEOUT: Duration = Duration::from_secs(5);

/// What the next `open` call does
enum Script {
    /// Return a body fed through a `StreamFeed`
    Stream(mpsc::UnboundedReceiver<Result<Bytes, TransportError>>),
    /// Fail to open
    Fail(TransportError),
    /// Never finish opening
    Hang,
}

/// Test side of a scripted response body
pub struct StreamFeed {
    tx: mpsc::UnboundedSender<Result<Bytes, TransportError>>,
}

impl StreamFeed {
    /// Send raw bytes; returns false once the body was dropped
    pub fn bytes(&self, data: &[u8]) -> bool {
        self.tx.send(Ok(Bytes::copy_from_slice(data))).is_ok()
    }

    /// Send one framed `chunk` record
    pub fn chunk(&self, message: &str) -> bool {
        self.record("chunk", message)
    }

    /// Send one framed `end` record
    pub fn end(&self, message: &str) -> bool {
        self.record("end", message)
    }

    /// Send one framed record of any kind
    pub fn record(&self, kind: &str, message: &str) -> bool {
        let payload = serde_json::json!({ "type": kind, "message": message });
        self.bytes(format!("data: {payload}\n\n").as_bytes())
    }

    /// Break the body with a transport error
    pub fn fail(&self, reason: &str) -> bool {
        self.tx
            .send(Err(TransportError::Stream(reason.to_string())))
            .is_ok()
    }

    /// Whether the session dropped the body
    pub fn is_released(&self) -> bool {
        self.tx.is_closed()
    }

    /// Wait until the session drops the body
    pub async fn released(&self) {
        tokio::time::timeout(TEST_TIMEOUT, self.tx.closed())
            .await
            .expect("response body was never released");
    }
}

/// Backend that plays back scripts in order
#[derive(Default)]
pub struct ScriptedBackend {
    scripts: Mutex<VecDeque<Script>>,
    requests: Mutex<Vec<ChatRequest>>,
}

impl ScriptedBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a streamed response and return its feed
    pub fn push_stream(&self) -> StreamFeed {
        let (tx, rx) = mpsc::unbounded_channel();
        self.scripts.lock().push_back(Script::Stream(rx));
        StreamFeed { tx }
    }

    /// Queue an open failure
    pub fn push_failure(&self, error: TransportError) {
        self.scripts.lock().push_back(Script::Fail(error));
    }

    /// Queue an open that never completes
    pub fn push_hang(&self) {
        self.scripts.lock().push_back(Script::Hang);
    }

    /// Requests received so far
    pub fn requests(&self) -> Vec<ChatRequest> {
        self.requests.lock().clone()
    }
}

#[async_trait]
impl ChatBackend for ScriptedBackend {
    fn name(&self) -> &str {
        "Scripted"
    }

    async fn open(&self, request: &ChatRequest) -> Result<ByteStream, TransportError> {
        self.requests.lock().push(request.clone());
        let script = self.scripts.lock().pop_front();

        match script {
            Some(Script::Stream(rx)) => Ok(UnboundedReceiverStream::new(rx).boxed()),
            Some(Script::Fail(error)) => Err(error),
            Some(Script::Hang) => futures::future::pending().await,
            None => Err(TransportError::Connect("no script queued".to_string())),
        }
    }
}

/// Wait for the first event matching `pred`
pub async fn wait_for_event<F>(
    events: &mut broadcast::Receiver<SessionEvent>,
    pred: F,
) -> SessionEvent
where
    F: Fn(&SessionEvent) -> bool,
{
    tokio::time::timeout(TEST_TIMEOUT, async {
        loop {
            match events.recv().await {
                Ok(event) if pred(&event) => return event,
                Ok(_) | Err(broadcast::error::RecvError::Lagged(_)) => {}
                Err(e) => panic!("event stream ended: {e}"),
            }
        }
    })
    .await
    .expect("expected event never arrived")
}

/// Wait until the assistant content equals `content`
pub async fn wait_for_content(events: &mut broadcast::Receiver<SessionEvent>, content: &str) {
    wait_for_event(events, |event| {
        matches!(event, SessionEvent::ContentReplaced { content: c, .. } if c == content)
    })
    .await;
}

/// Wait until the session is idle
pub async fn settle<B: ChatBackend + 'static>(session: &ChatSession<B>) {
    tokio::time::timeout(TEST_TIMEOUT, session.wait_idle())
        .await
        .expect("session never returned to idle");
}

/// Drain events already queued
pub fn drain(events: &mut broadcast::Receiver<SessionEvent>) -> Vec<SessionEvent> {
    let mut out = Vec::new();
    while let Ok(event) = events.try_recv() {
        out.push(event);
    }
    out
}
