//! Event-Frame Decoder
//!
//! Turns the raw body of a chat response into protocol records. The body is a
//! line-oriented event stream:
//!
//! ```text
//! data: {"type":"start","message":""}
//!
//! data: {"type":"chunk","message":"Corn futures"}
//!
//! data: {"type":"chunk","message":"Corn futures rose 2%"}
//!
//! data: {"type":"end","message":"Corn futures rose 2% this week."}
//! ```
//!
//! Network reads split this text anywhere, including in the middle of a
//! UTF-8 sequence, so the decoder buffers raw bytes and only decodes lines
//! once their terminating `\n` has arrived. Whatever follows the last newline
//! is carried over to the next [`EventDecoder::push`].
//!
//! Every `message` is the whole answer so far, not a delta. Consumers replace
//! their copy with each record; they never concatenate.
//!
//! A bad record never ends the stream. Malformed payloads and unknown kinds
//! are logged, counted in [`DecoderStats`], and skipped.

use serde::Deserialize;
use thiserror::Error;

/// Prefix that marks a line as a protocol record
pub const DATA_PREFIX: &str = "data: ";

/// Minimum buffer capacity for decoder
const MIN_BUFFER_CAPACITY: usize = 4096;

/// A decoded protocol record
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StreamRecord {
    /// Intermediate cumulative snapshot of the answer
    Chunk(String),
    /// Final snapshot; nothing further is expected for this exchange
    End(String),
}

impl StreamRecord {
    /// The cumulative answer text carried by this record
    #[must_use]
    pub fn message(&self) -> &str {
        match self {
            Self::Chunk(message) | Self::End(message) => message,
        }
    }

    /// Whether this is the final record of the exchange
    #[must_use]
    pub fn is_end(&self) -> bool {
        matches!(self, Self::End(_))
    }
}

/// Why a `data: ` line did not become a record
///
/// These never leave the decoder; they exist for logging and counting.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RecordError {
    /// Payload was not a JSON object of the expected shape
    #[error("malformed event record: {0}")]
    Malformed(String),
    /// Payload parsed but carried a kind this client does not handle
    #[error("unknown event kind: {0}")]
    UnknownKind(String),
}

/// Counters describing what the decoder has seen so far
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DecoderStats {
    /// Records yielded (`chunk` and `end`)
    pub records: u64,
    /// `data: ` lines whose payload failed to parse
    pub malformed: u64,
    /// `data: ` lines with an unhandled `type`
    pub unknown_kind: u64,
    /// Lines without the `data: ` prefix (blank separators, comments, ...)
    pub skipped_lines: u64,
}

#[derive(Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
enum Payload {
    Chunk { message: String },
    End { message: String },
    #[serde(other)]
    Unrecognized,
}

#[derive(Deserialize)]
struct KindOnly {
    #[serde(rename = "type")]
    kind: serde_json::Value,
}

enum LineOutcome {
    Record(StreamRecord),
    Skipped,
    Rejected(RecordError),
}

/// Parse a single complete line (without its terminator)
fn parse_line(line: &str) -> LineOutcome {
    let Some(payload) = line.strip_prefix(DATA_PREFIX) else {
        return LineOutcome::Skipped;
    };

    match serde_json::from_str::<Payload>(payload) {
        Ok(Payload::Chunk { message }) => LineOutcome::Record(StreamRecord::Chunk(message)),
        Ok(Payload::End { message }) => LineOutcome::Record(StreamRecord::End(message)),
        Ok(Payload::Unrecognized) => {
            let kind = serde_json::from_str::<KindOnly>(payload)
                .map(|k| match k.kind {
                    serde_json::Value::String(s) => s,
                    other => other.to_string(),
                })
                .unwrap_or_default();
            LineOutcome::Rejected(RecordError::UnknownKind(kind))
        }
        Err(e) => LineOutcome::Rejected(RecordError::Malformed(e.to_string())),
    }
}

/// Incremental decoder for the chat event stream
///
/// Feed body fragments with [`push`](Self::push) and pull records with
/// [`next_record`](Self::next_record) or the lazy [`records`](Self::records)
/// iterator. Call [`finish`](Self::finish) once the transport has closed.
#[derive(Debug)]
pub struct EventDecoder {
    buffer: Vec<u8>,
    /// Position where we've consumed up to
    read_pos: usize,
    stats: DecoderStats,
}

impl Default for EventDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl EventDecoder {
    /// Create a new decoder with default buffer capacity
    #[must_use]
    pub fn new() -> Self {
        Self {
            buffer: Vec::with_capacity(MIN_BUFFER_CAPACITY),
            read_pos: 0,
            stats: DecoderStats::default(),
        }
    }

    /// Append a body fragment to the carry-over buffer
    pub fn push(&mut self, data: &[u8]) {
        // Compact buffer if we've consumed a lot
        if self.read_pos > self.buffer.len() / 2 && self.read_pos > MIN_BUFFER_CAPACITY {
            self.buffer.drain(..self.read_pos);
            self.read_pos = 0;
        }
        self.buffer.extend_from_slice(data);
    }

    /// Bytes received but not yet terminated by a newline
    #[must_use]
    pub fn pending(&self) -> usize {
        self.buffer.len() - self.read_pos
    }

    /// Counters for everything decoded so far
    #[must_use]
    pub fn stats(&self) -> DecoderStats {
        self.stats
    }

    /// Next record from the fully terminated lines in the buffer
    ///
    /// Returns `None` when only an unterminated remainder (or nothing) is
    /// left; push more data and call again.
    pub fn next_record(&mut self) -> Option<StreamRecord> {
        loop {
            let rest = &self.buffer[self.read_pos..];
            let newline = rest.iter().position(|&b| b == b'\n')?;
            let line = String::from_utf8_lossy(&rest[..newline]).into_owned();
            self.read_pos += newline + 1;

            if let Some(record) = self.accept(&line) {
                return Some(record);
            }
        }
    }

    /// Lazily drain the records available right now
    pub fn records(&mut self) -> Records<'_> {
        Records { decoder: self }
    }

    /// Flush the carry-over buffer at end of stream
    ///
    /// A final line that was never newline-terminated still counts if it is a
    /// complete record. Once the returned iterator is drained the buffer is
    /// empty.
    pub fn finish(&mut self) -> Records<'_> {
        if self.pending() > 0 && self.buffer.last() != Some(&b'\n') {
            self.buffer.push(b'\n');
        }
        self.records()
    }

    fn accept(&mut self, line: &str) -> Option<StreamRecord> {
        let line = line.strip_suffix('\r').unwrap_or(line);

        match parse_line(line) {
            LineOutcome::Record(record) => {
                self.stats.records += 1;
                tracing::trace!(
                    end = record.is_end(),
                    len = record.message().len(),
                    "Decoded record"
                );
                Some(record)
            }
            LineOutcome::Skipped => {
                self.stats.skipped_lines += 1;
                None
            }
            LineOutcome::Rejected(err @ RecordError::Malformed(_)) => {
                self.stats.malformed += 1;
                tracing::warn!(error = %err, "Discarding event record");
                None
            }
            LineOutcome::Rejected(err @ RecordError::UnknownKind(_)) => {
                self.stats.unknown_kind += 1;
                tracing::debug!(error = %err, "Ignoring event record");
                None
            }
        }
    }
}

/// Iterator over the records currently decodable, see [`EventDecoder::records`]
pub struct Records<'a> {
    decoder: &'a mut EventDecoder,
}

impl Iterator for Records<'_> {
    type Item = StreamRecord;

    fn next(&mut self) -> Option<Self::Item> {
        self.decoder.next_record()
    }
}
