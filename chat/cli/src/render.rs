//! Terminal rendering
//!
//! The session reports every reply update as the full answer so far. A
//! terminal can only append, so the renderer remembers what it already
//! printed for the streaming reply and writes only the new suffix.

use std::fmt::Write as _;

use chat_core::{
    HealthStatus, Message, MessageId, MessageRole, NewsArticle, Notice, SentimentCard,
    SessionEvent, SessionState, TimeSeriesPoint, TrendingKeyword,
};
use tokio::io::AsyncWriteExt;
use tokio::sync::broadcast;

const ASSISTANT_PROMPT: &str = "assistant> ";

/// Turns session events into terminal output
#[derive(Debug, Default)]
pub struct Renderer {
    /// Reply being streamed and what has been printed of it
    streaming: Option<(MessageId, String)>,
}

impl Renderer {
    /// Create a renderer with nothing on screen
    pub fn new() -> Self {
        Self::default()
    }

    /// Output for one event, if any
    pub fn render(&mut self, event: &SessionEvent) -> Option<String> {
        match event {
            SessionEvent::MessageAppended(message) => self.appended(message),
            SessionEvent::ContentReplaced { id, content } => self.replaced(id, content),
            SessionEvent::ConversationCleared => {
                let mut out = self.close_reply();
                out.push_str("--- new conversation ---\n");
                Some(out)
            }
            SessionEvent::StateChanged(SessionState::Idle) => {
                Some(self.close_reply()).filter(|out| !out.is_empty())
            }
            SessionEvent::StateChanged(_) => None,
        }
    }

    fn appended(&mut self, message: &Message) -> Option<String> {
        match (message.role, message.notice) {
            // The user typed it; no echo
            (MessageRole::User, _) => None,
            (MessageRole::Assistant, None) => {
                let mut out = self.close_reply();
                out.push_str(ASSISTANT_PROMPT);
                out.push_str(&message.content);
                self.streaming = Some((message.id.clone(), message.content.clone()));
                Some(out)
            }
            (MessageRole::Assistant, Some(kind)) => {
                let mut out = self.close_reply();
                let tag = match kind {
                    Notice::Failure => "error",
                    Notice::Cancelled => "stopped",
                };
                let _ = writeln!(out, "[{tag}] {}", message.content);
                Some(out)
            }
        }
    }

    fn replaced(&mut self, id: &MessageId, content: &str) -> Option<String> {
        let (streaming_id, printed) = self.streaming.as_mut()?;
        if *streaming_id != *id {
            return None;
        }

        let out = match content.strip_prefix(printed.as_str()) {
            Some(suffix) => suffix.to_string(),
            // The answer was revised; start it over on a fresh line
            None => format!("\n{ASSISTANT_PROMPT}{content}"),
        };
        content.clone_into(printed);
        Some(out).filter(|out| !out.is_empty())
    }

    /// End the streaming reply's line, if one is open
    fn close_reply(&mut self) -> String {
        match self.streaming.take() {
            Some(_) => "\n".to_string(),
            None => String::new(),
        }
    }
}

/// Print session events until the session goes away
pub async fn run(mut events: broadcast::Receiver<SessionEvent>) {
    let mut renderer = Renderer::new();
    let mut stdout = tokio::io::stdout();

    loop {
        let event = match events.recv().await {
            Ok(event) => event,
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, "Renderer fell behind, skipping events");
                continue;
            }
            Err(broadcast::error::RecvError::Closed) => break,
        };

        if let Some(out) = renderer.render(&event) {
            if stdout.write_all(out.as_bytes()).await.is_err() || stdout.flush().await.is_err() {
                break;
            }
        }
    }
}

/// Sentiment cards, one per line
pub fn format_cards(cards: &[SentimentCard]) -> String {
    if cards.is_empty() {
        return "no sentiment cards\n".to_string();
    }
    let mut out = String::new();
    for card in cards {
        let _ = writeln!(
            out,
            "{:<14} {:>5.1}  {:<8}  {}",
            card.commodity_name,
            card.sentiment_score,
            card.level().to_string(),
            card.keywords.join(", ")
        );
    }
    out
}

/// Time series as a small table
pub fn format_series(commodity: &str, points: &[TimeSeriesPoint]) -> String {
    let mut out = format!("{commodity}\n{:<20} {:>9} {:>10}\n", "date", "sentiment", "price");
    for point in points {
        let sentiment = point
            .sentiment_score
            .map_or_else(|| "-".to_string(), |s| format!("{s:.1}"));
        let price = point
            .price
            .map_or_else(|| "-".to_string(), |p| format!("{p:.2}"));
        let _ = writeln!(out, "{:<20} {sentiment:>9} {price:>10}", point.date);
    }
    out
}

/// News headlines with score and source
pub fn format_news(articles: &[NewsArticle]) -> String {
    if articles.is_empty() {
        return "no articles\n".to_string();
    }
    let mut out = String::new();
    for article in articles {
        let _ = writeln!(
            out,
            "[{:>5.1}] {} ({}, {})",
            article.sentiment_score, article.title, article.source, article.published_time
        );
    }
    out
}

/// Keywords with their counts
pub fn format_keywords(keywords: &[TrendingKeyword]) -> String {
    if keywords.is_empty() {
        return "no trending keywords\n".to_string();
    }
    let mut out = String::new();
    for keyword in keywords {
        let _ = writeln!(out, "{:<20} {}", keyword.keyword, keyword.frequency);
    }
    out
}

/// One-line health report
pub fn format_health(health: &HealthStatus) -> String {
    format!("backend {} at {}\n", health.status, health.timestamp)
}
