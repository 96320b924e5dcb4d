//! Dashboard Client
//!
//! Read-only calls for the precomputed analytics the dashboard renders next
//! to the chat: sentiment cards, per-commodity time series and news, and
//! trending keywords. Plain request/response; no streaming, no retries.

use std::time::Duration;

use reqwest::{StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::BackendSettings;

/// Errors from dashboard calls
#[derive(Debug, Error)]
pub enum DashboardError {
    /// The request could not be completed or returned an error status
    #[error("dashboard request failed: {0}")]
    Transport(String),

    /// The backend has no data for this commodity
    #[error("no data for commodity {0:?}")]
    NotFound(String),

    /// The response body did not have the expected shape
    #[error("unexpected dashboard response: {0}")]
    Decode(String),
}

/// Coarse sentiment bucket used for card colouring
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SentimentLevel {
    /// Score of 60 or more
    Positive,
    /// Between 40 and 60
    Neutral,
    /// Score of 40 or less
    Negative,
}

impl SentimentLevel {
    /// Bucket a 0-100 sentiment score
    #[must_use]
    pub fn from_score(score: f64) -> Self {
        if score >= 60.0 {
            Self::Positive
        } else if score <= 40.0 {
            Self::Negative
        } else {
            Self::Neutral
        }
    }
}

impl std::fmt::Display for SentimentLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Positive => write!(f, "positive"),
            Self::Neutral => write!(f, "neutral"),
            Self::Negative => write!(f, "negative"),
        }
    }
}

/// Latest sentiment summary for one commodity
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SentimentCard {
    /// Commodity name as the backend spells it
    pub commodity_name: String,
    /// Sentiment score, 0-100
    pub sentiment_score: f64,
    /// Model reasoning behind the score
    pub reasoning: String,
    /// Keywords extracted from the underlying articles
    #[serde(default)]
    pub keywords: Vec<String>,
    /// Timestamp of the newest article, as sent by the backend
    pub last_updated: String,
}

impl SentimentCard {
    /// Bucket of this card's score
    #[must_use]
    pub fn level(&self) -> SentimentLevel {
        SentimentLevel::from_score(self.sentiment_score)
    }
}

/// One day of sentiment and price
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TimeSeriesPoint {
    /// Date, as sent by the backend
    pub date: String,
    /// Average sentiment that day, if any articles were scored
    pub sentiment_score: Option<f64>,
    /// Closing price that day, if known
    pub price: Option<f64>,
}

/// A scored news article
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NewsArticle {
    /// Backend article id
    pub id: i64,
    /// Headline
    pub title: String,
    /// Body text
    #[serde(default)]
    pub content: String,
    /// Sentiment score, 0-100
    pub sentiment_score: f64,
    /// Model reasoning behind the score
    pub reasoning: String,
    /// Extracted keywords
    #[serde(default)]
    pub keywords: Vec<String>,
    /// Publication time, as sent by the backend
    pub published_time: String,
    /// Publisher
    pub source: String,
}

/// A keyword and how often it appeared recently
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrendingKeyword {
    /// The keyword
    pub keyword: String,
    /// Number of occurrences
    pub frequency: u64,
}

/// Backend health report
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthStatus {
    /// `"healthy"` when the backend is up
    pub status: String,
    /// Backend clock at the time of the check
    pub timestamp: String,
}

/// Client for the dashboard's read-only endpoints
#[derive(Clone, Debug)]
pub struct DashboardClient {
    base_url: Url,
    http_client: reqwest::Client,
}

impl DashboardClient {
    /// Create a client for `base_url`
    ///
    /// # Errors
    ///
    /// Returns [`DashboardError::Transport`] if the URL does not parse or the
    /// HTTP client cannot be built.
    pub fn new(base_url: &str, connect_timeout: Duration) -> Result<Self, DashboardError> {
        let base_url = Url::parse(base_url)
            .map_err(|e| DashboardError::Transport(format!("invalid base URL {base_url}: {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(DashboardError::Transport(format!(
                "invalid base URL {base_url}"
            )));
        }

        let http_client = reqwest::Client::builder()
            .connect_timeout(connect_timeout)
            .build()
            .map_err(|e| DashboardError::Transport(e.to_string()))?;

        Ok(Self {
            base_url,
            http_client,
        })
    }

    /// Create from `BackendSettings`
    ///
    /// # Errors
    ///
    /// Same as [`DashboardClient::new`].
    pub fn from_settings(settings: &BackendSettings) -> Result<Self, DashboardError> {
        Self::new(
            &settings.base_url,
            Duration::from_millis(settings.connect_timeout_ms),
        )
    }

    /// Latest sentiment card per commodity
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the body does not decode.
    pub async fn sentiment_cards(&self) -> Result<Vec<SentimentCard>, DashboardError> {
        self.get(&["api", "dashboard", "sentiment-cards"], None).await
    }

    /// Daily sentiment and price for one commodity
    ///
    /// # Errors
    ///
    /// Returns [`DashboardError::NotFound`] when the backend has no series for
    /// `commodity`.
    pub async fn time_series(&self, commodity: &str) -> Result<Vec<TimeSeriesPoint>, DashboardError> {
        self.get(&["api", "dashboard", "time-series", commodity], Some(commodity))
            .await
    }

    /// Recent scored articles for one commodity
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the body does not decode.
    pub async fn news(&self, commodity: &str) -> Result<Vec<NewsArticle>, DashboardError> {
        self.get(&["api", "dashboard", "news", commodity], Some(commodity))
            .await
    }

    /// Trending keywords across all commodities
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the body does not decode.
    pub async fn trending_keywords(&self) -> Result<Vec<TrendingKeyword>, DashboardError> {
        self.get(&["api", "dashboard", "trending-keywords"], None).await
    }

    /// Trending keywords for one commodity
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the body does not decode.
    pub async fn trending_keywords_for(
        &self,
        commodity: &str,
    ) -> Result<Vec<TrendingKeyword>, DashboardError> {
        self.get(
            &["api", "dashboard", "trending-keywords", commodity],
            Some(commodity),
        )
        .await
    }

    /// Backend health check
    ///
    /// # Errors
    ///
    /// Returns an error if the backend is unreachable or unhealthy.
    pub async fn health(&self) -> Result<HealthStatus, DashboardError> {
        self.get(&["health"], None).await
    }

    /// Build `base_url` + segments, percent-encoding each segment
    fn url_for(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    async fn get<T: DeserializeOwned>(
        &self,
        segments: &[&str],
        commodity: Option<&str>,
    ) -> Result<T, DashboardError> {
        let url = self.url_for(segments);
        tracing::debug!(url = %url, "Dashboard request");

        let response = self
            .http_client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| DashboardError::Transport(e.to_string()))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            if let Some(commodity) = commodity {
                return Err(DashboardError::NotFound(commodity.to_string()));
            }
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(DashboardError::Transport(format!(
                "{url} returned {status}: {body}"
            )));
        }

        response
            .json::<T>()
            .await
            .map_err(|e| DashboardError::Decode(e.to_string()))
    }
}
