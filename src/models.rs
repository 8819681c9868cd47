//! Data models for the news feed and its HTTP payloads.
//!
//! - [`NewsItem`]: one normalized entry of the aggregated feed
//! - [`NewsListResponse`]: body of the list endpoint
//! - [`ErrorBody`]: structured error body returned with 4xx/5xx statuses

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::utils::{relative_time_since, truncate_excerpt};

/// Link used when an item has no original page to point at.
pub const PLACEHOLDER_URL: &str = "#";

/// Image path rendered by the frontend card for every item.
pub const PLACEHOLDER_IMAGE: &str = "/api/placeholder/400/200";

/// A single normalized news entry.
///
/// Items are rebuilt from scratch on every aggregation run; their only identity
/// is their position in the ranked feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewsItem {
    pub title: String,
    /// At most 300 characters of the body, plus `...` when cut.
    pub excerpt: String,
    /// Full body text; falls back to the untruncated excerpt source.
    pub content: String,
    /// Open-ended label such as "Research", "Breaking" or "Industry".
    pub category: String,
    /// Short label of the feed the item came from.
    pub source: String,
    /// Human-readable age ("3 hours ago"), computed when the feed is built.
    #[serde(rename = "time")]
    pub display_time: String,
    pub url: String,
    pub image: String,
    /// Seconds since the epoch, only used for ranking.
    pub timestamp: i64,
}

impl NewsItem {
    /// Build an item whose excerpt is derived from `body`.
    ///
    /// `content` defaults to the whole body; use [`NewsItem::with_content`] when the
    /// source has a fuller text than the one the excerpt is cut from.
    pub fn new(
        title: impl Into<String>,
        body: &str,
        category: impl Into<String>,
        source: impl Into<String>,
        display_time: impl Into<String>,
        url: impl Into<String>,
        timestamp: i64,
    ) -> Self {
        let url = url.into();
        Self {
            title: title.into(),
            excerpt: truncate_excerpt(body),
            content: body.to_string(),
            category: category.into(),
            source: source.into(),
            display_time: display_time.into(),
            url: if url.trim().is_empty() {
                PLACEHOLDER_URL.to_string()
            } else {
                url
            },
            image: PLACEHOLDER_IMAGE.to_string(),
            timestamp,
        }
    }

    /// Replace the full body, keeping the excerpt as built.
    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        let content = content.into();
        if !content.trim().is_empty() {
            self.content = content;
        }
        self
    }

    /// True when the item's category matches `category`, ignoring case.
    pub fn in_category(&self, category: &str) -> bool {
        self.category.eq_ignore_ascii_case(category.trim())
    }
}

/// Title of the single item served when no source could contribute.
pub const FALLBACK_TITLE: &str = "AI news feed is temporarily unavailable";

/// The fixed sequence returned when an aggregation run fails as a whole.
pub fn fallback_items(now: DateTime<Utc>) -> Vec<NewsItem> {
    let body = "Live sources could not be reached right now. \
                Check back in a few minutes for the latest research, industry and policy news.";
    vec![NewsItem::new(
        FALLBACK_TITLE,
        body,
        "Breaking",
        "Airoam",
        relative_time_since(now, now),
        PLACEHOLDER_URL,
        now.timestamp(),
    )]
}

/// Body of `GET /api/news/`.
#[derive(Debug, Serialize, Deserialize)]
pub struct NewsListResponse {
    pub news: Vec<NewsItem>,
    pub total_count: usize,
    /// ISO 8601 time the feed was built.
    pub last_updated: String,
}

impl NewsListResponse {
    /// Wrap a feed for the list endpoint.
    ///
    /// # Arguments
    ///
    /// * `news` - Items in feed order; `total_count` is their number
    /// * `last_updated` - When the feed was built, rendered as RFC 3339 in UTC
    pub fn new(news: Vec<NewsItem>, last_updated: DateTime<Utc>) -> Self {
        Self {
            total_count: news.len(),
            news,
            last_updated: last_updated.to_rfc3339_opts(SecondsFormat::Secs, true),
        }
    }
}

/// Structured error body, e.g. `{"error": "News article not found"}`.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

impl ErrorBody {
    /// Body carrying `error` as its message.
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}
