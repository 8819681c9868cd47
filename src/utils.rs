//! Text and time helpers shared by the scrapers and the aggregator.
//!
//! This module provides the small formatting rules every [`NewsItem`](crate::models::NewsItem)
//! goes through:
//! - Excerpt truncation and article-content capping
//! - Whitespace collapsing for scraped text
//! - Publish-date parsing and "N hours ago" rendering
//! - String truncation for log previews

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;

/// Maximum number of characters kept in an excerpt before the ellipsis is appended.
pub const EXCERPT_MAX_CHARS: usize = 300;

/// Marker appended to a truncated excerpt.
pub const ELLIPSIS: &str = "...";

/// Hard cap on scraped article text. No marker is appended.
pub const CONTENT_MAX_CHARS: usize = 2000;

/// Rendered when a publish date is missing or cannot be parsed.
pub const RECENTLY: &str = "Recently";

static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("static regex"));

/// Build an excerpt from a longer body.
///
/// Bodies longer than [`EXCERPT_MAX_CHARS`] characters keep their first 300 characters
/// followed by [`ELLIPSIS`]; shorter bodies are returned unchanged.
///
/// # Examples
///
/// ```
/// use airoam_news::utils::truncate_excerpt;
///
/// assert_eq!(truncate_excerpt("short body"), "short body");
/// assert_eq!(truncate_excerpt(&"a".repeat(500)).chars().count(), 303);
/// ```
pub fn truncate_excerpt(body: &str) -> String {
    if body.chars().count() > EXCERPT_MAX_CHARS {
        let mut excerpt: String = body.chars().take(EXCERPT_MAX_CHARS).collect();
        excerpt.push_str(ELLIPSIS);
        excerpt
    } else {
        body.to_string()
    }
}

/// Cap scraped article text at [`CONTENT_MAX_CHARS`] characters.
pub fn cap_content(text: &str) -> String {
    text.chars().take(CONTENT_MAX_CHARS).collect()
}

/// Collapse every run of whitespace into a single space and trim the ends.
pub fn collapse_whitespace(text: &str) -> String {
    WHITESPACE.replace_all(text, " ").trim().to_string()
}

/// Parse a publish date in any of the formats the sources emit.
///
/// Tries RFC 3339 (Atom feeds, `<time datetime>`), then RFC 2822 (RSS style),
/// then a bare `YYYY-MM-DDTHH:MM:SS` or `YYYY-MM-DD` which are taken as UTC.
pub fn parse_published(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S") {
        return Some(dt.and_utc());
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
}

/// Render the age of `published` relative to `now`.
///
/// Whole days win first (`"2 days ago"`), then whole hours (`"1 hours ago"`),
/// then whole minutes. Every unit is truncated, never rounded. Dates in the
/// future are treated as zero age.
pub fn relative_time_since(published: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let age = (now - published).num_seconds().max(0);
    let days = age / 86_400;
    let seconds = age % 86_400;

    if days >= 1 {
        format!("{days} days ago")
    } else if seconds >= 3600 {
        format!("{} hours ago", seconds / 3600)
    } else {
        format!("{} minutes ago", seconds / 60)
    }
}

/// Like [`relative_time_since`] but starting from a raw date string.
///
/// Returns [`RECENTLY`] when the string cannot be parsed.
pub fn relative_time(raw: &str, now: DateTime<Utc>) -> String {
    match parse_published(raw) {
        Some(published) => relative_time_since(published, now),
        None => RECENTLY.to_string(),
    }
}

/// Seconds-since-epoch used for ranking.
///
/// Missing or unparseable dates rank as `now`, which puts them at the top of the feed.
pub fn sort_timestamp(raw: Option<&str>, now: DateTime<Utc>) -> i64 {
    raw.and_then(parse_published).unwrap_or(now).timestamp()
}

/// Truncate a string for logging purposes.
///
/// Long strings are cut to `max` characters with an ellipsis and the number of
/// dropped characters appended.
pub fn truncate_for_log(s: &str, max: usize) -> String {
    let total = s.chars().count();
    if total <= max {
        s.to_string()
    } else {
        let head: String = s.chars().take(max).collect();
        format!("{}…(+{} chars)", head, total - max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_excerpt_long_body_is_cut_with_marker() {
        let body: String = ('a'..='z').cycle().take(500).collect();
        let excerpt = truncate_excerpt(&body);
        assert_eq!(excerpt.chars().count(), 303);
        assert_eq!(excerpt, format!("{}...", &body[..300]));
    }

    #[test]
    fn test_excerpt_short_body_unchanged() {
        let body = "b".repeat(200);
        assert_eq!(truncate_excerpt(&body), body);
    }

    #[test]
    fn test_excerpt_exactly_limit_unchanged() {
        let body = "c".repeat(300);
        assert_eq!(truncate_excerpt(&body), body);
    }

    #[test]
    fn test_excerpt_counts_characters_not_bytes() {
        let body = "é".repeat(301);
        let excerpt = truncate_excerpt(&body);
        assert_eq!(excerpt.chars().count(), 303);
        assert!(excerpt.ends_with("é..."));
    }

    #[test]
    fn test_cap_content() {
        let text = "x".repeat(2500);
        let capped = cap_content(&text);
        assert_eq!(capped.len(), 2000);
        assert!(!capped.ends_with("..."));
        assert_eq!(cap_content("tiny"), "tiny");
    }

    #[test]
    fn test_collapse_whitespace() {
        assert_eq!(collapse_whitespace("  hello \n\n\t world  "), "hello world");
        assert_eq!(collapse_whitespace(""), "");
    }

    #[test]
    fn test_parse_published_formats() {
        let expected = Utc.with_ymd_and_hms(2025, 5, 6, 14, 30, 0).unwrap();
        assert_eq!(parse_published("2025-05-06T14:30:00Z"), Some(expected));
        assert_eq!(parse_published("2025-05-06T16:30:00+02:00"), Some(expected));
        assert_eq!(parse_published("Tue, 06 May 2025 14:30:00 +0000"), Some(expected));
        assert_eq!(parse_published("2025-05-06T14:30:00"), Some(expected));
        assert_eq!(
            parse_published("2025-05-06"),
            Some(Utc.with_ymd_and_hms(2025, 5, 6, 0, 0, 0).unwrap())
        );
        assert_eq!(parse_published("yesterday-ish"), None);
        assert_eq!(parse_published("   "), None);
    }

    #[test]
    fn test_relative_time_days() {
        let published = now() - Duration::days(2);
        assert_eq!(relative_time_since(published, now()), "2 days ago");
    }

    #[test]
    fn test_relative_time_hours_truncates() {
        let published = now() - Duration::minutes(90);
        assert_eq!(relative_time_since(published, now()), "1 hours ago");
    }

    #[test]
    fn test_relative_time_minutes() {
        let published = now() - Duration::minutes(59) - Duration::seconds(59);
        assert_eq!(relative_time_since(published, now()), "59 minutes ago");
        assert_eq!(relative_time_since(now(), now()), "0 minutes ago");
    }

    #[test]
    fn test_relative_time_future_is_zero_age() {
        let published = now() + Duration::hours(3);
        assert_eq!(relative_time_since(published, now()), "0 minutes ago");
    }

    #[test]
    fn test_relative_time_unparseable() {
        assert_eq!(relative_time("not a date", now()), "Recently");
        assert_eq!(relative_time("2025-05-30T12:00:00Z", now()), "2 days ago");
    }

    #[test]
    fn test_sort_timestamp_defaults_to_now() {
        assert_eq!(sort_timestamp(None, now()), now().timestamp());
        assert_eq!(sort_timestamp(Some("garbage"), now()), now().timestamp());
        let ts = sort_timestamp(Some("2025-05-06T14:30:00Z"), now());
        assert_eq!(ts, Utc.with_ymd_and_hms(2025, 5, 6, 14, 30, 0).unwrap().timestamp());
    }

    #[test]
    fn test_truncate_for_log_short_string() {
        assert_eq!(truncate_for_log("Hello, world!", 100), "Hello, world!");
    }

    #[test]
    fn test_truncate_for_log_long_string() {
        let s = "a".repeat(500);
        let result = truncate_for_log(&s, 100);
        assert!(result.starts_with(&"a".repeat(100)));
        assert!(result.contains("…(+400 chars)"));
    }
}
