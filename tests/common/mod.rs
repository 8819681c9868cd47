#![allow(dead_code)]

use std::time::Duration;

use airoam_news::config::{AggregatorConfig, ArxivConfig, BlogConfig};
use airoam_news::error::SourceError;
use airoam_news::scrapers::{FetchContext, NewsSource};
use airoam_news::{NewsAggregator, NewsItem};
use chrono::{DateTime, TimeZone, Utc};
use futures::future::BoxFuture;
use httpmock::{Method::GET, Mock, MockServer};

pub fn fixture(name: &str) -> String {
    let path = format!("{}/tests/fixtures/{}", env!("CARGO_MANIFEST_DIR"), name);
    std::fs::read_to_string(&path).unwrap_or_else(|e| panic!("missing fixture {path}: {e}"))
}

/// Reference time a few days after the fixture publish dates.
pub fn fixed_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap()
}

pub fn arxiv_config(server: &MockServer) -> ArxivConfig {
    ArxivConfig {
        base_url: server.url("/api/query"),
        category: "cs.AI".to_string(),
        max_results: 20,
        fetch_abstracts: true,
    }
}

pub fn blog_config(server: &MockServer) -> BlogConfig {
    BlogConfig::new("Lab Blog", server.url("/blog/"))
}

pub fn config(arxiv: Option<ArxivConfig>, blogs: Vec<BlogConfig>, curated: bool) -> AggregatorConfig {
    AggregatorConfig {
        arxiv,
        blogs,
        curated,
        request_timeout_secs: 5,
        aggregate_timeout_secs: 10,
        ..AggregatorConfig::default()
    }
}

pub fn aggregator(config: &AggregatorConfig) -> NewsAggregator {
    NewsAggregator::new(config).expect("client builds")
}

pub async fn mock_arxiv_feed(server: &MockServer) -> Mock<'_> {
    let body = fixture("arxiv_feed.xml").replace("{{BASE}}", &server.base_url());
    server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/api/query")
                .query_param("search_query", "cat:cs.AI")
                .query_param("sortBy", "lastUpdatedDate")
                .query_param("sortOrder", "descending")
                .query_param("max_results", "20");
            then.status(200)
                .header("content-type", "application/atom+xml")
                .body(body);
        })
        .await
}

pub async fn mock_arxiv_abstract(server: &MockServer) -> Mock<'_> {
    server
        .mock_async(|when, then| {
            when.method(GET).path("/abs/2505.11111v1");
            then.status(200)
                .header("content-type", "text/html")
                .body(fixture("arxiv_abstract.html"));
        })
        .await
}

pub async fn mock_blog(server: &MockServer) -> (Mock<'_>, Mock<'_>) {
    let index = server
        .mock_async(|when, then| {
            when.method(GET).path("/blog/");
            then.status(200)
                .header("content-type", "text/html")
                .body(fixture("blog_index.html"));
        })
        .await;
    let post = server
        .mock_async(|when, then| {
            when.method(GET).path("/blog/eval-suite");
            then.status(200)
                .header("content-type", "text/html")
                .body(fixture("blog_post.html"));
        })
        .await;
    (index, post)
}

pub async fn mock_failure<'a>(server: &'a MockServer, path: &str) -> Mock<'a> {
    let path = path.to_string();
    server
        .mock_async(move |when, then| {
            when.method(GET).path(path.as_str());
            then.status(500).body("upstream exploded");
        })
        .await
}

pub fn is_sorted_desc(items: &[NewsItem]) -> bool {
    items.windows(2).all(|w| w[0].timestamp >= w[1].timestamp)
}

/// In-memory source returning fixed items.
pub struct StaticSource {
    pub name: &'static str,
    pub items: Vec<NewsItem>,
}

impl NewsSource for StaticSource {
    fn name(&self) -> &str {
        self.name
    }

    fn fetch<'a>(&'a self, _ctx: &'a FetchContext) -> BoxFuture<'a, Result<Vec<NewsItem>, SourceError>> {
        Box::pin(async move { Ok(self.items.clone()) })
    }
}

/// Source that always fails with a 503.
pub struct DownSource;

impl NewsSource for DownSource {
    fn name(&self) -> &str {
        "Down"
    }

    fn fetch<'a>(&'a self, _ctx: &'a FetchContext) -> BoxFuture<'a, Result<Vec<NewsItem>, SourceError>> {
        Box::pin(async move {
            Err(SourceError::Status {
                status: 503,
                url: "http://down.invalid/".to_string(),
            })
        })
    }
}

pub fn stub_item(title: &str, category: &str, timestamp: i64) -> NewsItem {
    NewsItem::new(title, "Stub body.", category, "Stub", "Recently", "#", timestamp)
}

pub fn stub_aggregator(sources: Vec<Box<dyn NewsSource>>) -> NewsAggregator {
    NewsAggregator::with_sources(sources, reqwest::Client::new(), Duration::from_secs(5))
}
