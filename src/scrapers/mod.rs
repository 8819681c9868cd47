//! News sources feeding the aggregator.
//!
//! Every source implements [`NewsSource`] and returns fully normalized
//! [`NewsItem`]s; the aggregator only merges and ranks.
//!
//! # Supported Sources
//!
//! | Source | Module | Method | Notes |
//! |--------|--------|--------|-------|
//! | arXiv | [`arxiv`] | Atom API + abstract pages | One query per run, abstract pages fetched concurrently |
//! | Blogs | [`blog`] | HTML scraping | Bounded number of `article` elements per page |
//! | Curated | [`curated`] | Hard-coded | Seed content with synthesized timestamps |
//!
//! Sources report failures as [`SourceError`]; isolating them from each other
//! is the aggregator's job.

use std::future::Future;
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::future::BoxFuture;
use reqwest::Client;
use tokio::time::{Instant, timeout_at};
use tracing::{debug, warn};

use crate::config::AggregatorConfig;
use crate::error::SourceError;
use crate::models::NewsItem;

pub mod arxiv;
pub mod blog;
pub mod curated;

/// Shared inputs of one aggregation run.
#[derive(Debug, Clone)]
pub struct FetchContext {
    pub client: Client,
    /// Reference time for relative ages and synthesized timestamps.
    pub now: DateTime<Utc>,
    /// Point after which per-item follow-up fetches are abandoned. Sits
    /// before the run deadline so a source can still return what it has.
    pub follow_up_deadline: Instant,
}

impl FetchContext {
    /// Context with no practical limit on follow-up fetches.
    pub fn new(client: Client, now: DateTime<Utc>) -> Self {
        Self {
            client,
            now,
            follow_up_deadline: Instant::now() + Duration::from_secs(60 * 60 * 24),
        }
    }

    /// Stop follow-up fetches at `deadline`.
    pub fn with_follow_up_deadline(mut self, deadline: Instant) -> Self {
        self.follow_up_deadline = deadline;
        self
    }

    /// Run a follow-up fetch, giving up with `None` once the follow-up deadline passes.
    ///
    /// # Arguments
    ///
    /// * `url` - Page being fetched, for the log line
    /// * `fetch` - The fetch itself; `None` already means "use the fallback"
    pub(crate) async fn follow_up<F>(&self, url: &str, fetch: F) -> Option<String>
    where
        F: Future<Output = Option<String>>,
    {
        match timeout_at(self.follow_up_deadline, fetch).await {
            Ok(text) => text,
            Err(_) => {
                warn!(%url, "Follow-up fetch ran out of time; using fallback content");
                None
            }
        }
    }
}

/// A feed contributing candidate items to an aggregation run.
pub trait NewsSource: Send + Sync {
    /// Label used in logs and per-source reports.
    fn name(&self) -> &str;

    /// Fetch and normalize this source's items.
    fn fetch<'a>(&'a self, ctx: &'a FetchContext) -> BoxFuture<'a, Result<Vec<NewsItem>, SourceError>>;
}

/// Instantiate the sources named by `config`, in merge order.
pub fn build_sources(config: &AggregatorConfig) -> Vec<Box<dyn NewsSource>> {
    let mut sources: Vec<Box<dyn NewsSource>> = Vec::new();
    if let Some(arxiv) = &config.arxiv {
        sources.push(Box::new(arxiv::ArxivSource::new(arxiv.clone())));
    }
    for blog in &config.blogs {
        sources.push(Box::new(blog::BlogSource::new(blog.clone())));
    }
    if config.curated {
        sources.push(Box::new(curated::CuratedSource));
    }
    sources
}

/// GET `url` and return the body, treating non-2xx statuses as errors.
pub(crate) async fn get_text(client: &Client, url: &str) -> Result<String, SourceError> {
    let response = client.get(url).send().await?;
    let status = response.status();
    if !status.is_success() {
        return Err(SourceError::Status {
            status: status.as_u16(),
            url: url.to_string(),
        });
    }
    let body = response.text().await?;
    debug!(%url, bytes = body.len(), "Fetched page");
    Ok(body)
}
