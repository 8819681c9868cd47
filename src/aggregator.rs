//! Multi-source news aggregation.
//!
//! One aggregation run polls every configured [`NewsSource`] concurrently, each
//! behind its own failure boundary, then merges the successful contributions:
//!
//! 1. **Fetch**: all sources at once, bounded by a shared run deadline
//! 2. **Report**: one [`SourceReport`] per source, logged, never returned to clients
//! 3. **Merge**: concatenate in source order, stable sort by timestamp descending
//! 4. **Truncate**: keep the first [`MAX_ITEMS`]
//!
//! When no source contributes (all failed, or none configured) the run yields the
//! fixed [`fallback_items`] instead of an error.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::FutureExt;
use futures::future::join_all;
use reqwest::Client;
use tokio::time::{Instant, timeout_at};
use tracing::{error, info, instrument, warn};

use crate::config::AggregatorConfig;
use crate::error::{AggregateError, LookupError, SourceError};
use crate::models::{NewsItem, fallback_items};
use crate::scrapers::{FetchContext, NewsSource, build_sources};

/// Maximum number of items in one feed.
pub const MAX_ITEMS: usize = 50;

/// What a single source did during a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceOutcome {
    Fetched { items: usize },
    Failed { reason: String },
}

/// Per-source result of one run, for logs.
#[derive(Debug, Clone)]
pub struct SourceReport {
    pub source: String,
    pub outcome: SourceOutcome,
    pub elapsed: Duration,
}

impl SourceReport {
    /// Whether the source contributed, even with zero items.
    pub fn is_success(&self) -> bool {
        matches!(self.outcome, SourceOutcome::Fetched { .. })
    }
}

/// Everything one aggregation run produced.
#[derive(Debug)]
pub struct AggregationRun {
    pub items: Vec<NewsItem>,
    pub reports: Vec<SourceReport>,
    pub generated_at: DateTime<Utc>,
    /// True when `items` is the fallback feed.
    pub fallback: bool,
}

/// Combines the configured sources into one ranked feed.
pub struct NewsAggregator {
    sources: Vec<Box<dyn NewsSource>>,
    client: Client,
    aggregate_timeout: Duration,
}

impl std::fmt::Debug for NewsAggregator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NewsAggregator")
            .field(
                "sources",
                &self.sources.iter().map(|s| s.name()).collect::<Vec<_>>(),
            )
            .field("aggregate_timeout", &self.aggregate_timeout)
            .finish()
    }
}

impl NewsAggregator {
    /// Build the HTTP client and the sources described by `config`.
    pub fn new(config: &AggregatorConfig) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .timeout(config.request_timeout())
            .user_agent(config.user_agent.clone())
            .build()?;
        Ok(Self::with_sources(
            build_sources(config),
            client,
            config.aggregate_timeout(),
        ))
    }

    /// Assemble an aggregator from already built sources.
    pub fn with_sources(
        sources: Vec<Box<dyn NewsSource>>,
        client: Client,
        aggregate_timeout: Duration,
    ) -> Self {
        Self {
            sources,
            client,
            aggregate_timeout,
        }
    }

    /// Run the whole pipeline now and return the ranked feed.
    pub async fn aggregate(&self) -> Vec<NewsItem> {
        self.run_at(Utc::now()).await.items
    }

    /// Positional lookup into a freshly aggregated feed.
    ///
    /// The feed is rebuilt on every call, so the same index can name a
    /// different story once the upstream sources change.
    pub async fn get_by_id(&self, index: i64) -> Result<NewsItem, LookupError> {
        lookup(self.aggregate().await, index)
    }

    /// Run the pipeline with `now` as the reference time.
    #[instrument(level = "info", skip(self), fields(sources = self.sources.len()))]
    pub async fn run_at(&self, now: DateTime<Utc>) -> AggregationRun {
        let started = std::time::Instant::now();
        let (contributions, reports) = self.collect(now).await;

        let result = if reports.is_empty() {
            Err(AggregateError::NoSources)
        } else if reports.iter().all(|r| !r.is_success()) {
            Err(AggregateError::AllSourcesFailed {
                count: reports.len(),
            })
        } else {
            Ok(merge(contributions))
        };

        let (items, fallback) = match result {
            Ok(items) => (items, false),
            Err(e) => {
                error!(error = %e, "Aggregation failed; serving fallback feed");
                (fallback_items(now), true)
            }
        };

        info!(
            items = items.len(),
            succeeded = reports.iter().filter(|r| r.is_success()).count(),
            failed = reports.iter().filter(|r| !r.is_success()).count(),
            fallback,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Aggregation run complete"
        );

        AggregationRun {
            items,
            reports,
            generated_at: now,
            fallback,
        }
    }

    /// Poll every source concurrently, isolating failures, timeouts and panics.
    async fn collect(&self, now: DateTime<Utc>) -> (Vec<Vec<NewsItem>>, Vec<SourceReport>) {
        let run_start = Instant::now();
        let deadline = run_start + self.aggregate_timeout;
        let ctx = FetchContext::new(self.client.clone(), now)
            .with_follow_up_deadline(run_start + follow_up_budget(self.aggregate_timeout));
        let deadline_secs = self.aggregate_timeout.as_secs();

        let fetches = self.sources.iter().map(|source| {
            let ctx = &ctx;
            async move {
                let started = std::time::Instant::now();
                let guarded = AssertUnwindSafe(source.fetch(ctx)).catch_unwind();
                let result = match timeout_at(deadline, guarded).await {
                    Ok(Ok(result)) => result,
                    Ok(Err(panic)) => Err(SourceError::Panicked(panic_message(panic))),
                    Err(_) => Err(SourceError::Deadline {
                        secs: deadline_secs,
                    }),
                };
                (source.name().to_string(), result, started.elapsed())
            }
        });

        let mut contributions = Vec::with_capacity(self.sources.len());
        let mut reports = Vec::with_capacity(self.sources.len());
        for (source, result, elapsed) in join_all(fetches).await {
            let outcome = match result {
                Ok(items) => {
                    info!(%source, items = items.len(), elapsed_ms = elapsed.as_millis() as u64, "Source fetched");
                    let outcome = SourceOutcome::Fetched { items: items.len() };
                    contributions.push(items);
                    outcome
                }
                Err(e) => {
                    warn!(%source, error = %e, elapsed_ms = elapsed.as_millis() as u64, "Source failed; skipping");
                    SourceOutcome::Failed {
                        reason: e.to_string(),
                    }
                }
            };
            reports.push(SourceReport {
                source,
                outcome,
                elapsed,
            });
        }
        (contributions, reports)
    }
}

/// Share of the run budget follow-up fetches may use, leaving the rest for
/// sources to build items from what they already have.
fn follow_up_budget(run: Duration) -> Duration {
    run * 4 / 5
}

fn panic_message(panic: Box<dyn Any + Send>) -> String {
    panic
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| panic.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string())
}

/// Concatenate contributions in order, rank newest first, keep [`MAX_ITEMS`].
///
/// The sort is stable, so items with equal timestamps keep their merge order.
pub fn merge(contributions: Vec<Vec<NewsItem>>) -> Vec<NewsItem> {
    let mut items: Vec<NewsItem> = contributions.into_iter().flatten().collect();
    items.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    items.truncate(MAX_ITEMS);
    items
}

/// Zero-based positional lookup; negative or out-of-range indexes are not found.
pub fn lookup(items: Vec<NewsItem>, index: i64) -> Result<NewsItem, LookupError> {
    let index = usize::try_from(index).map_err(|_| LookupError::NotFound)?;
    items.into_iter().nth(index).ok_or(LookupError::NotFound)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::FALLBACK_TITLE;
    use crate::scrapers::curated::CuratedSource;
    use chrono::TimeZone;
    use futures::future::BoxFuture;

    fn item(title: &str, timestamp: i64) -> NewsItem {
        NewsItem::new(title, "body", "Research", "Stub", "Recently", "#", timestamp)
    }

    struct StubSource {
        name: &'static str,
        items: Vec<NewsItem>,
    }

    impl NewsSource for StubSource {
        fn name(&self) -> &str {
            self.name
        }

        fn fetch<'a>(&'a self, _ctx: &'a FetchContext) -> BoxFuture<'a, Result<Vec<NewsItem>, SourceError>> {
            Box::pin(async move { Ok(self.items.clone()) })
        }
    }

    struct FailingSource;

    impl NewsSource for FailingSource {
        fn name(&self) -> &str {
            "Failing"
        }

        fn fetch<'a>(&'a self, _ctx: &'a FetchContext) -> BoxFuture<'a, Result<Vec<NewsItem>, SourceError>> {
            Box::pin(async move {
                Err(SourceError::Status {
                    status: 503,
                    url: "http://upstream.invalid/".to_string(),
                })
            })
        }
    }

    struct PanickingSource;

    impl NewsSource for PanickingSource {
        fn name(&self) -> &str {
            "Panicking"
        }

        fn fetch<'a>(&'a self, _ctx: &'a FetchContext) -> BoxFuture<'a, Result<Vec<NewsItem>, SourceError>> {
            Box::pin(async move { Ok(explode()) })
        }
    }

    fn explode() -> Vec<NewsItem> {
        panic!("parser exploded")
    }

    struct SlowSource;

    impl NewsSource for SlowSource {
        fn name(&self) -> &str {
            "Slow"
        }

        fn fetch<'a>(&'a self, _ctx: &'a FetchContext) -> BoxFuture<'a, Result<Vec<NewsItem>, SourceError>> {
            Box::pin(async move {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Ok(vec![item("never", 0)])
            })
        }
    }

    /// Index fetch succeeds; the per-item follow-up never answers.
    struct StalledFollowUpSource;

    impl NewsSource for StalledFollowUpSource {
        fn name(&self) -> &str {
            "Stalled"
        }

        fn fetch<'a>(&'a self, ctx: &'a FetchContext) -> BoxFuture<'a, Result<Vec<NewsItem>, SourceError>> {
            Box::pin(async move {
                let full = ctx
                    .follow_up("http://slow.invalid/abs/1", async {
                        tokio::time::sleep(Duration::from_secs(3600)).await;
                        Some("full text".to_string())
                    })
                    .await;
                let summary = item("summary only", 7);
                Ok(vec![match full {
                    Some(text) => summary.with_content(text),
                    None => summary,
                }])
            })
        }
    }

    fn aggregator(sources: Vec<Box<dyn NewsSource>>) -> NewsAggregator {
        NewsAggregator::with_sources(sources, Client::new(), Duration::from_secs(5))
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap()
    }

    fn is_sorted_desc(items: &[NewsItem]) -> bool {
        items.windows(2).all(|w| w[0].timestamp >= w[1].timestamp)
    }

    #[test]
    fn test_merge_sorts_descending_and_is_stable() {
        let merged = merge(vec![
            vec![item("a", 10), item("b", 30)],
            vec![item("c", 20), item("d", 30)],
        ]);
        let titles: Vec<&str> = merged.iter().map(|i| i.title.as_str()).collect();
        assert_eq!(titles, vec!["b", "d", "c", "a"]);
    }

    #[test]
    fn test_merge_truncates_to_max_items() {
        let many: Vec<NewsItem> = (0..80).map(|i| item(&format!("n{i}"), i)).collect();
        let merged = merge(vec![many]);
        assert_eq!(merged.len(), MAX_ITEMS);
        assert_eq!(merged[0].timestamp, 79);
        assert!(is_sorted_desc(&merged));
    }

    #[test]
    fn test_lookup_bounds() {
        let items = vec![item("first", 2), item("second", 1)];
        assert_eq!(lookup(items.clone(), 0).unwrap().title, "first");
        assert_eq!(lookup(items.clone(), 1).unwrap().title, "second");
        assert_eq!(lookup(items.clone(), 2), Err(LookupError::NotFound));
        assert_eq!(lookup(items, -1), Err(LookupError::NotFound));
    }

    #[tokio::test]
    async fn test_failed_source_does_not_block_others() {
        let agg = aggregator(vec![Box::new(FailingSource), Box::new(CuratedSource)]);
        let run = agg.run_at(now()).await;
        assert!(!run.fallback);
        assert_eq!(run.items.len(), 7);
        assert!(is_sorted_desc(&run.items));
        assert_eq!(run.reports.len(), 2);
        assert!(!run.reports[0].is_success());
        assert!(matches!(
            &run.reports[0].outcome,
            SourceOutcome::Failed { reason } if reason.contains("503")
        ));
        assert_eq!(run.reports[1].outcome, SourceOutcome::Fetched { items: 7 });
    }

    #[tokio::test]
    async fn test_all_sources_failing_yields_fallback() {
        let agg = aggregator(vec![Box::new(FailingSource), Box::new(PanickingSource)]);
        let run = agg.run_at(now()).await;
        assert!(run.fallback);
        assert_eq!(run.items.len(), 1);
        assert_eq!(run.items[0].title, FALLBACK_TITLE);
        assert!(matches!(
            &run.reports[1].outcome,
            SourceOutcome::Failed { reason } if reason.contains("parser exploded")
        ));
    }

    #[tokio::test]
    async fn test_no_sources_yields_fallback() {
        let items = aggregator(Vec::new()).aggregate().await;
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].title, FALLBACK_TITLE);
    }

    #[tokio::test]
    async fn test_successful_empty_source_is_not_a_failure() {
        let agg = aggregator(vec![Box::new(StubSource {
            name: "Empty",
            items: Vec::new(),
        })]);
        let run = agg.run_at(now()).await;
        assert!(!run.fallback);
        assert!(run.items.is_empty());
        assert_eq!(agg.get_by_id(0).await, Err(LookupError::NotFound));
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_source_hits_deadline_without_cancelling_siblings() {
        let agg = aggregator(vec![
            Box::new(SlowSource),
            Box::new(StubSource {
                name: "Fast",
                items: vec![item("fast", 5)],
            }),
        ]);
        let run = agg.run_at(now()).await;
        assert!(!run.fallback);
        assert_eq!(run.items.len(), 1);
        assert_eq!(run.items[0].title, "fast");
        assert_eq!(
            run.reports[0].outcome,
            SourceOutcome::Failed {
                reason: "Source did not finish within the 5s aggregation deadline".to_string()
            }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_stalled_follow_up_keeps_partial_items() {
        let agg = aggregator(vec![Box::new(StalledFollowUpSource)]);
        let run = agg.run_at(now()).await;
        assert!(!run.fallback);
        assert!(run.reports[0].is_success());
        assert_eq!(run.items.len(), 1);
        assert_eq!(run.items[0].title, "summary only");
        assert_eq!(run.items[0].content, "body");
        assert!(run.reports[0].elapsed < Duration::from_secs(5));
    }

    #[test]
    fn test_follow_up_budget_leaves_headroom() {
        assert_eq!(follow_up_budget(Duration::from_secs(30)), Duration::from_secs(24));
        assert!(follow_up_budget(Duration::from_secs(1)) < Duration::from_secs(1));
    }

    #[tokio::test]
    async fn test_repeated_runs_are_deterministic() {
        let sources = || -> Vec<Box<dyn NewsSource>> {
            vec![
                Box::new(StubSource {
                    name: "One",
                    items: vec![item("a", 100), item("b", 50)],
                }),
                Box::new(CuratedSource),
                Box::new(StubSource {
                    name: "Two",
                    items: vec![item("c", 100)],
                }),
            ]
        };
        let first = aggregator(sources()).run_at(now()).await.items;
        let second = aggregator(sources()).run_at(now()).await.items;
        assert_eq!(first, second);
        assert!(is_sorted_desc(&first));
    }

    #[tokio::test]
    async fn test_get_by_id_indexes_fresh_feed() {
        let agg = aggregator(vec![Box::new(StubSource {
            name: "One",
            items: vec![item("older", 1), item("newer", 2)],
        })]);
        assert_eq!(agg.get_by_id(0).await.unwrap().title, "newer");
        assert_eq!(agg.get_by_id(1).await.unwrap().title, "older");
        assert_eq!(agg.get_by_id(2).await, Err(LookupError::NotFound));
        assert_eq!(agg.get_by_id(-1).await, Err(LookupError::NotFound));
    }
}
