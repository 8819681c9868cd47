//! Blog-style HTML page scraper.
//!
//! Indexes a listing page for a bounded number of article elements, then
//! optionally fetches each linked article and keeps its visible text.
//!
//! # Extraction rules
//!
//! - Title: first `h1`, `h2` or `h3` inside the article element, else the link text
//! - Link: first `a[href]`, resolved against the listing page URL
//! - Published: `time[datetime]` (or the `time` element's text) when present
//! - Content: body text without `script`/`style`/`noscript`, whitespace-collapsed,
//!   capped at 2000 characters

use futures::future::BoxFuture;
use futures::stream::{self, StreamExt};
use itertools::Itertools;
use once_cell::sync::Lazy;
use reqwest::Client;
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, info, instrument, warn};
use url::Url;

use super::{FetchContext, NewsSource, get_text};
use crate::config::BlogConfig;
use crate::error::SourceError;
use crate::models::{NewsItem, PLACEHOLDER_URL};
use crate::utils::{cap_content, collapse_whitespace, relative_time, sort_timestamp};

/// Article pages fetched at the same time.
const ARTICLE_CONCURRENCY: usize = 4;

/// Elements whose text is never shown to a reader.
const HIDDEN_ELEMENTS: [&str; 3] = ["script", "style", "noscript"];

static HEADING_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("h1, h2, h3").expect("static selector"));
static LINK_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("a[href]").expect("static selector"));
static TIME_SELECTOR: Lazy<Selector> = Lazy::new(|| Selector::parse("time").expect("static selector"));
static BODY_SELECTOR: Lazy<Selector> = Lazy::new(|| Selector::parse("body").expect("static selector"));

/// An article discovered on a listing page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlogLink {
    pub title: String,
    /// Absolute article URL, or `None` when the element had no usable link.
    pub url: Option<String>,
    pub published: Option<String>,
}

/// Find up to `max_articles` articles on a listing page.
///
/// Elements without a title are skipped; repeated links keep their first occurrence.
pub fn parse_index(
    html: &str,
    base: &Url,
    article_selector: &str,
    max_articles: usize,
) -> Result<Vec<BlogLink>, SourceError> {
    let selector = Selector::parse(article_selector)
        .map_err(|_| SourceError::Selector(article_selector.to_string()))?;
    let document = Html::parse_document(html);

    let links = document
        .select(&selector)
        .take(max_articles)
        .filter_map(|article| extract_link(article, base))
        .unique_by(|link| link.url.clone().unwrap_or_else(|| link.title.clone()))
        .collect();
    Ok(links)
}

fn extract_link(article: ElementRef<'_>, base: &Url) -> Option<BlogLink> {
    let anchor = article.select(&LINK_SELECTOR).next();
    let heading = article
        .select(&HEADING_SELECTOR)
        .map(|h| collapse_whitespace(&h.text().collect::<String>()))
        .find(|t| !t.is_empty());
    let title = heading.or_else(|| {
        anchor
            .map(|a| collapse_whitespace(&a.text().collect::<String>()))
            .filter(|t| !t.is_empty())
    })?;

    let url = anchor
        .and_then(|a| a.value().attr("href"))
        .and_then(|href| base.join(href).ok())
        .map(|u| u.to_string());
    let published = article.select(&TIME_SELECTOR).next().and_then(|t| {
        t.value()
            .attr("datetime")
            .map(str::to_string)
            .or_else(|| Some(collapse_whitespace(&t.text().collect::<String>())))
            .filter(|s| !s.is_empty())
    });

    Some(BlogLink {
        title,
        url,
        published,
    })
}

/// Visible text of a page: body text minus scripts and styles, collapsed and capped.
pub fn extract_visible_text(html: &str) -> String {
    let document = Html::parse_document(html);
    let root = document
        .select(&BODY_SELECTOR)
        .next()
        .unwrap_or_else(|| document.root_element());

    let mut parts: Vec<&str> = Vec::new();
    for node in root.descendants() {
        let Some(text) = node.value().as_text() else {
            continue;
        };
        let hidden = node.ancestors().any(|a| {
            a.value()
                .as_element()
                .is_some_and(|e| HIDDEN_ELEMENTS.contains(&e.name()))
        });
        if !hidden {
            parts.push(text);
        }
    }
    cap_content(&collapse_whitespace(&parts.join(" ")))
}

/// One configured blog page.
#[derive(Debug, Clone)]
pub struct BlogSource {
    config: BlogConfig,
}

impl BlogSource {
    /// Create a source for one configured blog page.
    pub fn new(config: BlogConfig) -> Self {
        Self { config }
    }

    #[instrument(level = "info", skip_all, fields(source = %self.config.name, url = %self.config.url))]
    async fn fetch_items(&self, ctx: &FetchContext) -> Result<Vec<NewsItem>, SourceError> {
        let base = Url::parse(&self.config.url)?;
        let html = get_text(&ctx.client, base.as_str()).await?;
        let links = parse_index(
            &html,
            &base,
            &self.config.article_selector,
            self.config.max_articles,
        )?;
        info!(count = links.len(), "Indexed blog articles");
        debug!(links = ?links, "Blog links");

        let fetch_content = self.config.fetch_content;
        let items: Vec<NewsItem> = stream::iter(links)
            .map(|link| async move {
                let text = match (&link.url, fetch_content) {
                    (Some(url), true) => {
                        ctx.follow_up(url, fetch_article_text(&ctx.client, url)).await
                    }
                    _ => None,
                };
                self.link_to_item(link, text, ctx)
            })
            .buffered(ARTICLE_CONCURRENCY)
            .collect()
            .await;

        info!(count = items.len(), "Built blog items");
        Ok(items)
    }

    fn link_to_item(&self, link: BlogLink, text: Option<String>, ctx: &FetchContext) -> NewsItem {
        let body = text.unwrap_or_else(|| link.title.clone());
        let published = link.published.as_deref();
        NewsItem::new(
            link.title,
            &body,
            self.config.category.clone(),
            self.config.name.clone(),
            relative_time(published.unwrap_or_default(), ctx.now),
            link.url.unwrap_or_else(|| PLACEHOLDER_URL.to_string()),
            sort_timestamp(published, ctx.now),
        )
    }
}

impl NewsSource for BlogSource {
    fn name(&self) -> &str {
        &self.config.name
    }

    fn fetch<'a>(&'a self, ctx: &'a FetchContext) -> BoxFuture<'a, Result<Vec<NewsItem>, SourceError>> {
        Box::pin(self.fetch_items(ctx))
    }
}

/// Fetch one article page; failures and empty pages yield `None`.
#[instrument(level = "debug", skip(client))]
async fn fetch_article_text(client: &Client, url: &str) -> Option<String> {
    match get_text(client, url).await {
        Ok(html) => {
            let text = extract_visible_text(&html);
            (!text.is_empty()).then_some(text)
        }
        Err(e) => {
            warn!(%url, error = %e, "Article fetch failed; using title as content");
            None
        }
    }
}
