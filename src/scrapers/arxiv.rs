//! arXiv preprint source.
//!
//! Queries the [arXiv API](https://info.arxiv.org/help/api/index.html) for the most
//! recently updated papers in one subject category, parses the Atom response, and
//! optionally fetches each paper's abstract page for the full abstract text.
//!
//! # URL Pattern
//!
//! ```text
//! {base_url}?search_query=cat:cs.AI&sortBy=lastUpdatedDate&sortOrder=descending&start=0&max_results=20
//! ```

use futures::future::BoxFuture;
use futures::stream::{self, StreamExt};
use once_cell::sync::Lazy;
use quick_xml::Reader;
use quick_xml::escape::{resolve_predefined_entity, unescape};
use quick_xml::events::{BytesStart, Event};
use reqwest::Client;
use scraper::{Html, Selector};
use tracing::{debug, info, instrument, warn};
use url::Url;

use super::{FetchContext, NewsSource, get_text};
use crate::config::ArxivConfig;
use crate::error::SourceError;
use crate::models::NewsItem;
use crate::utils::{collapse_whitespace, relative_time, sort_timestamp, truncate_for_log};

pub const SOURCE_LABEL: &str = "arXiv";
pub const CATEGORY: &str = "Research";

/// Abstract pages fetched at the same time.
const ABSTRACT_CONCURRENCY: usize = 4;

static ABSTRACT_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("blockquote.abstract").expect("static selector"));

/// One `<entry>` of the Atom feed.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ArxivEntry {
    pub id: String,
    pub title: String,
    pub summary: String,
    pub published: String,
    pub updated: String,
    /// `href` of `<link rel="alternate">`, the human-readable abstract page.
    pub link: String,
}

impl ArxivEntry {
    /// Page holding the full abstract, falling back to the entry id.
    pub fn abstract_url(&self) -> &str {
        if self.link.is_empty() {
            &self.id
        } else {
            &self.link
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Field {
    Id,
    Title,
    Summary,
    Published,
    Updated,
}

impl Field {
    fn from_tag(tag: &[u8]) -> Option<Self> {
        match tag {
            b"id" => Some(Field::Id),
            b"title" => Some(Field::Title),
            b"summary" => Some(Field::Summary),
            b"published" => Some(Field::Published),
            b"updated" => Some(Field::Updated),
            _ => None,
        }
    }
}

/// Parse an arXiv Atom feed into its entries.
///
/// Feed-level elements outside `<entry>` are ignored. Text is whitespace-collapsed.
pub fn parse_feed(xml: &str) -> Result<Vec<ArxivEntry>, SourceError> {
    let mut reader = Reader::from_str(xml);
    let mut entries = Vec::new();
    let mut current: Option<ArxivEntry> = None;
    let mut field: Option<Field> = None;
    let mut text = String::new();

    loop {
        match reader.read_event()? {
            Event::Start(e) => match e.local_name().as_ref() {
                b"entry" => current = Some(ArxivEntry::default()),
                b"link" => read_link(&e, current.as_mut())?,
                tag => {
                    if current.is_some() {
                        field = Field::from_tag(tag);
                        text.clear();
                    }
                }
            },
            Event::Empty(e) => {
                if e.local_name().as_ref() == b"link" {
                    read_link(&e, current.as_mut())?;
                }
            }
            Event::Text(e) if field.is_some() => {
                text.push_str(&e.decode().map_err(quick_xml::Error::from)?);
            }
            Event::CData(e) if field.is_some() => {
                text.push_str(&String::from_utf8_lossy(&e.into_inner()));
            }
            Event::GeneralRef(e) if field.is_some() => {
                if let Some(ch) = e.resolve_char_ref()? {
                    text.push(ch);
                } else {
                    let name = e.decode().map_err(quick_xml::Error::from)?;
                    text.push_str(resolve_predefined_entity(&name).unwrap_or_default());
                }
            }
            Event::End(e) => match e.local_name().as_ref() {
                b"entry" => {
                    if let Some(entry) = current.take() {
                        entries.push(entry);
                    }
                }
                _ => {
                    if let (Some(f), Some(entry)) = (field.take(), current.as_mut()) {
                        let value = collapse_whitespace(&text);
                        match f {
                            Field::Id => entry.id = value,
                            Field::Title => entry.title = value,
                            Field::Summary => entry.summary = value,
                            Field::Published => entry.published = value,
                            Field::Updated => entry.updated = value,
                        }
                    }
                    text.clear();
                }
            },
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(entries)
}

fn read_link(e: &BytesStart<'_>, entry: Option<&mut ArxivEntry>) -> Result<(), SourceError> {
    let Some(entry) = entry else {
        return Ok(());
    };
    let mut rel = None;
    let mut href = None;
    for attr in e.attributes() {
        let attr = attr.map_err(quick_xml::Error::from)?;
        let raw = String::from_utf8_lossy(&attr.value).into_owned();
        let value = unescape(&raw).map(|v| v.into_owned()).unwrap_or(raw);
        match attr.key.local_name().as_ref() {
            b"rel" => rel = Some(value),
            b"href" => href = Some(value),
            _ => {}
        }
    }
    // Atom treats a link without `rel` as alternate.
    if let Some(href) = href {
        if rel.as_deref().is_none_or(|r| r == "alternate") && entry.link.is_empty() {
            entry.link = href;
        }
    }
    Ok(())
}

/// Extract the abstract text from an arXiv abstract page.
pub fn parse_abstract_page(html: &str) -> Option<String> {
    let document = Html::parse_document(html);
    let block = document.select(&ABSTRACT_SELECTOR).next()?;
    let text = collapse_whitespace(&block.text().collect::<Vec<_>>().join(" "));
    let text = text
        .strip_prefix("Abstract:")
        .map(str::trim_start)
        .unwrap_or(&text)
        .to_string();
    (!text.is_empty()).then_some(text)
}

/// The arXiv API source.
#[derive(Debug, Clone)]
pub struct ArxivSource {
    config: ArxivConfig,
}

impl ArxivSource {
    /// Create a source for one configured arXiv query.
    pub fn new(config: ArxivConfig) -> Self {
        Self { config }
    }

    /// Build the query URL for the configured category.
    pub fn query_url(&self) -> Result<Url, SourceError> {
        let mut url = Url::parse(&self.config.base_url)?;
        url.query_pairs_mut()
            .append_pair("search_query", &format!("cat:{}", self.config.category))
            .append_pair("sortBy", "lastUpdatedDate")
            .append_pair("sortOrder", "descending")
            .append_pair("start", "0")
            .append_pair("max_results", &self.config.max_results.to_string());
        Ok(url)
    }

    #[instrument(level = "info", skip_all, fields(category = %self.config.category))]
    async fn fetch_items(&self, ctx: &FetchContext) -> Result<Vec<NewsItem>, SourceError> {
        let url = self.query_url()?;
        let xml = get_text(&ctx.client, url.as_str()).await?;
        let entries = parse_feed(&xml).inspect_err(|e| {
            warn!(error = %e, preview = %truncate_for_log(&xml, 200), "arXiv response is not a valid feed");
        })?;
        info!(count = entries.len(), "Parsed arXiv entries");

        let fetch_abstracts = self.config.fetch_abstracts;
        let items: Vec<NewsItem> = stream::iter(entries)
            .filter(|entry| std::future::ready(!entry.title.is_empty()))
            .map(|entry| async move {
                let full = if fetch_abstracts {
                    let url = entry.abstract_url();
                    ctx.follow_up(url, fetch_abstract(&ctx.client, url)).await
                } else {
                    None
                };
                entry_to_item(&entry, full, ctx)
            })
            .buffered(ABSTRACT_CONCURRENCY)
            .collect()
            .await;

        info!(count = items.len(), "Built arXiv items");
        Ok(items)
    }
}

impl NewsSource for ArxivSource {
    fn name(&self) -> &str {
        SOURCE_LABEL
    }

    fn fetch<'a>(&'a self, ctx: &'a FetchContext) -> BoxFuture<'a, Result<Vec<NewsItem>, SourceError>> {
        Box::pin(self.fetch_items(ctx))
    }
}

/// Fetch one abstract page. Failures fall back to the feed summary.
#[instrument(level = "debug", skip(client))]
async fn fetch_abstract(client: &Client, url: &str) -> Option<String> {
    if url.is_empty() {
        return None;
    }
    match get_text(client, url).await {
        Ok(html) => {
            let text = parse_abstract_page(&html);
            if text.is_none() {
                debug!(%url, "Abstract page had no abstract block");
            }
            text
        }
        Err(e) => {
            warn!(%url, error = %e, "Abstract fetch failed; using feed summary");
            None
        }
    }
}

fn entry_to_item(entry: &ArxivEntry, full_abstract: Option<String>, ctx: &FetchContext) -> NewsItem {
    let published = if entry.published.is_empty() {
        &entry.updated
    } else {
        &entry.published
    };
    let url = if entry.link.is_empty() { &entry.id } else { &entry.link };

    let item = NewsItem::new(
        entry.title.clone(),
        &entry.summary,
        CATEGORY,
        SOURCE_LABEL,
        relative_time(published, ctx.now),
        url.clone(),
        sort_timestamp(Some(published), ctx.now),
    );
    match full_abstract {
        Some(text) => item.with_content(text),
        None => item,
    }
}
