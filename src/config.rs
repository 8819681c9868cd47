//! Runtime configuration for the aggregator and the HTTP server.
//!
//! Configuration is an explicit value built once at startup and passed to
//! [`NewsAggregator::new`](crate::aggregator::NewsAggregator::new); nothing is read
//! from the environment after that. Values come from, in order of precedence:
//! CLI flags / environment variables, an optional YAML file, and the defaults below.
//!
//! ```yaml
//! arxiv:
//!   category: cs.LG
//!   max_results: 20
//! blogs:
//!   - name: OpenAI
//!     url: https://openai.com/news/
//! request_timeout_secs: 10
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};
use url::Url;

use crate::error::ConfigError;

pub const DEFAULT_ARXIV_BASE_URL: &str = "http://export.arxiv.org/api/query";
pub const DEFAULT_USER_AGENT: &str = concat!("airoam_news/", env!("CARGO_PKG_VERSION"));

/// Everything a [`NewsAggregator`](crate::aggregator::NewsAggregator) needs to know.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AggregatorConfig {
    /// Preprint search source; `None` disables it.
    pub arxiv: Option<ArxivConfig>,
    /// HTML blog pages, polled in this order.
    pub blogs: Vec<BlogConfig>,
    /// Whether the hard-coded curated items are part of the feed.
    pub curated: bool,
    /// Timeout applied to every individual HTTP request.
    pub request_timeout_secs: u64,
    /// Upper bound for one whole aggregation run.
    pub aggregate_timeout_secs: u64,
    pub user_agent: String,
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            arxiv: Some(ArxivConfig::default()),
            blogs: Vec::new(),
            curated: true,
            request_timeout_secs: 15,
            aggregate_timeout_secs: 30,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl AggregatorConfig {
    /// Per-request HTTP timeout.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Budget for one whole aggregation run.
    pub fn aggregate_timeout(&self) -> Duration {
        Duration::from_secs(self.aggregate_timeout_secs)
    }
}

/// arXiv API query settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArxivConfig {
    pub base_url: String,
    /// Subject category, e.g. `cs.AI`.
    pub category: String,
    pub max_results: usize,
    /// Fetch each entry's abstract page for the full abstract text.
    pub fetch_abstracts: bool,
}

impl Default for ArxivConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_ARXIV_BASE_URL.to_string(),
            category: "cs.AI".to_string(),
            max_results: 20,
            fetch_abstracts: true,
        }
    }
}

/// One blog-style HTML page to scrape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlogConfig {
    /// Label shown as the item's `source`.
    pub name: String,
    pub url: String,
    #[serde(default = "default_blog_category")]
    pub category: String,
    #[serde(default = "default_max_articles")]
    pub max_articles: usize,
    /// CSS selector matching one article on the index page.
    #[serde(default = "default_article_selector")]
    pub article_selector: String,
    /// Fetch each linked article and use its visible text as content.
    #[serde(default = "default_true")]
    pub fetch_content: bool,
}

impl BlogConfig {
    /// Blog source with the default category, selector and article limit.
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            category: default_blog_category(),
            max_articles: default_max_articles(),
            article_selector: default_article_selector(),
            fetch_content: true,
        }
    }

    /// Parse a blog source given on the command line.
    ///
    /// # Arguments
    ///
    /// * `entry` - Either `NAME=URL` or a bare absolute URL. A bare URL may
    ///   itself contain `=` (query strings); it is recognised before any split.
    ///
    /// # Returns
    ///
    /// The blog config, named after the URL's host for the bare form, or
    /// `None` (with a warning) when the input names no usable URL.
    pub fn from_spec(entry: &str) -> Option<Self> {
        let entry = entry.trim();
        if entry.is_empty() {
            return None;
        }
        if let Ok(url) = Url::parse(entry) {
            if let Some(host) = url.host_str() {
                return Some(Self::new(host, entry));
            }
        }
        match entry.split_once('=') {
            Some((name, url))
                if is_plain_name(name.trim()) && Url::parse(url.trim()).is_ok() =>
            {
                Some(Self::new(name.trim(), url.trim()))
            }
            _ => {
                warn!(%entry, "Ignoring blog source; expected NAME=URL or an absolute URL");
                None
            }
        }
    }
}

/// A source label: non-empty and not the start of a URL.
fn is_plain_name(name: &str) -> bool {
    !name.is_empty() && !name.contains([':', '/'])
}

fn default_blog_category() -> String {
    "Industry".to_string()
}

fn default_max_articles() -> usize {
    5
}

fn default_article_selector() -> String {
    "article".to_string()
}

fn default_true() -> bool {
    true
}

/// HTTP listener and CORS settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub allowed_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            allowed_origins: vec![
                "http://localhost:3000".to_string(),
                "https://airoam.net".to_string(),
            ],
        }
    }
}

impl ServerConfig {
    /// `host:port` string handed to the TCP listener.
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Shape of the YAML configuration file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    pub server: ServerConfig,
    #[serde(flatten)]
    pub aggregator: AggregatorConfig,
}

impl FileConfig {
    pub fn from_yaml(path: &str, yaml: &str) -> Result<Self, ConfigError> {
        serde_yaml::from_str(yaml).map_err(|source| ConfigError::Yaml {
            path: path.to_string(),
            source,
        })
    }

    /// Read and parse a YAML config file.
    #[instrument(level = "info")]
    pub fn load(path: &str) -> Result<Self, ConfigError> {
        let yaml = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_string(),
            source,
        })?;
        let config = Self::from_yaml(path, &yaml)?;
        info!(
            blogs = config.aggregator.blogs.len(),
            arxiv = config.aggregator.arxiv.is_some(),
            "Loaded configuration file"
        );
        Ok(config)
    }
}
