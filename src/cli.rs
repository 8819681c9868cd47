//! Command-line interface definitions for the news service.
//!
//! Every option can be given as a flag or an environment variable. Flags
//! override the YAML file named by `--config`, which overrides the built-in defaults.

use clap::Parser;

use crate::config::{BlogConfig, FileConfig};
use crate::error::ConfigError;

/// Command-line arguments for the news service.
///
/// # Examples
///
/// ```sh
/// # Defaults: arXiv cs.AI + curated items on 0.0.0.0:8000
/// airoam_news
///
/// # Extra blog sources and a different category
/// airoam_news --arxiv-category cs.LG --blog "OpenAI=https://openai.com/news/"
///
/// # Everything from a file
/// airoam_news --config ./news.yaml
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Optional path to a YAML config file
    #[arg(short, long, env = "AIROAM_CONFIG")]
    pub config: Option<String>,

    /// Interface to bind
    #[arg(long, env = "AIROAM_HOST")]
    pub host: Option<String>,

    /// Port to listen on
    #[arg(short, long, env = "AIROAM_PORT")]
    pub port: Option<u16>,

    /// Base URL of the arXiv query API
    #[arg(long, env = "ARXIV_BASE_URL")]
    pub arxiv_base_url: Option<String>,

    /// arXiv subject category to follow
    #[arg(long, env = "ARXIV_CATEGORY")]
    pub arxiv_category: Option<String>,

    /// Disable the arXiv source
    #[arg(long)]
    pub no_arxiv: bool,

    /// Use feed summaries instead of fetching each abstract page
    #[arg(long)]
    pub no_abstracts: bool,

    /// Blog page to scrape, as NAME=URL or a bare URL (repeatable, or
    /// whitespace-separated in BLOG_URLS)
    #[arg(long = "blog", env = "BLOG_URLS", value_delimiter = ' ')]
    pub blogs: Vec<String>,

    /// Leave the curated seed items out of the feed
    #[arg(long)]
    pub no_curated: bool,

    /// Timeout for each outbound HTTP request, in seconds
    #[arg(long)]
    pub request_timeout_secs: Option<u64>,

    /// Upper bound for one aggregation run, in seconds
    #[arg(long)]
    pub aggregate_timeout_secs: Option<u64>,

    /// Origin allowed by CORS (repeatable)
    #[arg(long = "allowed-origin")]
    pub allowed_origins: Vec<String>,
}

impl Cli {
    /// Load the config file (if any) and apply the flags on top of it.
    pub fn load_config(&self) -> Result<FileConfig, ConfigError> {
        let base = match &self.config {
            Some(path) => FileConfig::load(path)?,
            None => FileConfig::default(),
        };
        Ok(self.apply(base))
    }

    /// Apply flag overrides to an already loaded config.
    pub fn apply(&self, mut config: FileConfig) -> FileConfig {
        if let Some(host) = &self.host {
            config.server.host = host.clone();
        }
        if let Some(port) = self.port {
            config.server.port = port;
        }
        if !self.allowed_origins.is_empty() {
            config.server.allowed_origins = self.allowed_origins.clone();
        }

        let aggregator = &mut config.aggregator;
        if self.no_arxiv {
            aggregator.arxiv = None;
        } else if let Some(arxiv) = aggregator.arxiv.as_mut() {
            if let Some(base_url) = &self.arxiv_base_url {
                arxiv.base_url = base_url.clone();
            }
            if let Some(category) = &self.arxiv_category {
                arxiv.category = category.clone();
            }
            if self.no_abstracts {
                arxiv.fetch_abstracts = false;
            }
        }

        aggregator
            .blogs
            .extend(self.blogs.iter().filter_map(|spec| BlogConfig::from_spec(spec)));

        if self.no_curated {
            aggregator.curated = false;
        }
        if let Some(secs) = self.request_timeout_secs {
            aggregator.request_timeout_secs = secs;
        }
        if let Some(secs) = self.aggregate_timeout_secs {
            aggregator.aggregate_timeout_secs = secs;
        }
        config
    }
}
