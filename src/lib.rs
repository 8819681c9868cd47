//! # Airoam News
//!
//! Backend for the Airoam AI news page. Each request builds a fresh feed from
//! several independent sources, ranks it by recency, and serves it as JSON.
//!
//! ## Sources
//!
//! - arXiv: most recently updated preprints in one subject category
//! - Blogs: a bounded number of articles scraped from configured HTML pages
//! - Curated: hand-written seed stories with synthesized timestamps
//!
//! ## Architecture
//!
//! 1. **Fetching**: all sources are polled concurrently, each isolated from the others
//! 2. **Merging**: contributions are concatenated, sorted newest first, capped at 50
//! 3. **Fallback**: if nothing could be fetched, a single fixed item is served
//! 4. **Serving**: axum routes for the list, positional detail lookup and health
//!
//! ## Usage
//!
//! ```sh
//! airoam_news --port 8000 --blog "OpenAI=https://openai.com/news/"
//! ```

pub mod aggregator;
pub mod api;
pub mod cli;
pub mod config;
pub mod error;
pub mod models;
pub mod scrapers;
pub mod utils;

pub use aggregator::NewsAggregator;
pub use models::NewsItem;
