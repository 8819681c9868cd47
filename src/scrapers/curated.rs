//! Curated seed items.
//!
//! A fixed list of hand-written stories plus one research digest entry. None of
//! them have a real publish time, so each is stamped `now - offset` when the feed
//! is built, which keeps them spread through the ranked feed.

use chrono::Duration;
use futures::future::BoxFuture;

use super::{FetchContext, NewsSource};
use crate::error::SourceError;
use crate::models::{NewsItem, PLACEHOLDER_URL};
use crate::utils::relative_time_since;

struct Seed {
    title: &'static str,
    body: &'static str,
    category: &'static str,
    source: &'static str,
    url: &'static str,
    age_minutes: i64,
}

const SEEDS: [Seed; 6] = [
    Seed {
        title: "AI beats human at Go again!",
        body: "A new AI system has once again defeated the world champion in Go, demonstrating the rapid progress of artificial intelligence in complex strategy games.",
        category: "Breaking",
        source: "X",
        url: "https://x.com/ai-news",
        age_minutes: 2 * 60,
    },
    Seed {
        title: "New GPT-5 research paper released",
        body: "OpenAI has published the first research paper on GPT-5, revealing breakthroughs in language understanding and reasoning capabilities.",
        category: "Research",
        source: "arXiv",
        url: "https://arxiv.org/abs/1234.5678",
        age_minutes: 5 * 60,
    },
    Seed {
        title: "AI-powered robots enter mass production",
        body: "Leading manufacturers are rolling out AI-powered robots for logistics, healthcare, and manufacturing, accelerating the adoption of automation worldwide.",
        category: "Industry",
        source: "Medium",
        url: PLACEHOLDER_URL,
        age_minutes: 24 * 60,
    },
    Seed {
        title: "Breakthrough in AI image generation",
        body: "A new generative model can create photorealistic images from text prompts, pushing the boundaries of creative AI applications.",
        category: "Creative AI",
        source: "X",
        url: PLACEHOLDER_URL,
        age_minutes: 2 * 24 * 60,
    },
    Seed {
        title: "Quantum AI: The next frontier",
        body: "Researchers are exploring the intersection of quantum computing and artificial intelligence, potentially revolutionizing machine learning algorithms.",
        category: "Research",
        source: "Nature",
        url: PLACEHOLDER_URL,
        age_minutes: 3 * 24 * 60,
    },
    Seed {
        title: "AI ethics guidelines released",
        body: "Leading AI organizations have jointly released comprehensive ethics guidelines for responsible AI development and deployment.",
        category: "Policy",
        source: "MIT Tech Review",
        url: PLACEHOLDER_URL,
        age_minutes: 4 * 24 * 60,
    },
];

const RESEARCH_DIGEST: Seed = Seed {
    title: "This week in AI research: agents, reasoning and efficient training",
    body: "A roundup of the most discussed new preprints in artificial intelligence. \
           Highlights include tool-using language agents that plan over long horizons, \
           evaluation suites for multi-step reasoning, and training recipes that cut compute \
           requirements without hurting downstream accuracy. Browse the full list of recent \
           submissions in the cs.AI category for details on each paper.",
    category: "Research",
    source: "arXiv",
    url: "https://arxiv.org/list/cs.AI/recent",
    age_minutes: 3 * 60,
};

/// Build the curated items relative to `ctx.now`, seeds first, digest last.
pub fn curated_items(ctx: &FetchContext) -> Vec<NewsItem> {
    SEEDS
        .iter()
        .chain(std::iter::once(&RESEARCH_DIGEST))
        .map(|seed| {
            let published = ctx.now - Duration::minutes(seed.age_minutes);
            NewsItem::new(
                seed.title,
                seed.body,
                seed.category,
                seed.source,
                relative_time_since(published, ctx.now),
                seed.url,
                published.timestamp(),
            )
        })
        .collect()
}

/// The hard-coded source. It never fails.
#[derive(Debug, Clone, Copy, Default)]
pub struct CuratedSource;

impl NewsSource for CuratedSource {
    fn name(&self) -> &str {
        "Curated"
    }

    fn fetch<'a>(&'a self, ctx: &'a FetchContext) -> BoxFuture<'a, Result<Vec<NewsItem>, SourceError>> {
        Box::pin(async move { Ok(curated_items(ctx)) })
    }
}
