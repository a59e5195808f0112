// src/bootstrap.rs
//! Wires config into a ready `Pipeline`: real HTTP collaborators normally,
//! deterministic in-process ones when `NEWSCAST_TEST_MODE=mock`.

use std::sync::Arc;

use anyhow::Result;
use chrono::Utc;
use tracing::{info, warn};

use crate::aggregator::TopicAggregator;
use crate::composer::ScriptComposer;
use crate::config::NewscastConfig;
use crate::limiter::RateLimiters;
use crate::pipeline::Pipeline;
use crate::retry::RetryPolicy;
use crate::sources::reddit::RedditSearch;
use crate::sources::serpapi::SerpApiNewsSearch;
use crate::sources::{
    DiscussionFetcher, DiscussionPost, DiscussionSearch, NewsFetcher, NewsSearch,
    StaticDiscussionSearch, StaticNewsSearch,
};
use crate::summarize::providers::build_summarizer;
use crate::summarize::{DynSummarizer, MockProvider, SummarizerChain};
use crate::synth::elevenlabs::ElevenLabsSynthesizer;
use crate::synth::{MockSynthesizer, Synthesizer, VoiceParams};
use crate::types::SourceKind;

pub const ENV_TEST_MODE: &str = "NEWSCAST_TEST_MODE";

pub fn mock_mode() -> bool {
    std::env::var(ENV_TEST_MODE).is_ok_and(|v| v.trim().eq_ignore_ascii_case("mock"))
}

/// The collaborators a pipeline is assembled from.
pub struct Collaborators {
    pub news: Arc<dyn NewsSearch>,
    pub discussion: Arc<dyn DiscussionSearch>,
    pub primary: DynSummarizer,
    pub fallback: Option<DynSummarizer>,
    pub synthesizer: Arc<dyn Synthesizer>,
}

impl Collaborators {
    pub fn live(cfg: &NewscastConfig) -> Result<Self> {
        let timeout = cfg.llm_timeout();
        let primary = build_summarizer(&cfg.llm.primary, &cfg.llm, timeout)?;
        let fallback = match cfg.llm.fallback.as_str() {
            "" | "none" => None,
            name if name == cfg.llm.primary => {
                warn!(provider = name, "fallback equals primary, fallback disabled");
                None
            }
            name => Some(build_summarizer(name, &cfg.llm, timeout)?),
        };
        Ok(Self {
            news: Arc::new(SerpApiNewsSearch::from_config(&cfg.news)?),
            discussion: Arc::new(RedditSearch::from_config(&cfg.discussion)?),
            primary,
            fallback,
            synthesizer: Arc::new(ElevenLabsSynthesizer::from_config(&cfg.voice)?),
        })
    }

    pub fn mock() -> Self {
        let now = Utc::now();
        let posts = vec![
            DiscussionPost {
                title: "What everyone is saying this week".to_string(),
                body: "A lively thread with mixed opinions.".to_string(),
                score: 120,
                created_at: now,
                url: "https://example.invalid/thread/1".to_string(),
            },
            DiscussionPost {
                title: "Follow-up discussion".to_string(),
                body: String::new(),
                score: 45,
                created_at: now,
                url: "https://example.invalid/thread/2".to_string(),
            },
        ];
        Self {
            news: Arc::new(StaticNewsSearch::with_titles([
                "Mock headline one",
                "Mock headline two",
            ])),
            discussion: Arc::new(StaticDiscussionSearch { posts }),
            primary: Arc::new(MockProvider::Echo),
            fallback: None,
            synthesizer: Arc::new(MockSynthesizer),
        }
    }
}

pub fn build_pipeline(cfg: &NewscastConfig, parts: Collaborators) -> Pipeline {
    let retry = RetryPolicy::from_config(&cfg.retry);
    let limiters = RateLimiters::per_second(
        cfg.limits.news_per_second,
        cfg.limits.discussion_per_second,
    );
    let summarizer = Arc::new(SummarizerChain::new(
        parts.primary,
        parts.fallback,
        retry,
    ));

    info!(
        primary = summarizer.primary_name(),
        fallback = summarizer.fallback_name().unwrap_or("none"),
        synthesizer = parts.synthesizer.name(),
        max_concurrency = cfg.limits.max_concurrency,
        "pipeline assembled"
    );

    let news = NewsFetcher::new(
        parts.news,
        limiters.for_kind(SourceKind::News),
        retry,
        summarizer.clone(),
    )
    .with_max_headlines(cfg.news.max_headlines);

    let discussion = DiscussionFetcher::new(
        parts.discussion,
        limiters.for_kind(SourceKind::Discussion),
        retry,
        summarizer.clone(),
    )
    .with_limits(cfg.discussion.max_threads, cfg.discussion.body_chars)
    .with_recency(cfg.recency_window(), cfg.discussion.time_window_hint.clone());

    let aggregator = TopicAggregator::new(cfg.limits.max_concurrency)
        .with_fetcher(Arc::new(news))
        .with_fetcher(Arc::new(discussion));

    Pipeline::new(
        aggregator,
        ScriptComposer::new(summarizer),
        parts.synthesizer,
        VoiceParams::from_config(&cfg.voice),
    )
}

/// Load config the usual way and assemble the pipeline for this process.
pub fn pipeline_from_env() -> Result<Pipeline> {
    let cfg = NewscastConfig::load_default()?;
    let parts = if mock_mode() {
        info!("{ENV_TEST_MODE}=mock, using in-process collaborators");
        Collaborators::mock()
    } else {
        Collaborators::live(&cfg)?
    };
    Ok(build_pipeline(&cfg, parts))
}
