// src/sources/mod.rs
//! Source fetchers: one per `SourceKind`. Each fetcher owns its search
//! collaborator, shares its kind's rate limiter, retries transient search
//! failures, and always resolves to a `FetchOutcome`.

pub mod reddit;
pub mod serpapi;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use metrics::counter;
use serde::{Deserialize, Serialize};

use crate::error::{FetchError, SourceError};
use crate::limiter::RateLimiter;
use crate::retry::{RetryError, RetryPolicy};
use crate::summarize::{StyleHint, SummarizerChain};
use crate::types::{FetchOutcome, SourceKind, Topic};

/// One news search hit; only the title is used.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewsItem {
    pub title: String,
}

/// One discussion thread.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiscussionPost {
    pub title: String,
    pub body: String,
    pub score: i64,
    pub created_at: DateTime<Utc>,
    pub url: String,
}

/// Ordered news search (ranking and dedup are the collaborator's concern).
#[async_trait]
pub trait NewsSearch: Send + Sync {
    async fn search(&self, query: &str) -> Result<Vec<NewsItem>, SourceError>;
}

/// Discussion search; `time_window` is only a hint, recency is re-checked locally.
#[async_trait]
pub trait DiscussionSearch: Send + Sync {
    async fn search(
        &self,
        query: &str,
        sort: &str,
        time_window: &str,
        limit: usize,
    ) -> Result<Vec<DiscussionPost>, SourceError>;
}

/// Given a topic, produce exactly one outcome. Never panics on collaborator errors.
#[async_trait]
pub trait SourceFetcher: Send + Sync {
    fn kind(&self) -> SourceKind;
    async fn fetch(&self, topic: &Topic) -> FetchOutcome;
}

pub type DynFetcher = Arc<dyn SourceFetcher>;

fn search_failure(origin: &'static str, err: RetryError<SourceError>) -> FetchError {
    match err.last {
        SourceError::Transient(message) => FetchError::SourceTransient {
            origin,
            attempts: err.attempts,
            message,
        },
        SourceError::Permanent(message) => FetchError::SourcePermanent { origin, message },
    }
}

fn record(kind: SourceKind, topic: &Topic, outcome: &FetchOutcome) {
    counter!(
        "newscast_fetch_outcomes_total",
        "source" => kind.as_str(),
        "outcome" => outcome.label()
    )
    .increment(1);
    if let FetchOutcome::Failure { reason } = outcome {
        tracing::warn!(%topic, source = kind.as_str(), %reason, "fetch unit failed");
    } else {
        tracing::debug!(%topic, source = kind.as_str(), outcome = outcome.label(), "fetch unit done");
    }
}

/// Normalize a headline: decode entities, collapse whitespace.
pub fn clean_headline(s: &str) -> String {
    let decoded = html_escape::decode_html_entities(s);
    decoded.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Cut to at most `max` chars on a char boundary.
pub fn truncate_chars(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

// ------------------------------------------------------------
// News
// ------------------------------------------------------------

pub struct NewsFetcher {
    search: Arc<dyn NewsSearch>,
    limiter: Arc<RateLimiter>,
    retry: RetryPolicy,
    summarizer: Arc<SummarizerChain>,
    max_headlines: usize,
}

impl NewsFetcher {
    pub fn new(
        search: Arc<dyn NewsSearch>,
        limiter: Arc<RateLimiter>,
        retry: RetryPolicy,
        summarizer: Arc<SummarizerChain>,
    ) -> Self {
        Self {
            search,
            limiter,
            retry,
            summarizer,
            max_headlines: 5,
        }
    }

    pub fn with_max_headlines(mut self, k: usize) -> Self {
        self.max_headlines = k.max(1);
        self
    }

    async fn fetch_inner(&self, topic: &Topic) -> Result<FetchOutcome, FetchError> {
        let search = &self.search;
        let limiter = &self.limiter;
        let query = topic.as_str();
        let items = self
            .retry
            .execute("news_search", move |_| async move {
                limiter.acquire().await;
                search.search(query).await
            })
            .await
            .map_err(|e| search_failure("news", e))?;

        let headlines: Vec<String> = items
            .iter()
            .map(|it| clean_headline(&it.title))
            .filter(|t| !t.is_empty())
            .take(self.max_headlines)
            .collect();
        if headlines.is_empty() {
            return Ok(FetchOutcome::empty(format!(
                "No news articles found for '{topic}'."
            )));
        }

        let summary = self
            .summarizer
            .summarize(&headlines.join("\n"), StyleHint::HeadlineScript)
            .await
            .map_err(|f| FetchError::Summarization {
                primary: f.primary,
                fallback: f.fallback.unwrap_or_else(|| "not configured".to_string()),
            })?;
        Ok(FetchOutcome::success(summary.text))
    }
}

#[async_trait]
impl SourceFetcher for NewsFetcher {
    fn kind(&self) -> SourceKind {
        SourceKind::News
    }

    async fn fetch(&self, topic: &Topic) -> FetchOutcome {
        let outcome = self
            .fetch_inner(topic)
            .await
            .unwrap_or_else(|e| FetchOutcome::failure(e.to_string()));
        record(self.kind(), topic, &outcome);
        outcome
    }
}

// ------------------------------------------------------------
// Discussion
// ------------------------------------------------------------

pub struct DiscussionFetcher {
    search: Arc<dyn DiscussionSearch>,
    limiter: Arc<RateLimiter>,
    retry: RetryPolicy,
    summarizer: Arc<SummarizerChain>,
    max_threads: usize,
    body_chars: usize,
    recency: ChronoDuration,
    time_window_hint: String,
}

impl DiscussionFetcher {
    pub fn new(
        search: Arc<dyn DiscussionSearch>,
        limiter: Arc<RateLimiter>,
        retry: RetryPolicy,
        summarizer: Arc<SummarizerChain>,
    ) -> Self {
        Self {
            search,
            limiter,
            retry,
            summarizer,
            max_threads: 5,
            body_chars: 500,
            recency: ChronoDuration::days(14),
            time_window_hint: "month".to_string(),
        }
    }

    pub fn with_limits(mut self, max_threads: usize, body_chars: usize) -> Self {
        self.max_threads = max_threads.max(1);
        self.body_chars = body_chars;
        self
    }

    pub fn with_recency(mut self, window: ChronoDuration, hint: impl Into<String>) -> Self {
        self.recency = window;
        self.time_window_hint = hint.into();
        self
    }

    /// Keep posts inside the window anchored at `now`, truncated, at most `max_threads`.
    pub fn select_recent(&self, posts: Vec<DiscussionPost>, now: DateTime<Utc>) -> Vec<DiscussionPost> {
        let cutoff = now - self.recency;
        posts
            .into_iter()
            .filter(|p| p.created_at >= cutoff)
            .take(self.max_threads)
            .map(|mut p| {
                p.body = truncate_chars(&p.body, self.body_chars).to_string();
                p
            })
            .collect()
    }

    async fn fetch_inner(&self, topic: &Topic) -> Result<FetchOutcome, FetchError> {
        // Window is anchored at request time, not process start.
        let now = Utc::now();

        let search = &self.search;
        let limiter = &self.limiter;
        let query = topic.as_str();
        let hint = self.time_window_hint.as_str();
        let limit = self.max_threads;
        let posts = self
            .retry
            .execute("discussion_search", move |_| async move {
                limiter.acquire().await;
                search.search(query, "top", hint, limit).await
            })
            .await
            .map_err(|e| search_failure("discussion", e))?;

        let recent = self.select_recent(posts, now);
        if recent.is_empty() {
            return Ok(FetchOutcome::empty(format!(
                "No recent discussions found for '{topic}'."
            )));
        }

        let formatted = recent
            .iter()
            .map(|p| format!("Title: {}\nContent: {}\nScore: {}", p.title, p.body, p.score))
            .collect::<Vec<_>>()
            .join("\n\n");
        let raw = format!("Topic: {topic}\n\n{formatted}");

        let summary = self
            .summarizer
            .summarize(&raw, StyleHint::DiscussionAnalysis)
            .await
            .map_err(|f| FetchError::Summarization {
                primary: f.primary,
                fallback: f.fallback.unwrap_or_else(|| "not configured".to_string()),
            })?;
        Ok(FetchOutcome::success(summary.text))
    }
}

#[async_trait]
impl SourceFetcher for DiscussionFetcher {
    fn kind(&self) -> SourceKind {
        SourceKind::Discussion
    }

    async fn fetch(&self, topic: &Topic) -> FetchOutcome {
        let outcome = self
            .fetch_inner(topic)
            .await
            .unwrap_or_else(|e| FetchOutcome::failure(e.to_string()));
        record(self.kind(), topic, &outcome);
        outcome
    }
}

// ------------------------------------------------------------
// Static collaborators (tests / mock mode)
// ------------------------------------------------------------

/// Returns the same items for every query.
#[derive(Debug, Clone, Default)]
pub struct StaticNewsSearch {
    pub items: Vec<NewsItem>,
}

impl StaticNewsSearch {
    pub fn with_titles<I, S>(titles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            items: titles
                .into_iter()
                .map(|t| NewsItem { title: t.into() })
                .collect(),
        }
    }
}

#[async_trait]
impl NewsSearch for StaticNewsSearch {
    async fn search(&self, _query: &str) -> Result<Vec<NewsItem>, SourceError> {
        Ok(self.items.clone())
    }
}

/// Returns the same posts for every query (truncated to `limit`).
#[derive(Debug, Clone, Default)]
pub struct StaticDiscussionSearch {
    pub posts: Vec<DiscussionPost>,
}

#[async_trait]
impl DiscussionSearch for StaticDiscussionSearch {
    async fn search(
        &self,
        _query: &str,
        _sort: &str,
        _time_window: &str,
        limit: usize,
    ) -> Result<Vec<DiscussionPost>, SourceError> {
        Ok(self.posts.iter().take(limit).cloned().collect())
    }
}
