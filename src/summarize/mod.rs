// src/summarize/mod.rs
//! Summarization capability: prompt intent + provider abstraction + primary/fallback chain.
//!
//! Layering:
//! - `CompletionClient` does the actual remote call (`complete(system, user)`).
//! - `LlmSummarizer` turns a `StyleHint` into prompts for a client.
//! - `SummarizerChain` retries the primary, then tries the fallback once.

pub mod prompts;
pub mod providers;

use std::sync::Arc;

use async_trait::async_trait;
use metrics::counter;
use serde::Serialize;
use thiserror::Error;

use crate::error::ProviderError;
use crate::retry::RetryPolicy;

/// What the text is for. Prompt wording lives in `prompts`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StyleHint {
    HeadlineScript,
    DiscussionAnalysis,
    BroadcastComposition,
}

impl StyleHint {
    pub fn as_str(&self) -> &'static str {
        match self {
            StyleHint::HeadlineScript => "headline_script",
            StyleHint::DiscussionAnalysis => "discussion_analysis",
            StyleHint::BroadcastComposition => "broadcast_composition",
        }
    }
}

/// Low-level text completion. One instance per backend.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    async fn complete(&self, system: &str, user: &str) -> Result<String, ProviderError>;
    fn name(&self) -> &'static str;
}

/// Turns raw source content into prose for a given intent.
#[async_trait]
pub trait SummarizationProvider: Send + Sync {
    async fn summarize(&self, raw_text: &str, style: StyleHint) -> Result<String, ProviderError>;
    fn name(&self) -> &'static str;
}

pub type DynSummarizer = Arc<dyn SummarizationProvider>;

/// Adapts any completion backend to the summarization contract.
pub struct LlmSummarizer<C: CompletionClient> {
    client: C,
}

impl<C: CompletionClient> LlmSummarizer<C> {
    pub fn new(client: C) -> Self {
        Self { client }
    }
}

#[async_trait]
impl<C: CompletionClient> SummarizationProvider for LlmSummarizer<C> {
    async fn summarize(&self, raw_text: &str, style: StyleHint) -> Result<String, ProviderError> {
        let system = prompts::system_prompt(style);
        let user = prompts::user_prompt(style, raw_text);
        let out = self.client.complete(system, &user).await?;
        let out = out.trim();
        if out.is_empty() {
            return Err(ProviderError::Permanent {
                provider: self.client.name(),
                message: "empty completion".to_string(),
            });
        }
        Ok(out.to_string())
    }

    fn name(&self) -> &'static str {
        self.client.name()
    }
}

/// Deterministic provider for tests and `NEWSCAST_TEST_MODE=mock`.
#[derive(Debug, Clone)]
pub enum MockProvider {
    /// Returns "<style>: <raw text>".
    Echo,
    Fixed(String),
    Failing(String),
}

#[async_trait]
impl SummarizationProvider for MockProvider {
    async fn summarize(&self, raw_text: &str, style: StyleHint) -> Result<String, ProviderError> {
        match self {
            MockProvider::Echo => Ok(format!("{}: {}", style.as_str(), raw_text.trim())),
            MockProvider::Fixed(s) => Ok(s.clone()),
            MockProvider::Failing(msg) => Err(ProviderError::Permanent {
                provider: "mock",
                message: msg.clone(),
            }),
        }
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}

/// Text plus which provider produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Summary {
    pub text: String,
    pub provider: &'static str,
    pub used_fallback: bool,
}

/// Both providers failed; each reason is kept for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("primary: {primary}; fallback: {}", .fallback.as_deref().unwrap_or("not configured"))]
pub struct SummarizeFailure {
    pub primary: String,
    pub fallback: Option<String>,
}

/// Primary (under retry) then a single fallback attempt.
#[derive(Clone)]
pub struct SummarizerChain {
    primary: DynSummarizer,
    fallback: Option<DynSummarizer>,
    retry: RetryPolicy,
}

impl SummarizerChain {
    pub fn new(primary: DynSummarizer, fallback: Option<DynSummarizer>, retry: RetryPolicy) -> Self {
        Self {
            primary,
            fallback,
            retry,
        }
    }

    pub fn primary_name(&self) -> &'static str {
        self.primary.name()
    }

    pub fn fallback_name(&self) -> Option<&'static str> {
        self.fallback.as_ref().map(|f| f.name())
    }

    pub async fn summarize(&self, raw_text: &str, style: StyleHint) -> Result<Summary, SummarizeFailure> {
        let primary = &self.primary;
        let primary_err = match self
            .retry
            .execute("summarize_primary", move |_| primary.summarize(raw_text, style))
            .await
        {
            Ok(text) => {
                return Ok(Summary {
                    text,
                    provider: self.primary.name(),
                    used_fallback: false,
                })
            }
            Err(e) => e,
        };

        tracing::warn!(
            provider = self.primary.name(),
            style = style.as_str(),
            attempts = primary_err.attempts,
            error = %primary_err.last,
            "primary summarizer failed"
        );

        let Some(fallback) = &self.fallback else {
            return Err(SummarizeFailure {
                primary: primary_err.to_string(),
                fallback: None,
            });
        };

        counter!("newscast_summarize_fallback_total", "style" => style.as_str()).increment(1);
        match fallback.summarize(raw_text, style).await {
            Ok(text) => Ok(Summary {
                text,
                provider: fallback.name(),
                used_fallback: true,
            }),
            Err(e) => {
                tracing::warn!(provider = fallback.name(), style = style.as_str(), error = %e, "fallback summarizer failed");
                Err(SummarizeFailure {
                    primary: primary_err.to_string(),
                    fallback: Some(e.to_string()),
                })
            }
        }
    }
}
