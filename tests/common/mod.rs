// tests/common/mod.rs
//
// Scriptable stub collaborators shared by the integration tests.
// Every stub counts its calls so tests can assert on attempt budgets.
#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, Utc};
use parking_lot::Mutex;

use topic_newscast::bootstrap::{build_pipeline, Collaborators};
use topic_newscast::config::NewscastConfig;
use topic_newscast::error::{ProviderError, SourceError, SynthesisError};
use topic_newscast::pipeline::Pipeline;
use topic_newscast::sources::{DiscussionPost, DiscussionSearch, NewsItem, NewsSearch};
use topic_newscast::summarize::{StyleHint, SummarizationProvider};
use topic_newscast::synth::{Synthesizer, VoiceParams};

#[derive(Debug, Clone)]
pub enum Script<T> {
    Items(Vec<T>),
    Transient,
    Permanent,
}

/// News search whose answer depends on the query.
pub struct ScriptedNews {
    default: Script<NewsItem>,
    per_topic: HashMap<String, Script<NewsItem>>,
    calls: Mutex<HashMap<String, usize>>,
}

impl ScriptedNews {
    pub fn titles(titles: &[&str]) -> Self {
        Self::with_default(Script::Items(news_items(titles)))
    }

    pub fn with_default(default: Script<NewsItem>) -> Self {
        Self {
            default,
            per_topic: HashMap::new(),
            calls: Mutex::new(HashMap::new()),
        }
    }

    pub fn on(mut self, topic: &str, script: Script<NewsItem>) -> Self {
        self.per_topic.insert(topic.to_string(), script);
        self
    }

    pub fn calls_for(&self, topic: &str) -> usize {
        self.calls.lock().get(topic).copied().unwrap_or(0)
    }

    pub fn total_calls(&self) -> usize {
        self.calls.lock().values().sum()
    }
}

#[async_trait]
impl NewsSearch for ScriptedNews {
    async fn search(&self, query: &str) -> Result<Vec<NewsItem>, SourceError> {
        *self.calls.lock().entry(query.to_string()).or_default() += 1;
        match self.per_topic.get(query).unwrap_or(&self.default) {
            Script::Items(items) => Ok(items.clone()),
            Script::Transient => Err(SourceError::Transient(format!("timeout for {query}"))),
            Script::Permanent => Err(SourceError::Permanent(format!("bad query {query}"))),
        }
    }
}

pub fn news_items(titles: &[&str]) -> Vec<NewsItem> {
    titles
        .iter()
        .map(|t| NewsItem {
            title: t.to_string(),
        })
        .collect()
}

/// Discussion search whose answer depends on the query.
pub struct ScriptedDiscussion {
    default: Script<DiscussionPost>,
    per_topic: HashMap<String, Script<DiscussionPost>>,
    calls: AtomicUsize,
}

impl ScriptedDiscussion {
    pub fn posts(posts: Vec<DiscussionPost>) -> Self {
        Self::with_default(Script::Items(posts))
    }

    pub fn with_default(default: Script<DiscussionPost>) -> Self {
        Self {
            default,
            per_topic: HashMap::new(),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn on(mut self, topic: &str, script: Script<DiscussionPost>) -> Self {
        self.per_topic.insert(topic.to_string(), script);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DiscussionSearch for ScriptedDiscussion {
    async fn search(
        &self,
        query: &str,
        _sort: &str,
        _time_window: &str,
        limit: usize,
    ) -> Result<Vec<DiscussionPost>, SourceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.per_topic.get(query).unwrap_or(&self.default) {
            Script::Items(posts) => Ok(posts.iter().take(limit).cloned().collect()),
            Script::Transient => Err(SourceError::Transient("503 from discussion".into())),
            Script::Permanent => Err(SourceError::Permanent("403 from discussion".into())),
        }
    }
}

pub fn post(title: &str, age_days: i64) -> DiscussionPost {
    DiscussionPost {
        title: title.to_string(),
        body: format!("{title} body"),
        score: 10,
        created_at: Utc::now() - ChronoDuration::days(age_days),
        url: format!("https://example.test/{title}"),
    }
}

#[derive(Debug, Clone)]
pub enum SummaryMode {
    /// "<name>/<style>: <raw>"
    Echo,
    Transient,
    Permanent,
}

/// Summarizer that records every call it receives.
pub struct CountingSummarizer {
    label: &'static str,
    mode: SummaryMode,
    calls: Mutex<Vec<StyleHint>>,
}

impl CountingSummarizer {
    pub fn new(label: &'static str, mode: SummaryMode) -> Arc<Self> {
        Arc::new(Self {
            label,
            mode,
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.lock().len()
    }

    pub fn calls_with(&self, style: StyleHint) -> usize {
        self.calls.lock().iter().filter(|s| **s == style).count()
    }
}

#[async_trait]
impl SummarizationProvider for CountingSummarizer {
    async fn summarize(&self, raw_text: &str, style: StyleHint) -> Result<String, ProviderError> {
        self.calls.lock().push(style);
        match self.mode {
            SummaryMode::Echo => Ok(format!("{}/{}: {}", self.label, style.as_str(), raw_text.trim())),
            SummaryMode::Transient => Err(ProviderError::Transient {
                provider: self.label,
                message: "rate limited".to_string(),
            }),
            SummaryMode::Permanent => Err(ProviderError::Permanent {
                provider: self.label,
                message: "invalid api key".to_string(),
            }),
        }
    }

    fn name(&self) -> &'static str {
        self.label
    }
}

#[derive(Debug, Clone)]
pub enum SynthMode {
    Audio,
    Empty,
    Fail,
}

/// Synthesizer that keeps the text it was asked to speak.
pub struct RecordingSynth {
    mode: SynthMode,
    pub texts: Mutex<Vec<String>>,
}

impl RecordingSynth {
    pub fn new(mode: SynthMode) -> Arc<Self> {
        Arc::new(Self {
            mode,
            texts: Mutex::new(Vec::new()),
        })
    }

    pub fn last_text(&self) -> Option<String> {
        self.texts.lock().last().cloned()
    }
}

#[async_trait]
impl Synthesizer for RecordingSynth {
    async fn synthesize(&self, text: &str, _voice: &VoiceParams) -> Result<Vec<u8>, SynthesisError> {
        self.texts.lock().push(text.to_string());
        match self.mode {
            SynthMode::Audio => Ok(format!("MP3:{text}").into_bytes()),
            SynthMode::Empty => Ok(Vec::new()),
            SynthMode::Fail => Err(SynthesisError::Request("HTTP 401".to_string())),
        }
    }

    fn name(&self) -> &'static str {
        "recording"
    }
}

/// Pipeline built exactly like the service builds it, with stubs plugged in.
pub fn pipeline(
    news: Arc<ScriptedNews>,
    discussion: Arc<ScriptedDiscussion>,
    primary: Arc<CountingSummarizer>,
    fallback: Option<Arc<CountingSummarizer>>,
    synth: Arc<RecordingSynth>,
) -> Pipeline {
    let parts = Collaborators {
        news,
        discussion,
        primary,
        fallback: fallback.map(|f| f as Arc<dyn SummarizationProvider>),
        synthesizer: synth,
    };
    build_pipeline(&NewscastConfig::default(), parts)
}
