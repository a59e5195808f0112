// src/types.rs
//! Data model shared by the aggregation pipeline: topics, source kinds,
//! per-unit fetch outcomes and the ordered aggregate built from them.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::PipelineError;

/// Caller-supplied subject string. Duplicates are allowed and processed independently.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Topic(String);

impl Topic {
    /// Rejects empty / whitespace-only topics. The caller's text is kept verbatim.
    pub fn new(raw: impl Into<String>) -> Result<Self, PipelineError> {
        let raw = raw.into();
        if raw.trim().is_empty() {
            return Err(PipelineError::InvalidInput(
                "topics must be non-empty strings".to_string(),
            ));
        }
        Ok(Self(raw))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Which external content source a fetch targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    News,
    Discussion,
}

impl SourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceKind::News => "news",
            SourceKind::Discussion => "discussion",
        }
    }

    /// Label used when the source content is handed to the composer.
    pub fn block_label(&self) -> &'static str {
        match self {
            SourceKind::News => "OFFICIAL NEWS CONTENT",
            SourceKind::Discussion => "DISCUSSION CONTENT",
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Request-level choice of sources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceSelection {
    News,
    Discussion,
    Both,
}

impl SourceSelection {
    /// Source kinds in their fixed narration order (news before discussion).
    pub fn kinds(&self) -> Vec<SourceKind> {
        match self {
            SourceSelection::News => vec![SourceKind::News],
            SourceSelection::Discussion => vec![SourceKind::Discussion],
            SourceSelection::Both => vec![SourceKind::News, SourceKind::Discussion],
        }
    }
}

impl FromStr for SourceSelection {
    type Err = PipelineError;

    /// Accepts the HTTP wire names; "reddit" is an alias for discussion.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "news" => Ok(SourceSelection::News),
            "discussion" | "reddit" => Ok(SourceSelection::Discussion),
            "both" => Ok(SourceSelection::Both),
            other => Err(PipelineError::InvalidInput(format!(
                "unsupported source selection: '{other}'"
            ))),
        }
    }
}

/// Tri-state result of one (topic, source) fetch-and-summarize unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum FetchOutcome {
    Success { content: String },
    /// The source legitimately had nothing; `placeholder` is informational only.
    Empty { placeholder: String },
    Failure { reason: String },
}

impl FetchOutcome {
    pub fn success(content: impl Into<String>) -> Self {
        FetchOutcome::Success {
            content: content.into(),
        }
    }

    pub fn empty(placeholder: impl Into<String>) -> Self {
        FetchOutcome::Empty {
            placeholder: placeholder.into(),
        }
    }

    pub fn failure(reason: impl Into<String>) -> Self {
        FetchOutcome::Failure {
            reason: reason.into(),
        }
    }

    /// Content that may be narrated; `None` for Empty and Failure.
    pub fn content(&self) -> Option<&str> {
        match self {
            FetchOutcome::Success { content } => Some(content.as_str()),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            FetchOutcome::Success { .. } => "success",
            FetchOutcome::Empty { .. } => "empty",
            FetchOutcome::Failure { .. } => "failure",
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, FetchOutcome::Success { .. })
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, FetchOutcome::Empty { .. })
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, FetchOutcome::Failure { .. })
    }
}

/// One topic slot of the aggregate: every requested source kind has exactly one outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TopicResult {
    pub topic: Topic,
    pub outcomes: BTreeMap<SourceKind, FetchOutcome>,
}

impl TopicResult {
    pub fn outcome(&self, kind: SourceKind) -> Option<&FetchOutcome> {
        self.outcomes.get(&kind)
    }

    /// True when at least one source produced narratable content.
    pub fn has_content(&self) -> bool {
        self.outcomes.values().any(FetchOutcome::is_success)
    }
}

/// Per-request aggregate, in caller topic order. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AggregatedResult {
    entries: Vec<TopicResult>,
}

impl AggregatedResult {
    pub(crate) fn from_entries(entries: Vec<TopicResult>) -> Self {
        Self { entries }
    }

    pub fn entries(&self) -> &[TopicResult] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// First slot for `topic` (duplicates keep their own later slots).
    pub fn get(&self, topic: &Topic) -> Option<&TopicResult> {
        self.entries.iter().find(|e| &e.topic == topic)
    }

    pub fn topics(&self) -> Vec<&Topic> {
        self.entries.iter().map(|e| &e.topic).collect()
    }

    /// (success, empty, failure) counts across all slots.
    pub fn tally(&self) -> (usize, usize, usize) {
        let mut t = (0, 0, 0);
        for outcome in self.entries.iter().flat_map(|e| e.outcomes.values()) {
            match outcome {
                FetchOutcome::Success { .. } => t.0 += 1,
                FetchOutcome::Empty { .. } => t.1 += 1,
                FetchOutcome::Failure { .. } => t.2 += 1,
            }
        }
        t
    }
}

/// Final narration text plus which topics it covers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BroadcastScript {
    pub text: String,
    pub covered_topics: Vec<Topic>,
}

impl BroadcastScript {
    pub fn block_count(&self) -> usize {
        self.covered_topics.len()
    }
}

pub const AUDIO_MIME: &str = "audio/mpeg";
pub const AUDIO_FILENAME: &str = "news-summary.mp3";

/// Opaque audio bytes handed to the caller boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioArtifact {
    pub bytes: Vec<u8>,
    pub mime: &'static str,
    pub filename: String,
}

impl AudioArtifact {
    pub fn mpeg(bytes: Vec<u8>) -> Self {
        Self {
            bytes,
            mime: AUDIO_MIME,
            filename: AUDIO_FILENAME.to_string(),
        }
    }
}

/// Request boundary consumed by the pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DigestRequest {
    pub topics: Vec<String>,
    #[serde(alias = "source_selection")]
    pub source_type: String,
}
