// src/composer.rs
//! Merges the aggregate into one ordered narration script with a single
//! "broadcast composition" summarizer call.

use std::sync::Arc;

use crate::summarize::{StyleHint, SummarizeFailure, SummarizerChain};
use crate::types::{AggregatedResult, BroadcastScript, Topic, TopicResult};

pub const TOPIC_SEPARATOR: &str = "\n\n--- NEW TOPIC ---\n\n";

pub struct ScriptComposer {
    summarizer: Arc<SummarizerChain>,
}

impl ScriptComposer {
    pub fn new(summarizer: Arc<SummarizerChain>) -> Self {
        Self { summarizer }
    }

    /// Text block for one topic, or `None` when no source produced content.
    pub fn topic_block(slot: &TopicResult) -> Option<String> {
        let sections: Vec<String> = slot
            .outcomes
            .iter()
            .filter_map(|(kind, outcome)| {
                outcome
                    .content()
                    .map(|c| format!("{}:\n{}", kind.block_label(), c.trim()))
            })
            .collect();
        if sections.is_empty() {
            return None;
        }
        Some(format!("TOPIC: {}\n\n{}", slot.topic, sections.join("\n\n")))
    }

    /// Blocks in caller topic order, plus the topics they cover.
    pub fn collect_blocks(topics: &[Topic], aggregated: &AggregatedResult) -> (Vec<String>, Vec<Topic>) {
        let mut blocks = Vec::new();
        let mut covered = Vec::new();
        for (i, topic) in topics.iter().enumerate() {
            // Slots are positional; fall back to lookup if the caller reordered.
            let slot = aggregated
                .entries()
                .get(i)
                .filter(|e| &e.topic == topic)
                .or_else(|| aggregated.get(topic));
            let Some(slot) = slot else {
                tracing::warn!(%topic, "topic missing from aggregate");
                continue;
            };
            match Self::topic_block(slot) {
                Some(block) => {
                    blocks.push(block);
                    covered.push(topic.clone());
                }
                None => tracing::info!(%topic, "topic has no retrievable content, skipped"),
            }
        }
        (blocks, covered)
    }

    /// Compose the final script. An aggregate with no content still composes.
    pub async fn compose(
        &self,
        topics: &[Topic],
        aggregated: &AggregatedResult,
    ) -> Result<BroadcastScript, SummarizeFailure> {
        let (blocks, covered) = Self::collect_blocks(topics, aggregated);
        let input = blocks.join(TOPIC_SEPARATOR);
        tracing::info!(blocks = blocks.len(), "composing broadcast script");

        let summary = self
            .summarizer
            .summarize(&input, StyleHint::BroadcastComposition)
            .await?;

        Ok(BroadcastScript {
            text: summary.text,
            covered_topics: covered,
        })
    }
}
