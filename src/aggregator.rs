// src/aggregator.rs
//! # Topic Aggregator
//! Fans out one unit of work per (topic, source kind), bounded by a concurrency
//! cap, and fans the outcomes back in to caller topic order.
//!
//! Each unit runs as its own tokio task and writes into a slot that was
//! allocated before launch, so completion order never affects output order and
//! a failing or panicking unit only ever touches its own slot.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use metrics::histogram;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;

use crate::sources::DynFetcher;
use crate::types::{AggregatedResult, FetchOutcome, SourceKind, Topic, TopicResult};

/// Cooperative stop flag: no new units are launched once raised; running ones drain.
#[derive(Debug, Clone, Default)]
pub struct CancelSignal(Arc<AtomicBool>);

impl CancelSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

enum Slot {
    Running(JoinHandle<FetchOutcome>),
    Done(FetchOutcome),
}

pub struct TopicAggregator {
    fetchers: HashMap<SourceKind, DynFetcher>,
    max_concurrency: usize,
}

impl TopicAggregator {
    pub fn new(max_concurrency: usize) -> Self {
        Self {
            fetchers: HashMap::new(),
            max_concurrency: max_concurrency.max(1),
        }
    }

    /// Register the fetcher for its own kind (replaces an earlier one).
    pub fn with_fetcher(mut self, fetcher: DynFetcher) -> Self {
        self.fetchers.insert(fetcher.kind(), fetcher);
        self
    }

    pub fn max_concurrency(&self) -> usize {
        self.max_concurrency
    }

    pub async fn aggregate(&self, topics: &[Topic], kinds: &[SourceKind]) -> AggregatedResult {
        self.aggregate_with_cancel(topics, kinds, &CancelSignal::new())
            .await
    }

    pub async fn aggregate_with_cancel(
        &self,
        topics: &[Topic],
        kinds: &[SourceKind],
        cancel: &CancelSignal,
    ) -> AggregatedResult {
        let t0 = Instant::now();

        // Kinds are a set: keep first occurrence, preserve order.
        let mut unique_kinds: Vec<SourceKind> = Vec::with_capacity(kinds.len());
        for k in kinds {
            if !unique_kinds.contains(k) {
                unique_kinds.push(*k);
            }
        }

        let sem = Arc::new(Semaphore::new(self.max_concurrency));
        let mut slots: Vec<Vec<(SourceKind, Slot)>> = Vec::with_capacity(topics.len());

        for topic in topics {
            let mut row = Vec::with_capacity(unique_kinds.len());
            for &kind in &unique_kinds {
                let slot = self.launch(topic, kind, &sem, cancel).await;
                row.push((kind, slot));
            }
            slots.push(row);
        }

        let mut entries = Vec::with_capacity(topics.len());
        for (topic, row) in topics.iter().zip(slots) {
            let mut outcomes = BTreeMap::new();
            for (kind, slot) in row {
                let outcome = match slot {
                    Slot::Done(o) => o,
                    Slot::Running(handle) => handle.await.unwrap_or_else(|e| {
                        tracing::error!(%topic, source = kind.as_str(), error = %e, "fetch unit aborted");
                        FetchOutcome::failure(format!("fetch unit aborted: {e}"))
                    }),
                };
                outcomes.insert(kind, outcome);
            }
            entries.push(TopicResult {
                topic: topic.clone(),
                outcomes,
            });
        }

        let result = AggregatedResult::from_entries(entries);
        let (ok, empty, failed) = result.tally();
        histogram!("newscast_aggregate_ms").record(t0.elapsed().as_secs_f64() * 1_000.0);
        tracing::info!(
            topics = topics.len(),
            kinds = unique_kinds.len(),
            ok,
            empty,
            failed,
            "aggregation finished"
        );
        result
    }

    async fn launch(
        &self,
        topic: &Topic,
        kind: SourceKind,
        sem: &Arc<Semaphore>,
        cancel: &CancelSignal,
    ) -> Slot {
        let Some(fetcher) = self.fetchers.get(&kind).cloned() else {
            return Slot::Done(FetchOutcome::failure(format!(
                "no fetcher configured for {kind} source"
            )));
        };
        if cancel.is_cancelled() {
            return Slot::Done(FetchOutcome::failure("cancelled before launch"));
        }

        let permit = match sem.clone().acquire_owned().await {
            Ok(p) => p,
            Err(_) => {
                return Slot::Done(FetchOutcome::failure("concurrency limiter closed"));
            }
        };
        // The wait for a permit may have overlapped a cancellation.
        if cancel.is_cancelled() {
            return Slot::Done(FetchOutcome::failure("cancelled before launch"));
        }

        let topic = topic.clone();
        Slot::Running(tokio::spawn(async move {
            let _permit = permit;
            fetcher.fetch(&topic).await
        }))
    }
}
