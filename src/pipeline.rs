// src/pipeline.rs
//! # Pipeline
//! Idle → Fetching → Composing → Synthesizing → Done, with `Failed` reachable
//! from Fetching (bad input), Composing and Synthesizing. Transitions only move
//! forward; retries live below this level, inside the fetchers.

use std::sync::Arc;
use std::time::Instant;

use metrics::{counter, histogram};
use serde::Serialize;

use crate::aggregator::{CancelSignal, TopicAggregator};
use crate::composer::ScriptComposer;
use crate::error::PipelineError;
use crate::synth::{speech_text, Synthesizer, VoiceParams};
use crate::types::{
    AggregatedResult, AudioArtifact, BroadcastScript, DigestRequest, SourceSelection, Topic,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PipelineState {
    Idle,
    Fetching,
    Composing,
    Synthesizing,
    Done,
    Failed,
}

/// Everything one invocation produced, for logging and tests.
#[derive(Debug)]
pub struct PipelineRun {
    pub states: Vec<PipelineState>,
    pub aggregated: Option<AggregatedResult>,
    pub script: Option<BroadcastScript>,
    pub result: Result<AudioArtifact, PipelineError>,
}

impl PipelineRun {
    fn new() -> Self {
        Self {
            states: vec![PipelineState::Idle],
            aggregated: None,
            script: None,
            result: Err(PipelineError::InvalidInput("pipeline did not run".to_string())),
        }
    }

    fn enter(&mut self, state: PipelineState) {
        tracing::debug!(?state, "pipeline transition");
        self.states.push(state);
    }

    fn fail(mut self, err: PipelineError) -> Self {
        tracing::warn!(kind = ?err.kind(), error = %err, "pipeline failed");
        self.enter(PipelineState::Failed);
        self.result = Err(err);
        self
    }

    pub fn final_state(&self) -> PipelineState {
        self.states.last().copied().unwrap_or(PipelineState::Idle)
    }
}

pub struct Pipeline {
    aggregator: TopicAggregator,
    composer: ScriptComposer,
    synthesizer: Arc<dyn Synthesizer>,
    voice: VoiceParams,
}

impl Pipeline {
    pub fn new(
        aggregator: TopicAggregator,
        composer: ScriptComposer,
        synthesizer: Arc<dyn Synthesizer>,
        voice: VoiceParams,
    ) -> Self {
        Self {
            aggregator,
            composer,
            synthesizer,
            voice,
        }
    }

    /// Convenience wrapper returning only the caller-facing result.
    pub async fn run(&self, req: &DigestRequest) -> Result<AudioArtifact, PipelineError> {
        self.execute(req).await.result
    }

    pub async fn execute(&self, req: &DigestRequest) -> PipelineRun {
        self.execute_with_cancel(req, &CancelSignal::new()).await
    }

    pub async fn execute_with_cancel(&self, req: &DigestRequest, cancel: &CancelSignal) -> PipelineRun {
        let t0 = Instant::now();
        let run = self.drive(req, cancel).await;

        let result = if run.result.is_ok() { "done" } else { "failed" };
        counter!("newscast_pipeline_runs_total", "result" => result).increment(1);
        histogram!("newscast_pipeline_ms").record(t0.elapsed().as_secs_f64() * 1_000.0);
        run
    }

    async fn drive(&self, req: &DigestRequest, cancel: &CancelSignal) -> PipelineRun {
        let mut run = PipelineRun::new();

        run.enter(PipelineState::Fetching);
        let (topics, selection) = match validate(req) {
            Ok(v) => v,
            Err(e) => return run.fail(e),
        };
        tracing::info!(topics = topics.len(), ?selection, "pipeline started");

        let aggregated = self
            .aggregator
            .aggregate_with_cancel(&topics, &selection.kinds(), cancel)
            .await;

        run.enter(PipelineState::Composing);
        let script = match self.composer.compose(&topics, &aggregated).await {
            Ok(s) => s,
            Err(e) => {
                run.aggregated = Some(aggregated);
                return run.fail(PipelineError::CompositionFailure(e.to_string()));
            }
        };
        run.aggregated = Some(aggregated);

        run.enter(PipelineState::Synthesizing);
        let spoken = speech_text(&script.text);
        run.script = Some(script);
        let bytes = match self.synthesizer.synthesize(&spoken, &self.voice).await {
            Ok(b) if b.is_empty() => {
                return run.fail(PipelineError::SynthesisFailure(
                    "synthesizer returned an empty artifact".to_string(),
                ))
            }
            Ok(b) => b,
            Err(e) => return run.fail(PipelineError::SynthesisFailure(e.to_string())),
        };

        tracing::info!(
            bytes = bytes.len(),
            synthesizer = self.synthesizer.name(),
            "pipeline done"
        );
        run.enter(PipelineState::Done);
        run.result = Ok(AudioArtifact::mpeg(bytes));
        run
    }
}

/// Input checks that must pass before any fetch unit launches.
pub fn validate(req: &DigestRequest) -> Result<(Vec<Topic>, SourceSelection), PipelineError> {
    if req.topics.is_empty() {
        return Err(PipelineError::InvalidInput(
            "at least one topic is required".to_string(),
        ));
    }
    let selection: SourceSelection = req.source_type.parse()?;
    let topics = req
        .topics
        .iter()
        .map(Topic::new)
        .collect::<Result<Vec<_>, _>>()?;
    Ok((topics, selection))
}
