// src/metrics.rs
use anyhow::{anyhow, Result};
use axum::{routing::get, Router};
use metrics::{describe_counter, describe_histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;

pub struct Metrics {
    pub handle: PrometheusHandle,
}

static HANDLE: OnceCell<PrometheusHandle> = OnceCell::new();

impl Metrics {
    /// Install the Prometheus recorder once per process; later calls reuse it.
    pub fn init() -> Result<Self> {
        let handle = HANDLE.get_or_try_init(|| {
            let handle = PrometheusBuilder::new()
                .install_recorder()
                .map_err(|e| anyhow!("prometheus: install recorder: {e}"))?;
            describe_all();
            Ok::<_, anyhow::Error>(handle)
        })?;
        Ok(Self {
            handle: handle.clone(),
        })
    }

    /// Returns a router exposing `/metrics` with the Prometheus exposition format.
    pub fn router(&self) -> Router {
        let handle = self.handle.clone();
        Router::new().route(
            "/metrics",
            get(move || {
                let h = handle.clone();
                async move { h.render() }
            }),
        )
    }
}

fn describe_all() {
    describe_counter!(
        "newscast_fetch_outcomes_total",
        "Fetch units finished, by source and outcome."
    );
    describe_counter!(
        "newscast_retry_attempts_total",
        "Attempts made under the retry policy, by operation."
    );
    describe_counter!(
        "newscast_summarize_fallback_total",
        "Times the fallback summarizer was consulted."
    );
    describe_counter!(
        "newscast_pipeline_runs_total",
        "Pipeline invocations, by final result."
    );
    describe_histogram!("newscast_pipeline_ms", "End-to-end pipeline time in milliseconds.");
    describe_histogram!("newscast_aggregate_ms", "Fan-out/fan-in time in milliseconds.");
    describe_histogram!(
        "newscast_ratelimit_wait_ms",
        "Time spent waiting for a rate limiter token in milliseconds."
    );
}
