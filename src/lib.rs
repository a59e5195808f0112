// src/lib.rs
// Public library surface for the binaries and integration tests.

pub mod aggregator;
pub mod api;
pub mod bootstrap;
pub mod composer;
pub mod config;
pub mod error;
pub mod limiter;
pub mod metrics;
pub mod pipeline;
pub mod retry;
pub mod sources;
pub mod summarize;
pub mod synth;
pub mod types;

// ---- Re-exports for stable public API ----
pub use crate::api::router;
pub use crate::error::{ErrorKind, PipelineError};
pub use crate::pipeline::{Pipeline, PipelineRun, PipelineState};
pub use crate::types::{AudioArtifact, DigestRequest, FetchOutcome, SourceKind, Topic};

use std::sync::Arc;

use axum::Router;
use tracing::info;

/// Debug routes (`/metrics`) are opt-in per process.
fn debug_routes_enabled() -> bool {
    std::env::var("DEBUG_ROUTES").is_ok_and(|v| v == "1")
}

/// Build the full in-process app: config → pipeline → router (+ `/metrics` when enabled).
pub async fn app() -> anyhow::Result<Router> {
    let pipeline = bootstrap::pipeline_from_env()?;
    let mut app = api::router(api::AppState::new(Arc::new(pipeline)));

    if debug_routes_enabled() {
        let m = crate::metrics::Metrics::init()?;
        app = app.merge(m.router());
        info!("debug routes enabled: /metrics");
    }
    Ok(app)
}
