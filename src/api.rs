// src/api.rs
use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, State},
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use sha2::{Digest, Sha256};
use tower_http::cors::CorsLayer;

use crate::error::{ErrorKind, PipelineError};
use crate::pipeline::Pipeline;
use crate::types::{AudioArtifact, DigestRequest};

#[derive(Clone)]
pub struct AppState {
    pipeline: Arc<Pipeline>,
}

impl AppState {
    pub fn new(pipeline: Arc<Pipeline>) -> Self {
        Self { pipeline }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/generate-news-audio", post(generate_news_audio))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    kind: ErrorKind,
    detail: String,
}

/// HTTP face of `PipelineError`.
pub struct ApiError(PipelineError);

impl From<PipelineError> for ApiError {
    fn from(e: PipelineError) -> Self {
        Self(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self.0.kind() {
            ErrorKind::InvalidInput => StatusCode::BAD_REQUEST,
            ErrorKind::CompositionFailure | ErrorKind::SynthesisFailure => StatusCode::BAD_GATEWAY,
        };
        let body = ErrorBody {
            kind: self.0.kind(),
            detail: self.0.detail(),
        };
        (status, Json(body)).into_response()
    }
}

async fn generate_news_audio(
    State(state): State<AppState>,
    body: Result<Json<DigestRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(req) = body.map_err(|e| PipelineError::InvalidInput(e.body_text()))?;
    tracing::info!(topics = req.topics.len(), source_type = %req.source_type, "generate-news-audio");

    let audio = state.pipeline.run(&req).await?;
    Ok(audio_response(audio))
}

fn audio_response(audio: AudioArtifact) -> Response {
    let etag = format!("\"{}\"", sha256_hex(&audio.bytes));
    let disposition = format!("attachment; filename={}", audio.filename);

    let mut resp = audio.bytes.into_response();
    let headers = resp.headers_mut();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(audio.mime));
    if let Ok(v) = HeaderValue::from_str(&disposition) {
        headers.insert(header::CONTENT_DISPOSITION, v);
    }
    if let Ok(v) = HeaderValue::from_str(&etag) {
        headers.insert(header::ETAG, v);
    }
    resp
}

fn sha256_hex(bytes: &[u8]) -> String {
    Sha256::digest(bytes)
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sha256_of_empty_input() {
        assert_eq!(
            sha256_hex(b""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn error_kinds_map_to_status() {
        let r = ApiError(PipelineError::InvalidInput("x".into())).into_response();
        assert_eq!(r.status(), StatusCode::BAD_REQUEST);
        let r = ApiError(PipelineError::SynthesisFailure("x".into())).into_response();
        assert_eq!(r.status(), StatusCode::BAD_GATEWAY);
    }
}
