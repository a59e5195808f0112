// tests/api_http.rs
//
// HTTP-level tests for the public Router without opening sockets.
// We exercise the router directly via tower::ServiceExt::oneshot.
//
// Covered:
// - GET /health
// - POST /generate-news-audio (audio headers, error JSON shape and status)

mod common;

use std::sync::Arc;

use axum::{
    body::{self, Body},
    Router,
};
use http::{header, Request, StatusCode};
use common::{pipeline, post, CountingSummarizer, RecordingSynth, ScriptedDiscussion, ScriptedNews, SummaryMode, SynthMode};
use serde_json::{json, Value as Json};
use tower::ServiceExt as _; // for `oneshot`

use topic_newscast::api::{self, AppState};

const BODY_LIMIT: usize = 1024 * 1024;

fn test_router(synth: SynthMode) -> Router {
    let p = pipeline(
        Arc::new(ScriptedNews::titles(&["Headline one", "Headline two"])),
        Arc::new(ScriptedDiscussion::posts(vec![post("thread", 1)])),
        CountingSummarizer::new("primary", SummaryMode::Echo),
        None,
        RecordingSynth::new(synth),
    );
    api::router(AppState::new(Arc::new(p)))
}

fn generate(payload: String) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/generate-news-audio")
        .header("content-type", "application/json")
        .body(Body::from(payload))
        .expect("build POST /generate-news-audio")
}

async fn json_body(resp: axum::response::Response) -> Json {
    let bytes = body::to_bytes(resp.into_body(), BODY_LIMIT)
        .await
        .expect("read body");
    serde_json::from_slice(&bytes).expect("parse json")
}

#[tokio::test]
async fn health_returns_ok() {
    let req = Request::builder()
        .uri("/health")
        .body(Body::empty())
        .expect("build GET /health");
    let resp = test_router(SynthMode::Audio).oneshot(req).await.expect("oneshot /health");
    assert_eq!(resp.status(), StatusCode::OK);
    let bytes = body::to_bytes(resp.into_body(), BODY_LIMIT).await.unwrap();
    assert_eq!(&bytes[..], b"ok");
}

#[tokio::test(start_paused = true)]
async fn generate_returns_mp3_attachment_with_etag() {
    let payload = json!({ "topics": ["sports", "weather"], "source_type": "both" });
    let resp = test_router(SynthMode::Audio)
        .oneshot(generate(payload.to_string()))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let h = resp.headers();
    assert_eq!(h.get(header::CONTENT_TYPE).unwrap(), "audio/mpeg");
    assert_eq!(
        h.get(header::CONTENT_DISPOSITION).unwrap(),
        "attachment; filename=news-summary.mp3"
    );
    let etag = h.get(header::ETAG).unwrap().to_str().unwrap().to_string();
    assert_eq!(etag.len(), 64 + 2, "quoted sha256 hex: {etag}");

    let bytes = body::to_bytes(resp.into_body(), BODY_LIMIT).await.unwrap();
    assert!(bytes.starts_with(b"MP3:"));
}

#[tokio::test]
async fn reddit_is_accepted_as_discussion_alias() {
    let payload = json!({ "topics": ["rust"], "source_type": "reddit" });
    let resp = test_router(SynthMode::Audio)
        .oneshot(generate(payload.to_string()))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
async fn empty_topics_is_400_with_kind() {
    let payload = json!({ "topics": [], "source_type": "news" });
    let resp = test_router(SynthMode::Audio)
        .oneshot(generate(payload.to_string()))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let v = json_body(resp).await;
    assert_eq!(v["kind"], "invalid_input");
    assert!(v["detail"].as_str().unwrap().contains("topic"));
}

#[tokio::test]
async fn malformed_body_is_invalid_input() {
    let resp = test_router(SynthMode::Audio)
        .oneshot(generate("{\"topics\": \"sports\"}".to_string()))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(resp).await["kind"], "invalid_input");
}

#[tokio::test]
async fn synthesis_failure_is_502() {
    let payload = json!({ "topics": ["sports"], "source_type": "news" });
    let resp = test_router(SynthMode::Fail)
        .oneshot(generate(payload.to_string()))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_GATEWAY);
    assert_eq!(json_body(resp).await["kind"], "synthesis_failure");
}
