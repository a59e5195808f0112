// tests/app_env.rs
//
// Process-level wiring: config lookup from env, mock test mode and the
// opt-in /metrics route. These tests mutate env vars, so they run serially.

use std::io::Write as _;

use axum::body::{self, Body};
use axum::http::{Request, StatusCode};
use serial_test::serial;
use tower::ServiceExt;

use topic_newscast::config::newscast::ENV_CONFIG_PATH;
use topic_newscast::config::NewscastConfig;

fn write_config(contents: &str) -> tempfile::NamedTempFile {
    let mut f = tempfile::NamedTempFile::new().expect("temp file");
    f.write_all(contents.as_bytes()).expect("write config");
    f
}

#[test]
#[serial]
fn config_path_env_is_honoured_and_secrets_resolved() {
    let f = write_config(
        r#"
        [limits]
        max_concurrency = 3

        [voice]
        api_key = "ENV"
        voice_id = "custom-voice"
        "#,
    );
    std::env::set_var(ENV_CONFIG_PATH, f.path());
    std::env::set_var("ELEVEN_API_KEY", "el-test-key");

    let cfg = NewscastConfig::load_default().expect("load config");

    std::env::remove_var(ENV_CONFIG_PATH);
    std::env::remove_var("ELEVEN_API_KEY");

    assert_eq!(cfg.limits.max_concurrency, 3);
    assert_eq!(cfg.limits.news_per_second, 5);
    assert_eq!(cfg.voice.voice_id, "custom-voice");
    assert_eq!(cfg.voice.api_key, "el-test-key");
}

#[test]
#[serial]
fn missing_config_path_is_an_error() {
    std::env::set_var(ENV_CONFIG_PATH, "/definitely/not/here.toml");
    let res = NewscastConfig::load_default();
    std::env::remove_var(ENV_CONFIG_PATH);
    assert!(res.is_err());
}

#[test]
#[serial]
fn malformed_toml_is_reported_with_context() {
    let f = write_config("[limits\nnews_per_second = ");
    let err = NewscastConfig::load_from_file(f.path()).unwrap_err();
    assert!(format!("{err:#}").contains("parsing newscast config"));
}

#[tokio::test]
#[serial]
async fn mock_mode_app_serves_audio_and_metrics() {
    std::env::set_var("NEWSCAST_TEST_MODE", "mock");
    std::env::set_var("DEBUG_ROUTES", "1");

    let app = topic_newscast::app().await.expect("app() should build Router in tests");

    let resp = app
        .clone()
        .oneshot(
            Request::post("/generate-news-audio")
                .header("content-type", "application/json")
                .body(Body::from(r#"{"topics":["sports"],"source_type":"both"}"#))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let audio = body::to_bytes(resp.into_body(), 1_048_576).await.unwrap();
    assert!(audio.starts_with(topic_newscast::synth::MOCK_AUDIO_HEADER));

    let resp = app
        .oneshot(Request::get("/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body = body::to_bytes(resp.into_body(), 1_048_576).await.unwrap();
    let text = String::from_utf8(body.to_vec()).unwrap();

    std::env::remove_var("NEWSCAST_TEST_MODE");
    std::env::remove_var("DEBUG_ROUTES");

    for needle in [
        "newscast_pipeline_runs_total",
        "newscast_fetch_outcomes_total",
        "newscast_pipeline_ms",
    ] {
        assert!(text.contains(needle), "missing {needle} in /metrics:\n{text}");
    }
}
