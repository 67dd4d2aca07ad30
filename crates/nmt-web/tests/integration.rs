//! Integration tests for the nmt-web crate.
//!
//! Drives the real Axum router in-process via `tower::ServiceExt::oneshot`
//! (no network socket), exercising the scenarios from spec §8.

use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use nmt_core::config::{ConfigSnapshot, DeviceKind, ModelFamilyKind};
use nmt_core::translator::fake::FakeModelSource;
use nmt_core::ScriptHeuristicDetector;
use nmt_web::{WebConfig, WebServer};
use serde_json::{json, Value};
use tower::ServiceExt;

fn test_app_config() -> Arc<ConfigSnapshot> {
    Arc::new(ConfigSnapshot {
        max_cached_models: 2,
        memory_check_interval: 1000,
        ram_warning_pct: 85.0,
        ram_critical_pct: 92.0,
        vram_warning_pct: 85.0,
        vram_critical_pct: 92.0,
        enable_memory_monitor: true,
        model_family: ModelFamilyKind::OpusMt,
        auto_family_fallback: true,
        family_fallback_order: vec![ModelFamilyKind::OpusMt, ModelFamilyKind::MBart50, ModelFamilyKind::M2M100],
        pivot_fallback: true,
        default_pivot_lang: "en".to_owned(),
        input_sanitize: true,
        min_alnum_ratio: 0.2,
        min_chars: 1,
        undetermined_code: "und".to_owned(),
        perform_sentence_splitting_default: true,
        max_sentence_chars: 500,
        max_chunk_chars: 900,
        join_with: " ".to_owned(),
        auto_chunk_enabled: true,
        auto_chunk_max_chars: 5000,
        symbol_masking: true,
        mask_digits: true,
        mask_punct: true,
        mask_emoji: true,
        markdown_sanitize: true,
        markdown_safe_mode: false,
        markdown_safe_mode_auto: true,
        markdown_max_depth: 6,
        markdown_problematic_pairs: Vec::new(),
        max_beam: Some(4),
        batch_size: 2,
        max_gen_tokens: 512,
        enable_queue: true,
        max_queue_size: 0,
        translate_timeout: None,
        max_inflight: 2,
        retry_after_min_sec: 1.0,
        retry_after_max_sec: 120.0,
        retry_after_alpha: 0.2,
        sanitize_placeholder: String::new(),
        align_responses: true,
        enable_metadata: false,
        metadata_via_headers: false,
        cuda_cache_clear_interval: None,
        idle_eviction_timeout: std::time::Duration::from_secs(1800),
        request_log: true,
        log_include_text: false,
        device: DeviceKind::Cpu,
        preload_models: String::new(),
    })
}

fn test_server() -> WebServer {
    WebServer::new(
        WebConfig::default(),
        test_app_config(),
        Arc::new(FakeModelSource { fail_repos: vec![] }),
        Arc::new(ScriptHeuristicDetector::new()),
    )
}

async fn body_json(resp: axum::response::Response) -> Value {
    let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[test]
fn web_config_defaults() {
    let config = WebConfig::default();
    assert_eq!(config.bind_addr, "127.0.0.1");
    assert_eq!(config.port, 3000);
}

#[tokio::test]
async fn healthz_is_ok() {
    let app = test_server().router();
    let resp = app
        .oneshot(Request::builder().uri("/healthz").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
async fn s1_direct_translate_single_string() {
    let app = test_server().router();
    let req = Request::builder()
        .method("POST")
        .uri("/translate")
        .header("content-type", "application/json")
        .body(Body::from(
            json!({"text":"Hello world","target_lang":"de","source_lang":"en","beam_size":1}).to_string(),
        ))
        .unwrap();

    let resp = app.oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_json(resp).await;
    assert_eq!(body["target_lang"], "de");
    assert_eq!(body["source_lang"], "en");
    assert_eq!(body["translated"].as_array().unwrap().len(), 1);
    assert!(body["translation_time"].as_f64().unwrap() >= 0.0);
}

#[tokio::test]
async fn s3_empty_input_returns_zero_time() {
    let app = test_server().router();
    let req = Request::builder()
        .method("POST")
        .uri("/translate")
        .header("content-type", "application/json")
        .body(Body::from(json!({"text":[],"target_lang":"de","source_lang":"en"}).to_string()))
        .unwrap();

    let resp = app.oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_json(resp).await;
    assert_eq!(body["translated"].as_array().unwrap().len(), 0);
    assert_eq!(body["translation_time"], 0.0);
}

#[tokio::test]
async fn s4_invalid_pair_rejected() {
    let app = test_server().router();
    let req = Request::builder()
        .method("POST")
        .uri("/translate")
        .header("content-type", "application/json")
        .body(Body::from(json!({"text":["Hi"],"target_lang":"en","source_lang":"en"}).to_string()))
        .unwrap();

    let resp = app.oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body = body_json(resp).await;
    assert_eq!(body["error"], "Unsupported language pair");
    assert_eq!(body["src"], "en");
    assert_eq!(body["tgt"], "en");
}

#[tokio::test]
async fn lang_pairs_endpoint_lists_cartesian_pairs() {
    let app = test_server().router();
    let resp = app
        .oneshot(Request::builder().uri("/lang_pairs").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_json(resp).await;
    assert!(!body["language_pairs"].as_array().unwrap().is_empty());
}
