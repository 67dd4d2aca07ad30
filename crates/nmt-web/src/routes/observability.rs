//! Health, readiness, cache-status, and model-info endpoints. See spec §6.

use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::State;
use axum::Json;

use crate::models::{CacheStatusResponse, HealthResponse, LoggingInfo, ModelInfoResponse, ReadinessResponse};
use crate::state::AppState;

pub async fn healthz() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

pub async fn readyz(State(state): State<Arc<AppState>>) -> Json<ReadinessResponse> {
    let critical = state.cache.is_memory_critical();
    Json(ReadinessResponse {
        status: if critical { "degraded" } else { "ready" },
        device: state.config.device.as_label(),
        queue_enabled: state.config.enable_queue,
        max_inflight: state.config.max_inflight,
    })
}

pub async fn cache_status(State(state): State<Arc<AppState>>) -> Json<CacheStatusResponse> {
    let status = state.cache.status().await;
    Json(CacheStatusResponse {
        capacity: status.capacity,
        size: status.size,
        keys: status.keys,
        device: state.config.device.as_label(),
        inflight: state.config.max_inflight,
        queue_enabled: state.config.enable_queue,
    })
}

pub async fn model_name(State(state): State<Arc<AppState>>) -> Json<ModelInfoResponse> {
    let config = &state.config;
    let mut workers = HashMap::new();
    workers.insert("backend".to_owned(), config.max_inflight);
    workers.insert("frontend".to_owned(), config.batch_size);

    Json(ModelInfoResponse {
        model_name: format!("{} (dynamic)", config.model_family.as_str()),
        device: config.device.as_label(),
        easynmt_model: config.model_family.as_str().to_owned(),
        batch_size: config.batch_size,
        max_text_len: Some(config.max_gen_tokens),
        max_beam_size: config.max_beam,
        workers,
        input_sanitize: config.input_sanitize,
        input_sanitize_min_alnum_ratio: config.min_alnum_ratio,
        input_sanitize_min_chars: config.min_chars,
        undetermined_lang_code: config.undetermined_code.clone(),
        align_responses: config.align_responses,
        sanitize_placeholder: config.sanitize_placeholder.clone(),
        sentence_splitting_default: config.perform_sentence_splitting_default,
        max_sentence_chars: config.max_sentence_chars,
        max_chunk_chars: config.max_chunk_chars,
        join_sentences_with: config.join_with.clone(),
        pivot_fallback: config.pivot_fallback,
        pivot_lang: config.default_pivot_lang.clone(),
        logging: LoggingInfo {
            log_level: "info".to_owned(),
            log_to_file: false,
            log_file_path: None,
            log_format: "pretty".to_owned(),
            request_log: config.request_log,
            log_include_text: config.log_include_text,
        },
    })
}

#[cfg(test)]
mod tests {
    use crate::state::test_support::test_state;

    use super::*;

    #[tokio::test]
    async fn healthz_reports_ok() {
        let resp = healthz().await;
        assert_eq!(resp.0.status, "ok");
    }

    #[tokio::test]
    async fn readyz_reports_ready_under_normal_memory() {
        let state = test_state();
        let resp = readyz(State(state)).await;
        assert_eq!(resp.0.status, "ready");
        assert_eq!(resp.0.device, "cpu");
    }

    #[tokio::test]
    async fn cache_status_reports_configured_capacity() {
        let state = test_state();
        let resp = cache_status(State(state.clone())).await;
        assert_eq!(resp.0.capacity, state.config.max_cached_models);
        assert_eq!(resp.0.size, 0);
    }

    #[tokio::test]
    async fn model_name_reports_configured_family() {
        let state = test_state();
        let resp = model_name(State(state.clone())).await;
        assert_eq!(resp.0.easynmt_model, state.config.model_family.as_str());
        assert_eq!(resp.0.workers["backend"], state.config.max_inflight);
    }
}
