//! `GET`/`POST /translate`: the core translation endpoints. See spec §4.9.

use std::sync::Arc;
use std::time::Instant;

use axum::extract::{Query, State};
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Response};
use axum::Json;
use nmt_core::error::NmtError;
use nmt_core::text::is_noise;
use uuid::Uuid;

use crate::error::ApiError;
use crate::models::{
    TranslateGetQuery, TranslatePostBody, TranslatePostResponse, TranslateResponse,
    TranslationMetadata,
};
use crate::state::AppState;

fn request_id(headers: &HeaderMap) -> String {
    headers
        .get("X-Request-ID")
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_owned())
        .unwrap_or_else(|| Uuid::now_v7().to_string())
}

fn metadata_requested(headers: &HeaderMap, config_enabled: bool) -> bool {
    if config_enabled {
        return true;
    }
    headers
        .get("X-Enable-Metadata")
        .and_then(|v| v.to_str().ok())
        .map(|v| matches!(v.to_lowercase().as_str(), "1" | "true" | "yes"))
        .unwrap_or(false)
}

fn validate_pair(state: &AppState, src: &str, tgt: &str) -> Result<(), NmtError> {
    let family = state.config.model_family;
    if src == tgt || !family.supports(src, tgt) {
        return Err(NmtError::UnsupportedLanguagePair {
            src: src.to_owned(),
            tgt: tgt.to_owned(),
        });
    }
    Ok(())
}

/// Detect the source language from the first non-noise text, or `""` if
/// every text is noise (or the list is empty).
fn auto_detect_source(state: &AppState, texts: &[String]) -> String {
    let config = &state.config;
    texts
        .iter()
        .find(|t| !is_noise(t, config.min_chars, config.min_alnum_ratio))
        .map(|t| state.detector.detect(t, config.min_chars, config.min_alnum_ratio, &config.undetermined_code))
        .unwrap_or_default()
}

async fn translate_error_response(state: &Arc<AppState>, err: NmtError) -> Response {
    let waiters = match &err {
        NmtError::QueueOverflow { waiters } => Some(*waiters),
        _ => None,
    };
    let retry_after = state.queue.estimate_retry_after(waiters).await;
    ApiError::new(err, retry_after).into_response()
}

pub async fn translate_get(
    State(state): State<Arc<AppState>>,
    Query(q): Query<TranslateGetQuery>,
    headers: HeaderMap,
) -> Response {
    let req_id = request_id(&headers);
    let texts = vec![q.text];
    let source_lang = if q.source_lang.is_empty() {
        auto_detect_source(&state, &texts)
    } else {
        q.source_lang.clone()
    };

    if let Err(err) = validate_pair(&state, &source_lang, &q.target_lang) {
        return translate_error_response(&state, err).await;
    }

    let slot = match state.queue.acquire_slot().await {
        Ok(slot) => slot,
        Err(err) => return translate_error_response(&state, err).await,
    };

    let started = Instant::now();
    tracing::debug!(request_id = %req_id, src = %source_lang, tgt = %q.target_lang, "translate (GET)");

    let run = state.engine.translate(
        &texts,
        &source_lang,
        &q.target_lang,
        q.beam_size,
        q.perform_sentence_splitting,
        None,
        false,
    );

    let result = match state.config.translate_timeout {
        Some(timeout) => match tokio::time::timeout(timeout, run).await {
            Ok(r) => r,
            Err(_) => {
                drop(slot);
                return translate_error_response(&state, NmtError::TranslationTimeout).await;
            }
        },
        None => run.await,
    };
    drop(slot);

    if !result.translations.is_empty() {
        state.queue.record_duration(started.elapsed().as_secs_f64()).await;
    }

    let pivot_path = result
        .pivot_used
        .then(|| format!("{}->{}->{}", source_lang, pivot_label(&state, &source_lang, &q.target_lang), q.target_lang));

    Json(TranslateResponse {
        translations: result.translations,
        pivot_path,
    })
    .into_response()
}

pub async fn translate_post(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<TranslatePostBody>,
) -> Response {
    let req_id = request_id(&headers);
    let texts = body.text.into_vec();

    let (source_lang, was_auto_detected) = if body.source_lang.is_empty() {
        (auto_detect_source(&state, &texts), true)
    } else {
        (body.source_lang.clone(), false)
    };

    if !texts.is_empty() {
        if let Err(err) = validate_pair(&state, &source_lang, &body.target_lang) {
            return translate_error_response(&state, err).await;
        }
    }

    if texts.is_empty() {
        return Json(TranslatePostResponse {
            target_lang: body.target_lang,
            source_lang,
            detected_langs: None,
            translated: Vec::new(),
            translation_time: 0.0,
            pivot_path: None,
            metadata: None,
        })
        .into_response();
    }

    let slot = match state.queue.acquire_slot().await {
        Ok(slot) => slot,
        Err(err) => return translate_error_response(&state, err).await,
    };

    let started = Instant::now();
    let want_metadata = metadata_requested(&headers, state.config.enable_metadata);
    tracing::debug!(request_id = %req_id, src = %source_lang, tgt = %body.target_lang, "translate (POST)");

    let run = state.engine.translate(
        &texts,
        &source_lang,
        &body.target_lang,
        body.beam_size,
        body.perform_sentence_splitting,
        None,
        want_metadata,
    );

    let result = match state.config.translate_timeout {
        Some(timeout) => match tokio::time::timeout(timeout, run).await {
            Ok(r) => r,
            Err(_) => {
                drop(slot);
                return translate_error_response(&state, NmtError::TranslationTimeout).await;
            }
        },
        None => run.await,
    };
    drop(slot);

    let elapsed = started.elapsed().as_secs_f64();
    if !result.translations.is_empty() {
        state.queue.record_duration(elapsed).await;
    }

    let pivot_path = result.pivot_used.then(|| {
        format!(
            "{}->{}->{}",
            source_lang,
            pivot_label(&state, &source_lang, &body.target_lang),
            body.target_lang
        )
    });

    let detected_langs = was_auto_detected.then(|| vec![source_lang.clone()]);

    Json(TranslatePostResponse {
        target_lang: body.target_lang,
        source_lang,
        detected_langs,
        translated: result.translations,
        translation_time: elapsed,
        pivot_path,
        metadata: result.metadata.map(|m| TranslationMetadata {
            model_name: m.model_name,
            model_family: m.family,
            languages_used: m.languages_used,
            chunks_processed: m.chunks_processed,
            chunk_size: m.chunk_size,
            auto_chunked: m.auto_chunked,
        }),
    })
    .into_response()
}

/// The pivot language actually used, recovered for display purposes. The
/// engine doesn't thread the chosen pivot back out on [`TranslationResult`];
/// since the router is deterministic given `(src, tgt)`, recomputing it here
/// is cheap and avoids widening the engine's return type for a display-only
/// field.
fn pivot_label(state: &AppState, src: &str, tgt: &str) -> String {
    let router = nmt_core::PivotRouter::new(&state.config, &state.config.family_fallback_order);
    router
        .select_pivot(src, tgt)
        .map(str::to_owned)
        .unwrap_or_else(|| state.config.default_pivot_lang.clone())
}

#[cfg(test)]
mod tests {
    use axum::extract::{Query, State};
    use axum::http::HeaderMap;

    use crate::state::test_support::test_state;

    use super::*;

    #[tokio::test]
    async fn post_translate_direct_pair_returns_translations() {
        let state = test_state();
        let body = TranslatePostBody {
            text: crate::models::TextOrList::One("Hello world".to_owned()),
            target_lang: "de".to_owned(),
            source_lang: "en".to_owned(),
            beam_size: 1,
            perform_sentence_splitting: true,
        };

        let resp = translate_post(State(state), HeaderMap::new(), Json(body)).await;
        assert_eq!(resp.into_response().status(), axum::http::StatusCode::OK);
    }

    #[tokio::test]
    async fn post_translate_rejects_identical_src_and_tgt() {
        let state = test_state();
        let body = TranslatePostBody {
            text: crate::models::TextOrList::One("Hi".to_owned()),
            target_lang: "en".to_owned(),
            source_lang: "en".to_owned(),
            beam_size: 5,
            perform_sentence_splitting: true,
        };

        let resp = translate_post(State(state), HeaderMap::new(), Json(body)).await;
        assert_eq!(resp.into_response().status(), axum::http::StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn post_translate_empty_list_returns_zero_time() {
        let state = test_state();
        let body = TranslatePostBody {
            text: crate::models::TextOrList::Many(vec![]),
            target_lang: "de".to_owned(),
            source_lang: "en".to_owned(),
            beam_size: 5,
            perform_sentence_splitting: true,
        };

        let resp = translate_post(State(state), HeaderMap::new(), Json(body))
            .await
            .into_response();
        assert_eq!(resp.status(), axum::http::StatusCode::OK);
    }

    #[tokio::test]
    async fn get_translate_returns_single_translation() {
        let state = test_state();
        let query = TranslateGetQuery {
            text: "Good morning".to_owned(),
            target_lang: "de".to_owned(),
            source_lang: "en".to_owned(),
            beam_size: 1,
            perform_sentence_splitting: true,
        };

        let resp = translate_get(State(state), Query(query), HeaderMap::new()).await;
        assert_eq!(resp.into_response().status(), axum::http::StatusCode::OK);
    }

    #[tokio::test]
    async fn second_concurrent_request_overflows_queue() {
        let state = test_state();
        let first = state.queue.acquire_slot().await.expect("first slot free");

        let body = TranslatePostBody {
            text: crate::models::TextOrList::One("Hello".to_owned()),
            target_lang: "de".to_owned(),
            source_lang: "en".to_owned(),
            beam_size: 5,
            perform_sentence_splitting: true,
        };

        let resp = translate_post(State(Arc::clone(&state)), HeaderMap::new(), Json(body))
            .await
            .into_response();
        assert_eq!(resp.status(), axum::http::StatusCode::TOO_MANY_REQUESTS);
        drop(first);
    }
}
