//! Language metadata and detection endpoints. See spec §6.

use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::{Query, State};
use axum::Json;

use crate::models::{
    LanguageDetectionGetQuery, LanguageDetectionPayload, LanguageDetectionPostBody,
    LanguageDetectionPostResponse, LanguageDetectionResponse, LanguagePairsQuery,
    LanguagePairsResponse, LanguagesResponse,
};
use crate::state::AppState;

pub async fn lang_pairs(State(state): State<Arc<AppState>>) -> Json<LanguagePairsResponse> {
    let langs = state.config.supported_langs();
    let mut pairs = Vec::new();
    for &src in langs {
        for &tgt in langs {
            if src != tgt {
                pairs.push([src.to_owned(), tgt.to_owned()]);
            }
        }
    }
    Json(LanguagePairsResponse { language_pairs: pairs })
}

pub async fn get_languages(
    State(state): State<Arc<AppState>>,
    Query(q): Query<LanguagePairsQuery>,
) -> Json<LanguagesResponse> {
    let langs = state.config.supported_langs();
    let languages = if let Some(src) = q.source_lang.as_deref().filter(|s| langs.contains(s)) {
        langs.iter().filter(|&&l| l != src).map(str::to_owned).collect()
    } else if let Some(tgt) = q.target_lang.as_deref().filter(|t| langs.contains(t)) {
        langs.iter().filter(|&&l| l != tgt).map(str::to_owned).collect()
    } else {
        langs.iter().map(|&l| l.to_owned()).collect()
    };
    Json(LanguagesResponse { languages })
}

pub async fn language_detection_get(
    State(state): State<Arc<AppState>>,
    Query(q): Query<LanguageDetectionGetQuery>,
) -> Json<LanguageDetectionResponse> {
    let config = &state.config;
    let language = state
        .detector
        .detect(&q.text, config.min_chars, config.min_alnum_ratio, &config.undetermined_code);
    Json(LanguageDetectionResponse { language })
}

pub async fn language_detection_post(
    State(state): State<Arc<AppState>>,
    Json(body): Json<LanguageDetectionPostBody>,
) -> Json<LanguageDetectionPostResponse> {
    let config = &state.config;
    let detect = |t: &str| {
        state
            .detector
            .detect(t, config.min_chars, config.min_alnum_ratio, &config.undetermined_code)
    };

    let response = match body.text {
        LanguageDetectionPayload::One(text) => LanguageDetectionPostResponse::Single {
            language: detect(&text),
        },
        LanguageDetectionPayload::Many(texts) => LanguageDetectionPostResponse::Batch {
            languages: texts.iter().map(|t| detect(t)).collect(),
        },
        LanguageDetectionPayload::Keyed(map) => {
            let out: HashMap<String, String> =
                map.into_iter().map(|(k, v)| (k, detect(&v))).collect();
            LanguageDetectionPostResponse::Keyed(out)
        }
    };

    Json(response)
}

#[cfg(test)]
mod tests {
    use crate::state::test_support::test_state;

    use super::*;

    #[tokio::test]
    async fn lang_pairs_excludes_identical_pairs() {
        let state = test_state();
        let resp = lang_pairs(State(state)).await;
        assert!(resp.0.language_pairs.iter().all(|[src, tgt]| src != tgt));
        assert!(!resp.0.language_pairs.is_empty());
    }

    #[tokio::test]
    async fn get_languages_filters_by_source_lang() {
        let state = test_state();
        let query = LanguagePairsQuery {
            source_lang: Some("en".to_owned()),
            target_lang: None,
        };
        let resp = get_languages(State(state), Query(query)).await;
        assert!(!resp.0.languages.contains(&"en".to_owned()));
    }

    #[tokio::test]
    async fn language_detection_get_returns_a_code() {
        let state = test_state();
        let query = LanguageDetectionGetQuery {
            text: "Bonjour le monde".to_owned(),
        };
        let resp = language_detection_get(State(state), Query(query)).await;
        assert!(!resp.0.language.is_empty());
    }

    #[tokio::test]
    async fn language_detection_post_batches_list_payload() {
        let state = test_state();
        let body = LanguageDetectionPostBody {
            text: LanguageDetectionPayload::Many(vec!["Hello".to_owned(), "Hola".to_owned()]),
        };
        let resp = language_detection_post(State(state), Json(body)).await;
        match resp.0 {
            LanguageDetectionPostResponse::Batch { languages } => assert_eq!(languages.len(), 2),
            other => panic!("expected Batch variant, got {other:?}"),
        }
    }
}
