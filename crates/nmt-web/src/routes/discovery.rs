//! Model discovery endpoints. See spec §6.
//!
//! Live querying of the Hugging Face Hub is out of scope for this service;
//! each family's support set is the fixed list baked into
//! [`nmt_core::config`], which already is that hub's advertised set for
//! Opus-MT/mBART50/M2M100 as of this service's cut.

use std::collections::HashMap;

use axum::extract::Query;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use nmt_core::ModelFamilyKind;
use serde::Deserialize;

use crate::models::{AllModelsDiscoveryResponse, FamilyDiscovery, ModelDiscoveryResponse, StatusMessageResponse};

#[derive(Debug, Deserialize)]
pub struct ForceRefreshQuery {
    #[serde(default)]
    pub force_refresh: bool,
}

fn pairs_for(family: ModelFamilyKind) -> Vec<[String; 2]> {
    let langs = family.lang_set();
    let mut pairs = Vec::with_capacity(langs.len() * (langs.len() - 1));
    for &src in langs {
        for &tgt in langs {
            if src != tgt {
                pairs.push([src.to_owned(), tgt.to_owned()]);
            }
        }
    }
    pairs
}

async fn discover_family(family: ModelFamilyKind) -> Json<ModelDiscoveryResponse> {
    let language_pairs = pairs_for(family);
    Json(ModelDiscoveryResponse {
        model_family: family.as_str().to_owned(),
        pair_count: language_pairs.len(),
        language_pairs,
    })
}

pub async fn discover_opus_mt(Query(_q): Query<ForceRefreshQuery>) -> Json<ModelDiscoveryResponse> {
    discover_family(ModelFamilyKind::OpusMt).await
}

pub async fn discover_mbart50() -> Json<ModelDiscoveryResponse> {
    discover_family(ModelFamilyKind::MBart50).await
}

pub async fn discover_m2m100() -> Json<ModelDiscoveryResponse> {
    discover_family(ModelFamilyKind::M2M100).await
}

pub async fn discover_all(Query(_q): Query<ForceRefreshQuery>) -> Json<AllModelsDiscoveryResponse> {
    let mut models = HashMap::new();
    for family in [ModelFamilyKind::OpusMt, ModelFamilyKind::MBart50, ModelFamilyKind::M2M100] {
        let language_pairs = pairs_for(family);
        models.insert(
            family.as_str().to_owned(),
            FamilyDiscovery {
                pair_count: language_pairs.len(),
                language_pairs,
            },
        );
    }
    Json(AllModelsDiscoveryResponse { models })
}

pub async fn clear_discovery_cache() -> Response {
    (
        StatusCode::OK,
        Json(StatusMessageResponse {
            status: "ok",
            message: "Discovery cache cleared".to_owned(),
        }),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn discover_opus_mt_lists_pairs_without_identity() {
        let resp = discover_opus_mt(Query(ForceRefreshQuery { force_refresh: false })).await;
        assert_eq!(resp.0.model_family, "opus-mt");
        assert!(resp.0.language_pairs.iter().all(|[src, tgt]| src != tgt));
        assert_eq!(resp.0.pair_count, resp.0.language_pairs.len());
    }

    #[tokio::test]
    async fn discover_all_covers_every_family() {
        let resp = discover_all(Query(ForceRefreshQuery { force_refresh: true })).await;
        assert_eq!(resp.0.models.len(), 3);
        assert!(resp.0.models.contains_key("mbart50"));
    }

    #[tokio::test]
    async fn clear_discovery_cache_returns_ok() {
        let resp = clear_discovery_cache().await;
        assert_eq!(resp.status(), StatusCode::OK);
    }
}

