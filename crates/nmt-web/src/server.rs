//! Main web server setup and startup.
//!
//! [`WebServer`] composes the Axum router, registers all routes, and starts
//! the HTTP listener.

use std::sync::Arc;

use axum::http::{HeaderValue, Method};
use axum::routing::{get, post};
use axum::Router;
use nmt_core::{ConfigSnapshot, LanguageDetector, ModelCache, ModelManager, ModelSource, QueueManager, TranslationEngine};
use tower_http::cors::CorsLayer;

use crate::routes::{discovery, language, observability, translation};
use crate::state::AppState;
use crate::{maintenance, WebConfig};

/// The translation service's web server.
pub struct WebServer {
    config: WebConfig,
    state: Arc<AppState>,
}

impl WebServer {
    /// Build the full service: model cache, manager, engine, and queue,
    /// wired from `app_config`. `source` is the opaque model-loading
    /// backend and `detector` the source-language identifier.
    pub fn new(
        config: WebConfig,
        app_config: Arc<ConfigSnapshot>,
        source: Arc<dyn ModelSource>,
        detector: Arc<dyn LanguageDetector>,
    ) -> Self {
        let cache = Arc::new(ModelCache::new(
            app_config.max_cached_models,
            app_config.memory_check_interval,
            app_config.ram_warning_pct,
            app_config.ram_critical_pct,
            app_config.vram_warning_pct,
            app_config.vram_critical_pct,
        ));
        let manager = Arc::new(ModelManager::new(app_config.clone(), cache.clone(), source));
        let engine = Arc::new(TranslationEngine::new(app_config.clone(), manager.clone()));
        let queue = Arc::new(QueueManager::new(
            app_config.max_inflight,
            app_config.max_queue_size,
            app_config.enable_queue,
            app_config.retry_after_min_sec,
            app_config.retry_after_max_sec,
            app_config.retry_after_alpha,
        ));

        let state = Arc::new(AppState::new(app_config, cache, manager, engine, queue, detector));
        Self { config, state }
    }

    /// Return the `host:port` string this server will bind to.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.config.bind_addr, self.config.port)
    }

    /// Build the Axum router with all routes registered.
    pub fn router(&self) -> Router {
        let cors = CorsLayer::new()
            .allow_origin("*".parse::<HeaderValue>().unwrap())
            .allow_methods([Method::GET, Method::POST])
            .allow_headers(tower_http::cors::Any);

        Router::new()
            .route("/healthz", get(observability::healthz))
            .route("/readyz", get(observability::readyz))
            .route("/cache", get(observability::cache_status))
            .route("/model_name", get(observability::model_name))
            .route("/lang_pairs", get(language::lang_pairs))
            .route("/get_languages", get(language::get_languages))
            .route("/language_detection", get(language::language_detection_get))
            .route("/language_detection", post(language::language_detection_post))
            .route("/translate", get(translation::translate_get))
            .route("/translate", post(translation::translate_post))
            .route("/discover/opus-mt", get(discovery::discover_opus_mt))
            .route("/discover/mbart50", get(discovery::discover_mbart50))
            .route("/discover/m2m100", get(discovery::discover_m2m100))
            .route("/discover/all", get(discovery::discover_all))
            .route("/discover/clear-cache", post(discovery::clear_discovery_cache))
            .layer(cors)
            .with_state(Arc::clone(&self.state))
    }

    /// Start the server and block until it is shut down. Spawns the
    /// maintenance loop (idle eviction, scratch-cache clearing) alongside
    /// the HTTP listener.
    pub async fn start(self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let addr = self.addr();
        let router = self.router();

        let preload_spec = self.state.config.preload_models.clone();
        if !preload_spec.is_empty() {
            self.state.manager.preload_models(&preload_spec).await;
        }

        let maintenance_handle = tokio::spawn(maintenance::run(Arc::clone(&self.state)));

        tracing::info!(addr = %addr, "starting web server");

        let listener = tokio::net::TcpListener::bind(&addr).await?;
        axum::serve(listener, router).await?;

        maintenance_handle.abort();
        Ok(())
    }
}
