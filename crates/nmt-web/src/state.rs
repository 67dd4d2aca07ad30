//! Shared application state for the web server.
//!
//! [`AppState`] is wrapped in an `Arc` and shared across all request
//! handlers. It holds every process-scoped service a handler needs:
//! configuration, the model cache/manager, the translation engine, the
//! request queue, and the language detector.

use std::sync::Arc;

use nmt_core::{ConfigSnapshot, LanguageDetector, ModelCache, ModelManager, QueueManager, TranslationEngine};

/// Shared state accessible from every Axum handler.
pub struct AppState {
    pub config: Arc<ConfigSnapshot>,
    pub cache: Arc<ModelCache>,
    pub manager: Arc<ModelManager>,
    pub engine: Arc<TranslationEngine>,
    pub queue: Arc<QueueManager>,
    pub detector: Arc<dyn LanguageDetector>,
}

impl AppState {
    pub fn new(
        config: Arc<ConfigSnapshot>,
        cache: Arc<ModelCache>,
        manager: Arc<ModelManager>,
        engine: Arc<TranslationEngine>,
        queue: Arc<QueueManager>,
        detector: Arc<dyn LanguageDetector>,
    ) -> Self {
        Self {
            config,
            cache,
            manager,
            engine,
            queue,
            detector,
        }
    }
}

/// Shared fixtures for route handler tests across this crate.
#[cfg(test)]
pub(crate) mod test_support {
    use std::time::Duration;

    use nmt_core::config::{ConfigSnapshot, DeviceKind, ModelFamilyKind};
    use nmt_core::translator::fake::FakeModelSource;
    use nmt_core::ScriptHeuristicDetector;

    use super::*;

    pub(crate) fn test_config() -> Arc<ConfigSnapshot> {
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
            translate_timeout: Some(Duration::from_secs(5)),
            max_inflight: 1,
            retry_after_min_sec: 1.0,
            retry_after_max_sec: 120.0,
            retry_after_alpha: 0.2,
            sanitize_placeholder: String::new(),
            align_responses: true,
            enable_metadata: false,
            metadata_via_headers: false,
            cuda_cache_clear_interval: None,
            idle_eviction_timeout: Duration::from_secs(1800),
            request_log: true,
            log_include_text: false,
            device: DeviceKind::Cpu,
            preload_models: String::new(),
        })
    }

    pub(crate) fn test_state() -> Arc<AppState> {
        let config = test_config();
        let cache = Arc::new(ModelCache::new(
            config.max_cached_models,
            config.memory_check_interval,
            config.ram_warning_pct,
            config.ram_critical_pct,
            config.vram_warning_pct,
            config.vram_critical_pct,
        ));
        let source = Arc::new(FakeModelSource { fail_repos: vec![] });
        let manager = Arc::new(ModelManager::new(config.clone(), cache.clone(), source));
        let engine = Arc::new(TranslationEngine::new(config.clone(), manager.clone()));
        let queue = Arc::new(QueueManager::new(
            config.max_inflight,
            config.max_queue_size,
            config.enable_queue,
            config.retry_after_min_sec,
            config.retry_after_max_sec,
            config.retry_after_alpha,
        ));
        let detector = Arc::new(ScriptHeuristicDetector::new());
        Arc::new(AppState::new(config, cache, manager, engine, queue, detector))
    }
}
