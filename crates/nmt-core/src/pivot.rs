//! Selects an intermediary language when no direct model loads. See spec
//! §4.6.

use std::collections::HashSet;

use crate::config::{ConfigSnapshot, ModelFamilyKind, PIVOT_PREFERENCE};

pub struct PivotRouter<'a> {
    config: &'a ConfigSnapshot,
    families: &'a [ModelFamilyKind],
}

impl<'a> PivotRouter<'a> {
    pub fn new(config: &'a ConfigSnapshot, families: &'a [ModelFamilyKind]) -> Self {
        Self { config, families }
    }

    fn reachable_from(&self, src: &str) -> HashSet<&'static str> {
        self.families
            .iter()
            .flat_map(|f| f.lang_set().iter().copied())
            .filter(|&tgt| tgt != src && self.families.iter().any(|f| f.supports(src, tgt)))
            .collect()
    }

    fn reachable_to(&self, tgt: &str) -> HashSet<&'static str> {
        self.families
            .iter()
            .flat_map(|f| f.lang_set().iter().copied())
            .filter(|&src| src != tgt && self.families.iter().any(|f| f.supports(src, tgt)))
            .collect()
    }

    /// Find a language reachable from `src` and able to reach `tgt` through
    /// some configured family. Prefers the configured default, then the
    /// fixed language preference list, then the alphabetically first
    /// remaining candidate.
    pub fn select_pivot(&self, src: &str, tgt: &str) -> Option<&'static str> {
        let from = self.reachable_from(src);
        let to = self.reachable_to(tgt);

        let mut candidates: Vec<&'static str> = from
            .intersection(&to)
            .copied()
            .filter(|&c| c != src && c != tgt)
            .collect();

        if candidates.is_empty() {
            return None;
        }

        let default_pivot: &str = &self.config.default_pivot_lang;
        if let Some(pos) = candidates.iter().position(|&c| c == default_pivot) {
            return Some(candidates.remove(pos));
        }

        for &preferred in PIVOT_PREFERENCE {
            if let Some(pos) = candidates.iter().position(|&c| c == preferred) {
                return Some(candidates.remove(pos));
            }
        }

        candidates.sort_unstable();
        candidates.into_iter().next()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn test_config(default_pivot: &str) -> ConfigSnapshot {
        ConfigSnapshot {
            max_cached_models: 10,
            memory_check_interval: 1000,
            ram_warning_pct: 85.0,
            ram_critical_pct: 92.0,
            vram_warning_pct: 85.0,
            vram_critical_pct: 92.0,
            enable_memory_monitor: true,
            model_family: ModelFamilyKind::OpusMt,
            auto_family_fallback: true,
            family_fallback_order: vec![ModelFamilyKind::OpusMt],
            pivot_fallback: true,
            default_pivot_lang: default_pivot.to_owned(),
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
            max_beam: None,
            batch_size: 16,
            max_gen_tokens: 512,
            enable_queue: true,
            max_queue_size: 1000,
            translate_timeout: Some(Duration::from_secs(30)),
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
            device: crate::config::DeviceKind::Cpu,
            preload_models: String::new(),
        }
    }

    #[test]
    fn prefers_configured_default_pivot() {
        let config = test_config("en");
        let families = [ModelFamilyKind::OpusMt];
        let router = PivotRouter::new(&config, &families);
        // opus-mt has no ar<->zh pair but both reach "en".
        assert_eq!(router.select_pivot("ar", "zh"), Some("en"));
    }

    #[test]
    fn falls_back_to_preference_list_when_default_unreachable() {
        let config = test_config("ja");
        let families = [ModelFamilyKind::OpusMt];
        let router = PivotRouter::new(&config, &families);
        // "ja" isn't reachable between ar and zh via opus-mt; "en" (first
        // in PIVOT_PREFERENCE) should win instead.
        assert_eq!(router.select_pivot("ar", "zh"), Some("en"));
    }

    #[test]
    fn returns_none_when_no_intermediary_exists() {
        let config = test_config("en");
        let families = [ModelFamilyKind::OpusMt];
        let router = PivotRouter::new(&config, &families);
        assert_eq!(router.select_pivot("en", "en"), None);
    }
}
