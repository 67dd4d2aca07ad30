//! End-to-end translation orchestration: alignment, batching, masking,
//! pivoting, fallback, and sanitization. See spec §4.7.

use std::sync::Arc;

use tracing::warn;

use crate::config::{ConfigSnapshot, ModelFamilyKind};
use crate::error::Result;
use crate::markdown;
use crate::masking::{self, MaskOptions};
use crate::model_manager::ModelManager;
use crate::pivot::PivotRouter;
use crate::text;
use crate::translator::Translator;

/// Per-call result. `translations.len() == texts.len()` always holds.
#[derive(Debug, Clone)]
pub struct TranslationResult {
    pub translations: Vec<String>,
    pub pivot_used: bool,
    pub first_error: Option<String>,
    pub metadata: Option<ResultMetadata>,
}

#[derive(Debug, Clone)]
pub struct ResultMetadata {
    pub model_name: String,
    pub family: String,
    pub languages_used: Vec<String>,
    pub chunks_processed: usize,
    pub chunk_size: usize,
    pub auto_chunked: bool,
}

struct ChunkMapping {
    num_chunks: usize,
}

pub struct TranslationEngine {
    config: Arc<ConfigSnapshot>,
    manager: Arc<ModelManager>,
}

impl TranslationEngine {
    pub fn new(config: Arc<ConfigSnapshot>, manager: Arc<ModelManager>) -> Self {
        Self { config, manager }
    }

    fn mask_options(&self) -> MaskOptions {
        MaskOptions {
            enabled: self.config.symbol_masking,
            mask_digits: self.config.mask_digits,
            mask_punct: self.config.mask_punct,
            mask_emoji: self.config.mask_emoji,
        }
    }

    /// Split `text` into chunks ready for translation, honoring
    /// `split_sentences` and the configured chunk/sentence size bounds.
    fn build_chunks(&self, text_in: &str, split_sentences: bool) -> Vec<String> {
        if !split_sentences {
            return vec![text_in.to_owned()];
        }
        let sentences = text::split_sentences(text_in, self.config.max_sentence_chars);
        text::chunk_sentences(&sentences, self.config.max_chunk_chars, &self.config.join_with)
    }

    /// Translate a batch of masked chunks through `translator`, honoring
    /// `batchSize` grouping, then unmask each output in place.
    async fn run_chunks(
        &self,
        translator: &dyn Translator,
        chunks: &[String],
        beam: usize,
    ) -> Result<Vec<String>> {
        let opts = self.mask_options();
        let mut masked_chunks = Vec::with_capacity(chunks.len());
        let mut logs = Vec::with_capacity(chunks.len());
        for chunk in chunks {
            let (masked, log) = masking::mask(chunk, opts);
            masked_chunks.push(masked);
            logs.push(log);
        }

        let mut outputs = Vec::with_capacity(masked_chunks.len());
        for batch in masked_chunks.chunks(self.config.batch_size.max(1)) {
            let translated = translator
                .run(batch, self.config.max_gen_tokens as usize, beam)
                .await?;
            outputs.extend(translated);
        }

        let unmasked: Vec<String> = outputs
            .iter()
            .zip(logs.iter())
            .map(|(out, log)| masking::unmask(out, log, opts))
            .collect();

        Ok(unmasked)
    }

    async fn translate_one(
        &self,
        text_in: &str,
        src: &str,
        tgt: &str,
        beam: usize,
        split_sentences: bool,
        preferred: Option<ModelFamilyKind>,
        direct: Option<(&Arc<dyn Translator>, ModelFamilyKind)>,
    ) -> (String, bool, Option<String>, ModelFamilyKind) {
        let chunks = self.build_chunks(text_in, split_sentences);

        if let Some((translator, family)) = direct {
            if let Ok(outputs) = self.run_chunks(translator.as_ref(), &chunks, beam).await {
                let joined = outputs.join(&self.config.join_with);
                let cleaned = text::remove_new_repeats(text_in, &joined);
                return (cleaned, false, None, family);
            }
        }

        // Direct translator unset or failed this item: load on demand.
        let mut first_error = None;
        match self.manager.get(src, tgt, preferred).await {
            Ok((translator, family)) => match self.run_chunks(translator.as_ref(), &chunks, beam).await {
                Ok(outputs) => {
                    let joined = outputs.join(&self.config.join_with);
                    let cleaned = text::remove_new_repeats(text_in, &joined);
                    return (cleaned, false, None, family);
                }
                Err(e) => first_error = Some(e.to_string()),
            },
            Err(e) => first_error = Some(e.to_string()),
        }

        // Pivot fallback.
        if self.config.pivot_fallback {
            let families = &self.config.family_fallback_order;
            let router = PivotRouter::new(&self.config, families);
            if let Some(pivot) = router.select_pivot(src, tgt) {
                if let Ok(result) = self.translate_via_pivot(text_in, src, tgt, pivot, beam, &chunks).await {
                    return (result, true, None, self.config.model_family);
                }
            }
        }

        // Last-resort unitary fallback: try each multilingual family
        // directly for (src,tgt), ignoring family-fallback ordering.
        for family in [ModelFamilyKind::MBart50, ModelFamilyKind::M2M100] {
            if !family.supports(src, tgt) {
                continue;
            }
            if let Ok((translator, _)) = self.manager.get(src, tgt, Some(family)).await {
                if let Ok(outputs) = self.run_chunks(translator.as_ref(), &chunks, beam).await {
                    let joined = outputs.join(&self.config.join_with);
                    let cleaned = text::remove_new_repeats(text_in, &joined);
                    return (cleaned, false, None, family);
                }
            }
        }

        (
            self.config.sanitize_placeholder.clone(),
            false,
            first_error,
            self.config.model_family,
        )
    }

    async fn translate_via_pivot(
        &self,
        text_in: &str,
        src: &str,
        tgt: &str,
        pivot: &str,
        beam: usize,
        chunks: &[String],
    ) -> Result<String> {
        let (hop1, _) = self.manager.get(src, pivot, None).await?;
        let intermediate = self.run_chunks(hop1.as_ref(), chunks, beam).await?;
        let joined_intermediate = intermediate.join(&self.config.join_with);

        let hop2_chunks = self.build_chunks(&joined_intermediate, false);
        let (hop2, _) = self.manager.get(pivot, tgt, None).await?;
        let outputs = self.run_chunks(hop2.as_ref(), &hop2_chunks, beam).await?;

        let joined = outputs.join(&self.config.join_with);
        Ok(text::remove_new_repeats(text_in, &joined))
    }

    /// Execute a translation request end-to-end. See spec §4.7 for the
    /// numbered algorithm this mirrors step for step.
    pub async fn translate(
        &self,
        texts: &[String],
        src: &str,
        tgt: &str,
        beam: u32,
        split_sentences: bool,
        preferred_family: Option<ModelFamilyKind>,
        include_metadata: bool,
    ) -> TranslationResult {
        let mut beam = beam.max(1);
        if let Some(max_beam) = self.config.max_beam {
            beam = beam.min(max_beam);
        }
        let beam = beam as usize;

        let (flat_texts, mappings) = self.auto_chunk(texts);
        let auto_chunked = mappings.iter().any(|m| m.num_chunks > 1);

        // Pre-load a single direct translator reused across all items;
        // per-item fallback kicks in only when this is absent or fails.
        let direct = self.manager.get(src, tgt, preferred_family).await.ok();

        let mut per_text = Vec::with_capacity(flat_texts.len());
        let mut any_pivot_used = false;
        let mut first_error = None;
        let mut last_family = self.config.model_family;

        for t in &flat_texts {
            if self.config.input_sanitize
                && text::is_noise(t, self.config.min_chars, self.config.min_alnum_ratio)
            {
                per_text.push(self.config.sanitize_placeholder.clone());
                continue;
            }

            let (out, pivot_used, err, family) = self
                .translate_one(
                    t,
                    src,
                    tgt,
                    beam,
                    split_sentences,
                    preferred_family,
                    direct.as_ref().map(|(t, f)| (t, *f)),
                )
                .await;

            if pivot_used {
                any_pivot_used = true;
            }
            if err.is_some() && first_error.is_none() {
                first_error = err;
            }
            last_family = family;
            per_text.push(out);
        }

        let reassembled = self.reassemble(&per_text, &mappings);

        let safe_mode = self.config.markdown_safe_mode
            || (self.config.markdown_safe_mode_auto
                && (markdown::RTL_LANGS.contains(&tgt)
                    || self
                        .config
                        .markdown_problematic_pairs
                        .iter()
                        .any(|(s, t)| s == src && t == tgt)));
        if safe_mode {
            warn!(src, tgt, "markdown safe mode active for this pair");
        }

        let sanitized: Vec<String> = reassembled
            .into_iter()
            .map(|t| {
                if self.config.markdown_sanitize && markdown::detect_markdown(&t).is_markdown {
                    markdown::sanitize(&t, Some(tgt), self.config.markdown_max_depth, safe_mode)
                        .text
                } else {
                    t
                }
            })
            .collect();

        let metadata = if include_metadata || first_error.is_some() {
            Some(ResultMetadata {
                model_name: last_family.model_id(src, tgt).0,
                family: last_family.as_str().to_owned(),
                languages_used: vec![src.to_owned(), tgt.to_owned()],
                chunks_processed: flat_texts.len(),
                chunk_size: self.config.max_chunk_chars,
                auto_chunked,
            })
        } else {
            None
        };

        TranslationResult {
            translations: sanitized,
            pivot_used: any_pivot_used,
            first_error,
            metadata,
        }
    }

    fn auto_chunk(&self, texts: &[String]) -> (Vec<String>, Vec<ChunkMapping>) {
        if !self.config.auto_chunk_enabled {
            return (
                texts.to_vec(),
                texts.iter().map(|_| ChunkMapping { num_chunks: 1 }).collect(),
            );
        }

        let mut flat = Vec::new();
        let mut mappings = Vec::new();

        for t in texts {
            let max_chars = self.config.auto_chunk_max_chars;
            if t.chars().count() <= max_chars {
                flat.push(t.clone());
                mappings.push(ChunkMapping { num_chunks: 1 });
                continue;
            }

            let chars: Vec<char> = t.chars().collect();
            let mut slices = Vec::new();
            let mut start = 0;
            while start < chars.len() {
                let end = (start + max_chars).min(chars.len());
                slices.push(chars[start..end].iter().collect::<String>());
                start = end;
            }
            let n = slices.len();
            flat.extend(slices);
            mappings.push(ChunkMapping { num_chunks: n });
        }

        (flat, mappings)
    }

    fn reassemble(&self, flat_outputs: &[String], mappings: &[ChunkMapping]) -> Vec<String> {
        let mut result = Vec::with_capacity(mappings.len());
        let mut cursor = 0;
        for m in mappings {
            let slice = &flat_outputs[cursor..cursor + m.num_chunks];
            result.push(slice.join(&self.config.join_with));
            cursor += m.num_chunks;
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::ModelCache;
    use crate::translator::fake::FakeModelSource;
    use std::time::Duration;

    fn test_config() -> Arc<ConfigSnapshot> {
        Arc::new(ConfigSnapshot {
            max_cached_models: 10,
            memory_check_interval: 1000,
            ram_warning_pct: 85.0,
            ram_critical_pct: 92.0,
            vram_warning_pct: 85.0,
            vram_critical_pct: 92.0,
            enable_memory_monitor: true,
            model_family: ModelFamilyKind::OpusMt,
            auto_family_fallback: true,
            family_fallback_order: vec![
                ModelFamilyKind::OpusMt,
                ModelFamilyKind::MBart50,
                ModelFamilyKind::M2M100,
            ],
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
        })
    }

    fn test_engine() -> TranslationEngine {
        let config = test_config();
        let cache = Arc::new(ModelCache::new(10, 1000, 85.0, 92.0, 85.0, 92.0));
        let source = Arc::new(FakeModelSource { fail_repos: vec![] });
        let manager = Arc::new(ModelManager::new(config.clone(), cache, source));
        TranslationEngine::new(config, manager)
    }

    #[tokio::test]
    async fn translate_preserves_alignment_length() {
        let engine = test_engine();
        let texts = vec!["Hello there.".to_owned(), "!!!".to_owned(), "Goodbye.".to_owned()];
        let result = engine
            .translate(&texts, "en", "de", 4, true, None, false)
            .await;
        assert_eq!(result.translations.len(), texts.len());
    }

    #[tokio::test]
    async fn translate_replaces_noise_with_placeholder() {
        let engine = test_engine();
        let texts = vec!["!!!".to_owned()];
        let result = engine
            .translate(&texts, "en", "de", 4, true, None, false)
            .await;
        assert_eq!(result.translations[0], "");
    }

    #[tokio::test]
    async fn translate_includes_metadata_when_requested() {
        let engine = test_engine();
        let texts = vec!["Hello world, this is a test sentence.".to_owned()];
        let result = engine
            .translate(&texts, "en", "de", 4, true, None, true)
            .await;
        assert!(result.metadata.is_some());
        assert_eq!(result.metadata.unwrap().family, "opus-mt");
    }

    #[tokio::test]
    async fn translate_strips_markdown_in_safe_mode_for_problematic_pair() {
        let mut config = (*test_config()).clone();
        config.markdown_problematic_pairs = vec![("en".to_owned(), "fr".to_owned())];
        let config = Arc::new(config);
        let cache = Arc::new(ModelCache::new(10, 1000, 85.0, 92.0, 85.0, 92.0));
        let source = Arc::new(FakeModelSource { fail_repos: vec![] });
        let manager = Arc::new(ModelManager::new(config.clone(), cache, source));
        let engine = TranslationEngine::new(config, manager);

        let texts = vec!["see [here](https://example.com) for details".to_owned()];
        let result = engine
            .translate(&texts, "en", "fr", 4, true, None, false)
            .await;
        assert!(!result.translations[0].contains("]("), "link should be stripped: {}", result.translations[0]);
    }

    #[tokio::test]
    async fn translate_falls_back_via_pivot_when_direct_pair_unsupported() {
        let config = test_config();
        let cache = Arc::new(ModelCache::new(10, 1000, 85.0, 92.0, 85.0, 92.0));
        // opus-mt has no direct ja<->ko-style pairing in this toy case;
        // force it to fail so pivot/fallback logic actually exercises.
        let source = Arc::new(FakeModelSource {
            fail_repos: vec!["Helsinki-NLP/opus-mt-ko-ja".to_owned()],
        });
        let manager = Arc::new(ModelManager::new(config.clone(), cache, source));
        let engine = TranslationEngine::new(config, manager);

        let texts = vec!["Hello there, friend.".to_owned()];
        let result = engine
            .translate(&texts, "ko", "ja", 4, true, None, false)
            .await;
        assert_eq!(result.translations.len(), 1);
    }
}
