//! Resolves `(src, tgt, preferredFamily?)` to a cached or newly loaded
//! translator, applying family-fallback order. See spec §4.5.

use std::sync::Arc;

use tracing::warn;

use crate::cache::{cache_key, ModelCache};
use crate::config::{ConfigSnapshot, ModelFamilyKind};
use crate::error::{NmtError, Result};
use crate::translator::{ModelSource, Translator};

pub struct ModelManager {
    config: Arc<ConfigSnapshot>,
    cache: Arc<ModelCache>,
    source: Arc<dyn ModelSource>,
}

impl ModelManager {
    pub fn new(config: Arc<ConfigSnapshot>, cache: Arc<ModelCache>, source: Arc<dyn ModelSource>) -> Self {
        Self {
            config,
            cache,
            source,
        }
    }

    fn candidate_families(&self, preferred: Option<ModelFamilyKind>, src: &str, tgt: &str) -> Vec<ModelFamilyKind> {
        let mut candidates = Vec::new();
        if let Some(p) = preferred {
            candidates.push(p);
        }

        if self.config.auto_family_fallback {
            for family in &self.config.family_fallback_order {
                if !candidates.contains(family) && family.supports(src, tgt) {
                    candidates.push(*family);
                }
            }
        } else if candidates.is_empty() {
            candidates.push(self.config.model_family);
        }

        candidates
    }

    /// Resolve `(src, tgt)` to a translator, trying `preferred_family`
    /// first (if set), then the configured fallback order.
    pub async fn get(
        &self,
        src: &str,
        tgt: &str,
        preferred_family: Option<ModelFamilyKind>,
    ) -> Result<(Arc<dyn Translator>, ModelFamilyKind)> {
        let candidates = self.candidate_families(preferred_family, src, tgt);
        if candidates.is_empty() {
            return Err(NmtError::UnsupportedLanguagePair {
                src: src.to_owned(),
                tgt: tgt.to_owned(),
            });
        }

        let mut last_error: Option<String> = None;

        for family in candidates {
            let requested_key = cache_key(src, tgt, family.as_str());

            if let Some(translator) = self.cache.get(&requested_key).await {
                return Ok((translator, family));
            }

            let (repo_name, src_tag, tgt_tag) = family.model_id(src, tgt);
            let (src_tag, tgt_tag) = match family {
                ModelFamilyKind::OpusMt => (None, None),
                _ => (Some(src_tag.as_str()), Some(tgt_tag.as_str())),
            };

            match self
                .source
                .load(&repo_name, self.config.device, src_tag, tgt_tag, &[])
                .await
            {
                Ok(translator) => {
                    let translator: Arc<dyn Translator> = Arc::from(translator);
                    self.cache.put(&requested_key, translator.clone(), None).await;
                    return Ok((translator, family));
                }
                Err(e) => {
                    warn!(family = family.as_str(), src, tgt, error = %e, "model family failed to load");
                    last_error = Some(e.to_string());
                }
            }
        }

        Err(NmtError::ModelLoadError {
            pair: format!("{src}->{tgt}"),
            cause: last_error.unwrap_or_else(|| "no candidate family available".to_owned()),
        })
    }

    /// Parse `"src1->tgt1,src2->tgt2;..."`, validate each pair against the
    /// configured family's support, and call [`Self::get`] on each. Logs
    /// but does not abort on a per-pair failure.
    pub async fn preload_models(&self, spec: &str) {
        for pair in spec.split(['\n', ';', ',']) {
            let pair = pair.trim();
            if pair.is_empty() {
                continue;
            }

            let Some((src, tgt)) = pair.split_once("->") else {
                warn!(pair, "invalid preload pair format");
                continue;
            };
            let (src, tgt) = (src.trim(), tgt.trim());
            if src.is_empty() || tgt.is_empty() {
                warn!(pair, "empty language code in preload pair");
                continue;
            }
            if !self.config.model_family.supports(src, tgt) {
                warn!(
                    family = self.config.model_family.as_str(),
                    src, tgt, "unsupported language pair for configured family"
                );
                continue;
            }

            if let Err(e) = self.get(src, tgt, None).await {
                warn!(src, tgt, error = %e, "failed to preload language pair");
            }
        }
    }
}
