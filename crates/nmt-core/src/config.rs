//! Runtime configuration, resolved once at startup into an immutable
//! [`ConfigSnapshot`].
//!
//! Every field is read from the environment a single time; nothing here is
//! mutated afterwards (see Design Notes: "Class-based configuration with
//! mutable class attributes").

use std::time::Duration;

/// Fixed Opus-MT language set. The authoritative source is the live
/// `/discover/opus-mt` endpoint; this list is the offline fallback and the
/// default support predicate.
pub const OPUS_MT_LANGS: &[&str] = &[
    "en", "de", "nl", "sv", "da", "no", "is", "af", "es", "fr", "it", "pt", "ro", "ca", "gl",
    "ru", "pl", "uk", "cs", "sk", "bg", "hr", "sr", "sl", "mk", "be", "el", "fi", "hu", "et",
    "lv", "lt", "ga", "cy", "eu", "sq", "mt", "zh", "ja", "ko", "ar", "he", "fa", "hi", "ur",
    "bn", "ta", "te", "th", "vi", "id", "ms", "tr", "az", "ka", "hy", "kk", "uz", "sw", "am",
    "so", "yo", "ha", "ig", "eo", "la",
];

/// Fixed mBART50 language set (50 languages).
pub const MBART50_LANGS: &[&str] = &[
    "ar", "cs", "de", "en", "es", "et", "fi", "fr", "gu", "hi", "it", "ja", "kk", "ko", "lt",
    "lv", "my", "ne", "nl", "ro", "ru", "si", "tr", "vi", "zh", "af", "az", "bn", "fa", "he",
    "hr", "id", "ka", "km", "mk", "ml", "mn", "mr", "pl", "ps", "pt", "sv", "sw", "ta", "te",
    "th", "tl", "uk", "ur", "xh",
];

/// Fixed M2M100 language set (100 languages).
pub const M2M100_LANGS: &[&str] = &[
    "af", "am", "ar", "ast", "az", "ba", "be", "bg", "bn", "br", "bs", "ca", "ceb", "cs", "cy",
    "da", "de", "el", "en", "es", "et", "fa", "ff", "fi", "fr", "fy", "ga", "gd", "gl", "gu",
    "ha", "he", "hi", "hr", "ht", "hu", "hy", "id", "ig", "ilo", "is", "it", "ja", "jv", "ka",
    "kk", "km", "kn", "ko", "lb", "lg", "ln", "lo", "lt", "lv", "mg", "mk", "ml", "mn", "mr",
    "ms", "my", "ne", "nl", "no", "ns", "oc", "or", "pa", "pl", "ps", "pt", "ro", "ru", "sd",
    "si", "sk", "sl", "so", "sq", "sr", "ss", "su", "sv", "sw", "ta", "te", "th", "tl", "tn",
    "tr", "uk", "ur", "uz", "vi", "wo", "xh", "yi", "yo", "zh",
];

/// Languages sanitized in "safe mode" when the target is right-to-left.
pub const RTL_LANGS: &[&str] = &["ar", "he", "fa", "ur", "yi", "ps"];

/// Preference order used by [`crate::pivot::PivotRouter`] when multiple
/// pivot candidates exist and none is the configured default.
pub const PIVOT_PREFERENCE: &[&str] =
    &["en", "es", "fr", "de", "zh", "ru", "it", "pt", "nl", "pl", "ja"];

/// Immutable runtime configuration, built once at process startup.
///
/// Mirrors the recognized options of the data model's `ConfigSnapshot`
/// entity. All fields are read-only after construction; pass by shared
/// reference (`Arc<ConfigSnapshot>`) into every service.
#[derive(Debug, Clone)]
pub struct ConfigSnapshot {
    // -- Model cache --------------------------------------------------------
    pub max_cached_models: usize,
    pub memory_check_interval: u64,
    pub ram_warning_pct: f64,
    pub ram_critical_pct: f64,
    pub vram_warning_pct: f64,
    pub vram_critical_pct: f64,
    pub enable_memory_monitor: bool,

    // -- Model family / fallback ---------------------------------------------
    pub model_family: ModelFamilyKind,
    pub auto_family_fallback: bool,
    pub family_fallback_order: Vec<ModelFamilyKind>,
    pub pivot_fallback: bool,
    pub default_pivot_lang: String,

    // -- Input sanitization ---------------------------------------------------
    pub input_sanitize: bool,
    pub min_alnum_ratio: f64,
    pub min_chars: usize,
    pub undetermined_code: String,

    // -- Sentence splitting / chunking ----------------------------------------
    pub perform_sentence_splitting_default: bool,
    pub max_sentence_chars: usize,
    pub max_chunk_chars: usize,
    pub join_with: String,
    pub auto_chunk_enabled: bool,
    pub auto_chunk_max_chars: usize,

    // -- Symbol masking -------------------------------------------------------
    pub symbol_masking: bool,
    pub mask_digits: bool,
    pub mask_punct: bool,
    pub mask_emoji: bool,

    // -- Markdown sanitization -------------------------------------------------
    pub markdown_sanitize: bool,
    pub markdown_safe_mode: bool,
    pub markdown_safe_mode_auto: bool,
    pub markdown_max_depth: usize,
    pub markdown_problematic_pairs: Vec<(String, String)>,

    // -- Generation -----------------------------------------------------------
    pub max_beam: Option<u32>,
    pub batch_size: usize,
    pub max_gen_tokens: u32,

    // -- Queueing / backpressure ------------------------------------------------
    pub enable_queue: bool,
    pub max_queue_size: u64,
    pub translate_timeout: Option<Duration>,
    pub max_inflight: usize,
    pub retry_after_min_sec: f64,
    pub retry_after_max_sec: f64,
    pub retry_after_alpha: f64,

    // -- Response shaping -------------------------------------------------------
    pub sanitize_placeholder: String,
    pub align_responses: bool,
    pub enable_metadata: bool,
    pub metadata_via_headers: bool,

    // -- Maintenance -----------------------------------------------------------
    pub cuda_cache_clear_interval: Option<Duration>,
    pub idle_eviction_timeout: Duration,

    // -- Request logging --------------------------------------------------------
    pub request_log: bool,
    pub log_include_text: bool,

    // -- Device ------------------------------------------------------------------
    pub device: DeviceKind,

    // -- Preload -------------------------------------------------------------
    pub preload_models: String,
}

/// The three model families recognized by the core. See spec §3.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ModelFamilyKind {
    OpusMt,
    MBart50,
    M2M100,
}

impl ModelFamilyKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ModelFamilyKind::OpusMt => "opus-mt",
            ModelFamilyKind::MBart50 => "mbart50",
            ModelFamilyKind::M2M100 => "m2m100",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "opus-mt" => Some(ModelFamilyKind::OpusMt),
            "mbart50" => Some(ModelFamilyKind::MBart50),
            "m2m100" => Some(ModelFamilyKind::M2M100),
            _ => None,
        }
    }

    /// The language set this family draws support from.
    pub fn lang_set(self) -> &'static [&'static str] {
        match self {
            ModelFamilyKind::OpusMt => OPUS_MT_LANGS,
            ModelFamilyKind::MBart50 => MBART50_LANGS,
            ModelFamilyKind::M2M100 => M2M100_LANGS,
        }
    }

    pub fn supports(self, src: &str, tgt: &str) -> bool {
        src != tgt && self.lang_set().contains(&src) && self.lang_set().contains(&tgt)
    }

    /// Compute the Hugging-Face-style repo name and the src/tgt tags this
    /// family expects a [`crate::translator::ModelSource`] to resolve. See
    /// spec §3 `ModelFamily.modelId`.
    pub fn model_id(self, src: &str, tgt: &str) -> (String, String, String) {
        match self {
            ModelFamilyKind::OpusMt => (
                format!("Helsinki-NLP/opus-mt-{src}-{tgt}"),
                src.to_owned(),
                tgt.to_owned(),
            ),
            ModelFamilyKind::MBart50 => (
                "facebook/mbart-large-50-many-to-many-mmt".to_owned(),
                format!("{src}_XX"),
                format!("{tgt}_XX"),
            ),
            ModelFamilyKind::M2M100 => (
                "facebook/m2m100_418M".to_owned(),
                src.to_owned(),
                tgt.to_owned(),
            ),
        }
    }
}

/// Resolved compute device. Device acquisition itself (CUDA init, etc.) is
/// an external collaborator; the core only needs to know the shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceKind {
    Cpu,
    Cuda(u32),
}

impl DeviceKind {
    pub fn as_label(self) -> String {
        match self {
            DeviceKind::Cpu => "cpu".to_owned(),
            DeviceKind::Cuda(idx) => format!("cuda:{idx}"),
        }
    }

    pub fn is_gpu(self) -> bool {
        matches!(self, DeviceKind::Cuda(_))
    }
}

impl ConfigSnapshot {
    /// Resolve the full snapshot from process environment variables,
    /// applying the same defaults as the original service.
    pub fn from_env() -> Self {
        let model_family = env_var("MODEL_FAMILY")
            .and_then(|v| ModelFamilyKind::parse(&v))
            .unwrap_or(ModelFamilyKind::OpusMt);

        let device = resolve_device();

        let max_inflight = env_usize("MAX_INFLIGHT_TRANSLATIONS").unwrap_or_else(|| {
            if device.is_gpu() {
                1
            } else {
                env_usize("MAX_WORKERS_BACKEND").unwrap_or(1).max(1)
            }
        });

        let family_fallback_order = env_var("MODEL_FALLBACK_ORDER")
            .unwrap_or_else(|| "opus-mt,mbart50,m2m100".to_owned())
            .split(',')
            .filter_map(|s| ModelFamilyKind::parse(s.trim()))
            .collect();

        Self {
            max_cached_models: env_usize("MAX_CACHED_MODELS").unwrap_or(10).max(1),
            memory_check_interval: env_var("MEMORY_CHECK_INTERVAL")
                .and_then(|v| v.parse().ok())
                .unwrap_or(32),
            ram_warning_pct: env_f64("RAM_WARNING_PCT").unwrap_or(85.0),
            ram_critical_pct: env_f64("RAM_CRITICAL_PCT").unwrap_or(92.0),
            vram_warning_pct: env_f64("VRAM_WARNING_PCT").unwrap_or(85.0),
            vram_critical_pct: env_f64("VRAM_CRITICAL_PCT").unwrap_or(92.0),
            enable_memory_monitor: env_bool("ENABLE_MEMORY_MONITOR").unwrap_or(true),

            model_family,
            auto_family_fallback: env_bool("AUTO_MODEL_FALLBACK").unwrap_or(true),
            family_fallback_order,
            pivot_fallback: env_bool("PIVOT_FALLBACK").unwrap_or(true),
            default_pivot_lang: env_var("PIVOT_LANG").unwrap_or_else(|| "en".to_owned()),

            input_sanitize: env_bool("INPUT_SANITIZE").unwrap_or(true),
            min_alnum_ratio: env_f64("INPUT_MIN_ALNUM_RATIO").unwrap_or(0.2),
            min_chars: env_usize("INPUT_MIN_CHARS").unwrap_or(1),
            undetermined_code: env_var("UNDETERMINED_LANG_CODE").unwrap_or_else(|| "und".to_owned()),

            perform_sentence_splitting_default: env_bool("PERFORM_SENTENCE_SPLITTING_DEFAULT")
                .unwrap_or(true),
            max_sentence_chars: env_usize("MAX_SENTENCE_CHARS").unwrap_or(500),
            max_chunk_chars: env_usize("MAX_CHUNK_CHARS").unwrap_or(900),
            join_with: env_var("JOIN_SENTENCES_WITH").unwrap_or_else(|| " ".to_owned()),
            auto_chunk_enabled: env_bool("AUTO_CHUNK_ENABLED").unwrap_or(true),
            auto_chunk_max_chars: env_usize("AUTO_CHUNK_MAX_CHARS").unwrap_or(5000),

            symbol_masking: env_bool("SYMBOL_MASKING").unwrap_or(true),
            mask_digits: env_bool("MASK_DIGITS").unwrap_or(true),
            mask_punct: env_bool("MASK_PUNCT").unwrap_or(true),
            mask_emoji: env_bool("MASK_EMOJI").unwrap_or(true),

            markdown_sanitize: env_bool("MARKDOWN_SANITIZE").unwrap_or(true),
            markdown_safe_mode: env_bool("MARKDOWN_SAFE_MODE").unwrap_or(false),
            markdown_safe_mode_auto: env_bool("MARKDOWN_SAFE_MODE_AUTO").unwrap_or(true),
            markdown_max_depth: env_usize("MARKDOWN_MAX_DEPTH").unwrap_or(6),
            markdown_problematic_pairs: env_var("MARKDOWN_PROBLEMATIC_PAIRS")
                .map(|v| parse_problematic_pairs(&v))
                .unwrap_or_default(),

            max_beam: env_var("EASYNMT_MAX_BEAM_SIZE").and_then(|v| v.parse().ok()),
            batch_size: env_usize("EASYNMT_BATCH_SIZE").unwrap_or(16).max(1),
            max_gen_tokens: env_var("EASYNMT_MAX_TEXT_LEN")
                .and_then(|v| v.parse::<u32>().ok())
                .map(|v| v.min(512).max(1))
                .unwrap_or(512),

            enable_queue: env_bool("ENABLE_QUEUE").unwrap_or(true),
            max_queue_size: env_var("MAX_QUEUE_SIZE")
                .and_then(|v| v.parse().ok())
                .unwrap_or(1000),
            translate_timeout: env_usize("TRANSLATE_TIMEOUT_SEC")
                .filter(|&v| v > 0)
                .map(|v| Duration::from_secs(v as u64)),
            max_inflight: max_inflight.max(1),
            retry_after_min_sec: env_f64("RETRY_AFTER_MIN_SEC").unwrap_or(1.0),
            retry_after_max_sec: env_f64("RETRY_AFTER_MAX_SEC").unwrap_or(120.0),
            retry_after_alpha: env_f64("RETRY_AFTER_ALPHA").unwrap_or(0.2),

            sanitize_placeholder: env_var("SANITIZE_PLACEHOLDER").unwrap_or_default(),
            align_responses: env_bool("ALIGN_RESPONSES").unwrap_or(true),
            enable_metadata: env_bool("ENABLE_METADATA").unwrap_or(false),
            metadata_via_headers: env_bool("METADATA_VIA_HEADERS").unwrap_or(false),

            cuda_cache_clear_interval: env_usize("CUDA_CACHE_CLEAR_INTERVAL_SEC")
                .filter(|&v| v > 0)
                .map(|v| Duration::from_secs(v as u64)),
            idle_eviction_timeout: Duration::from_secs(
                env_usize("IDLE_MODEL_TIMEOUT_SEC").unwrap_or(1800) as u64,
            ),

            request_log: env_bool("REQUEST_LOG").unwrap_or(true),
            log_include_text: env_bool("LOG_INCLUDE_TEXT").unwrap_or(false),

            device,
            preload_models: env_var("PRELOAD_MODELS").unwrap_or_default(),
        }
    }

    /// The language set recognized for the configured default family.
    pub fn supported_langs(&self) -> &'static [&'static str] {
        self.model_family.lang_set()
    }
}

fn resolve_device() -> DeviceKind {
    match env_var("DEVICE").as_deref() {
        Some(d) if d != "auto" => {
            if let Some(rest) = d.strip_prefix("cuda") {
                let idx = rest.trim_start_matches(':').parse().unwrap_or(0);
                DeviceKind::Cuda(idx)
            } else {
                DeviceKind::Cpu
            }
        }
        _ => DeviceKind::Cpu,
    }
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

fn env_bool(name: &str) -> Option<bool> {
    env_var(name).map(|v| matches!(v.to_lowercase().as_str(), "1" | "true" | "yes"))
}

fn env_usize(name: &str) -> Option<usize> {
    env_var(name).and_then(|v| v.parse().ok())
}

fn env_f64(name: &str) -> Option<f64> {
    env_var(name).and_then(|v| v.parse().ok())
}

/// Parse `MARKDOWN_PROBLEMATIC_PAIRS`, a comma-separated list of
/// `src-tgt` language pairs (e.g. `ar-en,he-de`) known to produce
/// problematic markdown output for this deployment.
fn parse_problematic_pairs(raw: &str) -> Vec<(String, String)> {
    raw.split(',')
        .filter_map(|pair| {
            let pair = pair.trim();
            let (src, tgt) = pair.split_once('-')?;
            let (src, tgt) = (src.trim(), tgt.trim());
            if src.is_empty() || tgt.is_empty() {
                return None;
            }
            Some((src.to_owned(), tgt.to_owned()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn family_support_sets_are_disjoint_from_self_pair() {
        assert!(!ModelFamilyKind::OpusMt.supports("en", "en"));
        assert!(ModelFamilyKind::OpusMt.supports("en", "de"));
    }

    #[test]
    fn mbart50_and_m2m100_are_all_to_all() {
        assert!(ModelFamilyKind::MBart50.supports("ar", "zh"));
        assert!(ModelFamilyKind::M2M100.supports("ha", "yi"));
    }

    #[test]
    fn family_parse_round_trips() {
        for f in [
            ModelFamilyKind::OpusMt,
            ModelFamilyKind::MBart50,
            ModelFamilyKind::M2M100,
        ] {
            assert_eq!(ModelFamilyKind::parse(f.as_str()), Some(f));
        }
    }

    #[test]
    fn device_label_formats_gpu_with_index() {
        assert_eq!(DeviceKind::Cuda(2).as_label(), "cuda:2");
        assert_eq!(DeviceKind::Cpu.as_label(), "cpu");
    }

    #[test]
    fn model_id_tags_mbart50_with_xx_suffix() {
        let (repo, src_tag, tgt_tag) = ModelFamilyKind::MBart50.model_id("en", "de");
        assert_eq!(repo, "facebook/mbart-large-50-many-to-many-mmt");
        assert_eq!(src_tag, "en_XX");
        assert_eq!(tgt_tag, "de_XX");
    }

    #[test]
    fn model_id_opus_mt_names_pair_specific_repo() {
        let (repo, ..) = ModelFamilyKind::OpusMt.model_id("en", "fr");
        assert_eq!(repo, "Helsinki-NLP/opus-mt-en-fr");
    }

    #[test]
    fn parses_problematic_pairs_list() {
        let pairs = parse_problematic_pairs("ar-en, he-de ,,bad");
        assert_eq!(
            pairs,
            vec![
                ("ar".to_owned(), "en".to_owned()),
                ("he".to_owned(), "de".to_owned()),
            ]
        );
    }
}
