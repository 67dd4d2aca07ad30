//! Translation request pipeline and resource manager for the NMT service.
//!
//! - **[`config`]** -- immutable [`ConfigSnapshot`] resolved once from the
//!   environment at startup.
//! - **[`text`]** -- noise detection, sentence splitting, and chunk packing.
//! - **[`masking`]** -- hides punctuation/digit/emoji runs from the
//!   translator and restores them with tiered fuzzy matching.
//! - **[`markdown`]** -- Markdown detection and post-translation
//!   sanitization against parser depth errors.
//! - **[`translator`]** -- the opaque `Translator`/`ModelSource` seam to
//!   the inference runtime and model hub.
//! - **[`cache`]** -- capacity-bounded LRU of loaded translators with
//!   memory-aware and idle eviction.
//! - **[`device`]** -- RAM/VRAM pressure sampling.
//! - **[`language`]** -- best-effort source-language auto-detection.
//! - **[`model_manager`]** -- family-fallback resolution of `(src,tgt)`
//!   pairs to a cached or freshly loaded translator.
//! - **[`pivot`]** -- intermediary-language selection when no direct
//!   model loads.
//! - **[`queue`]** -- bounded concurrency and retry-after estimation.
//! - **[`engine`]** -- end-to-end orchestration tying all of the above
//!   together.
//! - **[`error`]** -- unified error type via [`thiserror`].
//!
//! All public types are `Send + Sync` and designed for use within a
//! multi-threaded tokio runtime.

pub mod cache;
pub mod config;
pub mod device;
pub mod engine;
pub mod error;
pub mod language;
pub mod markdown;
pub mod masking;
pub mod model_manager;
pub mod pivot;
pub mod queue;
pub mod text;
pub mod translator;

// Re-export the most commonly used types at the crate root for convenience.
pub use cache::{CacheStatus, ModelCache};
pub use config::{ConfigSnapshot, DeviceKind, ModelFamilyKind};
pub use engine::{ResultMetadata, TranslationEngine, TranslationResult};
pub use error::{NmtError, Result};
pub use language::{LanguageDetector, ScriptHeuristicDetector};
pub use model_manager::ModelManager;
pub use pivot::PivotRouter;
pub use queue::{QueueManager, TranslateSlot};
pub use translator::{ModelSource, Translator};
