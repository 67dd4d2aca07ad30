//! Core error types.
//!
//! All core subsystems surface errors through [`NmtError`], which is the
//! single error type returned by every public API in this crate. Each variant
//! carries enough context for callers to decide how to handle the failure,
//! and for [`nmt-web`](../nmt_web) to map it to an HTTP status without
//! inspecting opaque strings.

/// Unified error type for the translation core.
#[derive(Debug, thiserror::Error)]
pub enum NmtError {
    // -- Validation -----------------------------------------------------
    /// The requested `(src, tgt)` pair is not supported by any configured
    /// model family.
    #[error("unsupported language pair: {src} -> {tgt}")]
    UnsupportedLanguagePair { src: String, tgt: String },

    // -- Concurrency / backpressure ---------------------------------------
    /// The bounded waiting queue is saturated.
    #[error("queue overflow with {waiters} waiters")]
    QueueOverflow { waiters: u64 },

    /// Queueing is disabled and no permit was immediately available.
    #[error("service busy, no permit available")]
    ServiceBusy,

    /// The request exceeded its configured translation timeout.
    #[error("translation timed out")]
    TranslationTimeout,

    // -- Model loading ----------------------------------------------------
    /// All families failed to produce a translator for the pair.
    #[error("failed to load model for {pair}: {cause}")]
    ModelLoadError { pair: String, cause: String },

    /// RAM or VRAM usage is at emergency levels; the cache has been
    /// cleared and new loads are refused until pressure subsides.
    #[error("out of memory: ram {ram_pct:.1}%, vram {vram_pct:.1}%")]
    OutOfMemory { ram_pct: f64, vram_pct: f64 },

    /// A per-item translator invocation failed. Caught inside
    /// [`crate::engine::TranslationEngine`]; never escapes the engine.
    #[error("transient translator error: {0}")]
    TransientTranslator(String),

    // -- Generic ------------------------------------------------------------
    /// Catch-all for unexpected internal errors that don't fit a specific
    /// variant. Prefer a typed variant whenever possible.
    #[error("internal error: {0}")]
    Internal(String),
}

impl NmtError {
    /// True for [`NmtError::OutOfMemory`], which the request plane treats
    /// identically to [`NmtError::ServiceBusy`] (see spec §7).
    pub fn is_out_of_memory(&self) -> bool {
        matches!(self, NmtError::OutOfMemory { .. })
    }
}

/// Convenience alias used throughout the core crate.
pub type Result<T> = std::result::Result<T, NmtError>;
