//! Default, no-inference [`ModelSource`] wired by `nmt serve` when no real
//! backend is configured.
//!
//! Loading and running an actual Opus-MT/mBART50/M2M100 checkpoint is an
//! external collaborator this crate doesn't bundle (see
//! `nmt_core::translator`'s doc comment). [`PassthroughModelSource`] lets
//! the HTTP surface, queueing, caching, and pipeline logic run end to end
//! for smoke-testing a deployment before a real inference backend is
//! wired in behind the same trait.

use async_trait::async_trait;
use nmt_core::config::DeviceKind;
use nmt_core::error::Result;
use nmt_core::translator::{ModelSource, Translator};

#[derive(Debug)]
struct PassthroughTranslator {
    repo_name: String,
}

#[async_trait]
impl Translator for PassthroughTranslator {
    async fn run(&self, batch: &[String], _max_tokens: usize, _beam: usize) -> Result<Vec<String>> {
        Ok(batch.to_vec())
    }

    async fn move_to_cpu(&self) {}

    async fn release(&self) {
        tracing::debug!(repo = %self.repo_name, "releasing passthrough translator");
    }

    fn approx_size_mb(&self) -> u64 {
        1
    }
}

/// Returns input text unchanged instead of translating it. Replace with a
/// real backend (an ONNX Runtime session, a candle model, or an RPC call
/// to an external inference server) before serving real traffic.
pub struct PassthroughModelSource;

#[async_trait]
impl ModelSource for PassthroughModelSource {
    async fn load(
        &self,
        repo_name: &str,
        device: DeviceKind,
        _src_tag: Option<&str>,
        _tgt_tag: Option<&str>,
        _extra_kwargs: &[(&str, &str)],
    ) -> Result<Box<dyn Translator>> {
        tracing::warn!(
            repo = %repo_name,
            device = %device.as_label(),
            "loading passthrough translator; no real inference backend is configured"
        );
        Ok(Box::new(PassthroughTranslator {
            repo_name: repo_name.to_owned(),
        }))
    }
}
