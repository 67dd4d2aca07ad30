//! Opaque translation-runtime and model-acquisition contracts.
//!
//! The transformer inference runtime and the Hugging Face model hub are
//! external collaborators, not something this crate implements. These
//! traits are the seam: [`ModelSource`] acquires a repo onto a device,
//! [`Translator`] runs batches through whatever it loaded. Production
//! wires a real backend behind both; tests wire a fake.

use async_trait::async_trait;

use crate::config::DeviceKind;
use crate::error::Result;

/// A loaded inference pipeline bound to either a fixed pair (Opus-MT) or a
/// pair of language tags inside a shared multilingual model (MBart50,
/// M2M100). Cheaply cloneable: implementations wrap their state in an
/// `Arc` so [`crate::cache::ModelCache`] can hand out shared handles.
#[async_trait]
pub trait Translator: Send + Sync + std::fmt::Debug {
    /// Translate `batch`, returning one output string per input, in order.
    async fn run(&self, batch: &[String], max_tokens: usize, beam: usize) -> Result<Vec<String>>;

    /// Move underlying tensors to CPU ahead of release. No-op for
    /// CPU-resident translators.
    async fn move_to_cpu(&self);

    /// Release device resources. Called once, immediately before the
    /// handle is dropped by the cache.
    async fn release(&self);

    /// Approximate resident size in megabytes, used for capacity/memory
    /// accounting. Best-effort; implementations may return a fixed estimate.
    fn approx_size_mb(&self) -> u64;
}

/// Acquires a model repository onto a device and returns a translator
/// bound to it. Stands in for Hugging Face Hub downloads plus whatever
/// on-disk preload snapshot mechanism a deployment configures.
#[async_trait]
pub trait ModelSource: Send + Sync {
    /// Load `repo_name` onto `device`. `src_tag`/`tgt_tag` are set for
    /// multilingual families (MBart50, M2M100) and `None` for Opus-MT's
    /// fixed-pair repos. `extra_kwargs` carries family-specific generation
    /// defaults (e.g. `num_beams`) a concrete backend may consult.
    async fn load(
        &self,
        repo_name: &str,
        device: DeviceKind,
        src_tag: Option<&str>,
        tgt_tag: Option<&str>,
        extra_kwargs: &[(&str, &str)],
    ) -> Result<Box<dyn Translator>>;
}

/// Fakes used by this crate's own unit tests and, via the `test-util`
/// feature, by other crates' integration tests.
#[cfg(any(test, feature = "test-util"))]
pub mod fake {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    /// Deterministic uppercasing translator used by unit and integration
    /// tests in this crate; never shipped behind a real endpoint.
    #[derive(Debug)]
    pub struct FakeTranslator {
        pub released: Arc<AtomicBool>,
        pub fail: bool,
    }

    #[async_trait]
    impl Translator for FakeTranslator {
        async fn run(&self, batch: &[String], _max_tokens: usize, _beam: usize) -> Result<Vec<String>> {
            if self.fail {
                return Err(crate::error::NmtError::TransientTranslator(
                    "fake translator configured to fail".to_owned(),
                ));
            }
            Ok(batch.iter().map(|s| s.to_uppercase()).collect())
        }

        async fn move_to_cpu(&self) {}

        async fn release(&self) {
            self.released.store(true, Ordering::SeqCst);
        }

        fn approx_size_mb(&self) -> u64 {
            64
        }
    }

    pub struct FakeModelSource {
        pub fail_repos: Vec<String>,
    }

    #[async_trait]
    impl ModelSource for FakeModelSource {
        async fn load(
            &self,
            repo_name: &str,
            _device: DeviceKind,
            _src_tag: Option<&str>,
            _tgt_tag: Option<&str>,
            _extra_kwargs: &[(&str, &str)],
        ) -> Result<Box<dyn Translator>> {
            if self.fail_repos.iter().any(|r| r == repo_name) {
                return Err(crate::error::NmtError::ModelLoadError {
                    pair: repo_name.to_owned(),
                    cause: "fake source configured to fail this repo".to_owned(),
                });
            }
            Ok(Box::new(FakeTranslator {
                released: Arc::new(AtomicBool::new(false)),
                fail: false,
            }))
        }
    }
}
