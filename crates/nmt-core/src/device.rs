//! RAM/VRAM pressure sampling used by [`crate::cache::ModelCache`]'s
//! memory-aware eviction. See spec §4.4.

use std::sync::Mutex;

use sysinfo::System;

/// A point-in-time reading of system memory pressure.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MemorySample {
    pub ram_pct: f64,
    /// `None` on CPU-only deployments; no GPU memory API is wired in.
    pub vram_pct: Option<f64>,
}

/// Samples host RAM via `sysinfo`. VRAM sampling is not implemented: none
/// of this project's dependencies provide a vendor-neutral GPU memory
/// query, so `vram_pct` is always `None` and callers treat that as "not
/// under VRAM pressure" (see `ConfigSnapshot::device`).
pub struct MemorySampler {
    sys: Mutex<System>,
}

impl MemorySampler {
    pub fn new() -> Self {
        let mut sys = System::new();
        sys.refresh_memory();
        Self {
            sys: Mutex::new(sys),
        }
    }

    pub fn sample(&self) -> MemorySample {
        let mut sys = self.sys.lock().expect("memory sampler mutex poisoned");
        sys.refresh_memory();
        let total = sys.total_memory().max(1);
        let used = sys.used_memory();
        MemorySample {
            ram_pct: (used as f64 / total as f64) * 100.0,
            vram_pct: None,
        }
    }
}

impl Default for MemorySampler {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sample_ram_pct_is_in_range() {
        let sampler = MemorySampler::new();
        let sample = sampler.sample();
        assert!(sample.ram_pct >= 0.0 && sample.ram_pct <= 100.0);
        assert!(sample.vram_pct.is_none());
    }
}
