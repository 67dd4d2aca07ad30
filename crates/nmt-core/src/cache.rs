//! Capacity-bounded LRU cache of loaded [`Translator`]s with memory-aware
//! and idle eviction, and alias-key ownership. See spec §4.4.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::device::MemorySampler;
use crate::translator::Translator;

/// `"{src}->{tgt}:{family}"`, the cache key shape from spec §3.
pub fn cache_key(src: &str, tgt: &str, family: &str) -> String {
    format!("{src}->{tgt}:{family}")
}

struct Entry {
    translator: Arc<dyn Translator>,
    last_access: Instant,
    /// Primary key owns the lifecycle; alias keys are dropped silently
    /// when the primary entry is evicted.
    is_primary: bool,
    primary_key: String,
}

/// Snapshot returned by [`ModelCache::status`].
#[derive(Debug, Clone)]
pub struct CacheStatus {
    pub capacity: usize,
    pub size: usize,
    pub keys: Vec<String>,
    pub ram_pct: f64,
    pub vram_pct: Option<f64>,
}

pub struct ModelCache {
    capacity: usize,
    ram_warning_pct: f64,
    ram_critical_pct: f64,
    vram_warning_pct: f64,
    vram_critical_pct: f64,
    memory_check_interval: u64,
    sampler: MemorySampler,
    inner: Mutex<Inner>,
}

struct Inner {
    entries: HashMap<String, Entry>,
    /// MRU order, most-recently-used at the back. Alias keys never
    /// appear here directly; eviction order is tracked per primary key.
    order: Vec<String>,
    op_count: u64,
}

impl ModelCache {
    pub fn new(
        capacity: usize,
        memory_check_interval: u64,
        ram_warning_pct: f64,
        ram_critical_pct: f64,
        vram_warning_pct: f64,
        vram_critical_pct: f64,
    ) -> Self {
        Self {
            capacity: capacity.max(1),
            ram_warning_pct,
            ram_critical_pct,
            vram_warning_pct,
            vram_critical_pct,
            memory_check_interval: memory_check_interval.max(1),
            sampler: MemorySampler::new(),
            inner: Mutex::new(Inner {
                entries: HashMap::new(),
                order: Vec::new(),
                op_count: 0,
            }),
        }
    }

    /// On hit, moves the entry to MRU and updates `lastAccess`. Every call
    /// increments the operation counter and, every `memoryCheckInterval`
    /// operations, triggers a memory-pressure check.
    pub async fn get(&self, key: &str) -> Option<Arc<dyn Translator>> {
        let mut inner = self.inner.lock().await;
        inner.op_count += 1;
        let check_due = inner.op_count % self.memory_check_interval == 0;

        let found = if let Some(entry) = inner.entries.get_mut(key) {
            entry.last_access = Instant::now();
            let primary_key = entry.primary_key.clone();
            Some((entry.translator.clone(), primary_key))
        } else {
            None
        };

        if let Some((translator, primary_key)) = &found {
            touch_mru(&mut inner.order, primary_key);
            let _ = translator;
        }

        if check_due {
            self.check_memory_pressure(&mut inner).await;
        }

        found.map(|(t, _)| t)
    }

    /// Insert `translator` under `key`. If this is the first key for a
    /// newly loaded model, `alias_of` is `None` and this key becomes
    /// primary; pass `alias_of = Some(primary_key)` to register a
    /// secondary key for an already-cached translator (spec §4.5 step 2d).
    pub async fn put(&self, key: &str, translator: Arc<dyn Translator>, alias_of: Option<&str>) {
        let mut inner = self.inner.lock().await;
        let replaced_existing = inner.entries.contains_key(key);

        let primary_key = alias_of.unwrap_or(key).to_owned();
        inner.entries.insert(
            key.to_owned(),
            Entry {
                translator,
                last_access: Instant::now(),
                is_primary: alias_of.is_none(),
                primary_key: primary_key.clone(),
            },
        );

        if alias_of.is_none() {
            touch_mru(&mut inner.order, key);
        }

        if !replaced_existing {
            self.evict_if_over_capacity(&mut inner).await;
        }
    }

    async fn evict_if_over_capacity(&self, inner: &mut Inner) {
        let primaries = inner
            .entries
            .values()
            .filter(|e| e.is_primary)
            .count();
        if primaries <= self.capacity {
            return;
        }
        if let Some(lru_key) = inner.order.first().cloned() {
            self.evict_primary(inner, &lru_key).await;
        }
    }

    async fn evict_primary(&self, inner: &mut Inner, primary_key: &str) {
        let aliases: Vec<String> = inner
            .entries
            .iter()
            .filter(|(k, e)| e.primary_key == primary_key && k.as_str() != primary_key)
            .map(|(k, _)| k.clone())
            .collect();

        if let Some(entry) = inner.entries.remove(primary_key) {
            entry.translator.move_to_cpu().await;
            entry.translator.release().await;
        }
        for alias in aliases {
            inner.entries.remove(&alias);
        }
        inner.order.retain(|k| k != primary_key);
        info!(key = primary_key, "evicted model from cache");
    }

    /// Evict every entry whose `lastAccess` age exceeds `timeout`,
    /// returning the evicted primary keys.
    pub async fn evict_idle(&self, timeout: Duration) -> Vec<String> {
        let mut inner = self.inner.lock().await;
        let now = Instant::now();
        let stale: Vec<String> = inner
            .entries
            .values()
            .filter(|e| e.is_primary && now.duration_since(e.last_access) > timeout)
            .map(|e| e.primary_key.clone())
            .collect();

        for key in &stale {
            self.evict_primary(&mut inner, key).await;
        }
        stale
    }

    /// RAM or VRAM at or above 95%.
    pub fn is_memory_critical(&self) -> bool {
        let sample = self.sampler.sample();
        sample.ram_pct >= 95.0 || sample.vram_pct.is_some_and(|v| v >= 95.0)
    }

    async fn check_memory_pressure(&self, inner: &mut Inner) {
        let sample = self.sampler.sample();
        let vram = sample.vram_pct.unwrap_or(0.0);

        if sample.ram_pct >= 95.0 || vram >= 95.0 {
            warn!(
                ram_pct = sample.ram_pct,
                vram_pct = vram,
                "emergency memory pressure, evicting all cached models"
            );
            let all_primaries: Vec<String> = inner
                .entries
                .values()
                .filter(|e| e.is_primary)
                .map(|e| e.primary_key.clone())
                .collect();
            for key in all_primaries {
                self.evict_primary(inner, &key).await;
            }
            return;
        }

        if sample.ram_pct >= self.ram_critical_pct || vram >= self.vram_critical_pct {
            if let Some(lru_key) = inner.order.first().cloned() {
                self.evict_primary(inner, &lru_key).await;
            }
            return;
        }

        if sample.ram_pct >= self.ram_warning_pct || vram >= self.vram_warning_pct {
            warn!(
                ram_pct = sample.ram_pct,
                vram_pct = vram,
                "memory usage above warning threshold"
            );
        }
    }

    pub async fn status(&self) -> CacheStatus {
        let inner = self.inner.lock().await;
        let sample = self.sampler.sample();
        CacheStatus {
            capacity: self.capacity,
            size: inner.entries.values().filter(|e| e.is_primary).count(),
            keys: inner.entries.keys().cloned().collect(),
            ram_pct: sample.ram_pct,
            vram_pct: sample.vram_pct,
        }
    }
}

fn touch_mru(order: &mut Vec<String>, key: &str) {
    order.retain(|k| k != key);
    order.push(key.to_owned());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::translator::fake::FakeTranslator;
    use std::sync::atomic::AtomicBool;

    fn fake() -> Arc<dyn Translator> {
        Arc::new(FakeTranslator {
            released: Arc::new(AtomicBool::new(false)),
            fail: false,
        })
    }

    #[tokio::test]
    async fn put_then_get_hits_and_updates_mru() {
        let cache = ModelCache::new(2, 1000, 85.0, 92.0, 85.0, 92.0);
        cache.put("en->de:opus-mt", fake(), None).await;
        assert!(cache.get("en->de:opus-mt").await.is_some());
        assert!(cache.get("missing").await.is_none());
    }

    #[tokio::test]
    async fn put_over_capacity_evicts_lru_primary() {
        let cache = ModelCache::new(1, 1000, 85.0, 92.0, 85.0, 92.0);
        cache.put("a->b:opus-mt", fake(), None).await;
        cache.put("c->d:opus-mt", fake(), None).await;
        assert!(cache.get("a->b:opus-mt").await.is_none());
        assert!(cache.get("c->d:opus-mt").await.is_some());
    }

    #[tokio::test]
    async fn alias_key_is_released_when_primary_is_evicted() {
        let cache = ModelCache::new(1, 1000, 85.0, 92.0, 85.0, 92.0);
        let released = Arc::new(AtomicBool::new(false));
        let translator: Arc<dyn Translator> = Arc::new(FakeTranslator {
            released: released.clone(),
            fail: false,
        });
        cache
            .put("en->de:opus-mt", translator.clone(), None)
            .await;
        cache
            .put("en->de:mbart50", translator, Some("en->de:opus-mt"))
            .await;
        cache.put("x->y:opus-mt", fake(), None).await;

        assert!(cache.get("en->de:opus-mt").await.is_none());
        assert!(cache.get("en->de:mbart50").await.is_none());
        assert!(released.load(std::sync::atomic::Ordering::SeqCst));
    }

    #[tokio::test]
    async fn evict_idle_removes_only_stale_entries() {
        let cache = ModelCache::new(5, 1000, 85.0, 92.0, 85.0, 92.0);
        cache.put("a->b:opus-mt", fake(), None).await;
        let evicted = cache.evict_idle(Duration::from_secs(0)).await;
        assert_eq!(evicted, vec!["a->b:opus-mt".to_owned()]);
        assert!(cache.get("a->b:opus-mt").await.is_none());
    }

    #[tokio::test]
    async fn status_reports_capacity_and_size() {
        let cache = ModelCache::new(3, 1000, 85.0, 92.0, 85.0, 92.0);
        cache.put("a->b:opus-mt", fake(), None).await;
        let status = cache.status().await;
        assert_eq!(status.capacity, 3);
        assert_eq!(status.size, 1);
    }
}
