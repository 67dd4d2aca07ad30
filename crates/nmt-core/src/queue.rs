//! Bounded backpressure over inflight translation work, plus an EMA-based
//! retry-after estimator. See spec §4.8.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::{Mutex, OwnedSemaphorePermit, Semaphore};

use crate::error::{NmtError, Result};

pub struct QueueManager {
    max_inflight: usize,
    max_queue_size: u64,
    enable_queue: bool,
    retry_after_min_sec: f64,
    retry_after_max_sec: f64,
    retry_after_alpha: f64,

    semaphore: Arc<Semaphore>,
    waiting_count: AtomicU64,
    inflight_count: AtomicU64,
    avg_duration_sec: Mutex<f64>,
}

/// A held translation slot. Releases its semaphore permit and decrements
/// the manager's inflight counter on drop.
pub struct TranslateSlot {
    _permit: OwnedSemaphorePermit,
    manager: Arc<QueueManager>,
}

impl Drop for TranslateSlot {
    fn drop(&mut self) {
        self.manager
            .inflight_count
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |c| Some(c.saturating_sub(1)))
            .ok();
    }
}

impl QueueManager {
    pub fn new(
        max_inflight: usize,
        max_queue_size: u64,
        enable_queue: bool,
        retry_after_min_sec: f64,
        retry_after_max_sec: f64,
        retry_after_alpha: f64,
    ) -> Self {
        let max_inflight = max_inflight.max(1);
        Self {
            max_inflight,
            max_queue_size,
            enable_queue,
            retry_after_min_sec,
            retry_after_max_sec,
            retry_after_alpha,
            semaphore: Arc::new(Semaphore::new(max_inflight)),
            waiting_count: AtomicU64::new(0),
            inflight_count: AtomicU64::new(0),
        }
    }

    /// Acquire a translation slot. With queueing enabled, waits for a
    /// permit unless the waiting count already exceeds `maxQueueSize` and
    /// no permit is immediately free, in which case it fails fast with
    /// [`NmtError::QueueOverflow`]. With queueing disabled, fails fast
    /// with [`NmtError::ServiceBusy`] whenever no permit is immediately
    /// available.
    pub async fn acquire_slot(self: &Arc<Self>) -> Result<TranslateSlot> {
        if !self.enable_queue {
            let permit = Arc::clone(&self.semaphore)
                .try_acquire_owned()
                .map_err(|_| NmtError::ServiceBusy)?;
            self.inflight_count.fetch_add(1, Ordering::SeqCst);
            return Ok(TranslateSlot {
                _permit: permit,
                manager: Arc::clone(self),
            });
        }

        let waiters = self.waiting_count.fetch_add(1, Ordering::SeqCst) + 1;
        let no_immediate_permit = self.semaphore.available_permits() == 0;

        if no_immediate_permit && waiters > self.max_queue_size {
            self.waiting_count.fetch_sub(1, Ordering::SeqCst);
            return Err(NmtError::QueueOverflow { waiters });
        }

        let permit = match Arc::clone(&self.semaphore).acquire_owned().await {
            Ok(p) => p,
            Err(_) => {
                self.waiting_count.fetch_sub(1, Ordering::SeqCst);
                return Err(NmtError::Internal("queue semaphore closed".to_owned()));
            }
        };

        self.waiting_count.fetch_sub(1, Ordering::SeqCst);
        self.inflight_count.fetch_add(1, Ordering::SeqCst);

        Ok(TranslateSlot {
            _permit: permit,
            manager: Arc::clone(self),
        })
    }

    pub fn waiting_count(&self) -> u64 {
        self.waiting_count.load(Ordering::SeqCst)
    }

    pub fn inflight_count(&self) -> u64 {
        self.inflight_count.load(Ordering::SeqCst)
    }

    pub fn available_permits(&self) -> usize {
        self.semaphore.available_permits()
    }

    /// Fold `duration_sec` into the exponential moving average used by
    /// [`Self::estimate_retry_after`]. Call only after a successful
    /// translation; failed requests don't widen the estimate.
    pub async fn record_duration(&self, duration_sec: f64) {
        let mut avg = self.avg_duration_sec.lock().await;
        if *avg <= 0.0 {
            *avg = duration_sec;
        } else {
            let alpha = self.retry_after_alpha;
            *avg = (1.0 - alpha) * *avg + alpha * duration_sec;
        }
    }

    /// Estimate seconds until a caller should retry, given `waiters`
    /// ahead of them (`None` when only "busy" is known, not queue depth).
    pub async fn estimate_retry_after(&self, waiters: Option<u64>) -> u64 {
        let avg = *self.avg_duration_sec.lock().await;
        let base = if avg > 0.0 { avg } else { self.retry_after_min_sec };
        let base = base.max(self.retry_after_min_sec);

        let cap = self.max_inflight.max(1) as f64;
        let est = match waiters {
            None => base,
            Some(w) => (w as f64 / cap) * base,
        };

        let clamped = est.max(self.retry_after_min_sec).min(self.retry_after_max_sec);
        clamped.ceil().max(1.0) as u64
    }
}
