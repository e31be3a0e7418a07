//! Clock handlers: real wall-clock time and a manually-driven test clock.

use async_trait::async_trait;
use haven_core::{Clock, PhysicalTime};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Production clock backed by the system wall clock and the tokio timer.
#[derive(Debug, Clone, Default)]
pub struct SystemClock;

impl SystemClock {
    /// Create a new system clock.
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Clock for SystemClock {
    async fn physical_time(&self) -> PhysicalTime {
        let ts_ms = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or(Duration::ZERO)
            .as_millis() as u64;
        PhysicalTime { ts_ms }
    }

    async fn sleep_ms(&self, ms: u64) {
        tokio::time::sleep(Duration::from_millis(ms)).await;
    }
}

/// Deterministic clock for tests.
///
/// Time only moves when a test advances it, or when a task under test sleeps:
/// `sleep_ms` advances virtual time by the requested amount and returns
/// immediately, so deferred work scheduled "24 hours out" fires without any
/// real waiting.
#[derive(Debug, Clone)]
pub struct ManualClock {
    now_ms: Arc<AtomicU64>,
}

impl ManualClock {
    /// Create a manual clock starting at `start_ms`.
    pub fn new(start_ms: u64) -> Self {
        Self {
            now_ms: Arc::new(AtomicU64::new(start_ms)),
        }
    }

    /// Jump the clock to an absolute instant.
    pub fn set_ms(&self, ts_ms: u64) {
        self.now_ms.store(ts_ms, Ordering::SeqCst);
    }

    /// Advance the clock by a relative amount.
    pub fn advance_ms(&self, delta_ms: u64) {
        self.now_ms.fetch_add(delta_ms, Ordering::SeqCst);
    }

    /// Current virtual time without going through the trait.
    pub fn now_ms(&self) -> u64 {
        self.now_ms.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Clock for ManualClock {
    async fn physical_time(&self) -> PhysicalTime {
        PhysicalTime {
            ts_ms: self.now_ms.load(Ordering::SeqCst),
        }
    }

    async fn sleep_ms(&self, ms: u64) {
        self.now_ms.fetch_add(ms, Ordering::SeqCst);
        tokio::task::yield_now().await;
    }
}
