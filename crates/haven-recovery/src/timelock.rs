//! Cancellable one-shot timers for time-lock warnings.
//!
//! One deferred task per request id: arming twice replaces the prior timer,
//! disarming is idempotent, and a fire instant already in the past is a
//! no-op. The callback itself decides whether firing is still meaningful —
//! the scheduler knows nothing about request state.
//!
//! Timers are in-memory and do not survive a process restart; hosts that
//! need durable warnings must re-arm on startup.

use futures::future::BoxFuture;
use haven_core::{Clock, RequestId, DAY_MS};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::task::JoinHandle;

/// How long before `executes_at` the warning fires.
pub const WARNING_LEAD_MS: u64 = DAY_MS;

/// Schedules and cancels one deferred warning per recovery request.
#[derive(Clone)]
pub struct TimeLockScheduler {
    clock: Arc<dyn Clock>,
    tasks: Arc<Mutex<HashMap<RequestId, JoinHandle<()>>>>,
}

impl TimeLockScheduler {
    /// Create a scheduler driven by `clock`.
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            tasks: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Schedule `callback` to run at `fire_at_ms`.
    ///
    /// No-op when the instant is already past. Re-arming the same request
    /// replaces (never stacks) the previous timer.
    pub async fn arm(&self, request_id: RequestId, fire_at_ms: u64, callback: BoxFuture<'static, ()>) {
        let now = self.clock.physical_time().await.ts_ms;
        if fire_at_ms <= now {
            tracing::debug!(
                request = %request_id,
                fire_at_ms,
                now,
                "warning instant already past, not arming"
            );
            return;
        }
        let delay_ms = fire_at_ms - now;

        let clock = Arc::clone(&self.clock);
        let tasks = Arc::clone(&self.tasks);
        let handle = tokio::spawn(async move {
            clock.sleep_ms(delay_ms).await;
            callback.await;
            tasks
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .remove(&request_id);
        });

        let mut tasks = self.tasks.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(previous) = tasks.insert(request_id, handle) {
            tracing::debug!(request = %request_id, "replacing armed warning timer");
            previous.abort();
        }
    }

    /// Cancel a pending timer. Idempotent when none exists.
    pub fn disarm(&self, request_id: RequestId) {
        let handle = self
            .tasks
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(&request_id);
        if let Some(handle) = handle {
            handle.abort();
            tracing::debug!(request = %request_id, "disarmed warning timer");
        }
    }

    /// Number of currently armed timers.
    pub fn armed_count(&self) -> usize {
        self.tasks.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// Whether a timer is armed for `request_id`.
    pub fn is_armed(&self, request_id: RequestId) -> bool {
        self.tasks
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .contains_key(&request_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use haven_effects::{ManualClock, SystemClock};
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn armed_timer_fires_callback() {
        let clock = Arc::new(ManualClock::new(0));
        let scheduler = TimeLockScheduler::new(clock);
        let fired = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&fired);

        let request_id = RequestId::new();
        scheduler
            .arm(
                request_id,
                1_000,
                Box::pin(async move {
                    flag.store(true, Ordering::SeqCst);
                }),
            )
            .await;
        assert!(scheduler.is_armed(request_id));

        // The manual clock satisfies the sleep on first poll.
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(fired.load(Ordering::SeqCst));
        assert!(!scheduler.is_armed(request_id));
    }

    #[tokio::test]
    async fn past_instant_is_a_no_op() {
        let clock = Arc::new(ManualClock::new(5_000));
        let scheduler = TimeLockScheduler::new(clock);

        scheduler
            .arm(RequestId::new(), 1_000, Box::pin(async {}))
            .await;
        assert_eq!(scheduler.armed_count(), 0);
    }

    #[tokio::test]
    async fn disarm_cancels_pending_timer() {
        let clock = Arc::new(SystemClock::new());
        let now = clock.physical_time().await.ts_ms;
        let scheduler = TimeLockScheduler::new(clock);
        let fired = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&fired);

        let request_id = RequestId::new();
        scheduler
            .arm(
                request_id,
                now + 60_000,
                Box::pin(async move {
                    flag.store(true, Ordering::SeqCst);
                }),
            )
            .await;

        scheduler.disarm(request_id);
        assert!(!scheduler.is_armed(request_id));

        tokio::time::sleep(Duration::from_millis(30)).await;
        assert!(!fired.load(Ordering::SeqCst));

        // Idempotent on a request with no timer.
        scheduler.disarm(request_id);
    }

    #[tokio::test]
    async fn rearming_replaces_instead_of_stacking() {
        let clock = Arc::new(SystemClock::new());
        let now = clock.physical_time().await.ts_ms;
        let scheduler = TimeLockScheduler::new(clock);

        let request_id = RequestId::new();
        scheduler
            .arm(request_id, now + 60_000, Box::pin(async {}))
            .await;
        scheduler
            .arm(request_id, now + 120_000, Box::pin(async {}))
            .await;

        assert_eq!(scheduler.armed_count(), 1);
    }
}
