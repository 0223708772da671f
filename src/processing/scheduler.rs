//! # Debounce Scheduler
//!
//! Collapses bursts of "parameters changed" signals into one delayed trigger.
//!
//! Each [`signal`](DebounceScheduler::signal) bumps a generation counter,
//! aborts the pending timer task and arms a new one. When a timer wakes it
//! compares the generation it captured at arm time with the current one and
//! only fires when nothing newer arrived and the scheduler has not been
//! cancelled.
//!
//! ```text
//! signal ─┐  signal ─┐  signal ─┐
//!         ▼          ▼          ▼
//!   gen 1 ✗    gen 2 ✗    gen 3 ──── quiet for D ────▶ fire()
//! ```

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::trace;

/// Default quiet interval, about one display refresh.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(16);

type FireFn = dyn Fn() + Send + Sync;

struct Shared {
    generation: AtomicU64,
    cancelled: AtomicBool,
    fired: AtomicU64,
    /// True from `signal` until the newest trigger fires or is cancelled.
    armed: watch::Sender<bool>,
    on_fire: Box<FireFn>,
}

/// Generation-token debounce on tokio timers.
pub struct DebounceScheduler {
    shared: Arc<Shared>,
    pending: Mutex<Option<JoinHandle<()>>>,
    delay: Duration,
    runtime: Handle,
}

impl DebounceScheduler {
    /// `on_fire` runs on the runtime once per settled burst.
    pub fn new(
        delay: Duration,
        runtime: Handle,
        on_fire: impl Fn() + Send + Sync + 'static,
    ) -> Self {
        Self {
            shared: Arc::new(Shared {
                generation: AtomicU64::new(0),
                cancelled: AtomicBool::new(false),
                fired: AtomicU64::new(0),
                armed: watch::channel(false).0,
                on_fire: Box::new(on_fire),
            }),
            pending: Mutex::new(None),
            delay,
            runtime,
        }
    }

    /// Re-arm the trigger. Never blocks; safe to call from any thread.
    pub fn signal(&self) {
        let mut pending = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
        if self.shared.cancelled.load(Ordering::Acquire) {
            return;
        }
        let generation = self.shared.generation.fetch_add(1, Ordering::AcqRel) + 1;
        self.shared.armed.send_replace(true);
        if let Some(previous) = pending.take() {
            previous.abort();
        }

        let shared = Arc::clone(&self.shared);
        let delay = self.delay;
        *pending = Some(self.runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            if shared.cancelled.load(Ordering::Acquire)
                || shared.generation.load(Ordering::Acquire) != generation
            {
                trace!(generation, "stale debounce trigger dropped");
                return;
            }
            shared.fired.fetch_add(1, Ordering::Relaxed);
            trace!(generation, "debounce trigger fired");
            (shared.on_fire)();
            // A signal that raced the fire keeps the trigger armed.
            shared.armed.send_if_modified(|armed| {
                let clear = *armed && shared.generation.load(Ordering::Acquire) == generation;
                if clear {
                    *armed = false;
                }
                clear
            });
        }));
    }

    /// Permanently disarm. Triggers armed before this call never fire after it.
    pub fn cancel(&self) {
        let mut pending = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
        self.shared.cancelled.store(true, Ordering::Release);
        self.shared.generation.fetch_add(1, Ordering::AcqRel);
        if let Some(task) = pending.take() {
            task.abort();
        }
        self.shared.armed.send_replace(false);
    }

    pub fn is_armed(&self) -> bool {
        *self.shared.armed.borrow()
    }

    /// Resolves once no trigger is armed: the newest one has fired (its
    /// callback has returned) or the scheduler was cancelled.
    pub async fn wait_quiet(&self) {
        let mut rx = self.shared.armed.subscribe();
        let _ = rx.wait_for(|armed| !*armed).await;
    }

    pub fn is_cancelled(&self) -> bool {
        self.shared.cancelled.load(Ordering::Acquire)
    }

    /// Number of triggers that have fired so far.
    pub fn fired(&self) -> u64 {
        self.shared.fired.load(Ordering::Relaxed)
    }
}

impl Drop for DebounceScheduler {
    fn drop(&mut self) {
        self.cancel();
    }
}

impl std::fmt::Debug for DebounceScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DebounceScheduler")
            .field("delay", &self.delay)
            .field("generation", &self.shared.generation.load(Ordering::Relaxed))
            .field("armed", &self.is_armed())
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    fn counting(delay_ms: u64) -> (DebounceScheduler, Arc<AtomicUsize>) {
        let count = Arc::new(AtomicUsize::new(0));
        let hits = Arc::clone(&count);
        let scheduler = DebounceScheduler::new(
            Duration::from_millis(delay_ms),
            Handle::current(),
            move || {
                hits.fetch_add(1, Ordering::SeqCst);
            },
        );
        (scheduler, count)
    }

    #[tokio::test(start_paused = true)]
    async fn burst_fires_once() {
        let (scheduler, count) = counting(16);
        for _ in 0..10 {
            scheduler.signal();
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert_eq!(count.load(Ordering::SeqCst), 0);

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert_eq!(scheduler.fired(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn separated_signals_fire_separately() {
        let (scheduler, count) = counting(16);
        scheduler.signal();
        tokio::time::sleep(Duration::from_millis(40)).await;
        scheduler.signal();
        tokio::time::sleep(Duration::from_millis(40)).await;
        assert_eq!(count.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn wait_quiet_resolves_after_fire() {
        let (scheduler, count) = counting(16);
        assert!(!scheduler.is_armed());
        for _ in 0..3 {
            scheduler.signal();
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert!(scheduler.is_armed());

        scheduler.wait_quiet().await;
        assert!(!scheduler.is_armed());
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_disarms() {
        let (scheduler, count) = counting(16);
        scheduler.signal();
        scheduler.cancel();
        scheduler.wait_quiet().await;
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_suppresses_armed_trigger() {
        let (scheduler, count) = counting(16);
        scheduler.signal();
        scheduler.cancel();
        scheduler.signal();
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(count.load(Ordering::SeqCst), 0);
        assert!(scheduler.is_cancelled());
    }
}
