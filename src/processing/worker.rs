//! # Render Worker
//!
//! Serial execution of the pixel kernel for the interactive preview.
//!
//! ## State Machine
//!
//! ```text
//!            request()                      request()
//!   ┌──────┐ ────────▶ ┌───────────┐ ──────────────────▶ ┌──────────────────────┐
//!   │ Idle │           │ Rendering │                     │ RenderingWithRetry   │
//!   └──────┘ ◀──────── └───────────┘ ◀────────────────── └──────────────────────┘
//!            render done             render done, loop      request() is a no-op
//! ```
//!
//! Only the `Idle → Rendering` transition spawns a render loop, so at most one
//! kernel call for the preview is ever in flight. A request that arrives while
//! rendering records a single retry; the retry re-reads the newest parameter
//! snapshot, so deeper queuing would never change the output.
//!
//! ## One Render
//!
//! 1. Take an immutable [`AdjustmentVector`](crate::core::params::AdjustmentVector) snapshot
//! 2. Acquire an idle buffer from the [`BufferPool`] (it becomes `Rendering`)
//! 3. Run the kernel on the blocking pool with `(preview source, target, snapshot)`
//! 4. On success publish the target and hand the frame to the frame sink;
//!    on failure report to the error sink and return the target unpublished

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use tokio::runtime::Handle;
use tokio::sync::watch;
use tracing::{debug, error, trace, warn};

use crate::core::buffer_pool::BufferPool;
use crate::core::frame::PixelBuffer;
use crate::core::params::ParameterStore;
use crate::error::{CraftError, ErrorSeverity, HasSeverity, Recoverable, classify};
use crate::processing::kernel::{KernelError, PixelKernel};

/// Receives every newly published preview buffer, in publication order.
pub type FrameSink = Arc<dyn Fn(Arc<PixelBuffer>) + Send + Sync>;

/// Receives render failures.
pub type ErrorSink = Arc<dyn Fn(&CraftError) + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderState {
    Idle,
    Rendering,
    RenderingWithRetry,
}

/// Everything a preview render reads.
#[derive(Clone)]
pub struct RenderInputs {
    pub kernel: Arc<dyn PixelKernel>,
    pub params: Arc<ParameterStore>,
    pub pool: Arc<BufferPool>,
    pub preview_source: Arc<PixelBuffer>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WorkerStats {
    pub requests: u64,
    pub renders: u64,
    pub published: u64,
    pub failed: u64,
}

#[derive(Default)]
struct Counters {
    requests: AtomicU64,
    renders: AtomicU64,
    published: AtomicU64,
    failed: AtomicU64,
}

struct WorkerInner {
    inputs: RenderInputs,
    state: watch::Sender<RenderState>,
    closed: AtomicBool,
    counters: Counters,
    frame_sink: FrameSink,
    error_sink: Option<ErrorSink>,
    runtime: Handle,
}

/// Handle to the preview render worker. Cloning shares the same worker.
#[derive(Clone)]
pub struct RenderWorker {
    inner: Arc<WorkerInner>,
}

impl RenderWorker {
    pub fn new(
        inputs: RenderInputs,
        frame_sink: FrameSink,
        error_sink: Option<ErrorSink>,
        runtime: Handle,
    ) -> Self {
        let (state, _) = watch::channel(RenderState::Idle);
        Self {
            inner: Arc::new(WorkerInner {
                inputs,
                state,
                closed: AtomicBool::new(false),
                counters: Counters::default(),
                frame_sink,
                error_sink,
                runtime,
            }),
        }
    }

    /// Ask for a render of the latest parameters. Never blocks.
    pub fn request(&self) {
        if self.inner.closed.load(Ordering::Acquire) {
            return;
        }
        self.inner.counters.requests.fetch_add(1, Ordering::Relaxed);

        let mut start = false;
        self.inner.state.send_if_modified(|state| match *state {
            RenderState::Idle => {
                *state = RenderState::Rendering;
                start = true;
                true
            }
            RenderState::Rendering => {
                debug!("render in flight, retry recorded");
                *state = RenderState::RenderingWithRetry;
                true
            }
            RenderState::RenderingWithRetry => {
                trace!("retry already pending");
                false
            }
        });

        if start {
            let inner = Arc::clone(&self.inner);
            self.inner.runtime.spawn(render_loop(inner));
        }
    }

    /// Stop accepting requests. A render in flight finishes but its frame is
    /// discarded.
    pub fn close(&self) {
        self.inner.closed.store(true, Ordering::Release);
    }

    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::Acquire)
    }

    pub fn state(&self) -> RenderState {
        *self.inner.state.borrow()
    }

    /// Resolves once no render is running or pending.
    pub async fn wait_idle(&self) {
        let mut rx = self.inner.state.subscribe();
        // The sender lives in `inner`, which we hold, so this cannot fail.
        let _ = rx.wait_for(|state| *state == RenderState::Idle).await;
    }

    pub fn stats(&self) -> WorkerStats {
        let c = &self.inner.counters;
        WorkerStats {
            requests: c.requests.load(Ordering::Relaxed),
            renders: c.renders.load(Ordering::Relaxed),
            published: c.published.load(Ordering::Relaxed),
            failed: c.failed.load(Ordering::Relaxed),
        }
    }
}

impl std::fmt::Debug for RenderWorker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderWorker")
            .field("state", &self.state())
            .field("closed", &self.is_closed())
            .field("stats", &self.stats())
            .finish()
    }
}

async fn render_loop(inner: Arc<WorkerInner>) {
    loop {
        if !inner.closed.load(Ordering::Acquire) {
            render_once(&inner).await;
        }

        let mut again = false;
        inner.state.send_modify(|state| {
            if *state == RenderState::RenderingWithRetry && !inner.closed.load(Ordering::Acquire) {
                *state = RenderState::Rendering;
                again = true;
            } else {
                *state = RenderState::Idle;
            }
        });
        if !again {
            break;
        }
        trace!("running coalesced retry");
    }
}

async fn render_once(inner: &WorkerInner) {
    let inputs = &inner.inputs;
    let snapshot = inputs.params.snapshot();
    let mut target = match inputs.pool.acquire() {
        Ok(target) => target,
        Err(err) => {
            if !inner.closed.load(Ordering::Acquire) {
                report(inner, &err);
            }
            return;
        }
    };
    inner.counters.renders.fetch_add(1, Ordering::Relaxed);

    let kernel = Arc::clone(&inputs.kernel);
    let source = Arc::clone(&inputs.preview_source);
    let joined = tokio::task::spawn_blocking(move || {
        let outcome = catch_unwind(AssertUnwindSafe(|| {
            kernel.process(&source, target.buffer_mut(), &snapshot)
        }))
        .unwrap_or(Err(KernelError::Panicked));
        (target, outcome)
    })
    .await;

    let (target, outcome) = match joined {
        Ok(done) => done,
        Err(err) => {
            // Only reachable on runtime shutdown; the target went down with the task.
            report(inner, &CraftError::processing("render", err.to_string()));
            return;
        }
    };

    match outcome {
        Ok(()) if inner.closed.load(Ordering::Acquire) => {
            debug!("render finished after close, discarding frame");
            inputs.pool.abandon(target);
        }
        Ok(()) => {
            if let Some(frame) = inputs.pool.publish(target) {
                inner.counters.published.fetch_add(1, Ordering::Relaxed);
                (inner.frame_sink)(frame);
            }
        }
        Err(kernel_err) => {
            inputs.pool.abandon(target);
            let (w, h) = inputs.pool.dimensions();
            let err = CraftError::from(kernel_err)
                .with_operation("preview render")
                .with_metadata("preview", format!("{}x{}", w, h))
                .with_recovery_suggestion("the previously published preview stays visible");
            report(inner, &err);
        }
    }
}

fn report(inner: &WorkerInner, err: &CraftError) {
    inner.counters.failed.fetch_add(1, Ordering::Relaxed);
    if classify::is_transient(err) && err.severity() < ErrorSeverity::Critical {
        warn!(
            error = %err,
            recovery = ?err.recovery_strategies(),
            "preview render failed"
        );
    } else {
        error!(error = %err, severity = ?err.severity(), "preview render failed");
    }
    if let Some(sink) = &inner.error_sink {
        sink(err);
    }
}
