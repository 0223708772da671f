//! # Editing Session Engine
//!
//! [`Engine`] is the public face of the crate: one engine per editing session,
//! bound to one source image. It composes the parameter store, the buffer pool,
//! the debounce scheduler and the render worker, and enforces the lifecycle.
//!
//! ## Architecture
//!
//! ```text
//!  set_*/reset ──▶ ParameterStore ──▶ DebounceScheduler ──(quiet D)──▶ RenderWorker
//!                                                                        │
//!      PreviewSink ◀── delivery gate ◀── BufferPool::publish ◀── kernel ◀─┘
//! ```
//!
//! ## Lifecycle
//!
//! ```text
//! Initializing ──decode ok──▶ Ready ──release()──▶ Released
//!      │                                              ▲
//!      └──decode failed──▶ Failed ──release()─────────┘
//! ```
//!
//! | Operation | Initializing | Ready | Failed | Released |
//! |-----------|--------------|-------|--------|----------|
//! | `set_*`, `reset` | stored, rendered once Ready | render scheduled | stored, never rendered | no-op |
//! | `show_before`, `show_after` | `NotReady` | delivered | `InitFailed` | `Ok(None)` |
//! | `render_final`, `export` | `NotReady` | rendered | `InitFailed` | `Ok(None)` |
//! | `release` | terminal | terminal | terminal | no-op |
//!
//! ## Delivery Gate
//!
//! Every frame reaches the [`PreviewSink`] while holding the delivery gate, and
//! `release()` closes the gate before tearing the pipeline down. Once
//! `release()` returns no callback can fire. `show_after` reads the published
//! buffer while holding the gate, so it never hands out a frame older than
//! one the worker has already delivered. The sink runs with the gate held,
//! so it must not call `show_before`, `show_after` or `release` on the same
//! engine synchronously; parameter writes from inside the sink are fine.
//!
//! ## Example
//!
//! ```rust,no_run
//! use imgcraft::session::Engine;
//! use imgcraft::source::FileImageSource;
//!
//! # async fn demo() -> imgcraft::error::CraftResult<()> {
//! let engine = Engine::builder()
//!     .with_source(FileImageSource::new("photo.jpg"))
//!     .with_preview_sink(|frame: imgcraft::session::PreviewFrame| {
//!         println!("frame {} is {}x{}", frame.sequence, frame.buffer.width(), frame.buffer.height());
//!     })
//!     .build()?;
//!
//! engine.ready().await?;
//! engine.set_brightness(0.3);
//! engine.set_vignette(0.5);
//! let full = engine.render_final().await?;
//! engine.release();
//! # let _ = full;
//! # Ok(())
//! # }
//! ```

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, trace};

use crate::config::EngineConfig;
use crate::core::buffer_pool::BufferPool;
use crate::core::frame::PixelBuffer;
use crate::core::params::{Adjustment, AdjustmentVector, ParameterStore};
use crate::error::{CraftError, CraftResult, classify};
use crate::export::PersistenceSink;
use crate::processing::kernel::{CpuKernel, KernelError, PixelKernel};
use crate::processing::scheduler::DebounceScheduler;
use crate::processing::worker::{ErrorSink, FrameSink, RenderInputs, RenderWorker, WorkerStats};
use crate::source::{ImageSource, downscale};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    Initializing,
    Ready,
    /// Initialization failed; terminal until released.
    Failed,
    Released,
}

impl EngineState {
    pub fn as_str(self) -> &'static str {
        match self {
            EngineState::Initializing => "initializing",
            EngineState::Ready => "ready",
            EngineState::Failed => "failed",
            EngineState::Released => "released",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameKind {
    /// The unadjusted preview source.
    Before,
    /// The currently published render.
    After,
}

/// A frame handed to the [`PreviewSink`].
///
/// `buffer` is shared and read-only; clone the pixels if they must outlive
/// the next few renders without pinning pool memory.
#[derive(Debug, Clone)]
pub struct PreviewFrame {
    pub buffer: Arc<PixelBuffer>,
    pub kind: FrameKind,
    /// Delivery order, starting at 0 for the initial preview.
    pub sequence: u64,
}

/// Consumer of preview frames. Implemented for any `Fn(PreviewFrame)`.
pub trait PreviewSink: Send + Sync {
    fn deliver(&self, frame: PreviewFrame);
}

impl<F> PreviewSink for F
where
    F: Fn(PreviewFrame) + Send + Sync,
{
    fn deliver(&self, frame: PreviewFrame) {
        self(frame)
    }
}

struct Gate {
    open: bool,
    next_sequence: u64,
}

impl Gate {
    fn deliver(
        &mut self,
        sink: &dyn PreviewSink,
        buffer: Arc<PixelBuffer>,
        kind: FrameKind,
    ) -> Option<PreviewFrame> {
        if !self.open {
            return None;
        }
        let frame = PreviewFrame {
            buffer,
            kind,
            sequence: self.next_sequence,
        };
        self.next_sequence += 1;
        sink.deliver(frame.clone());
        Some(frame)
    }
}

/// Everything that exists only once the source has been decoded.
struct Pipeline {
    source: Arc<PixelBuffer>,
    preview_source: Arc<PixelBuffer>,
    pool: Arc<BufferPool>,
    worker: RenderWorker,
    scheduler: DebounceScheduler,
}

impl Pipeline {
    fn shutdown(&self) {
        self.scheduler.cancel();
        self.worker.close();
        self.pool.destroy();
        debug!(
            triggers = self.scheduler.fired(),
            renders = ?self.worker.stats(),
            "pipeline shut down"
        );
    }
}

struct EngineInner {
    state: watch::Sender<EngineState>,
    failure: Mutex<Option<Arc<CraftError>>>,
    params: Arc<ParameterStore>,
    pipeline: Mutex<Option<Arc<Pipeline>>>,
    gate: Mutex<Gate>,
    /// Parameter writes arrived before the pipeline existed.
    pending_render: AtomicBool,
    sink: Arc<dyn PreviewSink>,
    error_sink: Option<ErrorSink>,
    kernel: Arc<dyn PixelKernel>,
    config: EngineConfig,
}

fn relock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl EngineInner {
    fn current_state(&self) -> EngineState {
        *self.state.borrow()
    }

    fn deliver(&self, buffer: Arc<PixelBuffer>, kind: FrameKind) -> Option<PreviewFrame> {
        relock(&self.gate).deliver(self.sink.as_ref(), buffer, kind)
    }

    /// Deliver whatever the pool has published right now.
    ///
    /// The pool is read with the gate held. The worker publishes before it
    /// takes the gate, so a frame read here is never older than one the
    /// worker has already delivered.
    fn deliver_published(&self, pool: &BufferPool) -> Option<PreviewFrame> {
        let mut gate = relock(&self.gate);
        let published = pool.published()?;
        gate.deliver(self.sink.as_ref(), published, FrameKind::After)
    }

    fn install(self: &Arc<Self>, source: PixelBuffer, preview: PixelBuffer, runtime: Handle) {
        let source = Arc::new(source);
        let preview_source = Arc::new(preview);
        let pool = Arc::new(BufferPool::new(&preview_source));

        let weak = Arc::downgrade(self);
        let frame_sink: FrameSink = Arc::new(move |frame| {
            if let Some(inner) = weak.upgrade() {
                inner.deliver(frame, FrameKind::After);
            }
        });
        let worker = RenderWorker::new(
            RenderInputs {
                kernel: Arc::clone(&self.kernel),
                params: Arc::clone(&self.params),
                pool: Arc::clone(&pool),
                preview_source: Arc::clone(&preview_source),
            },
            frame_sink,
            self.error_sink.clone(),
            runtime.clone(),
        );
        let trigger = worker.clone();
        let scheduler =
            DebounceScheduler::new(self.config.debounce(), runtime, move || trigger.request());

        let pipeline = Arc::new(Pipeline {
            source,
            preview_source,
            pool,
            worker,
            scheduler,
        });

        let mut gate = relock(&self.gate);
        {
            let mut slot = relock(&self.pipeline);
            let became_ready = self.state.send_if_modified(|state| {
                if *state == EngineState::Initializing {
                    *state = EngineState::Ready;
                    true
                } else {
                    false
                }
            });
            if !became_ready {
                debug!("engine released during initialization, discarding pipeline");
                pipeline.shutdown();
                return;
            }
            *slot = Some(Arc::clone(&pipeline));
            if self.pending_render.swap(false, Ordering::AcqRel) {
                debug!("rendering parameters written during initialization");
                pipeline.scheduler.signal();
            }
        }

        info!(
            source_w = pipeline.source.width(),
            source_h = pipeline.source.height(),
            preview_w = pipeline.preview_source.width(),
            preview_h = pipeline.preview_source.height(),
            "engine ready"
        );
        if let Some(initial) = pipeline.pool.published() {
            gate.deliver(self.sink.as_ref(), initial, FrameKind::After);
        }
        drop(gate);
    }

    fn fail(&self, err: CraftError) {
        error!(error = %err, fatal = classify::is_fatal(&err), "engine initialization failed");
        let err = Arc::new(err);
        *relock(&self.failure) = Some(Arc::clone(&err));
        self.state.send_if_modified(|state| {
            if *state == EngineState::Initializing {
                *state = EngineState::Failed;
                true
            } else {
                false
            }
        });
    }

    fn init_error(&self, operation: &str) -> CraftError {
        match relock(&self.failure).as_ref() {
            Some(cause) => CraftError::init_failed(Arc::clone(cause)).with_operation(operation),
            None => CraftError::state("failed", operation, "initialization failed"),
        }
    }

    /// The ready pipeline, `Ok(None)` after release, or the lifecycle error.
    fn pipeline_for(&self, operation: &str) -> CraftResult<Option<Arc<Pipeline>>> {
        if let Some(pipeline) = relock(&self.pipeline).as_ref() {
            return Ok(Some(Arc::clone(pipeline)));
        }
        match self.current_state() {
            EngineState::Initializing => Err(CraftError::not_ready(operation)),
            EngineState::Failed => Err(self.init_error(operation)),
            EngineState::Ready | EngineState::Released => Ok(None),
        }
    }

    fn schedule_render(&self) {
        let slot = relock(&self.pipeline);
        match slot.as_ref() {
            Some(pipeline) => pipeline.scheduler.signal(),
            None => self.pending_render.store(true, Ordering::Release),
        }
    }
}

/// Interactive adjustment engine for one source image.
pub struct Engine {
    inner: Arc<EngineInner>,
    init_task: Mutex<Option<JoinHandle<()>>>,
}

impl Engine {
    pub fn builder() -> EngineBuilder {
        EngineBuilder::new()
    }

    pub fn state(&self) -> EngineState {
        self.inner.current_state()
    }

    pub fn config(&self) -> &EngineConfig {
        &self.inner.config
    }

    /// Resolves once initialization has finished.
    ///
    /// `Ok(())` when the engine is ready (or was released before it got
    /// there); `Err(InitFailed)` carrying the decode failure otherwise.
    pub async fn ready(&self) -> CraftResult<()> {
        let mut rx = self.inner.state.subscribe();
        let state = rx
            .wait_for(|state| *state != EngineState::Initializing)
            .await
            .map(|state| *state)
            .map_err(|_| CraftError::state("initializing", "ready", "state channel closed"))?;
        match state {
            EngineState::Failed => Err(self.inner.init_error("ready")),
            _ => Ok(()),
        }
    }

    /// Replace one adjustment (clamped to its range) and schedule a render.
    pub fn set(&self, adjustment: Adjustment, value: f32) {
        if self.state() == EngineState::Released {
            return;
        }
        let stored = self.inner.params.set(adjustment, value);
        trace!(%adjustment, requested = value, stored, "adjustment set");
        self.inner.schedule_render();
    }

    pub fn set_brightness(&self, value: f32) {
        self.set(Adjustment::Brightness, value)
    }

    pub fn set_contrast(&self, value: f32) {
        self.set(Adjustment::Contrast, value)
    }

    pub fn set_exposure(&self, value: f32) {
        self.set(Adjustment::Exposure, value)
    }

    pub fn set_hue(&self, value: f32) {
        self.set(Adjustment::Hue, value)
    }

    pub fn set_saturation(&self, value: f32) {
        self.set(Adjustment::Saturation, value)
    }

    pub fn set_highlight(&self, value: f32) {
        self.set(Adjustment::Highlight, value)
    }

    pub fn set_shadows(&self, value: f32) {
        self.set(Adjustment::Shadows, value)
    }

    pub fn set_grain(&self, value: f32) {
        self.set(Adjustment::Grain, value)
    }

    pub fn set_sharpness(&self, value: f32) {
        self.set(Adjustment::Sharpness, value)
    }

    pub fn set_vignette(&self, value: f32) {
        self.set(Adjustment::Vignette, value)
    }

    /// Apply a whole vector in one exchange and schedule one render.
    pub fn apply(&self, vector: AdjustmentVector) {
        if self.state() == EngineState::Released {
            return;
        }
        self.inner.params.replace(vector);
        self.inner.schedule_render();
    }

    /// Restore every adjustment to its default and schedule one render.
    pub fn reset(&self) {
        if self.state() == EngineState::Released {
            return;
        }
        self.inner.params.reset();
        debug!("adjustments reset");
        self.inner.schedule_render();
    }

    /// Snapshot of the current adjustment values.
    pub fn parameters(&self) -> AdjustmentVector {
        *self.inner.params.snapshot()
    }

    /// Deliver the unadjusted preview source to the sink. Never renders.
    pub fn show_before(&self) -> CraftResult<Option<PreviewFrame>> {
        let Some(pipeline) = self.inner.pipeline_for("show_before")? else {
            return Ok(None);
        };
        Ok(self
            .inner
            .deliver(Arc::clone(&pipeline.preview_source), FrameKind::Before))
    }

    /// Deliver the currently published render to the sink. Never renders.
    pub fn show_after(&self) -> CraftResult<Option<PreviewFrame>> {
        let Some(pipeline) = self.inner.pipeline_for("show_after")? else {
            return Ok(None);
        };
        Ok(self.inner.deliver_published(&pipeline.pool))
    }

    /// Render the full-resolution source with the current parameters into a
    /// freshly allocated buffer.
    ///
    /// Bypasses the debounce and the scratch pool, so it may run while a
    /// preview render is in flight.
    pub async fn render_final(&self) -> CraftResult<Option<PixelBuffer>> {
        let Some(pipeline) = self.inner.pipeline_for("render_final")? else {
            return Ok(None);
        };
        let snapshot = self.inner.params.snapshot();
        let kernel = Arc::clone(&self.inner.kernel);
        let source = Arc::clone(&pipeline.source);
        drop(pipeline);

        let output = tokio::task::spawn_blocking(move || {
            let mut output = PixelBuffer::same_size_as(&source);
            kernel.process(&source, &mut output, &snapshot)?;
            Ok::<_, KernelError>(output)
        })
        .await
        .map_err(|e| CraftError::processing("render_final", e.to_string()))?
        .map_err(|e| CraftError::from(e).with_operation("render_final"))?;

        debug!(
            width = output.width(),
            height = output.height(),
            "full resolution render finished"
        );
        Ok(Some(output))
    }

    /// `render_final` followed by handing the result to `sink`.
    pub async fn export<S>(&self, sink: Arc<S>, name: &str) -> CraftResult<Option<PathBuf>>
    where
        S: PersistenceSink + ?Sized + 'static,
    {
        let Some(output) = self.render_final().await? else {
            return Ok(None);
        };
        let name = name.to_string();
        tokio::task::spawn_blocking(move || sink.persist(&output, &name))
            .await
            .map_err(|e| CraftError::processing("export", e.to_string()))?
            .map(Some)
    }

    /// Dimensions of the full-resolution source, once ready.
    pub fn source_dimensions(&self) -> Option<(u32, u32)> {
        relock(&self.inner.pipeline)
            .as_ref()
            .map(|p| (p.source.width(), p.source.height()))
    }

    /// Dimensions of the downscaled preview source, once ready.
    pub fn preview_dimensions(&self) -> Option<(u32, u32)> {
        relock(&self.inner.pipeline)
            .as_ref()
            .map(|p| p.pool.dimensions())
    }

    pub fn render_stats(&self) -> Option<WorkerStats> {
        relock(&self.inner.pipeline)
            .as_ref()
            .map(|p| p.worker.stats())
    }

    /// Wait until no debounce trigger is armed and the preview worker has
    /// gone idle.
    ///
    /// Parameter writes issued while this is pending may arm a new trigger
    /// after it has resolved.
    pub async fn settle(&self) {
        let Some(pipeline) = relock(&self.inner.pipeline).clone() else {
            return;
        };
        pipeline.scheduler.wait_quiet().await;
        pipeline.worker.wait_idle().await;
    }

    /// Terminal, idempotent. No preview callback fires once this returns and
    /// every pooled buffer is freed exactly once.
    pub fn release(&self) {
        let mut previous = EngineState::Released;
        self.inner.state.send_if_modified(|state| {
            previous = *state;
            *state = EngineState::Released;
            previous != EngineState::Released
        });
        if previous == EngineState::Released {
            return;
        }

        relock(&self.inner.gate).open = false;
        if let Some(pipeline) = relock(&self.inner.pipeline).take() {
            pipeline.shutdown();
        }
        if let Some(task) = relock(&self.init_task).take() {
            task.abort();
        }
        info!(from = previous.as_str(), "engine released");
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        self.release();
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("state", &self.state())
            .field("config", &self.inner.config)
            .finish()
    }
}

/// Builder for [`Engine`].
pub struct EngineBuilder {
    source: Option<Box<dyn ImageSource>>,
    kernel: Arc<dyn PixelKernel>,
    config: EngineConfig,
    preview_sink: Arc<dyn PreviewSink>,
    error_sink: Option<ErrorSink>,
    parameters: Option<AdjustmentVector>,
}

impl Default for EngineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl EngineBuilder {
    pub fn new() -> Self {
        Self {
            source: None,
            kernel: Arc::new(CpuKernel),
            config: EngineConfig::default(),
            preview_sink: Arc::new(|_frame: PreviewFrame| {}),
            error_sink: None,
            parameters: None,
        }
    }

    pub fn with_source<S: ImageSource + 'static>(mut self, source: S) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// Defaults to [`CpuKernel`].
    pub fn with_kernel<K: PixelKernel + 'static>(mut self, kernel: K) -> Self {
        self.kernel = Arc::new(kernel);
        self
    }

    pub fn with_shared_kernel(mut self, kernel: Arc<dyn PixelKernel>) -> Self {
        self.kernel = kernel;
        self
    }

    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_preview_sink<P: PreviewSink + 'static>(mut self, sink: P) -> Self {
        self.preview_sink = Arc::new(sink);
        self
    }

    /// Called for every failed preview render, after the failure is logged.
    pub fn with_error_sink(
        mut self,
        sink: impl Fn(&CraftError) + Send + Sync + 'static,
    ) -> Self {
        self.error_sink = Some(Arc::new(sink));
        self
    }

    /// Starting adjustment values (clamped).
    pub fn with_parameters(mut self, parameters: AdjustmentVector) -> Self {
        self.parameters = Some(parameters);
        self
    }

    /// Validate the configuration and start decoding in the background.
    ///
    /// Must be called from within a tokio runtime.
    pub fn build(self) -> CraftResult<Engine> {
        self.config.validate()?;
        let source = self
            .source
            .ok_or_else(|| CraftError::config("source", "none", "an image source is required"))?;
        let runtime = Handle::try_current()
            .map_err(|e| CraftError::resource("tokio runtime", e.to_string()))?;

        let params = Arc::new(ParameterStore::new());
        let pending = match self.parameters {
            Some(parameters) => {
                params.replace(parameters);
                !params.snapshot().is_neutral()
            }
            None => false,
        };

        let (state, _) = watch::channel(EngineState::Initializing);
        let inner = Arc::new(EngineInner {
            state,
            failure: Mutex::new(None),
            params,
            pipeline: Mutex::new(None),
            gate: Mutex::new(Gate {
                open: true,
                next_sequence: 0,
            }),
            pending_render: AtomicBool::new(pending),
            sink: self.preview_sink,
            error_sink: self.error_sink,
            kernel: self.kernel,
            config: self.config,
        });

        let task = runtime.spawn(initialize(Arc::clone(&inner), source, runtime.clone()));
        Ok(Engine {
            inner,
            init_task: Mutex::new(Some(task)),
        })
    }
}

async fn initialize(inner: Arc<EngineInner>, source: Box<dyn ImageSource>, runtime: Handle) {
    let name = source.name();
    debug!(source = %name, "decoding source image");

    let full = match source.load().await {
        Ok(full) => full,
        Err(err) => return inner.fail(err),
    };

    let target = inner.config.preview_target();
    let scaled = tokio::task::spawn_blocking(move || {
        downscale(&full, target).map(|preview| (full, preview))
    })
    .await
    .map_err(|e| CraftError::decode(&name, e.to_string()))
    .and_then(|scaled| scaled);

    match scaled {
        Ok((full, preview)) => inner.install(full, preview, runtime),
        Err(err) => inner.fail(err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::MemoryImageSource;

    fn engine(w: u32, h: u32) -> Engine {
        Engine::builder()
            .with_source(MemoryImageSource::new("mem", PixelBuffer::filled(w, h, [50, 60, 70, 255])))
            .build()
            .unwrap()
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn becomes_ready_with_capped_preview() {
        let engine = engine(400, 300);
        engine.ready().await.unwrap();
        assert_eq!(engine.state(), EngineState::Ready);
        assert_eq!(engine.source_dimensions(), Some((400, 300)));
        assert_eq!(engine.preview_dimensions(), Some((400, 300)));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn build_requires_source() {
        let err = Engine::builder().build().unwrap_err();
        assert_eq!(err.category(), "config");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn build_rejects_invalid_config() {
        let err = Engine::builder()
            .with_source(MemoryImageSource::new("mem", PixelBuffer::filled(2, 2, [0; 4])))
            .with_config(EngineConfig {
                debounce_ms: 0,
                ..EngineConfig::default()
            })
            .build()
            .unwrap_err();
        assert_eq!(err.category(), "config");
    }

    #[test]
    fn build_outside_runtime_fails() {
        let err = Engine::builder()
            .with_source(MemoryImageSource::new("mem", PixelBuffer::filled(2, 2, [0; 4])))
            .build()
            .unwrap_err();
        assert_eq!(err.category(), "resource");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn release_is_idempotent_and_silences_operations() {
        let engine = engine(32, 32);
        engine.ready().await.unwrap();
        engine.release();
        engine.release();

        assert_eq!(engine.state(), EngineState::Released);
        engine.set_brightness(0.5);
        assert!(engine.show_before().unwrap().is_none());
        assert!(engine.show_after().unwrap().is_none());
        assert!(engine.render_final().await.unwrap().is_none());
        assert_eq!(engine.parameters(), AdjustmentVector::default());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn initial_parameters_are_rendered_once_ready() {
        let engine = Engine::builder()
            .with_source(MemoryImageSource::new("mem", PixelBuffer::filled(8, 8, [100, 100, 100, 255])))
            .with_parameters(AdjustmentVector {
                brightness: 0.5,
                ..Default::default()
            })
            .build()
            .unwrap();
        engine.ready().await.unwrap();
        engine.settle().await;

        let after = engine.show_after().unwrap().unwrap();
        assert_eq!(after.buffer.pixel(0, 0), Some([150, 150, 150, 255]));
        assert_eq!(engine.render_stats().unwrap().published, 1);
    }
}
