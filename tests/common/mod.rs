//! Common test utilities and helpers for the imgcraft integration tests
//!
//! Synthetic images, an instrumented kernel that records every call, and a
//! preview sink that collects delivered frames.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use imgcraft::{Engine, EngineConfig, MemoryImageSource, PixelBuffer};

/// Test frame utilities
pub mod test_frames {
    use imgcraft::PixelBuffer;

    /// Horizontal gradient so resampling and kernels have something to chew on.
    pub fn gradient(width: u32, height: u32) -> PixelBuffer {
        let mut buffer = PixelBuffer::new(width, height);
        let w = width.max(1) as usize;
        for (i, px) in buffer.as_bytes_mut().chunks_exact_mut(4).enumerate() {
            let v = ((i % w) * 255 / w) as u8;
            px.copy_from_slice(&[v, 128, 255 - v, 255]);
        }
        buffer
    }

    pub fn gray(width: u32, height: u32, level: u8) -> PixelBuffer {
        PixelBuffer::filled(width, height, [level, level, level, 255])
    }
}

/// Kernel wrappers for observing the render pipeline
pub mod mock_kernel {
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::time::Duration;

    use imgcraft::processing::kernel::KernelError;
    use imgcraft::{AdjustmentVector, CpuKernel, PixelBuffer, PixelKernel};

    /// Runs the CPU kernel after an optional delay and records every call.
    #[derive(Default)]
    pub struct InstrumentedKernel {
        delay: Duration,
        active: AtomicUsize,
        max_active: AtomicUsize,
        calls: AtomicUsize,
        fail: AtomicBool,
        seen: Mutex<Vec<AdjustmentVector>>,
        sizes: Mutex<Vec<(u32, u32)>>,
    }

    impl InstrumentedKernel {
        pub fn new(delay: Duration) -> Self {
            Self {
                delay,
                ..Default::default()
            }
        }

        pub fn set_failing(&self, fail: bool) {
            self.fail.store(fail, Ordering::SeqCst);
        }

        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        /// Highest number of overlapping calls ever observed.
        pub fn max_active(&self) -> usize {
            self.max_active.load(Ordering::SeqCst)
        }

        pub fn seen(&self) -> Vec<AdjustmentVector> {
            self.seen.lock().unwrap().clone()
        }

        pub fn last_seen(&self) -> Option<AdjustmentVector> {
            self.seen.lock().unwrap().last().copied()
        }

        pub fn sizes(&self) -> Vec<(u32, u32)> {
            self.sizes.lock().unwrap().clone()
        }
    }

    impl PixelKernel for InstrumentedKernel {
        fn process(
            &self,
            source: &PixelBuffer,
            dest: &mut PixelBuffer,
            params: &AdjustmentVector,
        ) -> Result<(), KernelError> {
            let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_active.fetch_max(now, Ordering::SeqCst);
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.seen.lock().unwrap().push(*params);
            self.sizes
                .lock()
                .unwrap()
                .push((source.width(), source.height()));

            if !self.delay.is_zero() {
                std::thread::sleep(self.delay);
            }
            let result = if self.fail.load(Ordering::SeqCst) {
                Err(KernelError::Failed("instrumented failure".to_string()))
            } else {
                CpuKernel.process(source, dest, params)
            };

            self.active.fetch_sub(1, Ordering::SeqCst);
            result
        }

        fn name(&self) -> &str {
            "instrumented"
        }
    }
}

/// Preview sink that keeps every frame it receives
pub mod collecting_sink {
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use imgcraft::PreviewFrame;

    #[derive(Clone, Default)]
    pub struct Frames(Arc<Mutex<Vec<PreviewFrame>>>);

    impl Frames {
        pub fn sink(&self) -> impl Fn(PreviewFrame) + Send + Sync + 'static {
            let frames = Arc::clone(&self.0);
            move |frame| frames.lock().unwrap().push(frame)
        }

        pub fn len(&self) -> usize {
            self.0.lock().unwrap().len()
        }

        pub fn all(&self) -> Vec<PreviewFrame> {
            self.0.lock().unwrap().clone()
        }

        pub fn last(&self) -> Option<PreviewFrame> {
            self.0.lock().unwrap().last().cloned()
        }

        /// Poll until at least `count` frames arrived or `timeout` passes.
        pub async fn wait_for(&self, count: usize, timeout: Duration) -> bool {
            let deadline = tokio::time::Instant::now() + timeout;
            while tokio::time::Instant::now() < deadline {
                if self.len() >= count {
                    return true;
                }
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
            self.len() >= count
        }
    }
}

pub use collecting_sink::Frames;
pub use mock_kernel::InstrumentedKernel;

pub fn config_with_debounce(ms: u64) -> EngineConfig {
    EngineConfig {
        debounce_ms: ms,
        ..EngineConfig::default()
    }
}

/// Build an engine on an in-memory image with an instrumented kernel.
pub fn engine_with(
    image: PixelBuffer,
    kernel: &Arc<InstrumentedKernel>,
    frames: &Frames,
    config: EngineConfig,
) -> Engine {
    Engine::builder()
        .with_source(MemoryImageSource::new("memory", image))
        .with_shared_kernel(kernel.clone())
        .with_preview_sink(frames.sink())
        .with_config(config)
        .build()
        .expect("engine builds inside a runtime")
}

pub const SETTLE_TIMEOUT: Duration = Duration::from_secs(5);
