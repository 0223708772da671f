//! # Processing Module
//!
//! The interactive render pipeline: the pixel kernel, the debounce scheduler
//! that coalesces parameter bursts and the serial render worker.

pub mod kernel;
pub mod scheduler;
pub mod worker;

pub use kernel::{CpuKernel, KernelError, PixelKernel};
pub use scheduler::{DEFAULT_DEBOUNCE, DebounceScheduler};
pub use worker::{ErrorSink, FrameSink, RenderInputs, RenderState, RenderWorker, WorkerStats};
