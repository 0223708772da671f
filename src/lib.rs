//! # imgcraft
//!
//! An interactive image-adjustment preview engine. Given a decoded image and
//! ten normalized adjustment values, it keeps a preview in sync with rapid,
//! bursty parameter changes (a user dragging a slider) while running the
//! expensive pixel kernel only as often as needed, never concurrently, and
//! never losing the final value of a burst.
//!
//! ## Architecture
//!
//! The library is organized into several key modules:
//! - `core`: Pixel buffers, adjustment parameters and the three-role buffer pool
//! - `processing`: Pixel kernel, debounce scheduler and render worker
//! - `source`: Image decoding and preview downscaling
//! - `export`: Persistence of full-resolution renders
//! - `config`: Configuration management and validation
//! - `session`: The [`Engine`] that ties everything together
//!
//! ## Features
//!
//! - **Coalesced rendering**: bursts of changes collapse into one render of the final state
//! - **Strict mutual exclusion**: at most one preview kernel call in flight
//! - **Immutable publication**: a frame handed to the consumer is never written again
//! - **Release safety**: no callback fires after `release()` returns
//! - **Async/await**: Built on Tokio, decode and kernels run on the blocking pool
//!
//! ## Example
//!
//! ```rust,no_run
//! use imgcraft::{EngineConfig, open_file};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let engine = open_file("photo.jpg", EngineConfig::default())?;
//! engine.ready().await?;
//!
//! engine.set_exposure(0.5);
//! engine.set_saturation(-0.2);
//! engine.settle().await;
//! engine.show_after()?;
//!
//! let full = engine.render_final().await?;
//! engine.release();
//! # let _ = full;
//! # Ok(())
//! # }
//! ```

use std::path::PathBuf;

pub mod config;
pub mod core;
pub mod error;
pub mod export;
pub mod processing;
pub mod session;
pub mod source;

/// Re-export error types for convenience
pub use error::{CraftError, CraftResult, HasRecoverySuggestion, HasSeverity, Recoverable};

pub use crate::config::EngineConfig;
pub use crate::core::frame::PixelBuffer;
pub use crate::core::params::{Adjustment, AdjustmentVector};
pub use crate::export::{DirectorySink, ExportFormat, PersistenceSink};
pub use crate::processing::{CpuKernel, PixelKernel};
pub use crate::session::{Engine, EngineBuilder, EngineState, FrameKind, PreviewFrame, PreviewSink};
pub use crate::source::{FileImageSource, ImageSource, MemoryImageSource};

/// Start an engine on an image file with the default CPU kernel and no
/// preview sink. Decoding begins immediately; await [`Engine::ready`].
///
/// Must be called from within a tokio runtime.
pub fn open_file(path: impl Into<PathBuf>, config: EngineConfig) -> CraftResult<Engine> {
    Engine::builder()
        .with_source(FileImageSource::new(path))
        .with_config(config)
        .build()
}
