//! # Configuration Module
//!
//! Tunables for an editing session, shared by the library, the CLI and any
//! embedding application. Configuration can be built in code, loaded from a
//! JSON file or assembled from CLI flags.
//!
//! ## Configuration Parameters
//!
//! | Parameter | Type | Range | Default | Description |
//! |-----------|------|-------|---------|-------------|
//! | `debounce_ms` | `u64` | 1-1000 | 16 | Quiet interval before a render fires |
//! | `preview_max_long_edge` | `u32` | 16-16384 | 1080 | Long-edge cap of the preview source |
//! | `export_jpeg_quality` | `u8` | 1-100 | 95 | JPEG quality used by directory exports |
//!
//! ## Examples
//!
//! ```rust
//! use imgcraft::config::config::EngineConfig;
//!
//! let config = EngineConfig::default();
//! assert!(config.validate().is_ok());
//!
//! let config = EngineConfig {
//!     preview_max_long_edge: 720,
//!     ..EngineConfig::default()
//! };
//! assert_eq!(config.debounce().as_millis(), 16);
//! ```

use std::path::Path;
use std::time::Duration;

use craft_scale::presets::{PreviewPreset, ScaleTarget};
use serde::{Deserialize, Serialize};

use crate::error::{CraftError, CraftResult};
use crate::processing::scheduler::DEFAULT_DEBOUNCE;

/// Configuration for an editing session.
///
/// Missing fields in a JSON file fall back to their defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Quiet interval in milliseconds that must follow the last parameter
    /// change before a preview render runs.
    pub debounce_ms: u64,

    /// The preview source is downscaled so its longest side is at most this
    /// many pixels. Images that are already smaller are never upscaled.
    pub preview_max_long_edge: u32,

    /// Quality for JPEG exports written by `DirectorySink`.
    pub export_jpeg_quality: u8,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            debounce_ms: DEFAULT_DEBOUNCE.as_millis() as u64,
            preview_max_long_edge: PreviewPreset::default().long_edge(),
            export_jpeg_quality: 95,
        }
    }
}

impl EngineConfig {
    /// Default configuration with the preview capped by a named preset.
    pub fn with_preset(preset: PreviewPreset) -> Self {
        Self {
            preview_max_long_edge: preset.long_edge(),
            ..Self::default()
        }
    }

    /// Load and validate a JSON configuration file.
    pub fn from_json_file(path: impl AsRef<Path>) -> CraftResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| CraftError::io_at("read config", path.display().to_string(), e))?;
        let config: Self = serde_json::from_str(&text).map_err(|e| {
            CraftError::from(e).with_context(format!("parsing {}", path.display()))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration parameters.
    ///
    /// Returns the first violated constraint as a `CraftError::Config`.
    pub fn validate(&self) -> CraftResult<()> {
        if !(1..=1000).contains(&self.debounce_ms) {
            return Err(CraftError::config(
                "debounce_ms",
                self.debounce_ms.to_string(),
                "must be between 1 and 1000",
            ));
        }
        if !(16..=16384).contains(&self.preview_max_long_edge) {
            return Err(CraftError::config(
                "preview_max_long_edge",
                self.preview_max_long_edge.to_string(),
                "must be between 16 and 16384",
            ));
        }
        if !(1..=100).contains(&self.export_jpeg_quality) {
            return Err(CraftError::config(
                "export_jpeg_quality",
                self.export_jpeg_quality.to_string(),
                "must be between 1 and 100",
            ));
        }
        Ok(())
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn preview_target(&self) -> ScaleTarget {
        ScaleTarget::MaxLongSide(self.preview_max_long_edge)
    }
}
