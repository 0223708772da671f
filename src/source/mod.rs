// # Image Sources
//
// Where the full-resolution pixels of an editing session come from, and the
// long-edge downscale that turns them into the preview source.
//
// Sources are async so an engine can decode off the caller's thread; the
// actual decode work runs on tokio's blocking pool.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use craft_scale::cpu::scale_rgba_to_vec;
use craft_scale::presets::{ScaleTarget, build_plan};
use fast_image_resize::Resizer;
use tracing::debug;

use crate::core::frame::PixelBuffer;
use crate::error::{CraftError, CraftResult};

/// Provider of a decoded, full-resolution image.
#[async_trait]
pub trait ImageSource: Send + Sync {
    /// Human-readable locator, used in errors and logs.
    fn name(&self) -> String;

    /// Decode the image. Failures are reported as `CraftError::Decode`.
    async fn load(&self) -> CraftResult<PixelBuffer>;
}

/// Decodes any format the `image` crate understands from a file path.
#[derive(Debug, Clone)]
pub struct FileImageSource {
    path: PathBuf,
}

impl FileImageSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl ImageSource for FileImageSource {
    fn name(&self) -> String {
        self.path.display().to_string()
    }

    async fn load(&self) -> CraftResult<PixelBuffer> {
        let path = self.path.clone();
        let name = self.name();
        tokio::task::spawn_blocking(move || decode_file(&path))
            .await
            .map_err(|e| CraftError::decode(name, e.to_string()))?
    }
}

fn decode_file(path: &Path) -> CraftResult<PixelBuffer> {
    let name = path.display().to_string();
    let rgba = image::open(path)
        .map_err(|e| CraftError::decode(&name, e.to_string()))?
        .into_rgba8();
    let (width, height) = rgba.dimensions();
    if width == 0 || height == 0 {
        return Err(CraftError::decode(name, "image has a zero dimension"));
    }
    debug!(path = %name, width, height, "decoded source image");
    PixelBuffer::from_rgba(width, height, rgba.into_raw())
        .ok_or_else(|| CraftError::decode(name, "decoder returned a short pixel buffer"))
}

/// An already-decoded image held in memory.
#[derive(Debug, Clone)]
pub struct MemoryImageSource {
    name: String,
    buffer: PixelBuffer,
}

impl MemoryImageSource {
    pub fn new(name: impl Into<String>, buffer: PixelBuffer) -> Self {
        Self {
            name: name.into(),
            buffer,
        }
    }
}

#[async_trait]
impl ImageSource for MemoryImageSource {
    fn name(&self) -> String {
        self.name.clone()
    }

    async fn load(&self) -> CraftResult<PixelBuffer> {
        if self.buffer.pixel_count() == 0 {
            return Err(CraftError::decode(&self.name, "image has a zero dimension"));
        }
        Ok(self.buffer.clone())
    }
}

/// Downscale to fit `target`, preserving the aspect ratio. Never upscales; a
/// buffer that already fits is copied.
pub fn downscale(buffer: &PixelBuffer, target: ScaleTarget) -> CraftResult<PixelBuffer> {
    let plan = build_plan(buffer.size(), target);
    if plan.is_identity() {
        return Ok(buffer.clone());
    }

    let data = scale_rgba_to_vec(&mut Resizer::new(), buffer.as_bytes(), &plan)?;
    debug!(
        from_w = plan.input.w,
        from_h = plan.input.h,
        to_w = plan.out.w,
        to_h = plan.out.h,
        "downscaled preview source"
    );
    PixelBuffer::from_rgba(plan.out.w, plan.out.h, data).ok_or_else(|| {
        CraftError::processing("downscale", "scaler returned a short pixel buffer")
    })
}
