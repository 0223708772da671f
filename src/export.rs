//! # Export
//!
//! Persistence of full-resolution renders. The engine only knows the
//! [`PersistenceSink`] trait; [`DirectorySink`] is the file-system
//! implementation used by the CLI.

use std::fs;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::{ExtendedColorType, ImageEncoder, ImageError};
use tracing::info;

use crate::core::frame::PixelBuffer;
use crate::error::{CraftError, CraftResult};

/// Stores a rendered buffer under a name and reports where it went.
pub trait PersistenceSink: Send + Sync {
    fn persist(&self, buffer: &PixelBuffer, name: &str) -> CraftResult<PathBuf>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum ExportFormat {
    /// Lossy JPEG; alpha is dropped.
    #[default]
    Jpeg,
    Png,
}

impl ExportFormat {
    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Jpeg => "jpg",
            ExportFormat::Png => "png",
        }
    }
}

/// Writes `<dir>/<name>.<ext>`, creating `dir` when missing.
#[derive(Debug, Clone)]
pub struct DirectorySink {
    dir: PathBuf,
    format: ExportFormat,
    jpeg_quality: u8,
}

impl DirectorySink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            format: ExportFormat::default(),
            jpeg_quality: 95,
        }
    }

    pub fn with_format(mut self, format: ExportFormat) -> Self {
        self.format = format;
        self
    }

    /// Clamped into 1..=100.
    pub fn with_jpeg_quality(mut self, quality: u8) -> Self {
        self.jpeg_quality = quality.clamp(1, 100);
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn target_path(&self, name: &str) -> CraftResult<PathBuf> {
        let stem = name.trim();
        if stem.is_empty() || stem.contains(['/', '\\']) || stem == "." || stem == ".." {
            return Err(CraftError::validation(
                "name",
                "non-empty file name without path separators",
                name,
            ));
        }
        Ok(self
            .dir
            .join(format!("{}.{}", stem, self.format.extension())))
    }
}

impl DirectorySink {
    /// Encode `buffer` into `out` and flush it. `path` is only used in errors.
    fn encode<W: Write>(&self, buffer: &PixelBuffer, out: W, path: &Path) -> CraftResult<()> {
        let mut writer = BufWriter::new(out);
        let (w, h) = (buffer.width(), buffer.height());
        match self.format {
            ExportFormat::Jpeg => {
                let rgb: Vec<u8> = buffer
                    .as_bytes()
                    .chunks_exact(4)
                    .flat_map(|px| [px[0], px[1], px[2]])
                    .collect();
                JpegEncoder::new_with_quality(&mut writer, self.jpeg_quality).write_image(
                    &rgb,
                    w,
                    h,
                    ExtendedColorType::Rgb8,
                )
                .map_err(|e| encode_error(e, path))?;
            }
            ExportFormat::Png => {
                PngEncoder::new(&mut writer).write_image(
                    buffer.as_bytes(),
                    w,
                    h,
                    ExtendedColorType::Rgba8,
                )
                .map_err(|e| encode_error(e, path))?;
            }
        }
        writer
            .flush()
            .map_err(|e| CraftError::io_at("write export file", path.display().to_string(), e))
    }
}

fn encode_error(error: ImageError, path: &Path) -> CraftError {
    match error {
        ImageError::IoError(e) => {
            CraftError::io_at("write export file", path.display().to_string(), e)
        }
        other => CraftError::from(other),
    }
}

impl PersistenceSink for DirectorySink {
    fn persist(&self, buffer: &PixelBuffer, name: &str) -> CraftResult<PathBuf> {
        let path = self.target_path(name)?;
        fs::create_dir_all(&self.dir)
            .map_err(|e| CraftError::io_at("create export dir", self.dir.display().to_string(), e))?;
        let file = fs::File::create(&path)
            .map_err(|e| CraftError::io_at("create export file", path.display().to_string(), e))?;
        self.encode(buffer, file, &path)?;

        info!(
            path = %path.display(),
            width = buffer.width(),
            height = buffer.height(),
            "exported image"
        );
        Ok(path)
    }
}
