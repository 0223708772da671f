//! # Pixel Kernel
//!
//! The per-pixel adjustment operation, behind the [`PixelKernel`] trait so the
//! engine can be driven by the reference [`CpuKernel`] or by any other
//! implementation (a GPU path, or an instrumented kernel in tests).
//!
//! ## Contract
//!
//! A kernel reads `source`, writes every pixel of `dest` and leaves `source`
//! untouched. Implementations must be reentrant across distinct buffer pairs:
//! the interactive preview render and a full-resolution export may call
//! `process` at the same time from different threads, always with different
//! destination buffers.
//!
//! ## CpuKernel Pipeline
//!
//! ```text
//! source ──copy──▶ dest ──▶ unsharp mask ──▶ per pixel:
//!     brightness → exposure → contrast → hue → saturation →
//!     highlights → shadows → grain → vignette → clamp
//! ```
//!
//! Every stage is skipped when its value is within `0.001` of neutral, so a
//! neutral vector produces an exact copy of the source.

use std::fmt;

use craft_scale::presets::Size;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::core::frame::{BYTES_PER_PIXEL, PixelBuffer};
use crate::core::params::AdjustmentVector;
use crate::error::{CraftError, ErrorSeverity};

const NEUTRAL_EPSILON: f32 = 0.001;

#[derive(Debug, Clone, PartialEq)]
pub enum KernelError {
    DimensionMismatch { source: Size, dest: Size },
    EmptyImage,
    Failed(String),
    /// The kernel panicked; the destination contents are unspecified.
    Panicked,
}

impl fmt::Display for KernelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KernelError::DimensionMismatch { source, dest } => write!(
                f,
                "source is {}x{} but destination is {}x{}",
                source.w, source.h, dest.w, dest.h
            ),
            KernelError::EmptyImage => write!(f, "cannot process an image with a zero dimension"),
            KernelError::Failed(reason) => write!(f, "{}", reason),
            KernelError::Panicked => write!(f, "pixel kernel panicked"),
        }
    }
}

impl std::error::Error for KernelError {}

impl From<KernelError> for CraftError {
    fn from(error: KernelError) -> Self {
        let severity = match error {
            KernelError::Panicked => ErrorSeverity::Critical,
            _ => ErrorSeverity::Error,
        };
        CraftError::processing("pixel kernel", error.to_string()).with_severity(severity)
    }
}

/// An adjustment operation that fills `dest` from `source`.
///
/// Implementations must be safe to call concurrently with distinct buffer
/// pairs (see the module docs).
pub trait PixelKernel: Send + Sync {
    fn process(
        &self,
        source: &PixelBuffer,
        dest: &mut PixelBuffer,
        params: &AdjustmentVector,
    ) -> Result<(), KernelError>;

    fn name(&self) -> &str {
        "kernel"
    }
}

/// Reference single-threaded CPU implementation.
///
/// Grain noise is drawn from an RNG seeded from the adjustment values, so the
/// same source and snapshot always render the same pixels.
#[derive(Debug, Clone, Copy, Default)]
pub struct CpuKernel;

impl CpuKernel {
    pub fn new() -> Self {
        Self
    }
}

impl PixelKernel for CpuKernel {
    fn process(
        &self,
        source: &PixelBuffer,
        dest: &mut PixelBuffer,
        params: &AdjustmentVector,
    ) -> Result<(), KernelError> {
        if source.size() != dest.size() {
            return Err(KernelError::DimensionMismatch {
                source: source.size(),
                dest: dest.size(),
            });
        }
        if source.pixel_count() == 0 {
            return Err(KernelError::EmptyImage);
        }

        dest.copy_from(source);
        if active(params.sharpness) {
            unsharp_mask(source, dest, params.sharpness * 3.0);
        }
        adjust_pixels(dest, params);
        Ok(())
    }

    fn name(&self) -> &str {
        "cpu"
    }
}

fn active(value: f32) -> bool {
    value.abs() > NEUTRAL_EPSILON
}

fn luminance(r: f32, g: f32, b: f32) -> f32 {
    0.299 * r + 0.587 * g + 0.114 * b
}

fn grain_seed(params: &AdjustmentVector) -> u64 {
    [
        params.brightness,
        params.contrast,
        params.exposure,
        params.hue,
        params.saturation,
        params.highlight,
        params.shadows,
        params.grain,
        params.sharpness,
        params.vignette,
    ]
    .iter()
    .fold(0x9E37_79B9_7F4A_7C15, |acc, v| {
        (acc ^ v.to_bits() as u64).wrapping_mul(0x1000_0000_01B3)
    })
}

/// 3x3 box blur per channel, averaging only in-bounds neighbours.
fn box_blur(src: &PixelBuffer) -> Vec<[u8; 3]> {
    let (w, h) = (src.width() as i64, src.height() as i64);
    let bytes = src.as_bytes();
    let mut out = Vec::with_capacity(src.pixel_count());

    for y in 0..h {
        for x in 0..w {
            let mut sum = [0u32; 3];
            let mut count = 0u32;
            for ny in (y - 1).max(0)..=(y + 1).min(h - 1) {
                for nx in (x - 1).max(0)..=(x + 1).min(w - 1) {
                    let offset = (ny * w + nx) as usize * BYTES_PER_PIXEL;
                    for c in 0..3 {
                        sum[c] += bytes[offset + c] as u32;
                    }
                    count += 1;
                }
            }
            out.push([
                (sum[0] / count) as u8,
                (sum[1] / count) as u8,
                (sum[2] / count) as u8,
            ]);
        }
    }
    out
}

/// `dest = source + (source - blur(source)) * amount`, alpha untouched.
fn unsharp_mask(source: &PixelBuffer, dest: &mut PixelBuffer, amount: f32) {
    let blurred = box_blur(source);
    let src = source.as_bytes();
    for (i, (px, blur)) in dest
        .as_bytes_mut()
        .chunks_exact_mut(BYTES_PER_PIXEL)
        .zip(blurred)
        .enumerate()
    {
        let offset = i * BYTES_PER_PIXEL;
        for c in 0..3 {
            let orig = src[offset + c] as i32;
            let sharp = orig + ((orig - blur[c] as i32) as f32 * amount) as i32;
            px[c] = sharp.clamp(0, 255) as u8;
        }
    }
}

fn contrast_curve(x: f32, contrast: f32) -> f32 {
    let k = if contrast >= 0.0 {
        1.0 + contrast * 0.5
    } else {
        1.0 + contrast * 0.2
    };
    ((x - 0.5) * k + 0.5).clamp(0.0, 1.0)
}

/// RGB in 0..255 to (hue degrees, saturation, value) with s and v in 0..1.
fn rgb_to_hsv(r: f32, g: f32, b: f32) -> (f32, f32, f32) {
    let (r, g, b) = (r / 255.0, g / 255.0, b / 255.0);
    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let d = max - min;

    let s = if max == 0.0 { 0.0 } else { d / max };
    let h = if d == 0.0 {
        0.0
    } else {
        let sector = if max == r {
            ((g - b) / d) % 6.0
        } else if max == g {
            (b - r) / d + 2.0
        } else {
            (r - g) / d + 4.0
        };
        let h = sector * 60.0;
        if h < 0.0 { h + 360.0 } else { h }
    };
    (h, s, max)
}

fn hsv_to_rgb(h: f32, s: f32, v: f32) -> (f32, f32, f32) {
    let c = v * s;
    let x = c * (1.0 - ((h / 60.0) % 2.0 - 1.0).abs());
    let m = v - c;
    let (r, g, b) = match h {
        h if h < 60.0 => (c, x, 0.0),
        h if h < 120.0 => (x, c, 0.0),
        h if h < 180.0 => (0.0, c, x),
        h if h < 240.0 => (0.0, x, c),
        h if h < 300.0 => (x, 0.0, c),
        _ => (c, 0.0, x),
    };
    ((r + m) * 255.0, (g + m) * 255.0, (b + m) * 255.0)
}

fn adjust_pixels(dest: &mut PixelBuffer, p: &AdjustmentVector) {
    let width = dest.width() as usize;
    let cx = dest.width() as f32 / 2.0;
    let cy = dest.height() as f32 / 2.0;
    let max_dist = (cx * cx + cy * cy).sqrt();
    let exposure_gain = 2f32.powf(p.exposure);
    let mut rng = StdRng::seed_from_u64(grain_seed(p));

    for (i, px) in dest.as_bytes_mut().chunks_exact_mut(BYTES_PER_PIXEL).enumerate() {
        let (mut r, mut g, mut b) = (px[0] as f32, px[1] as f32, px[2] as f32);

        if active(p.brightness) {
            let delta = p.brightness * 100.0;
            r += delta;
            g += delta;
            b += delta;
        }

        if active(p.exposure) {
            r *= exposure_gain;
            g *= exposure_gain;
            b *= exposure_gain;
        }

        if active(p.contrast) {
            r = contrast_curve(r / 255.0, p.contrast) * 255.0;
            g = contrast_curve(g / 255.0, p.contrast) * 255.0;
            b = contrast_curve(b / 255.0, p.contrast) * 255.0;
        }

        if active(p.hue) {
            let (h, s, v) = rgb_to_hsv(r, g, b);
            let mut h = h + p.hue * 60.0;
            if h > 360.0 {
                h -= 360.0;
            }
            if h < 0.0 {
                h += 360.0;
            }
            (r, g, b) = hsv_to_rgb(h, s, v);
        }

        if active(p.saturation) {
            let gray = luminance(r, g, b);
            let gain = 1.0 + p.saturation;
            r = gray + (r - gray) * gain;
            g = gray + (g - gray) * gain;
            b = gray + (b - gray) * gain;
        }

        if active(p.highlight) {
            let (mut rn, mut gn, mut bn) = (r / 255.0, g / 255.0, b / 255.0);
            let lum = luminance(rn, gn, bn);
            let mask = ((lum - 0.5) / 0.5).clamp(0.0, 1.0).powi(2);

            if p.highlight < 0.0 {
                let k = -p.highlight * 0.35;
                rn -= k * mask * lum;
                gn -= k * mask * lum;
                bn -= k * mask * lum;

                let sat = 1.0 - k * 0.4;
                rn = lum + (rn - lum) * sat;
                gn = lum + (gn - lum) * sat;
                bn = lum + (bn - lum) * sat;
            } else {
                let k = p.highlight * 0.8;
                rn += k * mask * (1.0 - rn);
                gn += k * mask * (1.0 - gn);
                bn += k * mask * (1.0 - bn);
            }

            r = rn.clamp(0.0, 1.0) * 255.0;
            g = gn.clamp(0.0, 1.0) * 255.0;
            b = bn.clamp(0.0, 1.0) * 255.0;
        }

        if active(p.shadows) {
            let lum = luminance(r, g, b) / 255.0;
            if lum < 0.5 {
                let t = 1.0 - lum / 0.6;
                let factor = 1.0 + p.shadows * t * t;
                r *= factor;
                g *= factor;
                b *= factor;
            }
        }

        if active(p.grain) {
            let noise = rng.gen_range(-100..100) as f32 / 100.0;
            let strength = p.grain * (1.0 - luminance(r, g, b) / 255.0);
            r += noise * strength * 60.0;
            g += noise * strength * 30.0;
            b += noise * strength * 30.0;
        }

        if p.vignette != 0.0 {
            let dx = (i % width) as f32 - cx;
            let dy = (i / width) as f32 - cy;
            let dist = (dx * dx + dy * dy).sqrt();
            let vig = (1.0 - p.vignette * (dist / max_dist).powf(1.5)).max(0.0);
            r *= vig;
            g *= vig;
            b *= vig;
        }

        px[0] = (r as i32).clamp(0, 255) as u8;
        px[1] = (g as i32).clamp(0, 255) as u8;
        px[2] = (b as i32).clamp(0, 255) as u8;
    }
}
