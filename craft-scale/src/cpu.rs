// SPDX-License-Identifier: MIT
// CPU scaler built on fast_image_resize (SIMD-accelerated).
// RGBA8 in → RGBA8 out, direct write into caller-provided dst buffer.

use fast_image_resize as fir;
use fir::images::{TypedImage, TypedImageRef};
use fir::pixels::U8x4;
use fir::{FilterType, ResizeAlg, ResizeOptions, Resizer};

use crate::presets::ScalePlan;

#[derive(Debug)]
pub enum ScaleError {
    EmptyImage,
    SourceTooSmall { expected: usize, actual: usize },
    BufferTooSmall { expected: usize, actual: usize },
    Fir(fir::ResizeError),
    ImageBuf(fir::ImageBufferError),
}

impl From<fir::ResizeError> for ScaleError { fn from(e: fir::ResizeError) -> Self { Self::Fir(e) } }
impl From<fir::ImageBufferError> for ScaleError { fn from(e: fir::ImageBufferError) -> Self { Self::ImageBuf(e) } }

impl std::fmt::Display for ScaleError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScaleError::EmptyImage => write!(f, "Cannot scale an image with a zero dimension"),
            ScaleError::SourceTooSmall { expected, actual } => {
                write!(f, "Source buffer too small: expected {} bytes, got {}", expected, actual)
            }
            ScaleError::BufferTooSmall { expected, actual } => {
                write!(f, "Output buffer too small: expected {} bytes, got {}", expected, actual)
            }
            ScaleError::Fir(e) => write!(f, "Fast image resize error: {}", e),
            ScaleError::ImageBuf(e) => write!(f, "Image buffer error: {}", e),
        }
    }
}

impl std::error::Error for ScaleError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ScaleError::Fir(e) => Some(e),
            ScaleError::ImageBuf(e) => Some(e),
            _ => None,
        }
    }
}

/// Main scaling entry point.
///
/// `src_rgba` must hold `plan.input.w * plan.input.h * 4` tightly packed bytes and
/// `dst` at least `plan.output_len()` bytes. An identity plan is a straight copy.
pub fn scale_rgba_cpu(
    resizer: &mut Resizer,
    src_rgba: &[u8],
    plan: &ScalePlan,
    dst: &mut [u8],
) -> Result<(), ScaleError> {
    if plan.input.area() == 0 || plan.out.area() == 0 {
        return Err(ScaleError::EmptyImage);
    }

    let src_len = plan.input.area() * 4;
    if src_rgba.len() < src_len {
        return Err(ScaleError::SourceTooSmall { expected: src_len, actual: src_rgba.len() });
    }
    let dst_len = plan.output_len();
    if dst.len() < dst_len {
        return Err(ScaleError::BufferTooSmall { expected: dst_len, actual: dst.len() });
    }

    if plan.is_identity() {
        dst[..dst_len].copy_from_slice(&src_rgba[..src_len]);
        return Ok(());
    }

    let src_view = TypedImageRef::<U8x4>::from_buffer(plan.input.w, plan.input.h, &src_rgba[..src_len])?;
    let mut dst_image = TypedImage::<U8x4>::from_buffer(plan.out.w, plan.out.h, &mut dst[..dst_len])?;

    // Lanczos3 keeps fine texture visible in the preview, which matters when
    // judging sharpness and grain.
    let opts = ResizeOptions::new()
        .resize_alg(ResizeAlg::Convolution(FilterType::Lanczos3))
        .use_alpha(false);

    resizer.resize_typed::<U8x4>(&src_view, &mut dst_image, &opts)?;
    Ok(())
}

/// Convenience wrapper that allocates the destination.
pub fn scale_rgba_to_vec(
    resizer: &mut Resizer,
    src_rgba: &[u8],
    plan: &ScalePlan,
) -> Result<Vec<u8>, ScaleError> {
    let mut out = vec![0u8; plan.output_len()];
    scale_rgba_cpu(resizer, src_rgba, plan, &mut out)?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::presets::{build_plan, ScaleTarget, Size};

    fn solid(size: Size, px: [u8; 4]) -> Vec<u8> {
        px.iter().copied().cycle().take(size.area() * 4).collect()
    }

    #[test]
    fn downscales_solid_color_exactly() {
        let input = Size { w: 64, h: 48 };
        let plan = build_plan(input, ScaleTarget::MaxLongSide(16));
        let src = solid(input, [10, 200, 30, 255]);
        let out = scale_rgba_to_vec(&mut Resizer::new(), &src, &plan).unwrap();
        assert_eq!(out.len(), 16 * 12 * 4);
        let expected = [10i16, 200, 30, 255];
        for px in out.chunks_exact(4) {
            for (got, want) in px.iter().zip(expected) {
                assert!((*got as i16 - want).abs() <= 1, "channel drifted: {} vs {}", got, want);
            }
        }
    }

    #[test]
    fn identity_plan_copies() {
        let input = Size { w: 3, h: 2 };
        let plan = build_plan(input, ScaleTarget::MaxLongSide(100));
        let src: Vec<u8> = (0..24).collect();
        let out = scale_rgba_to_vec(&mut Resizer::new(), &src, &plan).unwrap();
        assert_eq!(out, src);
    }

    #[test]
    fn rejects_short_buffers() {
        let plan = build_plan(Size { w: 8, h: 8 }, ScaleTarget::MaxLongSide(4));
        let err = scale_rgba_cpu(&mut Resizer::new(), &[0u8; 10], &plan, &mut [0u8; 64]).unwrap_err();
        assert!(matches!(err, ScaleError::SourceTooSmall { .. }));

        let src = vec![0u8; 8 * 8 * 4];
        let err = scale_rgba_cpu(&mut Resizer::new(), &src, &plan, &mut [0u8; 8]).unwrap_err();
        assert!(matches!(err, ScaleError::BufferTooSmall { .. }));
    }

    #[test]
    fn rejects_empty_images() {
        let plan = build_plan(Size { w: 0, h: 10 }, ScaleTarget::MaxLongSide(4));
        let err = scale_rgba_cpu(&mut Resizer::new(), &[], &plan, &mut []).unwrap_err();
        assert!(matches!(err, ScaleError::EmptyImage));
    }
}
