// SPDX-License-Identifier: MIT
//! # Scaling Presets and Plan Computation
//!
//! This module computes preview scaling plans. A plan is a pure value: the input
//! size, the constraint that was applied, and the final output size. Computing it
//! is separate from executing it so callers can allocate destination buffers
//! before any pixels move.
//!
//! ## Design
//!
//! 1. **ScaleTarget**: What size constraint to apply
//! 2. **ScalePlan**: The computed output parameters for the actual scaling
//! 3. **PreviewPreset**: Named long-edge caps exposed on the command line
//!
//! All computations use `f64` and round to the nearest integer, clamped to a
//! minimum of 1px.

/// Represents a 2D size with width and height in pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Size {
    pub w: u32,
    pub h: u32,
}

impl Size {
    /// Length of the longest side.
    pub fn long_edge(self) -> u32 {
        self.w.max(self.h)
    }

    /// Number of pixels covered by this size.
    pub fn area(self) -> usize {
        self.w as usize * self.h as usize
    }
}

/// Defines the target size constraint for scaling operations.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScaleTarget {
    /// Clamp the longest side to a maximum value, derive the other side proportionally.
    MaxLongSide(u32),
}

/// Complete scaling plan computed from input parameters.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ScalePlan {
    /// Original input dimensions
    pub input: Size,
    /// Target size constraint used for planning
    pub target: ScaleTarget,
    /// Final computed output dimensions
    pub out: Size,
}

impl ScalePlan {
    /// True when the plan leaves the image at its original size.
    pub fn is_identity(&self) -> bool {
        self.input == self.out
    }

    /// Bytes required for an RGBA8 destination of this plan's output size.
    pub fn output_len(&self) -> usize {
        self.out.area() * 4
    }
}

/// Compute a scaling plan from input parameters.
///
/// Never upscales. A zero-sized input yields a zero-sized identity plan, which
/// callers are expected to reject before scaling.
pub fn build_plan(input: Size, target: ScaleTarget) -> ScalePlan {
    let out = if input.w == 0 || input.h == 0 {
        input
    } else {
        match target {
            ScaleTarget::MaxLongSide(max_side) => fit_preserve(input, max_side),
        }
    };
    ScalePlan { input, target, out }
}

/// Fit image within max_long on its longest dimension, preserving aspect ratio.
fn fit_preserve(input: Size, max_long: u32) -> Size {
    let (w, h) = (input.w as f64, input.h as f64);
    let long = w.max(h);
    let s = (max_long.max(1) as f64 / long).min(1.0); // don't upscale
    Size {
        w: ((w * s).round() as u32).max(1),
        h: ((h * s).round() as u32).max(1),
    }
}

/// Named long-edge caps for the interactive preview.
///
/// Smaller previews render faster while dragging; larger ones look sharper on
/// high-density displays. `Fhd1080` matches the editor's default.
#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum PreviewPreset {
    /// 720px long edge, for slow devices
    #[clap(name = "720")]
    Hd720,
    /// 1080px long edge (default)
    #[clap(name = "1080")]
    Fhd1080,
    /// 1440px long edge
    #[clap(name = "1440")]
    Qhd1440,
    /// 2160px long edge, for 4K displays
    #[clap(name = "2160")]
    Uhd2160,
}

impl PreviewPreset {
    /// The long-edge cap in pixels.
    pub fn long_edge(self) -> u32 {
        match self {
            PreviewPreset::Hd720 => 720,
            PreviewPreset::Fhd1080 => 1080,
            PreviewPreset::Qhd1440 => 1440,
            PreviewPreset::Uhd2160 => 2160,
        }
    }
}

impl Default for PreviewPreset {
    fn default() -> Self {
        PreviewPreset::Fhd1080
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn landscape_is_clamped_on_width() {
        let plan = build_plan(Size { w: 4000, h: 3000 }, ScaleTarget::MaxLongSide(1080));
        assert_eq!(plan.out, Size { w: 1080, h: 810 });
        assert!(!plan.is_identity());
    }

    #[test]
    fn portrait_is_clamped_on_height() {
        let plan = build_plan(Size { w: 3000, h: 4000 }, ScaleTarget::MaxLongSide(1080));
        assert_eq!(plan.out, Size { w: 810, h: 1080 });
    }

    #[test]
    fn never_upscales() {
        let small = Size { w: 640, h: 480 };
        let plan = build_plan(small, ScaleTarget::MaxLongSide(1080));
        assert_eq!(plan.out, small);
        assert!(plan.is_identity());
    }

    #[test]
    fn extreme_aspect_keeps_one_pixel() {
        let plan = build_plan(Size { w: 10_000, h: 2 }, ScaleTarget::MaxLongSide(100));
        assert_eq!(plan.out, Size { w: 100, h: 1 });
    }

    #[test]
    fn presets_map_to_long_edges() {
        assert_eq!(PreviewPreset::default().long_edge(), 1080);
        assert_eq!(PreviewPreset::Hd720.long_edge(), 720);
        assert_eq!(plan_len(PreviewPreset::Uhd2160), 3840 * 2160 * 4);
    }

    fn plan_len(preset: PreviewPreset) -> usize {
        build_plan(
            Size { w: 7680, h: 4320 },
            ScaleTarget::MaxLongSide(preset.long_edge()),
        )
        .output_len()
    }
}
