// SPDX-License-Identifier: MIT
//! # craft-scale: Preview Scaling for Interactive Editing
//!
//! This crate computes and executes the downscale that turns a decoded,
//! full-resolution photo into the smaller preview the interactive editor
//! renders against. Editing at preview size keeps each kernel pass cheap enough
//! to follow a slider drag, while the final export still runs at full size.
//!
//! ## Key Components
//!
//! - [`presets`]: Scaling plan computation and the preview size presets
//! - [`cpu`]: CPU-based RGBA8 scaling using SIMD acceleration
//!
//! ## Scaling Rules
//!
//! - The longest side is clamped to the requested edge length
//! - The aspect ratio is always preserved
//! - Images are never upscaled: a source already within bounds keeps its size
//! - Output dimensions never collapse below 1px
//!
//! ## Usage Example
//!
//! ```rust
//! use craft_scale::{cpu::scale_rgba_cpu, presets::{build_plan, ScaleTarget, Size}};
//!
//! let input_size = Size { w: 4000, h: 3000 };
//! let plan = build_plan(input_size, ScaleTarget::MaxLongSide(1080));
//! assert_eq!((plan.out.w, plan.out.h), (1080, 810));
//!
//! let input = vec![0u8; (input_size.w * input_size.h * 4) as usize];
//! let mut output = vec![0u8; plan.output_len()];
//! let mut resizer = fast_image_resize::Resizer::new();
//! scale_rgba_cpu(&mut resizer, &input, &plan, &mut output).unwrap();
//! ```

pub mod cpu;
pub mod presets;
