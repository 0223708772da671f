//! Preview sizing, full-resolution renders and persistence.

mod common;

use std::sync::Arc;

use common::test_frames::{gradient, gray};
use common::{Frames, InstrumentedKernel, config_with_debounce, engine_with};
use craft_scale::presets::PreviewPreset;
use imgcraft::{DirectorySink, EngineConfig, ExportFormat};

#[tokio::test(flavor = "multi_thread")]
async fn test_preview_is_capped_and_final_is_full_size() {
    let kernel = Arc::new(InstrumentedKernel::default());
    let frames = Frames::default();
    let engine = engine_with(gradient(2000, 1500), &kernel, &frames, EngineConfig::default());
    engine.ready().await.unwrap();

    assert_eq!(engine.source_dimensions(), Some((2000, 1500)));
    assert_eq!(engine.preview_dimensions(), Some((1080, 810)));
    let initial = frames.last().unwrap();
    assert_eq!((initial.buffer.width(), initial.buffer.height()), (1080, 810));

    let full = engine.render_final().await.unwrap().unwrap();
    assert_eq!((full.width(), full.height()), (2000, 1500));
    assert_eq!(kernel.sizes(), vec![(2000, 1500)]);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_preset_controls_preview_size() {
    let kernel = Arc::new(InstrumentedKernel::default());
    let frames = Frames::default();
    let config = EngineConfig::with_preset(PreviewPreset::Hd720);
    let engine = engine_with(gray(1600, 1200, 60), &kernel, &frames, config);
    engine.ready().await.unwrap();

    assert_eq!(engine.preview_dimensions(), Some((720, 540)));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_small_source_is_not_upscaled() {
    let kernel = Arc::new(InstrumentedKernel::default());
    let frames = Frames::default();
    let engine = engine_with(gray(300, 200, 60), &kernel, &frames, EngineConfig::default());
    engine.ready().await.unwrap();

    assert_eq!(engine.preview_dimensions(), Some((300, 200)));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_export_png_to_directory() {
    let dir = tempfile::tempdir().unwrap();
    let kernel = Arc::new(InstrumentedKernel::default());
    let frames = Frames::default();
    let engine = engine_with(gray(40, 30, 100), &kernel, &frames, config_with_debounce(1));
    engine.ready().await.unwrap();
    engine.set_brightness(0.2);

    let sink = Arc::new(DirectorySink::new(dir.path().join("out")).with_format(ExportFormat::Png));
    let path = engine.export(sink, "edited").await.unwrap().unwrap();
    assert!(path.ends_with("out/edited.png"));

    let saved = image::open(&path).unwrap().into_rgba8();
    assert_eq!(saved.dimensions(), (40, 30));
    assert_eq!(saved.get_pixel(7, 3).0, [120, 120, 120, 255]);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_export_rejects_bad_name() {
    let dir = tempfile::tempdir().unwrap();
    let kernel = Arc::new(InstrumentedKernel::default());
    let frames = Frames::default();
    let engine = engine_with(gray(4, 4, 0), &kernel, &frames, EngineConfig::default());
    engine.ready().await.unwrap();

    let sink = Arc::new(DirectorySink::new(dir.path()));
    let err = engine.export(sink, "nested/name").await.unwrap_err();
    assert_eq!(err.category(), "validation");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_file_round_trip_through_engine() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("input.png");
    image::RgbaImage::from_pixel(64, 48, image::Rgba([10, 200, 30, 255]))
        .save(&input)
        .unwrap();

    let engine = imgcraft::open_file(&input, EngineConfig::default()).unwrap();
    engine.ready().await.unwrap();
    assert_eq!(engine.source_dimensions(), Some((64, 48)));

    let sink = Arc::new(DirectorySink::new(dir.path()).with_jpeg_quality(90));
    let path = engine.export(sink, "copy").await.unwrap().unwrap();
    assert_eq!(image::image_dimensions(&path).unwrap(), (64, 48));

    engine.release();
    let sink = Arc::new(DirectorySink::new(dir.path()));
    assert!(engine.export(sink, "late").await.unwrap().is_none());
}
