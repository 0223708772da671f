use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use craft_scale::presets::PreviewPreset;
use imgcraft::core::params::AdjustmentVector;
use imgcraft::processing::kernel::KernelError;
use imgcraft::{
    CpuKernel, DirectorySink, Engine, EngineConfig, ExportFormat, FileImageSource, PixelBuffer,
    PixelKernel, PreviewFrame,
};
use tracing_subscriber::EnvFilter;

/// Adjust photos from the command line with the interactive preview engine.
#[derive(Parser, Debug)]
#[command(name = "imgcraft", version)]
#[command(about = "🎨 Apply brightness, contrast, grain, vignette and more to an image")]
struct Cli {
    /// Long-edge cap of the interactive preview
    #[arg(long, value_enum, global = true)]
    preview_preset: Option<PreviewPreset>,

    /// JSON configuration file; flags override its values
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Render the full-resolution image with adjustments and save it
    Export {
        /// Image to edit
        input: PathBuf,

        /// Directory the result is written to (created if missing)
        output_dir: PathBuf,

        /// File name without extension; defaults to the input's name
        #[arg(long)]
        name: Option<String>,

        #[arg(long, value_enum, default_value_t = ExportFormat::Jpeg)]
        format: ExportFormat,

        #[command(flatten)]
        adjust: AdjustArgs,
    },
    /// Simulate a slider drag and report how many renders it cost
    Preview {
        /// Image to edit
        input: PathBuf,

        /// Number of slider ticks in the drag
        #[arg(long, default_value_t = 60)]
        steps: u32,

        /// Milliseconds between ticks
        #[arg(long, default_value_t = 5)]
        step_ms: u64,
    },
}

#[derive(Args, Debug)]
struct AdjustArgs {
    #[arg(long, allow_hyphen_values = true, default_value_t = 0.0, help = "-1..1")]
    brightness: f32,
    #[arg(long, allow_hyphen_values = true, default_value_t = 0.0, help = "-1..1")]
    contrast: f32,
    #[arg(long, allow_hyphen_values = true, default_value_t = 0.0, help = "-2..2 stops")]
    exposure: f32,
    #[arg(long, allow_hyphen_values = true, default_value_t = 0.0, help = "-1..1")]
    hue: f32,
    #[arg(long, allow_hyphen_values = true, default_value_t = 0.0, help = "-1..1")]
    saturation: f32,
    #[arg(long, allow_hyphen_values = true, default_value_t = 0.0, help = "-1..1")]
    highlight: f32,
    #[arg(long, allow_hyphen_values = true, default_value_t = 0.0, help = "-1..1")]
    shadows: f32,
    #[arg(long, default_value_t = 0.0, help = "0..1")]
    grain: f32,
    #[arg(long, default_value_t = 0.0, help = "0..1")]
    sharpness: f32,
    #[arg(long, default_value_t = 0.0, help = "0..1")]
    vignette: f32,
}

impl AdjustArgs {
    fn to_vector(&self) -> AdjustmentVector {
        AdjustmentVector {
            brightness: self.brightness,
            contrast: self.contrast,
            exposure: self.exposure,
            hue: self.hue,
            saturation: self.saturation,
            highlight: self.highlight,
            shadows: self.shadows,
            grain: self.grain,
            sharpness: self.sharpness,
            vignette: self.vignette,
        }
        .clamped()
    }
}

/// Wraps the CPU kernel and counts invocations.
#[derive(Default)]
struct CountingKernel {
    calls: AtomicU64,
}

impl PixelKernel for CountingKernel {
    fn process(
        &self,
        source: &PixelBuffer,
        dest: &mut PixelBuffer,
        params: &AdjustmentVector,
    ) -> Result<(), KernelError> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        CpuKernel.process(source, dest, params)
    }

    fn name(&self) -> &str {
        "counting-cpu"
    }
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .try_init();
}

fn load_config(cli: &Cli) -> Result<EngineConfig> {
    let mut config = match &cli.config {
        Some(path) => EngineConfig::from_json_file(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => EngineConfig::default(),
    };
    if let Some(preset) = cli.preview_preset {
        config.preview_max_long_edge = preset.long_edge();
    }
    config.validate()?;
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let config = load_config(&cli)?;

    match cli.command {
        Command::Export {
            input,
            output_dir,
            name,
            format,
            adjust,
        } => export(config, input, output_dir, name, format, adjust.to_vector()).await,
        Command::Preview {
            input,
            steps,
            step_ms,
        } => preview(config, input, steps, Duration::from_millis(step_ms)).await,
    }
}

async fn export(
    config: EngineConfig,
    input: PathBuf,
    output_dir: PathBuf,
    name: Option<String>,
    format: ExportFormat,
    adjustments: AdjustmentVector,
) -> Result<()> {
    let name = match name {
        Some(name) => name,
        None => input
            .file_stem()
            .map(|stem| format!("{}_edited", stem.to_string_lossy()))
            .unwrap_or_else(|| "edited".to_string()),
    };
    let sink = Arc::new(
        DirectorySink::new(output_dir)
            .with_format(format)
            .with_jpeg_quality(config.export_jpeg_quality),
    );

    let engine = Engine::builder()
        .with_source(FileImageSource::new(&input))
        .with_config(config)
        .with_parameters(adjustments)
        .build()?;
    engine.ready().await?;
    let (w, h) = engine.source_dimensions().unwrap_or_default();

    let started = Instant::now();
    let path = engine
        .export(sink, &name)
        .await?
        .context("engine was released before export finished")?;
    engine.release();

    println!(
        "Saved {}x{} image to {} in {:.0?}",
        w,
        h,
        path.display(),
        started.elapsed()
    );
    Ok(())
}

async fn preview(config: EngineConfig, input: PathBuf, steps: u32, step: Duration) -> Result<()> {
    let kernel = Arc::new(CountingKernel::default());
    let frames = Arc::new(AtomicU64::new(0));
    let seen = Arc::clone(&frames);

    let engine = Engine::builder()
        .with_source(FileImageSource::new(&input))
        .with_config(config)
        .with_shared_kernel(kernel.clone())
        .with_preview_sink(move |_frame: PreviewFrame| {
            seen.fetch_add(1, Ordering::Relaxed);
        })
        .with_error_sink(|err| eprintln!("render failed: {}", err))
        .build()?;
    engine.ready().await?;

    if let (Some((sw, sh)), Some((pw, ph))) = (engine.source_dimensions(), engine.preview_dimensions()) {
        println!("Source {}x{}, preview {}x{}", sw, sh, pw, ph);
    }

    let started = Instant::now();
    for i in 1..=steps {
        engine.set_brightness(i as f32 / steps.max(1) as f32);
        tokio::time::sleep(step).await;
    }
    engine.settle().await;

    println!(
        "{} slider ticks over {:.0?} -> {} kernel invocation(s), {} frame(s) delivered (including the initial preview)",
        steps,
        started.elapsed(),
        kernel.calls.load(Ordering::Relaxed),
        frames.load(Ordering::Relaxed)
    );
    engine.release();
    Ok(())
}
