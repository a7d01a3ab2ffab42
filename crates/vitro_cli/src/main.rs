//! Vitro CLI
//!
//! Renders a backdrop image through the liquid glass pipeline without a
//! window and reports what the pipeline did:
//!
//! ```text
//! vitro render --backdrop wallpaper.png --out glass.png --preset prism --frames 60
//! vitro presets
//! ```

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;
use vitro_app::{GlassPipeline, HeadlessRunConfig, HeadlessRuntime, PipelineDiagnostics, VitroConfig};
use vitro_capture::{CaptureSurface, ImageSurface};
use vitro_core::{GlassPreset, Rect};

/// Liquid glass backdrop pipeline
#[derive(Parser, Debug)]
#[command(name = "vitro")]
#[command(about = "Render backdrops through the liquid glass pipeline")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Render a backdrop through the glass overlay and write the result
    Render(RenderArgs),
    /// List built-in glass presets
    Presets,
}

#[derive(Args, Debug)]
struct RenderArgs {
    /// Backdrop image (PNG)
    #[arg(long)]
    backdrop: PathBuf,

    /// Output image for the final frame
    #[arg(long)]
    out: PathBuf,

    /// Configuration file (vitro.toml)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Preset id, overrides the config file
    #[arg(long)]
    preset: Option<GlassPreset>,

    /// Frames to run; the pointer sweeps across the overlay
    #[arg(long, default_value = "1")]
    frames: u32,

    /// Overlay bounds in logical pixels: x,y,w,h (default: centered half size)
    #[arg(long, value_parser = parse_rect)]
    overlay: Option<Rect>,

    /// Device pixels per logical pixel of the backdrop
    #[arg(long, default_value = "1.0")]
    pixel_ratio: f32,
}

fn parse_rect(raw: &str) -> std::result::Result<Rect, String> {
    let parts: Vec<f32> = raw
        .split(',')
        .map(|p| p.trim().parse::<f32>())
        .collect::<std::result::Result<_, _>>()
        .map_err(|e| format!("invalid number in '{raw}': {e}"))?;
    match parts.as_slice() {
        [x, y, w, h] if *w > 0.0 && *h > 0.0 => Ok(Rect::new(*x, *y, *w, *h)),
        [_, _, _, _] => Err("overlay width and height must be positive".into()),
        _ => Err(format!("expected x,y,w,h, got '{raw}'")),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    match Cli::parse().command {
        Command::Render(args) => render(args).await,
        Command::Presets => {
            print_presets();
            Ok(())
        }
    }
}

async fn render(args: RenderArgs) -> Result<()> {
    if args.frames == 0 {
        bail!("--frames must be at least 1");
    }
    if !(args.pixel_ratio.is_finite() && args.pixel_ratio > 0.0) {
        bail!("--pixel-ratio must be positive");
    }

    let mut config = VitroConfig::load(args.config.as_deref())?;
    if let Some(preset) = args.preset {
        config.effect.preset = preset;
    }

    let backdrop = image::open(&args.backdrop)
        .with_context(|| format!("Failed to open backdrop {}", args.backdrop.display()))?
        .to_rgba8();
    let surface = Arc::new(ImageSurface::from_image(backdrop, args.pixel_ratio));
    let bounds = surface.bounds();
    let overlay = args.overlay.unwrap_or_else(|| {
        Rect::new(
            bounds.width() * 0.25,
            bounds.height() * 0.25,
            bounds.width() * 0.5,
            bounds.height() * 0.5,
        )
    });
    tracing::info!(
        preset = %config.effect.preset,
        ?overlay,
        frames = args.frames,
        "rendering backdrop"
    );

    let cache = GlassPipeline::<ImageSurface>::program_cache(&config);
    let mut pipeline = GlassPipeline::new(surface, &config, &cache).await;
    pipeline.set_overlay_bounds(overlay);

    // Faint white wash standing in for overlay content
    let content_w = ((overlay.width() * args.pixel_ratio).round() as u32).max(1);
    let content_h = ((overlay.height() * args.pixel_ratio).round() as u32).max(1);
    let content = image::RgbaImage::from_pixel(content_w, content_h, image::Rgba([255, 255, 255, 20]));

    let report = HeadlessRuntime::run(
        &mut pipeline,
        HeadlessRunConfig {
            max_frames: args.frames,
            ..Default::default()
        },
        &content,
        |ctx, paint| {
            tracing::debug!(
                frame = ctx.frame_index,
                path = ?paint.path(),
                build_ms = paint.build_ms,
                raster_ms = paint.raster_ms,
                "frame painted"
            );
        },
    )
    .await?;
    pipeline.stop();

    let image = report
        .last_image
        .context("headless run produced no frame")?;
    save(&image, &args.out)?;

    println!(
        "rendered {} frame(s): {} effect, {} passthrough",
        report.frames, report.effect_paints, report.passthrough_paints
    );
    print_diagnostics(&report.diagnostics);
    println!("wrote {}", args.out.display());
    Ok(())
}

fn save(image: &image::RgbaImage, path: &Path) -> Result<()> {
    image
        .save(path)
        .with_context(|| format!("Failed to write {}", path.display()))
}

fn print_diagnostics(d: &PipelineDiagnostics) {
    let perf = &d.performance;
    println!("  fps            {:.1}", perf.fps);
    println!("  mean frame     {:.2} ms", perf.mean_frame_ms);
    println!(
        "  jank           {} ({:.1}%)",
        perf.jank_count, perf.jank_percentage
    );
    println!("  quality        {}", perf.quality);
    println!(
        "  program        {}",
        if d.program_ready { "ready" } else { "unavailable" }
    );
    println!(
        "  frames         {} captured, {} disposed",
        d.capture.captured, d.capture.frames_disposed
    );
    for (label, err) in [
        ("program error", &d.program_error),
        ("capture error", &d.capture_error),
        ("paint error", &d.paint_error),
    ] {
        if let Some(err) = err {
            println!("  {label:<14} {err}");
        }
    }
}

fn print_presets() {
    for preset in GlassPreset::all() {
        let p = preset.params();
        println!(
            "{:<8} size={:.2} blur={:.1} dispersion={:.3} glass={:.2} radius={:.0}",
            preset.id(),
            p.effect_size,
            p.blur_intensity,
            p.dispersion_strength,
            p.glass_intensity,
            p.border_radius
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overlay_argument_parses() {
        assert_eq!(
            parse_rect("10, 20,300,200"),
            Ok(Rect::new(10.0, 20.0, 300.0, 200.0))
        );
        assert!(parse_rect("1,2,3").is_err());
        assert!(parse_rect("0,0,0,10").is_err());
        assert!(parse_rect("a,b,c,d").is_err());
    }

    #[test]
    fn cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
