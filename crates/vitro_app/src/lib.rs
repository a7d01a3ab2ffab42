//! Vitro App
//!
//! Wires the liquid glass stages into a pipeline per overlay:
//!
//! - [`GlassPipeline`]: capture scheduler, glass program, composer, frame
//!   monitor and parameter store, driven one paint at a time
//! - [`VitroConfig`]: `vitro.toml` with `VITRO_*` environment overrides
//! - [`HeadlessRuntime`]: deterministic frame loop for diagnostics and CI
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use vitro_app::{GlassPipeline, HeadlessRunConfig, HeadlessRuntime, VitroConfig};
//! use vitro_capture::ImageSurface;
//! use vitro_core::Rect;
//!
//! # async fn demo() -> anyhow::Result<()> {
//! let config = VitroConfig::load(None)?;
//! let backdrop = image::RgbaImage::new(640, 480);
//! let surface = Arc::new(ImageSurface::from_image(backdrop, 1.0));
//!
//! let cache = GlassPipeline::<ImageSurface>::program_cache(&config);
//! let mut pipeline = GlassPipeline::new(surface, &config, &cache).await;
//! pipeline.set_overlay_bounds(Rect::new(40.0, 40.0, 300.0, 200.0));
//!
//! let content = image::RgbaImage::new(300, 200);
//! let cfg = HeadlessRunConfig { max_frames: 30, ..Default::default() };
//! let report = HeadlessRuntime::run(&mut pipeline, cfg, &content, |_, _| {}).await?;
//! println!("{:.1} fps", report.diagnostics.performance.fps);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod headless;
pub mod pipeline;

pub use config::{
    AdaptiveSection, CaptureSection, EffectSection, VitroConfig, ENV_CAPTURE_INTERVAL_MS,
    ENV_PRESET,
};
pub use headless::{
    sweep_pointer, HeadlessContext, HeadlessReport, HeadlessRunConfig, HeadlessRuntime,
};
pub use pipeline::{GlassPipeline, PaintReport, PipelineDiagnostics};
