//! End-to-end paints over an in-memory surface

use image::{Rgba, RgbaImage};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use vitro_app::{GlassPipeline, HeadlessRunConfig, HeadlessRuntime, VitroConfig};
use vitro_capture::{CaptureOutcome, ImageSurface};
use vitro_core::{QualityLevel, Rect, VitroError};
use vitro_gpu::{EmbeddedAssets, PaintPath, PassthroughReason, ProgramCache};

fn checker(width: u32, height: u32) -> RgbaImage {
    RgbaImage::from_fn(width, height, |x, y| {
        if (x / 10 + y / 10) % 2 == 0 {
            Rgba([240, 240, 240, 255])
        } else {
            Rgba([30, 30, 30, 255])
        }
    })
}

/// Timing-insensitive config so slow debug builds never degrade quality
fn relaxed_config() -> VitroConfig {
    let mut config = VitroConfig::default();
    config.adaptive.jank_threshold_ms = 10_000.0;
    config
}

async fn pipeline_over(surface: Arc<ImageSurface>) -> GlassPipeline<ImageSurface> {
    let config = relaxed_config();
    let cache = GlassPipeline::<ImageSurface>::program_cache(&config);
    let pipeline = GlassPipeline::new(surface, &config, &cache).await;
    pipeline.set_overlay_bounds(Rect::new(20.0, 20.0, 80.0, 60.0));
    pipeline
}

#[tokio::test]
async fn captured_frame_paints_through_the_effect() {
    let surface = Arc::new(ImageSurface::from_image(checker(160, 120), 1.0));
    let mut pipeline = pipeline_over(surface).await;

    assert!(pipeline.capture_once().await.is_captured());
    let report = pipeline.paint(&RgbaImage::new(80, 60));

    assert_eq!(report.path(), &PaintPath::Effect);
    assert_eq!(report.quality, QualityLevel::Full);
    assert_eq!(report.composition.clip_radius, 20.0);
    assert_eq!(report.composition.image.dimensions(), (80, 60));

    let diagnostics = pipeline.diagnostics();
    assert!(diagnostics.program_ready);
    assert_eq!(diagnostics.program_error, None);
    assert_eq!(diagnostics.capture_error, None);
    assert_eq!(diagnostics.binds, 1);
    assert_eq!(diagnostics.evaluations, 80 * 60);
    assert_eq!(diagnostics.performance.total_frames, 1);
}

#[tokio::test]
async fn paints_pass_through_until_the_first_capture() {
    let surface = Arc::new(ImageSurface::from_image(checker(160, 120), 1.0));
    let mut pipeline = pipeline_over(surface).await;

    let report = pipeline.paint(&RgbaImage::new(80, 60));
    assert_eq!(
        report.path(),
        &PaintPath::Passthrough(PassthroughReason::NoFrame)
    );
    assert_eq!(pipeline.diagnostics().binds, 0);
}

#[tokio::test]
async fn missing_shader_paints_overlay_alone() {
    let surface = Arc::new(ImageSurface::from_image(checker(160, 120), 1.0));
    let config = relaxed_config();
    let cache = ProgramCache::new(EmbeddedAssets::new());
    let mut pipeline = GlassPipeline::new(surface, &config, &cache).await;
    pipeline.set_overlay_bounds(Rect::new(20.0, 20.0, 80.0, 60.0));

    assert!(pipeline.capture_once().await.is_captured());
    for _ in 0..3 {
        let report = pipeline.paint(&RgbaImage::new(80, 60));
        assert!(matches!(
            report.path(),
            PaintPath::Passthrough(PassthroughReason::ProgramUnavailable(
                VitroError::ShaderLoad { .. }
            ))
        ));
    }

    let diagnostics = pipeline.diagnostics();
    assert!(!diagnostics.program_ready);
    assert!(matches!(
        diagnostics.program_error,
        Some(VitroError::ShaderLoad { ref reason, .. }) if reason == "not found"
    ));
    assert_eq!(diagnostics.paint_error, diagnostics.program_error);
    assert_eq!(diagnostics.binds, 0);
    assert_eq!(diagnostics.evaluations, 0);
    assert_eq!(diagnostics.passthrough_paints, 3);
}

#[tokio::test]
async fn parameter_updates_coalesce_into_one_emission_per_paint() {
    let surface = Arc::new(ImageSurface::from_image(checker(160, 120), 1.0));
    let mut pipeline = pipeline_over(surface).await;
    assert!(pipeline.capture_once().await.is_captured());

    let emissions = Arc::new(AtomicUsize::new(0));
    let seen = emissions.clone();
    pipeline.params_mut().subscribe(move |_| {
        seen.fetch_add(1, Ordering::SeqCst);
    });

    pipeline.params_mut().update(|p| p.border_radius = 4.0);
    pipeline.params_mut().update(|p| p.border_radius = 8.0);
    let report = pipeline.paint(&RgbaImage::new(80, 60));
    pipeline.paint(&RgbaImage::new(80, 60));

    assert_eq!(emissions.load(Ordering::SeqCst), 1);
    assert_eq!(report.composition.clip_radius, 8.0);
}

#[tokio::test]
async fn unmeasured_surface_never_captures() {
    let surface = Arc::new(ImageSurface::new(
        checker(10, 10),
        Rect::new(0.0, 0.0, 0.0, 0.0),
        1.0,
    ));
    let mut pipeline = pipeline_over(surface).await;

    assert!(matches!(
        pipeline.capture_once().await,
        CaptureOutcome::Skipped(_)
    ));
    let report = pipeline.paint(&RgbaImage::new(80, 60));
    assert!(!report.path().is_effect());

    let diagnostics = pipeline.diagnostics();
    assert!(matches!(
        diagnostics.capture_error,
        Some(VitroError::CaptureUnavailable(_))
    ));
    assert_eq!(diagnostics.paint_error, None);
}

#[tokio::test]
async fn disjoint_overlay_reports_an_empty_region() {
    let surface = Arc::new(ImageSurface::from_image(checker(160, 120), 1.0));
    let mut pipeline = pipeline_over(surface).await;
    pipeline.set_overlay_bounds(Rect::new(400.0, 400.0, 80.0, 60.0));

    assert!(!pipeline.capture_once().await.is_captured());
    assert_eq!(
        pipeline.diagnostics().capture_error,
        Some(VitroError::RegionEmpty)
    );
}

#[tokio::test]
async fn stop_releases_the_frame() {
    let surface = Arc::new(ImageSurface::from_image(checker(160, 120), 1.0));
    let mut pipeline = pipeline_over(surface).await;
    assert!(pipeline.capture_once().await.is_captured());

    pipeline.stop();
    let report = pipeline.paint(&RgbaImage::new(80, 60));
    assert_eq!(
        report.path(),
        &PaintPath::Passthrough(PassthroughReason::NoFrame)
    );

    let stats = pipeline.diagnostics().capture;
    assert_eq!(stats.frames_created, stats.frames_disposed);
}

#[tokio::test]
async fn headless_run_moves_the_pointer_and_disposes_frames() {
    let surface = Arc::new(ImageSurface::from_image(checker(160, 120), 1.0));
    let mut pipeline = pipeline_over(surface).await;

    let mut pointers = Vec::new();
    let report = HeadlessRuntime::run(
        &mut pipeline,
        HeadlessRunConfig {
            max_frames: 6,
            ..Default::default()
        },
        &RgbaImage::new(80, 60),
        |ctx, paint| {
            assert!(paint.path().is_effect());
            pointers.push(ctx.pointer);
        },
    )
    .await
    .unwrap();

    assert_eq!(report.frames, 6);
    assert_eq!(report.effect_paints, 6);
    assert_eq!(report.passthrough_paints, 0);
    assert!(report.last_image.is_some());
    assert!(pointers.windows(2).all(|w| w[1].x > w[0].x));

    let capture = report.diagnostics.capture;
    assert_eq!(capture.captured, 6);
    assert_eq!(capture.frames_created, 6);
    assert_eq!(capture.frames_disposed, 5);
}

#[tokio::test]
async fn headless_run_rejects_an_empty_budget() {
    let surface = Arc::new(ImageSurface::from_image(checker(160, 120), 1.0));
    let mut pipeline = pipeline_over(surface).await;
    let result = HeadlessRuntime::run(
        &mut pipeline,
        HeadlessRunConfig {
            max_frames: 0,
            ..Default::default()
        },
        &RgbaImage::new(80, 60),
        |_, _| {},
    )
    .await;
    assert!(result.is_err());
}
