//! Capturing from GPU render targets

use image::{Rgba, RgbaImage};
use std::sync::Arc;
use vitro_capture::{CaptureConfig, CaptureOutcome, CaptureScheduler, CapturedFrame};
use vitro_core::{EffectParameters, QualityLevel, Rect};
use vitro_gpu::{EffectProgram, GpuEffectRenderer, TextureSurface, LIQUID_GLASS_KEY, LIQUID_GLASS_SHADER};

fn upload(renderer: &GpuEffectRenderer, pixels: &RgbaImage) -> Arc<wgpu::Texture> {
    let size = wgpu::Extent3d {
        width: pixels.width(),
        height: pixels.height(),
        depth_or_array_layers: 1,
    };
    let texture = renderer.device().create_texture(&wgpu::TextureDescriptor {
        label: Some("Test Surface"),
        size,
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: wgpu::TextureFormat::Rgba8Unorm,
        usage: wgpu::TextureUsages::TEXTURE_BINDING
            | wgpu::TextureUsages::COPY_DST
            | wgpu::TextureUsages::COPY_SRC,
        view_formats: &[],
    });
    renderer.queue().write_texture(
        wgpu::ImageCopyTexture {
            texture: &texture,
            mip_level: 0,
            origin: wgpu::Origin3d::ZERO,
            aspect: wgpu::TextureAspect::All,
        },
        pixels.as_raw(),
        wgpu::ImageDataLayout {
            offset: 0,
            bytes_per_row: Some(4 * pixels.width()),
            rows_per_image: Some(pixels.height()),
        },
        size,
    );
    Arc::new(texture)
}

fn quadrants(width: u32, height: u32) -> RgbaImage {
    RgbaImage::from_fn(width, height, |x, y| match (x < width / 2, y < height / 2) {
        (true, true) => Rgba([255, 0, 0, 255]),
        (false, true) => Rgba([0, 255, 0, 255]),
        (true, false) => Rgba([0, 0, 255, 255]),
        (false, false) => Rgba([255, 255, 255, 255]),
    })
}

#[tokio::test]
#[ignore = "requires a GPU adapter"]
async fn scheduler_captures_a_texture_region() {
    let renderer = GpuEffectRenderer::new().await.unwrap();
    let texture = upload(&renderer, &quadrants(64, 48));
    let surface = Arc::new(TextureSurface::new(
        renderer.device().clone(),
        renderer.queue().clone(),
        texture,
        Rect::new(0.0, 0.0, 32.0, 24.0),
        2.0,
    ));
    let scheduler = CaptureScheduler::new(surface.clone(), CaptureConfig::default());
    scheduler.set_overlay_bounds(Rect::new(16.0, 0.0, 16.0, 12.0));

    assert!(scheduler.capture_once().await.is_captured());
    let (size, corner) = scheduler
        .with_frame(|frame| (frame.pixels().dimensions(), frame.pixels().get_pixel(0, 0).0))
        .unwrap();
    assert_eq!(size, (32, 24));
    assert_eq!(corner, [0, 255, 0, 255]);

    surface.detach();
    assert!(matches!(
        scheduler.capture_once().await,
        CaptureOutcome::Skipped(_)
    ));
    assert!(scheduler.has_frame());
}

#[tokio::test]
#[ignore = "requires a GPU adapter"]
async fn rendered_glass_can_be_captured_again() {
    let renderer = GpuEffectRenderer::new().await.unwrap();
    let program = EffectProgram::compile(LIQUID_GLASS_KEY, LIQUID_GLASS_SHADER).unwrap();
    let frame = CapturedFrame::new(quadrants(80, 60), Rect::new(0.0, 0.0, 80.0, 60.0), 1.0);
    let bound = program
        .bind(
            &EffectParameters::default(),
            &frame,
            Rect::new(0.0, 0.0, 80.0, 60.0),
            QualityLevel::Full,
        )
        .unwrap();

    let output = Arc::new(renderer.render(&bound, 80, 60));
    let surface = Arc::new(TextureSurface::new(
        renderer.device().clone(),
        renderer.queue().clone(),
        output,
        Rect::new(0.0, 0.0, 80.0, 60.0),
        1.0,
    ));
    let scheduler = CaptureScheduler::new(surface, CaptureConfig::default());
    scheduler.set_overlay_bounds(Rect::new(0.0, 0.0, 80.0, 60.0));

    assert!(scheduler.capture_once().await.is_captured());
    assert_eq!(scheduler.with_frame(|f| f.pixels().dimensions()), Some((80, 60)));
    assert_eq!(renderer.pipeline_count(), 1);
}
