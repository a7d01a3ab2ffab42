//! GPU texture as a capture surface

use crate::renderer::read_texture;
use image::imageops::{self, FilterType};
use parking_lot::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use vitro_capture::{crop_region, CaptureError, CaptureSurface};
use vitro_core::Rect;

/// Capture surface reading back an RGBA8 render target.
///
/// The texture must carry `COPY_SRC` usage and be sized
/// `bounds.size * pixel_ratio`.
pub struct TextureSurface {
    device: Arc<wgpu::Device>,
    queue: Arc<wgpu::Queue>,
    texture: RwLock<Arc<wgpu::Texture>>,
    bounds: RwLock<Rect>,
    pixel_ratio: f32,
    attached: AtomicBool,
}

impl TextureSurface {
    pub fn new(
        device: Arc<wgpu::Device>,
        queue: Arc<wgpu::Queue>,
        texture: Arc<wgpu::Texture>,
        bounds: Rect,
        pixel_ratio: f32,
    ) -> Self {
        Self {
            device,
            queue,
            texture: RwLock::new(texture),
            bounds: RwLock::new(bounds),
            pixel_ratio: if pixel_ratio > 0.0 { pixel_ratio } else { 1.0 },
            attached: AtomicBool::new(true),
        }
    }

    /// Swap the render target, e.g. after a resize
    pub fn set_texture(&self, texture: Arc<wgpu::Texture>, bounds: Rect) {
        *self.texture.write() = texture;
        *self.bounds.write() = bounds;
    }

    pub fn detach(&self) {
        self.attached.store(false, Ordering::Release);
    }
}

impl CaptureSurface for TextureSurface {
    fn bounds(&self) -> Rect {
        *self.bounds.read()
    }

    fn is_attached(&self) -> bool {
        self.attached.load(Ordering::Acquire)
    }

    fn pixel_ratio(&self) -> f32 {
        self.pixel_ratio
    }

    async fn render(
        &self,
        region: Option<Rect>,
        pixel_ratio: f32,
    ) -> vitro_capture::Result<image::RgbaImage> {
        if !self.is_attached() {
            return Err(CaptureError::Detached);
        }
        let texture = self.texture.read().clone();
        let full = read_texture(&self.device, &self.queue, &texture)
            .await
            .map_err(|e| CaptureError::Render(e.to_string()))?;

        let pixels = match region {
            Some(region) => crop_region(&full, region, self.pixel_ratio)?,
            None => full,
        };

        if (pixel_ratio - self.pixel_ratio).abs() <= f32::EPSILON || pixel_ratio <= 0.0 {
            return Ok(pixels);
        }
        let scale = pixel_ratio / self.pixel_ratio;
        let width = ((pixels.width() as f32 * scale).round() as u32).max(1);
        let height = ((pixels.height() as f32 * scale).round() as u32).max(1);
        Ok(imageops::resize(&pixels, width, height, FilterType::Triangle))
    }
}
