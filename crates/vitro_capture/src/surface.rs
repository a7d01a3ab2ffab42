//! Capturable surfaces
//!
//! A surface is whatever sits behind the glass overlay and can render itself
//! into a pixel buffer. The scheduler only ever talks to this trait, so the
//! same capture loop drives an in-memory image, a GPU texture or a platform
//! view snapshot.

use crate::error::{CaptureError, Result};
use image::{imageops, RgbaImage};
use parking_lot::RwLock;
use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;
use vitro_core::Rect;

/// Something the capture scheduler can snapshot
pub trait CaptureSurface: Send + Sync + 'static {
    /// Bounds in global logical coordinates; zero size until measured
    fn bounds(&self) -> Rect;

    /// False once the surface has been removed from the tree
    fn is_attached(&self) -> bool;

    /// Device pixels per logical pixel
    fn pixel_ratio(&self) -> f32;

    /// Render the surface into an RGBA buffer at `pixel_ratio`.
    ///
    /// `region` is surface-local and logical; `None` renders the whole
    /// surface. This is the only suspension point of a capture cycle.
    fn render(
        &self,
        region: Option<Rect>,
        pixel_ratio: f32,
    ) -> impl Future<Output = Result<RgbaImage>> + Send;
}

/// Whole device pixels covering `region`: `[x0, y0, x1, y1]`
fn device_span(region: Rect, pixel_ratio: f32) -> [f32; 4] {
    let device = region.scale(pixel_ratio);
    [
        device.x().floor().max(0.0),
        device.y().floor().max(0.0),
        device.max_x().ceil().max(0.0),
        device.max_y().ceil().max(0.0),
    ]
}

/// `region` (logical) widened outwards to whole device pixels, the area
/// [`crop_region`] actually returns
pub fn snap_to_device(region: Rect, pixel_ratio: f32) -> Rect {
    let [x0, y0, x1, y1] = device_span(region, pixel_ratio);
    Rect::new(x0, y0, x1 - x0, y1 - y0).scale(1.0 / pixel_ratio)
}

/// Crop `region` (logical, surface-local) out of a device-pixel buffer
pub fn crop_region(source: &RgbaImage, region: Rect, pixel_ratio: f32) -> Result<RgbaImage> {
    let [x0, y0, x1, y1] = device_span(region, pixel_ratio);
    let (x0, y0) = (x0 as u32, y0 as u32);
    let x1 = (x1 as u32).min(source.width());
    let y1 = (y1 as u32).min(source.height());

    if x1 <= x0 || y1 <= y0 {
        return Err(CaptureError::EmptyBuffer);
    }
    Ok(imageops::crop_imm(source, x0, y0, x1 - x0, y1 - y0).to_image())
}

/// In-memory surface backed by a device-pixel image.
///
/// Used by the headless runtime and tests. Content, bounds and attachment
/// can change while a capture is running, like a real view would.
pub struct ImageSurface {
    content: RwLock<RgbaImage>,
    bounds: RwLock<Rect>,
    pixel_ratio: f32,
    attached: AtomicBool,
    latency: Duration,
    renders: AtomicU64,
}

impl ImageSurface {
    /// Surface placed at `bounds` showing `content`.
    ///
    /// `content` is expected to be `bounds.size * pixel_ratio` device pixels.
    pub fn new(content: RgbaImage, bounds: Rect, pixel_ratio: f32) -> Self {
        Self {
            content: RwLock::new(content),
            bounds: RwLock::new(bounds),
            pixel_ratio: if pixel_ratio > 0.0 { pixel_ratio } else { 1.0 },
            attached: AtomicBool::new(true),
            latency: Duration::ZERO,
            renders: AtomicU64::new(0),
        }
    }

    /// Surface at the origin, sized from the image at `pixel_ratio`
    pub fn from_image(content: RgbaImage, pixel_ratio: f32) -> Self {
        let ratio = if pixel_ratio > 0.0 { pixel_ratio } else { 1.0 };
        let bounds = Rect::new(
            0.0,
            0.0,
            content.width() as f32 / ratio,
            content.height() as f32 / ratio,
        );
        Self::new(content, bounds, ratio)
    }

    /// Simulated render latency
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn set_content(&self, content: RgbaImage) {
        *self.content.write() = content;
    }

    pub fn set_bounds(&self, bounds: Rect) {
        *self.bounds.write() = bounds;
    }

    pub fn attach(&self) {
        self.attached.store(true, Ordering::Release);
    }

    pub fn detach(&self) {
        self.attached.store(false, Ordering::Release);
    }

    /// Completed and in-progress render calls
    pub fn render_count(&self) -> u64 {
        self.renders.load(Ordering::Acquire)
    }
}

impl CaptureSurface for ImageSurface {
    fn bounds(&self) -> Rect {
        *self.bounds.read()
    }

    fn is_attached(&self) -> bool {
        self.attached.load(Ordering::Acquire)
    }

    fn pixel_ratio(&self) -> f32 {
        self.pixel_ratio
    }

    async fn render(&self, region: Option<Rect>, pixel_ratio: f32) -> Result<RgbaImage> {
        self.renders.fetch_add(1, Ordering::AcqRel);
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        if !self.is_attached() {
            return Err(CaptureError::Detached);
        }

        let pixels = {
            let content = self.content.read();
            match region {
                Some(region) => crop_region(&content, region, self.pixel_ratio)?,
                None => content.clone(),
            }
        };

        // Stored content is at the surface's own ratio
        if (pixel_ratio - self.pixel_ratio).abs() <= f32::EPSILON || pixel_ratio <= 0.0 {
            return Ok(pixels);
        }
        let scale = pixel_ratio / self.pixel_ratio;
        let width = ((pixels.width() as f32 * scale).round() as u32).max(1);
        let height = ((pixels.height() as f32 * scale).round() as u32).max(1);
        Ok(imageops::resize(
            &pixels,
            width,
            height,
            imageops::FilterType::Triangle,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gradient(width: u32, height: u32) -> RgbaImage {
        RgbaImage::from_fn(width, height, |x, y| image::Rgba([x as u8, y as u8, 0, 255]))
    }

    #[test]
    fn crop_scales_logical_region_to_device_pixels() {
        let source = gradient(200, 100);
        let cropped = crop_region(&source, Rect::new(10.0, 5.0, 20.0, 10.0), 2.0).unwrap();
        assert_eq!(cropped.dimensions(), (40, 20));
        assert_eq!(cropped.get_pixel(0, 0).0, [20, 10, 0, 255]);
    }

    #[test]
    fn fractional_regions_snap_outwards() {
        let region = Rect::new(10.25, 10.25, 20.25, 20.25);
        assert_eq!(snap_to_device(region, 2.0), Rect::new(10.0, 10.0, 20.5, 20.5));
        assert_eq!(snap_to_device(region, 1.0), Rect::new(10.0, 10.0, 21.0, 21.0));

        let cropped = crop_region(&gradient(200, 200), region, 2.0).unwrap();
        assert_eq!(cropped.dimensions(), (41, 41));
    }

    #[test]
    fn crop_outside_buffer_is_empty() {
        let source = gradient(10, 10);
        assert!(matches!(
            crop_region(&source, Rect::new(20.0, 20.0, 5.0, 5.0), 1.0),
            Err(CaptureError::EmptyBuffer)
        ));
    }

    #[test]
    fn from_image_derives_logical_bounds() {
        let surface = ImageSurface::from_image(gradient(300, 200), 2.0);
        assert_eq!(surface.bounds(), Rect::new(0.0, 0.0, 150.0, 100.0));
    }
}
