//! Rounded-rect composition of the glass backdrop under overlay content
//!
//! The composer never fails a paint. Whatever goes wrong upstream (no frame
//! yet, program unavailable, quality disabled, bind rejected) it paints the
//! overlay content over a neutral background inside the same clip.

use crate::program::EffectProgram;
use image::RgbaImage;
use std::sync::atomic::{AtomicU64, Ordering};
use vitro_capture::CapturedFrame;
use vitro_core::geometry::sd_rounded_rect;
use vitro_core::{Color, CornerRadius, EffectParameters, Point, QualityLevel, Rect, Size, VitroError};

/// Default passthrough background
pub const NEUTRAL_BACKGROUND: Color = Color::rgba(0.95, 0.95, 0.97, 1.0);

/// Why a paint skipped the glass program
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PassthroughReason {
    /// No backdrop frame captured yet
    NoFrame,
    /// The program failed to load
    ProgramUnavailable(VitroError),
    /// Adaptive quality turned the effect off
    QualityDisabled,
    /// `bind` rejected the frame for this paint
    BindFailed(VitroError),
}

impl PassthroughReason {
    /// The pipeline error behind this passthrough, if it was a failure
    pub fn error(&self) -> Option<&VitroError> {
        match self {
            Self::ProgramUnavailable(err) | Self::BindFailed(err) => Some(err),
            Self::NoFrame | Self::QualityDisabled => None,
        }
    }
}

/// Which path a paint took
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PaintPath {
    Effect,
    Passthrough(PassthroughReason),
}

impl PaintPath {
    pub fn is_effect(&self) -> bool {
        matches!(self, Self::Effect)
    }
}

/// Everything the effect path needs for one paint
#[derive(Clone, Copy)]
pub struct Backdrop<'a> {
    pub program: &'a EffectProgram,
    pub frame: &'a CapturedFrame,
    /// Overlay bounds in surface-local logical pixels
    pub overlay: Rect,
    pub quality: QualityLevel,
}

/// Result of one paint
#[derive(Debug)]
pub struct Composition {
    pub image: RgbaImage,
    pub path: PaintPath,
    /// Clip corner radius in device pixels
    pub clip_radius: f32,
}

/// Paints overlay content over the glass backdrop
#[derive(Debug)]
pub struct EffectComposer {
    background: Color,
    pixel_ratio: f32,
    effect_paints: AtomicU64,
    passthrough_paints: AtomicU64,
}

impl EffectComposer {
    pub fn new(pixel_ratio: f32) -> Self {
        Self {
            background: NEUTRAL_BACKGROUND,
            pixel_ratio: if pixel_ratio > 0.0 { pixel_ratio } else { 1.0 },
            effect_paints: AtomicU64::new(0),
            passthrough_paints: AtomicU64::new(0),
        }
    }

    pub fn with_background(mut self, background: Color) -> Self {
        self.background = background;
        self
    }

    pub fn background(&self) -> Color {
        self.background
    }

    pub fn pixel_ratio(&self) -> f32 {
        self.pixel_ratio
    }

    pub fn effect_paints(&self) -> u64 {
        self.effect_paints.load(Ordering::Relaxed)
    }

    pub fn passthrough_paints(&self) -> u64 {
        self.passthrough_paints.load(Ordering::Relaxed)
    }

    /// Compose `content` (overlay-sized, device pixels) over the backdrop.
    ///
    /// `backdrop` is `Err(reason)` when the caller already knows the effect
    /// cannot run this paint.
    pub fn compose(
        &self,
        content: &RgbaImage,
        params: &EffectParameters,
        backdrop: std::result::Result<Backdrop<'_>, PassthroughReason>,
    ) -> Composition {
        let (width, height) = content.dimensions();
        let fallback_radius = params.validated().border_radius * self.pixel_ratio;

        let attempt = backdrop.and_then(|b| {
            if !b.quality.is_enabled() {
                return Err(PassthroughReason::QualityDisabled);
            }
            let bound = b
                .program
                .bind(params, b.frame, b.overlay, b.quality)
                .map_err(|e| {
                    tracing::warn!(error = %e, "glass bind failed, painting passthrough");
                    PassthroughReason::BindFailed(e.into())
                })?;
            Ok((bound.render(width, height), bound.border_radius_px()))
        });

        let (backdrop, path, clip_radius) = match attempt {
            Ok((image, radius)) => {
                self.effect_paints.fetch_add(1, Ordering::Relaxed);
                (Some(image), PaintPath::Effect, radius)
            }
            Err(reason) => {
                self.passthrough_paints.fetch_add(1, Ordering::Relaxed);
                tracing::trace!(?reason, "passthrough paint");
                (None, PaintPath::Passthrough(reason), fallback_radius)
            }
        };

        let size = Size::new(width as f32, height as f32);
        let radius = CornerRadius::uniform(clip_radius);
        let image = RgbaImage::from_fn(width, height, |x, y| {
            let center = Point::new(x as f32 + 0.5, y as f32 + 0.5);
            if sd_rounded_rect(center, size, radius) > 0.0 {
                return image::Rgba([0, 0, 0, 0]);
            }
            let base = backdrop
                .as_ref()
                .map(|b| Color::from_rgba8(b.get_pixel(x, y).0))
                .unwrap_or(self.background);
            let over = Color::from_rgba8(content.get_pixel(x, y).0);
            image::Rgba(base.over(&over).to_rgba8())
        });

        Composition {
            image,
            path,
            clip_radius,
        }
    }
}

impl Default for EffectComposer {
    fn default() -> Self {
        Self::new(1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn passthrough_paints_content_over_neutral_background() {
        let composer = EffectComposer::new(1.0).with_background(Color::BLACK);
        let content = RgbaImage::from_pixel(40, 40, image::Rgba([255, 255, 255, 128]));
        let params = EffectParameters::default().with_border_radius(10.0);

        let out = composer.compose(&content, &params, Err(PassthroughReason::NoFrame));

        assert_eq!(out.path, PaintPath::Passthrough(PassthroughReason::NoFrame));
        assert_eq!(out.clip_radius, 10.0);
        assert_eq!(out.image.get_pixel(20, 20).0, [128, 128, 128, 255]);
        // Corners are clipped away
        assert_eq!(out.image.get_pixel(0, 0).0, [0, 0, 0, 0]);
        assert_eq!(composer.passthrough_paints(), 1);
        assert_eq!(composer.effect_paints(), 0);
    }

    #[test]
    fn clip_radius_scales_with_pixel_ratio() {
        let composer = EffectComposer::new(2.0);
        let content = RgbaImage::new(80, 80);
        let params = EffectParameters::default().with_border_radius(12.0);
        let reason = PassthroughReason::ProgramUnavailable(VitroError::ShaderLoad {
            key: "missing.wgsl".into(),
            reason: "not found".into(),
        });
        let out = composer.compose(&content, &params, Err(reason));
        assert_eq!(out.clip_radius, 24.0);
        assert!(matches!(
            out.path,
            PaintPath::Passthrough(ref r) if matches!(r.error(), Some(VitroError::ShaderLoad { .. }))
        ));
    }
}
