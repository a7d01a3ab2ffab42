//! Headless runtime for diagnostics execution.

use crate::pipeline::{GlassPipeline, PaintReport, PipelineDiagnostics};
use anyhow::{bail, Result};
use image::RgbaImage;
use vitro_capture::CaptureSurface;
use vitro_core::Point;

/// Configuration for deterministic headless frame execution.
#[derive(Debug, Clone, Copy)]
pub struct HeadlessRunConfig {
    /// Number of frames to execute.
    pub max_frames: u32,
    /// Logical milliseconds between frames.
    pub tick_ms: u64,
    /// Capture a fresh backdrop every N frames (1 = every frame).
    pub capture_every_frames: u32,
    /// Sweep the pointer across the overlay; otherwise keep it centered.
    pub moving_pointer: bool,
}

impl Default for HeadlessRunConfig {
    fn default() -> Self {
        Self {
            max_frames: 1,
            tick_ms: 16,
            capture_every_frames: 1,
            moving_pointer: true,
        }
    }
}

/// Frame context passed to headless frame callbacks.
#[derive(Debug, Clone, Copy)]
pub struct HeadlessContext {
    pub frame_index: u32,
    pub elapsed_ms: u64,
    /// Overlay-local logical pointer used for this frame
    pub pointer: Point,
}

/// Summary of a headless run
#[derive(Debug)]
pub struct HeadlessReport {
    pub frames: u32,
    pub effect_paints: u32,
    pub passthrough_paints: u32,
    /// Composition of the final frame
    pub last_image: Option<RgbaImage>,
    pub diagnostics: PipelineDiagnostics,
}

/// Pointer for `frame` of `frames`: a left-to-right sweep with a gentle
/// vertical wave, inside a `width`x`height` overlay
pub fn sweep_pointer(frame: u32, frames: u32, width: f32, height: f32) -> Point {
    let t = if frames > 1 {
        frame as f32 / (frames - 1) as f32
    } else {
        0.5
    };
    let x = width * (0.15 + 0.7 * t);
    let y = height * (0.5 + 0.2 * (t * std::f32::consts::TAU).sin());
    Point::new(x, y)
}

/// Deterministic headless runtime loop.
pub struct HeadlessRuntime;

impl HeadlessRuntime {
    /// Run a fixed frame budget, painting `content` once per frame.
    ///
    /// Captures run inline rather than on the timer so every run produces
    /// the same frames.
    pub async fn run<S, F>(
        pipeline: &mut GlassPipeline<S>,
        cfg: HeadlessRunConfig,
        content: &RgbaImage,
        mut on_frame: F,
    ) -> Result<HeadlessReport>
    where
        S: CaptureSurface,
        F: FnMut(&HeadlessContext, &PaintReport),
    {
        if cfg.max_frames == 0 {
            bail!("headless max_frames must be > 0");
        }
        if cfg.tick_ms == 0 {
            bail!("headless tick_ms must be > 0");
        }
        if cfg.capture_every_frames == 0 {
            bail!("headless capture_every_frames must be > 0");
        }
        let overlay = pipeline.scheduler().overlay_bounds();
        if overlay.is_empty() {
            bail!("headless overlay bounds must be non-empty");
        }

        let mut effect_paints = 0;
        let mut passthrough_paints = 0;
        let mut last_image = None;

        for frame in 0..cfg.max_frames {
            if frame % cfg.capture_every_frames == 0 {
                let outcome = pipeline.capture_once().await;
                tracing::debug!(frame, ?outcome, "headless capture");
            }

            let pointer = if cfg.moving_pointer {
                sweep_pointer(frame, cfg.max_frames, overlay.width(), overlay.height())
            } else {
                overlay.size().to_rect().center()
            };
            pipeline.params_mut().update(|p| p.pointer = Some(pointer));

            let report = pipeline.paint(content);
            if report.path().is_effect() {
                effect_paints += 1;
            } else {
                passthrough_paints += 1;
            }

            on_frame(
                &HeadlessContext {
                    frame_index: frame,
                    elapsed_ms: cfg.tick_ms.saturating_mul(frame as u64),
                    pointer,
                },
                &report,
            );

            if frame + 1 == cfg.max_frames {
                last_image = Some(report.composition.image);
            }
        }

        Ok(HeadlessReport {
            frames: cfg.max_frames,
            effect_paints,
            passthrough_paints,
            last_image,
            diagnostics: pipeline.diagnostics(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sweep_stays_inside_the_overlay() {
        for frame in 0..30 {
            let p = sweep_pointer(frame, 30, 300.0, 200.0);
            assert!(p.x > 0.0 && p.x < 300.0);
            assert!(p.y > 0.0 && p.y < 200.0);
        }
        let single = sweep_pointer(0, 1, 100.0, 100.0);
        assert!((single.x - 50.0).abs() < 1e-3);
        assert!((single.y - 50.0).abs() < 1e-3);
    }
}
