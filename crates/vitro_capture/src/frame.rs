//! Captured backdrop frames and their disposal ledger

use image::RgbaImage;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;
use vitro_core::{Rect, Size};

/// Counts frames created and disposed by one scheduler.
///
/// A frame records its disposal when it is dropped, so "disposed exactly
/// once" is a property of ownership and the ledger only has to observe it.
#[derive(Debug, Default)]
pub struct DisposalLedger {
    created: AtomicU64,
    disposed: AtomicU64,
}

impl DisposalLedger {
    pub fn created(&self) -> u64 {
        self.created.load(Ordering::Acquire)
    }

    pub fn disposed(&self) -> u64 {
        self.disposed.load(Ordering::Acquire)
    }

    /// Frames created but not yet dropped
    pub fn live(&self) -> u64 {
        self.created().saturating_sub(self.disposed())
    }
}

/// One snapshot of the surface behind the overlay
pub struct CapturedFrame {
    pixels: RgbaImage,
    timestamp: Instant,
    source_region: Rect,
    pixel_ratio: f32,
    sequence: u64,
    ledger: Option<Arc<DisposalLedger>>,
}

impl CapturedFrame {
    /// Untracked frame, mostly useful for tests and one-off renders
    pub fn new(pixels: RgbaImage, source_region: Rect, pixel_ratio: f32) -> Self {
        Self {
            pixels,
            timestamp: Instant::now(),
            source_region,
            pixel_ratio,
            sequence: 0,
            ledger: None,
        }
    }

    pub(crate) fn tracked(
        pixels: RgbaImage,
        source_region: Rect,
        pixel_ratio: f32,
        sequence: u64,
        ledger: Arc<DisposalLedger>,
    ) -> Self {
        ledger.created.fetch_add(1, Ordering::AcqRel);
        Self {
            pixels,
            timestamp: Instant::now(),
            source_region,
            pixel_ratio,
            sequence,
            ledger: Some(ledger),
        }
    }

    pub fn pixels(&self) -> &RgbaImage {
        &self.pixels
    }

    pub fn timestamp(&self) -> Instant {
        self.timestamp
    }

    /// Surface-local logical rect the pixels cover
    pub fn source_region(&self) -> Rect {
        self.source_region
    }

    pub fn pixel_ratio(&self) -> f32 {
        self.pixel_ratio
    }

    /// Monotonic per-scheduler capture number (0 for untracked frames)
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    /// Buffer size in device pixels
    pub fn size_px(&self) -> Size {
        Size::new(self.pixels.width() as f32, self.pixels.height() as f32)
    }

    pub fn is_empty(&self) -> bool {
        self.pixels.width() == 0 || self.pixels.height() == 0
    }

    /// RGBA texel, clamped to the buffer edge
    pub fn texel(&self, x: i64, y: i64) -> [u8; 4] {
        if self.is_empty() {
            return [0; 4];
        }
        let x = x.clamp(0, self.pixels.width() as i64 - 1) as u32;
        let y = y.clamp(0, self.pixels.height() as i64 - 1) as u32;
        self.pixels.get_pixel(x, y).0
    }
}

impl std::fmt::Debug for CapturedFrame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CapturedFrame")
            .field("sequence", &self.sequence)
            .field("size", &(self.width(), self.height()))
            .field("source_region", &self.source_region)
            .field("pixel_ratio", &self.pixel_ratio)
            .finish()
    }
}

impl Drop for CapturedFrame {
    fn drop(&mut self) {
        if let Some(ledger) = &self.ledger {
            ledger.disposed.fetch_add(1, Ordering::AcqRel);
            tracing::trace!(sequence = self.sequence, "captured frame disposed");
        }
    }
}
