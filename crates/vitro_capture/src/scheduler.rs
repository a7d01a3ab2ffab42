//! Single-flight backdrop capture scheduling
//!
//! The scheduler owns the one live [`CapturedFrame`]. A tokio interval fires
//! every `interval`; each tick tries to start a capture, and ticks that land
//! while a capture is still rendering are dropped rather than queued.
//!
//! Frames are installed by swapping under a lock: the scheduler's handle to
//! the previous frame is dropped before the new one goes in. Consumers clone
//! the current handle for one paint, so a long paint never holds the lock and
//! the frame is disposed when the last handle goes away.

use crate::error::{CaptureError, Result};
use crate::frame::{CapturedFrame, DisposalLedger};
use crate::surface::{snap_to_device, CaptureSurface};
use parking_lot::{Mutex, RwLock};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use vitro_core::{Rect, RegionMapper};

/// Fastest capture cadence accepted (~120Hz)
pub const MIN_CAPTURE_INTERVAL: Duration = Duration::from_millis(8);
/// Slowest capture cadence accepted (~30Hz)
pub const MAX_CAPTURE_INTERVAL: Duration = Duration::from_millis(33);

/// Clamp a requested cadence into the supported range
pub fn clamp_interval(interval: Duration) -> Duration {
    interval.clamp(MIN_CAPTURE_INTERVAL, MAX_CAPTURE_INTERVAL)
}

/// Scheduler settings
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CaptureConfig {
    pub interval: Duration,
    /// Render only the part of the surface under the overlay
    pub crop_to_region: bool,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(16),
            crop_to_region: true,
        }
    }
}

/// Result of one capture attempt. Never an error: the previous frame stays
/// in place whenever a cycle produces nothing.
#[derive(Clone, Debug, PartialEq)]
pub enum CaptureOutcome {
    /// A new frame was installed
    Captured { sequence: u64 },
    /// Another capture is still rendering
    InFlight,
    /// Nothing to capture this cycle (detached, unmeasured, no overlap)
    Skipped(CaptureError),
    /// The surface failed to render
    Failed(CaptureError),
    /// Completed after `stop()`; the frame was released immediately
    Discarded,
}

impl CaptureOutcome {
    pub fn is_captured(&self) -> bool {
        matches!(self, Self::Captured { .. })
    }
}

/// Counters for diagnostics
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CaptureStats {
    pub attempts: u64,
    pub captured: u64,
    pub skipped_in_flight: u64,
    pub skipped_unavailable: u64,
    pub skipped_empty: u64,
    pub failed: u64,
    pub discarded: u64,
    pub frames_created: u64,
    pub frames_disposed: u64,
}

#[derive(Default)]
struct Counters {
    attempts: AtomicU64,
    captured: AtomicU64,
    skipped_in_flight: AtomicU64,
    skipped_unavailable: AtomicU64,
    skipped_empty: AtomicU64,
    failed: AtomicU64,
    discarded: AtomicU64,
}

fn bump(counter: &AtomicU64) {
    counter.fetch_add(1, Ordering::Relaxed);
}

/// Holds the single-flight flag for the lifetime of one capture
struct FlightGuard<'a>(&'a AtomicBool);

impl<'a> FlightGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for FlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

struct Shared<S> {
    surface: Arc<S>,
    overlay: RwLock<Rect>,
    crop_to_region: bool,
    in_flight: AtomicBool,
    /// Bumped by `stop()`; captures started under an older epoch are discarded
    epoch: AtomicU64,
    sequence: AtomicU64,
    current: Mutex<Option<Arc<CapturedFrame>>>,
    /// Why the latest cycle produced nothing; cleared by a successful capture
    last_error: Mutex<Option<CaptureError>>,
    ledger: Arc<DisposalLedger>,
    counters: Counters,
    notify: watch::Sender<u64>,
}

impl<S: CaptureSurface> Shared<S> {
    fn plan(&self) -> Result<Rect> {
        if !self.surface.is_attached() {
            return Err(CaptureError::Detached);
        }
        let bounds = self.surface.bounds();
        let overlay = *self.overlay.read();
        if bounds.is_empty() || overlay.is_empty() {
            return Err(CaptureError::Unmeasured);
        }
        RegionMapper::map(overlay, bounds).ok_or(CaptureError::RegionEmpty)
    }

    /// Run one cycle on behalf of whoever read `epoch`; a `stop()` since
    /// then discards the result
    async fn capture(&self, epoch: u64) -> CaptureOutcome {
        bump(&self.counters.attempts);

        let Some(_flight) = FlightGuard::acquire(&self.in_flight) else {
            bump(&self.counters.skipped_in_flight);
            tracing::trace!("capture tick skipped, previous capture still rendering");
            return CaptureOutcome::InFlight;
        };

        let region = match self.plan() {
            Ok(region) => region,
            Err(err) => {
                match err {
                    CaptureError::RegionEmpty => bump(&self.counters.skipped_empty),
                    _ => bump(&self.counters.skipped_unavailable),
                }
                tracing::debug!(reason = %err, "capture skipped");
                *self.last_error.lock() = Some(err.clone());
                return CaptureOutcome::Skipped(err);
            }
        };

        let pixel_ratio = self.surface.pixel_ratio();
        // The frame records what its pixels actually cover
        let whole = self.surface.bounds().size().to_rect();
        let (target, covered) = if self.crop_to_region {
            let snapped = snap_to_device(region, pixel_ratio)
                .intersection(&whole)
                .unwrap_or(region);
            (Some(region), snapped)
        } else {
            (None, whole)
        };
        let pixels = match self.surface.render(target, pixel_ratio).await {
            Ok(pixels) if pixels.width() > 0 && pixels.height() > 0 => pixels,
            Ok(_) => return self.fail(CaptureError::EmptyBuffer),
            Err(err) => return self.fail(err),
        };

        let sequence = self.sequence.fetch_add(1, Ordering::AcqRel) + 1;
        let frame =
            CapturedFrame::tracked(pixels, covered, pixel_ratio, sequence, self.ledger.clone());
        let (width, height) = (frame.width(), frame.height());

        if !self.install(frame, epoch) {
            bump(&self.counters.discarded);
            tracing::debug!(sequence, "capture finished after stop, discarded");
            return CaptureOutcome::Discarded;
        }

        bump(&self.counters.captured);
        *self.last_error.lock() = None;
        self.notify.send_replace(sequence);
        tracing::debug!(sequence, width, height, "backdrop captured");
        CaptureOutcome::Captured { sequence }
    }

    fn fail(&self, err: CaptureError) -> CaptureOutcome {
        bump(&self.counters.failed);
        tracing::warn!(error = %err, "backdrop capture failed, keeping previous frame");
        *self.last_error.lock() = Some(err.clone());
        CaptureOutcome::Failed(err)
    }

    /// Swap `frame` in if the scheduler is still live under `epoch`
    fn install(&self, frame: CapturedFrame, epoch: u64) -> bool {
        let mut current = self.current.lock();
        if self.epoch.load(Ordering::Acquire) != epoch {
            return false;
        }
        let previous = current.take();
        drop(previous);
        *current = Some(Arc::new(frame));
        true
    }
}

/// Owns the live backdrop frame of one surface
pub struct CaptureScheduler<S: CaptureSurface> {
    shared: Arc<Shared<S>>,
    config: CaptureConfig,
    timer: Mutex<Option<JoinHandle<()>>>,
}

impl<S: CaptureSurface> CaptureScheduler<S> {
    pub fn new(surface: Arc<S>, config: CaptureConfig) -> Self {
        let (notify, _) = watch::channel(0);
        Self {
            shared: Arc::new(Shared {
                surface,
                overlay: RwLock::new(Rect::ZERO),
                crop_to_region: config.crop_to_region,
                in_flight: AtomicBool::new(false),
                epoch: AtomicU64::new(0),
                sequence: AtomicU64::new(0),
                current: Mutex::new(None),
                last_error: Mutex::new(None),
                ledger: Arc::new(DisposalLedger::default()),
                counters: Counters::default(),
                notify,
            }),
            config: CaptureConfig {
                interval: clamp_interval(config.interval),
                ..config
            },
            timer: Mutex::new(None),
        }
    }

    pub fn config(&self) -> &CaptureConfig {
        &self.config
    }

    pub fn surface(&self) -> &Arc<S> {
        &self.shared.surface
    }

    /// Overlay bounds in global logical coordinates, from layout
    pub fn set_overlay_bounds(&self, overlay: Rect) {
        *self.shared.overlay.write() = overlay;
    }

    pub fn overlay_bounds(&self) -> Rect {
        *self.shared.overlay.read()
    }

    /// Region the next capture would cover, `None` when empty
    pub fn region(&self) -> Option<Rect> {
        self.shared.plan().ok()
    }

    /// Start periodic captures on the current tokio runtime.
    ///
    /// Restarts the timer if already running. `interval` is clamped to
    /// [`MIN_CAPTURE_INTERVAL`]..=[`MAX_CAPTURE_INTERVAL`].
    pub fn start(&self, interval: Duration) -> Result<()> {
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| CaptureError::NoRuntime(e.to_string()))?;
        let interval = clamp_interval(interval);

        let mut timer = self.timer.lock();
        if let Some(previous) = timer.take() {
            previous.abort();
        }

        let shared = self.shared.clone();
        let epoch = shared.epoch.load(Ordering::Acquire);
        *timer = Some(runtime.spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                if shared.epoch.load(Ordering::Acquire) != epoch {
                    break;
                }
                let shared = shared.clone();
                tokio::spawn(async move {
                    shared.capture(epoch).await;
                });
            }
        }));

        tracing::debug!(
            interval_ms = interval.as_millis() as u64,
            "capture scheduler started"
        );
        Ok(())
    }

    /// Start with the configured interval
    pub fn start_default(&self) -> Result<()> {
        self.start(self.config.interval)
    }

    /// Cancel the timer and release the current frame.
    ///
    /// Does not wait for an in-flight capture; its result is discarded when
    /// it completes.
    pub fn stop(&self) {
        if let Some(timer) = self.timer.lock().take() {
            timer.abort();
        }

        let released = {
            let mut current = self.shared.current.lock();
            self.shared.epoch.fetch_add(1, Ordering::AcqRel);
            current.take()
        };
        if let Some(frame) = released {
            tracing::debug!(sequence = frame.sequence(), "capture scheduler stopped");
        }
    }

    pub fn is_running(&self) -> bool {
        self.timer
            .lock()
            .as_ref()
            .is_some_and(|timer| !timer.is_finished())
    }

    /// Run one capture cycle now
    pub async fn capture_once(&self) -> CaptureOutcome {
        let epoch = self.shared.epoch.load(Ordering::Acquire);
        self.shared.capture(epoch).await
    }

    /// Shared handle to the current frame. Hold it for one paint only.
    pub fn current_frame(&self) -> Option<Arc<CapturedFrame>> {
        self.shared.current.lock().clone()
    }

    /// Borrow the current frame for the duration of `f`
    pub fn with_frame<R>(&self, f: impl FnOnce(&CapturedFrame) -> R) -> Option<R> {
        self.current_frame().as_deref().map(f)
    }

    pub fn has_frame(&self) -> bool {
        self.shared.current.lock().is_some()
    }

    /// Sequence number of the current frame
    pub fn current_sequence(&self) -> Option<u64> {
        self.with_frame(CapturedFrame::sequence)
    }

    /// Receives the sequence number of every installed frame
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.shared.notify.subscribe()
    }

    /// Reason the most recent cycle skipped or failed, until the next capture
    pub fn last_error(&self) -> Option<CaptureError> {
        self.shared.last_error.lock().clone()
    }

    pub fn ledger(&self) -> &Arc<DisposalLedger> {
        &self.shared.ledger
    }

    pub fn stats(&self) -> CaptureStats {
        let c = &self.shared.counters;
        CaptureStats {
            attempts: c.attempts.load(Ordering::Relaxed),
            captured: c.captured.load(Ordering::Relaxed),
            skipped_in_flight: c.skipped_in_flight.load(Ordering::Relaxed),
            skipped_unavailable: c.skipped_unavailable.load(Ordering::Relaxed),
            skipped_empty: c.skipped_empty.load(Ordering::Relaxed),
            failed: c.failed.load(Ordering::Relaxed),
            discarded: c.discarded.load(Ordering::Relaxed),
            frames_created: self.shared.ledger.created(),
            frames_disposed: self.shared.ledger.disposed(),
        }
    }
}

impl<S: CaptureSurface> Drop for CaptureScheduler<S> {
    fn drop(&mut self) {
        self.stop();
    }
}
