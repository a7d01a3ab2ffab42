//! Vitro Capture
//!
//! Keeps a live snapshot of the surface behind a glass overlay:
//!
//! - [`CaptureSurface`]: anything that can render itself into a pixel buffer
//! - [`CaptureScheduler`]: bounded-interval, single-flight capture loop that
//!   owns exactly one [`CapturedFrame`] at a time
//! - [`ImageSurface`]: in-memory surface for headless rendering and tests
//!
//! Capturing is the only suspension point in the pipeline. Every failure is
//! logged and leaves the previous frame in place.

pub mod error;
pub mod frame;
pub mod scheduler;
pub mod surface;

pub use error::{CaptureError, Result};
pub use frame::{CapturedFrame, DisposalLedger};
pub use scheduler::{
    clamp_interval, CaptureConfig, CaptureOutcome, CaptureScheduler, CaptureStats,
    MAX_CAPTURE_INTERVAL, MIN_CAPTURE_INTERVAL,
};
pub use surface::{crop_region, snap_to_device, CaptureSurface, ImageSurface};
