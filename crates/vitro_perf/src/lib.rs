//! Vitro frame timing and adaptive quality
//!
//! Every paint reports how long it spent building and rasterizing. The
//! [`PerformanceSampler`] keeps a rolling window of those timings for
//! diagnostics, and the [`AdaptivePolicy`] turns runs of slow or fast frames
//! into quality changes with asymmetric hysteresis, so a single hitch never
//! flips the effect off and a single fast frame never turns it back on.

pub mod monitor;
pub mod policy;
pub mod sampler;

pub use monitor::{FrameMonitor, FrameTimer, PerformanceSnapshot, SharedFrameMonitor};
pub use policy::{AdaptivePolicy, FrameClass, PolicyConfig, QualityTransition};
pub use sampler::{PerformanceSample, PerformanceSampler, FRAME_BUDGET_MS};
