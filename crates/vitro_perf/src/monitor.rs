//! Sampler + policy behind one handle, plus a paint-phase stopwatch

use crate::policy::{AdaptivePolicy, PolicyConfig, QualityTransition};
use crate::sampler::PerformanceSampler;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Instant;
use vitro_core::QualityLevel;

/// Monitor shared between the paint path and diagnostics readers
pub type SharedFrameMonitor = Arc<Mutex<FrameMonitor>>;

/// Read-only diagnostics view
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PerformanceSnapshot {
    pub fps: f64,
    pub mean_frame_ms: f64,
    pub jank_count: usize,
    pub jank_percentage: f64,
    pub quality: QualityLevel,
    /// Samples currently in the window
    pub window_len: usize,
    /// Frames recorded since start
    pub total_frames: u64,
    pub transitions: u64,
}

/// Records every paint and owns the quality decision
#[derive(Debug)]
pub struct FrameMonitor {
    sampler: PerformanceSampler,
    policy: AdaptivePolicy,
}

impl FrameMonitor {
    pub fn new(config: PolicyConfig) -> Self {
        let config = config.validated();
        Self {
            sampler: PerformanceSampler::new(config.window)
                .with_jank_threshold(config.jank_threshold_ms),
            policy: AdaptivePolicy::new(config),
        }
    }

    pub fn shared(config: PolicyConfig) -> SharedFrameMonitor {
        Arc::new(Mutex::new(Self::new(config)))
    }

    /// Record one paint; returns the quality the next paint should use
    pub fn record(&mut self, build_ms: f64, raster_ms: f64) -> QualityLevel {
        self.record_with_transition(build_ms, raster_ms).0
    }

    /// Like [`record`](Self::record), also reporting a quality change
    pub fn record_with_transition(
        &mut self,
        build_ms: f64,
        raster_ms: f64,
    ) -> (QualityLevel, Option<QualityTransition>) {
        let sample = self.sampler.record(build_ms, raster_ms);
        let transition = self.policy.observe(sample.total_ms());
        (self.policy.level(), transition)
    }

    pub fn quality(&self) -> QualityLevel {
        self.policy.level()
    }

    pub fn sampler(&self) -> &PerformanceSampler {
        &self.sampler
    }

    pub fn policy(&self) -> &AdaptivePolicy {
        &self.policy
    }

    pub fn snapshot(&self) -> PerformanceSnapshot {
        PerformanceSnapshot {
            fps: self.sampler.fps(),
            mean_frame_ms: self.sampler.mean_frame_ms(),
            jank_count: self.sampler.jank_count(),
            jank_percentage: self.sampler.jank_percentage(),
            quality: self.policy.level(),
            window_len: self.sampler.len(),
            total_frames: self.sampler.total_recorded(),
            transitions: self.policy.transitions(),
        }
    }
}

impl Default for FrameMonitor {
    fn default() -> Self {
        Self::new(PolicyConfig::default())
    }
}

/// Stopwatch splitting a paint into build and raster phases
#[derive(Debug)]
pub struct FrameTimer {
    started: Instant,
    build_done: Option<Instant>,
}

impl FrameTimer {
    pub fn start() -> Self {
        Self {
            started: Instant::now(),
            build_done: None,
        }
    }

    /// End of the build phase; later calls are ignored
    pub fn mark_build(&mut self) {
        if self.build_done.is_none() {
            self.build_done = Some(Instant::now());
        }
    }

    /// Returns `(build_ms, raster_ms)`.
    ///
    /// Without a build mark the whole span counts as build time.
    pub fn finish(self) -> (f64, f64) {
        let end = Instant::now();
        let split = self.build_done.unwrap_or(end);
        let build = split.duration_since(self.started).as_secs_f64() * 1000.0;
        let raster = end.duration_since(split).as_secs_f64() * 1000.0;
        (build, raster)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hundred_fast_frames_stay_full() {
        let mut monitor = FrameMonitor::default();
        for i in 0..100 {
            let build = (i % 7) as f64;
            let raster = 10.0 - build;
            assert_eq!(monitor.record(build, raster), QualityLevel::Full);
        }

        let snapshot = monitor.snapshot();
        assert_eq!(snapshot.quality, QualityLevel::Full);
        assert_eq!(snapshot.jank_count, 0);
        assert_eq!(snapshot.total_frames, 100);
        assert_eq!(snapshot.transitions, 0);
        assert!((snapshot.fps - 100.0).abs() < 1e-6);
    }

    #[test]
    fn sustained_jank_walks_down_the_ladder() {
        let mut monitor = FrameMonitor::default();
        let mut seen = Vec::new();
        for _ in 0..6 {
            let (level, transition) = monitor.record_with_transition(12.0, 12.0);
            if transition.is_some() {
                seen.push(level);
            }
        }
        assert_eq!(seen, vec![QualityLevel::Reduced, QualityLevel::Disabled]);
        assert_eq!(monitor.snapshot().jank_percentage, 100.0);
    }

    #[test]
    fn timer_splits_phases() {
        let mut timer = FrameTimer::start();
        timer.mark_build();
        timer.mark_build();
        let (build, raster) = timer.finish();
        assert!(build >= 0.0);
        assert!(raster >= 0.0);
    }
}
