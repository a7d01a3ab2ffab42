//! Rolling window of frame timings

use std::collections::VecDeque;
use std::time::Instant;

/// Frame budget at 60fps; anything slower is jank
pub const FRAME_BUDGET_MS: f64 = 16.7;

/// Smallest and largest window the sampler accepts
pub const MIN_WINDOW: usize = 60;
pub const MAX_WINDOW: usize = 300;

/// Timing of one painted frame
#[derive(Clone, Copy, Debug)]
pub struct PerformanceSample {
    /// Time spent producing the paint commands
    pub build_ms: f64,
    /// Time spent rasterizing them
    pub raster_ms: f64,
    pub timestamp: Instant,
}

impl PerformanceSample {
    pub fn total_ms(&self) -> f64 {
        self.build_ms + self.raster_ms
    }

    pub fn is_jank(&self, threshold_ms: f64) -> bool {
        self.total_ms() > threshold_ms
    }
}

/// Fixed-size ring of recent samples
#[derive(Debug)]
pub struct PerformanceSampler {
    samples: VecDeque<PerformanceSample>,
    capacity: usize,
    jank_threshold_ms: f64,
    total_recorded: u64,
}

impl PerformanceSampler {
    /// Create a sampler keeping the last `capacity` frames (clamped to 60..=300)
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.clamp(MIN_WINDOW, MAX_WINDOW);
        Self {
            samples: VecDeque::with_capacity(capacity),
            capacity,
            jank_threshold_ms: FRAME_BUDGET_MS,
            total_recorded: 0,
        }
    }

    pub fn with_jank_threshold(mut self, threshold_ms: f64) -> Self {
        self.jank_threshold_ms = threshold_ms;
        self
    }

    /// Append a sample stamped now, evicting the oldest when full
    pub fn record(&mut self, build_ms: f64, raster_ms: f64) -> PerformanceSample {
        self.record_at(build_ms, raster_ms, Instant::now())
    }

    pub fn record_at(
        &mut self,
        build_ms: f64,
        raster_ms: f64,
        timestamp: Instant,
    ) -> PerformanceSample {
        let sample = PerformanceSample {
            build_ms: build_ms.max(0.0),
            raster_ms: raster_ms.max(0.0),
            timestamp,
        };

        if self.samples.len() == self.capacity {
            self.samples.pop_front();
        }
        self.samples.push_back(sample);
        self.total_recorded += 1;
        sample
    }

    /// Rolling FPS = 1000 / mean frame time over the window.
    ///
    /// 0 until a sample with non-zero duration has been recorded.
    pub fn fps(&self) -> f64 {
        let mean = self.mean_frame_ms();
        if mean > 0.0 {
            1000.0 / mean
        } else {
            0.0
        }
    }

    pub fn mean_frame_ms(&self) -> f64 {
        if self.samples.is_empty() {
            return 0.0;
        }
        let sum: f64 = self.samples.iter().map(PerformanceSample::total_ms).sum();
        sum / self.samples.len() as f64
    }

    /// Jank frames currently in the window
    pub fn jank_count(&self) -> usize {
        self.samples
            .iter()
            .filter(|s| s.is_jank(self.jank_threshold_ms))
            .count()
    }

    /// Share of jank frames in the window, 0..=100
    pub fn jank_percentage(&self) -> f64 {
        if self.samples.is_empty() {
            return 0.0;
        }
        self.jank_count() as f64 * 100.0 / self.samples.len() as f64
    }

    pub fn jank_threshold_ms(&self) -> f64 {
        self.jank_threshold_ms
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Frames recorded since creation, including evicted ones
    pub fn total_recorded(&self) -> u64 {
        self.total_recorded
    }

    pub fn latest(&self) -> Option<&PerformanceSample> {
        self.samples.back()
    }

    pub fn iter(&self) -> impl Iterator<Item = &PerformanceSample> {
        self.samples.iter()
    }
}

impl Default for PerformanceSampler {
    fn default() -> Self {
        Self::new(120)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn window_evicts_oldest() {
        let mut sampler = PerformanceSampler::new(60);
        for i in 0..100 {
            sampler.record(i as f64, 0.0);
        }
        assert_eq!(sampler.len(), 60);
        assert_eq!(sampler.total_recorded(), 100);
        assert_eq!(sampler.iter().next().map(|s| s.build_ms), Some(40.0));
        assert_eq!(sampler.latest().map(|s| s.build_ms), Some(99.0));
    }

    #[test]
    fn capacity_is_clamped() {
        assert_eq!(PerformanceSampler::new(1).capacity(), MIN_WINDOW);
        assert_eq!(PerformanceSampler::new(10_000).capacity(), MAX_WINDOW);
    }

    #[test]
    fn fps_is_inverse_of_mean_frame_time() {
        let mut sampler = PerformanceSampler::default();
        for _ in 0..10 {
            sampler.record(6.0, 4.0);
        }
        assert!((sampler.fps() - 100.0).abs() < 1e-9);
        assert_eq!(sampler.jank_count(), 0);
    }

    #[test]
    fn jank_is_strictly_over_budget() {
        let mut sampler = PerformanceSampler::default().with_jank_threshold(16.0);
        sampler.record(10.0, 6.0);
        sampler.record(10.0, 7.0);
        assert_eq!(sampler.jank_count(), 1);
        assert!((sampler.jank_percentage() - 50.0).abs() < 1e-9);
    }

    #[test]
    fn empty_sampler_reports_zero() {
        let sampler = PerformanceSampler::default();
        assert_eq!(sampler.fps(), 0.0);
        assert_eq!(sampler.jank_percentage(), 0.0);
    }
}
