//! Hysteresis-based quality policy

use crate::sampler::{FRAME_BUDGET_MS, MAX_WINDOW, MIN_WINDOW};
use serde::{Deserialize, Serialize};
use vitro_core::QualityLevel;

/// Tuning for the sampler window and the quality ladder
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicyConfig {
    /// Samples kept for diagnostics (60..=300)
    pub window: usize,
    /// Frames slower than this are jank
    pub jank_threshold_ms: f64,
    /// Consecutive jank frames before stepping down
    pub downgrade_after: u32,
    /// Consecutive good frames before stepping up
    pub upgrade_after: u32,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            window: 120,
            jank_threshold_ms: FRAME_BUDGET_MS,
            downgrade_after: 3,
            upgrade_after: 10,
        }
    }
}

impl PolicyConfig {
    /// Clamp into usable ranges; streak lengths of 0 would flip every frame
    pub fn validated(self) -> Self {
        Self {
            window: self.window.clamp(MIN_WINDOW, MAX_WINDOW),
            jank_threshold_ms: if self.jank_threshold_ms.is_finite() && self.jank_threshold_ms > 0.0
            {
                self.jank_threshold_ms
            } else {
                FRAME_BUDGET_MS
            },
            downgrade_after: self.downgrade_after.max(1),
            upgrade_after: self.upgrade_after.max(1),
        }
    }
}

/// Classification of a single frame
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FrameClass {
    Jank,
    Good,
}

/// A quality change decided by the policy
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct QualityTransition {
    pub from: QualityLevel,
    pub to: QualityLevel,
}

/// Owns the current [`QualityLevel`].
///
/// Streak counters reset whenever the class changes and after every
/// transition, so each rung needs its own full run of frames.
#[derive(Debug)]
pub struct AdaptivePolicy {
    config: PolicyConfig,
    level: QualityLevel,
    jank_streak: u32,
    good_streak: u32,
    transitions: u64,
}

impl AdaptivePolicy {
    pub fn new(config: PolicyConfig) -> Self {
        Self {
            config: config.validated(),
            level: QualityLevel::Full,
            jank_streak: 0,
            good_streak: 0,
            transitions: 0,
        }
    }

    pub fn config(&self) -> &PolicyConfig {
        &self.config
    }

    pub fn level(&self) -> QualityLevel {
        self.level
    }

    pub fn jank_streak(&self) -> u32 {
        self.jank_streak
    }

    pub fn good_streak(&self) -> u32 {
        self.good_streak
    }

    /// Number of quality changes so far
    pub fn transitions(&self) -> u64 {
        self.transitions
    }

    /// Classify a frame by its total time and advance the streak counters
    pub fn classify(&mut self, frame_ms: f64) -> FrameClass {
        if frame_ms > self.config.jank_threshold_ms {
            self.jank_streak = self.jank_streak.saturating_add(1);
            self.good_streak = 0;
            FrameClass::Jank
        } else {
            self.good_streak = self.good_streak.saturating_add(1);
            self.jank_streak = 0;
            FrameClass::Good
        }
    }

    /// Classify a frame and apply any resulting quality change
    pub fn observe(&mut self, frame_ms: f64) -> Option<QualityTransition> {
        let target = match self.classify(frame_ms) {
            FrameClass::Jank if self.jank_streak >= self.config.downgrade_after => {
                self.level.downgrade()
            }
            FrameClass::Good if self.good_streak >= self.config.upgrade_after => {
                self.level.upgrade()
            }
            _ => return None,
        };

        // Saturated at either end: keep counting but don't report a change
        if target == self.level {
            return None;
        }

        let transition = QualityTransition {
            from: self.level,
            to: target,
        };
        self.level = target;
        self.jank_streak = 0;
        self.good_streak = 0;
        self.transitions += 1;

        tracing::info!(
            from = %transition.from,
            to = %transition.to,
            "glass quality changed"
        );
        Some(transition)
    }
}

impl Default for AdaptivePolicy {
    fn default() -> Self {
        Self::new(PolicyConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const JANK: f64 = 30.0;
    const GOOD: f64 = 8.0;

    #[test]
    fn downgrades_after_three_consecutive_jank_frames() {
        let mut policy = AdaptivePolicy::default();

        assert_eq!(policy.observe(JANK), None);
        assert_eq!(policy.observe(JANK), None);
        assert_eq!(
            policy.observe(JANK),
            Some(QualityTransition {
                from: QualityLevel::Full,
                to: QualityLevel::Reduced,
            })
        );

        // A fresh run is needed for the next rung
        policy.observe(JANK);
        policy.observe(JANK);
        assert_eq!(policy.level(), QualityLevel::Reduced);
        policy.observe(JANK);
        assert_eq!(policy.level(), QualityLevel::Disabled);
    }

    #[test]
    fn upgrades_only_after_ten_good_frames() {
        let mut policy = AdaptivePolicy::default();
        for _ in 0..3 {
            policy.observe(JANK);
        }
        assert_eq!(policy.level(), QualityLevel::Reduced);

        for _ in 0..9 {
            assert_eq!(policy.observe(GOOD), None);
        }
        assert_eq!(policy.level(), QualityLevel::Reduced);
        assert!(policy.observe(GOOD).is_some());
        assert_eq!(policy.level(), QualityLevel::Full);
    }

    #[test]
    fn alternating_frames_never_flip_quality() {
        let mut policy = AdaptivePolicy::default();
        for i in 0..500 {
            let ms = if i % 2 == 0 { JANK } else { GOOD };
            assert_eq!(policy.observe(ms), None, "frame {i} flipped quality");
        }
        assert_eq!(policy.level(), QualityLevel::Full);
        assert_eq!(policy.transitions(), 0);
    }

    #[test]
    fn two_jank_one_good_pattern_is_stable() {
        let mut policy = AdaptivePolicy::default();
        for _ in 0..100 {
            policy.observe(JANK);
            policy.observe(JANK);
            policy.observe(GOOD);
        }
        assert_eq!(policy.level(), QualityLevel::Full);
    }

    #[test]
    fn zero_streak_lengths_are_rejected() {
        let policy = AdaptivePolicy::new(PolicyConfig {
            downgrade_after: 0,
            upgrade_after: 0,
            ..Default::default()
        });
        assert_eq!(policy.config().downgrade_after, 1);
        assert_eq!(policy.config().upgrade_after, 1);
    }
}
