//! Adaptive quality ladder

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// How much of the glass program runs.
///
/// Only the adaptive policy moves between levels, one rung at a time.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QualityLevel {
    /// Nothing runs; the overlay paints over a neutral background
    Disabled = 0,
    /// Lens and highlights only, no blur or dispersion
    Reduced = 1,
    /// Everything enabled
    #[default]
    Full = 2,
}

impl QualityLevel {
    /// One rung down, saturating at `Disabled`
    pub fn downgrade(self) -> Self {
        match self {
            Self::Full => Self::Reduced,
            Self::Reduced | Self::Disabled => Self::Disabled,
        }
    }

    /// One rung up, saturating at `Full`
    pub fn upgrade(self) -> Self {
        match self {
            Self::Disabled => Self::Reduced,
            Self::Reduced | Self::Full => Self::Full,
        }
    }

    pub fn is_enabled(self) -> bool {
        self != Self::Disabled
    }

    pub fn allows_blur(self) -> bool {
        self == Self::Full
    }

    pub fn allows_dispersion(self) -> bool {
        self == Self::Full
    }

    /// Value written to the `quality` uniform
    pub fn as_uniform(self) -> f32 {
        self as u32 as f32
    }
}

impl Display for QualityLevel {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Disabled => "disabled",
            Self::Reduced => "reduced",
            Self::Full => "full",
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ladder_saturates_at_both_ends() {
        assert_eq!(QualityLevel::Full.upgrade(), QualityLevel::Full);
        assert_eq!(QualityLevel::Disabled.downgrade(), QualityLevel::Disabled);
        assert_eq!(
            QualityLevel::Full.downgrade().downgrade(),
            QualityLevel::Disabled
        );
        assert_eq!(
            QualityLevel::Disabled.upgrade().upgrade(),
            QualityLevel::Full
        );
    }

    #[test]
    fn reduced_drops_blur_and_dispersion() {
        assert!(QualityLevel::Reduced.is_enabled());
        assert!(!QualityLevel::Reduced.allows_blur());
        assert!(!QualityLevel::Reduced.allows_dispersion());
        assert!(QualityLevel::Full.allows_blur());
    }
}
