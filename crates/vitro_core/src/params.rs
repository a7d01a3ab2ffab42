//! Effect parameters and built-in glass presets
//!
//! Parameters are a plain value snapshot read once per paint. Visual styles
//! are nothing more than named parameter sets, so every overlay runs the same
//! program regardless of how it looks.

use crate::error::VitroError;
use crate::geometry::{Point, Size};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::str::FromStr;

/// Smallest lens size accepted; the distance field divides by its square
pub const MIN_EFFECT_SIZE: f32 = 0.05;

/// Knobs of the liquid glass program for a single paint
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EffectParameters {
    /// Lens size; larger values widen the refracting core
    pub effect_size: f32,
    /// Blur radius in device pixels applied to refracted samples (0 = sharp)
    pub blur_intensity: f32,
    /// Chromatic offset in uv units at the lens rim
    pub dispersion_strength: f32,
    /// Overall glass strength, scales distortion and the rim highlight
    pub glass_intensity: f32,
    /// Corner radius of the glass mask in logical pixels
    pub border_radius: f32,
    /// Pointer in overlay-local logical pixels; `None` centers the lens
    pub pointer: Option<Point>,
}

impl Default for EffectParameters {
    fn default() -> Self {
        GlassPreset::Regular.params()
    }
}

impl EffectParameters {
    pub fn with_effect_size(mut self, size: f32) -> Self {
        self.effect_size = size;
        self
    }

    pub fn with_blur(mut self, intensity: f32) -> Self {
        self.blur_intensity = intensity;
        self
    }

    pub fn with_dispersion(mut self, strength: f32) -> Self {
        self.dispersion_strength = strength;
        self
    }

    pub fn with_glass_intensity(mut self, intensity: f32) -> Self {
        self.glass_intensity = intensity;
        self
    }

    pub fn with_border_radius(mut self, radius: f32) -> Self {
        self.border_radius = radius;
        self
    }

    pub fn with_pointer(mut self, pointer: Point) -> Self {
        self.pointer = Some(pointer);
        self
    }

    /// Pointer position, defaulting to the center of an overlay of `size`
    pub fn pointer_or_center(&self, size: Size) -> Point {
        self.pointer
            .unwrap_or(Point::new(size.width * 0.5, size.height * 0.5))
    }

    /// Clamp every field into its valid numeric range.
    ///
    /// Non-finite values fall back to the regular preset's value.
    pub fn validated(self) -> Self {
        let fallback = GlassPreset::Regular.params();
        let finite_or = |v: f32, d: f32| if v.is_finite() { v } else { d };

        Self {
            effect_size: finite_or(self.effect_size, fallback.effect_size).max(MIN_EFFECT_SIZE),
            blur_intensity: finite_or(self.blur_intensity, 0.0).max(0.0),
            dispersion_strength: finite_or(self.dispersion_strength, 0.0).max(0.0),
            glass_intensity: finite_or(self.glass_intensity, fallback.glass_intensity).max(0.0),
            border_radius: finite_or(self.border_radius, 0.0).max(0.0),
            pointer: self
                .pointer
                .filter(|p| p.x.is_finite() && p.y.is_finite()),
        }
    }
}

/// Built-in glass style catalog
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GlassPreset {
    /// Barely-there lens for dense content
    Subtle,
    /// Default liquid glass
    Regular,
    /// Strong magnifying lens, no blur
    Lens,
    /// Heavily blurred, mostly flat
    Frosted,
    /// Exaggerated chromatic fringing
    Prism,
}

impl GlassPreset {
    /// Stable preset id for config/serialization.
    pub fn id(self) -> &'static str {
        match self {
            Self::Subtle => "subtle",
            Self::Regular => "regular",
            Self::Lens => "lens",
            Self::Frosted => "frosted",
            Self::Prism => "prism",
        }
    }

    /// Full preset list.
    pub fn all() -> &'static [GlassPreset] {
        const PRESETS: [GlassPreset; 5] = [
            GlassPreset::Subtle,
            GlassPreset::Regular,
            GlassPreset::Lens,
            GlassPreset::Frosted,
            GlassPreset::Prism,
        ];
        &PRESETS
    }

    /// Parameter set for this preset, pointer left centered.
    pub fn params(self) -> EffectParameters {
        let (effect_size, blur_intensity, dispersion_strength, glass_intensity, border_radius) =
            match self {
                Self::Subtle => (1.5, 0.5, 0.004, 0.6, 16.0),
                Self::Regular => (2.0, 1.0, 0.008, 1.0, 20.0),
                Self::Lens => (2.5, 0.0, 0.006, 1.4, 28.0),
                Self::Frosted => (2.0, 3.0, 0.002, 0.8, 20.0),
                Self::Prism => (2.0, 0.5, 0.02, 1.0, 24.0),
            };

        EffectParameters {
            effect_size,
            blur_intensity,
            dispersion_strength,
            glass_intensity,
            border_radius,
            pointer: None,
        }
    }
}

impl Display for GlassPreset {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for GlassPreset {
    type Err = VitroError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        Self::all()
            .iter()
            .copied()
            .find(|p| p.id() == wanted)
            .ok_or_else(|| VitroError::Config(format!("unknown glass preset '{s}'")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validated_clamps_out_of_range_values() {
        let params = EffectParameters::default()
            .with_effect_size(0.0)
            .with_blur(-3.0)
            .with_dispersion(f32::NAN)
            .with_border_radius(-1.0)
            .validated();

        assert_eq!(params.effect_size, MIN_EFFECT_SIZE);
        assert_eq!(params.blur_intensity, 0.0);
        assert_eq!(params.dispersion_strength, 0.0);
        assert_eq!(params.border_radius, 0.0);
    }

    #[test]
    fn non_finite_pointer_recenters() {
        let params = EffectParameters::default()
            .with_pointer(Point::new(f32::INFINITY, 3.0))
            .validated();
        assert_eq!(
            params.pointer_or_center(Size::new(300.0, 200.0)),
            Point::new(150.0, 100.0)
        );
    }

    #[test]
    fn preset_ids_parse_back() {
        for preset in GlassPreset::all() {
            assert_eq!(preset.id().parse::<GlassPreset>(), Ok(*preset));
        }
        assert!("PRISM".parse::<GlassPreset>().is_ok());
        assert!("opaque".parse::<GlassPreset>().is_err());
    }
}
