//! Vitro configuration file handling (vitro.toml)

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use vitro_capture::{clamp_interval, CaptureConfig};
use vitro_core::{EffectParameters, GlassPreset};
use vitro_gpu::LIQUID_GLASS_KEY;
use vitro_perf::PolicyConfig;

/// Overrides the capture interval in milliseconds
pub const ENV_CAPTURE_INTERVAL_MS: &str = "VITRO_CAPTURE_INTERVAL_MS";
/// Overrides the glass preset id
pub const ENV_PRESET: &str = "VITRO_PRESET";

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct VitroConfig {
    #[serde(default)]
    pub capture: CaptureSection,
    #[serde(default)]
    pub effect: EffectSection,
    #[serde(default)]
    pub adaptive: AdaptiveSection,
}

/// `[capture]`
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct CaptureSection {
    /// Clamped to 8..=33
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,
    #[serde(default = "default_true")]
    pub crop_to_region: bool,
}

fn default_interval_ms() -> u64 {
    16
}

fn default_true() -> bool {
    true
}

impl Default for CaptureSection {
    fn default() -> Self {
        Self {
            interval_ms: default_interval_ms(),
            crop_to_region: true,
        }
    }
}

/// `[effect]`: a preset plus optional per-field overrides
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct EffectSection {
    #[serde(default = "default_preset")]
    pub preset: GlassPreset,
    #[serde(default = "default_shader")]
    pub shader: String,
    /// Directory searched before the built-in shaders
    #[serde(default)]
    pub shader_dir: Option<PathBuf>,
    #[serde(default)]
    pub effect_size: Option<f32>,
    #[serde(default)]
    pub blur_intensity: Option<f32>,
    #[serde(default)]
    pub dispersion_strength: Option<f32>,
    #[serde(default)]
    pub glass_intensity: Option<f32>,
    #[serde(default)]
    pub border_radius: Option<f32>,
}

fn default_preset() -> GlassPreset {
    GlassPreset::Regular
}

fn default_shader() -> String {
    LIQUID_GLASS_KEY.to_string()
}

impl Default for EffectSection {
    fn default() -> Self {
        Self {
            preset: default_preset(),
            shader: default_shader(),
            shader_dir: None,
            effect_size: None,
            blur_intensity: None,
            dispersion_strength: None,
            glass_intensity: None,
            border_radius: None,
        }
    }
}

/// `[adaptive]`
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct AdaptiveSection {
    /// Clamped to 60..=300
    #[serde(default = "default_window")]
    pub window: usize,
    #[serde(default = "default_jank_threshold")]
    pub jank_threshold_ms: f64,
    #[serde(default = "default_downgrade_after")]
    pub downgrade_after: u32,
    #[serde(default = "default_upgrade_after")]
    pub upgrade_after: u32,
}

fn default_window() -> usize {
    PolicyConfig::default().window
}

fn default_jank_threshold() -> f64 {
    PolicyConfig::default().jank_threshold_ms
}

fn default_downgrade_after() -> u32 {
    PolicyConfig::default().downgrade_after
}

fn default_upgrade_after() -> u32 {
    PolicyConfig::default().upgrade_after
}

impl Default for AdaptiveSection {
    fn default() -> Self {
        Self {
            window: default_window(),
            jank_threshold_ms: default_jank_threshold(),
            downgrade_after: default_downgrade_after(),
            upgrade_after: default_upgrade_after(),
        }
    }
}

impl VitroConfig {
    /// Load from `path` (or defaults when `None`), then apply env overrides
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => {
                let content = fs::read_to_string(path)
                    .with_context(|| format!("Failed to read {}", path.display()))?;
                Self::from_toml_str(&content)
                    .with_context(|| format!("Failed to parse {}", path.display()))?
            }
            None => Self::default(),
        };
        config.apply_overrides(|name| std::env::var(name).ok());
        Ok(config)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Apply `VITRO_*` overrides looked up through `lookup`.
    ///
    /// Unparseable values are ignored with a warning.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(raw) = lookup(ENV_CAPTURE_INTERVAL_MS) {
            match raw.trim().parse::<u64>() {
                Ok(ms) => self.capture.interval_ms = ms,
                Err(_) => tracing::warn!(value = %raw, "ignoring {ENV_CAPTURE_INTERVAL_MS}"),
            }
        }
        if let Some(raw) = lookup(ENV_PRESET) {
            match raw.parse::<GlassPreset>() {
                Ok(preset) => self.effect.preset = preset,
                Err(e) => tracing::warn!(error = %e, "ignoring {ENV_PRESET}"),
            }
        }
    }

    /// Capture interval after clamping
    pub fn capture_interval(&self) -> Duration {
        clamp_interval(Duration::from_millis(self.capture.interval_ms))
    }

    pub fn capture_config(&self) -> CaptureConfig {
        CaptureConfig {
            interval: self.capture_interval(),
            crop_to_region: self.capture.crop_to_region,
        }
    }

    pub fn policy_config(&self) -> PolicyConfig {
        PolicyConfig {
            window: self.adaptive.window,
            jank_threshold_ms: self.adaptive.jank_threshold_ms,
            downgrade_after: self.adaptive.downgrade_after,
            upgrade_after: self.adaptive.upgrade_after,
        }
        .validated()
    }

    /// Preset parameters with the section's overrides applied
    pub fn effect_parameters(&self) -> EffectParameters {
        let e = &self.effect;
        let mut params = e.preset.params();
        if let Some(v) = e.effect_size {
            params.effect_size = v;
        }
        if let Some(v) = e.blur_intensity {
            params.blur_intensity = v;
        }
        if let Some(v) = e.dispersion_strength {
            params.dispersion_strength = v;
        }
        if let Some(v) = e.glass_intensity {
            params.glass_intensity = v;
        }
        if let Some(v) = e.border_radius {
            params.border_radius = v;
        }
        params.validated()
    }

    /// Serialize to TOML string
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize config")
    }
}
