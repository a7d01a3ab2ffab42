//! Pipeline error taxonomy
//!
//! Every variant is recovered locally by the stage that observes it. None of
//! them is allowed to escape the render loop; they exist so that stages can
//! log precisely and pick the right fallback.

use thiserror::Error;

/// Errors shared across the Vitro pipeline
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VitroError {
    /// The glass program could not be loaded or compiled.
    ///
    /// Recovered by rendering passthrough; logged once per asset key.
    #[error("Shader load failed for '{key}': {reason}")]
    ShaderLoad { key: String, reason: String },

    /// The capture surface is detached or has not been measured yet.
    #[error("Capture surface unavailable: {0}")]
    CaptureUnavailable(String),

    /// The overlay does not overlap the capture surface.
    #[error("Overlay does not overlap the capture surface")]
    RegionEmpty,

    /// A frame handed to `bind` was malformed.
    #[error("Sample binding failed: {0}")]
    SampleBinding(String),

    /// The compiled program's uniform block does not match the expected names.
    #[error("Uniform layout mismatch: {0}")]
    UniformLayout(String),

    /// Invalid configuration value
    #[error("Invalid configuration: {0}")]
    Config(String),
}

/// Result type for core operations
pub type Result<T> = std::result::Result<T, VitroError>;
