//! Error types for program loading and GPU rendering

use thiserror::Error;
use vitro_core::VitroError;

/// Asset lookup failures
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AssetError {
    /// No loader knows this key
    #[error("Asset not found: {0}")]
    NotFound(String),

    /// The asset exists but could not be read
    #[error("Failed to read asset '{path}': {reason}")]
    Io { path: String, reason: String },
}

/// Why a program is unavailable or could not be bound
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProgramError {
    #[error(transparent)]
    Asset(#[from] AssetError),

    #[error("Shader '{key}' is not valid UTF-8")]
    Encoding { key: String },

    #[error("Shader '{key}' failed to parse: {message}")]
    Parse { key: String, message: String },

    #[error("Shader '{key}' failed validation: {message}")]
    Validation { key: String, message: String },

    /// A resource the host binds is missing or has the wrong type
    #[error("Binding {binding} must be {expected}")]
    Binding { binding: u32, expected: &'static str },

    /// Uniform block names do not match what the host writes
    #[error("Uniform layout mismatch: {0}")]
    UniformLayout(String),

    /// The frame or overlay handed to `bind` cannot be sampled
    #[error("Sample binding failed: {0}")]
    SampleBinding(String),
}

impl From<ProgramError> for VitroError {
    fn from(err: ProgramError) -> Self {
        match err {
            ProgramError::UniformLayout(reason) => VitroError::UniformLayout(reason),
            ProgramError::SampleBinding(reason) => VitroError::SampleBinding(reason),
            ProgramError::Asset(AssetError::NotFound(key)) => VitroError::ShaderLoad {
                key,
                reason: "not found".into(),
            },
            other => VitroError::ShaderLoad {
                key: other.key().unwrap_or_default().to_string(),
                reason: other.to_string(),
            },
        }
    }
}

impl ProgramError {
    fn key(&self) -> Option<&str> {
        match self {
            Self::Encoding { key } | Self::Parse { key, .. } | Self::Validation { key, .. } => {
                Some(key)
            }
            Self::Asset(AssetError::NotFound(key)) => Some(key),
            Self::Asset(AssetError::Io { path, .. }) => Some(path),
            _ => None,
        }
    }
}

/// GPU renderer errors
#[derive(Error, Debug)]
pub enum RendererError {
    /// Failed to request GPU adapter
    #[error("No suitable GPU adapter found")]
    AdapterNotFound,

    /// Failed to request GPU device
    #[error("Failed to request GPU device: {0}")]
    Device(#[from] wgpu::RequestDeviceError),

    #[error(transparent)]
    Program(#[from] ProgramError),

    /// Buffer mapping failed or the copy was cut short
    #[error("Texture readback failed: {0}")]
    Readback(String),
}

/// Result type for program operations
pub type Result<T> = std::result::Result<T, ProgramError>;
