//! Vitro GPU
//!
//! The liquid glass program and everything needed to run it:
//!
//! - **Assets**: shader lookup through embedded, filesystem and chained loaders
//! - **Programs**: WGSL parsed and validated with naga, uniform block reflected
//!   by name, memoized per asset key
//! - **Shading**: CPU reference of the fragment program for headless paints
//! - **Composition**: rounded-rect clip with passthrough when the effect cannot run
//! - **Renderer**: wgpu pipeline drawing the same WGSL offscreen

pub mod assets;
pub mod composer;
pub mod error;
pub mod program;
pub mod renderer;
pub mod shaders;
pub mod shading;
pub mod surface;
pub mod uniforms;

pub use assets::{AssetLoader, AssetLoaders, AssetPath, EmbeddedAssets, FsAssetLoader};
pub use composer::{
    Backdrop, Composition, EffectComposer, PaintPath, PassthroughReason, NEUTRAL_BACKGROUND,
};
pub use error::{AssetError, ProgramError, RendererError, Result};
pub use program::{BoundEffect, EffectProgram, ProgramCache, ProgramState};
pub use renderer::{read_texture, GpuEffectRenderer};
pub use shaders::{LIQUID_GLASS_KEY, LIQUID_GLASS_SHADER};
pub use shading::{FrameSampler, TextureSampler, Zones};
pub use surface::TextureSurface;
pub use uniforms::{EffectUniforms, UniformField, UniformKind, UniformLayout};
