//! Built-in WGSL sources

/// Asset key the built-in liquid glass program is registered under
pub const LIQUID_GLASS_KEY: &str = "shaders/liquid_glass.wgsl";

/// Liquid glass program: one overlay quad, named uniform block at
/// `@group(0) @binding(0)`, backdrop texture and sampler at bindings 1 and 2
pub const LIQUID_GLASS_SHADER: &str = include_str!("../shaders/liquid_glass.wgsl");

/// Entry points shared by the GPU path and reflection
pub const VERTEX_ENTRY: &str = "vs_main";
pub const FRAGMENT_ENTRY: &str = "fs_main";
