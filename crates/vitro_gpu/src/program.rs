//! Glass program loading, binding and evaluation
//!
//! A program is compiled once per asset key and memoized, failures included,
//! so a missing shader is reported once and every later paint goes straight
//! to passthrough. Binding happens immediately before each evaluation and
//! produces a [`BoundEffect`] that borrows the frame for that paint only.

use crate::assets::{AssetLoader, AssetLoaders, AssetPath};
use crate::error::{ProgramError, Result};
use crate::shading::{self, FrameSampler, TextureSampler, Zones};
use crate::uniforms::{EffectUniforms, UniformLayout};
use image::RgbaImage;
use naga::{AddressSpace, ImageClass, ImageDimension, ScalarKind, TypeInner};
use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::OnceCell;
use vitro_capture::CapturedFrame;
use vitro_core::{EffectParameters, QualityLevel, Rect, Vec2};

/// Find the resource bound at `@group(0) @binding(binding)`
fn resource_at(module: &naga::Module, binding: u32) -> Option<&TypeInner> {
    module
        .global_variables
        .iter()
        .map(|(_, var)| var)
        .find(|var| {
            var.space == AddressSpace::Handle
                && var
                    .binding
                    .as_ref()
                    .is_some_and(|b| b.group == 0 && b.binding == binding)
        })
        .map(|var| &module.types[var.ty].inner)
}

/// The backdrop must be a filterable 2D float texture with a sampler
fn check_backdrop_bindings(module: &naga::Module) -> Result<()> {
    match resource_at(module, 1) {
        Some(TypeInner::Image {
            dim: ImageDimension::D2,
            arrayed: false,
            class:
                ImageClass::Sampled {
                    kind: ScalarKind::Float,
                    multi: false,
                },
        }) => {}
        _ => {
            return Err(ProgramError::Binding {
                binding: 1,
                expected: "texture_2d<f32>",
            })
        }
    }

    match resource_at(module, 2) {
        Some(TypeInner::Sampler { comparison: false }) => Ok(()),
        _ => Err(ProgramError::Binding {
            binding: 2,
            expected: "sampler",
        }),
    }
}

/// A compiled, reflected glass program
#[derive(Debug)]
pub struct EffectProgram {
    key: String,
    source: Arc<str>,
    layout: UniformLayout,
    binds: AtomicU64,
    evaluations: AtomicU64,
}

impl EffectProgram {
    /// Parse, validate and reflect WGSL source
    pub fn compile(key: &str, source: &str) -> Result<Self> {
        let module = naga::front::wgsl::parse_str(source).map_err(|e| ProgramError::Parse {
            key: key.to_string(),
            message: e.emit_to_string(source),
        })?;

        naga::valid::Validator::new(
            naga::valid::ValidationFlags::all(),
            naga::valid::Capabilities::all(),
        )
        .validate(&module)
        .map_err(|e| ProgramError::Validation {
            key: key.to_string(),
            message: e.as_inner().to_string(),
        })?;

        let layout = UniformLayout::reflect(&module)?;
        check_backdrop_bindings(&module)?;

        Ok(Self {
            key: key.to_string(),
            source: Arc::from(source),
            layout,
            binds: AtomicU64::new(0),
            evaluations: AtomicU64::new(0),
        })
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// WGSL source, shared with the GPU path
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn layout(&self) -> &UniformLayout {
        &self.layout
    }

    /// `bind` calls so far
    pub fn binds(&self) -> u64 {
        self.binds.load(Ordering::Relaxed)
    }

    /// Pixels evaluated on the CPU so far
    pub fn evaluations(&self) -> u64 {
        self.evaluations.load(Ordering::Relaxed)
    }

    /// Set every uniform for one paint and bind `frame` as the backdrop.
    ///
    /// `overlay` is the overlay's bounds in surface-local logical pixels (see
    /// `RegionMapper::overlay_in_surface`); the frame's source region places
    /// it inside the overlay's uv space.
    pub fn bind<'a>(
        &'a self,
        params: &EffectParameters,
        frame: &'a CapturedFrame,
        overlay: Rect,
        quality: QualityLevel,
    ) -> Result<BoundEffect<'a>> {
        self.binds.fetch_add(1, Ordering::Relaxed);

        if frame.is_empty() {
            return Err(ProgramError::SampleBinding("frame has no pixels".into()));
        }
        if overlay.is_empty() {
            return Err(ProgramError::SampleBinding("overlay has no size".into()));
        }
        let region = frame.source_region();
        if region.is_empty() || overlay.intersection(&region).is_none() {
            return Err(ProgramError::SampleBinding(format!(
                "frame region {region:?} does not cover overlay {overlay:?}"
            )));
        }

        let params = params.validated();
        let ratio = frame.pixel_ratio();
        let pointer = params.pointer_or_center(overlay.size()).scale(ratio);

        let uniforms = EffectUniforms {
            resolution: [overlay.width() * ratio, overlay.height() * ratio],
            pointer: [pointer.x, pointer.y],
            frame_rect: [
                (overlay.x() - region.x()) / region.width(),
                (overlay.y() - region.y()) / region.height(),
                overlay.width() / region.width(),
                overlay.height() / region.height(),
            ],
            effect_size: params.effect_size,
            blur_intensity: params.blur_intensity,
            dispersion_strength: params.dispersion_strength,
            border_radius: params.border_radius * ratio,
            glass_intensity: params.glass_intensity,
            quality: quality.as_uniform(),
        };
        let bytes = self.layout.write(&uniforms)?;

        Ok(BoundEffect {
            program: self,
            frame,
            uniforms,
            bytes,
        })
    }
}

/// Program state for one paint: uniforms written, backdrop bound
#[derive(Debug)]
pub struct BoundEffect<'a> {
    program: &'a EffectProgram,
    frame: &'a CapturedFrame,
    uniforms: EffectUniforms,
    bytes: Vec<u8>,
}

impl<'a> BoundEffect<'a> {
    pub fn program(&self) -> &'a EffectProgram {
        self.program
    }

    pub fn frame(&self) -> &'a CapturedFrame {
        self.frame
    }

    pub fn uniforms(&self) -> &EffectUniforms {
        &self.uniforms
    }

    /// Uniform block bytes in the program's reflected layout
    pub fn uniform_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Corner radius the program masks with, in device pixels
    pub fn border_radius_px(&self) -> f32 {
        self.uniforms.border_radius
    }

    /// Output size in device pixels
    pub fn size_px(&self) -> (u32, u32) {
        let [w, h] = self.uniforms.resolution;
        ((w.round() as u32).max(1), (h.round() as u32).max(1))
    }

    /// Lens bands at an overlay uv
    pub fn zones(&self, uv: Vec2) -> Zones {
        shading::zones(
            uv,
            shading::pointer_uv(&self.uniforms),
            self.uniforms.aspect(),
            self.uniforms.effect_size,
        )
    }

    /// Shade pixel `(x, y)` of a `width`x`height` output from the bound frame
    pub fn evaluate(&self, x: u32, y: u32, width: u32, height: u32) -> vitro_core::Color {
        self.evaluate_with(&mut FrameSampler::new(self.frame), x, y, width, height)
    }

    /// Like [`evaluate`](Self::evaluate) with a caller-supplied sampler
    pub fn evaluate_with<S: TextureSampler + ?Sized>(
        &self,
        sampler: &mut S,
        x: u32,
        y: u32,
        width: u32,
        height: u32,
    ) -> vitro_core::Color {
        self.program.evaluations.fetch_add(1, Ordering::Relaxed);
        let uv = Vec2::new(
            (x as f32 + 0.5) / width.max(1) as f32,
            (y as f32 + 0.5) / height.max(1) as f32,
        );
        shading::shade(&self.uniforms, sampler, uv)
    }

    /// Shade a whole `width`x`height` output
    pub fn render(&self, width: u32, height: u32) -> RgbaImage {
        let mut sampler = FrameSampler::new(self.frame);
        RgbaImage::from_fn(width, height, |x, y| {
            image::Rgba(
                self.evaluate_with(&mut sampler, x, y, width, height)
                    .to_rgba8(),
            )
        })
    }
}

/// Memoized result of loading a program
#[derive(Clone, Debug)]
pub enum ProgramState {
    Ready(Arc<EffectProgram>),
    Unavailable(ProgramError),
}

impl ProgramState {
    pub fn program(&self) -> Option<&Arc<EffectProgram>> {
        match self {
            Self::Ready(program) => Some(program),
            Self::Unavailable(_) => None,
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready(_))
    }
}

fn compile_asset(loader: &dyn AssetLoader, key: &str) -> Result<EffectProgram> {
    let bytes = loader.load(&AssetPath::parse(key))?;
    let source = String::from_utf8(bytes).map_err(|_| ProgramError::Encoding {
        key: key.to_string(),
    })?;
    EffectProgram::compile(key, &source)
}

/// Loads each program once per asset key.
///
/// Every key owns a [`OnceCell`]: concurrent requests for the same key await
/// the one load in flight instead of compiling again.
pub struct ProgramCache {
    loader: Arc<dyn AssetLoader>,
    entries: Mutex<FxHashMap<String, Arc<OnceCell<ProgramState>>>>,
}

impl ProgramCache {
    pub fn new(loader: impl AssetLoader + 'static) -> Self {
        Self {
            loader: Arc::new(loader),
            entries: Mutex::new(FxHashMap::default()),
        }
    }

    /// Cache over the built-in shaders only
    pub fn builtin() -> Self {
        Self::new(AssetLoaders::with_builtin(None))
    }

    /// Previously loaded state, if any
    pub fn get(&self, key: &str) -> Option<ProgramState> {
        self.entries
            .lock()
            .get(key)
            .and_then(|cell| cell.get().cloned())
    }

    /// Number of keys with a finished load
    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .values()
            .filter(|cell| cell.initialized())
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Load and compile `key` once; later and concurrent calls share the
    /// memoized state.
    ///
    /// Compilation runs on the blocking pool when a tokio runtime is
    /// available.
    pub async fn load(&self, key: &str) -> ProgramState {
        let cell = self
            .entries
            .lock()
            .entry(key.to_string())
            .or_default()
            .clone();
        cell.get_or_init(|| self.compile(key)).await.clone()
    }

    async fn compile(&self, key: &str) -> ProgramState {
        let compiled = match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                let loader = self.loader.clone();
                let owned = key.to_string();
                runtime
                    .spawn_blocking(move || compile_asset(loader.as_ref(), &owned))
                    .await
                    .unwrap_or_else(|e| {
                        Err(ProgramError::Validation {
                            key: key.to_string(),
                            message: format!("compile task failed: {e}"),
                        })
                    })
            }
            Err(_) => compile_asset(self.loader.as_ref(), key),
        };

        match compiled {
            Ok(program) => {
                tracing::info!(
                    key,
                    uniform_bytes = program.layout().size(),
                    "glass program ready"
                );
                ProgramState::Ready(Arc::new(program))
            }
            Err(err) => {
                tracing::warn!(key, error = %err, "glass program unavailable, using passthrough");
                ProgramState::Unavailable(err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shaders::{LIQUID_GLASS_KEY, LIQUID_GLASS_SHADER};

    #[test]
    fn builtin_shader_compiles_and_reflects() {
        let program = EffectProgram::compile(LIQUID_GLASS_KEY, LIQUID_GLASS_SHADER).unwrap();
        let layout = program.layout();

        assert_eq!(layout.size(), 64);
        assert_eq!(layout.field("pointer").map(|f| f.offset), Some(8));
        assert_eq!(layout.field("frame_rect").map(|f| f.offset), Some(16));
        assert_eq!(layout.field("border_radius").map(|f| f.offset), Some(44));
        assert!(layout.field("_pad0").is_none());
    }

    #[test]
    fn missing_sampler_binding_is_reported() {
        let source = LIQUID_GLASS_SHADER
            .replace(
                "@group(0) @binding(2) var backdrop_sampler: sampler;",
                "@group(0) @binding(3) var backdrop_sampler: sampler;",
            );
        let err = EffectProgram::compile("moved.wgsl", &source).unwrap_err();
        assert_eq!(
            err,
            ProgramError::Binding {
                binding: 2,
                expected: "sampler"
            }
        );
    }

    #[test]
    fn parse_errors_name_the_key() {
        let err = EffectProgram::compile("broken.wgsl", "fn nope( {").unwrap_err();
        assert!(matches!(err, ProgramError::Parse { ref key, .. } if key == "broken.wgsl"));
    }
}
