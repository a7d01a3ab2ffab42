//! Named uniform block
//!
//! The host never writes uniforms by position. The compiled program's block at
//! `@group(0) @binding(0)` is reflected into a [`UniformLayout`], checked
//! against [`UNIFORM_NAMES`] at load time, and every paint writes values by
//! member name into the offsets the compiler chose.

use crate::error::{ProgramError, Result};
use naga::{AddressSpace, ScalarKind, TypeInner, VectorSize};
use smallvec::SmallVec;

/// Shape of a uniform member
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum UniformKind {
    F32,
    Vec2,
    Vec4,
}

impl UniformKind {
    pub fn components(self) -> usize {
        match self {
            Self::F32 => 1,
            Self::Vec2 => 2,
            Self::Vec4 => 4,
        }
    }

    pub fn wgsl_name(self) -> &'static str {
        match self {
            Self::F32 => "f32",
            Self::Vec2 => "vec2<f32>",
            Self::Vec4 => "vec4<f32>",
        }
    }

    fn from_type(inner: &TypeInner) -> Option<Self> {
        match *inner {
            TypeInner::Scalar(scalar) if scalar.kind == ScalarKind::Float && scalar.width == 4 => {
                Some(Self::F32)
            }
            TypeInner::Vector { size, scalar }
                if scalar.kind == ScalarKind::Float && scalar.width == 4 =>
            {
                match size {
                    VectorSize::Bi => Some(Self::Vec2),
                    VectorSize::Quad => Some(Self::Vec4),
                    VectorSize::Tri => None,
                }
            }
            _ => None,
        }
    }
}

/// Every member the host writes, with its expected shape
pub const UNIFORM_NAMES: [(&str, UniformKind); 9] = [
    ("resolution", UniformKind::Vec2),
    ("pointer", UniformKind::Vec2),
    ("frame_rect", UniformKind::Vec4),
    ("effect_size", UniformKind::F32),
    ("blur_intensity", UniformKind::F32),
    ("dispersion_strength", UniformKind::F32),
    ("border_radius", UniformKind::F32),
    ("glass_intensity", UniformKind::F32),
    ("quality", UniformKind::F32),
];

fn expected_kind(name: &str) -> Option<UniformKind> {
    UNIFORM_NAMES
        .iter()
        .find(|(n, _)| *n == name)
        .map(|(_, kind)| *kind)
}

fn is_padding(name: &str) -> bool {
    name.starts_with('_')
}

/// Host-side values for one paint, addressed by member name
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct EffectUniforms {
    /// Overlay size in device pixels
    pub resolution: [f32; 2],
    /// Pointer in overlay-local device pixels
    pub pointer: [f32; 2],
    /// Overlay uv to frame uv: offset in `[0..2]`, scale in `[2..4]`
    pub frame_rect: [f32; 4],
    pub effect_size: f32,
    pub blur_intensity: f32,
    pub dispersion_strength: f32,
    /// Device pixels
    pub border_radius: f32,
    pub glass_intensity: f32,
    pub quality: f32,
}

impl EffectUniforms {
    /// Components of the named member
    pub fn by_name(&self, name: &str) -> Option<&[f32]> {
        Some(match name {
            "resolution" => &self.resolution[..],
            "pointer" => &self.pointer[..],
            "frame_rect" => &self.frame_rect[..],
            "effect_size" => std::slice::from_ref(&self.effect_size),
            "blur_intensity" => std::slice::from_ref(&self.blur_intensity),
            "dispersion_strength" => std::slice::from_ref(&self.dispersion_strength),
            "border_radius" => std::slice::from_ref(&self.border_radius),
            "glass_intensity" => std::slice::from_ref(&self.glass_intensity),
            "quality" => std::slice::from_ref(&self.quality),
            _ => return None,
        })
    }

    pub fn aspect(&self) -> f32 {
        self.resolution[0] / self.resolution[1].max(1.0)
    }
}

/// One reflected member
#[derive(Clone, Debug, PartialEq)]
pub struct UniformField {
    pub name: String,
    /// Byte offset inside the block
    pub offset: u32,
    pub kind: UniformKind,
}

/// Reflected and validated uniform block
#[derive(Clone, Debug, PartialEq)]
pub struct UniformLayout {
    fields: SmallVec<[UniformField; 10]>,
    size: u32,
}

impl UniformLayout {
    /// Reflect the uniform struct bound at `@group(0) @binding(0)`
    pub fn reflect(module: &naga::Module) -> Result<Self> {
        let global = module
            .global_variables
            .iter()
            .map(|(_, var)| var)
            .find(|var| {
                var.space == AddressSpace::Uniform
                    && var
                        .binding
                        .as_ref()
                        .is_some_and(|b| b.group == 0 && b.binding == 0)
            })
            .ok_or(ProgramError::Binding {
                binding: 0,
                expected: "a uniform struct",
            })?;

        let TypeInner::Struct { members, span } = &module.types[global.ty].inner else {
            return Err(ProgramError::Binding {
                binding: 0,
                expected: "a uniform struct",
            });
        };

        let mut fields: SmallVec<[UniformField; 10]> = SmallVec::new();
        for member in members {
            let Some(name) = member.name.as_deref() else {
                return Err(ProgramError::UniformLayout(format!(
                    "unnamed uniform member at offset {}",
                    member.offset
                )));
            };
            if is_padding(name) {
                continue;
            }
            let kind = UniformKind::from_type(&module.types[member.ty].inner).ok_or_else(|| {
                ProgramError::UniformLayout(format!("uniform '{name}' has an unsupported type"))
            })?;
            fields.push(UniformField {
                name: name.to_string(),
                offset: member.offset,
                kind,
            });
        }

        Self::from_fields(fields, *span)
    }

    /// Build from explicit fields, enforcing the name contract
    pub fn from_fields(
        fields: impl IntoIterator<Item = UniformField>,
        size: u32,
    ) -> Result<Self> {
        let layout = Self {
            fields: fields.into_iter().collect(),
            size,
        };
        layout.validate()?;
        Ok(layout)
    }

    fn validate(&self) -> Result<()> {
        for field in &self.fields {
            let Some(kind) = expected_kind(&field.name) else {
                return Err(ProgramError::UniformLayout(format!(
                    "unknown uniform '{}'",
                    field.name
                )));
            };
            if kind != field.kind {
                return Err(ProgramError::UniformLayout(format!(
                    "uniform '{}' must be {}, found {}",
                    field.name,
                    kind.wgsl_name(),
                    field.kind.wgsl_name()
                )));
            }
            let end = field.offset as usize + field.kind.components() * 4;
            if end > self.size as usize {
                return Err(ProgramError::UniformLayout(format!(
                    "uniform '{}' ends past the block ({} > {})",
                    field.name, end, self.size
                )));
            }
        }

        for (name, _) in &UNIFORM_NAMES {
            if self.field(name).is_none() {
                return Err(ProgramError::UniformLayout(format!(
                    "missing uniform '{name}'"
                )));
            }
        }
        Ok(())
    }

    pub fn field(&self, name: &str) -> Option<&UniformField> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn fields(&self) -> &[UniformField] {
        &self.fields
    }

    /// Block size in bytes
    pub fn size(&self) -> u32 {
        self.size
    }

    /// Serialize `values` into block bytes, member by member
    pub fn write(&self, values: &EffectUniforms) -> Result<Vec<u8>> {
        let mut bytes = vec![0u8; self.size as usize];
        for field in &self.fields {
            let components = values.by_name(&field.name).ok_or_else(|| {
                ProgramError::UniformLayout(format!("no value for uniform '{}'", field.name))
            })?;
            let data: &[u8] = bytemuck::cast_slice(components);
            let start = field.offset as usize;
            bytes[start..start + data.len()].copy_from_slice(data);
        }
        Ok(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field(name: &str, offset: u32, kind: UniformKind) -> UniformField {
        UniformField {
            name: name.to_string(),
            offset,
            kind,
        }
    }

    fn complete_fields() -> Vec<UniformField> {
        vec![
            field("resolution", 0, UniformKind::Vec2),
            field("pointer", 8, UniformKind::Vec2),
            field("frame_rect", 16, UniformKind::Vec4),
            field("effect_size", 32, UniformKind::F32),
            field("blur_intensity", 36, UniformKind::F32),
            field("dispersion_strength", 40, UniformKind::F32),
            field("border_radius", 44, UniformKind::F32),
            field("glass_intensity", 48, UniformKind::F32),
            field("quality", 52, UniformKind::F32),
        ]
    }

    #[test]
    fn writes_values_at_reflected_offsets() {
        let layout = UniformLayout::from_fields(complete_fields(), 64).unwrap();
        let values = EffectUniforms {
            pointer: [150.0, 100.0],
            border_radius: 20.0,
            ..Default::default()
        };
        let bytes = layout.write(&values).unwrap();

        assert_eq!(bytes.len(), 64);
        let float_at = |offset: usize| {
            f32::from_ne_bytes(bytes[offset..offset + 4].try_into().unwrap())
        };
        assert_eq!(float_at(8), 150.0);
        assert_eq!(float_at(12), 100.0);
        assert_eq!(float_at(44), 20.0);
    }

    #[test]
    fn missing_member_is_rejected() {
        let fields = complete_fields()
            .into_iter()
            .filter(|f| f.name != "pointer");
        let err = UniformLayout::from_fields(fields, 64).unwrap_err();
        assert_eq!(
            err,
            ProgramError::UniformLayout("missing uniform 'pointer'".into())
        );
    }

    #[test]
    fn unknown_member_is_rejected() {
        let mut fields = complete_fields();
        fields.push(field("mouse", 56, UniformKind::Vec2));
        let err = UniformLayout::from_fields(fields, 64).unwrap_err();
        assert_eq!(err, ProgramError::UniformLayout("unknown uniform 'mouse'".into()));
    }

    #[test]
    fn wrong_shape_is_rejected() {
        let mut fields = complete_fields();
        fields[1] = field("pointer", 8, UniformKind::F32);
        assert!(matches!(
            UniformLayout::from_fields(fields, 64),
            Err(ProgramError::UniformLayout(_))
        ));
    }
}
