//! CPU reference of the liquid glass fragment program
//!
//! Mirrors `shaders/liquid_glass.wgsl` one statement at a time so headless
//! renders and tests see the same pixels the GPU path draws. Every texture
//! read goes through a [`TextureSampler`], which lets tests observe sampled
//! coordinates.

use crate::uniforms::EffectUniforms;
use vitro_capture::CapturedFrame;
use vitro_core::geometry::sd_rounded_rect;
use vitro_core::{Color, CornerRadius, Point, Size, Vec2};

/// Sampled uv coordinates stay inside `(UV_EPSILON, 1 - UV_EPSILON)`
pub const UV_EPSILON: f32 = 1e-3;
/// Scales the superellipse distance so the lens core ends at 1
pub const LENS_FALLOFF: f32 = 80.0;
/// Distortion strength per unit of glass intensity
pub const DISTORTION_SCALE: f32 = 0.5;
pub const RIM_HIGHLIGHT: f32 = 0.3;
pub const SHADOW_STRENGTH: f32 = 0.15;
/// Per-channel dispersion multipliers (r, g, b)
pub const DISPERSION_WEIGHTS: [f32; 3] = [2.0, 1.0, -1.5];

/// Source of backdrop texels, addressed in frame uv space
pub trait TextureSampler {
    fn sample(&mut self, uv: Vec2) -> Color;
}

impl<F: FnMut(Vec2) -> Color> TextureSampler for F {
    fn sample(&mut self, uv: Vec2) -> Color {
        self(uv)
    }
}

/// Bilinear, clamp-to-edge sampler over a captured frame
pub struct FrameSampler<'a> {
    frame: &'a CapturedFrame,
}

impl<'a> FrameSampler<'a> {
    pub fn new(frame: &'a CapturedFrame) -> Self {
        Self { frame }
    }
}

impl TextureSampler for FrameSampler<'_> {
    fn sample(&mut self, uv: Vec2) -> Color {
        let fx = uv.x * self.frame.width() as f32 - 0.5;
        let fy = uv.y * self.frame.height() as f32 - 0.5;
        let x0 = fx.floor();
        let y0 = fy.floor();
        let (tx, ty) = (fx - x0, fy - y0);
        let (x0, y0) = (x0 as i64, y0 as i64);

        let texel = |x: i64, y: i64| Color::from_rgba8(self.frame.texel(x, y));
        let top = texel(x0, y0).mix(&texel(x0 + 1, y0), tx);
        let bottom = texel(x0, y0 + 1).mix(&texel(x0 + 1, y0 + 1), tx);
        top.mix(&bottom, ty)
    }
}

/// Lens bands at one uv
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Zones {
    /// Scaled distance from the pointer; the core ends at 1
    pub distance: f32,
    /// Core lens weight, 1 at the pointer
    pub rb1: f32,
    /// Rim highlight band
    pub rb2: f32,
    /// Soft shadow band just outside the rim
    pub rb3: f32,
}

/// Clamp into the sampling margin; non-finite coordinates land on the center
pub fn clamp_uv(uv: Vec2) -> Vec2 {
    let axis = |v: f32| {
        if v.is_finite() {
            v.clamp(UV_EPSILON, 1.0 - UV_EPSILON)
        } else {
            0.5
        }
    };
    Vec2::new(axis(uv.x), axis(uv.y))
}

pub fn smoothstep(edge0: f32, edge1: f32, x: f32) -> f32 {
    let t = ((x - edge0) / (edge1 - edge0)).clamp(0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}

fn saturate(v: f32) -> f32 {
    v.clamp(0.0, 1.0)
}

/// Superellipse distance of `m` (uv offset from the pointer)
pub fn lens_distance(m: Vec2, aspect: f32, effect_size: f32) -> f32 {
    let ax = (m.x * aspect).abs();
    let ay = m.y.abs();
    let d = (ax.powi(4) + ay.powi(4)) / (effect_size * effect_size);
    d * LENS_FALLOFF
}

pub fn zones(uv: Vec2, pointer_uv: Vec2, aspect: f32, effect_size: f32) -> Zones {
    let t = lens_distance(uv - pointer_uv, aspect, effect_size);
    Zones {
        distance: t,
        rb1: saturate((1.0 - t) * 8.0),
        rb2: saturate((0.95 - 0.95 * t) * 16.0) - saturate((0.9 - 0.95 * t) * 16.0),
        rb3: saturate((1.5 - 1.1 * t) * 2.0) - saturate((1.0 - 1.1 * t) * 2.0),
    }
}

/// Pointer position in overlay uv
pub fn pointer_uv(u: &EffectUniforms) -> Vec2 {
    Vec2::new(
        u.pointer[0] / u.resolution[0].max(1.0),
        u.pointer[1] / u.resolution[1].max(1.0),
    )
}

/// Lens-refracted uv, already clamped.
///
/// The warp saturates where the core ends, so far pointers cannot push the
/// scale factor to infinity.
pub fn lens_uv(uv: Vec2, distance: f32, glass_intensity: f32) -> Vec2 {
    let strength = glass_intensity * DISTORTION_SCALE;
    let center = Vec2::new(0.5, 0.5);
    clamp_uv((uv - center) * (1.0 - saturate(distance) * strength) + center)
}

/// Shade one overlay uv
pub fn shade<S: TextureSampler + ?Sized>(u: &EffectUniforms, sampler: &mut S, uv: Vec2) -> Color {
    let mut fetch = |uv: Vec2| {
        let overlay_uv = clamp_uv(uv);
        let frame_uv = clamp_uv(Vec2::new(
            u.frame_rect[0] + overlay_uv.x * u.frame_rect[2],
            u.frame_rect[1] + overlay_uv.y * u.frame_rect[3],
        ));
        sampler.sample(frame_uv)
    };

    let raw = fetch(uv);

    let size = Size::new(u.resolution[0], u.resolution[1]);
    let px = Point::new(uv.x * size.width, uv.y * size.height);
    if sd_rounded_rect(px, size, CornerRadius::uniform(u.border_radius)) > 0.0 {
        return raw;
    }

    let pointer = pointer_uv(u);
    let m = uv - pointer;
    let z = zones(uv, pointer, u.aspect(), u.effect_size);
    let lens = lens_uv(uv, z.distance, u.glass_intensity);

    let full = u.quality > 1.5;
    let offset = if full {
        m.normalize() * (u.dispersion_strength * smoothstep(0.2, 1.0, z.distance))
    } else {
        Vec2::ZERO
    };
    let (blur_step, taps_per_side) = if full && u.blur_intensity > 0.0 {
        let step = Vec2::new(
            u.blur_intensity / u.resolution[0].max(1.0),
            u.blur_intensity / u.resolution[1].max(1.0),
        );
        (step, 1)
    } else {
        (Vec2::ZERO, 0)
    };

    let [wr, wg, wb] = DISPERSION_WEIGHTS;
    let mut sum = [0.0f32; 3];
    let mut taps = 0.0;
    for j in -taps_per_side..=taps_per_side {
        for i in -taps_per_side..=taps_per_side {
            let k = Vec2::new(i as f32 * blur_step.x, j as f32 * blur_step.y);
            sum[0] += fetch(lens + k + offset * wr).r;
            sum[1] += fetch(lens + k + offset * wg).g;
            sum[2] += fetch(lens + k + offset * wb).b;
            taps += 1.0;
        }
    }
    let chromatic = Color::rgba(sum[0] / taps, sum[1] / taps, sum[2] / taps, raw.a);

    let mixed = raw.mix(&chromatic, z.rb1);
    let lift = z.rb2 * RIM_HIGHLIGHT * u.glass_intensity - z.rb3 * SHADOW_STRENGTH;
    Color::rgba(
        saturate(mixed.r + lift),
        saturate(mixed.g + lift),
        saturate(mixed.b + lift),
        raw.a,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn centered(width: f32, height: f32) -> EffectUniforms {
        EffectUniforms {
            resolution: [width, height],
            pointer: [width * 0.5, height * 0.5],
            frame_rect: [0.0, 0.0, 1.0, 1.0],
            effect_size: 2.0,
            blur_intensity: 1.0,
            dispersion_strength: 0.01,
            border_radius: 20.0,
            glass_intensity: 1.0,
            quality: 2.0,
        }
    }

    #[test]
    fn core_weight_peaks_at_the_pointer() {
        let z = zones(Vec2::new(0.5, 0.5), Vec2::new(0.5, 0.5), 1.5, 2.0);
        assert_eq!(z.rb1, 1.0);
        assert_eq!(z.rb2, 0.0);
        assert_eq!(z.rb3, 0.0);
    }

    #[test]
    fn bands_sit_around_the_core_edge() {
        // Place the sample where the scaled distance is just under 1
        let mx = (0.97f32 / LENS_FALLOFF).powf(0.25);
        let z = zones(Vec2::new(0.5 + mx, 0.5), Vec2::new(0.5, 0.5), 1.0, 1.0);
        assert!((z.distance - 0.97).abs() < 1e-3);
        assert!(z.rb1 < 1.0);
        assert!(z.rb2 > 0.0);
        assert!(z.rb3 > 0.0);
    }

    #[test]
    fn outside_the_mask_returns_the_raw_sample() {
        let u = centered(100.0, 100.0);
        let mut reads = 0;
        let mut sampler = |_uv: Vec2| {
            reads += 1;
            Color::rgb(0.2, 0.4, 0.6)
        };
        // Top-left corner pixel lies outside a 20px radius
        let color = shade(&u, &mut sampler, Vec2::new(0.005, 0.005));
        assert_eq!(color, Color::rgb(0.2, 0.4, 0.6));
        assert_eq!(reads, 1);
    }

    #[test]
    fn reduced_quality_skips_blur_and_dispersion() {
        let mut u = centered(100.0, 100.0);
        u.quality = 1.0;
        let mut reads = 0;
        let mut sampler = |_uv: Vec2| {
            reads += 1;
            Color::WHITE
        };
        shade(&u, &mut sampler, Vec2::new(0.5, 0.5));
        // raw + one tap per channel
        assert_eq!(reads, 4);
    }

    #[test]
    fn non_finite_uv_lands_on_the_center() {
        let uv = clamp_uv(Vec2::new(f32::NAN, f32::INFINITY));
        assert_eq!(uv, Vec2::new(0.5, 0.5));
        let uv = clamp_uv(Vec2::new(-3.0, 7.0));
        assert_eq!(uv, Vec2::new(UV_EPSILON, 1.0 - UV_EPSILON));
    }

    #[test]
    fn lens_warp_saturates_far_from_the_pointer() {
        let center = Vec2::new(0.5, 0.5);
        assert_eq!(lens_uv(center, f32::INFINITY, 0.0), center);
        assert_eq!(lens_uv(center, f32::INFINITY, 2.0), center);
        assert_eq!(
            lens_uv(Vec2::new(0.7, 0.5), 1e30, 1.0),
            lens_uv(Vec2::new(0.7, 0.5), 1.0, 1.0)
        );
    }

    #[test]
    fn uniform_backdrop_is_preserved_at_the_pointer() {
        let u = centered(64.0, 64.0);
        let mut sampler = |_uv: Vec2| Color::rgb(0.5, 0.5, 0.5);
        let color = shade(&u, &mut sampler, Vec2::new(0.5, 0.5));
        assert!((color.r - 0.5).abs() < 1e-6);
        assert!((color.b - 0.5).abs() < 1e-6);
    }
}
