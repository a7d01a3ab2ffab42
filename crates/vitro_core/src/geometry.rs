//! Geometry and color primitives
//!
//! All boxes are axis-aligned and expressed in logical pixels unless a
//! function says otherwise. Device pixels only appear once a frame is
//! captured at the surface's pixel ratio.

use serde::{Deserialize, Serialize};

/// Slack allowed when comparing rect edges, in pixels
pub const GEOMETRY_EPSILON: f32 = 1e-3;

// ─────────────────────────────────────────────────────────────────────────────
// Core Geometry Types
// ─────────────────────────────────────────────────────────────────────────────

/// 2D point
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const ZERO: Point = Point { x: 0.0, y: 0.0 };

    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Scale both coordinates (logical → device pixels)
    pub fn scale(self, factor: f32) -> Self {
        Self::new(self.x * factor, self.y * factor)
    }
}

/// 2D size
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Size {
    pub width: f32,
    pub height: f32,
}

impl Size {
    pub const ZERO: Size = Size {
        width: 0.0,
        height: 0.0,
    };

    pub const fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    /// Area in square pixels; negative extents count as zero
    pub fn area(&self) -> f32 {
        self.width.max(0.0) * self.height.max(0.0)
    }

    /// True for unmeasured or degenerate sizes
    pub fn is_empty(&self) -> bool {
        !(self.width > 0.0 && self.height > 0.0)
    }

    /// Convert to a Rect at the origin (0, 0)
    pub const fn to_rect(self) -> Rect {
        Rect {
            origin: Point::ZERO,
            size: self,
        }
    }
}

impl From<Size> for Rect {
    /// Convert Size to Rect at origin (0, 0)
    fn from(size: Size) -> Self {
        Rect {
            origin: Point::ZERO,
            size,
        }
    }
}

/// 2D rectangle
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub origin: Point,
    pub size: Size,
}

impl Rect {
    pub const ZERO: Rect = Rect {
        origin: Point::ZERO,
        size: Size::ZERO,
    };

    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            origin: Point::new(x, y),
            size: Size::new(width, height),
        }
    }

    pub fn from_origin_size(origin: Point, size: Size) -> Self {
        Self { origin, size }
    }

    pub fn x(&self) -> f32 {
        self.origin.x
    }

    pub fn y(&self) -> f32 {
        self.origin.y
    }

    pub fn width(&self) -> f32 {
        self.size.width
    }

    pub fn height(&self) -> f32 {
        self.size.height
    }

    pub fn max_x(&self) -> f32 {
        self.origin.x + self.size.width
    }

    pub fn max_y(&self) -> f32 {
        self.origin.y + self.size.height
    }

    pub fn center(&self) -> Point {
        Point::new(
            self.origin.x + self.size.width / 2.0,
            self.origin.y + self.size.height / 2.0,
        )
    }

    pub fn area(&self) -> f32 {
        self.size.area()
    }

    pub fn is_empty(&self) -> bool {
        self.size.is_empty()
    }

    pub fn contains(&self, point: Point) -> bool {
        point.x >= self.origin.x
            && point.x <= self.max_x()
            && point.y >= self.origin.y
            && point.y <= self.max_y()
    }

    /// True when `other` lies entirely inside this rect.
    ///
    /// Edges are inclusive and tolerate [`GEOMETRY_EPSILON`] of float slack.
    pub fn contains_rect(&self, other: &Rect) -> bool {
        other.origin.x >= self.origin.x - GEOMETRY_EPSILON
            && other.origin.y >= self.origin.y - GEOMETRY_EPSILON
            && other.max_x() <= self.max_x() + GEOMETRY_EPSILON
            && other.max_y() <= self.max_y() + GEOMETRY_EPSILON
    }

    /// Get the size of this rect
    pub fn size(&self) -> Size {
        self.size
    }

    /// Offset the rect by a delta
    pub fn offset(&self, dx: f32, dy: f32) -> Self {
        Rect {
            origin: Point::new(self.origin.x + dx, self.origin.y + dy),
            size: self.size,
        }
    }

    /// Overlapping part of two rects, `None` when they only touch or miss
    pub fn intersection(&self, other: &Rect) -> Option<Rect> {
        let left = self.origin.x.max(other.origin.x);
        let top = self.origin.y.max(other.origin.y);
        let right = self.max_x().min(other.max_x());
        let bottom = self.max_y().min(other.max_y());

        if right > left && bottom > top {
            Some(Rect::new(left, top, right - left, bottom - top))
        } else {
            None
        }
    }

    /// Express this rect relative to `frame`'s origin
    pub fn relative_to(&self, frame: &Rect) -> Rect {
        self.offset(-frame.origin.x, -frame.origin.y)
    }

    /// Scale origin and size (logical → device pixels)
    pub fn scale(&self, factor: f32) -> Rect {
        Rect {
            origin: self.origin.scale(factor),
            size: Size::new(self.size.width * factor, self.size.height * factor),
        }
    }
}

/// 2D vector
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    pub const ZERO: Vec2 = Vec2 { x: 0.0, y: 0.0 };
    pub const ONE: Vec2 = Vec2 { x: 1.0, y: 1.0 };

    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn length(&self) -> f32 {
        (self.x * self.x + self.y * self.y).sqrt()
    }

    pub fn normalize(&self) -> Self {
        let len = self.length();
        if len > 0.0 {
            Self::new(self.x / len, self.y / len)
        } else {
            Self::ZERO
        }
    }

    /// Component-wise clamp
    pub fn clamp(self, min: f32, max: f32) -> Self {
        Self::new(self.x.clamp(min, max), self.y.clamp(min, max))
    }
}

impl std::ops::Add for Vec2 {
    type Output = Vec2;

    fn add(self, rhs: Vec2) -> Vec2 {
        Vec2::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl std::ops::Sub for Vec2 {
    type Output = Vec2;

    fn sub(self, rhs: Vec2) -> Vec2 {
        Vec2::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl std::ops::Mul<f32> for Vec2 {
    type Output = Vec2;

    fn mul(self, rhs: f32) -> Vec2 {
        Vec2::new(self.x * rhs, self.y * rhs)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Color and Mask Types
// ─────────────────────────────────────────────────────────────────────────────

/// RGBA color (straight alpha, 0..1)
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Color {
    pub const WHITE: Color = Color::rgb(1.0, 1.0, 1.0);
    pub const BLACK: Color = Color::rgb(0.0, 0.0, 0.0);
    pub const TRANSPARENT: Color = Color::rgba(0.0, 0.0, 0.0, 0.0);

    pub const fn rgb(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b, a: 1.0 }
    }

    pub const fn rgba(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    pub fn from_hex(hex: u32) -> Self {
        let r = ((hex >> 16) & 0xFF) as f32 / 255.0;
        let g = ((hex >> 8) & 0xFF) as f32 / 255.0;
        let b = (hex & 0xFF) as f32 / 255.0;
        Self::rgb(r, g, b)
    }

    pub fn from_rgba8(rgba: [u8; 4]) -> Self {
        Self::rgba(
            rgba[0] as f32 / 255.0,
            rgba[1] as f32 / 255.0,
            rgba[2] as f32 / 255.0,
            rgba[3] as f32 / 255.0,
        )
    }

    pub fn to_rgba8(&self) -> [u8; 4] {
        let q = |v: f32| (v.clamp(0.0, 1.0) * 255.0).round() as u8;
        [q(self.r), q(self.g), q(self.b), q(self.a)]
    }

    pub fn with_alpha(mut self, alpha: f32) -> Self {
        self.a = alpha;
        self
    }

    pub fn to_array(&self) -> [f32; 4] {
        [self.r, self.g, self.b, self.a]
    }

    /// Linear interpolation, `t = 0` yields `self`
    pub fn mix(&self, other: &Color, t: f32) -> Color {
        Color::rgba(
            self.r + (other.r - self.r) * t,
            self.g + (other.g - self.g) * t,
            self.b + (other.b - self.b) * t,
            self.a + (other.a - self.a) * t,
        )
    }

    /// Source-over blend of `src` onto `self`
    pub fn over(&self, src: &Color) -> Color {
        let a = src.a + self.a * (1.0 - src.a);
        if a <= 0.0 {
            return Color::TRANSPARENT;
        }
        let blend = |d: f32, s: f32| (s * src.a + d * self.a * (1.0 - src.a)) / a;
        Color::rgba(
            blend(self.r, src.r),
            blend(self.g, src.g),
            blend(self.b, src.b),
            a,
        )
    }
}

impl Default for Color {
    fn default() -> Self {
        Self::BLACK
    }
}

/// Corner radii for rounded rectangles
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct CornerRadius {
    pub top_left: f32,
    pub top_right: f32,
    pub bottom_right: f32,
    pub bottom_left: f32,
}

impl CornerRadius {
    pub const ZERO: CornerRadius = CornerRadius {
        top_left: 0.0,
        top_right: 0.0,
        bottom_right: 0.0,
        bottom_left: 0.0,
    };

    pub fn uniform(radius: f32) -> Self {
        Self {
            top_left: radius,
            top_right: radius,
            bottom_right: radius,
            bottom_left: radius,
        }
    }

    pub fn is_uniform(&self) -> bool {
        self.top_left == self.top_right
            && self.top_right == self.bottom_right
            && self.bottom_right == self.bottom_left
    }

    pub fn to_array(&self) -> [f32; 4] {
        [
            self.top_left,
            self.top_right,
            self.bottom_right,
            self.bottom_left,
        ]
    }
}

impl From<f32> for CornerRadius {
    fn from(radius: f32) -> Self {
        Self::uniform(radius)
    }
}

/// Signed distance from `p` to the edge of a rounded rect of `size` at the
/// origin. Negative inside.
///
/// Radii follow (top-left, top-right, bottom-right, bottom-left) with y
/// growing downward, and are clamped to half the shorter side.
pub fn sd_rounded_rect(p: Point, size: Size, radius: CornerRadius) -> f32 {
    let half = Vec2::new(size.width * 0.5, size.height * 0.5);
    let rel = Vec2::new(p.x - half.x, p.y - half.y);

    let r = match (rel.x > 0.0, rel.y < 0.0) {
        (true, true) => radius.top_right,
        (false, true) => radius.top_left,
        (true, false) => radius.bottom_right,
        (false, false) => radius.bottom_left,
    };
    let r = r.min(half.x.min(half.y)).max(0.0);

    let qx = rel.x.abs() - half.x + r;
    let qy = rel.y.abs() - half.y + r;
    let outside = Vec2::new(qx.max(0.0), qy.max(0.0)).length();
    outside + qx.max(qy).min(0.0) - r
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn intersection_of_overlapping_rects() {
        let a = Rect::new(0.0, 0.0, 100.0, 100.0);
        let b = Rect::new(50.0, 25.0, 100.0, 100.0);
        assert_eq!(a.intersection(&b), Some(Rect::new(50.0, 25.0, 50.0, 75.0)));
    }

    #[test]
    fn touching_rects_do_not_intersect() {
        let a = Rect::new(0.0, 0.0, 100.0, 100.0);
        let b = Rect::new(100.0, 0.0, 10.0, 10.0);
        assert_eq!(a.intersection(&b), None);
    }

    #[test]
    fn zero_size_is_empty() {
        assert!(Size::ZERO.is_empty());
        assert!(Size::new(10.0, 0.0).is_empty());
        assert!(!Size::new(1.0, 1.0).is_empty());
    }

    #[test]
    fn rounded_rect_distance_signs() {
        let size = Size::new(300.0, 200.0);
        let radius = CornerRadius::uniform(20.0);

        assert!(sd_rounded_rect(Point::new(150.0, 100.0), size, radius) < 0.0);
        // The very corner pixel is cut away by the radius
        assert!(sd_rounded_rect(Point::new(1.0, 1.0), size, radius) > 0.0);
        // Mid-edge is inside
        assert!(sd_rounded_rect(Point::new(150.0, 1.0), size, radius) < 0.0);
    }

    #[test]
    fn over_with_opaque_source_replaces() {
        let dst = Color::rgb(0.2, 0.4, 0.6);
        let src = Color::rgb(1.0, 0.0, 0.0);
        assert_eq!(dst.over(&src), src);
    }

    #[test]
    fn rgba8_roundtrip_is_stable() {
        let c = Color::from_rgba8([12, 200, 255, 128]);
        assert_eq!(c.to_rgba8(), [12, 200, 255, 128]);
    }
}
