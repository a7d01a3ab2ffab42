//! Overlay → capture-surface region mapping
//!
//! Layout hands us two boxes in global coordinates once per layout pass: the
//! glass overlay and the surface whose pixels sit behind it. The capture step
//! only ever needs the part of the surface the overlay actually covers,
//! expressed relative to the surface's own origin.

use crate::geometry::Rect;

/// Pure mapping from overlay bounds into capture-surface-local space
pub struct RegionMapper;

impl RegionMapper {
    /// Map `overlay` into `surface`-local coordinates.
    ///
    /// Returns `None` (an empty region) when either box has zero area, which
    /// is the normal state before the first layout, or when the boxes do not
    /// overlap. A returned region always lies inside
    /// `Rect::new(0, 0, surface.width, surface.height)`.
    pub fn map(overlay: Rect, surface: Rect) -> Option<Rect> {
        if overlay.is_empty() || surface.is_empty() {
            return None;
        }

        let overlap = overlay.intersection(&surface)?;
        let local = overlap.relative_to(&surface);

        // Subtraction above can leave a ULP of slack at the far edges
        let bounds = surface.size.to_rect();
        let x = local.x().clamp(0.0, bounds.width());
        let y = local.y().clamp(0.0, bounds.height());
        let width = local.width().min(bounds.width() - x);
        let height = local.height().min(bounds.height() - y);

        let region = Rect::new(x, y, width, height);
        if region.is_empty() {
            None
        } else {
            Some(region)
        }
    }

    /// Overlay bounds relative to the surface, without clipping.
    ///
    /// The effect program uses this to place the captured region inside the
    /// overlay's own uv space when the overlay hangs off the surface edge.
    pub fn overlay_in_surface(overlay: Rect, surface: Rect) -> Rect {
        overlay.relative_to(&surface)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overlay_fully_inside_surface() {
        let overlay = Rect::new(110.0, 220.0, 300.0, 200.0);
        let surface = Rect::new(100.0, 200.0, 800.0, 600.0);
        assert_eq!(
            RegionMapper::map(overlay, surface),
            Some(Rect::new(10.0, 20.0, 300.0, 200.0))
        );
    }

    #[test]
    fn overlay_hanging_off_the_left_edge_is_clipped() {
        let overlay = Rect::new(-50.0, 10.0, 100.0, 40.0);
        let surface = Rect::new(0.0, 0.0, 400.0, 400.0);
        assert_eq!(
            RegionMapper::map(overlay, surface),
            Some(Rect::new(0.0, 10.0, 50.0, 40.0))
        );
    }

    #[test]
    fn unmeasured_boxes_map_to_empty() {
        let measured = Rect::new(0.0, 0.0, 400.0, 400.0);
        assert_eq!(RegionMapper::map(Rect::ZERO, measured), None);
        assert_eq!(RegionMapper::map(measured, Rect::ZERO), None);
        assert_eq!(
            RegionMapper::map(Rect::new(10.0, 10.0, 0.0, 50.0), measured),
            None
        );
    }

    #[test]
    fn disjoint_boxes_map_to_empty() {
        let overlay = Rect::new(500.0, 500.0, 10.0, 10.0);
        let surface = Rect::new(0.0, 0.0, 400.0, 400.0);
        assert_eq!(RegionMapper::map(overlay, surface), None);
    }

    #[test]
    fn mapped_region_is_always_contained() {
        let surface = Rect::new(13.7, -4.2, 321.3, 97.9);
        let bounds = surface.size.to_rect();

        let mut hits = 0;
        for ix in -10..10 {
            for iy in -10..10 {
                for (w, h) in [(1.0, 1.0), (33.3, 7.1), (400.0, 200.0), (0.5, 900.0)] {
                    let overlay = Rect::new(ix as f32 * 23.9, iy as f32 * 11.3, w, h);
                    if let Some(region) = RegionMapper::map(overlay, surface) {
                        hits += 1;
                        assert!(
                            bounds.contains_rect(&region),
                            "region {region:?} escapes {bounds:?} for overlay {overlay:?}"
                        );
                        assert!(!region.is_empty());
                    } else {
                        assert!(
                            overlay.intersection(&surface).is_none(),
                            "overlay {overlay:?} overlaps but mapped to empty"
                        );
                    }
                }
            }
        }
        assert!(hits > 0);
    }
}
