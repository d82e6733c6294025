//! Element-local geometry: transforms, corner shapes and outline rings.
//!
//! Elements live in a local `[0, w] x [0, h]` box and are placed on the
//! canvas by [`element_transform`]. Corner shapes are flattened kurbo paths
//! filled with the default nonzero rule; outline rings carry a
//! winding-reversed inner loop so the hole falls out of the same fill.

use kurbo::{Affine, BezPath, Circle, Rect, RoundedRect, Shape};

use crate::model::CornerStyle;

/// Flattening tolerance for shape-to-path conversion.
const PATH_TOLERANCE: f64 = 0.1;

/// Normalizes an angle in degrees to `[0, 360)`.
pub fn normalize_degrees(deg: f64) -> f64 {
    let d = deg % 360.0;
    if d < 0.0 { d + 360.0 } else { d }
}

/// Canvas placement of an element's local `[0, w] x [0, h]` box: the box
/// center lands on `(x, y)`, rotation is about the center, mirroring flips
/// about the center axes.
pub fn element_transform(
    x: f64,
    y: f64,
    w: f64,
    h: f64,
    rotation_deg: f64,
    mirror_h: bool,
    mirror_v: bool,
) -> Affine {
    let sx = if mirror_h { -1.0 } else { 1.0 };
    let sy = if mirror_v { -1.0 } else { 1.0 };
    Affine::translate((x, y))
        * Affine::rotate(rotation_deg.to_radians())
        * Affine::scale_non_uniform(sx, sy)
        * Affine::translate((-w / 2.0, -h / 2.0))
}

/// Effective corner radius for a `w x h` element. `Circle` is handled by
/// shape construction, not a radius.
pub fn corner_radius(style: CornerStyle, border_radius: f64, w: f64, h: f64) -> f64 {
    let max = w.min(h) / 2.0;
    match style {
        CornerStyle::Square => 0.0,
        CornerStyle::Rounded => {
            let r = if border_radius > 0.0 {
                border_radius
            } else {
                (w.min(h) / 10.0).round()
            };
            r.clamp(0.0, max)
        }
        CornerStyle::Circle => 0.0,
        CornerStyle::Custom => border_radius.clamp(0.0, max),
    }
}

/// One closed loop of the element shape, offset outward by `offset` canvas
/// pixels (negative shrinks).
fn shape_loop(style: CornerStyle, border_radius: f64, w: f64, h: f64, offset: f64) -> BezPath {
    match style {
        CornerStyle::Circle => {
            let r = w.min(h) / 2.0 + offset;
            Circle::new((w / 2.0, h / 2.0), r.max(0.0)).to_path(PATH_TOLERANCE)
        }
        _ => {
            let r = corner_radius(style, border_radius, w, h);
            let rect = Rect::new(-offset, -offset, w + offset, h + offset);
            if r + offset > 0.0 {
                RoundedRect::from_rect(rect, r + offset).to_path(PATH_TOLERANCE)
            } else {
                rect.to_path(PATH_TOLERANCE)
            }
        }
    }
}

/// The element's clip shape in local coordinates.
pub fn clip_path(style: CornerStyle, border_radius: f64, w: f64, h: f64) -> BezPath {
    shape_loop(style, border_radius, w, h, 0.0)
}

/// An outline ring of width `ring_width` centered on the shape edge. When
/// the inner loop would collapse, the filled outer shape is returned.
pub fn ring_path(
    style: CornerStyle,
    border_radius: f64,
    w: f64,
    h: f64,
    ring_width: f64,
) -> BezPath {
    let half = ring_width / 2.0;
    let mut path = shape_loop(style, border_radius, w, h, half);
    let inner_collapses = match style {
        CornerStyle::Circle => w.min(h) / 2.0 - half <= 0.0,
        _ => w - 2.0 * half <= 0.0 || h - 2.0 * half <= 0.0,
    };
    if !inner_collapses {
        let inner = shape_loop(style, border_radius, w, h, -half);
        let reversed = BezPath::from_path_segments(
            inner
                .segments()
                .collect::<Vec<_>>()
                .into_iter()
                .rev()
                .map(|seg| seg.reverse()),
        );
        path.extend(reversed.elements().iter().copied());
    }
    path
}

#[cfg(test)]
mod tests {
    use super::*;
    use kurbo::Point;

    #[test]
    fn normalize_degrees_wraps_into_range() {
        assert_eq!(normalize_degrees(0.0), 0.0);
        assert_eq!(normalize_degrees(360.0), 0.0);
        assert_eq!(normalize_degrees(-90.0), 270.0);
        assert_eq!(normalize_degrees(725.0), 5.0);
    }

    #[test]
    fn transform_places_local_center_at_xy() {
        let t = element_transform(100.0, 200.0, 40.0, 60.0, 37.0, false, false);
        let c = t * Point::new(20.0, 30.0);
        assert!((c.x - 100.0).abs() < 1e-9);
        assert!((c.y - 200.0).abs() < 1e-9);
    }

    #[test]
    fn mirror_flips_about_center() {
        let t = element_transform(0.0, 0.0, 100.0, 100.0, 0.0, true, false);
        let p = t * Point::new(0.0, 50.0);
        // Left edge lands on the right after horizontal mirroring.
        assert!((p.x - 50.0).abs() < 1e-9);
        assert!(p.y.abs() < 1e-9);
    }

    #[test]
    fn corner_radius_styles() {
        assert_eq!(corner_radius(CornerStyle::Square, 99.0, 200.0, 100.0), 0.0);
        // Rounded prefers the element radius, falling back to min(w, h) / 10.
        assert_eq!(corner_radius(CornerStyle::Rounded, 20.0, 200.0, 100.0), 20.0);
        assert_eq!(corner_radius(CornerStyle::Rounded, 0.0, 200.0, 100.0), 10.0);
        // Custom clamps to the half-extent.
        assert_eq!(corner_radius(CornerStyle::Custom, 500.0, 200.0, 100.0), 50.0);
    }

    #[test]
    fn ring_has_hole_and_collapses_when_too_wide() {
        let ring = ring_path(CornerStyle::Square, 0.0, 100.0, 100.0, 10.0);
        // Even-area check: winding at the center must cancel out.
        assert_eq!(ring.winding(Point::new(50.0, 50.0)), 0);
        assert_ne!(ring.winding(Point::new(2.0, 50.0)), 0);

        let solid = ring_path(CornerStyle::Square, 0.0, 100.0, 100.0, 200.0);
        assert_ne!(solid.winding(Point::new(50.0, 50.0)), 0);
    }

    #[test]
    fn circle_clip_is_inscribed() {
        let path = clip_path(CornerStyle::Circle, 0.0, 200.0, 100.0);
        assert_ne!(path.winding(Point::new(100.0, 50.0)), 0);
        // Radius is min(w, h) / 2, so the far corners stay outside.
        assert_eq!(path.winding(Point::new(10.0, 10.0)), 0);
    }
}
