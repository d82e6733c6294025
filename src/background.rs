//! Background placement math and the linear-gradient ramp.
//!
//! Placement is computed against the image and canvas aspect ratios; the
//! comparison is strict (`image_aspect > canvas_aspect`) so squares on square
//! canvases take the second branch deterministically.

use crate::model::{BackgroundMode, BlurMode, Color};

/// Blur radius in canvas pixels for the blurred background layer.
pub const BLUR_BG_RADIUS: f64 = 40.0;

/// Axis-aligned destination rectangle in canvas space.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PlacedRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// Scales the image to cover the whole canvas, cropping the overflow.
pub fn cover_rect(iw: u32, ih: u32, cw: u32, ch: u32) -> PlacedRect {
    let (iw, ih) = (f64::from(iw), f64::from(ih));
    let (cw, ch) = (f64::from(cw), f64::from(ch));
    if iw / ih > cw / ch {
        let width = iw * (ch / ih);
        PlacedRect {
            x: (cw - width) / 2.0,
            y: 0.0,
            width,
            height: ch,
        }
    } else {
        let height = ih * (cw / iw);
        PlacedRect {
            x: 0.0,
            y: (ch - height) / 2.0,
            width: cw,
            height,
        }
    }
}

/// Scales the image to fit entirely inside the canvas, letterboxing the rest.
pub fn contain_rect(iw: u32, ih: u32, cw: u32, ch: u32) -> PlacedRect {
    let (iw, ih) = (f64::from(iw), f64::from(ih));
    let (cw, ch) = (f64::from(cw), f64::from(ch));
    if iw / ih > cw / ch {
        let height = ih * (cw / iw);
        PlacedRect {
            x: 0.0,
            y: (ch - height) / 2.0,
            width: cw,
            height,
        }
    } else {
        let width = iw * (ch / ih);
        PlacedRect {
            x: (cw - width) / 2.0,
            y: 0.0,
            width,
            height: ch,
        }
    }
}

pub fn stretch_rect(cw: u32, ch: u32) -> PlacedRect {
    PlacedRect {
        x: 0.0,
        y: 0.0,
        width: f64::from(cw),
        height: f64::from(ch),
    }
}

/// Tile grid for repeat mode: tiles keep their native size and the grid is
/// rounded up to cover the canvas.
pub fn tile_counts(iw: u32, ih: u32, cw: u32, ch: u32) -> (u32, u32) {
    let tiles_x = cw.div_ceil(iw.max(1));
    let tiles_y = ch.div_ceil(ih.max(1));
    (tiles_x.max(1), tiles_y.max(1))
}

/// Gradient axis endpoints: the line runs through the canvas center, spanning
/// half the canvas extent along each axis of the angle.
pub fn gradient_points(cw: u32, ch: u32, angle_deg: f64) -> ((f64, f64), (f64, f64)) {
    let (cw, ch) = (f64::from(cw), f64::from(ch));
    let rad = angle_deg.to_radians();
    let dx = rad.cos() * cw / 2.0;
    let dy = rad.sin() * ch / 2.0;
    let cx = cw / 2.0;
    let cy = ch / 2.0;
    ((cx + dx, cy + dy), (cx - dx, cy - dy))
}

/// Cache key for the composed blur background. Position-independent scene
/// edits never invalidate it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct BlurBgKey {
    pub mode: BackgroundMode,
    pub blur_mode: BlurMode,
    pub image_width: u32,
    pub image_height: u32,
    pub canvas_width: u32,
    pub canvas_height: u32,
}

/// Cache key for the rendered gradient ramp.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct GradientKey {
    pub start: Color,
    pub end: Color,
    pub angle_bits: u64,
    pub canvas_width: u32,
    pub canvas_height: u32,
}

/// Rasterizes the linear gradient into a premultiplied RGBA8 buffer by
/// projecting each pixel center onto the gradient axis.
pub fn render_gradient(cw: u32, ch: u32, start: Color, end: Color, angle_deg: f64) -> Vec<u8> {
    let ((x1, y1), (x2, y2)) = gradient_points(cw, ch, angle_deg);
    let dx = x2 - x1;
    let dy = y2 - y1;
    let len_sq = dx * dx + dy * dy;

    let mut out = vec![0u8; cw as usize * ch as usize * 4];
    for y in 0..ch {
        for x in 0..cw {
            let px = f64::from(x) + 0.5;
            let py = f64::from(y) + 0.5;
            let t = if len_sq > 0.0 {
                (((px - x1) * dx + (py - y1) * dy) / len_sq).clamp(0.0, 1.0)
            } else {
                0.0
            };
            let lerp = |a: u8, b: u8| (f64::from(a) + (f64::from(b) - f64::from(a)) * t) as u8;
            let (r, g, b, a) = (
                lerp(start.r, end.r),
                lerp(start.g, end.g),
                lerp(start.b, end.b),
                lerp(start.a, end.a),
            );
            let i = (y as usize * cw as usize + x as usize) * 4;
            let mul = |c: u8| ((u16::from(c) * u16::from(a) + 127) / 255) as u8;
            out[i] = mul(r);
            out[i + 1] = mul(g);
            out[i + 2] = mul(b);
            out[i + 3] = a;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cover_crops_the_long_axis() {
        // Wide image on a tall canvas: height matches, width overflows.
        let r = cover_rect(200, 100, 100, 200);
        assert_eq!(r.height, 200.0);
        assert_eq!(r.width, 400.0);
        assert_eq!(r.x, -150.0);
        assert_eq!(r.y, 0.0);
    }

    #[test]
    fn contain_letterboxes_the_short_axis() {
        let r = contain_rect(200, 100, 100, 200);
        assert_eq!(r.width, 100.0);
        assert_eq!(r.height, 50.0);
        assert_eq!(r.x, 0.0);
        assert_eq!(r.y, 75.0);
    }

    #[test]
    fn equal_aspects_fill_exactly() {
        // Strict comparison sends equal aspects down the second branch.
        let r = cover_rect(500, 500, 100, 100);
        assert_eq!(r, stretch_rect(100, 100));
        let r = contain_rect(500, 500, 100, 100);
        assert_eq!(r, stretch_rect(100, 100));
    }

    #[test]
    fn tile_counts_round_up() {
        assert_eq!(tile_counts(30, 30, 100, 60), (4, 2));
        assert_eq!(tile_counts(100, 100, 100, 100), (1, 1));
        assert_eq!(tile_counts(0, 0, 100, 100), (100, 100));
    }

    #[test]
    fn gradient_axis_spans_the_canvas() {
        let ((x1, y1), (x2, y2)) = gradient_points(100, 200, 0.0);
        assert_eq!((x1, y1), (100.0, 100.0));
        assert_eq!((x2, y2), (0.0, 100.0));

        let ((x1, y1), _) = gradient_points(100, 200, 90.0);
        assert!((x1 - 50.0).abs() < 1e-9);
        assert!((y1 - 200.0).abs() < 1e-9);
    }

    #[test]
    fn opposite_angles_swap_the_endpoints() {
        let (a1, a2) = gradient_points(100, 200, 0.0);
        let (b1, b2) = gradient_points(100, 200, 180.0);
        assert!((a1.0 - b2.0).abs() < 1e-9 && (a1.1 - b2.1).abs() < 1e-9);
        assert!((a2.0 - b1.0).abs() < 1e-9 && (a2.1 - b1.1).abs() < 1e-9);
    }

    #[test]
    fn gradient_ramp_endpoints_match_stops() {
        let start = Color::rgb(255, 0, 0);
        let end = Color::rgb(0, 0, 255);
        // Angle 0: stop 0 sits at the right edge, stop 1 at the left.
        let buf = render_gradient(10, 1, start, end, 0.0);
        let right = &buf[9 * 4..9 * 4 + 4];
        let left = &buf[0..4];
        assert!(right[0] > 240 && right[2] < 20);
        assert!(left[2] > 240 && left[0] < 20);
    }
}
