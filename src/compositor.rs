//! Draw routines on top of `vello_cpu::RenderContext`.
//!
//! Everything here draws into the context the caller owns; caches and scene
//! traversal live in [`crate::render`]. Processed image paints arrive already
//! baked at element size with mirroring applied, so element transforms never
//! re-apply mirror flags and paint pixels line up 1:1 with local coordinates.

use kurbo::PathEl;

use crate::background::PlacedRect;
use crate::error::{StoryError, StoryResult};
use crate::geometry;
use crate::model::{Color, ImageElement, TextElement};
use crate::text::{self, FontLibrary, TextBrush};

pub fn color_to_cpu(c: Color) -> vello_cpu::peniko::Color {
    vello_cpu::peniko::Color::from_rgba8(c.r, c.g, c.b, c.a)
}

pub fn affine_to_cpu(a: kurbo::Affine) -> vello_cpu::kurbo::Affine {
    vello_cpu::kurbo::Affine::new(a.as_coeffs())
}

pub fn bezpath_to_cpu(path: &kurbo::BezPath) -> vello_cpu::kurbo::BezPath {
    let point = |p: kurbo::Point| vello_cpu::kurbo::Point::new(p.x, p.y);
    let mut out = vello_cpu::kurbo::BezPath::new();
    for el in path.elements() {
        match *el {
            PathEl::MoveTo(p) => out.move_to(point(p)),
            PathEl::LineTo(p) => out.line_to(point(p)),
            PathEl::QuadTo(p1, p2) => out.quad_to(point(p1), point(p2)),
            PathEl::CurveTo(p1, p2, p3) => out.curve_to(point(p1), point(p2), point(p3)),
            PathEl::ClosePath => out.close_path(),
        }
    }
    out
}

pub fn image_premul_bytes_to_pixmap(
    rgba8_premul: &[u8],
    width: u32,
    height: u32,
) -> StoryResult<vello_cpu::Pixmap> {
    let w: u16 = width
        .try_into()
        .map_err(|_| StoryError::render("image width exceeds u16"))?;
    let h: u16 = height
        .try_into()
        .map_err(|_| StoryError::render("image height exceeds u16"))?;
    if rgba8_premul.len() != width as usize * height as usize * 4 {
        return Err(StoryError::render("image byte length mismatch"));
    }

    let mut may_have_opacities = false;
    let mut pixels = Vec::with_capacity(width as usize * height as usize);
    for px in rgba8_premul.chunks_exact(4) {
        let a = px[3];
        may_have_opacities |= a != 255;
        pixels.push(vello_cpu::peniko::color::PremulRgba8 {
            r: px[0],
            g: px[1],
            b: px[2],
            a,
        });
    }
    Ok(vello_cpu::Pixmap::from_parts_with_opacity(
        pixels,
        w,
        h,
        may_have_opacities,
    ))
}

pub fn image_paint(pixmap: vello_cpu::Pixmap) -> vello_cpu::Image {
    vello_cpu::Image {
        image: vello_cpu::ImageSource::Pixmap(std::sync::Arc::new(pixmap)),
        sampler: vello_cpu::peniko::ImageSampler::default(),
    }
}

pub fn image_paint_size(image: &vello_cpu::Image) -> StoryResult<(f64, f64)> {
    match &image.image {
        vello_cpu::ImageSource::Pixmap(p) => Ok((f64::from(p.width()), f64::from(p.height()))),
        vello_cpu::ImageSource::OpaqueId(_) => {
            Err(StoryError::render("opaque image ids are not supported"))
        }
    }
}

/// Fills the whole target with a solid color.
pub fn fill_canvas(ctx: &mut vello_cpu::RenderContext, width: u32, height: u32, color: Color) {
    ctx.set_transform(vello_cpu::kurbo::Affine::IDENTITY);
    ctx.set_paint(color_to_cpu(color));
    ctx.fill_rect(&vello_cpu::kurbo::Rect::new(
        0.0,
        0.0,
        f64::from(width),
        f64::from(height),
    ));
}

/// Draws an image paint into a destination rectangle, scaling from its
/// natural size. Degenerate sources or destinations are skipped.
pub fn draw_image_rect(
    ctx: &mut vello_cpu::RenderContext,
    paint: vello_cpu::Image,
    dest: PlacedRect,
) -> StoryResult<()> {
    let (nw, nh) = image_paint_size(&paint)?;
    if nw <= 0.0 || nh <= 0.0 || dest.width <= 0.0 || dest.height <= 0.0 {
        return Ok(());
    }
    let transform = kurbo::Affine::translate((dest.x, dest.y))
        * kurbo::Affine::scale_non_uniform(dest.width / nw, dest.height / nh);
    ctx.set_transform(affine_to_cpu(transform));
    ctx.set_paint(paint);
    ctx.fill_rect(&vello_cpu::kurbo::Rect::new(0.0, 0.0, nw, nh));
    Ok(())
}

/// Draws a processed element image, clipped to its corner shape, then its
/// outline ring. `paint` must already be baked at element size.
pub fn draw_image_element(
    ctx: &mut vello_cpu::RenderContext,
    el: &ImageElement,
    paint: vello_cpu::Image,
) {
    // Mirror is baked into the paint, never into the placement.
    let transform = geometry::element_transform(
        el.x,
        el.y,
        el.width,
        el.height,
        el.rotation,
        false,
        false,
    );
    ctx.set_transform(affine_to_cpu(transform));
    ctx.set_paint(paint);
    let clip = geometry::clip_path(el.corner_style, el.border_radius, el.width, el.height);
    ctx.fill_path(&bezpath_to_cpu(&clip));

    if el.outline_width > 0.0 {
        let ring = geometry::ring_path(
            el.corner_style,
            el.border_radius,
            el.width,
            el.height,
            el.outline_width,
        );
        ctx.set_paint(color_to_cpu(el.outline_color));
        ctx.fill_path(&bezpath_to_cpu(&ring));
    }
}

/// Outline stamping directions: eight compass offsets around each glyph run.
const OUTLINE_STAMPS: usize = 8;

/// Wraps and draws a text element. Returns `false` without drawing when the
/// font family is not registered.
pub fn draw_text_element(
    ctx: &mut vello_cpu::RenderContext,
    el: &TextElement,
    fonts: &mut FontLibrary,
) -> bool {
    if el.text.is_empty() {
        return true;
    }
    let Some(font) = fonts.font_data(&el.font_family).cloned() else {
        return false;
    };

    let max_width = text::wrap_width(el.size);
    let lines = text::wrap_lines(
        &el.text,
        &el.font_family,
        el.font_size,
        max_width,
        el.break_words,
        fonts,
    );

    let base = kurbo::Affine::translate((el.x, el.y)) * kurbo::Affine::rotate(el.rotation.to_radians());
    let brush = TextBrush {
        r: el.color.r,
        g: el.color.g,
        b: el.color.b,
        a: el.color.a,
    };

    let count = lines.len();
    for (i, line) in lines.iter().enumerate() {
        if line.is_empty() {
            continue;
        }
        let Some(layout) = fonts.layout_line(line, &el.font_family, el.font_size as f32, brush)
        else {
            continue;
        };
        let w = f64::from(layout.width());
        let h = f64::from(layout.height());
        let dy = text::line_center_offset(el.font_size, i, count);
        let place = base * kurbo::Affine::translate((-w / 2.0, dy - h / 2.0));

        if el.outline_width > 0.0 {
            let r = el.outline_width / 2.0;
            for k in 0..OUTLINE_STAMPS {
                let a = k as f64 * std::f64::consts::TAU / OUTLINE_STAMPS as f64;
                let offset = place * kurbo::Affine::translate((a.cos() * r, a.sin() * r));
                draw_layout_glyphs(ctx, &layout, &font, el.outline_color, offset);
            }
        }
        draw_layout_glyphs(ctx, &layout, &font, el.color, place);
    }
    true
}

fn draw_layout_glyphs(
    ctx: &mut vello_cpu::RenderContext,
    layout: &parley::Layout<TextBrush>,
    font: &vello_cpu::peniko::FontData,
    color: Color,
    transform: kurbo::Affine,
) {
    ctx.set_transform(affine_to_cpu(transform));
    ctx.set_paint(color_to_cpu(color));
    for line in layout.lines() {
        for item in line.items() {
            let parley::layout::PositionedLayoutItem::GlyphRun(run) = item else {
                continue;
            };
            let glyphs = run.glyphs().map(|g| vello_cpu::Glyph {
                id: g.id,
                x: g.x,
                y: g.y,
            });
            ctx.glyph_run(font)
                .font_size(run.run().font_size())
                .fill_glyphs(glyphs);
        }
    }
}
