//! The scene renderer: owns every derived cache and turns a [`SceneState`]
//! into a [`Frame`].
//!
//! One `RenderContext` is built per frame; cached surfaces (baked element
//! effects, the composed blur background, the gradient ramp) are rasterized
//! in their own contexts and re-enter the frame as image paints. All caches
//! are instance state so independent renderers never share pixels.

use std::collections::{HashMap, HashSet};

use tracing::debug;

use crate::background::{self, BLUR_BG_RADIUS, BlurBgKey, GradientKey, PlacedRect};
use crate::blur;
use crate::compositor;
use crate::effects::{self, EffectKey};
use crate::error::{StoryError, StoryResult};
use crate::frame::{Frame, premultiply_rgba8_in_place, unpremultiply_rgba8_in_place};
use crate::model::{BackgroundMode, BlurMode, CanvasSize, Color, ImageElement};
use crate::resources::ResourceStore;
use crate::scene::SceneState;
use crate::text::FontLibrary;

pub struct SceneRenderer {
    canvas: CanvasSize,
    resources: ResourceStore,
    fonts: FontLibrary,
    processed: HashMap<EffectKey, vello_cpu::Image>,
    blur_bg: Option<(BlurBgKey, vello_cpu::Image)>,
    gradient: Option<(GradientKey, vello_cpu::Image)>,
}

impl SceneRenderer {
    pub fn new(canvas: CanvasSize) -> StoryResult<Self> {
        canvas_u16(canvas)?;
        Ok(Self {
            canvas,
            resources: ResourceStore::new(),
            fonts: FontLibrary::new(),
            processed: HashMap::new(),
            blur_bg: None,
            gradient: None,
        })
    }

    pub fn resources(&self) -> &ResourceStore {
        &self.resources
    }

    pub fn resources_mut(&mut self) -> &mut ResourceStore {
        &mut self.resources
    }

    pub fn fonts_mut(&mut self) -> &mut FontLibrary {
        &mut self.fonts
    }

    pub fn canvas(&self) -> CanvasSize {
        self.canvas
    }

    /// Switches the target size, dropping every size-dependent cache.
    pub fn set_canvas_size(&mut self, canvas: CanvasSize) -> StoryResult<()> {
        canvas_u16(canvas)?;
        if canvas != self.canvas {
            debug!(
                width = canvas.width,
                height = canvas.height,
                "canvas resized, caches dropped"
            );
            self.canvas = canvas;
            self.processed.clear();
            self.blur_bg = None;
            self.gradient = None;
        }
        Ok(())
    }

    /// Renders the scene. Sources that are not in the resource store are
    /// reported through `on_missing` (once per unique source per render) and
    /// their layers are skipped; the frame is still produced.
    pub fn render(
        &mut self,
        scene: &SceneState,
        mut on_missing: impl FnMut(&str),
    ) -> StoryResult<Frame> {
        self.set_canvas_size(scene.canvas())?;
        let (w16, h16) = canvas_u16(self.canvas)?;
        let (cw, ch) = (self.canvas.width, self.canvas.height);

        let mut missing: HashSet<String> = HashSet::new();
        let mut ctx = vello_cpu::RenderContext::new(w16, h16);
        compositor::fill_canvas(&mut ctx, cw, ch, Color::BLACK);

        self.draw_background(&mut ctx, scene, &mut missing)?;

        for el in scene.images() {
            if el.validate().is_err() {
                debug!(id = %el.id, "skipping invalid image element");
                continue;
            }
            if !self.resources.contains(&el.src) {
                missing.insert(el.src.clone());
                continue;
            }
            let paint = self.processed_paint(el)?;
            compositor::draw_image_element(&mut ctx, el, paint);
        }

        for el in scene.texts() {
            if el.validate().is_err() {
                debug!(id = %el.id, "skipping invalid text element");
                continue;
            }
            if !compositor::draw_text_element(&mut ctx, el, &mut self.fonts) {
                debug!(id = %el.id, family = %el.font_family, "font not registered, text skipped");
            }
        }

        ctx.flush();
        let mut pixmap = vello_cpu::Pixmap::new(w16, h16);
        ctx.render_to_pixmap(&mut pixmap);

        for src in missing {
            on_missing(&src);
        }
        Frame::from_premul(cw, ch, pixmap.data_as_u8_slice().to_vec())
    }

    fn draw_background(
        &mut self,
        ctx: &mut vello_cpu::RenderContext,
        scene: &SceneState,
        missing: &mut HashSet<String>,
    ) -> StoryResult<()> {
        let settings = scene.background().clone();
        let (cw, ch) = (self.canvas.width, self.canvas.height);

        let resolved = match scene.background_src() {
            Some(src) => {
                let found = self.resources.get(src).cloned();
                if found.is_none() {
                    missing.insert(src.to_string());
                }
                found
                    .filter(|img| img.width > 0 && img.height > 0)
                    .map(|img| (src.to_string(), img))
            }
            None => None,
        };

        match settings.mode {
            BackgroundMode::Fit => {
                if let Some((src, img)) = resolved {
                    if let Some(paint) = self.resources.paint_for(&src)? {
                        let rect = background::cover_rect(img.width, img.height, cw, ch);
                        compositor::draw_image_rect(ctx, paint, rect)?;
                    }
                }
            }
            BackgroundMode::Stretch => {
                if let Some((src, _img)) = resolved {
                    if let Some(paint) = self.resources.paint_for(&src)? {
                        compositor::draw_image_rect(ctx, paint, background::stretch_rect(cw, ch))?;
                    }
                }
            }
            BackgroundMode::Solid => {
                compositor::fill_canvas(ctx, cw, ch, settings.solid_color);
                if let Some((src, img)) = resolved {
                    if let Some(paint) = self.resources.paint_for(&src)? {
                        let rect = background::contain_rect(img.width, img.height, cw, ch);
                        compositor::draw_image_rect(ctx, paint, rect)?;
                    }
                }
            }
            BackgroundMode::Gradient => {
                let gradient = self.gradient_paint(
                    settings.gradient_start,
                    settings.gradient_end,
                    settings.gradient_angle,
                )?;
                compositor::draw_image_rect(ctx, gradient, background::stretch_rect(cw, ch))?;
                if let Some((src, img)) = resolved {
                    if let Some(paint) = self.resources.paint_for(&src)? {
                        let rect = background::contain_rect(img.width, img.height, cw, ch);
                        compositor::draw_image_rect(ctx, paint, rect)?;
                    }
                }
            }
            BackgroundMode::Blur => {
                if let Some((src, img)) = resolved {
                    let paint = self.blur_background_paint(&src, &img, settings.blur_mode)?;
                    compositor::draw_image_rect(ctx, paint, background::stretch_rect(cw, ch))?;
                }
            }
            BackgroundMode::Repeat => {
                if let Some((src, img)) = resolved {
                    if let Some(paint) = self.resources.paint_for(&src)? {
                        let (tiles_x, tiles_y) =
                            background::tile_counts(img.width, img.height, cw, ch);
                        for ty in 0..tiles_y {
                            for tx in 0..tiles_x {
                                let rect = PlacedRect {
                                    x: f64::from(tx) * f64::from(img.width),
                                    y: f64::from(ty) * f64::from(img.height),
                                    width: f64::from(img.width),
                                    height: f64::from(img.height),
                                };
                                compositor::draw_image_rect(ctx, paint.clone(), rect)?;
                            }
                        }
                    }
                }
            }
        }
        Ok(())
    }

    fn gradient_paint(
        &mut self,
        start: Color,
        end: Color,
        angle: f64,
    ) -> StoryResult<vello_cpu::Image> {
        let key = GradientKey {
            start,
            end,
            angle_bits: angle.to_bits(),
            canvas_width: self.canvas.width,
            canvas_height: self.canvas.height,
        };
        if let Some((k, paint)) = &self.gradient {
            if *k == key {
                return Ok(paint.clone());
            }
        }
        debug!("gradient cache miss, rebuilding ramp");
        let buf =
            background::render_gradient(self.canvas.width, self.canvas.height, start, end, angle);
        let pixmap =
            compositor::image_premul_bytes_to_pixmap(&buf, self.canvas.width, self.canvas.height)?;
        let paint = compositor::image_paint(pixmap);
        self.gradient = Some((key, paint.clone()));
        Ok(paint)
    }

    /// Bakes the two-layer blur background composite, cached as a single
    /// entry keyed by source and canvas dimensions.
    fn blur_background_paint(
        &mut self,
        src: &str,
        img: &crate::resources::PreparedImage,
        blur_mode: BlurMode,
    ) -> StoryResult<vello_cpu::Image> {
        let key = BlurBgKey {
            mode: BackgroundMode::Blur,
            blur_mode,
            image_width: img.width,
            image_height: img.height,
            canvas_width: self.canvas.width,
            canvas_height: self.canvas.height,
        };
        if let Some((k, paint)) = &self.blur_bg {
            if *k == key {
                return Ok(paint.clone());
            }
        }
        debug!(src, "blur background cache miss, recompositing");

        let (w16, h16) = canvas_u16(self.canvas)?;
        let (cw, ch) = (self.canvas.width, self.canvas.height);
        let base_paint = self
            .resources
            .paint_for(src)?
            .ok_or_else(|| StoryError::resource(format!("resource '{src}' vanished mid-render")))?;

        // Layer 1: scale per sub-mode, then blur heavily.
        let mut ctx = vello_cpu::RenderContext::new(w16, h16);
        let rect = match blur_mode {
            BlurMode::Stretch => background::stretch_rect(cw, ch),
            BlurMode::Fit => background::cover_rect(img.width, img.height, cw, ch),
        };
        compositor::draw_image_rect(&mut ctx, base_paint.clone(), rect)?;
        ctx.flush();
        let mut layer = vello_cpu::Pixmap::new(w16, h16);
        ctx.render_to_pixmap(&mut layer);

        let (radius, sigma) = blur::blur_params(BLUR_BG_RADIUS);
        let blurred = blur::blur_rgba8_premul(layer.data_as_u8_slice(), cw, ch, radius, sigma)?;
        let blurred_paint =
            compositor::image_paint(compositor::image_premul_bytes_to_pixmap(&blurred, cw, ch)?);

        // Layer 2: the sharp contain copy over the blurred fill.
        let mut ctx = vello_cpu::RenderContext::new(w16, h16);
        compositor::draw_image_rect(&mut ctx, blurred_paint, background::stretch_rect(cw, ch))?;
        let contain = background::contain_rect(img.width, img.height, cw, ch);
        compositor::draw_image_rect(&mut ctx, base_paint, contain)?;
        ctx.flush();
        let mut composed = vello_cpu::Pixmap::new(w16, h16);
        ctx.render_to_pixmap(&mut composed);

        let paint = compositor::image_paint(composed);
        self.blur_bg = Some((key, paint.clone()));
        Ok(paint)
    }

    /// Baked element image: scaled to element size with mirror applied, then
    /// color ops and blur. Cached by [`EffectKey`].
    fn processed_paint(&mut self, el: &ImageElement) -> StoryResult<vello_cpu::Image> {
        let key = EffectKey::of(el, self.resources.revision(&el.src));
        if let Some(paint) = self.processed.get(&key) {
            return Ok(paint.clone());
        }
        debug!(id = %el.id, "effect cache miss, baking element image");

        let img = self
            .resources
            .get(&el.src)
            .ok_or_else(|| {
                StoryError::resource(format!("resource '{}' vanished mid-render", el.src))
            })?
            .clone();
        let base_paint = self.resources.paint_for(&el.src)?.ok_or_else(|| {
            StoryError::resource(format!("resource '{}' vanished mid-render", el.src))
        })?;

        let bw = el.width.round().max(1.0);
        let bh = el.height.round().max(1.0);
        let bw16: u16 = (bw as u32)
            .try_into()
            .map_err(|_| StoryError::render("element width exceeds bake limit"))?;
        let bh16: u16 = (bh as u32)
            .try_into()
            .map_err(|_| StoryError::render("element height exceeds bake limit"))?;

        // Scale (and mirror) the source into element pixels.
        let scale = kurbo::Affine::scale_non_uniform(
            bw / f64::from(img.width.max(1)),
            bh / f64::from(img.height.max(1)),
        );
        let transform = if el.mirror_h || el.mirror_v {
            let sx = if el.mirror_h { -1.0 } else { 1.0 };
            let sy = if el.mirror_v { -1.0 } else { 1.0 };
            kurbo::Affine::translate((bw / 2.0, bh / 2.0))
                * kurbo::Affine::scale_non_uniform(sx, sy)
                * kurbo::Affine::translate((-bw / 2.0, -bh / 2.0))
                * scale
        } else {
            scale
        };

        let mut ctx = vello_cpu::RenderContext::new(bw16, bh16);
        ctx.set_transform(compositor::affine_to_cpu(transform));
        ctx.set_paint(base_paint);
        ctx.fill_rect(&vello_cpu::kurbo::Rect::new(
            0.0,
            0.0,
            f64::from(img.width),
            f64::from(img.height),
        ));
        ctx.flush();
        let mut pixmap = vello_cpu::Pixmap::new(bw16, bh16);
        ctx.render_to_pixmap(&mut pixmap);
        let mut bytes = pixmap.data_as_u8_slice().to_vec();

        if effects::needs_color_ops(el) {
            unpremultiply_rgba8_in_place(&mut bytes);
            effects::apply_color_ops(&mut bytes, el.brightness, el.contrast, el.filter);
            premultiply_rgba8_in_place(&mut bytes);
        }
        if el.blur > 0.0 {
            let (radius, sigma) = blur::blur_params(el.blur);
            bytes =
                blur::blur_rgba8_premul(&bytes, u32::from(bw16), u32::from(bh16), radius, sigma)?;
        }

        let paint = compositor::image_paint(compositor::image_premul_bytes_to_pixmap(
            &bytes,
            u32::from(bw16),
            u32::from(bh16),
        )?);
        self.processed.insert(key, paint.clone());
        Ok(paint)
    }
}

fn canvas_u16(canvas: CanvasSize) -> StoryResult<(u16, u16)> {
    if canvas.width == 0 || canvas.height == 0 {
        return Err(StoryError::validation("canvas width/height must be > 0"));
    }
    let w: u16 = canvas
        .width
        .try_into()
        .map_err(|_| StoryError::validation("canvas width exceeds raster limit"))?;
    let h: u16 = canvas
        .height
        .try_into()
        .map_err(|_| StoryError::validation("canvas height exceeds raster limit"))?;
    Ok((w, h))
}
