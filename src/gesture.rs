//! Pointer-gesture transforms: move, directional resize and rotate.
//!
//! The controller is generic over the element kind; the shared machinery
//! (screen-to-canvas scaling, clamping, rotation deltas) lives here and the
//! kind-specific resize semantics are injected through [`ResizeRule`]. All
//! computations work from values captured at gesture start, so updates never
//! compound across pointer-move events.

use crate::geometry::normalize_degrees;
use crate::model::{CanvasSize, ImageElement, ImageUpdate, MIN_IMAGE_DIM, TextElement, TextUpdate};

/// A pointer position in screen (view) coordinates.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Pointer {
    pub x: f64,
    pub y: f64,
}

/// The on-screen size of the canvas view, used to map pointer deltas into
/// canvas space.
#[derive(Clone, Copy, Debug)]
pub struct Viewport {
    pub canvas: CanvasSize,
    pub view_width: f64,
    pub view_height: f64,
}

impl Viewport {
    /// 1:1 mapping, for tests and headless use.
    pub fn identity(canvas: CanvasSize) -> Self {
        Self {
            canvas,
            view_width: f64::from(canvas.width),
            view_height: f64::from(canvas.height),
        }
    }

    fn scale(&self) -> (f64, f64) {
        let sx = if self.view_width > 0.0 {
            f64::from(self.canvas.width) / self.view_width
        } else {
            1.0
        };
        let sy = if self.view_height > 0.0 {
            f64::from(self.canvas.height) / self.view_height
        } else {
            1.0
        };
        (sx, sy)
    }
}

/// Resize handle direction: -1, 0 or +1 per axis.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HandleDir {
    pub x: i8,
    pub y: i8,
}

/// Tunable gesture constants.
#[derive(Clone, Copy, Debug)]
pub struct GestureTuning {
    /// Dimension change per canvas-space pointer unit (handles sit on the
    /// edge, the element grows symmetrically about its center).
    pub resize_gain: f64,
    /// Font-size change per canvas-space pointer unit.
    pub font_gain: f64,
    pub min_image_dim: f64,
    pub font_size_range: (f64, f64),
    pub container_range: (f64, f64),
}

impl Default for GestureTuning {
    fn default() -> Self {
        Self {
            resize_gain: 2.0,
            font_gain: 0.5,
            min_image_dim: MIN_IMAGE_DIM,
            font_size_range: (20.0, 200.0),
            container_range: (100.0, 1080.0),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GestureKind {
    Move,
    Resize,
    Rotate,
}

/// Kind-specific resize behavior: what to capture at gesture start and how a
/// canvas-space delta turns into a partial update.
pub trait ResizeRule {
    type Update: Default;
    type Start: Copy;

    fn capture(&self) -> Self::Start;
    fn resize(
        start: Self::Start,
        dir: HandleDir,
        delta_w: f64,
        delta_h: f64,
        tuning: &GestureTuning,
    ) -> Self::Update;

    fn position(&self) -> (f64, f64);
    fn rotation(&self) -> f64;
    fn position_update(x: f64, y: f64) -> Self::Update;
    fn rotation_update(deg: f64) -> Self::Update;
}

impl ResizeRule for ImageElement {
    type Update = ImageUpdate;
    type Start = (f64, f64);

    fn capture(&self) -> Self::Start {
        (self.width, self.height)
    }

    fn resize(
        (w0, h0): Self::Start,
        dir: HandleDir,
        delta_w: f64,
        delta_h: f64,
        tuning: &GestureTuning,
    ) -> ImageUpdate {
        let mut update = ImageUpdate::default();
        if dir.x != 0 {
            update.width =
                Some((w0 + delta_w * tuning.resize_gain).round().max(tuning.min_image_dim));
        }
        if dir.y != 0 {
            update.height =
                Some((h0 + delta_h * tuning.resize_gain).round().max(tuning.min_image_dim));
        }
        update
    }

    fn position(&self) -> (f64, f64) {
        (self.x, self.y)
    }

    fn rotation(&self) -> f64 {
        self.rotation
    }

    fn position_update(x: f64, y: f64) -> ImageUpdate {
        ImageUpdate {
            x: Some(x),
            y: Some(y),
            ..ImageUpdate::default()
        }
    }

    fn rotation_update(deg: f64) -> ImageUpdate {
        ImageUpdate {
            rotation: Some(deg),
            ..ImageUpdate::default()
        }
    }
}

impl ResizeRule for TextElement {
    type Update = TextUpdate;
    /// Captured (container size, font size).
    type Start = (f64, f64);

    fn capture(&self) -> Self::Start {
        (self.size, self.font_size)
    }

    fn resize(
        (size0, font0): Self::Start,
        dir: HandleDir,
        delta_w: f64,
        delta_h: f64,
        tuning: &GestureTuning,
    ) -> TextUpdate {
        let mut update = TextUpdate::default();
        if dir.x != 0 {
            let (lo, hi) = tuning.container_range;
            update.size = Some((size0 + delta_w * tuning.resize_gain).clamp(lo, hi).round());
        }
        if dir.y != 0 {
            let (lo, hi) = tuning.font_size_range;
            update.font_size = Some((font0 + delta_h * tuning.font_gain).clamp(lo, hi).round());
        }
        update
    }

    fn position(&self) -> (f64, f64) {
        (self.x, self.y)
    }

    fn rotation(&self) -> f64 {
        self.rotation
    }

    fn position_update(x: f64, y: f64) -> TextUpdate {
        TextUpdate {
            x: Some(x),
            y: Some(y),
            ..TextUpdate::default()
        }
    }

    fn rotation_update(deg: f64) -> TextUpdate {
        TextUpdate {
            rotation: Some(deg),
            ..TextUpdate::default()
        }
    }
}

enum ActiveGesture<S> {
    Move {
        start_pointer: Pointer,
        start_pos: (f64, f64),
    },
    Resize {
        start_pointer: Pointer,
        start: S,
        dir: HandleDir,
    },
    Rotate {
        start_angle_deg: f64,
        start_rotation: f64,
    },
}

/// Tracks one in-flight gesture for one element kind. Updates are proposals;
/// the caller merges them into scene state.
pub struct GestureController<T: ResizeRule> {
    tuning: GestureTuning,
    active: Option<ActiveGesture<T::Start>>,
}

impl<T: ResizeRule> Default for GestureController<T> {
    fn default() -> Self {
        Self::new(GestureTuning::default())
    }
}

impl<T: ResizeRule> GestureController<T> {
    pub fn new(tuning: GestureTuning) -> Self {
        Self {
            tuning,
            active: None,
        }
    }

    pub fn kind(&self) -> Option<GestureKind> {
        self.active.as_ref().map(|g| match g {
            ActiveGesture::Move { .. } => GestureKind::Move,
            ActiveGesture::Resize { .. } => GestureKind::Resize,
            ActiveGesture::Rotate { .. } => GestureKind::Rotate,
        })
    }

    pub fn begin_move(&mut self, el: &T, pointer: Pointer) {
        self.active = Some(ActiveGesture::Move {
            start_pointer: pointer,
            start_pos: el.position(),
        });
    }

    pub fn begin_resize(&mut self, el: &T, pointer: Pointer, dir: HandleDir) {
        self.active = Some(ActiveGesture::Resize {
            start_pointer: pointer,
            start: el.capture(),
            dir,
        });
    }

    /// `center` is the element center in screen coordinates.
    pub fn begin_rotate(&mut self, el: &T, pointer: Pointer, center: Pointer) {
        self.active = Some(ActiveGesture::Rotate {
            start_angle_deg: pointer_angle_deg(pointer, center),
            start_rotation: el.rotation(),
        });
    }

    /// Produces the update for the current pointer position, or `None` when
    /// no gesture is active. `center` is only read by rotate gestures.
    pub fn update(
        &self,
        pointer: Pointer,
        viewport: &Viewport,
        center: Pointer,
    ) -> Option<T::Update> {
        let (sx, sy) = viewport.scale();
        match self.active.as_ref()? {
            ActiveGesture::Move {
                start_pointer,
                start_pos,
            } => {
                let dx = (pointer.x - start_pointer.x) * sx;
                let dy = (pointer.y - start_pointer.y) * sy;
                let x = (start_pos.0 + dx).clamp(0.0, f64::from(viewport.canvas.width));
                let y = (start_pos.1 + dy).clamp(0.0, f64::from(viewport.canvas.height));
                Some(T::position_update(x, y))
            }
            ActiveGesture::Resize {
                start_pointer,
                start,
                dir,
            } => {
                let delta_w = (pointer.x - start_pointer.x) * f64::from(dir.x) * sx;
                let delta_h = (pointer.y - start_pointer.y) * f64::from(dir.y) * sy;
                Some(T::resize(*start, *dir, delta_w, delta_h, &self.tuning))
            }
            ActiveGesture::Rotate {
                start_angle_deg,
                start_rotation,
            } => {
                let angle = pointer_angle_deg(pointer, center);
                let rotation = normalize_degrees(start_rotation + (angle - start_angle_deg));
                Some(T::rotation_update(rotation.round() % 360.0))
            }
        }
    }

    pub fn end(&mut self) {
        self.active = None;
    }
}

fn pointer_angle_deg(pointer: Pointer, center: Pointer) -> f64 {
    (pointer.y - center.y).atan2(pointer.x - center.x).to_degrees()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ElementId;

    fn canvas() -> CanvasSize {
        CanvasSize::default()
    }

    fn image() -> ImageElement {
        ImageElement::new(ElementId(1), "a.png", (200, 200), canvas())
    }

    fn text() -> TextElement {
        TextElement::new(ElementId(2), canvas())
    }

    #[test]
    fn move_maps_screen_deltas_through_view_scale() {
        // View shown at half canvas resolution: screen deltas double.
        let viewport = Viewport {
            canvas: canvas(),
            view_width: 540.0,
            view_height: 960.0,
        };
        let el = image();
        let mut ctl = GestureController::<ImageElement>::default();
        ctl.begin_move(&el, Pointer { x: 0.0, y: 0.0 });
        let update = ctl
            .update(Pointer { x: 10.0, y: 5.0 }, &viewport, Pointer { x: 0.0, y: 0.0 })
            .unwrap();
        assert_eq!(update.x, Some(el.x + 20.0));
        assert_eq!(update.y, Some(el.y + 10.0));
    }

    #[test]
    fn move_clamps_to_canvas_bounds() {
        let viewport = Viewport::identity(canvas());
        let el = image();
        let mut ctl = GestureController::<ImageElement>::default();
        ctl.begin_move(&el, Pointer { x: 0.0, y: 0.0 });
        let update = ctl
            .update(
                Pointer {
                    x: -10_000.0,
                    y: 10_000.0,
                },
                &viewport,
                Pointer { x: 0.0, y: 0.0 },
            )
            .unwrap();
        assert_eq!(update.x, Some(0.0));
        assert_eq!(update.y, Some(1920.0));
    }

    #[test]
    fn horizontal_resize_doubles_delta_and_clamps_at_minimum() {
        let viewport = Viewport::identity(canvas());
        let el = image();
        let mut ctl = GestureController::<ImageElement>::default();
        ctl.begin_resize(&el, Pointer { x: 0.0, y: 0.0 }, HandleDir { x: 1, y: 0 });

        let update = ctl
            .update(Pointer { x: 15.0, y: 0.0 }, &viewport, Pointer { x: 0.0, y: 0.0 })
            .unwrap();
        assert_eq!(update.width, Some(el.width + 30.0));
        assert_eq!(update.height, None);

        // Extreme negative delta clamps to the 10px floor, never below.
        let update = ctl
            .update(
                Pointer { x: -10_000.0, y: 0.0 },
                &viewport,
                Pointer { x: 0.0, y: 0.0 },
            )
            .unwrap();
        assert_eq!(update.width, Some(10.0));
    }

    #[test]
    fn diagonal_resize_updates_both_axes() {
        let viewport = Viewport::identity(canvas());
        let el = image();
        let mut ctl = GestureController::<ImageElement>::default();
        ctl.begin_resize(&el, Pointer { x: 0.0, y: 0.0 }, HandleDir { x: -1, y: -1 });
        // Dragging up-left on the top-left handle grows the element.
        let update = ctl
            .update(
                Pointer { x: -5.0, y: -7.0 },
                &viewport,
                Pointer { x: 0.0, y: 0.0 },
            )
            .unwrap();
        assert_eq!(update.width, Some(el.width + 10.0));
        assert_eq!(update.height, Some(el.height + 14.0));
    }

    #[test]
    fn text_resize_uses_container_and_font_rules() {
        let viewport = Viewport::identity(canvas());
        let el = text();
        let mut ctl = GestureController::<TextElement>::default();

        ctl.begin_resize(&el, Pointer { x: 0.0, y: 0.0 }, HandleDir { x: 1, y: 0 });
        let update = ctl
            .update(
                Pointer { x: 10_000.0, y: 0.0 },
                &viewport,
                Pointer { x: 0.0, y: 0.0 },
            )
            .unwrap();
        assert_eq!(update.size, Some(1080.0));
        assert_eq!(update.font_size, None);

        ctl.begin_resize(&el, Pointer { x: 0.0, y: 0.0 }, HandleDir { x: 0, y: 1 });
        let update = ctl
            .update(Pointer { x: 0.0, y: 40.0 }, &viewport, Pointer { x: 0.0, y: 0.0 })
            .unwrap();
        // Font gain is 0.5: 40px of drag adds 20 to the start font size.
        assert_eq!(update.font_size, Some(el.font_size + 20.0));

        let update = ctl
            .update(
                Pointer { x: 0.0, y: -10_000.0 },
                &viewport,
                Pointer { x: 0.0, y: 0.0 },
            )
            .unwrap();
        assert_eq!(update.font_size, Some(20.0));
    }

    #[test]
    fn resize_never_compounds_across_updates() {
        let viewport = Viewport::identity(canvas());
        let el = image();
        let mut ctl = GestureController::<ImageElement>::default();
        ctl.begin_resize(&el, Pointer { x: 0.0, y: 0.0 }, HandleDir { x: 1, y: 0 });
        let a = ctl
            .update(Pointer { x: 10.0, y: 0.0 }, &viewport, Pointer { x: 0.0, y: 0.0 })
            .unwrap();
        let _ = ctl
            .update(Pointer { x: 50.0, y: 0.0 }, &viewport, Pointer { x: 0.0, y: 0.0 })
            .unwrap();
        let b = ctl
            .update(Pointer { x: 10.0, y: 0.0 }, &viewport, Pointer { x: 0.0, y: 0.0 })
            .unwrap();
        assert_eq!(a.width, b.width);
    }

    #[test]
    fn rotation_wraps_and_rounds() {
        let viewport = Viewport::identity(canvas());
        let mut el = image();
        el.rotation = 350.0;
        let center = Pointer { x: 100.0, y: 100.0 };
        let mut ctl = GestureController::<ImageElement>::default();
        // Start directly right of center (0 degrees).
        ctl.begin_rotate(&el, Pointer { x: 200.0, y: 100.0 }, center);
        // Move to 30 degrees below the x axis: 350 + 30 wraps to 20.
        let p = Pointer {
            x: 100.0 + 30f64.to_radians().cos() * 100.0,
            y: 100.0 + 30f64.to_radians().sin() * 100.0,
        };
        let update = ctl.update(p, &viewport, center).unwrap();
        assert_eq!(update.rotation, Some(20.0));
    }

    #[test]
    fn gesture_lifecycle() {
        let el = image();
        let mut ctl = GestureController::<ImageElement>::default();
        assert_eq!(ctl.kind(), None);
        ctl.begin_move(&el, Pointer { x: 0.0, y: 0.0 });
        assert_eq!(ctl.kind(), Some(GestureKind::Move));
        ctl.end();
        assert_eq!(ctl.kind(), None);
        assert!(
            ctl.update(
                Pointer { x: 1.0, y: 1.0 },
                &Viewport::identity(canvas()),
                Pointer { x: 0.0, y: 0.0 }
            )
            .is_none()
        );
    }
}
