use crate::error::{StoryError, StoryResult};

/// Default logical canvas size (9:16 story format).
pub const DEFAULT_CANVAS_WIDTH: u32 = 1080;
pub const DEFAULT_CANVAS_HEIGHT: u32 = 1920;

/// Logical canvas dimensions. All element geometry is expressed in this
/// coordinate space, independent of on-screen display size.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct CanvasSize {
    pub width: u32,
    pub height: u32,
}

impl Default for CanvasSize {
    fn default() -> Self {
        Self {
            width: DEFAULT_CANVAS_WIDTH,
            height: DEFAULT_CANVAS_HEIGHT,
        }
    }
}

impl CanvasSize {
    pub fn new(width: u32, height: u32) -> StoryResult<Self> {
        if width == 0 || height == 0 {
            return Err(StoryError::validation("canvas width/height must be > 0"));
        }
        Ok(Self { width, height })
    }

    pub fn aspect(self) -> f64 {
        f64::from(self.width) / f64::from(self.height)
    }
}

/// Straight (non-premultiplied) RGBA8 color. Serializes as `#rrggbb` or
/// `#rrggbbaa` hex.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const BLACK: Color = Color::rgb(0, 0, 0);
    pub const WHITE: Color = Color::rgb(255, 255, 255);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    pub fn from_hex(s: &str) -> StoryResult<Self> {
        let hex = s.strip_prefix('#').unwrap_or(s);
        let parse = |h: &str| {
            u8::from_str_radix(h, 16)
                .map_err(|_| StoryError::validation(format!("invalid hex color '{s}'")))
        };
        match hex.len() {
            6 => Ok(Self {
                r: parse(&hex[0..2])?,
                g: parse(&hex[2..4])?,
                b: parse(&hex[4..6])?,
                a: 255,
            }),
            8 => Ok(Self {
                r: parse(&hex[0..2])?,
                g: parse(&hex[2..4])?,
                b: parse(&hex[4..6])?,
                a: parse(&hex[6..8])?,
            }),
            _ => Err(StoryError::validation(format!(
                "hex color '{s}' must be #rrggbb or #rrggbbaa"
            ))),
        }
    }

    pub fn to_hex(self) -> String {
        if self.a == 255 {
            format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
        } else {
            format!("#{:02x}{:02x}{:02x}{:02x}", self.r, self.g, self.b, self.a)
        }
    }
}

impl serde::Serialize for Color {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> serde::Deserialize<'de> for Color {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Color::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

/// Stable identity for a scene element.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
pub struct ElementId(pub u64);

impl std::fmt::Display for ElementId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NamedFilter {
    #[default]
    Normal,
    Grayscale,
    Sepia,
    Negative,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CornerStyle {
    Square,
    #[default]
    Rounded,
    Circle,
    Custom,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackgroundMode {
    #[default]
    Fit,
    Stretch,
    Solid,
    Gradient,
    Blur,
    Repeat,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BlurMode {
    #[default]
    Fit,
    Stretch,
}

/// Optional effect parameters stored on the background. Round-trips through
/// scene serialization; the renderer does not apply these.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct BackgroundEffects {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub brightness: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contrast: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blur: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mirror_h: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mirror_v: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<NamedFilter>,
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct BackgroundSettings {
    pub mode: BackgroundMode,
    pub solid_color: Color,
    pub gradient_start: Color,
    pub gradient_end: Color,
    /// Gradient direction in degrees.
    pub gradient_angle: f64,
    pub blur_mode: BlurMode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub effects: Option<BackgroundEffects>,
}

impl Default for BackgroundSettings {
    fn default() -> Self {
        Self {
            mode: BackgroundMode::Fit,
            solid_color: Color::BLACK,
            gradient_start: Color::rgb(0x66, 0x7e, 0xea),
            gradient_end: Color::rgb(0x76, 0x4b, 0xa2),
            gradient_angle: 45.0,
            blur_mode: BlurMode::Fit,
            effects: None,
        }
    }
}

/// A text block positioned by its center point in canvas space.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct TextElement {
    pub id: ElementId,
    pub text: String,
    pub x: f64,
    pub y: f64,
    /// Maximum container width used for wrapping.
    pub size: f64,
    pub font_size: f64,
    pub font_family: String,
    pub color: Color,
    /// Rotation in degrees, [0, 360).
    pub rotation: f64,
    pub outline_width: f64,
    pub outline_color: Color,
    /// Wrap by characters instead of words.
    #[serde(default)]
    pub break_words: bool,
}

impl TextElement {
    pub fn new(id: ElementId, canvas: CanvasSize) -> Self {
        Self {
            id,
            text: "New Text".to_string(),
            x: f64::from(canvas.width) / 2.0,
            y: f64::from(canvas.height) / 2.0,
            size: 700.0,
            font_size: 60.0,
            font_family: "Arial".to_string(),
            color: Color::WHITE,
            rotation: 0.0,
            outline_width: 0.0,
            outline_color: Color::BLACK,
            break_words: false,
        }
    }

    pub fn validate(&self) -> StoryResult<()> {
        for (name, v) in [
            ("x", self.x),
            ("y", self.y),
            ("size", self.size),
            ("font_size", self.font_size),
            ("rotation", self.rotation),
            ("outline_width", self.outline_width),
        ] {
            if !v.is_finite() {
                return Err(StoryError::validation(format!(
                    "text element '{}': {name} must be finite",
                    self.id
                )));
            }
        }
        if self.font_size <= 0.0 {
            return Err(StoryError::validation(format!(
                "text element '{}': font_size must be > 0",
                self.id
            )));
        }
        if self.outline_width < 0.0 {
            return Err(StoryError::validation(format!(
                "text element '{}': outline_width must be >= 0",
                self.id
            )));
        }
        Ok(())
    }
}

/// Minimum width/height of an image element in canvas pixels.
pub const MIN_IMAGE_DIM: f64 = 10.0;

/// An embedded raster image positioned by its center point in canvas space.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ImageElement {
    pub id: ElementId,
    /// Opaque source reference, resolved through the renderer's resource cache.
    pub src: String,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    /// Rotation in degrees, [0, 360).
    pub rotation: f64,
    pub corner_style: CornerStyle,
    /// Corner radius for `Custom`, and the override for `Rounded`.
    pub border_radius: f64,
    pub outline_width: f64,
    pub outline_color: Color,
    /// Multiplier in [0, 2], 1 = identity.
    pub brightness: f64,
    /// Multiplier in [0, 2], 1 = identity.
    pub contrast: f64,
    /// Blur radius in pixels, >= 0.
    pub blur: f64,
    pub mirror_h: bool,
    pub mirror_v: bool,
    pub filter: NamedFilter,
}

impl ImageElement {
    /// New element at the canvas center, contain-scaled into a 600x600 box
    /// (never upscaled), with the default rounded corner radius.
    pub fn new(id: ElementId, src: impl Into<String>, natural: (u32, u32), canvas: CanvasSize) -> Self {
        let (nw, nh) = (f64::from(natural.0.max(1)), f64::from(natural.1.max(1)));
        let scale = (600.0 / nw).min(600.0 / nh).min(1.0);
        let width = (nw * scale).round().max(MIN_IMAGE_DIM);
        let height = (nh * scale).round().max(MIN_IMAGE_DIM);
        Self {
            id,
            src: src.into(),
            x: f64::from(canvas.width) / 2.0,
            y: f64::from(canvas.height) / 2.0,
            width,
            height,
            rotation: 0.0,
            corner_style: CornerStyle::Rounded,
            border_radius: (width.min(height) / 10.0).round(),
            outline_width: 0.0,
            outline_color: Color::BLACK,
            brightness: 1.0,
            contrast: 1.0,
            blur: 0.0,
            mirror_h: false,
            mirror_v: false,
            filter: NamedFilter::Normal,
        }
    }

    pub fn validate(&self) -> StoryResult<()> {
        for (name, v) in [
            ("x", self.x),
            ("y", self.y),
            ("width", self.width),
            ("height", self.height),
            ("rotation", self.rotation),
            ("border_radius", self.border_radius),
            ("outline_width", self.outline_width),
            ("brightness", self.brightness),
            ("contrast", self.contrast),
            ("blur", self.blur),
        ] {
            if !v.is_finite() {
                return Err(StoryError::validation(format!(
                    "image element '{}': {name} must be finite",
                    self.id
                )));
            }
        }
        if self.width < MIN_IMAGE_DIM || self.height < MIN_IMAGE_DIM {
            return Err(StoryError::validation(format!(
                "image element '{}': width/height must be >= {MIN_IMAGE_DIM}",
                self.id
            )));
        }
        if !(0.0..=2.0).contains(&self.brightness) || !(0.0..=2.0).contains(&self.contrast) {
            return Err(StoryError::validation(format!(
                "image element '{}': brightness/contrast must be in [0, 2]",
                self.id
            )));
        }
        if self.blur < 0.0 {
            return Err(StoryError::validation(format!(
                "image element '{}': blur must be >= 0",
                self.id
            )));
        }
        Ok(())
    }
}

/// Partial update for a text element, merged field-by-field.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct TextUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_size: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_family: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<Color>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rotation: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outline_width: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outline_color: Option<Color>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub break_words: Option<bool>,
}

impl TextUpdate {
    pub fn apply(&self, el: &mut TextElement) {
        if let Some(v) = &self.text {
            el.text = v.clone();
        }
        if let Some(v) = self.x {
            el.x = v;
        }
        if let Some(v) = self.y {
            el.y = v;
        }
        if let Some(v) = self.size {
            el.size = v;
        }
        if let Some(v) = self.font_size {
            el.font_size = v;
        }
        if let Some(v) = &self.font_family {
            el.font_family = v.clone();
        }
        if let Some(v) = self.color {
            el.color = v;
        }
        if let Some(v) = self.rotation {
            el.rotation = v;
        }
        if let Some(v) = self.outline_width {
            el.outline_width = v;
        }
        if let Some(v) = self.outline_color {
            el.outline_color = v;
        }
        if let Some(v) = self.break_words {
            el.break_words = v;
        }
    }
}

/// Partial update for an image element, merged field-by-field.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ImageUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rotation: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub corner_style: Option<CornerStyle>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub border_radius: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outline_width: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outline_color: Option<Color>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub brightness: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contrast: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blur: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mirror_h: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mirror_v: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<NamedFilter>,
}

impl ImageUpdate {
    pub fn apply(&self, el: &mut ImageElement) {
        if let Some(v) = self.x {
            el.x = v;
        }
        if let Some(v) = self.y {
            el.y = v;
        }
        if let Some(v) = self.width {
            el.width = v;
        }
        if let Some(v) = self.height {
            el.height = v;
        }
        if let Some(v) = self.rotation {
            el.rotation = v;
        }
        if let Some(v) = self.corner_style {
            el.corner_style = v;
        }
        if let Some(v) = self.border_radius {
            el.border_radius = v;
        }
        if let Some(v) = self.outline_width {
            el.outline_width = v;
        }
        if let Some(v) = self.outline_color {
            el.outline_color = v;
        }
        if let Some(v) = self.brightness {
            el.brightness = v;
        }
        if let Some(v) = self.contrast {
            el.contrast = v;
        }
        if let Some(v) = self.blur {
            el.blur = v;
        }
        if let Some(v) = self.mirror_h {
            el.mirror_h = v;
        }
        if let Some(v) = self.mirror_v {
            el.mirror_v = v;
        }
        if let Some(v) = self.filter {
            el.filter = v;
        }
    }
}

/// A named canvas-size preset.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct AspectRatio {
    pub id: String,
    pub name: String,
    pub width: u32,
    pub height: u32,
}

impl AspectRatio {
    pub fn custom(width: u32, height: u32) -> StoryResult<Self> {
        let size = CanvasSize::new(width, height)?;
        Ok(Self {
            id: "custom".to_string(),
            name: format!("Custom {}x{}", size.width, size.height),
            width,
            height,
        })
    }

    pub fn canvas_size(&self) -> CanvasSize {
        CanvasSize {
            width: self.width,
            height: self.height,
        }
    }

    /// Built-in presets, story format first.
    pub fn presets() -> Vec<AspectRatio> {
        let named = [
            ("instagram-story", "Instagram Story", 1080, 1920),
            ("instagram-post", "Instagram Post", 1080, 1080),
            ("tiktok", "TikTok", 1080, 1920),
            ("facebook-post", "Facebook Post", 1200, 630),
            ("twitter-post", "Twitter Post", 1200, 675),
            ("youtube-thumbnail", "YouTube Thumbnail", 1280, 720),
        ];
        named
            .into_iter()
            .map(|(id, name, width, height)| AspectRatio {
                id: id.to_string(),
                name: name.to_string(),
                width,
                height,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn color_hex_roundtrip() {
        let c = Color::from_hex("#112233").unwrap();
        assert_eq!((c.r, c.g, c.b, c.a), (0x11, 0x22, 0x33, 255));
        assert_eq!(c.to_hex(), "#112233");

        let c = Color::from_hex("#11223344").unwrap();
        assert_eq!(c.a, 0x44);
        assert_eq!(c.to_hex(), "#11223344");

        assert!(Color::from_hex("#12").is_err());
        assert!(Color::from_hex("zzzzzz").is_err());
    }

    #[test]
    fn json_roundtrip_text_element() {
        let el = TextElement::new(ElementId(1), CanvasSize::default());
        let s = serde_json::to_string(&el).unwrap();
        let de: TextElement = serde_json::from_str(&s).unwrap();
        assert_eq!(de, el);
        assert!(s.contains("#ffffff"));
    }

    #[test]
    fn new_image_contain_scales_into_600_box() {
        let canvas = CanvasSize::default();
        let el = ImageElement::new(ElementId(1), "a.png", (3000, 1500), canvas);
        assert_eq!(el.width, 600.0);
        assert_eq!(el.height, 300.0);
        assert_eq!(el.border_radius, 30.0);

        // Small sources are never upscaled.
        let el = ImageElement::new(ElementId(2), "b.png", (120, 80), canvas);
        assert_eq!(el.width, 120.0);
        assert_eq!(el.height, 80.0);
    }

    #[test]
    fn validate_rejects_non_finite_and_out_of_range() {
        let canvas = CanvasSize::default();
        let mut el = ImageElement::new(ElementId(1), "a.png", (100, 100), canvas);
        el.validate().unwrap();

        el.brightness = 3.0;
        assert!(el.validate().is_err());
        el.brightness = 1.0;
        el.x = f64::NAN;
        assert!(el.validate().is_err());

        let mut t = TextElement::new(ElementId(2), canvas);
        t.validate().unwrap();
        t.outline_width = -1.0;
        assert!(t.validate().is_err());
    }

    #[test]
    fn partial_update_merges_only_set_fields() {
        let canvas = CanvasSize::default();
        let mut el = ImageElement::new(ElementId(1), "a.png", (100, 100), canvas);
        let rotation_before = el.rotation;
        let update = ImageUpdate {
            x: Some(10.0),
            filter: Some(NamedFilter::Sepia),
            ..ImageUpdate::default()
        };
        update.apply(&mut el);
        assert_eq!(el.x, 10.0);
        assert_eq!(el.filter, NamedFilter::Sepia);
        assert_eq!(el.rotation, rotation_before);
    }

    #[test]
    fn aspect_ratio_presets_and_custom() {
        let presets = AspectRatio::presets();
        assert!(presets.iter().any(|p| p.id == "instagram-story"));
        let story = presets.iter().find(|p| p.id == "instagram-story").unwrap();
        assert_eq!(story.canvas_size(), CanvasSize::default());

        assert!(AspectRatio::custom(0, 100).is_err());
        let c = AspectRatio::custom(800, 600).unwrap();
        assert_eq!(c.canvas_size().width, 800);
    }
}
