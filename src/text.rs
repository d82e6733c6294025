//! Text wrapping, line metrics and Parley-backed shaping.
//!
//! Wrapping is greedy and measurement-driven so it stays stable for a given
//! font: the same text, family and container width always produce the same
//! line breaks. Shaping goes through a [`FontLibrary`] holding Parley
//! contexts; families that were never registered are reported as missing and
//! the caller skips drawing them.

use std::collections::HashMap;

use crate::error::{StoryError, StoryResult};

/// Wrap containers narrower than this are widened to it.
pub const MIN_WRAP_WIDTH: f64 = 100.0;
/// Container width used when the element does not carry one.
pub const DEFAULT_WRAP_WIDTH: f64 = 700.0;
/// Vertical advance between wrapped lines, as a multiple of font size.
pub const LINE_HEIGHT_FACTOR: f64 = 1.2;

pub fn wrap_width(size: f64) -> f64 {
    let w = if size > 0.0 { size } else { DEFAULT_WRAP_WIDTH };
    w.max(MIN_WRAP_WIDTH)
}

/// Width measurement used by the wrapper. Implemented by [`FontLibrary`]
/// and by fixed-advance fakes in tests.
pub trait TextMeasure {
    fn text_width(&mut self, text: &str, font_family: &str, font_size: f64) -> f64;
}

/// Greedy wrap of `text` into lines no wider than `max_width`. Explicit
/// newlines always break; `break_words` switches from word to character
/// granularity. A single fragment wider than the container stays on its own
/// line rather than being dropped.
pub fn wrap_lines(
    text: &str,
    font_family: &str,
    font_size: f64,
    max_width: f64,
    break_words: bool,
    measure: &mut dyn TextMeasure,
) -> Vec<String> {
    let mut lines = Vec::new();
    for raw in text.split('\n') {
        if raw.is_empty() {
            lines.push(String::new());
            continue;
        }
        if break_words {
            wrap_by_chars(raw, font_family, font_size, max_width, measure, &mut lines);
        } else {
            wrap_by_words(raw, font_family, font_size, max_width, measure, &mut lines);
        }
    }
    lines
}

fn wrap_by_words(
    raw: &str,
    family: &str,
    size: f64,
    max_width: f64,
    measure: &mut dyn TextMeasure,
    out: &mut Vec<String>,
) {
    let mut current = String::new();
    for word in raw.split_whitespace() {
        if current.is_empty() {
            current.push_str(word);
            continue;
        }
        let candidate = format!("{current} {word}");
        if measure.text_width(&candidate, family, size) <= max_width {
            current = candidate;
        } else {
            out.push(std::mem::take(&mut current));
            current.push_str(word);
        }
    }
    if !current.is_empty() {
        out.push(current);
    }
}

fn wrap_by_chars(
    raw: &str,
    family: &str,
    size: f64,
    max_width: f64,
    measure: &mut dyn TextMeasure,
    out: &mut Vec<String>,
) {
    let mut current = String::new();
    for ch in raw.chars() {
        if current.is_empty() {
            current.push(ch);
            continue;
        }
        let mut candidate = current.clone();
        candidate.push(ch);
        if measure.text_width(&candidate, family, size) <= max_width {
            current = candidate;
        } else {
            out.push(std::mem::take(&mut current));
            current.push(ch);
        }
    }
    if !current.is_empty() {
        out.push(current);
    }
}

/// Vertical center offset of line `index` out of `count`, relative to the
/// element center. The whole block is centered on the element.
pub fn line_center_offset(font_size: f64, index: usize, count: usize) -> f64 {
    let lh = font_size * LINE_HEIGHT_FACTOR;
    let block = lh * count as f64;
    -block / 2.0 + lh / 2.0 + lh * index as f64
}

/// RGBA8 brush color carried through Parley layouts.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TextBrush {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

/// Registered font families plus the Parley contexts for shaping them.
pub struct FontLibrary {
    font_ctx: parley::FontContext,
    layout_ctx: parley::LayoutContext<TextBrush>,
    /// Requested family (lowercased) -> name Parley registered it under.
    families: HashMap<String, String>,
    /// Requested family (lowercased) -> font data for glyph rendering.
    fonts: HashMap<String, vello_cpu::peniko::FontData>,
}

impl Default for FontLibrary {
    fn default() -> Self {
        Self::new()
    }
}

impl FontLibrary {
    pub fn new() -> Self {
        Self {
            font_ctx: parley::FontContext::default(),
            layout_ctx: parley::LayoutContext::new(),
            families: HashMap::new(),
            fonts: HashMap::new(),
        }
    }

    /// Registers raw font bytes under `family`. Later layouts referencing
    /// that family resolve to the first face in the data.
    pub fn register(&mut self, family: &str, font_bytes: Vec<u8>) -> StoryResult<()> {
        let registered = self
            .font_ctx
            .collection
            .register_fonts(parley::fontique::Blob::from(font_bytes.clone()), None);
        let family_id = registered
            .first()
            .map(|(id, _)| *id)
            .ok_or_else(|| StoryError::resource("no font families registered from font bytes"))?;
        let family_name = self
            .font_ctx
            .collection
            .family_name(family_id)
            .ok_or_else(|| StoryError::resource("registered font family has no name"))?
            .to_string();

        let key = family.to_lowercase();
        self.families.insert(key.clone(), family_name);
        self.fonts.insert(
            key,
            vello_cpu::peniko::FontData::new(
                vello_cpu::peniko::Blob::from(font_bytes),
                0,
            ),
        );
        Ok(())
    }

    pub fn is_registered(&self, family: &str) -> bool {
        self.families.contains_key(&family.to_lowercase())
    }

    /// Font data for glyph rendering, if the family is registered.
    pub fn font_data(&self, family: &str) -> Option<&vello_cpu::peniko::FontData> {
        self.fonts.get(&family.to_lowercase())
    }

    /// Shapes a single pre-wrapped line. Returns `None` for unregistered
    /// families.
    pub fn layout_line(
        &mut self,
        text: &str,
        family: &str,
        font_size: f32,
        brush: TextBrush,
    ) -> Option<parley::Layout<TextBrush>> {
        let family_name = self.families.get(&family.to_lowercase())?.clone();
        let mut builder = self
            .layout_ctx
            .ranged_builder(&mut self.font_ctx, text, 1.0, true);
        builder.push_default(parley::style::StyleProperty::FontStack(
            parley::style::FontStack::Source(std::borrow::Cow::Owned(family_name)),
        ));
        builder.push_default(parley::style::StyleProperty::FontSize(font_size));
        builder.push_default(parley::style::StyleProperty::Brush(brush));

        let mut layout: parley::Layout<TextBrush> = builder.build(text);
        layout.break_all_lines(None);
        Some(layout)
    }
}

impl TextMeasure for FontLibrary {
    fn text_width(&mut self, text: &str, font_family: &str, font_size: f64) -> f64 {
        self.layout_line(text, font_family, font_size as f32, TextBrush::default())
            .map(|l| f64::from(l.width()))
            .unwrap_or(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Fixed-advance measurer: every char is half the font size wide.
    struct FixedMeasure;

    impl TextMeasure for FixedMeasure {
        fn text_width(&mut self, text: &str, _family: &str, font_size: f64) -> f64 {
            text.chars().count() as f64 * font_size * 0.5
        }
    }

    #[test]
    fn wrap_width_defaults_and_floors() {
        assert_eq!(wrap_width(0.0), DEFAULT_WRAP_WIDTH);
        assert_eq!(wrap_width(50.0), MIN_WRAP_WIDTH);
        assert_eq!(wrap_width(300.0), 300.0);
    }

    #[test]
    fn word_wrap_is_greedy() {
        // 10px font, 5px per char, 50px container: 10 chars per line.
        let lines = wrap_lines("aa bb cc dd", "x", 10.0, 50.0, false, &mut FixedMeasure);
        assert_eq!(lines, vec!["aa bb cc", "dd"]);
    }

    #[test]
    fn oversized_word_stays_on_own_line() {
        let lines = wrap_lines(
            "tiny enormousword tiny",
            "x",
            10.0,
            50.0,
            false,
            &mut FixedMeasure,
        );
        assert_eq!(lines, vec!["tiny", "enormousword", "tiny"]);
    }

    #[test]
    fn char_wrap_splits_mid_word() {
        let lines = wrap_lines("abcdefghijkl", "x", 10.0, 25.0, true, &mut FixedMeasure);
        assert_eq!(lines, vec!["abcde", "fghij", "kl"]);
    }

    #[test]
    fn explicit_newlines_always_break() {
        let lines = wrap_lines("a\n\nb", "x", 10.0, 500.0, false, &mut FixedMeasure);
        assert_eq!(lines, vec!["a", "", "b"]);
    }

    #[test]
    fn line_offsets_center_the_block() {
        // Three 12px lines at 1.2 line height: block is 43.2 tall.
        let offsets: Vec<f64> = (0..3).map(|i| line_center_offset(12.0, i, 3)).collect();
        assert!((offsets[0] + 14.4).abs() < 1e-9);
        assert!(offsets[1].abs() < 1e-9);
        assert!((offsets[2] - 14.4).abs() < 1e-9);
        // Single line sits exactly on the center.
        assert_eq!(line_center_offset(60.0, 0, 1), 0.0);
    }

    #[test]
    fn unregistered_family_measures_zero() {
        let mut lib = FontLibrary::new();
        assert!(!lib.is_registered("Nope"));
        assert_eq!(lib.text_width("hello", "Nope", 16.0), 0.0);
        assert!(lib.font_data("Nope").is_none());
    }
}
