//! Frame export to common still-image formats.

use std::io::Cursor;

use image::codecs::jpeg::JpegEncoder;
use image::codecs::webp::WebPEncoder;
use image::{ExtendedColorType, ImageFormat, RgbaImage};

use crate::error::{StoryError, StoryResult};
use crate::frame::Frame;

pub const DEFAULT_JPEG_QUALITY: u8 = 95;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExportFormat {
    Png,
    Jpeg { quality: u8 },
    /// Lossless WebP.
    WebP,
}

impl ExportFormat {
    pub fn jpeg() -> Self {
        Self::Jpeg {
            quality: DEFAULT_JPEG_QUALITY,
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpeg { .. } => "jpg",
            Self::WebP => "webp",
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Png => "image/png",
            Self::Jpeg { .. } => "image/jpeg",
            Self::WebP => "image/webp",
        }
    }
}

/// Encodes a rendered frame. JPEG has no alpha channel, so the frame is
/// flattened to RGB first; PNG and WebP keep the full RGBA data.
pub fn encode_frame(frame: &Frame, format: ExportFormat) -> StoryResult<Vec<u8>> {
    let img = RgbaImage::from_raw(frame.width, frame.height, frame.rgba8.clone())
        .ok_or_else(|| StoryError::render("frame buffer does not match its dimensions"))?;

    let mut buf = Vec::new();
    match format {
        ExportFormat::Png => {
            img.write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
                .map_err(|e| StoryError::render(format!("png encode: {e}")))?;
        }
        ExportFormat::Jpeg { quality } => {
            let rgb = image::DynamicImage::ImageRgba8(img).to_rgb8();
            JpegEncoder::new_with_quality(&mut Cursor::new(&mut buf), quality)
                .encode_image(&rgb)
                .map_err(|e| StoryError::render(format!("jpeg encode: {e}")))?;
        }
        ExportFormat::WebP => {
            WebPEncoder::new_lossless(&mut Cursor::new(&mut buf))
                .encode(img.as_raw(), frame.width, frame.height, ExtendedColorType::Rgba8)
                .map_err(|e| StoryError::render(format!("webp encode: {e}")))?;
        }
    }
    Ok(buf)
}
