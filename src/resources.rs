//! Decoded raster resources keyed by their source reference.
//!
//! The store never performs I/O: the embedding layer fetches bytes however it
//! likes and inserts them here. Every insert bumps a generation counter so
//! schedulers can tell a stale redraw from a current one.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Context;
use tracing::debug;

use crate::error::{StoryError, StoryResult};
use crate::frame::premultiply_rgba8_in_place;

/// A decoded bitmap, premultiplied RGBA8.
#[derive(Clone, Debug)]
pub struct PreparedImage {
    pub width: u32,
    pub height: u32,
    pub rgba8_premul: Arc<Vec<u8>>,
}

pub fn decode_image(bytes: &[u8]) -> StoryResult<PreparedImage> {
    let dyn_img = image::load_from_memory(bytes).context("decode image from memory")?;
    let rgba = dyn_img.to_rgba8();
    let (width, height) = rgba.dimensions();

    let mut rgba8_premul = rgba.into_raw();
    premultiply_rgba8_in_place(&mut rgba8_premul);

    Ok(PreparedImage {
        width,
        height,
        rgba8_premul: Arc::new(rgba8_premul),
    })
}

#[derive(Default)]
pub struct ResourceStore {
    images: HashMap<String, PreparedImage>,
    paints: HashMap<String, vello_cpu::Image>,
    /// Per-source revision, bumped when a source's pixels are replaced.
    revisions: HashMap<String, u64>,
    generation: u64,
}

impl ResourceStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decodes and stores encoded image bytes under `src`.
    pub fn insert_bytes(&mut self, src: &str, bytes: &[u8]) -> StoryResult<()> {
        let prepared = decode_image(bytes)?;
        self.insert_prepared(src, prepared);
        Ok(())
    }

    /// Stores an already-decoded straight RGBA8 buffer under `src`.
    pub fn insert_rgba8(
        &mut self,
        src: &str,
        width: u32,
        height: u32,
        mut rgba8: Vec<u8>,
    ) -> StoryResult<()> {
        if rgba8.len() != width as usize * height as usize * 4 {
            return Err(StoryError::resource(format!(
                "resource '{src}': buffer does not match {width}x{height}"
            )));
        }
        premultiply_rgba8_in_place(&mut rgba8);
        self.insert_prepared(
            src,
            PreparedImage {
                width,
                height,
                rgba8_premul: Arc::new(rgba8),
            },
        );
        Ok(())
    }

    fn insert_prepared(&mut self, src: &str, prepared: PreparedImage) {
        debug!(src, width = prepared.width, height = prepared.height, "resource inserted");
        self.images.insert(src.to_string(), prepared);
        self.paints.remove(src);
        self.generation += 1;
        self.revisions.insert(src.to_string(), self.generation);
    }

    pub fn remove(&mut self, src: &str) {
        if self.images.remove(src).is_some() {
            self.paints.remove(src);
            self.generation += 1;
        }
    }

    /// Revision of the pixels currently stored under `src`, 0 when absent.
    /// Derived caches key on this so replacing a source's bytes invalidates
    /// everything baked from the old pixels.
    pub fn revision(&self, src: &str) -> u64 {
        self.revisions.get(src).copied().unwrap_or(0)
    }

    pub fn contains(&self, src: &str) -> bool {
        self.images.contains_key(src)
    }

    pub fn get(&self, src: &str) -> Option<&PreparedImage> {
        self.images.get(src)
    }

    /// Monotonic counter, bumped on every insert/remove.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Image paint for the rasterizer, built lazily and cached per source.
    pub fn paint_for(&mut self, src: &str) -> StoryResult<Option<vello_cpu::Image>> {
        if let Some(paint) = self.paints.get(src) {
            return Ok(Some(paint.clone()));
        }
        let Some(img) = self.images.get(src) else {
            return Ok(None);
        };
        let pixmap = crate::compositor::image_premul_bytes_to_pixmap(
            img.rgba8_premul.as_slice(),
            img.width,
            img.height,
        )?;
        let paint = crate::compositor::image_paint(pixmap);
        self.paints.insert(src.to_string(), paint.clone());
        Ok(Some(paint))
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    fn png_bytes(rgba: [u8; 4]) -> Vec<u8> {
        let img = image::RgbaImage::from_raw(1, 1, rgba.to_vec()).unwrap();
        let mut buf = Vec::new();
        image::DynamicImage::ImageRgba8(img)
            .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
            .unwrap();
        buf
    }

    #[test]
    fn decode_premultiplies() {
        let prepared = decode_image(&png_bytes([100, 50, 200, 128])).unwrap();
        assert_eq!((prepared.width, prepared.height), (1, 1));
        assert_eq!(
            prepared.rgba8_premul.as_slice(),
            &[
                ((100u16 * 128 + 127) / 255) as u8,
                ((50u16 * 128 + 127) / 255) as u8,
                ((200u16 * 128 + 127) / 255) as u8,
                128
            ]
        );
    }

    #[test]
    fn generation_bumps_on_insert_and_remove() {
        let mut store = ResourceStore::new();
        assert_eq!(store.generation(), 0);
        assert_eq!(store.revision("a"), 0);
        store.insert_rgba8("a", 1, 1, vec![1, 2, 3, 255]).unwrap();
        assert_eq!(store.generation(), 1);
        assert_eq!(store.revision("a"), 1);
        assert!(store.contains("a"));
        // Replacing the pixels moves the revision forward.
        store.insert_rgba8("a", 1, 1, vec![9, 9, 9, 255]).unwrap();
        assert_eq!(store.revision("a"), 2);
        store.remove("a");
        assert_eq!(store.generation(), 3);
        // Removing a missing key is a no-op.
        store.remove("a");
        assert_eq!(store.generation(), 3);
    }

    #[test]
    fn insert_rgba8_checks_dimensions() {
        let mut store = ResourceStore::new();
        assert!(store.insert_rgba8("a", 2, 2, vec![0; 8]).is_err());
    }

    #[test]
    fn paint_is_cached_until_reinsert() {
        let mut store = ResourceStore::new();
        store
            .insert_rgba8("a", 1, 1, vec![10, 20, 30, 255])
            .unwrap();
        assert!(store.paint_for("a").unwrap().is_some());
        assert!(store.paint_for("missing").unwrap().is_none());
    }
}
