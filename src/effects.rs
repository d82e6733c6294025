//! Per-pixel color adjustments for image elements and the cache key that
//! identifies a baked result.
//!
//! Color math runs on straight (non-premultiplied) RGBA so brightness and
//! contrast do not bleed into the alpha channel; the caller premultiplies
//! afterwards and hands the buffer to the blur pass.

use crate::model::{ImageElement, NamedFilter};

/// Whether the element carries any per-pixel color adjustment. Scaling and
/// mirroring happen in the bake regardless; this only gates the straight-RGBA
/// round trip.
pub fn needs_color_ops(el: &ImageElement) -> bool {
    el.brightness != 1.0 || el.contrast != 1.0 || el.filter != NamedFilter::Normal
}

/// Cache key for a baked (effects-applied) image. Float fields are keyed by
/// bit pattern so -0.0 and 0.0 stay distinct inputs rather than colliding
/// with NaN handling.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct EffectKey {
    pub src: String,
    /// Resource-store revision of `src`; replacing the stored pixels changes
    /// this and orphans every key baked from the old ones.
    pub revision: u64,
    pub width_bits: u64,
    pub height_bits: u64,
    pub brightness_bits: u64,
    pub contrast_bits: u64,
    pub blur_bits: u64,
    pub mirror_h: bool,
    pub mirror_v: bool,
    pub filter: NamedFilter,
}

impl EffectKey {
    pub fn of(el: &ImageElement, revision: u64) -> Self {
        Self {
            src: el.src.clone(),
            revision,
            width_bits: el.width.to_bits(),
            height_bits: el.height.to_bits(),
            brightness_bits: el.brightness.to_bits(),
            contrast_bits: el.contrast.to_bits(),
            blur_bits: el.blur.to_bits(),
            mirror_h: el.mirror_h,
            mirror_v: el.mirror_v,
            filter: el.filter,
        }
    }
}

/// Applies brightness, contrast and the named filter in place on straight
/// RGBA8. Alpha is untouched.
pub fn apply_color_ops(rgba: &mut [u8], brightness: f64, contrast: f64, filter: NamedFilter) {
    let b = brightness as f32;
    let k = contrast as f32;
    let skip_bc = brightness == 1.0 && contrast == 1.0;
    for px in rgba.chunks_exact_mut(4) {
        let mut r = f32::from(px[0]);
        let mut g = f32::from(px[1]);
        let mut bl = f32::from(px[2]);

        if !skip_bc {
            r = (r * b - 127.5) * k + 127.5;
            g = (g * b - 127.5) * k + 127.5;
            bl = (bl * b - 127.5) * k + 127.5;
        }

        match filter {
            NamedFilter::Normal => {}
            NamedFilter::Grayscale => {
                let y = 0.2126 * r + 0.7152 * g + 0.0722 * bl;
                r = y;
                g = y;
                bl = y;
            }
            NamedFilter::Sepia => {
                let (r0, g0, b0) = (r, g, bl);
                r = 0.393 * r0 + 0.769 * g0 + 0.189 * b0;
                g = 0.349 * r0 + 0.686 * g0 + 0.168 * b0;
                bl = 0.272 * r0 + 0.534 * g0 + 0.131 * b0;
            }
            NamedFilter::Negative => {
                r = 255.0 - r;
                g = 255.0 - g;
                bl = 255.0 - bl;
            }
        }

        px[0] = r.clamp(0.0, 255.0) as u8;
        px[1] = g.clamp(0.0, 255.0) as u8;
        px[2] = bl.clamp(0.0, 255.0) as u8;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{CanvasSize, ElementId};

    fn element() -> ImageElement {
        ImageElement::new(ElementId(1), "a.png", (100, 100), CanvasSize::default())
    }

    #[test]
    fn color_op_detection() {
        let mut el = element();
        assert!(!needs_color_ops(&el));
        el.brightness = 1.5;
        assert!(needs_color_ops(&el));
        el.brightness = 1.0;
        el.filter = NamedFilter::Sepia;
        assert!(needs_color_ops(&el));
        // Mirror and blur are handled in the bake, not the color pass.
        el.filter = NamedFilter::Normal;
        el.mirror_v = true;
        el.blur = 4.0;
        assert!(!needs_color_ops(&el));
    }

    #[test]
    fn effect_key_distinguishes_parameters() {
        let a = element();
        let mut b = element();
        b.contrast = 1.2;
        assert_ne!(EffectKey::of(&a, 1), EffectKey::of(&b, 1));
        assert_eq!(EffectKey::of(&a, 1), EffectKey::of(&a.clone(), 1));
        // Position and rotation do not invalidate the baked image.
        let mut c = element();
        c.x = 999.0;
        c.rotation = 45.0;
        assert_eq!(EffectKey::of(&a, 1), EffectKey::of(&c, 1));
        // Replacing the source pixels does.
        assert_ne!(EffectKey::of(&a, 1), EffectKey::of(&a, 2));
    }

    #[test]
    fn effect_key_works_as_a_map_key() {
        let mut cache: std::collections::HashMap<EffectKey, u32> = std::collections::HashMap::new();
        let mut sepia = element();
        sepia.filter = NamedFilter::Sepia;
        cache.insert(EffectKey::of(&element(), 1), 1);
        cache.insert(EffectKey::of(&sepia, 1), 2);
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get(&EffectKey::of(&element(), 1)), Some(&1));
    }

    #[test]
    fn brightness_scales_channels() {
        let mut px = vec![100u8, 100, 100, 200];
        apply_color_ops(&mut px, 2.0, 1.0, NamedFilter::Normal);
        assert_eq!(&px, &[200, 200, 200, 200]);
    }

    #[test]
    fn contrast_pivots_at_midpoint() {
        // Midtone gray is a fixed point of contrast.
        let mut px = vec![128u8, 128, 128, 255];
        apply_color_ops(&mut px, 1.0, 2.0, NamedFilter::Normal);
        assert_eq!(&px, &[128, 128, 128, 255]);

        let mut px = vec![200u8, 50, 128, 255];
        apply_color_ops(&mut px, 1.0, 2.0, NamedFilter::Normal);
        assert!(px[0] > 200 && px[1] < 50);
    }

    #[test]
    fn grayscale_equalizes_channels() {
        let mut px = vec![250u8, 20, 70, 255];
        apply_color_ops(&mut px, 1.0, 1.0, NamedFilter::Grayscale);
        assert_eq!(px[0], px[1]);
        assert_eq!(px[1], px[2]);
        assert_eq!(px[3], 255);
    }

    #[test]
    fn negative_inverts() {
        let mut px = vec![0u8, 255, 100, 40];
        apply_color_ops(&mut px, 1.0, 1.0, NamedFilter::Negative);
        assert_eq!(&px, &[255, 0, 155, 40]);
    }
}
