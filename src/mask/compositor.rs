use super::buffer::MaskBuffer;
use crate::error::MaskError;
use image::{Rgb, RgbImage};

/// Bitwise complement. Derives a background mask from a foreground mask.
pub fn invert(mask: &MaskBuffer) -> MaskBuffer {
    let mut out = mask.clone();
    for value in out.data_mut() {
        *value = !*value;
    }
    out
}

/// Logical OR of same-sized masks
///
/// Used to merge per-class segmentation masks into one foreground mask.
pub fn union(masks: &[MaskBuffer]) -> Result<MaskBuffer, MaskError> {
    let (first, rest) = masks.split_first().ok_or(MaskError::EmptyUnion)?;
    let mut out = first.clone();
    for mask in rest {
        mask.ensure_dimensions(first.dimensions())?;
        for (dst, &src) in out.data_mut().iter_mut().zip(mask.data()) {
            *dst |= src;
        }
    }
    Ok(out)
}

/// Logical AND of two same-sized masks
pub fn intersect(a: &MaskBuffer, b: &MaskBuffer) -> Result<MaskBuffer, MaskError> {
    combine(a, b, |x, y| x && y)
}

/// Pixels set in `a` but not in `b`
///
/// Applies a manual eraser refinement on top of a segmentation mask.
pub fn subtract(a: &MaskBuffer, b: &MaskBuffer) -> Result<MaskBuffer, MaskError> {
    combine(a, b, |x, y| x && !y)
}

fn combine(
    a: &MaskBuffer,
    b: &MaskBuffer,
    op: impl Fn(bool, bool) -> bool,
) -> Result<MaskBuffer, MaskError> {
    b.ensure_dimensions(a.dimensions())?;
    let mut out = a.clone();
    for (dst, &src) in out.data_mut().iter_mut().zip(b.data()) {
        *dst = op(*dst, src);
    }
    Ok(out)
}

/// Tint masked pixels of `image` with `color` at `alpha` opacity
///
/// Preview only, never transmitted. A mask at a different resolution than the
/// image is resampled with nearest-neighbour first. Unmasked pixels are
/// copied through untouched.
pub fn overlay(image: &RgbImage, mask: &MaskBuffer, color: Rgb<u8>, alpha: f32) -> RgbImage {
    let _span = tracing::debug_span!("overlay").entered();

    let (width, height) = image.dimensions();
    let mask = mask.resize_nearest(width, height);
    let alpha = alpha.clamp(0.0, 1.0);

    let mut out = image.clone();
    for (x, y, pixel) in out.enumerate_pixels_mut() {
        if mask.get(x, y) == Some(true) {
            for c in 0..3 {
                pixel[c] = blend(pixel[c], color[c], alpha);
            }
        }
    }
    out
}

fn blend(base: u8, tint: u8, alpha: f32) -> u8 {
    let value = base as f32 * (1.0 - alpha) + tint as f32 * alpha;
    value.round().clamp(0.0, 255.0) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mask_from(width: u32, height: u32, set: &[(u32, u32)]) -> MaskBuffer {
        let mut mask = MaskBuffer::new(width, height);
        for &(x, y) in set {
            mask.set(x, y, true);
        }
        mask
    }

    #[test]
    fn invert_diagonal_yields_anti_diagonal() {
        let fg = mask_from(2, 2, &[(0, 0), (1, 1)]);
        let bg = invert(&fg);
        assert_eq!(bg, mask_from(2, 2, &[(0, 1), (1, 0)]));
    }

    #[test]
    fn invert_is_an_involution() {
        let mask = mask_from(7, 5, &[(0, 0), (3, 2), (6, 4), (1, 3)]);
        assert_eq!(invert(&invert(&mask)), mask);
    }

    #[test]
    fn union_of_single_mask_is_identity() {
        let mask = mask_from(4, 4, &[(1, 2), (3, 3)]);
        assert_eq!(union(std::slice::from_ref(&mask)).unwrap(), mask);
    }

    #[test]
    fn union_merges_per_class_masks() {
        let person = mask_from(3, 1, &[(0, 0)]);
        let dog = mask_from(3, 1, &[(2, 0)]);
        let merged = union(&[person, dog]).unwrap();
        assert_eq!(merged.data(), &[true, false, true]);
    }

    #[test]
    fn union_of_nothing_is_an_error() {
        assert!(matches!(union(&[]), Err(MaskError::EmptyUnion)));
    }

    #[test]
    fn union_rejects_mismatched_sizes() {
        let result = union(&[MaskBuffer::new(2, 2), MaskBuffer::new(3, 2)]);
        assert!(matches!(
            result,
            Err(MaskError::DimensionMismatch {
                expected: (2, 2),
                actual: (3, 2)
            })
        ));
    }

    #[test]
    fn subtract_and_intersect() {
        let a = mask_from(3, 1, &[(0, 0), (1, 0)]);
        let b = mask_from(3, 1, &[(1, 0), (2, 0)]);
        assert_eq!(subtract(&a, &b).unwrap().data(), &[true, false, false]);
        assert_eq!(intersect(&a, &b).unwrap().data(), &[false, true, false]);
        assert!(subtract(&a, &MaskBuffer::new(1, 1)).is_err());
    }

    #[test]
    fn overlay_tints_only_masked_pixels() {
        let image = RgbImage::from_pixel(2, 1, Rgb([100, 100, 100]));
        let mask = mask_from(2, 1, &[(1, 0)]);

        let preview = overlay(&image, &mask, Rgb([255, 0, 0]), 0.5);
        assert_eq!(preview.get_pixel(0, 0), &Rgb([100, 100, 100]));
        assert_eq!(preview.get_pixel(1, 0), &Rgb([178, 50, 50]));
    }

    #[test]
    fn overlay_resamples_low_resolution_mask() {
        let image = RgbImage::from_pixel(4, 4, Rgb([0, 0, 0]));
        // Left half set at 2x2 resolution
        let mask = mask_from(2, 2, &[(0, 0), (0, 1)]);

        let preview = overlay(&image, &mask, Rgb([0, 255, 0]), 1.0);
        assert_eq!(preview.get_pixel(1, 3), &Rgb([0, 255, 0]));
        assert_eq!(preview.get_pixel(2, 0), &Rgb([0, 0, 0]));
    }
}
