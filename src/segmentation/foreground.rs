use super::types::{Segmentation, SegmentationProvider};
use crate::mask::{self, MaskBuffer};
use anyhow::{bail, Context, Result};
use image::RgbImage;
use ndarray::{Array3, Axis};

/// Matte values at or above this are treated as foreground
pub const MATTE_THRESHOLD: f32 = 0.5;

/// Run `provider` on `image` and merge the target classes into one
/// foreground mask at the image's resolution
///
/// The provider is closed afterwards even when segmentation fails.
pub fn foreground_mask(
    provider: &mut dyn SegmentationProvider,
    image: &RgbImage,
    target_classes: &[usize],
) -> Result<MaskBuffer> {
    let _span = tracing::debug_span!("foreground_mask").entered();

    let segmentation = provider.segment(image, target_classes);
    provider.close();
    let segmentation = segmentation.context("Segmentation provider failed")?;

    let mask = resolve(segmentation, target_classes)?;

    let (width, height) = image.dimensions();
    if mask.dimensions() != (width, height) {
        tracing::debug!(
            "Segmentation output {}x{} differs from image {}x{}",
            mask.width(),
            mask.height(),
            width,
            height
        );
    }
    Ok(mask.resize_nearest(width, height))
}

/// Everything except the target classes
pub fn background_mask(
    provider: &mut dyn SegmentationProvider,
    image: &RgbImage,
    target_classes: &[usize],
) -> Result<MaskBuffer> {
    let foreground = foreground_mask(provider, image, target_classes)?;
    Ok(mask::invert(&foreground))
}

fn resolve(segmentation: Segmentation, target_classes: &[usize]) -> Result<MaskBuffer> {
    match segmentation {
        Segmentation::Combined(mask) | Segmentation::Both { combined: mask, .. } => Ok(mask),
        Segmentation::PerClass(masks) => {
            tracing::debug!("Merging {} per-class masks", masks.len());
            mask::union(&masks).context("Failed to merge per-class masks")
        }
        Segmentation::ClassScores(scores) => argmax_mask(&scores, target_classes),
        Segmentation::Matte(matte) => Ok(MaskBuffer::from_scores(matte.view(), MATTE_THRESHOLD)),
    }
}

fn argmax_mask(scores: &Array3<f32>, target_classes: &[usize]) -> Result<MaskBuffer> {
    let (classes, height, width) = scores.dim();
    if classes == 0 {
        bail!("Segmentation scores have no classes");
    }
    for &class in target_classes {
        if class >= classes {
            tracing::warn!("Target class {} outside model's {} classes", class, classes);
        }
    }

    let data = scores
        .lanes(Axis(0))
        .into_iter()
        .map(|lane| {
            let best = lane
                .iter()
                .enumerate()
                .fold((0, f32::NEG_INFINITY), |best, (class, &score)| {
                    if score > best.1 {
                        (class, score)
                    } else {
                        best
                    }
                })
                .0;
            target_classes.contains(&best)
        })
        .collect();

    Ok(MaskBuffer::from_data(width as u32, height as u32, data)?)
}
