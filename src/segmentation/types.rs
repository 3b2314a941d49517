use crate::mask::MaskBuffer;
use anyhow::Result;
use image::RgbImage;
use ndarray::{Array2, Array3};

/// Output of a segmentation provider, in whichever shape it produces
#[derive(Debug, Clone)]
pub enum Segmentation {
    /// One mask per requested class, to be unioned by the caller
    PerClass(Vec<MaskBuffer>),

    /// Masks already merged by the provider
    Combined(MaskBuffer),

    /// Per-class masks plus a provider-merged union
    Both {
        per_class: Vec<MaskBuffer>,
        combined: MaskBuffer,
    },

    /// Raw class scores with shape `[classes, height, width]`. A pixel is
    /// foreground when its highest-scoring class is one of the targets.
    ClassScores(Array3<f32>),

    /// Soft foreground matte with shape `[height, width]`, 0.0 = background,
    /// 1.0 = foreground
    Matte(Array2<f32>),
}

/// Trait for on-device segmentation backends
///
/// The model itself is a black box; this crate only consumes its output.
pub trait SegmentationProvider {
    /// Segment `image`, reporting pixels that belong to `target_classes`
    ///
    /// Output resolution may differ from the image; callers resample.
    fn segment(&mut self, image: &RgbImage, target_classes: &[usize]) -> Result<Segmentation>;

    /// Release model resources
    ///
    /// Called exactly once after `segment`, whether it succeeded or not.
    fn close(&mut self) {
        // Default implementation: nothing to release
    }
}
