use crate::error::MaskError;
use image::{GrayImage, ImageFormat, Luma};
use ndarray::ArrayView2;
use std::io::Cursor;

/// Binary raster marking which pixels an edit should affect.
///
/// Dimensions always match the original image, never the display viewport.
/// Pixels are stored row-major: the index of `(x, y)` is `y * width + x`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaskBuffer {
    width: u32,
    height: u32,
    data: Vec<bool>,
}

impl MaskBuffer {
    /// Create an all-clear mask
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            data: vec![false; width as usize * height as usize],
        }
    }

    pub fn from_data(width: u32, height: u32, data: Vec<bool>) -> Result<Self, MaskError> {
        let expected = width as usize * height as usize;
        if data.len() != expected {
            return Err(MaskError::DataSizeMismatch {
                expected,
                actual: data.len(),
            });
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    /// Threshold a soft alpha matte (0.0 = background, 1.0 = foreground)
    ///
    /// # Arguments
    /// * `matte` - Matte values flattened in row-major order
    /// * `threshold` - Values at or above this are set
    pub fn from_matte(
        matte: &[f32],
        width: u32,
        height: u32,
        threshold: f32,
    ) -> Result<Self, MaskError> {
        let data = matte.iter().map(|&v| v >= threshold).collect();
        Self::from_data(width, height, data)
    }

    /// Threshold a `[height, width]` score map, as produced by segmentation models
    pub fn from_scores(scores: ArrayView2<f32>, threshold: f32) -> Self {
        let (height, width) = scores.dim();
        let data = scores.iter().map(|&v| v >= threshold).collect();
        Self {
            width: width as u32,
            height: height as u32,
            data,
        }
    }

    /// Read a grayscale image back as a mask, treating values >= 128 as set
    pub fn from_luma(image: &GrayImage) -> Self {
        let (width, height) = image.dimensions();
        let data = image.pixels().map(|p| p[0] >= 128).collect();
        Self {
            width,
            height,
            data,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn data(&self) -> &[bool] {
        &self.data
    }

    pub(crate) fn data_mut(&mut self) -> &mut [bool] {
        &mut self.data
    }

    /// Returns `None` if the coordinates are out of bounds
    pub fn get(&self, x: u32, y: u32) -> Option<bool> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.data.get(self.index(x, y)).copied()
    }

    /// Returns `false` if the coordinates are out of bounds
    pub fn set(&mut self, x: u32, y: u32, value: bool) -> bool {
        if x >= self.width || y >= self.height {
            return false;
        }
        let idx = self.index(x, y);
        self.data[idx] = value;
        true
    }

    /// Number of set pixels
    pub fn count_set(&self) -> usize {
        self.data.iter().filter(|&&v| v).count()
    }

    /// True when no pixel is set
    pub fn is_empty(&self) -> bool {
        !self.data.iter().any(|&v| v)
    }

    /// Resample to new dimensions with nearest-neighbour lookup
    ///
    /// Used to bring segmentation output back to the original image's
    /// resolution. Returns a clone when the dimensions already match.
    pub fn resize_nearest(&self, width: u32, height: u32) -> Self {
        if self.dimensions() == (width, height) {
            return self.clone();
        }

        let _span = tracing::debug_span!("resize_mask").entered();
        tracing::debug!(
            "Resizing mask {}x{} -> {}x{}",
            self.width,
            self.height,
            width,
            height
        );

        let mut out = Self::new(width, height);
        if self.width == 0 || self.height == 0 {
            return out;
        }

        for y in 0..height {
            let src_y = ((y as u64 * self.height as u64) / height as u64) as u32;
            for x in 0..width {
                let src_x = ((x as u64 * self.width as u64) / width as u64) as u32;
                let idx = out.index(x, y);
                out.data[idx] = self.data[self.index(src_x, src_y)];
            }
        }
        out
    }

    /// Convert to a grayscale image: set = 255, clear = 0
    pub fn to_luma(&self) -> GrayImage {
        GrayImage::from_fn(self.width, self.height, |x, y| {
            let value = if self.data[self.index(x, y)] { 255 } else { 0 };
            Luma([value])
        })
    }

    /// Encode as an 8-bit grayscale PNG
    pub fn encode_png(&self) -> Result<Vec<u8>, MaskError> {
        let mut bytes = Vec::new();
        self.to_luma()
            .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)?;
        Ok(bytes)
    }

    pub(crate) fn ensure_dimensions(&self, expected: (u32, u32)) -> Result<(), MaskError> {
        if self.dimensions() != expected {
            return Err(MaskError::DimensionMismatch {
                expected,
                actual: self.dimensions(),
            });
        }
        Ok(())
    }

    fn index(&self, x: u32, y: u32) -> usize {
        y as usize * self.width as usize + x as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn from_data_rejects_wrong_length() {
        let err = MaskBuffer::from_data(2, 2, vec![true; 3]).unwrap_err();
        assert!(matches!(
            err,
            MaskError::DataSizeMismatch {
                expected: 4,
                actual: 3
            }
        ));
    }

    #[test]
    fn get_and_set_respect_bounds() {
        let mut mask = MaskBuffer::new(3, 2);
        assert!(mask.set(2, 1, true));
        assert!(!mask.set(3, 0, true));
        assert_eq!(mask.get(2, 1), Some(true));
        assert_eq!(mask.get(0, 2), None);
        assert_eq!(mask.count_set(), 1);
    }

    #[test]
    fn matte_threshold_is_inclusive() {
        let mask = MaskBuffer::from_matte(&[0.2, 0.5, 0.7, 0.49], 2, 2, 0.5).unwrap();
        assert_eq!(mask.data(), &[false, true, true, false]);
    }

    #[test]
    fn scores_follow_row_major_layout() {
        let scores = array![[0.9, 0.1, 0.1], [0.1, 0.1, 0.8]];
        let mask = MaskBuffer::from_scores(scores.view(), 0.5);
        assert_eq!(mask.dimensions(), (3, 2));
        assert_eq!(mask.get(0, 0), Some(true));
        assert_eq!(mask.get(2, 1), Some(true));
        assert_eq!(mask.count_set(), 2);
    }

    #[test]
    fn nearest_resize_upscales_blocks() {
        let mask = MaskBuffer::from_data(2, 1, vec![true, false]).unwrap();
        let resized = mask.resize_nearest(4, 2);
        assert_eq!(resized.dimensions(), (4, 2));
        assert_eq!(
            resized.data(),
            &[true, true, false, false, true, true, false, false]
        );
    }

    #[test]
    fn png_encoding_decodes_to_same_mask() {
        let mut mask = MaskBuffer::new(5, 3);
        mask.set(1, 1, true);
        mask.set(4, 2, true);

        let png = mask.encode_png().unwrap();
        let decoded = image::load_from_memory(&png).unwrap().to_luma8();
        assert_eq!(decoded.get_pixel(1, 1)[0], 255);
        assert_eq!(decoded.get_pixel(0, 0)[0], 0);
        assert_eq!(MaskBuffer::from_luma(&decoded), mask);
    }
}
