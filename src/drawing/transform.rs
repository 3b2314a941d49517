use super::stroke::Point;
use crate::error::MaskError;

/// Maps display coordinates onto original-image pixel coordinates.
///
/// One transform is valid per (original image, display viewport) pair; build
/// a new one whenever either changes.
///
/// Stroke points are canvas-local: the offset is where the displayed image
/// sits inside the viewport, and is only used by [`viewport_to_canvas`] to
/// convert raw pointer positions at record time. Rasterization never applies
/// it.
///
/// [`viewport_to_canvas`]: CoordinateTransform::viewport_to_canvas
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CoordinateTransform {
    pub scale_x: f32,
    pub scale_y: f32,
    pub offset_x: f32,
    pub offset_y: f32,
}

impl CoordinateTransform {
    /// Aspect-preserving "contain" fit of the original inside the viewport,
    /// centred on both axes.
    pub fn fit(original: (u32, u32), viewport: (f32, f32)) -> Result<Self, MaskError> {
        let (ow, oh) = check_original(original)?;
        let (vw, vh) = viewport;
        if !(vw.is_finite() && vh.is_finite() && vw > 0.0 && vh > 0.0) {
            return Err(MaskError::InvalidTransform(format!(
                "viewport must be positive, got {}x{}",
                vw, vh
            )));
        }

        let fit = (vw / ow).min(vh / oh);
        let display_w = ow * fit;
        let display_h = oh * fit;

        Ok(Self {
            scale_x: ow / display_w,
            scale_y: oh / display_h,
            offset_x: (vw - display_w) / 2.0,
            offset_y: (vh - display_h) / 2.0,
        })
    }

    /// Transform for a renderer that drew the image at `display` size at
    /// `offset` inside its viewport. X and Y scales may differ.
    pub fn from_display(
        original: (u32, u32),
        display: (f32, f32),
        offset: (f32, f32),
    ) -> Result<Self, MaskError> {
        let (ow, oh) = check_original(original)?;
        let (dw, dh) = display;
        if !(dw.is_finite() && dh.is_finite() && dw > 0.0 && dh > 0.0) {
            return Err(MaskError::InvalidTransform(format!(
                "display size must be positive, got {}x{}",
                dw, dh
            )));
        }

        Ok(Self {
            scale_x: ow / dw,
            scale_y: oh / dh,
            offset_x: offset.0,
            offset_y: offset.1,
        })
    }

    /// Uniform scale with no offset
    pub fn scale(scale_x: f32, scale_y: f32) -> Self {
        Self {
            scale_x,
            scale_y,
            offset_x: 0.0,
            offset_y: 0.0,
        }
    }

    /// Canvas-local display point to original-image coordinates
    pub fn to_original(&self, p: Point) -> Point {
        Point::new(p.x * self.scale_x, p.y * self.scale_y)
    }

    /// Original-image coordinates back to canvas-local display coordinates
    pub fn to_display(&self, p: Point) -> Point {
        Point::new(p.x / self.scale_x, p.y / self.scale_y)
    }

    /// Raw viewport pointer position to canvas-local coordinates
    pub fn viewport_to_canvas(&self, p: Point) -> Point {
        Point::new(p.x - self.offset_x, p.y - self.offset_y)
    }
}

fn check_original(original: (u32, u32)) -> Result<(f32, f32), MaskError> {
    if original.0 == 0 || original.1 == 0 {
        return Err(MaskError::InvalidTransform(format!(
            "original image must be non-empty, got {}x{}",
            original.0, original.1
        )));
    }
    Ok((original.0 as f32, original.1 as f32))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fit_letterboxes_wide_image() {
        // 4000x2000 shown in a 400x400 viewport: 400x200, 100px bars top and bottom
        let t = CoordinateTransform::fit((4000, 2000), (400.0, 400.0)).unwrap();
        assert_eq!(t.scale_x, 10.0);
        assert_eq!(t.scale_y, 10.0);
        assert_eq!(t.offset_x, 0.0);
        assert_eq!(t.offset_y, 100.0);

        let canvas = t.viewport_to_canvas(Point::new(50.0, 150.0));
        assert_eq!(canvas, Point::new(50.0, 50.0));
        assert_eq!(t.to_original(canvas), Point::new(500.0, 500.0));
    }

    #[test]
    fn from_display_allows_distinct_axes() {
        let t = CoordinateTransform::from_display((300, 100), (100.0, 50.0), (0.0, 0.0)).unwrap();
        assert_eq!(t.to_original(Point::new(10.0, 10.0)), Point::new(30.0, 20.0));
        assert_eq!(t.to_display(Point::new(30.0, 20.0)), Point::new(10.0, 10.0));
    }

    #[test]
    fn rejects_degenerate_sizes() {
        assert!(CoordinateTransform::fit((0, 10), (10.0, 10.0)).is_err());
        assert!(CoordinateTransform::fit((10, 10), (0.0, 10.0)).is_err());
        assert!(CoordinateTransform::from_display((10, 10), (f32::NAN, 1.0), (0.0, 0.0)).is_err());
    }
}
