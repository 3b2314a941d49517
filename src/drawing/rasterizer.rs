use super::stroke::{Point, Stroke, Tool};
use super::transform::CoordinateTransform;
use crate::mask::MaskBuffer;

/// Rasterize freehand strokes into a mask at the original image's size
///
/// Strokes are applied in order: brush strokes set pixels and eraser strokes
/// clear them, so an erased region stays excluded from this mask (and is
/// therefore included in its inverse).
///
/// Points are canvas-local display coordinates. The transform's offset is
/// ignored here; convert viewport positions with
/// [`CoordinateTransform::viewport_to_canvas`] when recording.
///
/// Each pixel is resolved by sampling its centre: it is covered when the
/// centre, mapped back into display space, lies within half the stroke width
/// of the stroke's polyline. This scales path and thickness by the same
/// per-axis factors and yields a strictly binary mask.
///
/// Returns `None` for an empty stroke list so callers can tell "no region
/// given" apart from "region given but empty".
pub fn rasterize(
    width: u32,
    height: u32,
    strokes: &[Stroke],
    transform: &CoordinateTransform,
) -> Option<MaskBuffer> {
    if strokes.is_empty() {
        return None;
    }

    let _span = tracing::debug_span!("rasterize").entered();
    tracing::debug!(
        "Rasterizing {} strokes into {}x{} (scale {}x{})",
        strokes.len(),
        width,
        height,
        transform.scale_x,
        transform.scale_y
    );

    let mut mask = MaskBuffer::new(width, height);
    for stroke in strokes {
        let paint = match stroke.tool {
            Tool::Brush { .. } => true,
            Tool::Eraser { .. } => false,
        };
        apply_stroke(&mut mask, stroke, transform, paint);
    }
    Some(mask)
}

fn apply_stroke(mask: &mut MaskBuffer, stroke: &Stroke, transform: &CoordinateTransform, paint: bool) {
    let half_width = stroke.tool.width() / 2.0;
    if stroke.points.is_empty() || half_width.is_nan() || half_width <= 0.0 {
        tracing::debug!("Skipping stroke with no points or zero width");
        return;
    }

    if stroke.points.len() == 1 {
        apply_segment(mask, stroke.points[0], stroke.points[0], half_width, transform, paint);
        return;
    }
    for pair in stroke.points.windows(2) {
        apply_segment(mask, pair[0], pair[1], half_width, transform, paint);
    }
}

/// Cover every pixel whose centre is within `half_width` (display units) of
/// the display-space segment `a`-`b`.
fn apply_segment(
    mask: &mut MaskBuffer,
    a: Point,
    b: Point,
    half_width: f32,
    transform: &CoordinateTransform,
    paint: bool,
) {
    let oa = transform.to_original(a);
    let ob = transform.to_original(b);
    let reach_x = half_width * transform.scale_x.abs();
    let reach_y = half_width * transform.scale_y.abs();

    let Some((x0, x1)) = pixel_span(oa.x.min(ob.x) - reach_x, oa.x.max(ob.x) + reach_x, mask.width())
    else {
        return;
    };
    let Some((y0, y1)) = pixel_span(oa.y.min(ob.y) - reach_y, oa.y.max(ob.y) + reach_y, mask.height())
    else {
        return;
    };

    let limit = half_width * half_width;
    for y in y0..=y1 {
        for x in x0..=x1 {
            let centre = transform.to_display(Point::new(x as f32 + 0.5, y as f32 + 0.5));
            if distance_sq_to_segment(centre, a, b) <= limit {
                mask.set(x, y, paint);
            }
        }
    }
}

/// Inclusive pixel range touched by `[lo, hi]`, clamped to `[0, size)`
fn pixel_span(lo: f32, hi: f32, size: u32) -> Option<(u32, u32)> {
    if size == 0 || !lo.is_finite() || !hi.is_finite() || hi < 0.0 || lo >= size as f32 {
        return None;
    }
    let start = lo.floor().max(0.0) as u32;
    let end = (hi.floor() as u32).min(size - 1);
    Some((start, end))
}

fn distance_sq_to_segment(p: Point, a: Point, b: Point) -> f32 {
    let (dx, dy) = (b.x - a.x, b.y - a.y);
    let len_sq = dx * dx + dy * dy;
    let t = if len_sq > 0.0 {
        (((p.x - a.x) * dx + (p.y - a.y) * dy) / len_sq).clamp(0.0, 1.0)
    } else {
        0.0
    };
    let (cx, cy) = (a.x + t * dx - p.x, a.y + t * dy - p.y);
    cx * cx + cy * cy
}
