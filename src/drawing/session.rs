use super::rasterizer;
use super::stroke::{Point, Stroke, Tool};
use super::transform::CoordinateTransform;
use crate::mask::MaskBuffer;

/// Freehand drawing over one original image
///
/// Owns the committed (`active`) and undone stacks. Strokes move between the
/// stacks and are never copied. Every mutation takes `&mut self`, so stack
/// changes for a session are serialized by the borrow checker; share a
/// session across threads behind a `Mutex`.
#[derive(Debug, Clone)]
pub struct DrawingSession {
    width: u32,
    height: u32,
    active: Vec<Stroke>,
    undone: Vec<Stroke>,
    pending: Option<Stroke>,
}

impl DrawingSession {
    /// Start a session for an original image of `width` x `height` pixels
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            active: Vec::new(),
            undone: Vec::new(),
            pending: None,
        }
    }

    /// Open a new stroke. Starting a stroke discards the redo history.
    ///
    /// A stroke still pending from an earlier `begin_stroke` is committed first.
    pub fn begin_stroke(&mut self, tool: Tool, point: Point) {
        self.end_stroke();
        if !self.undone.is_empty() {
            tracing::debug!("New stroke discards {} undone strokes", self.undone.len());
            self.undone.clear();
        }
        self.pending = Some(Stroke::new(tool, vec![point]));
    }

    /// Append a point to the pending stroke. Ignored when no stroke is open.
    pub fn extend_stroke(&mut self, point: Point) {
        if let Some(stroke) = self.pending.as_mut() {
            stroke.points.push(point);
        }
    }

    /// Commit the pending stroke, if any
    pub fn end_stroke(&mut self) {
        if let Some(stroke) = self.pending.take() {
            self.active.push(stroke);
        }
    }

    /// Move the most recent stroke to the undone stack.
    /// Returns `false` when there is nothing to undo.
    pub fn undo(&mut self) -> bool {
        self.end_stroke();
        match self.active.pop() {
            Some(stroke) => {
                self.undone.push(stroke);
                true
            }
            None => false,
        }
    }

    /// Move the most recently undone stroke back.
    /// Returns `false` when there is nothing to redo.
    pub fn redo(&mut self) -> bool {
        match self.undone.pop() {
            Some(stroke) => {
                self.active.push(stroke);
                true
            }
            None => false,
        }
    }

    /// Drop every stroke, including history
    pub fn clear(&mut self) {
        self.active.clear();
        self.undone.clear();
        self.pending = None;
    }

    pub fn strokes(&self) -> &[Stroke] {
        &self.active
    }

    pub fn can_undo(&self) -> bool {
        !self.active.is_empty() || self.pending.is_some()
    }

    pub fn can_redo(&self) -> bool {
        !self.undone.is_empty()
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Rasterize committed strokes at the original image's size.
    /// `None` when nothing has been drawn.
    pub fn mask(&self, transform: &CoordinateTransform) -> Option<MaskBuffer> {
        rasterizer::rasterize(self.width, self.height, &self.active, transform)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draw(session: &mut DrawingSession, tool: Tool, points: &[(f32, f32)]) {
        let mut iter = points.iter().map(|&(x, y)| Point::new(x, y));
        if let Some(first) = iter.next() {
            session.begin_stroke(tool, first);
            for p in iter {
                session.extend_stroke(p);
            }
            session.end_stroke();
        }
    }

    #[test]
    fn undo_and_redo_move_strokes_between_stacks() {
        let mut session = DrawingSession::new(10, 10);
        draw(&mut session, Tool::brush(2.0), &[(1.0, 1.0), (5.0, 5.0)]);
        draw(&mut session, Tool::eraser(2.0), &[(2.0, 2.0)]);
        assert_eq!(session.strokes().len(), 2);

        assert!(session.undo());
        assert_eq!(session.strokes().len(), 1);
        assert!(session.can_redo());

        assert!(session.redo());
        assert_eq!(session.strokes().len(), 2);
        assert_eq!(session.strokes()[1].tool, Tool::eraser(2.0));
        assert!(!session.redo());
    }

    #[test]
    fn new_stroke_clears_redo_stack() {
        let mut session = DrawingSession::new(10, 10);
        draw(&mut session, Tool::brush(2.0), &[(1.0, 1.0)]);
        session.undo();
        assert!(session.can_redo());

        draw(&mut session, Tool::brush(3.0), &[(4.0, 4.0)]);
        assert!(!session.can_redo());
        assert_eq!(session.strokes().len(), 1);
    }

    #[test]
    fn undo_on_empty_session_is_a_no_op() {
        let mut session = DrawingSession::new(4, 4);
        assert!(!session.undo());
        assert!(!session.can_undo());
    }

    #[test]
    fn mask_is_none_until_something_is_drawn() {
        let mut session = DrawingSession::new(8, 6);
        let t = CoordinateTransform::scale(1.0, 1.0);
        assert!(session.mask(&t).is_none());

        draw(&mut session, Tool::brush(2.0), &[(1.0, 1.0), (6.0, 1.0)]);
        let mask = session.mask(&t).unwrap();
        assert_eq!(mask.dimensions(), (8, 6));
        assert_eq!(mask.get(3, 1), Some(true));

        session.clear();
        assert!(session.mask(&t).is_none());
    }
}
