use serde::{Deserialize, Serialize};

/// A 2D point. Stroke points are canvas-local display coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// Drawing tool. Width is in display pixels.
///
/// Color and opacity are cosmetic and play no part in mask derivation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "tool", rename_all = "lowercase")]
pub enum Tool {
    Brush {
        width: f32,
        #[serde(default = "default_color")]
        color: [u8; 3],
        #[serde(default = "default_opacity")]
        opacity: f32,
    },
    Eraser {
        width: f32,
    },
}

fn default_color() -> [u8; 3] {
    [255, 0, 0]
}

fn default_opacity() -> f32 {
    0.5
}

impl Tool {
    pub fn brush(width: f32) -> Self {
        Tool::Brush {
            width,
            color: default_color(),
            opacity: default_opacity(),
        }
    }

    pub fn eraser(width: f32) -> Self {
        Tool::Eraser { width }
    }

    pub fn width(&self) -> f32 {
        match *self {
            Tool::Brush { width, .. } | Tool::Eraser { width } => width,
        }
    }
}

/// One freehand stroke: a tool and the ordered points it passed through
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stroke {
    #[serde(flatten)]
    pub tool: Tool,
    pub points: Vec<Point>,
}

impl Stroke {
    pub fn new(tool: Tool, points: Vec<Point>) -> Self {
        Self { tool, points }
    }
}
