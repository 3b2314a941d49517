mod rasterizer;
mod session;
mod stroke;
mod transform;

pub use rasterizer::rasterize;
pub use session::DrawingSession;
pub use stroke::{Point, Stroke, Tool};
pub use transform::CoordinateTransform;
