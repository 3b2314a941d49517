mod buffer;
pub mod compositor;

pub use buffer::MaskBuffer;
pub use compositor::{intersect, invert, overlay, subtract, union};
