mod foreground;
pub mod types;

pub use foreground::{background_mask, foreground_mask, MATTE_THRESHOLD};
pub use types::{Segmentation, SegmentationProvider};
