//! Mask synthesis and remote generative-edit pipeline.
//!
//! Masks come from a segmentation provider or from freehand strokes, are
//! derived into foreground/background variants, and are sent together with
//! the original image and an instruction to a remote image-edit model.

pub mod config;
pub mod drawing;
pub mod edit;
pub mod error;
pub mod mask;
pub mod output;
pub mod segmentation;

pub use error::{EditError, MaskError};
pub use mask::MaskBuffer;
