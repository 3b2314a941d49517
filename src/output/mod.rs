mod file_store;

pub use file_store::{format_for, FileStore};

use anyhow::Result;
use std::path::PathBuf;

/// Where a stored result ended up
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredImage {
    pub location: PathBuf,
}

/// Trait for destinations of edited images
///
/// Implementations choose naming and location; the edit pipeline only hands
/// over the decoded bytes.
pub trait ImageStore {
    fn save(&self, image: &[u8]) -> Result<StoredImage>;
}
