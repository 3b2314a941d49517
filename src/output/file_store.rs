use super::{ImageStore, StoredImage};
use anyhow::{Context, Result};
use image::ImageFormat;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

/// Writes each result as a new file in a directory
pub struct FileStore {
    dir: PathBuf,
    prefix: String,
}

impl FileStore {
    pub fn new<P: AsRef<Path>>(dir: P) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
            prefix: "edit".to_string(),
        }
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    fn next_path(&self, extension: &str) -> PathBuf {
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis())
            .unwrap_or_default();

        let mut path = self.dir.join(format!("{}-{}.{}", self.prefix, millis, extension));
        let mut n = 1;
        while path.exists() {
            path = self
                .dir
                .join(format!("{}-{}-{}.{}", self.prefix, millis, n, extension));
            n += 1;
        }
        path
    }
}

impl ImageStore for FileStore {
    fn save(&self, image: &[u8]) -> Result<StoredImage> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("Failed to create {}", self.dir.display()))?;

        let extension = image::guess_format(image)
            .ok()
            .and_then(|format| format.extensions_str().first().copied())
            .unwrap_or("bin");
        let path = self.next_path(extension);

        fs::write(&path, image).with_context(|| format!("Failed to write {}", path.display()))?;
        tracing::info!("Saved edited image to {}", path.display());

        Ok(StoredImage { location: path })
    }
}

/// Format used when writing masks and previews from the CLI
pub fn format_for(path: &Path) -> ImageFormat {
    ImageFormat::from_path(path).unwrap_or(ImageFormat::Png)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::RgbImage;
    use std::io::Cursor;

    #[test]
    fn saves_with_sniffed_extension() {
        let dir = tempfile::tempdir().unwrap();
        let mut png = Vec::new();
        RgbImage::new(1, 1)
            .write_to(&mut Cursor::new(&mut png), ImageFormat::Png)
            .unwrap();

        let store = FileStore::new(dir.path().join("out"));
        let stored = store.save(&png).unwrap();

        assert_eq!(stored.location.extension().unwrap(), "png");
        assert_eq!(fs::read(&stored.location).unwrap(), png);
    }

    #[test]
    fn never_overwrites_previous_results() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path()).with_prefix("beach");

        let a = store.save(b"first").unwrap();
        let b = store.save(b"second").unwrap();

        assert_ne!(a.location, b.location);
        assert_eq!(a.location.extension().unwrap(), "bin");
        assert!(a
            .location
            .file_name()
            .unwrap()
            .to_string_lossy()
            .starts_with("beach-"));
        assert_eq!(fs::read(&b.location).unwrap(), b"second");
    }
}
