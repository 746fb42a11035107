use std::path::Path;
#[cfg(test)]
use std::path::PathBuf;
#[cfg(test)]
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufWriter, Write};
use anyhow::{Result, Context};
use log::debug;
use crate::emitter::Image;

/// Abstraction over the file system (image decoding and artifact files).
/// Lets the generator run against in-memory fixtures in tests.
pub trait AssetOps {
    /// Decode the image at `path` into RGBA pixels.
    fn load_image(&self, path: &Path) -> Result<Image>;

    /// Read an existing artifact as raw bytes. `Ok(None)` if the file does not exist.
    fn read_artifact(&self, path: &Path) -> Result<Option<Vec<u8>>>;

    /// Write an artifact, replacing whatever was there before.
    fn write_artifact(&self, path: &Path, contents: &str) -> Result<()>;
}

/// The real file system.
pub struct DiskAssets;

impl AssetOps for DiskAssets {
    fn load_image(&self, path: &Path) -> Result<Image> {
        let decoded = image::ImageReader::open(path)
            .with_context(|| format!("Failed to open image {:?}", path))?
            .with_guessed_format()
            .with_context(|| format!("Failed to detect the format of {:?}", path))?
            .decode()
            .with_context(|| format!("Failed to decode image {:?}", path))?;
        debug!("Decoded {:?}: {}x{} {:?}", path, decoded.width(), decoded.height(), decoded.color());
        Ok(Image::from(decoded.into_rgba8()))
    }

    fn read_artifact(&self, path: &Path) -> Result<Option<Vec<u8>>> {
        match std::fs::read(path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e).with_context(|| format!("Failed to read {:?}", path)),
        }
    }

    fn write_artifact(&self, path: &Path, contents: &str) -> Result<()> {
        let file = File::create(path).with_context(|| format!("Failed to create {:?}", path))?;
        let mut out = BufWriter::new(file);
        out.write_all(contents.as_bytes())
            .and_then(|_| out.flush())
            .with_context(|| format!("Failed to write {:?}", path))?;
        Ok(())
    }
}

/// In-memory assets for tests.
#[cfg(test)]
#[derive(Debug, Default)]
pub struct MockAssets {
    pub images: std::sync::Mutex<HashMap<PathBuf, Image>>,
    pub files: std::sync::Mutex<HashMap<PathBuf, Vec<u8>>>,
    pub writes: std::sync::Mutex<Vec<PathBuf>>,
}

#[cfg(test)]
impl MockAssets {
    pub fn with_image(path: impl Into<PathBuf>, image: Image) -> Self {
        let mock = Self::default();
        mock.images.lock().unwrap().insert(path.into(), image);
        mock
    }

    pub fn file(&self, path: impl AsRef<Path>) -> Option<String> {
        let bytes = self.files.lock().unwrap().get(path.as_ref()).cloned()?;
        Some(String::from_utf8(bytes).expect("mock file is not UTF-8"))
    }

    pub fn put_file(&self, path: impl Into<PathBuf>, contents: &str) {
        self.put_bytes(path, contents.as_bytes());
    }

    pub fn put_bytes(&self, path: impl Into<PathBuf>, contents: &[u8]) {
        self.files.lock().unwrap().insert(path.into(), contents.to_vec());
    }
}

#[cfg(test)]
impl AssetOps for MockAssets {
    fn load_image(&self, path: &Path) -> Result<Image> {
        self.images
            .lock()
            .unwrap()
            .get(path)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("No image at {:?} in mock assets", path))
    }

    fn read_artifact(&self, path: &Path) -> Result<Option<Vec<u8>>> {
        Ok(self.files.lock().unwrap().get(path).cloned())
    }

    fn write_artifact(&self, path: &Path, contents: &str) -> Result<()> {
        self.put_file(path, contents);
        self.writes.lock().unwrap().push(path.to_path_buf());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn decodes_png_from_disk() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("icon.png");
        let mut rgba = image::RgbaImage::new(2, 1);
        rgba.put_pixel(0, 0, image::Rgba([255, 0, 0, 255]));
        rgba.put_pixel(1, 0, image::Rgba([0, 255, 0, 128]));
        rgba.save(&path).unwrap();

        let img = DiskAssets.load_image(&path).unwrap();
        assert_eq!((img.width(), img.height()), (2, 1));
        assert_eq!(img.pixels(), &[[255, 0, 0, 255], [0, 255, 0, 128]]);
    }

    #[test]
    fn missing_image_is_an_error() {
        let dir = TempDir::new().unwrap();
        let err = DiskAssets.load_image(&dir.path().join("nope.png")).unwrap_err();
        assert!(format!("{:#}", err).contains("Failed to open image"));
    }

    #[test]
    fn undecodable_image_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("icon.png");
        std::fs::write(&path, b"definitely not a png").unwrap();
        assert!(DiskAssets.load_image(&path).is_err());
    }

    #[test]
    fn write_overwrites_instead_of_appending() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("icon.h");

        assert_eq!(DiskAssets.read_artifact(&path).unwrap(), None);
        DiskAssets.write_artifact(&path, "a much longer first version\n").unwrap();
        DiskAssets.write_artifact(&path, "short\n").unwrap();
        assert_eq!(DiskAssets.read_artifact(&path).unwrap().as_deref(), Some(&b"short\n"[..]));
    }

    #[test]
    fn non_utf8_artifact_is_read_as_bytes() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("icon.cpp");
        std::fs::write(&path, [0xff, 0xfe, b'{']).unwrap();

        assert_eq!(DiskAssets.read_artifact(&path).unwrap(), Some(vec![0xff, 0xfe, b'{']));
    }
}
