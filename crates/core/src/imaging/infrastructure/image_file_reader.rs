use std::path::Path;

use crate::imaging::domain::image_reader::ImageReader;
use crate::shared::frame::Frame;

/// Decodes image files with the `image` crate.
///
/// Images with transparency load as RGBA; everything else as RGB.
pub struct ImageFileReader;

impl ImageFileReader {
    pub fn new() -> Self {
        Self
    }
}

impl Default for ImageFileReader {
    fn default() -> Self {
        Self::new()
    }
}

impl ImageReader for ImageFileReader {
    fn read(&self, path: &Path) -> Result<Frame, Box<dyn std::error::Error>> {
        let img = image::open(path)?;
        let (width, height) = (img.width(), img.height());
        let frame = if img.color().has_alpha() {
            Frame::new(img.into_rgba8().into_raw(), width, height, 4, 0)
        } else {
            Frame::new(img.into_rgb8().into_raw(), width, height, 3, 0)
        };
        log::debug!("Read {}x{} image {}", width, height, path.display());
        Ok(frame)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn write_rgb(dir: &Path, width: u32, height: u32) -> PathBuf {
        let path = dir.join("test.png");
        let img = image::RgbImage::from_pixel(width, height, image::Rgb([50, 100, 200]));
        img.save(&path).unwrap();
        path
    }

    #[test]
    fn test_read_rgb_image() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_rgb(dir.path(), 100, 80);
        let frame = ImageFileReader::new().read(&path).unwrap();
        assert_eq!(frame.width(), 100);
        assert_eq!(frame.height(), 80);
        assert_eq!(frame.channels(), 3);
        assert_eq!(frame.pixel(0, 0), &[50, 100, 200]);
    }

    #[test]
    fn test_read_rgba_keeps_alpha() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("alpha.png");
        image::RgbaImage::from_pixel(4, 4, image::Rgba([1, 2, 3, 128]))
            .save(&path)
            .unwrap();
        let frame = ImageFileReader::new().read(&path).unwrap();
        assert_eq!(frame.channels(), 4);
        assert_eq!(frame.pixel(3, 3), &[1, 2, 3, 128]);
    }

    #[test]
    fn test_read_grayscale_expands_to_rgb() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gray.png");
        image::GrayImage::from_pixel(3, 2, image::Luma([77]))
            .save(&path)
            .unwrap();
        let frame = ImageFileReader::new().read(&path).unwrap();
        assert_eq!(frame.channels(), 3);
        assert_eq!(frame.pixel(0, 0), &[77, 77, 77]);
    }

    #[test]
    fn test_read_nonexistent_errors() {
        assert!(ImageFileReader::new()
            .read(Path::new("/nonexistent/test.png"))
            .is_err());
    }
}
