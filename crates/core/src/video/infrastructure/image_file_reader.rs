use std::path::Path;

use crate::shared::frame::Frame;
use crate::shared::video_metadata::VideoMetadata;
use crate::video::domain::video_reader::{FrameResult, VideoReader};

/// Adapts a single still image to the [`VideoReader`] interface.
///
/// The image is decoded on `open` and yielded as the only frame.
/// Used for enrolling faces from photos.
#[derive(Default)]
pub struct ImageFileReader {
    frame: Option<Frame>,
}

impl ImageFileReader {
    pub fn new() -> Self {
        Self::default()
    }
}

impl VideoReader for ImageFileReader {
    fn open(&mut self, path: &Path) -> Result<VideoMetadata, Box<dyn std::error::Error>> {
        let reader = image::ImageReader::open(path)?.with_guessed_format()?;
        let codec = reader
            .format()
            .map(|f| f.extensions_str().first().copied().unwrap_or_default().to_string())
            .unwrap_or_default();
        let rgb = reader.decode()?.to_rgb8();
        let (width, height) = rgb.dimensions();

        self.frame = Some(Frame::new(rgb.into_raw(), width, height, 3, 0));
        Ok(VideoMetadata {
            width,
            height,
            fps: 0.0,
            codec,
            source_path: Some(path.to_path_buf()),
        })
    }

    fn frames(&mut self) -> Box<dyn Iterator<Item = FrameResult> + '_> {
        match self.frame.take() {
            Some(frame) => Box::new(std::iter::once(Ok(frame))),
            None => Box::new(std::iter::once(Err("image not opened".into()))),
        }
    }

    fn close(&mut self) {
        self.frame = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn write_test_image(dir: &Path, name: &str, width: u32, height: u32) -> PathBuf {
        let path = dir.join(name);
        let mut img = image::RgbImage::new(width, height);
        for pixel in img.pixels_mut() {
            *pixel = image::Rgb([50, 100, 200]);
        }
        img.save(&path).unwrap();
        path
    }

    #[test]
    fn test_open_returns_image_metadata() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_test_image(dir.path(), "face.png", 40, 30);
        let mut reader = ImageFileReader::new();

        let meta = reader.open(&path).unwrap();

        assert_eq!(meta.width, 40);
        assert_eq!(meta.height, 30);
        assert_eq!(meta.fps, 0.0);
        assert_eq!(meta.codec, "png");
        assert_eq!(meta.source_path, Some(path));
    }

    #[test]
    fn test_yields_exactly_one_frame() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_test_image(dir.path(), "face.png", 20, 10);
        let mut reader = ImageFileReader::new();
        reader.open(&path).unwrap();

        let frames: Vec<_> = reader.frames().collect();

        assert_eq!(frames.len(), 1);
        let frame = frames.into_iter().next().unwrap().unwrap();
        assert_eq!((frame.width(), frame.height(), frame.channels()), (20, 10, 3));
        assert_eq!(&frame.data()[..3], &[50, 100, 200]);
    }

    #[test]
    fn test_frames_before_open_yields_error() {
        let mut reader = ImageFileReader::new();
        assert!(reader.frames().next().unwrap().is_err());
    }

    #[test]
    fn test_second_pass_yields_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_test_image(dir.path(), "face.png", 4, 4);
        let mut reader = ImageFileReader::new();
        reader.open(&path).unwrap();

        assert!(reader.frames().next().unwrap().is_ok());
        assert!(reader.frames().next().unwrap().is_err());
    }

    #[test]
    fn test_not_an_image_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.png");
        std::fs::write(&path, b"definitely not a png").unwrap();
        let mut reader = ImageFileReader::new();
        assert!(reader.open(&path).is_err());
    }
}
