use std::path::Path;

use crate::shared::frame::Frame;
use crate::shared::video_metadata::VideoMetadata;
use crate::video::domain::video_reader::VideoReader;

/// Presents a still image as a one-frame video at `t = 0`.
///
/// `fps` is 0 and `total_frames` is 1, so the image runs through the same
/// tracker and redactor as a video frame would.
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
        let rgb = image::open(path)
            .map_err(|e| format!("cannot open {}: {e}", path.display()))?
            .to_rgb8();
        let (width, height) = rgb.dimensions();

        self.frame = Some(Frame::new(rgb.into_raw(), width, height, 0, 0.0));

        Ok(VideoMetadata {
            width,
            height,
            fps: 0.0,
            total_frames: 1,
            codec: String::new(),
            source_path: Some(path.to_path_buf()),
        })
    }

    fn frames(
        &mut self,
    ) -> Box<dyn Iterator<Item = Result<Frame, Box<dyn std::error::Error>>> + '_> {
        match self.frame.take() {
            Some(frame) => Box::new(std::iter::once(Ok(frame))),
            None => Box::new(std::iter::once(Err("ImageFileReader: not opened".into()))),
        }
    }

    fn close(&mut self) {
        self.frame = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_png(path: &Path, width: u32, height: u32, rgb: [u8; 3]) {
        image::RgbImage::from_pixel(width, height, image::Rgb(rgb))
            .save(path)
            .unwrap();
    }

    #[test]
    fn test_open_returns_single_frame_metadata() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("photo.png");
        write_png(&path, 40, 30, [1, 2, 3]);

        let mut reader = ImageFileReader::new();
        let meta = reader.open(&path).unwrap();

        assert_eq!((meta.width, meta.height), (40, 30));
        assert_eq!(meta.total_frames, 1);
        assert_eq!(meta.fps, 0.0);
        assert_eq!(meta.source_path, Some(path));
    }

    #[test]
    fn test_yields_exactly_one_frame_at_time_zero() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("photo.png");
        write_png(&path, 8, 6, [10, 20, 30]);

        let mut reader = ImageFileReader::new();
        reader.open(&path).unwrap();
        let frames: Vec<_> = reader.frames().map(|f| f.unwrap()).collect();

        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].index(), 0);
        assert_eq!(frames[0].timestamp(), 0.0);
        assert_eq!(frames[0].pixel(7, 5), [10, 20, 30]);
    }

    #[test]
    fn test_open_nonexistent_fails() {
        let mut reader = ImageFileReader::new();
        assert!(reader.open(Path::new("/nonexistent/photo.jpg")).is_err());
    }

    #[test]
    fn test_open_garbage_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.png");
        std::fs::write(&path, b"definitely not a png").unwrap();
        assert!(ImageFileReader::new().open(&path).is_err());
    }

    #[test]
    fn test_frames_without_open_returns_error() {
        let mut reader = ImageFileReader::new();
        assert!(reader.frames().next().unwrap().is_err());
    }
}
