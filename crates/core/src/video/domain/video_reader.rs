use std::path::Path;

use crate::shared::frame::Frame;
use crate::shared::video_metadata::VideoMetadata;

/// Produces frames from a video or still-image source.
///
/// Frames come out in presentation order with non-decreasing timestamps.
/// Everything downstream relies on that ordering.
pub trait VideoReader: Send {
    /// Opens the source and returns its metadata. An unreadable source fails
    /// here, before any frame is produced.
    fn open(&mut self, path: &Path) -> Result<VideoMetadata, Box<dyn std::error::Error>>;

    fn frames(
        &mut self,
    ) -> Box<dyn Iterator<Item = Result<Frame, Box<dyn std::error::Error>>> + '_>;

    fn close(&mut self);
}
