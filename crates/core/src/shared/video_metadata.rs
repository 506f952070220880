use std::path::PathBuf;

#[derive(Clone, Debug, PartialEq)]
pub struct VideoMetadata {
    pub width: u32,
    pub height: u32,
    pub fps: f64,
    pub total_frames: usize,
    pub codec: String,
    pub source_path: Option<PathBuf>,
}

impl VideoMetadata {
    /// Presentation time of frame `index` assuming a constant frame rate.
    ///
    /// Used when the container gives no timestamp for a frame. Stills
    /// (`fps == 0`) are always at `t = 0`.
    pub fn frame_time(&self, index: usize) -> f64 {
        if self.fps > 0.0 {
            index as f64 / self.fps
        } else {
            0.0
        }
    }
}
