use crate::shared::frame::Frame;
use crate::shared::region::Region;

/// Domain interface for face detection.
///
/// Implementations may hold per-video state, hence `&mut self`.
pub trait FaceDetector: Send {
    fn detect(&mut self, frame: &Frame) -> Result<Vec<Region>, Box<dyn std::error::Error>>;
}

/// What the detector contributed to one frame.
#[derive(Clone, Debug, PartialEq)]
pub enum DetectionOutcome {
    /// The detector ran; the list may be empty.
    Detected(Vec<Region>),
    /// The detector ran and failed. Treated like an empty detection.
    Unavailable,
    /// Detection was switched off for this frame (manual-only mode).
    Suppressed,
}

impl DetectionOutcome {
    /// Runs `detector` on `frame`, turning a failure into `Unavailable`.
    ///
    /// A failing detector must not abort redaction of the whole video, so
    /// the error is logged here and goes no further.
    pub fn from_detector(detector: &mut dyn FaceDetector, frame: &Frame) -> Self {
        match detector.detect(frame) {
            Ok(regions) => DetectionOutcome::Detected(regions),
            Err(e) => {
                log::warn!(
                    "Face detection failed on frame {} (t={:.3}s): {e}",
                    frame.index(),
                    frame.timestamp()
                );
                DetectionOutcome::Unavailable
            }
        }
    }

    pub fn is_unavailable(&self) -> bool {
        matches!(self, DetectionOutcome::Unavailable)
    }
}
