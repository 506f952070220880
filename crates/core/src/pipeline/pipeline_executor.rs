use std::path::Path;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use crate::detection::domain::face_detector::FaceDetector;
use crate::shared::video_metadata::VideoMetadata;
use crate::video::domain::video_reader::VideoReader;
use crate::video::domain::video_writer::VideoWriter;

use super::frame_redaction::FrameRedactionStep;
use super::pipeline_logger::{NullPipelineLogger, PipelineLogger};

/// Progress callback: `(frames_done, total_frames)`. Returning `false`
/// stops the run after the current frame.
pub type ProgressFn = Box<dyn Fn(usize, usize) -> bool + Send>;

/// Configuration for a pipeline execution run.
pub struct PipelineConfig {
    pub on_progress: Option<ProgressFn>,
    pub cancelled: Arc<AtomicBool>,
    pub logger: Box<dyn PipelineLogger>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            on_progress: None,
            cancelled: Arc::new(AtomicBool::new(false)),
            logger: Box::new(NullPipelineLogger),
        }
    }
}

/// What a finished (or stopped) run did.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PipelineReport {
    pub frames_processed: usize,
    /// Frames where the detector ran and failed.
    pub detection_unavailable: usize,
    /// Sum over frames of the regions handed to the redactor.
    pub regions_redacted: usize,
    /// The run stopped early; the output holds only the frames processed.
    pub cancelled: bool,
}

/// Abstracts how the read → detect → track/redact → write pipeline runs.
///
/// With `detector` set to `None` no detection is attempted and every frame
/// is treated as suppressed; only manual overrides are redacted.
pub trait PipelineExecutor: Send {
    #[allow(clippy::too_many_arguments)]
    fn execute(
        &self,
        reader: Box<dyn VideoReader>,
        writer: Box<dyn VideoWriter>,
        detector: Option<Box<dyn FaceDetector>>,
        step: FrameRedactionStep,
        metadata: &VideoMetadata,
        output_path: &Path,
        config: PipelineConfig,
    ) -> Result<PipelineReport, Box<dyn std::error::Error>>;
}
