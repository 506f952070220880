use std::path::Path;

use crate::detection::domain::face_detector::{DetectionOutcome, FaceDetector};
use crate::video::domain::image_writer::ImageWriter;
use crate::video::domain::video_reader::VideoReader;

use super::frame_redaction::FrameRedactionStep;
use super::pipeline_executor::PipelineReport;

/// Still-image pipeline: read → detect → track → redact → write.
///
/// The image is a one-frame video at `t = 0`, so overrides whose interval
/// covers zero apply and persistence never comes into play.
pub struct RedactImageUseCase {
    reader: Box<dyn VideoReader>,
    image_writer: Box<dyn ImageWriter>,
    detector: Option<Box<dyn FaceDetector>>,
    step: FrameRedactionStep,
}

impl RedactImageUseCase {
    pub fn new(
        reader: Box<dyn VideoReader>,
        image_writer: Box<dyn ImageWriter>,
        detector: Option<Box<dyn FaceDetector>>,
        step: FrameRedactionStep,
    ) -> Self {
        Self {
            reader,
            image_writer,
            detector,
            step,
        }
    }

    pub fn execute(
        &mut self,
        input_path: &Path,
        output_path: &Path,
    ) -> Result<PipelineReport, Box<dyn std::error::Error>> {
        self.reader.open(input_path)?;
        let mut frame = self.reader.frames().next().ok_or("No frames in image")??;
        self.reader.close();

        let outcome = match self.detector.as_deref_mut() {
            Some(detector) => DetectionOutcome::from_detector(detector, &frame),
            None => DetectionOutcome::Suppressed,
        };
        let regions = self.step.apply(&mut frame, &outcome)?;
        self.image_writer.write(output_path, &frame)?;

        Ok(PipelineReport {
            frames_processed: 1,
            detection_unavailable: usize::from(outcome.is_unavailable()),
            regions_redacted: regions.len(),
            cancelled: false,
        })
    }
}
