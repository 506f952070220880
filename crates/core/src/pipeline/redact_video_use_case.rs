use std::path::Path;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use crate::detection::domain::face_detector::FaceDetector;
use crate::shared::video_metadata::VideoMetadata;
use crate::video::domain::video_reader::VideoReader;
use crate::video::domain::video_writer::VideoWriter;

use super::frame_redaction::FrameRedactionStep;
use super::pipeline_executor::{PipelineConfig, PipelineExecutor, PipelineReport, ProgressFn};
use super::pipeline_logger::{NullPipelineLogger, PipelineLogger};

/// Redacts one video from an opened reader into a writer.
///
/// Single-use: `execute` hands the owned components to the executor, so a
/// second call fails. Pass `None` as the detector for manual-only runs.
pub struct RedactVideoUseCase {
    reader: Option<Box<dyn VideoReader>>,
    writer: Option<Box<dyn VideoWriter>>,
    detector: Option<Box<dyn FaceDetector>>,
    step: Option<FrameRedactionStep>,
    executor: Box<dyn PipelineExecutor>,
    on_progress: Option<ProgressFn>,
    cancelled: Arc<AtomicBool>,
    logger: Option<Box<dyn PipelineLogger>>,
}

impl RedactVideoUseCase {
    pub fn new(
        reader: Box<dyn VideoReader>,
        writer: Box<dyn VideoWriter>,
        detector: Option<Box<dyn FaceDetector>>,
        step: FrameRedactionStep,
        executor: Box<dyn PipelineExecutor>,
    ) -> Self {
        Self {
            reader: Some(reader),
            writer: Some(writer),
            detector,
            step: Some(step),
            executor,
            on_progress: None,
            cancelled: Arc::new(AtomicBool::new(false)),
            logger: None,
        }
    }

    pub fn with_progress(mut self, on_progress: ProgressFn) -> Self {
        self.on_progress = Some(on_progress);
        self
    }

    /// Shares a cancel flag with the caller; setting it stops the run.
    pub fn with_cancel_flag(mut self, cancelled: Arc<AtomicBool>) -> Self {
        self.cancelled = cancelled;
        self
    }

    pub fn with_logger(mut self, logger: Box<dyn PipelineLogger>) -> Self {
        self.logger = Some(logger);
        self
    }

    pub fn execute(
        &mut self,
        metadata: &VideoMetadata,
        output_path: &Path,
    ) -> Result<PipelineReport, Box<dyn std::error::Error>> {
        let reader = self.reader.take().ok_or("Pipeline already executed")?;
        let writer = self.writer.take().ok_or("Pipeline already executed")?;
        let step = self.step.take().ok_or("Pipeline already executed")?;

        let config = PipelineConfig {
            on_progress: self.on_progress.take(),
            cancelled: self.cancelled.clone(),
            logger: self
                .logger
                .take()
                .unwrap_or_else(|| Box::new(NullPipelineLogger)),
        };

        self.executor.execute(
            reader,
            writer,
            self.detector.take(),
            step,
            metadata,
            output_path,
            config,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::domain::region_tracker::RegionTracker;
    use crate::overrides::domain::manual_override::OverrideSchedule;
    use crate::pipeline::infrastructure::threaded_pipeline_executor::ThreadedPipelineExecutor;
    use crate::pipeline::test_support::*;
    use crate::shared::region::Region;
    use std::collections::HashMap;
    use std::sync::atomic::Ordering;

    fn step_with(redactor: RecordingRedactor) -> FrameRedactionStep {
        FrameRedactionStep::new(RegionTracker::new(3), OverrideSchedule::default(), Box::new(redactor))
    }

    fn use_case(
        frames: usize,
        writer: StubWriter,
        detector: Option<StubDetector>,
        redactor: RecordingRedactor,
    ) -> RedactVideoUseCase {
        RedactVideoUseCase::new(
            Box::new(StubReader::new(make_frames(frames))),
            Box::new(writer),
            detector.map(|d| Box::new(d) as Box<dyn FaceDetector>),
            step_with(redactor),
            Box::new(ThreadedPipelineExecutor::new()),
        )
    }

    #[test]
    fn test_execute_returns_report() {
        let face = Region::new(20, 20, 30, 30);
        let detector = StubDetector {
            results: HashMap::from([(1, vec![face])]),
            ..Default::default()
        };
        let writer = StubWriter::new();
        let written = writer.written.clone();

        let mut uc = use_case(4, writer, Some(detector), RecordingRedactor::default());
        let report = uc
            .execute(&metadata(4), Path::new("/tmp/out.mp4"))
            .unwrap();

        assert_eq!(report.frames_processed, 4);
        // Frame 1 plus two frames of persistence decay.
        assert_eq!(report.regions_redacted, 3);
        assert_eq!(written.lock().unwrap().len(), 4);
    }

    #[test]
    fn test_second_execute_fails() {
        let mut uc = use_case(1, StubWriter::new(), None, RecordingRedactor::default());
        uc.execute(&metadata(1), Path::new("/tmp/out.mp4")).unwrap();

        let err = uc
            .execute(&metadata(1), Path::new("/tmp/out.mp4"))
            .unwrap_err();
        assert_eq!(err.to_string(), "Pipeline already executed");
    }

    #[test]
    fn test_progress_callback_sees_every_frame() {
        let seen = Arc::new(std::sync::Mutex::new(Vec::new()));
        let sink = seen.clone();

        let mut uc = use_case(3, StubWriter::new(), None, RecordingRedactor::default())
            .with_progress(Box::new(move |done, total| {
                sink.lock().unwrap().push((done, total));
                true
            }));
        uc.execute(&metadata(3), Path::new("/tmp/out.mp4")).unwrap();

        assert_eq!(*seen.lock().unwrap(), vec![(1, 3), (2, 3), (3, 3)]);
    }

    #[test]
    fn test_shared_cancel_flag_stops_run() {
        let flag = Arc::new(AtomicBool::new(false));
        let trigger = flag.clone();

        let mut uc = use_case(50, StubWriter::new(), None, RecordingRedactor::default())
            .with_cancel_flag(flag)
            .with_progress(Box::new(move |done, _| {
                if done == 2 {
                    trigger.store(true, Ordering::Relaxed);
                }
                true
            }));
        let report = uc
            .execute(&metadata(50), Path::new("/tmp/out.mp4"))
            .unwrap();

        assert!(report.cancelled);
        assert_eq!(report.frames_processed, 2);
    }
}
