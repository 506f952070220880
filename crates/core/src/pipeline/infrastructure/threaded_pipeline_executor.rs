use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Instant;

use crossbeam_channel::{Receiver, Sender};

use crate::detection::domain::face_detector::{DetectionOutcome, FaceDetector};
use crate::pipeline::frame_redaction::FrameRedactionStep;
use crate::pipeline::pipeline_executor::{
    PipelineConfig, PipelineExecutor, PipelineReport, ProgressFn,
};
use crate::pipeline::pipeline_logger::PipelineLogger;
use crate::shared::frame::Frame;
use crate::shared::video_metadata::VideoMetadata;
use crate::video::domain::video_reader::VideoReader;
use crate::video::domain::video_writer::VideoWriter;

const DEFAULT_CHANNEL_CAPACITY: usize = 8;

type SendError = Box<dyn std::error::Error + Send + Sync>;

struct Detected {
    frame: Frame,
    outcome: DetectionOutcome,
    detect_ms: f64,
}

/// Runs the redaction pipeline with dedicated threads for I/O and detection.
///
/// Layout: `reader → detect → main [track + redact] → writer`
///
/// Every stage is a single thread fed by a FIFO channel, so frames reach
/// the tracker in decode order. Detection of frame N+1 overlaps with
/// redaction and encoding of frame N.
pub struct ThreadedPipelineExecutor {
    channel_capacity: usize,
}

impl ThreadedPipelineExecutor {
    pub fn new() -> Self {
        Self {
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
        }
    }

    pub fn with_channel_capacity(capacity: usize) -> Self {
        Self {
            channel_capacity: capacity.max(1),
        }
    }
}

impl Default for ThreadedPipelineExecutor {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineExecutor for ThreadedPipelineExecutor {
    fn execute(
        &self,
        reader: Box<dyn VideoReader>,
        mut writer: Box<dyn VideoWriter>,
        detector: Option<Box<dyn FaceDetector>>,
        step: FrameRedactionStep,
        metadata: &VideoMetadata,
        output_path: &Path,
        config: PipelineConfig,
    ) -> Result<PipelineReport, Box<dyn std::error::Error>> {
        let PipelineConfig {
            on_progress,
            cancelled,
            mut logger,
        } = config;
        let cap = self.channel_capacity;

        writer.open(output_path, metadata)?;
        if detector.is_none() {
            logger.info("Detection disabled, redacting manual overrides only");
        }

        let (frame_tx, frame_rx) = crossbeam_channel::bounded::<Result<Frame, SendError>>(cap);
        let (detected_tx, detected_rx) =
            crossbeam_channel::bounded::<Result<Detected, SendError>>(cap);
        let (write_tx, write_rx) = crossbeam_channel::bounded::<Frame>(cap);

        let reader_handle = spawn_reader(reader, frame_tx, cancelled.clone());
        let detect_handle = spawn_detector(detector, frame_rx, detected_tx, cancelled.clone());
        let writer_handle = spawn_writer(writer, write_rx);

        let mut main_loop = MainLoop {
            step,
            write_tx,
            on_progress,
            cancelled,
            logger: &mut *logger,
            total_frames: metadata.total_frames,
            report: PipelineReport::default(),
        };
        let main_error = main_loop.run(detected_rx);
        let report = main_loop.finish();

        let result = join_threads(reader_handle, detect_handle, writer_handle, main_error);
        logger.summary();
        result.map(|()| report)
    }
}

fn spawn_reader(
    mut reader: Box<dyn VideoReader>,
    frame_tx: Sender<Result<Frame, SendError>>,
    cancelled: Arc<AtomicBool>,
) -> JoinHandle<Box<dyn VideoReader>> {
    std::thread::spawn(move || {
        for frame_result in reader.frames() {
            if cancelled.load(Ordering::Relaxed) {
                break;
            }
            let mapped = frame_result.map_err(|e| -> SendError { e.to_string().into() });
            if frame_tx.send(mapped).is_err() {
                break;
            }
        }
        reader.close();
        reader
    })
}

fn spawn_detector(
    mut detector: Option<Box<dyn FaceDetector>>,
    frame_rx: Receiver<Result<Frame, SendError>>,
    detected_tx: Sender<Result<Detected, SendError>>,
    cancelled: Arc<AtomicBool>,
) -> JoinHandle<()> {
    std::thread::spawn(move || {
        for frame_result in frame_rx {
            if cancelled.load(Ordering::Relaxed) {
                break;
            }

            let result = frame_result.map(|frame| {
                let start = Instant::now();
                let outcome = match detector.as_deref_mut() {
                    Some(d) => DetectionOutcome::from_detector(d, &frame),
                    None => DetectionOutcome::Suppressed,
                };
                Detected {
                    frame,
                    outcome,
                    detect_ms: start.elapsed().as_secs_f64() * 1000.0,
                }
            });

            if detected_tx.send(result).is_err() {
                break;
            }
        }
    })
}

fn spawn_writer(
    mut writer: Box<dyn VideoWriter>,
    write_rx: Receiver<Frame>,
) -> JoinHandle<Result<Box<dyn VideoWriter>, (Box<dyn VideoWriter>, SendError)>> {
    std::thread::spawn(move || {
        for frame in write_rx {
            if let Err(e) = writer.write(&frame) {
                let e: SendError = e.to_string().into();
                return Err((writer, e));
            }
        }
        Ok(writer)
    })
}

/// Main-thread state: receives detected frames, tracks, redacts and forwards
/// them to the writer.
struct MainLoop<'a> {
    step: FrameRedactionStep,
    write_tx: Sender<Frame>,
    on_progress: Option<ProgressFn>,
    cancelled: Arc<AtomicBool>,
    logger: &'a mut dyn PipelineLogger,
    total_frames: usize,
    report: PipelineReport,
}

impl MainLoop<'_> {
    /// Consumes `detected_rx` until it drains, the run is cancelled or a
    /// stage fails. Dropping the receiver unblocks the upstream threads.
    fn run(
        &mut self,
        detected_rx: Receiver<Result<Detected, SendError>>,
    ) -> Option<Box<dyn std::error::Error>> {
        for detected in detected_rx {
            if self.cancelled.load(Ordering::Relaxed) {
                self.report.cancelled = true;
                break;
            }
            let detected = match detected {
                Ok(d) => d,
                Err(e) => return Some(e.to_string().into()),
            };
            match self.process(detected) {
                Ok(true) => {}
                // Writer thread exited; its error surfaces on join.
                Ok(false) => break,
                Err(e) => return Some(e),
            }
        }
        None
    }

    fn process(&mut self, detected: Detected) -> Result<bool, Box<dyn std::error::Error>> {
        let Detected {
            mut frame,
            outcome,
            detect_ms,
        } = detected;

        if outcome.is_unavailable() {
            self.report.detection_unavailable += 1;
        }

        let start = Instant::now();
        let regions = self.step.track(&frame, &outcome);
        let track_ms = start.elapsed().as_secs_f64() * 1000.0;

        let start = Instant::now();
        self.step.redact(&mut frame, &regions)?;
        let redact_ms = start.elapsed().as_secs_f64() * 1000.0;

        self.logger.timing("detect", detect_ms);
        self.logger.timing("track", track_ms);
        self.logger.timing("redact", redact_ms);
        self.logger.metric("regions", regions.len() as f64);

        if self.write_tx.send(frame).is_err() {
            return Ok(false);
        }

        self.report.frames_processed += 1;
        self.report.regions_redacted += regions.len();
        let done = self.report.frames_processed;
        self.logger.progress(done, self.total_frames);

        if let Some(callback) = &self.on_progress {
            if !callback(done, self.total_frames) {
                self.cancelled.store(true, Ordering::Relaxed);
            }
        }
        Ok(true)
    }

    /// Closes the writer channel and hands back the report.
    fn finish(self) -> PipelineReport {
        let mut report = self.report;
        report.cancelled |= self.cancelled.load(Ordering::Relaxed);
        if report.cancelled {
            self.logger.info(&format!(
                "Stopped after {} frames; output is truncated",
                report.frames_processed
            ));
        }
        report
    }
}

/// Joins all pipeline threads and coalesces the first error encountered.
///
/// The writer is closed even after an error so that whatever was encoded
/// remains a playable file.
fn join_threads(
    reader_handle: JoinHandle<Box<dyn VideoReader>>,
    detect_handle: JoinHandle<()>,
    writer_handle: JoinHandle<Result<Box<dyn VideoWriter>, (Box<dyn VideoWriter>, SendError)>>,
    mut first_error: Option<Box<dyn std::error::Error>>,
) -> Result<(), Box<dyn std::error::Error>> {
    fn set_if_none(slot: &mut Option<Box<dyn std::error::Error>>, err: Box<dyn std::error::Error>) {
        if slot.is_none() {
            *slot = Some(err);
        }
    }

    match reader_handle.join() {
        Ok(mut r) => r.close(),
        Err(_) => set_if_none(&mut first_error, "Reader thread panicked".into()),
    }

    if detect_handle.join().is_err() {
        set_if_none(&mut first_error, "Detect thread panicked".into());
    }

    match writer_handle.join() {
        Ok(Ok(mut w)) => {
            if let Err(e) = w.close() {
                set_if_none(&mut first_error, e);
            }
        }
        Ok(Err((mut w, e))) => {
            set_if_none(&mut first_error, e.to_string().into());
            if let Err(close_err) = w.close() {
                log::warn!("Closing writer after failure: {close_err}");
            }
        }
        Err(_) => set_if_none(&mut first_error, "Writer thread panicked".into()),
    }

    match first_error {
        Some(e) => Err(e),
        None => Ok(()),
    }
}
