//! Stub collaborators shared by the pipeline tests.

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex};

use crate::detection::domain::face_detector::FaceDetector;
use crate::pixelation::domain::frame_redactor::FrameRedactor;
use crate::shared::frame::Frame;
use crate::shared::region::Region;
use crate::shared::video_metadata::VideoMetadata;
use crate::video::domain::video_reader::VideoReader;
use crate::video::domain::video_writer::VideoWriter;

pub type Shared<T> = Arc<Mutex<T>>;

pub const WIDTH: u32 = 100;
pub const HEIGHT: u32 = 100;
pub const FPS: f64 = 10.0;

pub fn make_frame(index: usize) -> Frame {
    Frame::filled(WIDTH, HEIGHT, [128, 128, 128], index, index as f64 / FPS)
}

pub fn make_frames(count: usize) -> Vec<Frame> {
    (0..count).map(make_frame).collect()
}

pub fn metadata(total_frames: usize) -> VideoMetadata {
    VideoMetadata {
        width: WIDTH,
        height: HEIGHT,
        fps: FPS,
        total_frames,
        codec: String::new(),
        source_path: None,
    }
}

pub struct StubReader {
    items: Vec<Result<Frame, String>>,
    pub closed: Shared<bool>,
}

impl StubReader {
    pub fn new(frames: Vec<Frame>) -> Self {
        Self::with_items(frames.into_iter().map(Ok).collect())
    }

    /// Yields `items` in order; an `Err` entry becomes a decode error.
    pub fn with_items(items: Vec<Result<Frame, String>>) -> Self {
        Self {
            items,
            closed: Arc::new(Mutex::new(false)),
        }
    }
}

impl VideoReader for StubReader {
    fn open(&mut self, _path: &Path) -> Result<VideoMetadata, Box<dyn std::error::Error>> {
        Ok(metadata(self.items.len()))
    }

    fn frames(
        &mut self,
    ) -> Box<dyn Iterator<Item = Result<Frame, Box<dyn std::error::Error>>> + '_> {
        Box::new(self.items.drain(..).map(|item| item.map_err(Into::into)))
    }

    fn close(&mut self) {
        *self.closed.lock().unwrap() = true;
    }
}

pub struct StubWriter {
    pub written: Shared<Vec<Frame>>,
    pub closed: Shared<bool>,
    fail_at: Option<usize>,
}

impl StubWriter {
    pub fn new() -> Self {
        Self {
            written: Arc::new(Mutex::new(Vec::new())),
            closed: Arc::new(Mutex::new(false)),
            fail_at: None,
        }
    }

    /// Fails when asked to write the frame with this index.
    pub fn failing_at(index: usize) -> Self {
        Self {
            fail_at: Some(index),
            ..Self::new()
        }
    }
}

impl VideoWriter for StubWriter {
    fn open(
        &mut self,
        _path: &Path,
        _metadata: &VideoMetadata,
    ) -> Result<(), Box<dyn std::error::Error>> {
        Ok(())
    }

    fn write(&mut self, frame: &Frame) -> Result<(), Box<dyn std::error::Error>> {
        if self.fail_at == Some(frame.index()) {
            return Err("disk full".into());
        }
        self.written.lock().unwrap().push(frame.clone());
        Ok(())
    }

    fn close(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        *self.closed.lock().unwrap() = true;
        Ok(())
    }
}

/// Returns canned detections per frame index; indices in `failing` error.
#[derive(Default)]
pub struct StubDetector {
    pub results: HashMap<usize, Vec<Region>>,
    pub failing: Vec<usize>,
    pub calls: Shared<usize>,
}

impl FaceDetector for StubDetector {
    fn detect(&mut self, frame: &Frame) -> Result<Vec<Region>, Box<dyn std::error::Error>> {
        *self.calls.lock().unwrap() += 1;
        if self.failing.contains(&frame.index()) {
            return Err("inference failed".into());
        }
        Ok(self
            .results
            .get(&frame.index())
            .cloned()
            .unwrap_or_default())
    }
}

/// Records the regions it is asked to redact, leaving pixels untouched.
#[derive(Default)]
pub struct RecordingRedactor {
    pub calls: Shared<Vec<(usize, Vec<Region>)>>,
}

impl FrameRedactor for RecordingRedactor {
    fn redact(&self, frame: &mut Frame, regions: &[Region]) -> Result<(), Box<dyn std::error::Error>> {
        self.calls
            .lock()
            .unwrap()
            .push((frame.index(), regions.to_vec()));
        Ok(())
    }
}
