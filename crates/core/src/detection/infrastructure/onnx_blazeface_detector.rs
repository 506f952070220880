//! Short-range BlazeFace detector running on ONNX Runtime.
//!
//! Boxes only: no landmarks are decoded and nothing is tracked between
//! frames. Persistence across missed detections is the tracker's job.

use std::path::Path;

use ndarray::Array4;

use super::execution_provider::preferred_execution_providers;
use crate::detection::domain::face_detector::FaceDetector;
use crate::shared::config::RedactionConfig;
use crate::shared::frame::Frame;
use crate::shared::region::Region;

const INPUT_SIZE: u32 = 128;
const NUM_ANCHORS: usize = 896;
/// Values per anchor in the regressor output: box (4) + six keypoints (12).
const REGRESSOR_STRIDE: usize = 16;
const NMS_IOU_THRESH: f64 = 0.3;

pub struct OnnxBlazefaceDetector {
    session: ort::session::Session,
    confidence: f32,
    anchors: Vec<[f32; 2]>,
}

impl OnnxBlazefaceDetector {
    pub fn new(model_path: &Path, confidence: f64) -> Result<Self, Box<dyn std::error::Error>> {
        let session = ort::session::Session::builder()?
            .with_execution_providers(preferred_execution_providers())?
            .commit_from_file(model_path)?;
        log::info!(
            "Loaded BlazeFace model from {} (confidence >= {confidence})",
            model_path.display()
        );
        Ok(Self {
            session,
            confidence: confidence as f32,
            anchors: generate_anchors(),
        })
    }

    pub fn from_config(
        model_path: &Path,
        config: &RedactionConfig,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        Self::new(model_path, config.confidence)
    }
}

impl FaceDetector for OnnxBlazefaceDetector {
    fn detect(&mut self, frame: &Frame) -> Result<Vec<Region>, Box<dyn std::error::Error>> {
        let input = ort::value::Tensor::from_array(preprocess(frame, INPUT_SIZE))?;
        let outputs = self.session.run(ort::inputs![input])?;

        // regressors: [1, 896, 16], classificators: [1, 896, 1]
        if outputs.len() < 2 {
            return Err(format!("BlazeFace model expected 2 outputs, got {}", outputs.len()).into());
        }
        let regressors = outputs[0].try_extract_array::<f32>()?;
        let scores = outputs[1].try_extract_array::<f32>()?;
        let reg_data = regressors.as_slice().ok_or("regressor tensor is not contiguous")?;
        let score_data = scores.as_slice().ok_or("score tensor is not contiguous")?;

        let mut candidates = decode(
            reg_data,
            score_data,
            &self.anchors,
            self.confidence,
            frame.width(),
            frame.height(),
        );
        let kept = nms(&mut candidates, NMS_IOU_THRESH);

        Ok(kept
            .iter()
            .filter_map(|c| c.to_region(frame.width(), frame.height()))
            .collect())
    }
}

/// Nearest-neighbour resize to `size × size`, scaled to `[0, 1]`, NCHW.
fn preprocess(frame: &Frame, size: u32) -> Array4<f32> {
    let src = frame.as_ndarray();
    let src_h = frame.height() as usize;
    let src_w = frame.width() as usize;
    let s = size as usize;

    let mut tensor = Array4::<f32>::zeros((1, 3, s, s));
    for y in 0..s {
        let src_y = (((y as f64 + 0.5) * src_h as f64 / s as f64) as usize).min(src_h - 1);
        for x in 0..s {
            let src_x = (((x as f64 + 0.5) * src_w as f64 / s as f64) as usize).min(src_w - 1);
            for c in 0..3 {
                tensor[[0, c, y, x]] = f32::from(src[[src_y, src_x, c]]) / 255.0;
            }
        }
    }
    tensor
}

/// Anchor centres for the short-range model: a 16×16 grid with two anchors
/// per cell followed by an 8×8 grid with six.
fn generate_anchors() -> Vec<[f32; 2]> {
    let mut anchors = Vec::with_capacity(NUM_ANCHORS);
    for &(stride, per_cell) in &[(8usize, 2usize), (16, 6)] {
        let grid = INPUT_SIZE as usize / stride;
        for y in 0..grid {
            for x in 0..grid {
                let centre = [
                    (x as f32 + 0.5) / grid as f32,
                    (y as f32 + 0.5) / grid as f32,
                ];
                anchors.extend(std::iter::repeat(centre).take(per_cell));
            }
        }
    }
    anchors
}

#[derive(Clone, Debug, PartialEq)]
struct Candidate {
    x1: f64,
    y1: f64,
    x2: f64,
    y2: f64,
    score: f64,
}

impl Candidate {
    fn to_region(&self, frame_width: u32, frame_height: u32) -> Option<Region> {
        let x = self.x1 as i32;
        let y = self.y1 as i32;
        let width = ((self.x2 - self.x1) as i32).min(frame_width as i32 - x);
        let height = ((self.y2 - self.y1) as i32).min(frame_height as i32 - y);
        let region = Region::new(x, y, width, height);
        (!region.is_empty()).then_some(region)
    }

    fn area(&self) -> f64 {
        (self.x2 - self.x1) * (self.y2 - self.y1)
    }

    fn iou(&self, other: &Candidate) -> f64 {
        let ix = (self.x2.min(other.x2) - self.x1.max(other.x1)).max(0.0);
        let iy = (self.y2.min(other.y2) - self.y1.max(other.y1)).max(0.0);
        let inter = ix * iy;
        if inter == 0.0 {
            return 0.0;
        }
        inter / (self.area() + other.area() - inter)
    }
}

/// Decodes anchor-relative boxes above `confidence` into frame pixels.
fn decode(
    reg_data: &[f32],
    score_data: &[f32],
    anchors: &[[f32; 2]],
    confidence: f32,
    frame_width: u32,
    frame_height: u32,
) -> Vec<Candidate> {
    let fw = frame_width as f32;
    let fh = frame_height as f32;
    let scale = INPUT_SIZE as f32;
    let mut candidates = Vec::new();

    for (i, (&raw_score, anchor)) in score_data.iter().zip(anchors).enumerate() {
        let score = sigmoid(raw_score);
        if score < confidence {
            continue;
        }
        let Some(reg) = reg_data.get(i * REGRESSOR_STRIDE..i * REGRESSOR_STRIDE + 4) else {
            break;
        };

        let cx = anchor[0] + reg[0] / scale;
        let cy = anchor[1] + reg[1] / scale;
        let w = reg[2] / scale;
        let h = reg[3] / scale;

        candidates.push(Candidate {
            x1: ((cx - w / 2.0) * fw).max(0.0) as f64,
            y1: ((cy - h / 2.0) * fh).max(0.0) as f64,
            x2: ((cx + w / 2.0) * fw).min(fw) as f64,
            y2: ((cy + h / 2.0) * fh).min(fh) as f64,
            score: score as f64,
        });
    }
    candidates
}

fn nms(candidates: &mut [Candidate], iou_thresh: f64) -> Vec<Candidate> {
    candidates.sort_by(|a, b| b.score.total_cmp(&a.score));

    let mut keep: Vec<Candidate> = Vec::new();
    for candidate in candidates.iter() {
        if keep.iter().all(|k| k.iou(candidate) <= iou_thresh) {
            keep.push(candidate.clone());
        }
    }
    keep
}

fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}
