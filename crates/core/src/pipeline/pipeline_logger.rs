use std::collections::BTreeMap;
use std::time::Instant;

/// Observer for redaction pipeline events.
///
/// Stages report per-frame timings (`detect`, `track`, `redact`) and
/// metrics (`regions`) here; callers decide where they end up.
pub trait PipelineLogger: Send {
    /// `current` frames done out of `total`. `total` is 0 when the container
    /// does not report a frame count.
    fn progress(&mut self, current: usize, total: usize);

    fn timing(&mut self, stage: &str, duration_ms: f64);

    fn metric(&mut self, name: &str, value: f64);

    fn info(&mut self, message: &str);

    /// Emit an end-of-run summary. Default: no-op.
    fn summary(&self) {}
}

/// Discards all events.
pub struct NullPipelineLogger;

impl PipelineLogger for NullPipelineLogger {
    fn progress(&mut self, _current: usize, _total: usize) {}
    fn timing(&mut self, _stage: &str, _duration_ms: f64) {}
    fn metric(&mut self, _name: &str, _value: f64) {}
    fn info(&mut self, _message: &str) {}
}

/// Running total for one stage or metric.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Accumulator {
    pub count: usize,
    pub sum: f64,
    pub max: f64,
}

impl Accumulator {
    fn push(&mut self, value: f64) {
        self.count += 1;
        self.sum += value;
        self.max = self.max.max(value);
    }

    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.sum / self.count as f64
        }
    }
}

/// Forwards events to the `log` crate and aggregates per-stage timings for
/// an end-of-run summary.
///
/// Progress lines are emitted every `throttle_frames` frames and on the last
/// frame.
pub struct StdoutPipelineLogger {
    throttle_frames: usize,
    timings: BTreeMap<String, Accumulator>,
    metrics: BTreeMap<String, Accumulator>,
    start_time: Instant,
    frames_done: usize,
}

impl StdoutPipelineLogger {
    pub fn new(throttle_frames: usize) -> Self {
        Self {
            throttle_frames: throttle_frames.max(1),
            timings: BTreeMap::new(),
            metrics: BTreeMap::new(),
            start_time: Instant::now(),
            frames_done: 0,
        }
    }

    /// Returns the formatted summary, or `None` if nothing was recorded.
    pub fn summary_string(&self) -> Option<String> {
        if self.timings.is_empty() && self.metrics.is_empty() {
            return None;
        }

        let elapsed_s = self.start_time.elapsed().as_secs_f64();
        let frames = self.frames_done;
        let mut lines = vec![format!(
            "Redaction summary ({frames} frames, {elapsed_s:.1}s):"
        )];

        for (stage, acc) in &self.timings {
            lines.push(format!(
                "  {stage:8}: avg {:6.1}ms  max {:6.1}ms  total {:7.0}ms",
                acc.mean(),
                acc.max,
                acc.sum
            ));
        }
        for (name, acc) in &self.metrics {
            lines.push(format!("  {name}: avg {:.1}, max {:.0}", acc.mean(), acc.max));
        }

        if frames > 0 && elapsed_s > 0.0 {
            lines.push(format!("  Throughput: {:.1} fps", frames as f64 / elapsed_s));
        }

        Some(lines.join("\n"))
    }

    pub fn timings_for(&self, stage: &str) -> Option<&Accumulator> {
        self.timings.get(stage)
    }

    pub fn metrics_for(&self, name: &str) -> Option<&Accumulator> {
        self.metrics.get(name)
    }

    fn should_report(&self, current: usize, total: usize) -> bool {
        current % self.throttle_frames == 0 || (total > 0 && current == total)
    }
}

impl Default for StdoutPipelineLogger {
    fn default() -> Self {
        Self::new(30)
    }
}

impl PipelineLogger for StdoutPipelineLogger {
    fn progress(&mut self, current: usize, total: usize) {
        self.frames_done = current;
        if !self.should_report(current, total) {
            return;
        }
        if total > 0 {
            let pct = current as f64 / total as f64 * 100.0;
            log::info!("Redacting: {current}/{total} frames ({pct:.1}%)");
        } else {
            log::info!("Redacting: {current} frames");
        }
    }

    fn timing(&mut self, stage: &str, duration_ms: f64) {
        self.timings
            .entry(stage.to_string())
            .or_default()
            .push(duration_ms);
    }

    fn metric(&mut self, name: &str, value: f64) {
        self.metrics.entry(name.to_string()).or_default().push(value);
    }

    fn info(&mut self, message: &str) {
        log::info!("{message}");
    }

    fn summary(&self) {
        if let Some(text) = self.summary_string() {
            log::info!("\n{text}");
        }
    }
}
