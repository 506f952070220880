use crate::detection::domain::face_detector::DetectionOutcome;
use crate::detection::domain::region_tracker::RegionTracker;
use crate::overrides::domain::manual_override::OverrideSchedule;
use crate::pixelation::domain::frame_redactor::FrameRedactor;
use crate::shared::frame::Frame;
use crate::shared::region::Region;

/// Per-frame transform: overrides at `t` + detection outcome → tracker →
/// redactor.
///
/// Owns the tracker for exactly one video. Build a fresh step per video.
pub struct FrameRedactionStep {
    tracker: RegionTracker,
    schedule: OverrideSchedule,
    redactor: Box<dyn FrameRedactor>,
}

impl FrameRedactionStep {
    pub fn new(
        tracker: RegionTracker,
        schedule: OverrideSchedule,
        redactor: Box<dyn FrameRedactor>,
    ) -> Self {
        Self {
            tracker,
            schedule,
            redactor,
        }
    }

    /// Redacts `frame` in place and returns the regions that were handed to
    /// the redactor (before padding).
    pub fn apply(
        &mut self,
        frame: &mut Frame,
        outcome: &DetectionOutcome,
    ) -> Result<Vec<Region>, Box<dyn std::error::Error>> {
        let regions = self.track(frame, outcome);
        self.redact(frame, &regions)?;
        Ok(regions)
    }

    /// Advances the tracker with this frame's outcome and active overrides.
    pub fn track(&mut self, frame: &Frame, outcome: &DetectionOutcome) -> Vec<Region> {
        let overrides = self
            .schedule
            .active_at(frame.timestamp(), frame.width(), frame.height());
        self.tracker.observe(outcome, &overrides)
    }

    pub fn redact(
        &self,
        frame: &mut Frame,
        regions: &[Region],
    ) -> Result<(), Box<dyn std::error::Error>> {
        self.redactor.redact(frame, regions)
    }

    pub fn tracker(&self) -> &RegionTracker {
        &self.tracker
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::overrides::domain::manual_override::ManualOverride;
    use std::sync::{Arc, Mutex};

    type Calls = Arc<Mutex<Vec<(usize, Vec<Region>)>>>;

    struct RecordingRedactor {
        calls: Calls,
    }

    impl FrameRedactor for RecordingRedactor {
        fn redact(
            &self,
            frame: &mut Frame,
            regions: &[Region],
        ) -> Result<(), Box<dyn std::error::Error>> {
            self.calls
                .lock()
                .unwrap()
                .push((frame.index(), regions.to_vec()));
            Ok(())
        }
    }

    fn frame_at(index: usize, t: f64) -> Frame {
        Frame::filled(100, 100, [0, 0, 0], index, t)
    }

    fn make_step(schedule: OverrideSchedule) -> (FrameRedactionStep, Calls) {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let redactor = RecordingRedactor {
            calls: calls.clone(),
        };
        (
            FrameRedactionStep::new(RegionTracker::new(3), schedule, Box::new(redactor)),
            calls,
        )
    }

    #[test]
    fn test_override_injected_only_inside_interval() {
        let manual = Region::new(50, 50, 30, 30);
        let schedule =
            OverrideSchedule::new(vec![ManualOverride::explicit(2.0, 4.0, manual).unwrap()]);
        let (mut step, _) = make_step(schedule);

        for (i, t) in [1.5, 2.0, 3.0, 4.0, 4.5].into_iter().enumerate() {
            let regions = step
                .apply(&mut frame_at(i, t), &DetectionOutcome::Suppressed)
                .unwrap();
            let expected = (2.0..=4.0).contains(&t);
            assert_eq!(regions.contains(&manual), expected, "t = {t}");
        }
    }

    #[test]
    fn test_redactor_receives_tracker_output() {
        let (mut step, calls) = make_step(OverrideSchedule::default());
        let face = Region::new(10, 10, 20, 20);

        step.apply(&mut frame_at(0, 0.0), &DetectionOutcome::Detected(vec![face]))
            .unwrap();
        step.apply(&mut frame_at(1, 0.1), &DetectionOutcome::Unavailable)
            .unwrap();

        let calls = calls.lock().unwrap();
        assert_eq!(calls[0], (0, vec![face]));
        assert_eq!(calls[1], (1, vec![face]));
        assert_eq!(step.tracker().active_regions()[0].time_to_live, 2);
    }
}
