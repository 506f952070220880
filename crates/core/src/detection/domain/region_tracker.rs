use crate::shared::config::RedactionConfig;
use crate::shared::constants::OVERRIDE_TIME_TO_LIVE;
use crate::shared::region::Region;

use super::face_detector::DetectionOutcome;

/// A region scheduled for redaction plus its remaining lifetime in frames.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TrackedRegion {
    pub region: Region,
    pub time_to_live: u32,
}

/// Keeps face regions alive across frames where the detector comes up empty.
///
/// A non-empty detection replaces every tracked region outright. Frames
/// without one age the current set by one frame and drop whatever runs out.
/// Manual overrides are layered on top for the current frame only.
///
/// One tracker belongs to exactly one video and must see its frames in
/// presentation order; the decay counter has no meaning otherwise.
#[derive(Clone, Debug)]
pub struct RegionTracker {
    persistence: u32,
    active: Vec<TrackedRegion>,
    overrides: Vec<TrackedRegion>,
}

impl RegionTracker {
    pub fn new(persistence: u32) -> Self {
        Self {
            persistence,
            active: Vec::new(),
            overrides: Vec::new(),
        }
    }

    pub fn from_config(config: &RedactionConfig) -> Self {
        Self::new(config.persistence)
    }

    /// Advances the tracker by one frame and returns the regions to redact.
    ///
    /// `overrides_for_frame` must already be filtered to the overrides whose
    /// interval contains this frame's time. With `suppress_detection` set,
    /// `detections` is ignored and the frame counts as detection-free.
    pub fn update(
        &mut self,
        detections: &[Region],
        overrides_for_frame: &[Region],
        suppress_detection: bool,
    ) -> Vec<Region> {
        if !suppress_detection && !detections.is_empty() {
            self.active = detections
                .iter()
                .map(|&region| TrackedRegion {
                    region,
                    time_to_live: self.persistence,
                })
                .collect();
        } else {
            self.decay();
        }

        self.overrides = overrides_for_frame
            .iter()
            .map(|&region| TrackedRegion {
                region,
                time_to_live: OVERRIDE_TIME_TO_LIVE,
            })
            .collect();

        self.regions()
    }

    /// [`update`](Self::update) driven by an explicit detection outcome.
    ///
    /// `Unavailable` and an empty `Detected` both take the decay path.
    pub fn observe(
        &mut self,
        outcome: &DetectionOutcome,
        overrides_for_frame: &[Region],
    ) -> Vec<Region> {
        match outcome {
            DetectionOutcome::Detected(regions) => self.update(regions, overrides_for_frame, false),
            DetectionOutcome::Unavailable => self.update(&[], overrides_for_frame, false),
            DetectionOutcome::Suppressed => self.update(&[], overrides_for_frame, true),
        }
    }

    /// Tracker-derived regions, excluding this frame's overrides.
    pub fn active_regions(&self) -> &[TrackedRegion] {
        &self.active
    }

    /// Override regions injected by the most recent update.
    pub fn override_regions(&self) -> &[TrackedRegion] {
        &self.overrides
    }

    pub fn persistence(&self) -> u32 {
        self.persistence
    }

    fn decay(&mut self) {
        for tracked in &mut self.active {
            tracked.time_to_live = tracked.time_to_live.saturating_sub(1);
        }
        self.active.retain(|t| t.time_to_live > 0);
    }

    fn regions(&self) -> Vec<Region> {
        self.active
            .iter()
            .chain(&self.overrides)
            .map(|t| t.region)
            .collect()
    }
}
