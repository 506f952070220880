use std::str::FromStr;

use thiserror::Error;

use crate::shared::region::Region;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum OverrideError {
    #[error("override interval must satisfy 0 <= start <= end, got [{start}, {end}]")]
    Interval { start: f64, end: f64 },
    #[error("override region must have a non-negative size, got {0:?}")]
    Geometry(Region),
    #[error("override #{index} has no region; pass --legacy-overrides to use the default region")]
    LegacyRejected { index: usize },
    #[error("invalid region {input:?}: {reason}")]
    Syntax { input: String, reason: String },
}

/// Where an override applies within the frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum OverrideGeometry {
    Explicit(Region),
    /// Legacy entries with no box. Resolved per frame by
    /// [`default_legacy_region`].
    FrameDefault,
}

/// A region forced on for every frame whose time lies in `[start, end]`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ManualOverride {
    start: f64,
    end: f64,
    geometry: OverrideGeometry,
}

impl ManualOverride {
    pub fn new(start: f64, end: f64, geometry: OverrideGeometry) -> Result<Self, OverrideError> {
        if !start.is_finite() || !end.is_finite() || start < 0.0 || start > end {
            return Err(OverrideError::Interval { start, end });
        }
        if let OverrideGeometry::Explicit(r) = geometry {
            if r.width < 0 || r.height < 0 {
                return Err(OverrideError::Geometry(r));
            }
        }
        Ok(Self {
            start,
            end,
            geometry,
        })
    }

    pub fn explicit(start: f64, end: f64, region: Region) -> Result<Self, OverrideError> {
        Self::new(start, end, OverrideGeometry::Explicit(region))
    }

    pub fn start(&self) -> f64 {
        self.start
    }

    pub fn end(&self) -> f64 {
        self.end
    }

    pub fn geometry(&self) -> OverrideGeometry {
        self.geometry
    }

    /// Both interval ends are inclusive.
    pub fn is_active_at(&self, t: f64) -> bool {
        self.start <= t && t <= self.end
    }

    pub fn region_for(&self, frame_width: u32, frame_height: u32) -> Region {
        match self.geometry {
            OverrideGeometry::Explicit(r) => r,
            OverrideGeometry::FrameDefault => default_legacy_region(frame_width, frame_height),
        }
    }
}

/// Parses `start,end,x,y,w,h`.
impl FromStr for ManualOverride {
    type Err = OverrideError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let syntax_err = |reason: String| OverrideError::Syntax {
            input: s.to_string(),
            reason,
        };

        let parts: Vec<&str> = s.split(',').map(str::trim).collect();
        if parts.len() != 6 {
            return Err(syntax_err(format!("expected 6 fields, got {}", parts.len())));
        }

        let time = |i: usize| {
            parts[i]
                .parse::<f64>()
                .map_err(|e| syntax_err(format!("field {}: {e}", i + 1)))
        };
        let coord = |i: usize| {
            parts[i]
                .parse::<i32>()
                .map_err(|e| syntax_err(format!("field {}: {e}", i + 1)))
        };

        Self::explicit(
            time(0)?,
            time(1)?,
            Region::new(coord(2)?, coord(3)?, coord(4)?, coord(5)?),
        )
    }
}

/// Box substituted for a legacy override: top-centre, a quarter of the frame
/// in each dimension.
pub fn default_legacy_region(frame_width: u32, frame_height: u32) -> Region {
    let width = (frame_width / 4) as i32;
    let height = (frame_height / 4) as i32;
    Region::new((frame_width as i32 - width) / 2, 0, width, height)
}

/// All manual overrides for one video.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct OverrideSchedule {
    overrides: Vec<ManualOverride>,
}

impl OverrideSchedule {
    pub fn new(overrides: Vec<ManualOverride>) -> Self {
        Self { overrides }
    }

    pub fn is_empty(&self) -> bool {
        self.overrides.is_empty()
    }

    pub fn len(&self) -> usize {
        self.overrides.len()
    }

    pub fn push(&mut self, entry: ManualOverride) {
        self.overrides.push(entry);
    }

    pub fn extend(&mut self, other: OverrideSchedule) {
        self.overrides.extend(other.overrides);
    }

    /// Override boxes active at `t`, in schedule order.
    pub fn active_at(&self, t: f64, frame_width: u32, frame_height: u32) -> Vec<Region> {
        self.overrides
            .iter()
            .filter(|o| o.is_active_at(t))
            .map(|o| o.region_for(frame_width, frame_height))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn override_2_to_4() -> ManualOverride {
        ManualOverride::explicit(2.0, 4.0, Region::new(50, 50, 30, 30)).unwrap()
    }

    #[rstest]
    #[case::before(1.999, false)]
    #[case::start(2.0, true)]
    #[case::middle(3.0, true)]
    #[case::end(4.0, true)]
    #[case::after(4.001, false)]
    fn test_interval_is_closed(#[case] t: f64, #[case] active: bool) {
        assert_eq!(override_2_to_4().is_active_at(t), active);
    }

    #[rstest]
    #[case::reversed(4.0, 2.0)]
    #[case::negative(-1.0, 2.0)]
    #[case::nan(f64::NAN, 2.0)]
    #[case::infinite(0.0, f64::INFINITY)]
    fn test_rejects_bad_interval(#[case] start: f64, #[case] end: f64) {
        let result = ManualOverride::explicit(start, end, Region::new(0, 0, 1, 1));
        assert!(matches!(result, Err(OverrideError::Interval { .. })));
    }

    #[test]
    fn test_zero_length_interval_is_allowed() {
        let o = ManualOverride::explicit(3.0, 3.0, Region::new(0, 0, 1, 1)).unwrap();
        assert!(o.is_active_at(3.0));
    }

    #[test]
    fn test_rejects_negative_size() {
        let result = ManualOverride::explicit(0.0, 1.0, Region::new(0, 0, -5, 10));
        assert!(matches!(result, Err(OverrideError::Geometry(_))));
    }

    #[test]
    fn test_parse_region_string() {
        let o: ManualOverride = "2.0, 4.0, 50, 50, 30, 30".parse().unwrap();
        assert_eq!(o, override_2_to_4());
    }

    #[rstest]
    #[case::too_few("2.0,4.0,50")]
    #[case::not_a_number("2.0,4.0,a,50,30,30")]
    #[case::fractional_coord("2.0,4.0,50.5,50,30,30")]
    fn test_parse_rejects_malformed(#[case] input: &str) {
        assert!(matches!(
            input.parse::<ManualOverride>(),
            Err(OverrideError::Syntax { .. })
        ));
    }

    #[test]
    fn test_default_legacy_region_is_top_centre_quarter() {
        assert_eq!(default_legacy_region(1920, 1080), Region::new(720, 0, 480, 270));
    }

    #[test]
    fn test_legacy_override_resolves_against_frame() {
        let o = ManualOverride::new(0.0, 1.0, OverrideGeometry::FrameDefault).unwrap();
        assert_eq!(o.region_for(400, 200), Region::new(150, 0, 100, 50));
    }

    #[test]
    fn test_schedule_filters_by_time_in_order() {
        let a = ManualOverride::explicit(0.0, 5.0, Region::new(1, 1, 1, 1)).unwrap();
        let b = ManualOverride::explicit(3.0, 4.0, Region::new(2, 2, 2, 2)).unwrap();
        let schedule = OverrideSchedule::new(vec![a, b]);

        assert_eq!(schedule.active_at(1.0, 100, 100), vec![Region::new(1, 1, 1, 1)]);
        assert_eq!(
            schedule.active_at(3.5, 100, 100),
            vec![Region::new(1, 1, 1, 1), Region::new(2, 2, 2, 2)]
        );
        assert!(schedule.active_at(6.0, 100, 100).is_empty());
    }

    #[test]
    fn test_extend_appends() {
        let mut schedule = OverrideSchedule::new(vec![override_2_to_4()]);
        schedule.extend(OverrideSchedule::new(vec![override_2_to_4()]));
        assert_eq!(schedule.len(), 2);
    }
}
