use thiserror::Error;

use crate::shared::frame::Frame;
use crate::shared::region::Region;

/// Domain interface for obscuring regions of a frame in place.
///
/// Implementations receive raw tracker output and own padding and clamping.
/// A region that cannot be redacted is skipped; it must not abort the rest
/// of the frame.
pub trait FrameRedactor: Send {
    fn redact(&self, frame: &mut Frame, regions: &[Region])
        -> Result<(), Box<dyn std::error::Error>>;
}

/// A region that cannot be mapped onto the frame buffer.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegionGeometryError {
    #[error("frame buffer holds {actual} bytes, {expected} needed for {width}x{height}")]
    BufferSize {
        width: u32,
        height: u32,
        expected: usize,
        actual: usize,
    },
}
