use std::cell::RefCell;

use crate::pixelation::domain::frame_redactor::{FrameRedactor, RegionGeometryError};
use crate::shared::config::RedactionConfig;
use crate::shared::frame::{Frame, CHANNELS};
use crate::shared::region::Region;

use super::resample::{self, RoiRect};

/// Mosaic redaction: each padded region is shrunk by `pixelation_factor`
/// with bilinear filtering, then blown back up with nearest-neighbour.
///
/// Holds no per-frame state beyond a scratch buffer, so the same instance
/// can serve every frame of a video.
pub struct PixelateRedactor {
    padding: f64,
    pixelation_factor: u32,
    roi_buf: RefCell<Vec<u8>>,
}

impl PixelateRedactor {
    pub fn new(padding: f64, pixelation_factor: u32) -> Self {
        Self {
            padding,
            pixelation_factor: pixelation_factor.max(1),
            roi_buf: RefCell::new(Vec::new()),
        }
    }

    pub fn from_config(config: &RedactionConfig) -> Self {
        Self::new(config.padding, config.pixelation_factor)
    }

    /// Pads and clamps `region`, returning the pixel rectangle to pixelate.
    ///
    /// `Ok(None)` means the region has no visible area and is silently
    /// skipped.
    fn target_rect(
        &self,
        frame: &Frame,
        region: &Region,
    ) -> Result<Option<RoiRect>, RegionGeometryError> {
        let (fw, fh) = (frame.width(), frame.height());
        let expected = fw as usize * fh as usize * CHANNELS;
        if frame.data().len() != expected {
            return Err(RegionGeometryError::BufferSize {
                width: fw,
                height: fh,
                expected,
                actual: frame.data().len(),
            });
        }

        let Some(r) = region.padded(self.padding).clamped(fw, fh) else {
            return Ok(None);
        };
        Ok(Some(RoiRect {
            x: r.x as usize,
            y: r.y as usize,
            w: r.width as usize,
            h: r.height as usize,
        }))
    }

    fn redact_all(&self, frame: &mut Frame, regions: &[Region]) {
        for region in regions {
            match self.target_rect(frame, region) {
                Ok(Some(rect)) => self.pixelate(frame, rect),
                Ok(None) => log::debug!(
                    "Frame {}: region {region:?} not visible after padding, skipped",
                    frame.index()
                ),
                Err(e) => log::warn!("Frame {}: skipping region: {e}", frame.index()),
            }
        }
    }

    fn pixelate(&self, frame: &mut Frame, rect: RoiRect) {
        let factor = self.pixelation_factor as usize;
        let small_w = (rect.w / factor).max(1);
        let small_h = (rect.h / factor).max(1);
        let fw = frame.width() as usize;

        let mut roi = self.roi_buf.borrow_mut();
        resample::extract_roi(frame.data(), fw, CHANNELS, rect, &mut roi);
        let small = resample::resize_linear(&roi, rect.w, rect.h, CHANNELS, small_w, small_h);
        let mosaic = resample::resize_nearest(&small, small_w, small_h, CHANNELS, rect.w, rect.h);
        resample::write_roi_back(frame.data_mut(), &mosaic, fw, CHANNELS, rect);
    }
}

impl FrameRedactor for PixelateRedactor {
    fn redact(
        &self,
        frame: &mut Frame,
        regions: &[Region],
    ) -> Result<(), Box<dyn std::error::Error>> {
        self.redact_all(frame, regions);
        Ok(())
    }
}

/// Pixelates `regions` in `frame` using the padding and factor from `config`.
pub fn apply<'a>(frame: &'a mut Frame, regions: &[Region], config: &RedactionConfig) -> &'a mut Frame {
    PixelateRedactor::from_config(config).redact_all(frame, regions);
    frame
}
