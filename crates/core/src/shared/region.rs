/// Padded edges are saturated to `±EDGE_LIMIT` so the width between them
/// always fits in `i32`. Any real frame lies well inside that range.
const EDGE_LIMIT: i64 = (i32::MAX / 2) as i64;

fn saturate_edge(v: i64) -> i64 {
    v.clamp(-EDGE_LIMIT, EDGE_LIMIT)
}

/// An axis-aligned pixel rectangle in source-frame coordinates.
///
/// Regions carry no identity; two regions with the same geometry are the
/// same region. Coordinates are signed so that padded boxes may extend past
/// the frame origin before clamping.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Region {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Region {
    pub const fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Expands the region symmetrically by `ratio` of its own size per side.
    ///
    /// Padding per side is `floor(width * ratio)` and `floor(height * ratio)`.
    /// Boxes too large for `i32` saturate instead of wrapping, so they still
    /// cover the whole frame after clamping.
    pub fn padded(&self, ratio: f64) -> Region {
        let pad_w = (self.width as f64 * ratio).floor() as i64;
        let pad_h = (self.height as f64 * ratio).floor() as i64;
        let left = saturate_edge(self.x as i64 - pad_w);
        let top = saturate_edge(self.y as i64 - pad_h);
        let right = saturate_edge(self.x as i64 + self.width as i64 + pad_w);
        let bottom = saturate_edge(self.y as i64 + self.height as i64 + pad_h);
        Region {
            x: left as i32,
            y: top as i32,
            width: (right - left) as i32,
            height: (bottom - top) as i32,
        }
    }

    /// Clamps the origin to the frame and trims the extent to the frame edge.
    ///
    /// Returns `None` when nothing visible remains (width or height `<= 0`).
    pub fn clamped(&self, frame_width: u32, frame_height: u32) -> Option<Region> {
        let x = self.x.max(0) as i64;
        let y = self.y.max(0) as i64;
        let width = (self.width as i64).min(frame_width as i64 - x);
        let height = (self.height as i64).min(frame_height as i64 - y);
        if width <= 0 || height <= 0 {
            return None;
        }
        Some(Region {
            x: x as i32,
            y: y as i32,
            width: width as i32,
            height: height as i32,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.width <= 0 || self.height <= 0
    }

    pub fn contains_point(&self, px: i32, py: i32) -> bool {
        let (px, py) = (px as i64, py as i64);
        px >= self.x as i64
            && px < self.x as i64 + self.width as i64
            && py >= self.y as i64
            && py < self.y as i64 + self.height as i64
    }
}
