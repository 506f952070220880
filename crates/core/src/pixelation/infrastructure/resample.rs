/// ROI rectangle within a frame, in unsigned pixel coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RoiRect {
    pub x: usize,
    pub y: usize,
    pub w: usize,
    pub h: usize,
}

/// Copy a rectangular ROI out of packed frame data into a reusable buffer.
pub fn extract_roi(
    data: &[u8],
    frame_width: usize,
    channels: usize,
    rect: RoiRect,
    roi: &mut Vec<u8>,
) {
    let row_len = rect.w * channels;
    roi.resize(row_len * rect.h, 0);
    for row in 0..rect.h {
        let src = ((rect.y + row) * frame_width + rect.x) * channels;
        let dst = row * row_len;
        roi[dst..dst + row_len].copy_from_slice(&data[src..src + row_len]);
    }
}

/// Write an ROI buffer back into packed frame data.
pub fn write_roi_back(
    data: &mut [u8],
    roi: &[u8],
    frame_width: usize,
    channels: usize,
    rect: RoiRect,
) {
    let row_len = rect.w * channels;
    for row in 0..rect.h {
        let dst = ((rect.y + row) * frame_width + rect.x) * channels;
        let src = row * row_len;
        data[dst..dst + row_len].copy_from_slice(&roi[src..src + row_len]);
    }
}

/// Bilinear resize with half-pixel centres.
///
/// Source coordinate for destination pixel `d` is `(d + 0.5) * src / dst - 0.5`,
/// clamped to the image. Each output pixel blends the 2×2 neighbourhood
/// around that point; there is no area averaging on downscale.
pub fn resize_linear(
    data: &[u8],
    width: usize,
    height: usize,
    channels: usize,
    target_w: usize,
    target_h: usize,
) -> Vec<u8> {
    let mut out = vec![0u8; target_w * target_h * channels];
    let xs: Vec<(usize, usize, f32)> = (0..target_w)
        .map(|d| linear_taps(d, width, target_w))
        .collect();

    for y in 0..target_h {
        let (y0, y1, fy) = linear_taps(y, height, target_h);
        for (x, &(x0, x1, fx)) in xs.iter().enumerate() {
            for c in 0..channels {
                let v00 = data[(y0 * width + x0) * channels + c] as f32;
                let v10 = data[(y0 * width + x1) * channels + c] as f32;
                let v01 = data[(y1 * width + x0) * channels + c] as f32;
                let v11 = data[(y1 * width + x1) * channels + c] as f32;

                let top = v00 + (v10 - v00) * fx;
                let bottom = v01 + (v11 - v01) * fx;
                let val = top + (bottom - top) * fy;
                out[(y * target_w + x) * channels + c] = val.round().clamp(0.0, 255.0) as u8;
            }
        }
    }

    out
}

/// Nearest-neighbour resize: destination `d` samples source `floor(d * src / dst)`.
pub fn resize_nearest(
    data: &[u8],
    width: usize,
    height: usize,
    channels: usize,
    target_w: usize,
    target_h: usize,
) -> Vec<u8> {
    let mut out = vec![0u8; target_w * target_h * channels];
    for y in 0..target_h {
        let sy = (y * height / target_h).min(height - 1);
        for x in 0..target_w {
            let sx = (x * width / target_w).min(width - 1);
            let src = (sy * width + sx) * channels;
            let dst = (y * target_w + x) * channels;
            out[dst..dst + channels].copy_from_slice(&data[src..src + channels]);
        }
    }
    out
}

fn linear_taps(d: usize, src_len: usize, dst_len: usize) -> (usize, usize, f32) {
    let scale = src_len as f32 / dst_len as f32;
    let s = ((d as f32 + 0.5) * scale - 0.5).max(0.0);
    let i0 = (s.floor() as usize).min(src_len - 1);
    let i1 = (i0 + 1).min(src_len - 1);
    let frac = if i0 == i1 { 0.0 } else { s - i0 as f32 };
    (i0, i1, frac)
}
