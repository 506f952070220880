use std::path::Path;

use ffmpeg_next::format::context::Output;
use ffmpeg_next::software::scaling;
use ffmpeg_next::util::frame::video::Video as VideoFrame;
use ffmpeg_next::{codec, encoder, format, Dictionary, Packet, Rational};

use crate::shared::frame::{Frame, CHANNELS};
use crate::shared::video_metadata::VideoMetadata;
use crate::video::domain::video_writer::VideoWriter;

/// Default H.264 constant rate factor.
pub const DEFAULT_CRF: u8 = 23;
const MAX_CRF: u8 = 51;
const FALLBACK_FPS: i32 = 30;

/// Encodes RGB frames to H.264 (yuv420p) via ffmpeg-next.
///
/// Falls back to the built-in MPEG-4 Part 2 encoder when libx264 is not
/// compiled into the linked ffmpeg. The output has no audio track.
pub struct FfmpegWriter {
    crf: u8,
    octx: Option<Output>,
    encoder: Option<encoder::video::Encoder>,
    scaler: Option<scaling::Context>,
    width: u32,
    height: u32,
    time_base: Rational,
    frame_count: usize,
}

// Safety: FfmpegWriter is only used from a single thread at a time.
// The raw pointers inside ffmpeg types are not shared across threads.
unsafe impl Send for FfmpegWriter {}

impl FfmpegWriter {
    pub fn new() -> Self {
        Self {
            crf: DEFAULT_CRF,
            octx: None,
            encoder: None,
            scaler: None,
            width: 0,
            height: 0,
            time_base: Rational(1, FALLBACK_FPS),
            frame_count: 0,
        }
    }

    /// Sets the H.264 quality (0 = lossless, 51 = worst). Clamped to 0..=51.
    pub fn with_crf(mut self, crf: u8) -> Self {
        self.crf = crf.min(MAX_CRF);
        self
    }

    pub fn crf(&self) -> u8 {
        self.crf
    }

    fn open_encoder(
        &self,
        octx: &mut Output,
        metadata: &VideoMetadata,
    ) -> Result<encoder::video::Encoder, Box<dyn std::error::Error>> {
        let global_header = octx.format().flags().contains(format::Flags::GLOBAL_HEADER);

        let (codec, options) = match encoder::find_by_name("libx264") {
            Some(h264) => {
                let mut options = Dictionary::new();
                options.set("crf", &self.crf.to_string());
                options.set("preset", "medium");
                (h264, options)
            }
            None => {
                log::warn!("libx264 not available, encoding with MPEG-4 Part 2");
                let mpeg4 = encoder::find(codec::Id::MPEG4).ok_or("no usable video encoder found")?;
                (mpeg4, Dictionary::new())
            }
        };
        log::info!("Encoding with {}", codec.name());

        let mut ost = octx.add_stream(Some(codec))?;
        let mut encoder_ctx = codec::context::Context::new_with_codec(codec)
            .encoder()
            .video()?;

        encoder_ctx.set_width(metadata.width);
        encoder_ctx.set_height(metadata.height);
        encoder_ctx.set_format(format::Pixel::YUV420P);
        encoder_ctx.set_time_base(self.time_base);
        encoder_ctx.set_frame_rate(Some(self.time_base.invert()));
        if global_header {
            encoder_ctx.set_flags(codec::Flags::GLOBAL_HEADER);
        }

        let encoder = encoder_ctx.open_with(options)?;
        ost.set_parameters(&encoder);
        Ok(encoder)
    }

    fn drain_packets(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        let (Some(encoder), Some(octx)) = (self.encoder.as_mut(), self.octx.as_mut()) else {
            return Err("FfmpegWriter: not opened".into());
        };
        let ost_time_base = octx.stream(0).ok_or("output stream missing")?.time_base();

        let mut encoded = Packet::empty();
        while encoder.receive_packet(&mut encoded).is_ok() {
            encoded.set_stream(0);
            encoded.rescale_ts(self.time_base, ost_time_base);
            encoded.write_interleaved(octx)?;
        }
        Ok(())
    }
}

impl Default for FfmpegWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl VideoWriter for FfmpegWriter {
    fn open(
        &mut self,
        path: &Path,
        metadata: &VideoMetadata,
    ) -> Result<(), Box<dyn std::error::Error>> {
        ffmpeg_next::init()?;

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        self.width = metadata.width;
        self.height = metadata.height;
        let fps = metadata.fps.round() as i32;
        self.time_base = Rational(1, if fps > 0 { fps } else { FALLBACK_FPS });

        let mut octx = format::output(path)?;
        let encoder = self.open_encoder(&mut octx, metadata)?;
        octx.write_header()?;

        let scaler = scaling::Context::get(
            format::Pixel::RGB24,
            metadata.width,
            metadata.height,
            format::Pixel::YUV420P,
            metadata.width,
            metadata.height,
            scaling::Flags::BILINEAR,
        )?;

        self.octx = Some(octx);
        self.encoder = Some(encoder);
        self.scaler = Some(scaler);
        self.frame_count = 0;
        Ok(())
    }

    fn write(&mut self, frame: &Frame) -> Result<(), Box<dyn std::error::Error>> {
        let (Some(encoder), Some(scaler)) = (self.encoder.as_mut(), self.scaler.as_mut()) else {
            return Err("FfmpegWriter: not opened".into());
        };
        if frame.width() != self.width || frame.height() != self.height {
            return Err(format!(
                "frame is {}x{}, writer expects {}x{}",
                frame.width(),
                frame.height(),
                self.width,
                self.height
            )
            .into());
        }

        let mut rgb_frame = VideoFrame::new(format::Pixel::RGB24, self.width, self.height);
        let stride = rgb_frame.stride(0);
        let row_len = self.width as usize * CHANNELS;
        let dst = rgb_frame.data_mut(0);
        for (row, src_row) in frame.data().chunks_exact(row_len).enumerate() {
            dst[row * stride..row * stride + row_len].copy_from_slice(src_row);
        }

        let mut yuv_frame = VideoFrame::empty();
        scaler.run(&rgb_frame, &mut yuv_frame)?;
        yuv_frame.set_pts(Some(self.frame_count as i64));
        encoder.send_frame(&yuv_frame)?;

        self.drain_packets()?;
        self.frame_count += 1;
        Ok(())
    }

    fn close(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        if let Some(encoder) = self.encoder.as_mut() {
            encoder.send_eof()?;
            self.drain_packets()?;
            if let Some(octx) = self.octx.as_mut() {
                octx.write_trailer()?;
            }
            log::debug!("Encoded {} frames", self.frame_count);
        }

        self.octx = None;
        self.encoder = None;
        self.scaler = None;
        Ok(())
    }
}
