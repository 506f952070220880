pub const BLAZEFACE_MODEL_NAME: &str = "blaze_face_short_range.onnx";

/// Override boxes live for this many frames once injected.
pub const OVERRIDE_TIME_TO_LIVE: u32 = 2;

pub const VIDEO_EXTENSIONS: &[&str] = &["mov", "mp4"];

pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "bmp", "tiff", "tif", "webp"];

/// Subdirectory of a batch input directory that receives redacted videos.
pub const BATCH_OUTPUT_DIR: &str = "anonymized";

pub const BATCH_OUTPUT_PREFIX: &str = "anon_";
