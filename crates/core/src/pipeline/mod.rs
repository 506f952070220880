pub mod frame_redaction;
pub mod infrastructure;
pub mod pipeline_executor;
pub mod pipeline_logger;
pub mod redact_image_use_case;
pub mod redact_video_use_case;

#[cfg(test)]
pub(crate) mod test_support;
