pub mod pixelate_redactor;
pub mod resample;
