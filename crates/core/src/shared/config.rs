use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const DEFAULT_CONFIDENCE: f64 = 0.1;
pub const DEFAULT_PIXELATION_FACTOR: u32 = 20;
pub const DEFAULT_PERSISTENCE: u32 = 30;
pub const DEFAULT_PADDING: f64 = 0.3;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Per-session redaction parameters.
///
/// Fixed for the lifetime of one video; every tracker and redactor built for
/// that video reads from the same value.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RedactionConfig {
    /// Minimum detector score for a face to count (0.0-1.0).
    pub confidence: f64,
    /// Region dimensions are divided by this before downsampling.
    pub pixelation_factor: u32,
    /// Frames a region survives without a supporting detection.
    pub persistence: u32,
    /// Fractional expansion of each side of a box before redaction.
    pub padding: f64,
}

impl Default for RedactionConfig {
    fn default() -> Self {
        Self {
            confidence: DEFAULT_CONFIDENCE,
            pixelation_factor: DEFAULT_PIXELATION_FACTOR,
            persistence: DEFAULT_PERSISTENCE,
            padding: DEFAULT_PADDING,
        }
    }
}

impl RedactionConfig {
    /// Loads the config from `path`, or from the user config directory when
    /// `path` is `None`.
    ///
    /// An explicit path must exist and parse. The implicit location is
    /// optional: a missing file yields defaults, a broken one is logged and
    /// ignored. Values are not validated here; callers layer their own
    /// overrides first and then call [`RedactionConfig::validate`].
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        Ok(match path {
            Some(p) => Self::from_file(p)?,
            None => match Self::default_path().filter(|p| p.exists()) {
                Some(p) => Self::from_file(&p).unwrap_or_else(|e| {
                    log::warn!("Ignoring config file: {e}");
                    Self::default()
                }),
                None => Self::default(),
            },
        })
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let json = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&json).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// `<config_dir>/PixelGuard/config.json`.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("PixelGuard").join("config.json"))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=1.0).contains(&self.confidence) {
            return Err(ConfigError::Invalid(format!(
                "confidence must be between 0.0 and 1.0, got {}",
                self.confidence
            )));
        }
        if self.pixelation_factor == 0 {
            return Err(ConfigError::Invalid(
                "pixelation factor must be at least 1".into(),
            ));
        }
        if self.persistence == 0 {
            return Err(ConfigError::Invalid(
                "persistence must be at least 1 frame".into(),
            ));
        }
        if !self.padding.is_finite() || self.padding < 0.0 {
            return Err(ConfigError::Invalid(format!(
                "padding must be a non-negative number, got {}",
                self.padding
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rstest::rstest;

    #[test]
    fn test_defaults() {
        let config = RedactionConfig::default();
        assert_relative_eq!(config.confidence, 0.1);
        assert_eq!(config.pixelation_factor, 20);
        assert_eq!(config.persistence, 30);
        assert_relative_eq!(config.padding, 0.3);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let config: RedactionConfig = serde_json::from_str(r#"{"persistence": 12}"#).unwrap();
        assert_eq!(config.persistence, 12);
        assert_eq!(config.pixelation_factor, DEFAULT_PIXELATION_FACTOR);
    }

    #[rstest]
    #[case::confidence_high(RedactionConfig { confidence: 1.5, ..Default::default() })]
    #[case::confidence_negative(RedactionConfig { confidence: -0.1, ..Default::default() })]
    #[case::zero_factor(RedactionConfig { pixelation_factor: 0, ..Default::default() })]
    #[case::zero_persistence(RedactionConfig { persistence: 0, ..Default::default() })]
    #[case::negative_padding(RedactionConfig { padding: -0.2, ..Default::default() })]
    #[case::nan_padding(RedactionConfig { padding: f64::NAN, ..Default::default() })]
    fn test_validate_rejects(#[case] config: RedactionConfig) {
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_load_explicit_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{"pixelation_factor": 8, "padding": 0.1}"#).unwrap();

        let config = RedactionConfig::load(Some(&path)).unwrap();
        assert_eq!(config.pixelation_factor, 8);
        assert_relative_eq!(config.padding, 0.1);
    }

    #[test]
    fn test_load_missing_explicit_file_errors() {
        let dir = tempfile::tempdir().unwrap();
        let result = RedactionConfig::load(Some(&dir.path().join("nope.json")));
        assert!(matches!(result, Err(ConfigError::Read { .. })));
    }

    #[test]
    fn test_load_leaves_invalid_values_to_validate() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{"persistence": 0}"#).unwrap();

        let config = RedactionConfig::load(Some(&path)).unwrap();
        assert_eq!(config.persistence, 0);
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_load_malformed_json_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "{ not json").unwrap();
        assert!(matches!(
            RedactionConfig::load(Some(&path)),
            Err(ConfigError::Parse { .. })
        ));
    }
}
