//! JSON override files.
//!
//! Two layouts are accepted. A top-level array applies to every input:
//!
//! ```json
//! [[2.0, 4.0, 50, 50, 30, 30], [10.5, 12.0]]
//! ```
//!
//! An object scopes entries to a source file, keyed by file name:
//!
//! ```json
//! { "clip_01.mov": [[2.0, 4.0, 50, 50, 30, 30]] }
//! ```
//!
//! Two-element entries carry no region and are only accepted when legacy
//! overrides are enabled.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use crate::overrides::domain::manual_override::{
    ManualOverride, OverrideError, OverrideGeometry, OverrideSchedule,
};
use crate::shared::region::Region;

#[derive(Error, Debug)]
pub enum OverrideFileError {
    #[error("failed to read override file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse override file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("{path}: {source}")]
    Entry {
        path: PathBuf,
        #[source]
        source: OverrideError,
    },
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawEntry {
    Boxed(f64, f64, i32, i32, i32, i32),
    Legacy(f64, f64),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawFile {
    Shared(Vec<RawEntry>),
    PerSource(BTreeMap<String, Vec<RawEntry>>),
}

/// Parsed override file, validated up front so that a bad entry fails the
/// run before any frame is decoded.
#[derive(Clone, Debug, PartialEq)]
pub enum OverrideFile {
    Shared(OverrideSchedule),
    PerSource(BTreeMap<String, OverrideSchedule>),
}

impl OverrideFile {
    pub fn load(path: &Path, allow_legacy: bool) -> Result<Self, OverrideFileError> {
        let json = fs::read_to_string(path).map_err(|source| OverrideFileError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&json, allow_legacy).map_err(|e| match e {
            ParseFailure::Json(source) => OverrideFileError::Parse {
                path: path.to_path_buf(),
                source,
            },
            ParseFailure::Entry(source) => OverrideFileError::Entry {
                path: path.to_path_buf(),
                source,
            },
        })
    }

    fn parse(json: &str, allow_legacy: bool) -> Result<Self, ParseFailure> {
        let raw: RawFile = serde_json::from_str(json).map_err(ParseFailure::Json)?;
        let file = match raw {
            RawFile::Shared(entries) => {
                OverrideFile::Shared(build_schedule(entries, allow_legacy)?)
            }
            RawFile::PerSource(map) => OverrideFile::PerSource(
                map.into_iter()
                    .map(|(name, entries)| {
                        build_schedule(entries, allow_legacy).map(|schedule| (name, schedule))
                    })
                    .collect::<Result<_, OverrideError>>()?,
            ),
        };
        Ok(file)
    }

    /// Overrides that apply to `source`.
    ///
    /// Per-source files are matched on the full file name first, then on the
    /// stem. A source with no entry gets an empty schedule.
    pub fn schedule_for(&self, source: &Path) -> OverrideSchedule {
        match self {
            OverrideFile::Shared(schedule) => schedule.clone(),
            OverrideFile::PerSource(map) => {
                let by_name = source
                    .file_name()
                    .and_then(|n| n.to_str())
                    .and_then(|n| map.get(n));
                let by_stem = || {
                    source
                        .file_stem()
                        .and_then(|n| n.to_str())
                        .and_then(|n| map.get(n))
                };
                by_name.or_else(by_stem).cloned().unwrap_or_default()
            }
        }
    }
}

#[derive(Debug)]
enum ParseFailure {
    Json(serde_json::Error),
    Entry(OverrideError),
}

impl From<OverrideError> for ParseFailure {
    fn from(e: OverrideError) -> Self {
        ParseFailure::Entry(e)
    }
}

fn build_schedule(
    entries: Vec<RawEntry>,
    allow_legacy: bool,
) -> Result<OverrideSchedule, OverrideError> {
    let mut schedule = OverrideSchedule::default();
    for (index, entry) in entries.into_iter().enumerate() {
        let parsed = match entry {
            RawEntry::Boxed(start, end, x, y, w, h) => {
                ManualOverride::explicit(start, end, Region::new(x, y, w, h))?
            }
            RawEntry::Legacy(start, end) if allow_legacy => {
                log::warn!(
                    "Override #{index} [{start}, {end}] has no region, using the default top-centre box"
                );
                ManualOverride::new(start, end, OverrideGeometry::FrameDefault)?
            }
            RawEntry::Legacy(..) => return Err(OverrideError::LegacyRejected { index }),
        };
        schedule.push(parsed);
    }
    Ok(schedule)
}
