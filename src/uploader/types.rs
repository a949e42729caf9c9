//! Type definitions for the upload pipeline.
//!
//! Defines ReplayFile, Replay, UploadStatus, per-endpoint response bodies and constants.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

// Fixed pause after a 429 before the same request is attempted again
pub const THROTTLE_DELAY_SECS: u64 = 10;

/// Per-file upload outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum UploadStatus {
    #[default]
    NotUploaded,
    InProgress,
    Success,
    Duplicate,
    AiDetected,
    CustomGame,
    PtrRegion,
    Incomplete,
    TooOld,
    UploadError,
}

impl UploadStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, UploadStatus::NotUploaded | UploadStatus::InProgress)
    }
}

impl fmt::Display for UploadStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// One replay on disk that is a candidate for upload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplayFile {
    pub fingerprint: Option<String>,
    filename: PathBuf,
    pub upload_status: UploadStatus,
}

impl ReplayFile {
    pub fn new(filename: impl Into<PathBuf>, fingerprint: Option<String>) -> Self {
        Self {
            fingerprint,
            filename: filename.into(),
            upload_status: UploadStatus::NotUploaded,
        }
    }

    pub fn filename(&self) -> &Path {
        &self.filename
    }
}

impl fmt::Display for ReplayFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.filename.display())
    }
}

/// Parsed replay record. Passed through the pipeline untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Replay {
    /// Game client build the replay was recorded with
    pub build: u32,
    pub map: Option<String>,
    pub game_mode: Option<String>,
}

impl Replay {
    pub fn new(build: u32) -> Self {
        Self {
            build,
            ..Default::default()
        }
    }

    /// Whether the replay satisfies a minimum client build; 0 means no restriction.
    pub fn meets_minimum_build(&self, minimum_build: u32) -> bool {
        minimum_build == 0 || self.build >= minimum_build
    }
}

/// Primary upload endpoint reply
#[derive(Debug, Clone, Deserialize)]
pub struct UploadResponse {
    pub success: bool,
    #[serde(default)]
    pub status: Option<String>,
}

/// Single fingerprint lookup reply
#[derive(Debug, Clone, Deserialize)]
pub struct FingerprintExistsResponse {
    pub exists: bool,
}

/// Batch fingerprint lookup reply
#[derive(Debug, Clone, Deserialize)]
pub struct FingerprintBatchResponse {
    pub exists: Vec<String>,
}
