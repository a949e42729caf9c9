//! Upload dispatch to the primary and secondary services.
//!
//! The primary reply decides the status. The secondary upload runs after the
//! primary exchange completes and its outcome is always discarded.

use super::status::parse_upload_response;
use super::throttle::classify_error;
use super::types::{Replay, ReplayFile, UploadStatus};
use super::Uploader;
use crate::error::UploaderError;
use crate::logging::{log_debug, log_info, log_warn};
use crate::transport::Transport;
use reqwest::StatusCode;
use std::path::Path;

/// What happened to the mirror upload. Recorded for tracing only.
#[derive(Debug)]
pub enum SecondaryOutcome {
    Delivered(StatusCode),
    Rejected(StatusCode),
    Unreachable(UploaderError),
}

impl SecondaryOutcome {
    fn from_result(result: Result<crate::transport::HttpResponse, UploaderError>) -> Self {
        match result {
            Ok(response) if response.status.is_success() => {
                SecondaryOutcome::Delivered(response.status)
            }
            Ok(response) => SecondaryOutcome::Rejected(response.status),
            Err(e) => SecondaryOutcome::Unreachable(e),
        }
    }

    /// Drop the outcome. Nothing here may influence the primary status.
    pub fn discard(self, file: &str) {
        log_debug(
            "secondary",
            &format!("Mirror upload of '{}' discarded: {:?}", file, self),
        )
        .unwrap_or_default();
    }
}

impl<T: Transport> Uploader<T> {
    /// Upload a replay file and record the outcome in `file.upload_status`.
    pub async fn upload_file(&self, replay: &Replay, file: &mut ReplayFile) {
        file.upload_status = UploadStatus::InProgress;

        let fingerprint = file.fingerprint.clone();
        let status = self
            .upload_with_retry(replay, fingerprint.as_deref(), file.filename(), true)
            .await;

        file.upload_status = status;
    }

    /// Upload a replay file without a duplicate check and return the outcome.
    pub async fn upload(&self, replay: &Replay, fingerprint: Option<&str>, path: &Path) -> UploadStatus {
        self.upload_with_retry(replay, fingerprint, path, false).await
    }

    async fn upload_with_retry(
        &self,
        replay: &Replay,
        fingerprint: Option<&str>,
        path: &Path,
        check_duplicate: bool,
    ) -> UploadStatus {
        let result = self
            .throttle
            .retry(|| self.attempt(replay, fingerprint, path, check_duplicate))
            .await;

        match result {
            Ok(status) => status,
            Err(e) => {
                log_warn(
                    "upload",
                    &format!(
                        "Error uploading file '{}' ({:?}): {}",
                        path.display(),
                        classify_error(&e),
                        e
                    ),
                )
                .unwrap_or_default();
                UploadStatus::UploadError
            }
        }
    }

    /// One attempt. Errors only for primary-service failures.
    async fn attempt(
        &self,
        replay: &Replay,
        fingerprint: Option<&str>,
        path: &Path,
        check_duplicate: bool,
    ) -> Result<UploadStatus, UploaderError> {
        let file = path.display().to_string();

        if check_duplicate {
            if let Some(fingerprint) = fingerprint {
                if self.check_duplicate(fingerprint).await {
                    log_debug("upload", &format!("File {} marked as duplicate", file))
                        .unwrap_or_default();
                    return Ok(UploadStatus::Duplicate);
                }
            }
        }

        log_debug(
            "upload",
            &format!("Uploading '{}' (build {})", file, replay.build),
        )
        .unwrap_or_default();

        let body = self
            .transport
            .upload_file(&self.primary_upload_url(fingerprint), path)
            .await?
            .into_success_body()?;

        self.upload_to_secondary(path).await.discard(&file);

        let status = parse_upload_response(&file, &body);
        if status != UploadStatus::UploadError {
            log_info("upload", &format!("Uploaded file '{}': {}", file, status)).unwrap_or_default();
        }
        Ok(status)
    }

    async fn upload_to_secondary(&self, path: &Path) -> SecondaryOutcome {
        let result = self
            .transport
            .upload_file(&self.secondary_upload_url(), path)
            .await;
        SecondaryOutcome::from_result(result)
    }
}
