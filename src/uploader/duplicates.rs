//! Fingerprint lookups against the primary service.
//!
//! Every lookup fails open: when the service cannot answer, files are treated
//! as not yet uploaded so they are still attempted.

use super::types::{FingerprintBatchResponse, FingerprintExistsResponse, ReplayFile, UploadStatus};
use super::Uploader;
use crate::error::UploaderError;
use crate::logging::{log_debug, log_info, log_warn};
use crate::transport::Transport;
use serde::de::DeserializeOwned;
use std::collections::HashSet;

fn parse_reply<R: DeserializeOwned>(body: &str) -> Result<R, UploaderError> {
    serde_json::from_str(body)
        .map_err(|e| UploaderError::Protocol(format!("{} in reply: {}", e, body)))
}

impl<T: Transport> Uploader<T> {
    /// Check one fingerprint. Returns true only when the service confirms it exists.
    pub async fn check_duplicate(&self, fingerprint: &str) -> bool {
        let url = self.fingerprint_url(fingerprint);
        let url = url.as_str();

        let result = self
            .throttle
            .retry(|| async move {
                let body = self.transport.download_string(url).await?.into_success_body()?;
                parse_reply::<FingerprintExistsResponse>(&body)
            })
            .await;

        match result {
            Ok(reply) => reply.exists,
            Err(e) => {
                log_warn(
                    "duplicate-check",
                    &format!("Error checking fingerprint '{}': {}", fingerprint, e),
                )
                .unwrap_or_default();
                false
            }
        }
    }

    /// Check many fingerprints in one request. Returns the submitted
    /// fingerprints the service reports as known.
    pub async fn check_duplicates<S: AsRef<str>>(&self, fingerprints: &[S]) -> Vec<String> {
        if fingerprints.is_empty() {
            return Vec::new();
        }

        let url = self.fingerprints_url();
        let url = url.as_str();
        let body = fingerprints
            .iter()
            .map(|f| f.as_ref())
            .collect::<Vec<_>>()
            .join("\n");
        let body = body.as_str();

        let result = self
            .throttle
            .retry(|| async move {
                let reply = self
                    .transport
                    .upload_string(url, body.to_string())
                    .await?
                    .into_success_body()?;
                parse_reply::<FingerprintBatchResponse>(&reply)
            })
            .await;

        let exists = match result {
            Ok(reply) => reply.exists,
            Err(e) => {
                log_warn(
                    "duplicate-check",
                    &format!("Error checking fingerprint array: {}", e),
                )
                .unwrap_or_default();
                return Vec::new();
            }
        };

        let submitted: HashSet<&str> = fingerprints.iter().map(|f| f.as_ref()).collect();
        let (known, unknown): (Vec<String>, Vec<String>) = exists
            .into_iter()
            .partition(|f| submitted.contains(f.as_str()));

        if !unknown.is_empty() {
            log_warn(
                "duplicate-check",
                &format!(
                    "Ignoring {} fingerprints that were not submitted: {}",
                    unknown.len(),
                    unknown.join(", ")
                ),
            )
            .unwrap_or_default();
        }

        known
    }

    /// Mark every file the service already knows as `Duplicate`. Other files are left as they are.
    pub async fn mark_duplicates(&self, replays: &mut [ReplayFile]) {
        let fingerprints: Vec<&str> = replays
            .iter()
            .filter_map(|r| r.fingerprint.as_deref())
            .collect();

        let exists: HashSet<String> = self.check_duplicates(&fingerprints).await.into_iter().collect();
        if exists.is_empty() {
            return;
        }

        let mut marked = 0;
        for replay in replays.iter_mut() {
            if replay
                .fingerprint
                .as_ref()
                .is_some_and(|f| exists.contains(f))
            {
                log_debug("duplicate-check", &format!("File {} marked as duplicate", replay))
                    .unwrap_or_default();
                replay.upload_status = UploadStatus::Duplicate;
                marked += 1;
            }
        }

        log_info(
            "duplicate-check",
            &format!("{} of {} replays already uploaded", marked, replays.len()),
        )
        .unwrap_or_default();
    }
}
