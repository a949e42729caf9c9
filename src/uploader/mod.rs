//! Replay upload pipeline.
//!
//! Duplicate checks and uploads go to the primary service; every upload is
//! mirrored best-effort to the secondary service. Public operations always
//! return an outcome value and never an error.

// Module declarations
mod dispatch;
mod duplicates;
mod status;
mod throttle;
mod types;

#[cfg(test)]
mod test_support;

pub use dispatch::SecondaryOutcome;
pub use status::{parse_upload_response, status_from_name, translate_status, STATUS_NAMES};
pub use throttle::{classify_error, ErrorType, ThrottleHandler};
pub use types::*;

use crate::config::UploaderConfig;
use crate::error::UploaderError;
use crate::logging::log_warn;
use crate::transport::{ReqwestTransport, Transport};

pub struct Uploader<T: Transport = ReqwestTransport> {
    config: UploaderConfig,
    transport: T,
    throttle: ThrottleHandler,
}

impl<T: Transport> std::fmt::Debug for Uploader<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Uploader")
            .field("config", &self.config)
            .field("transport", &"<transport>")
            .field("throttle", &self.throttle)
            .finish()
    }
}

impl Uploader<ReqwestTransport> {
    /// Uploader over HTTP with the given endpoints
    pub fn new(config: UploaderConfig) -> Result<Self, UploaderError> {
        config.validate()?;
        Ok(Self::with_transport(config, ReqwestTransport::new()))
    }
}

impl<T: Transport> Uploader<T> {
    pub fn with_transport(config: UploaderConfig, transport: T) -> Self {
        Self {
            config,
            transport,
            throttle: ThrottleHandler::default(),
        }
    }

    #[cfg(test)]
    pub(crate) fn with_throttle(mut self, throttle: ThrottleHandler) -> Self {
        self.throttle = throttle;
        self
    }

    pub fn config(&self) -> &UploaderConfig {
        &self.config
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Minimum client build the secondary service accepts; 0 when unknown.
    /// Advisory only: nothing in the pipeline is gated on it.
    pub async fn get_minimum_build(&self) -> u32 {
        let url = self.minimum_build_url();
        let url = url.as_str();

        let body = match self
            .throttle
            .retry(|| async move { self.transport.download_string(url).await?.into_success_body() })
            .await
        {
            Ok(body) => body,
            Err(e) => {
                log_warn("minimum-build", &format!("Error getting minimum build: {}", e))
                    .unwrap_or_default();
                return 0;
            }
        };

        match body.trim().parse::<u32>() {
            Ok(build) => build,
            Err(_) => {
                log_warn("minimum-build", &format!("Error parsing minimum build: {}", body))
                    .unwrap_or_default();
                0
            }
        }
    }

    fn primary_upload_url(&self, fingerprint: Option<&str>) -> String {
        format!(
            "{}/upload?fingerprint={}",
            self.config.primary_base(),
            urlencoding::encode(fingerprint.unwrap_or_default())
        )
    }

    fn secondary_upload_url(&self) -> String {
        format!(
            "{}/upload?uploadToHotslogs={}",
            self.config.secondary_base(),
            self.config.forward_to_secondary_mirror
        )
    }

    fn fingerprint_url(&self, fingerprint: &str) -> String {
        format!(
            "{}/replays/fingerprints/{}",
            self.config.primary_base(),
            urlencoding::encode(fingerprint)
        )
    }

    fn fingerprints_url(&self) -> String {
        format!("{}/replays/fingerprints", self.config.primary_base())
    }

    fn minimum_build_url(&self) -> String {
        format!("{}/replays/hotsapi-min-build", self.config.primary_base())
    }
}
