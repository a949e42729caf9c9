//! Rate-limit handling and error classification.
//!
//! A 429 reply from either service pauses for a fixed delay and the same
//! operation is attempted again. There is no attempt cap.

use super::types::THROTTLE_DELAY_SECS;
use crate::error::UploaderError;
use crate::logging::log_warn;
use reqwest::StatusCode;
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;

/// Error classification for logging and retry decisions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorType {
    /// 429 - retried after the throttle delay
    Throttled,
    /// Other client errors (400-499)
    Client,
    /// Server errors (500-599)
    Server,
    /// No reply received - connection, DNS, timeout, local I/O
    Network,
    /// Reply received but unreadable
    Protocol,
}

/// Classify an error for retry and logging purposes
pub fn classify_error(error: &UploaderError) -> ErrorType {
    match error.status() {
        Some(StatusCode::TOO_MANY_REQUESTS) => ErrorType::Throttled,
        Some(status) if status.is_client_error() => ErrorType::Client,
        Some(status) if status.is_server_error() => ErrorType::Server,
        Some(_) => ErrorType::Protocol,
        None => match error {
            UploaderError::Json(_) | UploaderError::Protocol(_) => ErrorType::Protocol,
            _ => ErrorType::Network,
        },
    }
}

#[derive(Debug, Clone)]
pub struct ThrottleHandler {
    delay: Duration,
}

impl Default for ThrottleHandler {
    fn default() -> Self {
        Self {
            delay: Duration::from_secs(THROTTLE_DELAY_SECS),
        }
    }
}

impl ThrottleHandler {
    #[cfg(test)]
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// True iff a reply was received with status 429. Pauses for the throttle
    /// delay before returning true; returns false immediately otherwise.
    pub async fn is_throttled(&self, status: Option<StatusCode>) -> bool {
        if status != Some(StatusCode::TOO_MANY_REQUESTS) {
            return false;
        }

        log_warn(
            "throttle",
            &format!("Too many requests, waiting {}s", self.delay.as_secs()),
        )
        .unwrap_or_default();
        sleep(self.delay).await;
        true
    }

    /// Run `operation` until it succeeds or fails with anything other than a 429.
    pub async fn retry<T, F, Fut>(&self, mut operation: F) -> Result<T, UploaderError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, UploaderError>>,
    {
        loop {
            match operation().await {
                Ok(value) => return Ok(value),
                Err(e) => {
                    if self.is_throttled(e.status()).await {
                        continue;
                    }
                    return Err(e);
                }
            }
        }
    }
}
