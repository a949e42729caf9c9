//! HTTP transport used by the uploader.
//!
//! `Transport` returns a response for every reply the server sends, whatever its
//! status, and an error only when no reply was received at all.

use crate::error::{ErrorContext, UploaderError};
use async_trait::async_trait;
use reqwest::StatusCode;
use std::path::Path;
use std::time::Duration;
use tokio_util::io::ReaderStream;

/// Default timeout for a single request/response exchange
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 120;

/// Status and text body of one server reply
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: StatusCode,
    pub body: String,
}

impl HttpResponse {
    pub fn new(status: StatusCode, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// Return the body for 2xx replies, otherwise a `Status` error carrying the reply.
    pub fn into_success_body(self) -> Result<String, UploaderError> {
        if self.status.is_success() {
            Ok(self.body)
        } else {
            Err(UploaderError::Status {
                status: self.status,
                body: self.body,
            })
        }
    }
}

#[async_trait]
pub trait Transport: Send + Sync {
    /// POST `path` as a multipart `file` part
    async fn upload_file(&self, url: &str, path: &Path) -> Result<HttpResponse, UploaderError>;

    /// GET `url` as text
    async fn download_string(&self, url: &str) -> Result<HttpResponse, UploaderError>;

    /// POST `body` as text
    async fn upload_string(&self, url: &str, body: String) -> Result<HttpResponse, UploaderError>;
}

/// reqwest-backed transport. A client is built for each exchange and dropped with it.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    timeout: Duration,
}

impl Default for ReqwestTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl ReqwestTransport {
    pub fn new() -> Self {
        Self {
            timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
        }
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self { timeout }
    }

    fn client(&self) -> Result<reqwest::Client, UploaderError> {
        Ok(reqwest::Client::builder().timeout(self.timeout).build()?)
    }

    async fn read_response(response: reqwest::Response) -> Result<HttpResponse, UploaderError> {
        let status = response.status();
        let body = response.text().await?;
        Ok(HttpResponse { status, body })
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn upload_file(&self, url: &str, path: &Path) -> Result<HttpResponse, UploaderError> {
        let file = tokio::fs::File::open(path)
            .await
            .context(&format!("Failed to open replay {}", path.display()))?;
        let length = file.metadata().await?.len();

        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("replay.StormReplay")
            .to_string();

        let body = reqwest::Body::wrap_stream(ReaderStream::new(file));
        let part = reqwest::multipart::Part::stream_with_length(body, length)
            .file_name(file_name)
            .mime_str("application/octet-stream")?;
        let form = reqwest::multipart::Form::new().part("file", part);

        let client = self.client()?;
        let response = client.post(url).multipart(form).send().await?;
        Self::read_response(response).await
    }

    async fn download_string(&self, url: &str) -> Result<HttpResponse, UploaderError> {
        let client = self.client()?;
        let response = client.get(url).send().await?;
        Self::read_response(response).await
    }

    async fn upload_string(&self, url: &str, body: String) -> Result<HttpResponse, UploaderError> {
        let client = self.client()?;
        let response = client
            .post(url)
            .header("Content-Type", "text/plain; charset=utf-8")
            .body(body)
            .send()
            .await?;
        Self::read_response(response).await
    }
}
