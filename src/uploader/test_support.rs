//! Scripted in-memory transport for pipeline tests.

use super::Uploader;
use crate::config::UploaderConfig;
use crate::error::UploaderError;
use crate::transport::{HttpResponse, Transport};
use async_trait::async_trait;
use reqwest::StatusCode;
use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

pub const PRIMARY: &str = "http://primary.test/api";
pub const SECONDARY: &str = "http://secondary.test/api/v1";

#[derive(Debug, Clone)]
enum Reply {
    Respond(StatusCode, String),
    Unreachable,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    UploadFile { url: String, path: PathBuf },
    Download { url: String },
    UploadString { url: String, body: String },
}

impl Call {
    pub fn url(&self) -> &str {
        match self {
            Call::UploadFile { url, .. } | Call::Download { url } | Call::UploadString { url, .. } => url,
        }
    }
}

/// Replies are queued per URL. The last reply for a URL repeats; URLs with no
/// scripted reply behave like an unreachable host.
#[derive(Debug, Default)]
pub struct FakeTransport {
    replies: Mutex<HashMap<String, VecDeque<Reply>>>,
    calls: Mutex<Vec<Call>>,
}

impl FakeTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(&self, url: &str, status: StatusCode, body: &str) {
        self.push(url, Reply::Respond(status, body.to_string()));
    }

    pub fn unreachable(&self, url: &str) {
        self.push(url, Reply::Unreachable);
    }

    fn push(&self, url: &str, reply: Reply) {
        self.replies
            .lock()
            .unwrap()
            .entry(url.to_string())
            .or_default()
            .push_back(reply);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn calls_to(&self, url: &str) -> usize {
        self.calls().iter().filter(|c| c.url() == url).count()
    }

    pub fn uploads(&self) -> Vec<Call> {
        self.calls()
            .into_iter()
            .filter(|c| matches!(c, Call::UploadFile { .. }))
            .collect()
    }

    fn reply(&self, call: Call) -> Result<HttpResponse, UploaderError> {
        let url = call.url().to_string();
        self.calls.lock().unwrap().push(call);

        let reply = {
            let mut replies = self.replies.lock().unwrap();
            match replies.get_mut(&url) {
                Some(queue) if queue.len() > 1 => queue.pop_front(),
                Some(queue) => queue.front().cloned(),
                None => None,
            }
        };

        match reply {
            Some(Reply::Respond(status, body)) => Ok(HttpResponse::new(status, body)),
            Some(Reply::Unreachable) | None => Err(UploaderError::Io(std::io::Error::new(
                std::io::ErrorKind::ConnectionRefused,
                format!("connection refused: {}", url),
            ))),
        }
    }
}

#[async_trait]
impl Transport for FakeTransport {
    async fn upload_file(&self, url: &str, path: &Path) -> Result<HttpResponse, UploaderError> {
        self.reply(Call::UploadFile {
            url: url.to_string(),
            path: path.to_path_buf(),
        })
    }

    async fn download_string(&self, url: &str) -> Result<HttpResponse, UploaderError> {
        self.reply(Call::Download {
            url: url.to_string(),
        })
    }

    async fn upload_string(&self, url: &str, body: String) -> Result<HttpResponse, UploaderError> {
        self.reply(Call::UploadString {
            url: url.to_string(),
            body,
        })
    }
}

pub fn uploader(transport: FakeTransport) -> Uploader<FakeTransport> {
    Uploader::with_transport(UploaderConfig::new(PRIMARY, SECONDARY), transport)
}
