use reqwest::StatusCode;
use thiserror::Error;

/// Replay uploader errors
#[derive(Debug, Error)]
pub enum UploaderError {
    /// No response was received (DNS, connection refused, timeout)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// A response was received with a non-success status
    #[error("Request failed with status {status}: {body}")]
    Status { status: StatusCode, body: String },

    /// Configuration file errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Malformed server reply
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error with context
    #[error("{0}")]
    Other(String),
}

impl UploaderError {
    /// HTTP status of the server reply, if one was received.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            UploaderError::Status { status, .. } => Some(*status),
            UploaderError::Http(e) => e.status(),
            _ => None,
        }
    }
}

/// Convert UploaderError to String for callers that only surface messages
impl From<UploaderError> for String {
    fn from(err: UploaderError) -> String {
        err.to_string()
    }
}

/// Helper to convert Box<dyn std::error::Error> to UploaderError
impl From<Box<dyn std::error::Error>> for UploaderError {
    fn from(err: Box<dyn std::error::Error>) -> Self {
        UploaderError::Other(err.to_string())
    }
}

/// Helper trait for adding context to errors
pub trait ErrorContext<T> {
    fn context(self, msg: &str) -> Result<T, UploaderError>;
}

impl<T, E: Into<UploaderError>> ErrorContext<T> for Result<T, E> {
    fn context(self, msg: &str) -> Result<T, UploaderError> {
        self.map_err(|e| {
            let err: UploaderError = e.into();
            match err {
                UploaderError::Other(s) => UploaderError::Other(format!("{}: {}", msg, s)),
                UploaderError::Config(s) => UploaderError::Config(format!("{}: {}", msg, s)),
                UploaderError::Protocol(s) => {
                    UploaderError::Protocol(format!("{}: {}", msg, s))
                }
                UploaderError::Status { status, body } => UploaderError::Status { status, body },
                UploaderError::Http(e) => UploaderError::Http(e),
                UploaderError::Io(e) => UploaderError::Io(e),
                UploaderError::Json(e) => UploaderError::Json(e),
            }
        })
    }
}
