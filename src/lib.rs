// Replay upload pipeline: duplicate detection, dual-target dispatch,
// rate-limit retry and server status translation.

pub mod config;
pub mod error;
pub mod logging;
pub mod transport;
pub mod uploader;

pub use config::UploaderConfig;
pub use error::UploaderError;
pub use transport::{HttpResponse, ReqwestTransport, Transport};
pub use uploader::{Replay, ReplayFile, UploadStatus, Uploader};
