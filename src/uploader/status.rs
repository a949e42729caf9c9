//! Translation of server replies into UploadStatus.

use super::types::{UploadResponse, UploadStatus};
use crate::logging::log_warn;

/// Status names the primary service reports, and the status each maps to.
/// Lookup is exact and case-sensitive.
pub const STATUS_NAMES: &[(&str, UploadStatus)] = &[
    ("Success", UploadStatus::Success),
    ("Ok", UploadStatus::Success),
    ("Duplicate", UploadStatus::Duplicate),
    ("AiDetected", UploadStatus::AiDetected),
    ("CustomGame", UploadStatus::CustomGame),
    ("PtrRegion", UploadStatus::PtrRegion),
    ("Incomplete", UploadStatus::Incomplete),
    ("TooOld", UploadStatus::TooOld),
    ("UploadError", UploadStatus::UploadError),
];

/// Look up a server status name
pub fn status_from_name(name: &str) -> Option<UploadStatus> {
    STATUS_NAMES
        .iter()
        .find(|(known, _)| *known == name)
        .map(|(_, status)| *status)
}

/// Map a server status name, logging names this client does not know.
pub fn translate_status(name: &str) -> UploadStatus {
    status_from_name(name).unwrap_or_else(|| {
        log_warn("upload", &format!("Unknown upload status '{}'", name)).unwrap_or_default();
        UploadStatus::UploadError
    })
}

/// Translate a raw primary upload reply for `file`.
pub fn parse_upload_response(file: &str, body: &str) -> UploadStatus {
    let response: UploadResponse = match serde_json::from_str(body) {
        Ok(response) => response,
        Err(e) => {
            log_warn(
                "upload",
                &format!("Malformed upload response for '{}' ({}): {}", file, e, body),
            )
            .unwrap_or_default();
            return UploadStatus::UploadError;
        }
    };

    if !response.success {
        log_warn("upload", &format!("Error uploading file '{}': {}", file, body))
            .unwrap_or_default();
        return UploadStatus::UploadError;
    }

    match response.status.as_deref() {
        Some(name) => translate_status(name),
        None => {
            log_warn(
                "upload",
                &format!("Upload response for '{}' has no status: {}", file, body),
            )
            .unwrap_or_default();
            UploadStatus::UploadError
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_names() {
        assert_eq!(status_from_name("Success"), Some(UploadStatus::Success));
        assert_eq!(status_from_name("Ok"), Some(UploadStatus::Success));
        assert_eq!(status_from_name("TooOld"), Some(UploadStatus::TooOld));
        assert_eq!(status_from_name("AiDetected"), Some(UploadStatus::AiDetected));
    }

    #[test]
    fn test_lookup_is_case_sensitive() {
        assert_eq!(status_from_name("success"), None);
        assert_eq!(status_from_name("DUPLICATE"), None);
        assert_eq!(translate_status("ok"), UploadStatus::UploadError);
    }

    #[test]
    fn test_in_flight_states_are_not_server_names() {
        assert_eq!(status_from_name("InProgress"), None);
        assert_eq!(status_from_name("NotUploaded"), None);
    }

    #[test]
    fn test_every_table_entry_is_terminal() {
        for (_, status) in STATUS_NAMES {
            assert!(status.is_terminal());
        }
    }

    #[test]
    fn test_success_reply() {
        let status = parse_upload_response("a.StormReplay", r#"{"success": true, "status": "Success"}"#);
        assert_eq!(status, UploadStatus::Success);
    }

    #[test]
    fn test_duplicate_reply() {
        let status = parse_upload_response("a.StormReplay", r#"{"success": true, "status": "Duplicate"}"#);
        assert_eq!(status, UploadStatus::Duplicate);
    }

    #[test]
    fn test_unknown_status_is_error() {
        let status = parse_upload_response("a.StormReplay", r#"{"success": true, "status": "bogus"}"#);
        assert_eq!(status, UploadStatus::UploadError);
    }

    #[test]
    fn test_failed_reply_is_error() {
        let status = parse_upload_response("a.StormReplay", r#"{"success": false}"#);
        assert_eq!(status, UploadStatus::UploadError);
    }

    #[test]
    fn test_missing_status_is_error() {
        let status = parse_upload_response("a.StormReplay", r#"{"success": true}"#);
        assert_eq!(status, UploadStatus::UploadError);
    }

    #[test]
    fn test_malformed_replies_are_errors() {
        for body in ["", "<html>502</html>", r#"{"status": "Success"}"#, r#"{"success": "yes"}"#] {
            assert_eq!(
                parse_upload_response("a.StormReplay", body),
                UploadStatus::UploadError,
                "body: {}",
                body
            );
        }
    }
}
