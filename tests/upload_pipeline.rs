/// Integration tests for the upload pipeline over real HTTP.
///
/// A local warp server stands in for the primary and secondary services.
use replay_uploader::{Replay, ReplayFile, UploadStatus, Uploader, UploaderConfig};
use std::collections::HashMap;
use std::io::Write;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use tempfile::NamedTempFile;
use warp::hyper::body::Bytes;
use warp::Filter;

const REPLAY_CONTENT: &[u8] = b"MPQ\x1a replay payload for integration test";

// Nothing listens on port 1, so connections are refused immediately
const UNREACHABLE: &str = "http://127.0.0.1:1/api/v1";

#[derive(Debug, Clone)]
struct ReceivedUpload {
    query: HashMap<String, String>,
    contains_replay: bool,
}

type Received = Arc<Mutex<Vec<ReceivedUpload>>>;

fn record_upload(received: Received, query: HashMap<String, String>, body: Bytes) {
    let contains_replay = body
        .windows(REPLAY_CONTENT.len())
        .any(|window| window == REPLAY_CONTENT);
    received.lock().unwrap().push(ReceivedUpload {
        query,
        contains_replay,
    });
}

/// Primary service: fingerprints starting with "known" already exist.
fn start_primary() -> (SocketAddr, Received) {
    let received: Received = Arc::new(Mutex::new(Vec::new()));

    let uploads = received.clone();
    let upload = warp::post()
        .and(warp::path!("api" / "upload"))
        .and(warp::query::<HashMap<String, String>>())
        .and(warp::body::bytes())
        .map(move |query: HashMap<String, String>, body: Bytes| {
            record_upload(uploads.clone(), query, body);
            warp::reply::json(&serde_json::json!({"success": true, "status": "Ok"}))
        });

    let single = warp::get()
        .and(warp::path!("api" / "replays" / "fingerprints" / String))
        .map(|fingerprint: String| {
            warp::reply::json(&serde_json::json!({"exists": fingerprint.starts_with("known")}))
        });

    let batch = warp::post()
        .and(warp::path!("api" / "replays" / "fingerprints"))
        .and(warp::body::bytes())
        .map(|body: Bytes| {
            let text = String::from_utf8_lossy(&body).to_string();
            let exists: Vec<&str> = text.lines().filter(|f| f.starts_with("known")).collect();
            warp::reply::json(&serde_json::json!({ "exists": exists }))
        });

    let min_build = warp::get()
        .and(warp::path!("api" / "replays" / "hotsapi-min-build"))
        .map(|| "43905");

    let routes = upload.or(single).or(batch).or(min_build);
    let (addr, server) = warp::serve(routes).bind_ephemeral(([127, 0, 0, 1], 0));
    tokio::spawn(server);
    (addr, received)
}

/// Secondary service that records uploads and always fails.
fn start_failing_secondary() -> (SocketAddr, Received) {
    let received: Received = Arc::new(Mutex::new(Vec::new()));

    let uploads = received.clone();
    let upload = warp::post()
        .and(warp::path!("api" / "v1" / "upload"))
        .and(warp::query::<HashMap<String, String>>())
        .and(warp::body::bytes())
        .map(move |query: HashMap<String, String>, body: Bytes| {
            record_upload(uploads.clone(), query, body);
            warp::reply::with_status("mirror down", warp::http::StatusCode::INTERNAL_SERVER_ERROR)
        });

    let (addr, server) = warp::serve(upload).bind_ephemeral(([127, 0, 0, 1], 0));
    tokio::spawn(server);
    (addr, received)
}

fn replay_on_disk() -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(REPLAY_CONTENT).unwrap();
    file.flush().unwrap();
    file
}

#[tokio::test]
async fn test_upload_with_unreachable_mirror() {
    let (primary, received) = start_primary();
    let config = UploaderConfig::new(&format!("http://{}/api", primary), UNREACHABLE);
    let uploader = Uploader::new(config).unwrap();

    let replay = replay_on_disk();
    let mut file = ReplayFile::new(replay.path(), Some("abc".to_string()));

    uploader.upload_file(&Replay::new(70_000), &mut file).await;

    assert_eq!(file.upload_status, UploadStatus::Success);

    let received = received.lock().unwrap();
    assert_eq!(received.len(), 1);
    assert_eq!(received[0].query.get("fingerprint").map(String::as_str), Some("abc"));
    assert!(received[0].contains_replay, "multipart body should carry the replay bytes");
}

#[tokio::test]
async fn test_known_fingerprint_is_not_uploaded() {
    let (primary, received) = start_primary();
    let config = UploaderConfig::new(&format!("http://{}/api", primary), UNREACHABLE);
    let uploader = Uploader::new(config).unwrap();

    let replay = replay_on_disk();
    let mut file = ReplayFile::new(replay.path(), Some("known-1".to_string()));

    uploader.upload_file(&Replay::default(), &mut file).await;

    assert_eq!(file.upload_status, UploadStatus::Duplicate);
    assert!(received.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_batch_marks_known_files() {
    let (primary, _) = start_primary();
    let config = UploaderConfig::new(&format!("http://{}/api", primary), UNREACHABLE);
    let uploader = Uploader::new(config).unwrap();

    let mut files = vec![
        ReplayFile::new("/replays/1.StormReplay", Some("known-1".to_string())),
        ReplayFile::new("/replays/2.StormReplay", Some("fresh".to_string())),
        ReplayFile::new("/replays/3.StormReplay", Some("known-3".to_string())),
    ];

    uploader.mark_duplicates(&mut files).await;

    let statuses: Vec<UploadStatus> = files.iter().map(|f| f.upload_status).collect();
    assert_eq!(
        statuses,
        vec![
            UploadStatus::Duplicate,
            UploadStatus::NotUploaded,
            UploadStatus::Duplicate
        ]
    );
}

#[tokio::test]
async fn test_minimum_build() {
    let (primary, _) = start_primary();
    let config = UploaderConfig::new(&format!("http://{}/api", primary), UNREACHABLE);
    let uploader = Uploader::new(config).unwrap();

    assert_eq!(uploader.get_minimum_build().await, 43905);
    assert!(!Replay::new(40_000).meets_minimum_build(43905));
}

#[tokio::test]
async fn test_failing_mirror_receives_file_and_flag() {
    let (primary, primary_received) = start_primary();
    let (secondary, secondary_received) = start_failing_secondary();
    let config = UploaderConfig::new(
        &format!("http://{}/api", primary),
        &format!("http://{}/api/v1", secondary),
    )
    .with_forwarding(true);
    let uploader = Uploader::new(config).unwrap();

    let replay = replay_on_disk();
    let status = uploader
        .upload(&Replay::default(), Some("def"), replay.path())
        .await;

    assert_eq!(status, UploadStatus::Success);
    assert_eq!(primary_received.lock().unwrap().len(), 1);

    let mirrored = secondary_received.lock().unwrap();
    assert_eq!(mirrored.len(), 1);
    assert_eq!(
        mirrored[0].query.get("uploadToHotslogs").map(String::as_str),
        Some("true")
    );
    assert!(mirrored[0].contains_replay);
}

#[tokio::test]
async fn test_unreachable_primary_reports_error() {
    let config = UploaderConfig::new(UNREACHABLE, UNREACHABLE);
    let uploader = Uploader::new(config).unwrap();

    let replay = replay_on_disk();
    let mut file = ReplayFile::new(replay.path(), Some("abc".to_string()));

    uploader.upload_file(&Replay::default(), &mut file).await;

    assert_eq!(file.upload_status, UploadStatus::UploadError);
    assert!(uploader.check_duplicates(&["abc"]).await.is_empty());
    assert_eq!(uploader.get_minimum_build().await, 0);
}
