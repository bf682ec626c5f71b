use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt;

use deku_media::error::ExtractError;
use deku_media::extractor::Extractor;
use deku_media::models::RawVideoInfo;
use deku_media::{router, AppState};

enum Media {
    Write(&'static str, &'static [u8]),
    ReportOnly(&'static str),
    Fail(&'static str),
}

struct FakeYtDlp {
    metadata: Result<Value, &'static str>,
    media: Media,
    calls: AtomicUsize,
}

impl FakeYtDlp {
    fn new(metadata: Result<Value, &'static str>, media: Media) -> Arc<Self> {
        Arc::new(Self { metadata, media, calls: AtomicUsize::new(0) })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Extractor for FakeYtDlp {
    async fn fetch_metadata(&self, _url: &str) -> Result<RawVideoInfo, ExtractError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.metadata {
            Ok(json) => Ok(serde_json::from_value(json.clone()).unwrap()),
            Err(message) => Err(ExtractError::Extraction(message.to_string())),
        }
    }

    async fn fetch_media(
        &self,
        _url: &str,
        _format_id: &str,
        destination: &Path,
    ) -> Result<PathBuf, ExtractError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.media {
            Media::Write(name, bytes) => {
                let path = destination.join(name);
                tokio::fs::write(&path, bytes).await.unwrap();
                Ok(path)
            }
            Media::ReportOnly(name) => Ok(destination.join(name)),
            Media::Fail(message) => Err(ExtractError::Download(message.to_string())),
        }
    }
}

fn two_formats() -> Value {
    json!({
        "title": "Never Gonna",
        "thumbnail": "https://i.ytimg.com/vi/abc123/hqdefault.jpg",
        "duration": 187,
        "formats": [
            {"format_id": "140", "ext": "m4a", "vcodec": "none", "acodec": "mp4a.40.2",
             "format_note": "128K", "url": "https://cdn.example/140"},
            {"format_id": "137", "ext": "mp4", "vcodec": "avc1.640028", "width": 1920,
             "height": 1080, "filesize": 2097152, "url": "https://cdn.example/137"},
            {"format_id": "sb0", "ext": "mhtml", "vcodec": "none", "format_note": "storyboard"}
        ]
    })
}

fn app(fake: Arc<FakeYtDlp>, root: &Path) -> Router {
    router(AppState::new(fake, root))
}

async fn analyze(app: Router, body: Value) -> (StatusCode, Value) {
    let request = Request::post("/api/analyze")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

async fn get(app: Router, uri: &str) -> axum::response::Response {
    app.oneshot(Request::get(uri).body(Body::empty()).unwrap())
        .await
        .unwrap()
}

async fn json_body(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn scratch_dirs(root: &Path) -> Vec<PathBuf> {
    match std::fs::read_dir(root) {
        Ok(entries) => entries.map(|e| e.unwrap().path()).collect(),
        Err(_) => Vec::new(),
    }
}

#[tokio::test]
async fn analyze_lists_formats_sorted_by_rank() {
    let root = TempDir::new().unwrap();
    let fake = FakeYtDlp::new(Ok(two_formats()), Media::Fail("unused"));

    let (status, body) = analyze(app(fake, root.path()), json!({"url": "https://youtu.be/abc123"})).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["platform"], "youtube");
    assert_eq!(body["title"], "Never Gonna");
    assert_eq!(body["duration"], "3m07s");
    assert_eq!(body["original_url"], "https://youtu.be/abc123");

    let formats = body["formats"].as_array().unwrap();
    assert_eq!(formats.len(), 2);
    assert_eq!(
        formats[0],
        json!({
            "format_id": "137",
            "ext": "mp4",
            "resolution": "1920x1080",
            "quality": "1920x1080",
            "is_audio": false,
            "filesize_human": "2.0 Mo"
        })
    );
    assert_eq!(
        formats[1],
        json!({
            "format_id": "140",
            "ext": "m4a",
            "resolution": "",
            "quality": "128K",
            "is_audio": true,
            "filesize_human": "Taille inconnue"
        })
    );
}

#[tokio::test]
async fn analyze_reports_missing_duration_and_title_as_null() {
    let root = TempDir::new().unwrap();
    let metadata = json!({"formats": [{"format_id": "0", "url": "https://cdn.example/0"}]});
    let fake = FakeYtDlp::new(Ok(metadata), Media::Fail("unused"));

    let (status, body) = analyze(app(fake, root.path()), json!({"url": "https://vimeo.com/1"})).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["platform"], "unknown");
    assert!(body["title"].is_null());
    assert!(body["thumbnail"].is_null());
    assert!(body["duration"].is_null());
}

#[tokio::test]
async fn analyze_failure_embeds_collaborator_message() {
    let root = TempDir::new().unwrap();
    let fake = FakeYtDlp::new(
        Err("ERROR: [youtube] abc123: Private video. Sign in if you've been granted access"),
        Media::Fail("unused"),
    );

    let (status, body) = analyze(app(fake, root.path()), json!({"url": "https://youtu.be/abc123"})).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    let message = body["error"].as_str().unwrap();
    assert!(message.starts_with("Analyse impossible"));
    assert!(message.contains("Private video"));
}

#[tokio::test]
async fn analyze_without_downloadable_formats_is_rejected() {
    let root = TempDir::new().unwrap();
    let metadata = json!({"title": "x", "formats": [{"format_id": "sb0"}]});
    let fake = FakeYtDlp::new(Ok(metadata), Media::Fail("unused"));

    let (status, body) = analyze(app(fake, root.path()), json!({"url": "https://youtu.be/x"})).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body["error"],
        "Analyse impossible : Aucun format disponible pour ce lien."
    );
}

#[tokio::test]
async fn analyze_rejects_malformed_input_before_extraction() {
    let root = TempDir::new().unwrap();
    let fake = FakeYtDlp::new(Ok(two_formats()), Media::Fail("unused"));

    for body in [json!({"url": "not a url"}), json!({"url": "ftp://host/v"}), json!({})] {
        let (status, _) = analyze(app(fake.clone(), root.path()), body).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
    assert_eq!(fake.calls(), 0);
}

#[tokio::test]
async fn download_without_format_id_is_rejected_untouched() {
    let root = TempDir::new().unwrap();
    let fake = FakeYtDlp::new(Ok(two_formats()), Media::Write("a.mp4", b"x"));

    let response = get(app(fake.clone(), root.path()), "/api/download?url=https%3A%2F%2Fyoutu.be%2Fabc123").await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(response).await["error"], "Paramètres manquants.");
    assert_eq!(fake.calls(), 0);
    assert!(scratch_dirs(root.path()).is_empty());
}

#[tokio::test]
async fn download_with_blank_url_is_rejected() {
    let root = TempDir::new().unwrap();
    let fake = FakeYtDlp::new(Ok(two_formats()), Media::Write("a.mp4", b"x"));

    let response = get(app(fake.clone(), root.path()), "/api/download?url=&format_id=18").await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(fake.calls(), 0);
}

#[tokio::test]
async fn download_streams_the_file_as_attachment() {
    let root = TempDir::new().unwrap();
    let fake = FakeYtDlp::new(Ok(two_formats()), Media::Write("Never Gonna-abc123.mp4", b"fake-mp4-bytes"));

    let response = get(
        app(fake, root.path()),
        "/api/download?url=https%3A%2F%2Fyoutu.be%2Fabc123&format_id=137",
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    let headers = response.headers();
    assert_eq!(headers[header::CONTENT_TYPE], "application/octet-stream");
    assert_eq!(headers[header::CONTENT_LENGTH], "14");
    assert_eq!(
        headers[header::CONTENT_DISPOSITION],
        "attachment; filename=\"Never Gonna-abc123.mp4\""
    );
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(body.as_ref(), b"fake-mp4-bytes");

    // Served files stay on disk.
    let dirs = scratch_dirs(root.path());
    assert_eq!(dirs.len(), 1);
    assert!(dirs[0].join("Never Gonna-abc123.mp4").is_file());
}

#[tokio::test]
async fn download_missing_artifact_is_server_error() {
    let root = TempDir::new().unwrap();
    let fake = FakeYtDlp::new(Ok(two_formats()), Media::ReportOnly("vanished.mp4"));

    let response = get(
        app(fake, root.path()),
        "/api/download?url=https%3A%2F%2Fyoutu.be%2Fabc123&format_id=137",
    )
    .await;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        json_body(response).await["error"],
        "Fichier introuvable après téléchargement."
    );
    let dirs = scratch_dirs(root.path());
    assert_eq!(dirs.len(), 1);
    assert!(scratch_dirs(&dirs[0]).is_empty());
}

#[tokio::test]
async fn download_failure_embeds_collaborator_message() {
    let root = TempDir::new().unwrap();
    let fake = FakeYtDlp::new(
        Ok(two_formats()),
        Media::Fail("ERROR: [youtube] abc123: Requested format is not available"),
    );

    let response = get(
        app(fake, root.path()),
        "/api/download?url=https%3A%2F%2Fyoutu.be%2Fabc123&format_id=999",
    )
    .await;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = json_body(response).await;
    let message = body["error"].as_str().unwrap();
    assert!(message.starts_with("Téléchargement impossible : "));
    assert!(message.contains("Requested format is not available"));
}

#[tokio::test]
async fn index_serves_the_page() {
    let root = TempDir::new().unwrap();
    let fake = FakeYtDlp::new(Ok(two_formats()), Media::Fail("unused"));

    let response = get(app(fake, root.path()), "/").await;

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers()[header::CONTENT_TYPE]
        .to_str()
        .unwrap()
        .starts_with("text/html"));
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let html = String::from_utf8(body.to_vec()).unwrap();
    assert!(html.contains("/api/analyze"));
    assert!(html.contains("/api/download"));
}
