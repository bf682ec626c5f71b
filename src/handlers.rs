use crate::{
    analysis,
    error::{AppError, ExtractError},
    models::{AnalysisResult, AnalyzeRequest, DownloadQuery},
    AppState,
};
use axum::{
    body::Body,
    extract::{rejection::{JsonRejection, QueryRejection}, Query, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{Html, IntoResponse},
    Json,
};
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use std::path::Path;
use url::Url;

const INDEX_HTML: &str = include_str!("../static/index.html");

/// RFC 5987 `attr-char`s pass through, everything else is percent-encoded.
const FILENAME_STAR: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'!')
    .remove(b'#')
    .remove(b'$')
    .remove(b'&')
    .remove(b'+')
    .remove(b'-')
    .remove(b'.')
    .remove(b'^')
    .remove(b'_')
    .remove(b'`')
    .remove(b'|')
    .remove(b'~');

// ===================================================================
//                          PAGE HANDLER
// ===================================================================

/// # GET / - Serves the single-page frontend.
pub async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

// ===================================================================
//                          ANALYZE HANDLER
// ===================================================================

/// # POST /api/analyze - Lists the downloadable formats of a video URL.
pub async fn analyze_video(
    State(state): State<AppState>,
    payload: Result<Json<AnalyzeRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(payload) = payload.map_err(|e| AppError::BadRequest(e.body_text()))?;
    let url = parse_video_url(&payload.url)?;
    tracing::info!("Analyzing URL: {}", url);

    let result: AnalysisResult = analysis::analyze(state.extractor.as_ref(), url.as_str())
        .await
        .map_err(AppError::Analysis)?;

    tracing::info!(
        "Found {} formats for '{}' ({})",
        result.formats.len(),
        result.title.as_deref().unwrap_or("untitled"),
        result.platform
    );
    Ok((StatusCode::OK, Json(result)))
}

/// Accepts absolute http(s) URLs with a host.
fn parse_video_url(raw: &str) -> Result<Url, AppError> {
    let url = Url::parse(raw.trim())
        .map_err(|e| AppError::BadRequest(format!("URL invalide : {}", e)))?;
    if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
        return Err(AppError::BadRequest(
            "URL invalide : seuls les liens http(s) sont acceptés.".to_string(),
        ));
    }
    Ok(url)
}

// ===================================================================
//                          DOWNLOAD HANDLER
// ===================================================================

/// # GET /api/download - Downloads one format and streams the file back.
pub async fn download_video(
    State(state): State<AppState>,
    params: Result<Query<DownloadQuery>, QueryRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Query(params) = params.map_err(|e| AppError::BadRequest(e.body_text()))?;
    let (url, format_id) = match (non_blank(params.url), non_blank(params.format_id)) {
        (Some(url), Some(format_id)) => (url, format_id),
        _ => return Err(AppError::BadRequest("Paramètres manquants.".to_string())),
    };
    tracing::info!("Download requested: format {} of {}", format_id, url);

    let file_path = state
        .downloads
        .prepare_download(&url, &format_id)
        .await
        .map_err(AppError::Download)?;

    let (file, length) = open_artifact(&file_path).await.map_err(AppError::Download)?;
    let stream = tokio_util::io::ReaderStream::new(file);
    let body = Body::from_stream(stream);

    let mut headers = HeaderMap::new();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("application/octet-stream"));
    headers.insert(header::CONTENT_LENGTH, HeaderValue::from(length));
    headers.insert(
        header::CONTENT_DISPOSITION,
        HeaderValue::from_str(&content_disposition(&file_path))?,
    );

    tracing::info!("Serving {} ({} bytes)", file_path.display(), length);
    Ok((headers, body))
}

// ===================================================================
//                          HELPER FUNCTIONS
// ===================================================================

/// Opens a produced file for streaming, along with its length.
async fn open_artifact(path: &Path) -> Result<(tokio::fs::File, u64), ExtractError> {
    let read_error = |e: std::io::Error| {
        ExtractError::Download(format!("Could not read {}: {}", path.display(), e))
    };
    let file = tokio::fs::File::open(path).await.map_err(read_error)?;
    let length = file.metadata().await.map_err(read_error)?.len();
    Ok((file, length))
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

/// `attachment` disposition naming the file by its base name.
///
/// Header values must be visible ASCII, so non-ASCII names get a lossy
/// `filename` plus the exact name in `filename*`.
fn content_disposition(path: &Path) -> String {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "download".to_string());
    let fallback: String = name
        .chars()
        .map(|c| match c {
            '"' | '\\' => '_',
            c if c.is_ascii_graphic() || c == ' ' => c,
            _ => '_',
        })
        .collect();

    if fallback == name {
        format!("attachment; filename=\"{}\"", name)
    } else {
        format!(
            "attachment; filename=\"{}\"; filename*=UTF-8''{}",
            fallback,
            utf8_percent_encode(&name, FILENAME_STAR)
        )
    }
}
