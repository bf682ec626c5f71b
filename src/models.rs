use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::platform::Platform;

// === API Request/Response Models ===

/// The JSON body of a `POST /api/analyze` request.
#[derive(Deserialize, Debug)]
pub struct AnalyzeRequest {
    pub url: String,
}

/// The query parameters of a `GET /api/download` request.
///
/// Both fields are optional at the extractor level so that a missing one is
/// reported with our own message instead of axum's rejection text.
#[derive(Deserialize, Debug, Default)]
pub struct DownloadQuery {
    pub url: Option<String>,
    pub format_id: Option<String>,
}

/// Everything the page needs to render a video and its download choices.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct AnalysisResult {
    pub title: Option<String>,
    pub thumbnail: Option<String>,
    /// Formatted as `3m07s`.
    pub duration: Option<String>,
    pub platform: Platform,
    pub formats: Vec<FormatDescriptor>,
    pub original_url: String,
}

/// One downloadable variant, ready for display.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct FormatDescriptor {
    pub format_id: String,
    pub ext: Option<String>,
    pub resolution: String,
    pub quality: String,
    pub is_audio: bool,
    pub filesize_human: String,
}

// === yt-dlp Output Models ===

/// The part of `yt-dlp --dump-single-json` we care about.
#[derive(Deserialize, Debug, Default, Clone)]
pub struct RawVideoInfo {
    #[serde(default, deserialize_with = "lenient_string")]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub thumbnail: Option<String>,
    /// Seconds; yt-dlp reports either an integer or a float.
    #[serde(default, deserialize_with = "lenient_number")]
    pub duration: Option<f64>,
    #[serde(default, deserialize_with = "lenient_formats")]
    pub formats: Vec<RawFormat>,
}

/// A single entry of yt-dlp's `formats` array. Every field may be missing.
#[derive(Deserialize, Debug, Default, Clone)]
pub struct RawFormat {
    #[serde(default, deserialize_with = "lenient_string")]
    pub format_id: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub ext: Option<String>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub width: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub height: Option<f64>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub format_note: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub vcodec: Option<String>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub filesize: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub filesize_approx: Option<f64>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub url: Option<String>,
}

// yt-dlp extractors are not consistent about field types. A value of the
// wrong type reads as absent rather than failing the whole document.

fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

fn lenient_number<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    })
}

fn lenient_formats<'de, D>(deserializer: D) -> Result<Vec<RawFormat>, D::Error>
where
    D: Deserializer<'de>,
{
    let entries = match Value::deserialize(deserializer)? {
        Value::Array(entries) => entries,
        _ => return Ok(Vec::new()),
    };
    Ok(entries
        .into_iter()
        .filter_map(|entry| serde_json::from_value(entry).ok())
        .collect())
}
