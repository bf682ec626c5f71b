use crate::error::ExtractError;
use crate::extractor::Extractor;
use crate::formats::normalize;
use crate::models::AnalysisResult;
use crate::platform::classify;

pub const NO_FORMATS_MESSAGE: &str = "Aucun format disponible pour ce lien.";

/// Fetches metadata for `url` and shapes it for the page.
///
/// A video with nothing downloadable is an error, not an empty result.
pub async fn analyze(extractor: &dyn Extractor, url: &str) -> Result<AnalysisResult, ExtractError> {
    let info = extractor.fetch_metadata(url).await?;
    let formats = normalize(&info.formats);
    if formats.is_empty() {
        return Err(ExtractError::Extraction(NO_FORMATS_MESSAGE.to_string()));
    }

    Ok(AnalysisResult {
        title: info.title,
        thumbnail: info.thumbnail,
        duration: format_duration(info.duration),
        platform: classify(url),
        formats,
        original_url: url.to_string(),
    })
}

/// `187` seconds reads `3m07s`. Zero or unknown durations read as `None`.
pub fn format_duration(seconds: Option<f64>) -> Option<String> {
    let seconds = seconds.filter(|s| s.is_finite() && *s >= 1.0)? as u64;
    Some(format!("{}m{:02}s", seconds / 60, seconds % 60))
}
