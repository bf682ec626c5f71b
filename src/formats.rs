//! Turns yt-dlp's raw format list into what the page shows.

use crate::models::{FormatDescriptor, RawFormat};

const MIB: f64 = 1024.0 * 1024.0;
const UNKNOWN_SIZE: &str = "Taille inconnue";

/// Filters, annotates and sorts raw formats.
///
/// Entries without a source URL cannot be downloaded and are dropped. The
/// result is sorted by [`rank`] with a stable sort, so equal ranks keep the
/// order yt-dlp gave them.
pub fn normalize(raw_formats: &[RawFormat]) -> Vec<FormatDescriptor> {
    let mut formats: Vec<FormatDescriptor> = raw_formats.iter().filter_map(describe).collect();
    formats.sort_by_key(rank);
    formats
}

fn describe(raw: &RawFormat) -> Option<FormatDescriptor> {
    non_empty(raw.url.as_deref())?;
    let format_id = non_empty(raw.format_id.as_deref())?.to_string();

    let is_audio = raw.vcodec.as_deref() == Some("none");
    let resolution = resolution(raw.width, raw.height);
    let quality = match non_empty(raw.format_note.as_deref()) {
        Some(note) => note.to_string(),
        None if !resolution.is_empty() => resolution.clone(),
        None if is_audio => "audio".to_string(),
        None => "video".to_string(),
    };

    Some(FormatDescriptor {
        format_id,
        ext: raw.ext.clone(),
        resolution,
        quality,
        is_audio,
        filesize_human: human_size(known_size(raw)),
    })
}

/// `"{width}x{height}"`, with missing sides left out along with the `x`.
fn resolution(width: Option<f64>, height: Option<f64>) -> String {
    let side = |v: Option<f64>| v.filter(|v| *v != 0.0).map(render_number).unwrap_or_default();
    format!("{}x{}", side(width), side(height))
        .trim_matches('x')
        .to_string()
}

fn render_number(v: f64) -> String {
    if v.fract() == 0.0 && v.abs() < i64::MAX as f64 {
        (v as i64).to_string()
    } else {
        v.to_string()
    }
}

/// Renders a byte count in MiB with one decimal, e.g. `2.0 Mo`.
pub fn human_size(bytes: Option<f64>) -> String {
    match bytes {
        Some(bytes) => format!("{:.1} Mo", bytes / MIB),
        None => UNKNOWN_SIZE.to_string(),
    }
}

/// Sort key of a format.
///
/// A quality label carrying a `K` is read as an audio bitrate in kbps and
/// ranked at `kbps * 1000`. Everything else ranks by pixel height, 0 when the
/// resolution has none. Bitrates and heights share one number line on purpose:
/// `128K` audio ranks above 1080p video.
pub fn rank(format: &FormatDescriptor) -> i64 {
    if format.quality.contains('K') {
        if let Ok(kbps) = format.quality.replace('K', "").trim().parse::<i64>() {
            return kbps.saturating_mul(1000);
        }
    }
    format
        .resolution
        .split('x')
        .nth(1)
        .and_then(|height| height.trim().parse().ok())
        .unwrap_or(0)
}

fn non_empty(s: Option<&str>) -> Option<&str> {
    s.filter(|s| !s.is_empty())
}

/// Exact size, else approximate; a zero counts as unknown.
fn known_size(raw: &RawFormat) -> Option<f64> {
    let nonzero = |v: Option<f64>| v.filter(|v| *v != 0.0);
    nonzero(raw.filesize).or(nonzero(raw.filesize_approx))
}
