//! The extraction collaborator: yt-dlp, driven as a child process.

use async_trait::async_trait;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Output;
use tokio::process::Command;
use tracing::{debug, error, info};

use crate::error::ExtractError;
use crate::models::RawVideoInfo;

/// Output template for downloads: title cut to 80 chars plus the video id.
pub const OUTPUT_TEMPLATE: &str = "%(title).80s-%(id)s.%(ext)s";

/// What the service needs from an extraction backend.
#[async_trait]
pub trait Extractor: Send + Sync {
    /// Metadata and format list, without fetching any media bytes.
    async fn fetch_metadata(&self, url: &str) -> Result<RawVideoInfo, ExtractError>;

    /// Downloads `format_id` into `destination` and returns the final file path.
    async fn fetch_media(
        &self,
        url: &str,
        format_id: &str,
        destination: &Path,
    ) -> Result<PathBuf, ExtractError>;
}

/// [`Extractor`] backed by the `yt-dlp` program.
#[derive(Debug, Clone)]
pub struct YtDlp {
    program: PathBuf,
}

impl YtDlp {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self { program: program.into() }
    }

    /// Arguments for a metadata-only run.
    fn metadata_args(url: &str) -> Vec<OsString> {
        [
            "--dump-single-json",
            "--skip-download",
            "--no-playlist",
            "--quiet",
            "--no-warnings",
            "--",
            url,
        ]
        .into_iter()
        .map(OsString::from)
        .collect()
    }

    /// Arguments for a format-restricted download into `destination`.
    fn download_args(url: &str, format_id: &str, destination: &Path) -> Vec<OsString> {
        let template = destination.join(OUTPUT_TEMPLATE);
        let mut args: Vec<OsString> = ["-f", format_id, "-o"].into_iter().map(OsString::from).collect();
        args.push(template.into_os_string());
        args.extend(
            [
                "--no-playlist",
                "--quiet",
                "--no-progress",
                "--no-warnings",
                "--print",
                "after_move:filepath",
                "--",
                url,
            ]
            .into_iter()
            .map(OsString::from),
        );
        args
    }

    /// Runs yt-dlp to completion. `Err` carries the text to show the user.
    async fn run(&self, args: Vec<OsString>) -> Result<Output, String> {
        debug!("Running {} {:?}", self.program.display(), args);
        let output = Command::new(&self.program)
            .args(&args)
            .output()
            .await
            .map_err(|e| format!("Failed to start {}: {}", self.program.display(), e))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            let message = if stderr.is_empty() {
                format!("{} exited with {}", self.program.display(), output.status)
            } else {
                stderr
            };
            return Err(message);
        }
        Ok(output)
    }
}

impl Default for YtDlp {
    fn default() -> Self {
        Self::new("yt-dlp")
    }
}

#[async_trait]
impl Extractor for YtDlp {
    async fn fetch_metadata(&self, url: &str) -> Result<RawVideoInfo, ExtractError> {
        info!("Fetching metadata for URL: {}", url);
        let output = self.run(Self::metadata_args(url)).await.map_err(|e| {
            error!("yt-dlp metadata extraction failed: {}", e);
            ExtractError::Extraction(e)
        })?;

        serde_json::from_slice(&output.stdout)
            .map_err(|e| ExtractError::Extraction(format!("Invalid yt-dlp output: {}", e)))
    }

    async fn fetch_media(
        &self,
        url: &str,
        format_id: &str,
        destination: &Path,
    ) -> Result<PathBuf, ExtractError> {
        info!("Downloading format {} of {} into {}", format_id, url, destination.display());
        let output = self
            .run(Self::download_args(url, format_id, destination))
            .await
            .map_err(|e| {
                error!("yt-dlp download failed: {}", e);
                ExtractError::Download(e)
            })?;

        last_printed_line(&output.stdout)
            .map(PathBuf::from)
            .ok_or_else(|| ExtractError::Download("yt-dlp did not report an output file".to_string()))
    }
}

/// `--print` writes the final path last; earlier lines are noise.
fn last_printed_line(stdout: &[u8]) -> Option<String> {
    String::from_utf8_lossy(stdout)
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .last()
        .map(ToString::to_string)
}
