use std::path::PathBuf;
use std::sync::Arc;
use uuid::Uuid;

use crate::error::ExtractError;
use crate::extractor::Extractor;

/// Runs one download per call, each in its own scratch directory under `root`.
///
/// Scratch directories and their files are left in place once served.
#[derive(Clone)]
pub struct DownloadOrchestrator {
    root: PathBuf,
    extractor: Arc<dyn Extractor>,
}

impl DownloadOrchestrator {
    pub fn new(root: impl Into<PathBuf>, extractor: Arc<dyn Extractor>) -> Self {
        Self { root: root.into(), extractor }
    }

    /// Downloads `format_id` of `url` and returns the path of the produced file.
    pub async fn prepare_download(&self, url: &str, format_id: &str) -> Result<PathBuf, ExtractError> {
        let scratch_dir = self.root.join(Uuid::new_v4().to_string());
        tokio::fs::create_dir_all(&scratch_dir).await.map_err(|e| {
            ExtractError::Download(format!(
                "Could not create {}: {}",
                scratch_dir.display(),
                e
            ))
        })?;
        tracing::debug!("Created scratch directory {}", scratch_dir.display());

        let path = self.extractor.fetch_media(url, format_id, &scratch_dir).await?;

        match tokio::fs::metadata(&path).await {
            Ok(meta) if meta.is_file() => Ok(path),
            _ => {
                tracing::error!(
                    "yt-dlp reported {} but no such file exists",
                    path.display()
                );
                Err(ExtractError::MissingArtifact { path })
            }
        }
    }
}
