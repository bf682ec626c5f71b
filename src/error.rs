use axum::{http::StatusCode, response::{IntoResponse, Response}, Json};
use serde_json::json;
use std::path::PathBuf;
use thiserror::Error;

pub const MISSING_ARTIFACT_MESSAGE: &str = "Fichier introuvable après téléchargement.";

/// Failures of the extraction collaborator and of the download pipeline.
///
/// The collaborator's own text is kept as-is; it is the only diagnostic there is.
#[derive(Debug, Error)]
pub enum ExtractError {
    /// Metadata could not be fetched, or yielded nothing downloadable.
    #[error("{0}")]
    Extraction(String),

    /// The media fetch failed, remotely or on local disk.
    #[error("{0}")]
    Download(String),

    /// yt-dlp reported success but the file it named is not there.
    #[error("{}", MISSING_ARTIFACT_MESSAGE)]
    MissingArtifact { path: PathBuf },
}

// Define our custom error type
#[derive(Debug)]
pub enum AppError {
    Internal(anyhow::Error),
    Analysis(ExtractError),
    Download(ExtractError),
    BadRequest(String),
}

// This implementation allows us to convert our AppError into a valid HTTP response.
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::Internal(e) => {
                // Log the full error for debugging
                tracing::error!("Internal server error: {:?}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "An internal server error occurred".to_string(),
                )
            }
            AppError::Analysis(e) => (StatusCode::BAD_REQUEST, format!("Analyse impossible : {}", e)),
            AppError::Download(e @ ExtractError::MissingArtifact { .. }) => {
                (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
            }
            AppError::Download(e) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Téléchargement impossible : {}", e),
            ),
            AppError::BadRequest(e) => (StatusCode::BAD_REQUEST, e),
        };

        let body = Json(json!({ "error": error_message }));
        (status, body).into_response()
    }
}

// This allows us to use the `?` operator to automatically convert
// any error that implements `std::error::Error` into our `AppError::Internal`.
impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self::Internal(err.into())
    }
}
