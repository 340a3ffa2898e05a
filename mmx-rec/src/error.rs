//! Error types for mmx-rec

use crate::catalog::CatalogError;
use crate::recommend::RecommendError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// API error type
///
/// Rendered as `{"success": false, "message": ...}` so the browser UI can
/// show the message as-is.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Invalid request or unusable state (400)
    #[error("{0}")]
    BadRequest(String),

    /// Account cannot perform the action (403)
    #[error("{0}")]
    Forbidden(String),

    /// Nothing suitable found (404)
    #[error("{0}")]
    NotFound(String),

    /// Upstream or internal failure (500)
    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = Json(json!({
            "success": false,
            "message": self.to_string(),
        }));
        (status, body).into_response()
    }
}

impl From<RecommendError> for ApiError {
    fn from(err: RecommendError) -> Self {
        match err {
            RecommendError::FaceNotVisible => ApiError::BadRequest(err.to_string()),
            RecommendError::NoSuitableContent { .. } => ApiError::NotFound(err.to_string()),
            RecommendError::ContainerUnavailable { .. } => {
                ApiError::Internal("Failed to retrieve or create playlist.".to_string())
            }
            // Upstream details stay in the log
            RecommendError::Catalog { .. } => ApiError::Internal(
                "An error occurred while updating recommendations.".to_string(),
            ),
        }
    }
}

impl From<CatalogError> for ApiError {
    fn from(err: CatalogError) -> Self {
        match err {
            CatalogError::NoActiveDevice => ApiError::BadRequest(
                "Please open your player on a device and start playing any track first"
                    .to_string(),
            ),
            CatalogError::PremiumRequired => {
                ApiError::Forbidden("Premium is required for playback control".to_string())
            }
            CatalogError::NotFound(what) => ApiError::NotFound(format!("Not found: {}", what)),
            other => ApiError::Internal(format!("Playback error: {}", other)),
        }
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
