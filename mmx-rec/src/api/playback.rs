//! Playback endpoint

use axum::{extract::State, routing::post, Json, Router};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{ApiError, ApiResult};
use crate::AppState;

/// POST /play request body
#[derive(Debug, Deserialize)]
pub struct PlayRequest {
    #[serde(default)]
    pub track_id: Option<String>,
}

/// POST /play success response
#[derive(Debug, Serialize)]
pub struct PlayResponse {
    pub success: bool,
    pub message: String,
}

/// POST /play
pub async fn play(
    State(state): State<AppState>,
    body: Option<Json<PlayRequest>>,
) -> ApiResult<Json<PlayResponse>> {
    let Some(Json(request)) = body else {
        warn!("Play request without a JSON body");
        return Err(ApiError::BadRequest("Invalid request format".to_string()));
    };

    let track_id = request
        .track_id
        .map(|id| id.trim().to_string())
        .filter(|id| !id.is_empty())
        .ok_or_else(|| ApiError::BadRequest("No track ID provided".to_string()))?;

    info!(track_id = %track_id, "Attempting to play track");
    let device = state.catalog.start_playback(&track_id).await.map_err(|e| {
        warn!(track_id = %track_id, error = %e, "Playback failed");
        ApiError::from(e)
    })?;

    Ok(Json(PlayResponse {
        success: true,
        message: format!("Playing on {}", device.name),
    }))
}

/// Build playback routes
pub fn playback_routes() -> Router<AppState> {
    Router::new().route("/play", post(play))
}
