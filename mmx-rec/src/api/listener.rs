//! Listener endpoints: favorites, skips, feedback, and track details
//!
//! All of them act on the single anonymous listener held in
//! [`crate::listener::ListenerStore`].

use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::catalog::ContentItem;
use crate::error::{ApiError, ApiResult};
use crate::listener::{FeedbackEntry, MAX_RATING};
use crate::AppState;

/// Body of POST /favorite and POST /skip
#[derive(Debug, Deserialize)]
pub struct TrackRequest {
    #[serde(default)]
    pub track_id: Option<String>,
}

impl TrackRequest {
    fn track_id(body: Option<Json<TrackRequest>>) -> ApiResult<String> {
        body.and_then(|Json(request)| request.track_id)
            .map(|id| id.trim().to_string())
            .filter(|id| !id.is_empty())
            .ok_or_else(|| ApiError::BadRequest("No track ID provided".to_string()))
    }
}

/// Plain `{success, message}` reply
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub success: bool,
    pub message: String,
}

impl MessageResponse {
    fn ok(message: impl Into<String>) -> Json<Self> {
        Json(Self {
            success: true,
            message: message.into(),
        })
    }
}

/// POST /favorite response
#[derive(Debug, Serialize)]
pub struct FavoriteResponse {
    pub success: bool,
    pub is_favorite: bool,
    pub message: String,
}

/// POST /feedback request body
#[derive(Debug, Deserialize)]
pub struct FeedbackRequest {
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    #[serde(default)]
    pub rating: Option<u8>,
    #[serde(default)]
    pub comment: Option<String>,
    #[serde(default)]
    pub track_id: Option<String>,
}

/// POST /get_tracks_info request body
#[derive(Debug, Deserialize)]
pub struct TracksInfoRequest {
    #[serde(default)]
    pub track_ids: Option<Vec<String>>,
}

/// POST /get_tracks_info response
#[derive(Debug, Serialize)]
pub struct TracksInfoResponse {
    pub success: bool,
    pub tracks: Vec<ContentItem>,
}

/// GET /get_user_data response
#[derive(Debug, Serialize)]
pub struct UserDataResponse {
    pub success: bool,
    pub favorites: Vec<String>,
    pub skipped_tracks: Vec<String>,
}

/// POST /favorite
pub async fn toggle_favorite(
    State(state): State<AppState>,
    body: Option<Json<TrackRequest>>,
) -> ApiResult<Json<FavoriteResponse>> {
    let track_id = TrackRequest::track_id(body)?;
    let is_favorite = state.listener.toggle_favorite(&track_id);
    info!(track_id = %track_id, is_favorite, "Favorite toggled");

    let message = if is_favorite {
        "Track added to favorites"
    } else {
        "Track removed from favorites"
    };
    Ok(Json(FavoriteResponse {
        success: true,
        is_favorite,
        message: message.to_string(),
    }))
}

/// POST /skip
///
/// The skip is remembered even when the player cannot advance.
pub async fn skip_track(
    State(state): State<AppState>,
    body: Option<Json<TrackRequest>>,
) -> ApiResult<Json<MessageResponse>> {
    let track_id = TrackRequest::track_id(body)?;
    state.listener.record_skip(&track_id);

    match state.catalog.next_track().await {
        Ok(device) => {
            info!(track_id = %track_id, device = %device.name, "Track skipped");
            Ok(MessageResponse::ok("Track skipped successfully"))
        }
        Err(e) => {
            warn!(track_id = %track_id, error = %e, "Skip failed");
            Err(ApiError::BadRequest(
                "Error skipping track. Please ensure your player is active.".to_string(),
            ))
        }
    }
}

/// POST /feedback
pub async fn submit_feedback(
    State(state): State<AppState>,
    body: Option<Json<FeedbackRequest>>,
) -> ApiResult<Json<MessageResponse>> {
    let Some(Json(request)) = body else {
        return Err(ApiError::BadRequest("No feedback data provided".to_string()));
    };

    let kind = request
        .kind
        .map(|k| k.trim().to_string())
        .filter(|k| !k.is_empty());
    let rating = request.rating.filter(|r| (1..=MAX_RATING).contains(r));
    let (Some(kind), Some(rating)) = (kind, rating) else {
        return Err(ApiError::BadRequest(
            "Missing required feedback information".to_string(),
        ));
    };

    info!(
        kind = %kind,
        rating,
        track_id = ?request.track_id,
        "Feedback received"
    );
    state.listener.add_feedback(FeedbackEntry {
        kind,
        rating,
        comment: request.comment,
        track_id: request.track_id,
        submitted_at: Utc::now(),
    });
    Ok(MessageResponse::ok("Feedback submitted successfully"))
}

/// POST /get_tracks_info
///
/// Unknown or failing ids are logged and left out of the reply.
pub async fn tracks_info(
    State(state): State<AppState>,
    body: Option<Json<TracksInfoRequest>>,
) -> ApiResult<Json<TracksInfoResponse>> {
    let track_ids = body
        .and_then(|Json(request)| request.track_ids)
        .ok_or_else(|| ApiError::BadRequest("No track IDs provided".to_string()))?;

    let mut tracks = Vec::with_capacity(track_ids.len());
    for track_id in &track_ids {
        match state.catalog.track(track_id).await {
            Ok(track) => tracks.push(track),
            Err(e) => warn!(track_id = %track_id, error = %e, "Track lookup failed"),
        }
    }

    Ok(Json(TracksInfoResponse {
        success: true,
        tracks,
    }))
}

/// GET /get_user_data
pub async fn user_data(State(state): State<AppState>) -> Json<UserDataResponse> {
    Json(UserDataResponse {
        success: true,
        favorites: state.listener.favorites(),
        skipped_tracks: state.listener.skipped(),
    })
}

/// Build listener routes
pub fn listener_routes() -> Router<AppState> {
    Router::new()
        .route("/favorite", post(toggle_favorite))
        .route("/skip", post(skip_track))
        .route("/feedback", post(submit_feedback))
        .route("/get_tracks_info", post(tracks_info))
        .route("/get_user_data", get(user_data))
}
