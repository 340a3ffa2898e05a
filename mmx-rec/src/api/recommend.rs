//! Emotion and recommendation endpoints
//!
//! `GET /emotion` (also served as `/get_emotion` for the browser client) never
//! fails; `GET /recommend` reads the current stable emotion and refreshes the
//! playlist for it.

use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;
use tracing::info;

use crate::catalog::ContentItem;
use crate::error::ApiResult;
use crate::AppState;

/// GET /emotion response
#[derive(Debug, Serialize)]
pub struct EmotionResponse {
    pub emotion: String,
}

/// GET /recommend success response
#[derive(Debug, Serialize)]
pub struct RecommendResponse {
    pub success: bool,
    pub emotion: String,
    pub message: String,
    pub playlist_url: String,
    pub tracks: Vec<ContentItem>,
}

/// GET /emotion, GET /get_emotion
pub async fn get_emotion(State(state): State<AppState>) -> Json<EmotionResponse> {
    Json(EmotionResponse {
        emotion: state.store.stable_signal().to_string(),
    })
}

/// GET /recommend
pub async fn recommend(State(state): State<AppState>) -> ApiResult<Json<RecommendResponse>> {
    let label = state.store.get().label();
    info!(emotion = label, "Recommendation requested");

    let recommendation = state.recommender.recommend(label).await?;
    Ok(Json(RecommendResponse {
        success: true,
        message: format!("Playlist updated with {} tracks!", recommendation.emotion),
        emotion: recommendation.emotion,
        playlist_url: recommendation.container_url,
        tracks: recommendation.items,
    }))
}

/// Build emotion/recommendation routes
pub fn recommend_routes() -> Router<AppState> {
    Router::new()
        .route("/emotion", get(get_emotion))
        .route("/get_emotion", get(get_emotion))
        .route("/recommend", get(recommend))
}
