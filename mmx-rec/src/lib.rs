//! mmx-rec library interface
//!
//! Perception (noisy per-frame classifications → stable emotion), the
//! recommendation orchestrator, listener data, and the HTTP surface tying
//! them together.

pub mod api;
pub mod catalog;
pub mod error;
pub mod listener;
pub mod perception;
pub mod recommend;

pub use crate::error::{ApiError, ApiResult};

use axum::Router;
use catalog::CatalogClient;
use listener::ListenerStore;
use perception::StableSignalStore;
use recommend::Recommender;
use std::sync::Arc;
use std::time::Instant;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Latest stable emotion, written by the perception loop
    pub store: Arc<StableSignalStore>,
    pub recommender: Arc<Recommender>,
    /// Catalog used for playback (same client the recommender uses)
    pub catalog: Arc<dyn CatalogClient>,
    /// Favorites, skips and feedback of the anonymous listener
    pub listener: Arc<ListenerStore>,
    /// Service startup instant for uptime reporting
    pub startup_time: Instant,
}

impl AppState {
    pub fn new(
        store: Arc<StableSignalStore>,
        recommender: Arc<Recommender>,
        catalog: Arc<dyn CatalogClient>,
    ) -> Self {
        Self {
            store,
            recommender,
            catalog,
            listener: Arc::new(ListenerStore::new()),
            startup_time: Instant::now(),
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(api::health_routes())
        .merge(api::recommend_routes())
        .merge(api::playback_routes())
        .merge(api::listener_routes())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
