//! Recommendation side: TTL cache + orchestrator over the catalog client

pub mod cache;
pub mod orchestrator;

pub use cache::{RecentTracks, RecommendationCache, TtlCache};
pub use orchestrator::{Recommendation, RecommendError, Recommender, RecommenderSettings, Stage};
