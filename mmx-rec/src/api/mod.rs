//! HTTP API handlers for mmx-rec

pub mod health;
pub mod listener;
pub mod playback;
pub mod recommend;

pub use health::health_routes;
pub use listener::listener_routes;
pub use playback::playback_routes;
pub use recommend::recommend_routes;
