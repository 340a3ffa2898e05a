//! Content catalog client
//!
//! The recommender talks to the external music catalog only through
//! [`CatalogClient`]: resolve the playlist container, fetch candidate tracks,
//! replace the container's contents, look up single tracks, and control
//! playback. [`LocalCatalog`]
//! serves the same contract from an in-memory track list.

pub mod local;

pub use local::LocalCatalog;

use async_trait::async_trait;
use mmx_common::MoodTargets;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Catalog client errors
#[derive(Debug, Clone, Error, PartialEq)]
pub enum CatalogError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("No active playback device found")]
    NoActiveDevice,

    #[error("Premium account required for playback")]
    PremiumRequired,

    #[error("API error {0}: {1}")]
    Api(u16, String),
}

/// Opaque identifier of the playlist the recommender fills
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContainerId(pub String);

impl ContainerId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContainerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One recommendable track
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentItem {
    pub id: String,
    pub name: String,
    pub artist: String,
    /// Cover art URL, absent when the catalog has none
    pub album_cover: Option<String>,
    pub external_url: String,
}

/// Device playback was started on
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaybackDevice {
    pub id: String,
    pub name: String,
    pub is_active: bool,
}

#[async_trait]
pub trait CatalogClient: Send + Sync {
    /// Find the recommendation playlist, creating it if needed
    async fn resolve_container(&self) -> Result<ContainerId, CatalogError>;

    /// Fetch up to `limit` tracks tagged with any of `seed_tags`
    ///
    /// With `mood`, tracks outside the mood bounds are dropped and the rest
    /// are ordered closest-to-target first.
    async fn fetch_content(
        &self,
        seed_tags: &[String],
        mood: Option<&MoodTargets>,
        limit: usize,
    ) -> Result<Vec<ContentItem>, CatalogError>;

    /// Replace everything in the container with `items`, in order
    async fn replace_content(
        &self,
        container: &ContainerId,
        items: &[ContentItem],
    ) -> Result<(), CatalogError>;

    /// Look up one track by id
    async fn track(&self, track_id: &str) -> Result<ContentItem, CatalogError>;

    /// Start playing one track on the active (or first available) device
    async fn start_playback(&self, track_id: &str) -> Result<PlaybackDevice, CatalogError>;

    /// Advance playback to the next track
    async fn next_track(&self) -> Result<PlaybackDevice, CatalogError>;

    /// Public URL of the container
    fn container_url(&self, container: &ContainerId) -> String;
}
