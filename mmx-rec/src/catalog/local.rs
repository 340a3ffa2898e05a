//! In-memory catalog
//!
//! Serves the [`CatalogClient`] contract from a fixed track list loaded from
//! JSON, so the service runs without network access or credentials.
//!
//! ```json
//! {
//!   "base_url": "https://open.example.com",
//!   "premium": true,
//!   "devices": [{"id": "d1", "name": "Laptop", "is_active": true}],
//!   "tracks": [
//!     {"id": "t1", "name": "Song", "artist": "Band", "external_url": "...",
//!      "genres": ["pop", "dance"], "valence": 0.8, "energy": 0.7}
//!   ]
//! }
//! ```

use super::{CatalogClient, CatalogError, ContainerId, ContentItem, PlaybackDevice};
use async_trait::async_trait;
use mmx_common::{Error, MoodTargets, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::RwLock;
use tracing::{debug, info};

const DEFAULT_BASE_URL: &str = "https://open.spotify.com";

/// Track record as stored in the catalog file
#[derive(Debug, Clone, Deserialize)]
struct CatalogTrack {
    id: String,
    name: String,
    artist: String,
    #[serde(default)]
    album_cover: Option<String>,
    external_url: String,
    #[serde(default)]
    genres: Vec<String>,
    #[serde(default = "mid_scale")]
    valence: f32,
    #[serde(default = "mid_scale")]
    energy: f32,
}

fn mid_scale() -> f32 {
    0.5
}

impl CatalogTrack {
    fn matches_any(&self, tags: &[String]) -> bool {
        self.genres
            .iter()
            .any(|genre| tags.iter().any(|tag| genre.eq_ignore_ascii_case(tag)))
    }

    fn to_item(&self) -> ContentItem {
        ContentItem {
            id: self.id.clone(),
            name: self.name.clone(),
            artist: self.artist.clone(),
            album_cover: self.album_cover.clone(),
            external_url: self.external_url.clone(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct CatalogFile {
    #[serde(default = "default_base_url")]
    base_url: String,
    #[serde(default = "default_premium")]
    premium: bool,
    #[serde(default)]
    devices: Vec<PlaybackDevice>,
    #[serde(default)]
    tracks: Vec<CatalogTrack>,
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_premium() -> bool {
    true
}

#[derive(Debug)]
pub struct LocalCatalog {
    base_url: String,
    premium: bool,
    devices: Vec<PlaybackDevice>,
    tracks: Vec<CatalogTrack>,
    container_name: String,
    /// Container name → id
    containers: RwLock<HashMap<String, ContainerId>>,
    contents: RwLock<HashMap<ContainerId, Vec<ContentItem>>>,
    now_playing: RwLock<Option<String>>,
    next_container: AtomicU64,
}

impl LocalCatalog {
    /// Catalog with no tracks and no devices
    pub fn empty(container_name: impl Into<String>) -> Self {
        Self::from_parts(
            default_base_url(),
            true,
            Vec::new(),
            Vec::new(),
            container_name.into(),
        )
    }

    pub fn from_json(json: &str, container_name: impl Into<String>) -> Result<Self> {
        let file: CatalogFile = serde_json::from_str(json)
            .map_err(|e| Error::InvalidInput(format!("Catalog parse failed: {}", e)))?;
        Ok(Self::from_parts(
            file.base_url,
            file.premium,
            file.devices,
            file.tracks,
            container_name.into(),
        ))
    }

    pub fn from_path(path: &Path, container_name: impl Into<String>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        let catalog = Self::from_json(&json, container_name)?;
        info!(
            path = %path.display(),
            tracks = catalog.tracks.len(),
            devices = catalog.devices.len(),
            "Loaded local catalog"
        );
        Ok(catalog)
    }

    fn from_parts(
        base_url: String,
        premium: bool,
        devices: Vec<PlaybackDevice>,
        tracks: Vec<CatalogTrack>,
        container_name: String,
    ) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            premium,
            devices,
            tracks,
            container_name,
            containers: RwLock::new(HashMap::new()),
            contents: RwLock::new(HashMap::new()),
            now_playing: RwLock::new(None),
            next_container: AtomicU64::new(1),
        }
    }

    pub fn with_premium(mut self, premium: bool) -> Self {
        self.premium = premium;
        self
    }

    pub fn track_count(&self) -> usize {
        self.tracks.len()
    }

    /// Current contents of a container (empty if unknown)
    pub async fn container_items(&self, container: &ContainerId) -> Vec<ContentItem> {
        self.contents
            .read()
            .await
            .get(container)
            .cloned()
            .unwrap_or_default()
    }

    pub async fn now_playing(&self) -> Option<String> {
        self.now_playing.read().await.clone()
    }

    /// Premium check, then the active device, else the first one
    fn playback_device(&self) -> std::result::Result<PlaybackDevice, CatalogError> {
        if !self.premium {
            return Err(CatalogError::PremiumRequired);
        }
        self.devices
            .iter()
            .find(|d| d.is_active)
            .or_else(|| self.devices.first())
            .cloned()
            .ok_or(CatalogError::NoActiveDevice)
    }

    /// Track after `current`: the following playlist entry when `current` is
    /// in the playlist, else the following catalog entry; both wrap around
    async fn next_after(&self, current: &str) -> String {
        let playlist: Vec<String> = {
            let containers = self.containers.read().await;
            let contents = self.contents.read().await;
            containers
                .get(&self.container_name)
                .and_then(|id| contents.get(id))
                .map(|items| items.iter().map(|item| item.id.clone()).collect())
                .unwrap_or_default()
        };
        let order: Vec<String> = if playlist.iter().any(|id| id == current) {
            playlist
        } else {
            self.tracks.iter().map(|t| t.id.clone()).collect()
        };

        match order.iter().position(|id| id == current) {
            Some(pos) => order[(pos + 1) % order.len()].clone(),
            None => current.to_string(),
        }
    }
}

#[async_trait]
impl CatalogClient for LocalCatalog {
    async fn resolve_container(&self) -> std::result::Result<ContainerId, CatalogError> {
        if let Some(id) = self.containers.read().await.get(&self.container_name) {
            return Ok(id.clone());
        }

        let mut containers = self.containers.write().await;
        // Another caller may have created it between the two locks
        if let Some(id) = containers.get(&self.container_name) {
            return Ok(id.clone());
        }

        let id = ContainerId::new(format!(
            "local-playlist-{}",
            self.next_container.fetch_add(1, Ordering::Relaxed)
        ));
        containers.insert(self.container_name.clone(), id.clone());
        self.contents.write().await.insert(id.clone(), Vec::new());
        info!(container = %id, name = %self.container_name, "Created playlist");
        Ok(id)
    }

    async fn fetch_content(
        &self,
        seed_tags: &[String],
        mood: Option<&MoodTargets>,
        limit: usize,
    ) -> std::result::Result<Vec<ContentItem>, CatalogError> {
        if seed_tags.is_empty() {
            return Err(CatalogError::Api(400, "At least one seed genre is required".into()));
        }

        let mut matches: Vec<&CatalogTrack> = self
            .tracks
            .iter()
            .filter(|track| track.matches_any(seed_tags))
            .filter(|track| mood.map_or(true, |m| m.accepts(track.valence, track.energy)))
            .collect();

        if let Some(mood) = mood {
            matches.sort_by(|a, b| {
                mood.distance(a.valence, a.energy)
                    .total_cmp(&mood.distance(b.valence, b.energy))
            });
        }

        let items: Vec<ContentItem> = matches
            .into_iter()
            .take(limit)
            .map(CatalogTrack::to_item)
            .collect();
        debug!(
            tags = ?seed_tags,
            targeted = mood.is_some(),
            found = items.len(),
            "Local catalog fetch"
        );
        Ok(items)
    }

    async fn replace_content(
        &self,
        container: &ContainerId,
        items: &[ContentItem],
    ) -> std::result::Result<(), CatalogError> {
        let mut contents = self.contents.write().await;
        match contents.get_mut(container) {
            Some(current) => {
                *current = items.to_vec();
                Ok(())
            }
            None => Err(CatalogError::NotFound(format!("playlist {}", container))),
        }
    }

    async fn track(&self, track_id: &str) -> std::result::Result<ContentItem, CatalogError> {
        self.tracks
            .iter()
            .find(|t| t.id == track_id)
            .map(CatalogTrack::to_item)
            .ok_or_else(|| CatalogError::NotFound(format!("track {}", track_id)))
    }

    async fn start_playback(
        &self,
        track_id: &str,
    ) -> std::result::Result<PlaybackDevice, CatalogError> {
        let device = self.playback_device()?;
        if !self.tracks.iter().any(|t| t.id == track_id) {
            return Err(CatalogError::NotFound(format!("track {}", track_id)));
        }

        *self.now_playing.write().await = Some(track_id.to_string());
        info!(track_id, device = %device.name, "Started playback");
        Ok(device)
    }

    async fn next_track(&self) -> std::result::Result<PlaybackDevice, CatalogError> {
        let device = self.playback_device()?;
        let mut now_playing = self.now_playing.write().await;
        let current = now_playing
            .as_deref()
            .ok_or_else(|| CatalogError::Api(404, "Nothing is playing".into()))?;

        let next = self.next_after(current).await;
        info!(
            from = current,
            to = %next,
            device = %device.name,
            "Skipped to next track"
        );
        *now_playing = Some(next);
        Ok(device)
    }

    fn container_url(&self, container: &ContainerId) -> String {
        format!("{}/playlist/{}", self.base_url, container)
    }
}
