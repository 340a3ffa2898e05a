//! Shared test fixtures: a scriptable catalog and recommender builders
#![allow(dead_code)]

use async_trait::async_trait;
use mmx_common::{ManualClock, MoodTargets, ProfileTable};
use mmx_rec::catalog::{CatalogClient, CatalogError, ContainerId, ContentItem, PlaybackDevice};
use mmx_rec::recommend::{RecommendationCache, Recommender, RecommenderSettings};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub fn item(id: &str, artist: &str) -> ContentItem {
    ContentItem {
        id: id.to_string(),
        name: format!("Track {}", id),
        artist: artist.to_string(),
        album_cover: None,
        external_url: format!("https://example.com/track/{}", id),
    }
}

/// `count` items with distinct ids and artists, ids prefixed by `prefix`
pub fn distinct_items(prefix: &str, count: usize) -> Vec<ContentItem> {
    (0..count)
        .map(|i| item(&format!("{}{}", prefix, i), &format!("{} artist {}", prefix, i)))
        .collect()
}

/// Catalog whose answers are set up front and whose calls are recorded
///
/// Calls are logged as `container`, `targeted:<tags>`, `genre:<tag>`,
/// `replace:<n>`, `track:<id>`, `play:<id>`, `next`. Track lookups search the
/// targeted and genre answers; `next` answers like `play`.
pub struct ScriptedCatalog {
    pub calls: Mutex<Vec<String>>,
    pub container: Result<ContainerId, CatalogError>,
    pub targeted: Result<Vec<ContentItem>, CatalogError>,
    pub genres: HashMap<String, Vec<ContentItem>>,
    pub genre_error: Option<CatalogError>,
    pub replace_error: Option<CatalogError>,
    pub playback: Result<PlaybackDevice, CatalogError>,
    pub replaced: Mutex<Vec<Vec<ContentItem>>>,
}

impl Default for ScriptedCatalog {
    fn default() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            container: Ok(ContainerId::new("playlist-1")),
            targeted: Ok(Vec::new()),
            genres: HashMap::new(),
            genre_error: None,
            replace_error: None,
            playback: Err(CatalogError::NoActiveDevice),
            replaced: Mutex::new(Vec::new()),
        }
    }
}

impl ScriptedCatalog {
    pub fn with_targeted(mut self, items: Vec<ContentItem>) -> Self {
        self.targeted = Ok(items);
        self
    }

    pub fn with_genre(mut self, genre: &str, items: Vec<ContentItem>) -> Self {
        self.genres.insert(genre.to_string(), items);
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn fetch_calls(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| c.starts_with("targeted:") || c.starts_with("genre:"))
            .count()
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl CatalogClient for ScriptedCatalog {
    async fn resolve_container(&self) -> Result<ContainerId, CatalogError> {
        self.record("container".to_string());
        self.container.clone()
    }

    async fn fetch_content(
        &self,
        seed_tags: &[String],
        mood: Option<&MoodTargets>,
        limit: usize,
    ) -> Result<Vec<ContentItem>, CatalogError> {
        if mood.is_some() {
            self.record(format!("targeted:{}", seed_tags.join(",")));
            return self
                .targeted
                .clone()
                .map(|items| items.into_iter().take(limit).collect());
        }

        self.record(format!("genre:{}", seed_tags.join(",")));
        if let Some(err) = &self.genre_error {
            return Err(err.clone());
        }
        Ok(seed_tags
            .iter()
            .flat_map(|tag| self.genres.get(tag).cloned().unwrap_or_default())
            .take(limit)
            .collect())
    }

    async fn replace_content(
        &self,
        _container: &ContainerId,
        items: &[ContentItem],
    ) -> Result<(), CatalogError> {
        self.record(format!("replace:{}", items.len()));
        if let Some(err) = &self.replace_error {
            return Err(err.clone());
        }
        self.replaced.lock().unwrap().push(items.to_vec());
        Ok(())
    }

    async fn track(&self, track_id: &str) -> Result<ContentItem, CatalogError> {
        self.record(format!("track:{}", track_id));
        let targeted: &[ContentItem] = match &self.targeted {
            Ok(items) => items,
            Err(_) => &[],
        };
        targeted
            .iter()
            .chain(self.genres.values().flatten())
            .find(|item| item.id == track_id)
            .cloned()
            .ok_or_else(|| CatalogError::NotFound(format!("track {}", track_id)))
    }

    async fn start_playback(&self, track_id: &str) -> Result<PlaybackDevice, CatalogError> {
        self.record(format!("play:{}", track_id));
        self.playback.clone()
    }

    async fn next_track(&self) -> Result<PlaybackDevice, CatalogError> {
        self.record("next".to_string());
        self.playback.clone()
    }

    fn container_url(&self, container: &ContainerId) -> String {
        format!("https://open.example.com/playlist/{}", container)
    }
}

pub struct Harness {
    pub catalog: Arc<ScriptedCatalog>,
    pub clock: ManualClock,
    pub recommender: Recommender,
}

pub fn harness(catalog: ScriptedCatalog) -> Harness {
    let catalog = Arc::new(catalog);
    let clock = ManualClock::new();
    let cache = Arc::new(RecommendationCache::new(
        Arc::new(clock.clone()),
        Duration::from_secs(3600),
        Duration::from_secs(30),
        7,
        30,
    ));
    let recommender = Recommender::new(
        catalog.clone(),
        cache,
        Arc::new(ProfileTable::builtin()),
        RecommenderSettings::default(),
    );
    Harness {
        catalog,
        clock,
        recommender,
    }
}
