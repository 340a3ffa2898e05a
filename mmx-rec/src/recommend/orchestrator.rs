//! Recommendation orchestrator
//!
//! Maps a stable emotion label to a refreshed playlist:
//!
//! 1. Reject labels that mean "no face" without touching the catalog
//! 2. Resolve the emotion profile (unknown labels use the neutral profile)
//! 3. Container id from cache, else from the catalog
//! 4. Content list from cache, else fetched with the fallback chain:
//!    targeted (seed genres + mood) → per-genre search → default genre
//! 5. Replace the playlist contents and cache the list
//!
//! Catalog failures inside the fetch chain are logged and the chain moves on;
//! a failure only surfaces when nothing at all could be fetched.

use super::cache::RecommendationCache;
use crate::catalog::{CatalogClient, CatalogError, ContainerId, ContentItem};
use mmx_common::config::RecommenderConfig;
use mmx_common::{EmotionProfile, ProfileTable};
use rand::seq::SliceRandom;
use serde::Serialize;
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, error, info, warn};

/// Labels the perception side reports when no face is usable
const FACE_NOT_VISIBLE_LABELS: [&str; 2] = ["waiting...", "no face detected"];

/// Catalog interaction a failure happened in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    ResolveContainer,
    TargetedFetch,
    GenreFetch,
    DefaultGenreFetch,
    ReplaceContent,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::ResolveContainer => "resolve_container",
            Stage::TargetedFetch => "targeted_fetch",
            Stage::GenreFetch => "genre_fetch",
            Stage::DefaultGenreFetch => "default_genre_fetch",
            Stage::ReplaceContent => "replace_content",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Recommendation failures
#[derive(Debug, Error)]
pub enum RecommendError {
    #[error("Please ensure your face is visible to the camera.")]
    FaceNotVisible,

    #[error("Could not find suitable tracks for emotion: {emotion}")]
    NoSuitableContent { emotion: String },

    #[error("Failed to retrieve or create playlist: {source}")]
    ContainerUnavailable { source: CatalogError },

    #[error("Catalog {stage} failed for emotion {emotion}: {source}")]
    Catalog {
        stage: Stage,
        emotion: String,
        source: CatalogError,
    },
}

impl RecommendError {
    /// HTTP-style status for the failure
    pub fn status(&self) -> u16 {
        match self {
            RecommendError::FaceNotVisible => 400,
            RecommendError::NoSuitableContent { .. } => 404,
            RecommendError::ContainerUnavailable { .. } | RecommendError::Catalog { .. } => 500,
        }
    }
}

/// Successful recommendation
#[derive(Debug, Clone, Serialize)]
pub struct Recommendation {
    /// Normalized label the profile was resolved with
    pub emotion: String,
    pub container: ContainerId,
    pub container_url: String,
    pub items: Vec<ContentItem>,
    /// True when the list came from the content cache
    pub from_cache: bool,
}

/// Fetch limits and fallbacks
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecommenderSettings {
    /// Items per recommendation
    pub track_limit: usize,
    /// Candidates requested per catalog fetch
    pub candidate_pool: usize,
    /// Seed genres sent with the targeted fetch
    pub max_seed_genres: usize,
    /// Genre searched when every other fetch came back empty
    pub default_genre: String,
}

impl From<&RecommenderConfig> for RecommenderSettings {
    fn from(config: &RecommenderConfig) -> Self {
        Self {
            track_limit: config.track_limit,
            candidate_pool: config.candidate_pool,
            max_seed_genres: config.max_seed_genres,
            default_genre: config.default_genre.clone(),
        }
    }
}

impl Default for RecommenderSettings {
    fn default() -> Self {
        Self::from(&RecommenderConfig::default())
    }
}

/// Batch under construction: one item per artist, no repeats, nothing
/// recently recommended under the same seed key
struct Batch {
    limit: usize,
    items: Vec<ContentItem>,
    artists: HashSet<String>,
    ids: HashSet<String>,
    excluded: HashSet<String>,
    /// Candidates turned away only because they were recently recommended
    skipped_recent: usize,
}

impl Batch {
    fn new(limit: usize, excluded: HashSet<String>) -> Self {
        Self {
            limit,
            items: Vec::new(),
            artists: HashSet::new(),
            ids: HashSet::new(),
            excluded,
            skipped_recent: 0,
        }
    }

    fn is_full(&self) -> bool {
        self.items.len() >= self.limit
    }

    fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    fn extend(&mut self, candidates: Vec<ContentItem>) -> usize {
        let before = self.items.len();
        for item in candidates {
            if self.is_full() {
                break;
            }
            if self.ids.contains(&item.id) || self.artists.contains(&item.artist) {
                continue;
            }
            if self.excluded.contains(&item.id) {
                self.skipped_recent += 1;
                continue;
            }
            self.artists.insert(item.artist.clone());
            self.ids.insert(item.id.clone());
            self.items.push(item);
        }
        self.items.len() - before
    }
}

/// Outcome of the fetch chain before it is turned into a result
struct FetchOutcome {
    items: Vec<ContentItem>,
    any_success: bool,
    last_failure: Option<(Stage, CatalogError)>,
}

/// Progress of one pass through the fetch chain
struct ChainState {
    batch: Batch,
    any_success: bool,
    last_failure: Option<(Stage, CatalogError)>,
}

impl ChainState {
    fn new(limit: usize, excluded: HashSet<String>) -> Self {
        Self {
            batch: Batch::new(limit, excluded),
            any_success: false,
            last_failure: None,
        }
    }
}

pub struct Recommender {
    catalog: Arc<dyn CatalogClient>,
    cache: Arc<RecommendationCache>,
    profiles: Arc<ProfileTable>,
    settings: RecommenderSettings,
}

impl Recommender {
    pub fn new(
        catalog: Arc<dyn CatalogClient>,
        cache: Arc<RecommendationCache>,
        profiles: Arc<ProfileTable>,
        settings: RecommenderSettings,
    ) -> Self {
        Self {
            catalog,
            cache,
            profiles,
            settings,
        }
    }

    pub fn settings(&self) -> &RecommenderSettings {
        &self.settings
    }

    pub fn cache(&self) -> &RecommendationCache {
        &self.cache
    }

    /// Refresh the playlist for a stable emotion label
    pub async fn recommend(&self, label: &str) -> Result<Recommendation, RecommendError> {
        let normalized = label.trim().to_lowercase();
        if FACE_NOT_VISIBLE_LABELS.contains(&normalized.as_str()) {
            debug!(label = %normalized, "No usable face, skipping recommendation");
            return Err(RecommendError::FaceNotVisible);
        }

        let (emotion, profile) = self.profiles.resolve(&normalized);
        let container = self.container(emotion).await?;
        let container_url = self.catalog.container_url(&container);

        if let Some(items) = self.cache.content(emotion) {
            debug!(emotion, tracks = items.len(), "Content cache hit");
            return Ok(Recommendation {
                emotion: emotion.to_string(),
                container,
                container_url,
                items,
                from_cache: true,
            });
        }
        debug!(emotion, "Content cache miss");

        let outcome = self.fetch_batch(emotion, profile).await;
        if outcome.items.is_empty() {
            return Err(match outcome.last_failure {
                Some((stage, source)) if !outcome.any_success => RecommendError::Catalog {
                    stage,
                    emotion: emotion.to_string(),
                    source,
                },
                _ => {
                    warn!(emotion, "No tracks found for emotion");
                    RecommendError::NoSuitableContent {
                        emotion: emotion.to_string(),
                    }
                }
            });
        }

        let items = outcome.items;
        if let Err(source) = self.catalog.replace_content(&container, &items).await {
            error!(
                stage = %Stage::ReplaceContent,
                emotion,
                container = %container,
                error = %source,
                "Catalog call failed"
            );
            return Err(RecommendError::Catalog {
                stage: Stage::ReplaceContent,
                emotion: emotion.to_string(),
                source,
            });
        }

        self.cache.store_content(emotion, items.clone());
        info!(
            emotion,
            container = %container,
            tracks = items.len(),
            "Updated playlist"
        );

        Ok(Recommendation {
            emotion: emotion.to_string(),
            container,
            container_url,
            items,
            from_cache: false,
        })
    }

    async fn container(&self, emotion: &str) -> Result<ContainerId, RecommendError> {
        if let Some(id) = self.cache.container() {
            debug!(container = %id, "Container cache hit");
            return Ok(id);
        }

        match self.catalog.resolve_container().await {
            Ok(id) => {
                debug!(container = %id, "Resolved container");
                self.cache.store_container(id.clone());
                Ok(id)
            }
            Err(source) => {
                error!(
                    stage = %Stage::ResolveContainer,
                    emotion,
                    error = %source,
                    "Catalog call failed"
                );
                Err(RecommendError::ContainerUnavailable { source })
            }
        }
    }

    async fn fetch_batch(&self, emotion: &str, profile: &EmotionProfile) -> FetchOutcome {
        let seed_key = profile.seed_key();
        let recent = self.cache.recent();
        let mut chain = self.run_chain(emotion, profile, recent.get(&seed_key)).await;

        if chain.batch.is_empty() && chain.batch.skipped_recent > 0 {
            // Every usable candidate was handed out recently: start the key over
            info!(
                emotion,
                seed_key = %seed_key,
                skipped = chain.batch.skipped_recent,
                "Recent tracks exhausted, starting over"
            );
            recent.forget(&seed_key);
            chain = self.run_chain(emotion, profile, HashSet::new()).await;
        }

        let ids = chain.batch.items.iter().map(|item| item.id.clone());
        recent.remember(&seed_key, ids);

        let mut items = chain.batch.items;
        shuffle(&mut items);
        FetchOutcome {
            items,
            any_success: chain.any_success,
            last_failure: chain.last_failure,
        }
    }

    /// Targeted fetch, then per-genre fetches, then the default genre
    async fn run_chain(
        &self,
        emotion: &str,
        profile: &EmotionProfile,
        excluded: HashSet<String>,
    ) -> ChainState {
        let pool = self.settings.candidate_pool;
        let mut chain = ChainState::new(self.settings.track_limit, excluded);

        let seeds: Vec<String> = profile
            .seed_genres
            .iter()
            .take(self.settings.max_seed_genres)
            .cloned()
            .collect();
        if !seeds.is_empty() {
            let result = self
                .catalog
                .fetch_content(&seeds, Some(&profile.mood), pool)
                .await;
            absorb(emotion, Stage::TargetedFetch, result, &mut chain);
        }

        for genre in &profile.genres {
            if chain.batch.is_full() {
                break;
            }
            let result = self
                .catalog
                .fetch_content(std::slice::from_ref(genre), None, pool)
                .await;
            absorb(emotion, Stage::GenreFetch, result, &mut chain);
        }

        if chain.batch.is_empty() {
            warn!(
                emotion,
                default_genre = %self.settings.default_genre,
                "No tracks from profile genres, trying default genre"
            );
            let default_genre = [self.settings.default_genre.clone()];
            let result = self
                .catalog
                .fetch_content(&default_genre, None, pool)
                .await;
            absorb(emotion, Stage::DefaultGenreFetch, result, &mut chain);
        }

        chain
    }
}

fn absorb(
    emotion: &str,
    stage: Stage,
    result: Result<Vec<ContentItem>, CatalogError>,
    chain: &mut ChainState,
) {
    match result {
        Ok(candidates) => {
            chain.any_success = true;
            let offered = candidates.len();
            let accepted = chain.batch.extend(candidates);
            debug!(emotion, stage = %stage, offered, accepted, "Catalog fetch");
        }
        Err(source) => {
            error!(emotion, stage = %stage, error = %source, "Catalog call failed");
            chain.last_failure = Some((stage, source));
        }
    }
}

fn shuffle(items: &mut [ContentItem]) {
    items.shuffle(&mut rand::thread_rng());
}
