//! Recommendation cache
//!
//! Two small TTL keyspaces shared by every request: the playlist container id
//! (one fixed key, long TTL) and the content list per emotion (short TTL).
//! Also tracks which tracks were recently handed out per seed tuple so
//! consecutive batches differ.

use crate::catalog::{ContainerId, ContentItem};
use mmx_common::config::RecommenderConfig;
use mmx_common::Clock;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};
use tracing::debug;

/// Key of the single container entry
pub const CONTAINER_KEY: &str = "current_playlist_id";

/// Content-list key for a normalized emotion label
pub fn content_key(label: &str) -> String {
    format!("tracks_{}", label)
}

#[derive(Debug, Clone)]
struct CacheEntry<V> {
    value: V,
    expires_at: Instant,
}

/// Per-key TTL cache
///
/// Latest write wins. Expired entries are never returned and are removed the
/// next time their key is read. Individual get/set are atomic; races between
/// calls are tolerated.
#[derive(Debug)]
pub struct TtlCache<V> {
    entries: Mutex<HashMap<String, CacheEntry<V>>>,
    clock: Arc<dyn Clock>,
}

impl<V: Clone> TtlCache<V> {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            clock,
        }
    }

    pub fn get(&self, key: &str) -> Option<V> {
        let now = self.clock.now();
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        match entries.get(key) {
            Some(entry) if now < entry.expires_at => Some(entry.value.clone()),
            Some(_) => {
                entries.remove(key);
                None
            }
            None => None,
        }
    }

    pub fn set(&self, key: impl Into<String>, value: V, ttl: Duration) {
        let expires_at = self.clock.now() + ttl;
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.into(), CacheEntry { value, expires_at });
    }

    /// Stored entries, including expired ones not yet purged
    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Recently recommended track ids, per seed-genre key
///
/// Holds at most `key_capacity` keys; adding a new key beyond that drops the
/// key that was first inserted. Each key keeps only its `ids_per_key` most
/// recent ids, so a finite catalog cycles instead of running dry.
#[derive(Debug)]
pub struct RecentTracks {
    key_capacity: usize,
    ids_per_key: usize,
    inner: Mutex<RecentInner>,
}

#[derive(Debug, Default)]
struct RecentInner {
    order: VecDeque<String>,
    ids: HashMap<String, VecDeque<String>>,
}

impl RecentTracks {
    pub fn new(key_capacity: usize, ids_per_key: usize) -> Self {
        Self {
            key_capacity: key_capacity.max(1),
            ids_per_key: ids_per_key.max(1),
            inner: Mutex::new(RecentInner::default()),
        }
    }

    /// Ids recently recommended under `key`
    pub fn get(&self, key: &str) -> HashSet<String> {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .ids
            .get(key)
            .map(|ids| ids.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Add ids to those remembered for `key`, oldest ids falling off first
    pub fn remember(&self, key: &str, ids: impl IntoIterator<Item = String>) {
        let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        if !inner.ids.contains_key(key) {
            if inner.order.len() >= self.key_capacity {
                if let Some(oldest) = inner.order.pop_front() {
                    inner.ids.remove(&oldest);
                    debug!(key = %oldest, "Dropped recent-track key");
                }
            }
            inner.order.push_back(key.to_string());
        }

        let remembered = inner.ids.entry(key.to_string()).or_default();
        for id in ids {
            if let Some(pos) = remembered.iter().position(|existing| *existing == id) {
                remembered.remove(pos);
            }
            remembered.push_back(id);
        }
        while remembered.len() > self.ids_per_key {
            remembered.pop_front();
        }
    }

    /// Drop everything remembered for `key`
    pub fn forget(&self, key: &str) {
        let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        if inner.ids.remove(key).is_some() {
            inner.order.retain(|k| k != key);
        }
    }

    pub fn key_count(&self) -> usize {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .order
            .len()
    }
}

/// Both recommendation keyspaces plus the recent-track memory
#[derive(Debug)]
pub struct RecommendationCache {
    containers: TtlCache<ContainerId>,
    content: TtlCache<Vec<ContentItem>>,
    recent: RecentTracks,
    container_ttl: Duration,
    content_ttl: Duration,
}

impl RecommendationCache {
    pub fn new(
        clock: Arc<dyn Clock>,
        container_ttl: Duration,
        content_ttl: Duration,
        recent_key_capacity: usize,
        recent_ids_per_key: usize,
    ) -> Self {
        Self {
            containers: TtlCache::new(Arc::clone(&clock)),
            content: TtlCache::new(clock),
            recent: RecentTracks::new(recent_key_capacity, recent_ids_per_key),
            container_ttl,
            content_ttl,
        }
    }

    pub fn from_config(config: &RecommenderConfig, clock: Arc<dyn Clock>) -> Self {
        Self::new(
            clock,
            Duration::from_secs(config.container_ttl_secs),
            Duration::from_secs(config.content_ttl_secs),
            config.recent_key_capacity,
            config.recent_ids_per_key,
        )
    }

    pub fn container(&self) -> Option<ContainerId> {
        self.containers.get(CONTAINER_KEY)
    }

    pub fn store_container(&self, id: ContainerId) {
        self.containers.set(CONTAINER_KEY, id, self.container_ttl);
    }

    pub fn content(&self, label: &str) -> Option<Vec<ContentItem>> {
        self.content.get(&content_key(label))
    }

    pub fn store_content(&self, label: &str, items: Vec<ContentItem>) {
        self.content.set(content_key(label), items, self.content_ttl);
    }

    pub fn recent(&self) -> &RecentTracks {
        &self.recent
    }
}
