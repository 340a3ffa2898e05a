//! Listener data
//!
//! Favorites, skipped tracks and submitted feedback for the one anonymous
//! listener the service has. Kept in memory only; a restart starts empty.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::{PoisonError, RwLock};
use tracing::debug;

/// Highest accepted feedback rating
pub const MAX_RATING: u8 = 5;

/// One feedback submission
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeedbackEntry {
    /// What is being rated ("track", "emotion", ...)
    #[serde(rename = "type")]
    pub kind: String,
    /// 1 to [`MAX_RATING`]
    pub rating: u8,
    pub comment: Option<String>,
    pub track_id: Option<String>,
    pub submitted_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct ListenerData {
    /// Insertion order, no duplicates
    favorites: Vec<String>,
    /// First-skip order, no duplicates
    skipped: Vec<String>,
    feedback: Vec<FeedbackEntry>,
}

#[derive(Debug, Default)]
pub struct ListenerStore {
    data: RwLock<ListenerData>,
}

impl ListenerStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add the track to favorites, or remove it if already there
    ///
    /// Returns whether the track is a favorite afterwards.
    pub fn toggle_favorite(&self, track_id: &str) -> bool {
        let mut data = self.data.write().unwrap_or_else(PoisonError::into_inner);
        match data.favorites.iter().position(|id| id == track_id) {
            Some(pos) => {
                data.favorites.remove(pos);
                debug!(track_id, "Removed favorite");
                false
            }
            None => {
                data.favorites.push(track_id.to_string());
                debug!(track_id, "Added favorite");
                true
            }
        }
    }

    pub fn favorites(&self) -> Vec<String> {
        self.data
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .favorites
            .clone()
    }

    pub fn record_skip(&self, track_id: &str) {
        let mut data = self.data.write().unwrap_or_else(PoisonError::into_inner);
        if !data.skipped.iter().any(|id| id == track_id) {
            data.skipped.push(track_id.to_string());
        }
    }

    pub fn skipped(&self) -> Vec<String> {
        self.data
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .skipped
            .clone()
    }

    pub fn add_feedback(&self, entry: FeedbackEntry) {
        self.data
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .feedback
            .push(entry);
    }

    pub fn feedback(&self) -> Vec<FeedbackEntry> {
        self.data
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .feedback
            .clone()
    }
}
