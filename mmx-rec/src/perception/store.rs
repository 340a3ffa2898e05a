//! Stable-signal store
//!
//! Single-slot cell holding the latest published stable emotion. Written by the
//! perception loop, read by any number of request handlers.
//!
//! Uses a std RwLock: the critical sections are a single copy, readers never
//! block each other, and no guard is ever held across an await.

use mmx_common::Emotion;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{PoisonError, RwLock};

/// Label reported before the first processed frame
pub const WAITING_LABEL: &str = "Waiting...";

/// Value held by the store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StableSignal {
    /// Perception loop has not processed a frame yet
    Waiting,
    Emotion(Emotion),
}

impl StableSignal {
    /// Raw label, as handed to the recommender ("Waiting..." before warm-up)
    pub fn label(&self) -> &'static str {
        match self {
            StableSignal::Waiting => WAITING_LABEL,
            StableSignal::Emotion(emotion) => emotion.as_str(),
        }
    }

    /// Label exposed to readers; never anything but an emotion
    pub fn public_label(&self) -> &'static str {
        match self {
            StableSignal::Waiting => Emotion::Neutral.as_str(),
            StableSignal::Emotion(emotion) => emotion.as_str(),
        }
    }
}

pub struct StableSignalStore {
    current: RwLock<StableSignal>,
    updates: AtomicU64,
}

impl StableSignalStore {
    pub fn new() -> Self {
        Self {
            current: RwLock::new(StableSignal::Waiting),
            updates: AtomicU64::new(0),
        }
    }

    /// Latest published value
    pub fn get(&self) -> StableSignal {
        *self.current.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Publish a new stable emotion; always wins immediately
    pub fn set(&self, emotion: Emotion) {
        *self.current.write().unwrap_or_else(PoisonError::into_inner) =
            StableSignal::Emotion(emotion);
        self.updates.fetch_add(1, Ordering::Relaxed);
    }

    /// Reader-facing label ("neutral" until warmed up)
    pub fn stable_signal(&self) -> &'static str {
        self.get().public_label()
    }

    /// Number of `set` calls since startup
    pub fn update_count(&self) -> u64 {
        self.updates.load(Ordering::Relaxed)
    }
}

impl Default for StableSignalStore {
    fn default() -> Self {
        Self::new()
    }
}
