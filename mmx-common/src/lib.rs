//! # MoodMix Common Library
//!
//! Shared code for the MoodMix services including:
//! - Emotion labels and raw classifier observations
//! - Emotion profiles (genre tags and mood targets per emotion)
//! - Configuration loading
//! - Clock abstraction used by time-gated components

pub mod config;
pub mod emotion;
pub mod error;
pub mod profile;
pub mod time;

pub use emotion::{Emotion, ObservedLabel, RawObservation};
pub use error::{Error, Result};
pub use profile::{EmotionProfile, MoodTargets, ProfileTable};
pub use time::{Clock, ManualClock, SystemClock};
