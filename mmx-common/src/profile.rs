//! Emotion profiles
//!
//! Static per-emotion configuration driving content fetches: seed genres for
//! targeted recommendations, broader genre tags for fallback searches, and the
//! valence/energy targets a track should land near.
//!
//! The table is built once at startup (built-in defaults plus optional TOML
//! overrides) and never mutated afterwards.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::warn;

/// Label every unknown emotion falls back to
pub const FALLBACK_PROFILE: &str = "neutral";

/// Valence/energy targets and bounds for a content fetch
///
/// All values are on the catalog's 0.0-1.0 scale. Missing bounds mean the full
/// range is acceptable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MoodTargets {
    #[serde(default = "default_target")]
    pub target_valence: f32,
    #[serde(default = "default_target")]
    pub target_energy: f32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_valence: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_valence: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_energy: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_energy: Option<f32>,
}

fn default_target() -> f32 {
    0.5
}

impl Default for MoodTargets {
    fn default() -> Self {
        Self {
            target_valence: default_target(),
            target_energy: default_target(),
            min_valence: None,
            max_valence: None,
            min_energy: None,
            max_energy: None,
        }
    }
}

impl MoodTargets {
    /// Effective (min, max) valence range
    pub fn valence_range(&self) -> (f32, f32) {
        (
            self.min_valence.unwrap_or(0.0),
            self.max_valence.unwrap_or(1.0),
        )
    }

    /// Effective (min, max) energy range
    pub fn energy_range(&self) -> (f32, f32) {
        (self.min_energy.unwrap_or(0.0), self.max_energy.unwrap_or(1.0))
    }

    /// True if a track with these features falls inside every bound
    pub fn accepts(&self, valence: f32, energy: f32) -> bool {
        let (min_v, max_v) = self.valence_range();
        let (min_e, max_e) = self.energy_range();
        (min_v..=max_v).contains(&valence) && (min_e..=max_e).contains(&energy)
    }

    /// Euclidean distance from the targets, used to rank candidates
    pub fn distance(&self, valence: f32, energy: f32) -> f32 {
        let dv = valence - self.target_valence;
        let de = energy - self.target_energy;
        (dv * dv + de * de).sqrt()
    }
}

/// Content-fetch configuration for one emotion
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmotionProfile {
    /// Broad genre tags searched one by one when targeted fetches come up short
    pub genres: Vec<String>,
    /// Seed genres for the targeted recommendation fetch
    pub seed_genres: Vec<String>,
    #[serde(flatten)]
    pub mood: MoodTargets,
}

impl EmotionProfile {
    fn new(genres: &[&str], seed_genres: &[&str], mood: MoodTargets) -> Self {
        Self {
            genres: genres.iter().map(|g| g.to_string()).collect(),
            seed_genres: seed_genres.iter().map(|g| g.to_string()).collect(),
            mood,
        }
    }

    /// Key identifying this profile's seed tuple ("pop_dance_disco")
    pub fn seed_key(&self) -> String {
        self.seed_genres.join("_")
    }
}

/// Immutable map from normalized emotion label to profile
#[derive(Debug, Clone)]
pub struct ProfileTable {
    profiles: HashMap<String, EmotionProfile>,
}

impl ProfileTable {
    /// Built-in profiles for every classifier emotion
    pub fn builtin() -> Self {
        let mut profiles = HashMap::new();

        profiles.insert(
            "happy".to_string(),
            EmotionProfile::new(
                &["pop", "dance pop", "happy", "funk"],
                &["pop", "dance", "disco"],
                MoodTargets {
                    target_valence: 0.8,
                    target_energy: 0.8,
                    min_valence: Some(0.6),
                    ..MoodTargets::default()
                },
            ),
        );
        profiles.insert(
            "sad".to_string(),
            EmotionProfile::new(
                &["indie", "acoustic", "piano", "sad"],
                &["acoustic", "piano", "indie"],
                MoodTargets {
                    target_valence: 0.3,
                    target_energy: 0.4,
                    max_valence: Some(0.4),
                    ..MoodTargets::default()
                },
            ),
        );
        profiles.insert(
            "angry".to_string(),
            EmotionProfile::new(
                &["rock", "metal", "punk", "hard-rock"],
                &["rock", "metal"],
                MoodTargets {
                    target_valence: 0.4,
                    target_energy: 0.9,
                    min_energy: Some(0.7),
                    ..MoodTargets::default()
                },
            ),
        );
        profiles.insert(
            "disgust".to_string(),
            EmotionProfile::new(
                &["metal", "industrial", "hardcore"],
                &["metal", "industrial"],
                MoodTargets {
                    target_valence: 0.3,
                    target_energy: 0.9,
                    min_energy: Some(0.7),
                    ..MoodTargets::default()
                },
            ),
        );
        profiles.insert(
            "fear".to_string(),
            EmotionProfile::new(
                &["electronic", "ambient", "dark"],
                &["ambient", "electronic"],
                MoodTargets {
                    target_valence: 0.3,
                    target_energy: 0.5,
                    max_valence: Some(0.5),
                    ..MoodTargets::default()
                },
            ),
        );
        profiles.insert(
            "surprise".to_string(),
            EmotionProfile::new(
                &["jazz", "funk", "electronic"],
                &["jazz", "funk"],
                MoodTargets {
                    target_valence: 0.6,
                    target_energy: 0.7,
                    min_energy: Some(0.5),
                    ..MoodTargets::default()
                },
            ),
        );
        profiles.insert(
            FALLBACK_PROFILE.to_string(),
            EmotionProfile::new(
                &["chill", "ambient", "lofi", "study"],
                &["chill", "study music"],
                MoodTargets {
                    target_valence: 0.5,
                    target_energy: 0.5,
                    min_valence: Some(0.3),
                    max_valence: Some(0.7),
                    ..MoodTargets::default()
                },
            ),
        );

        Self { profiles }
    }

    /// Replace or add profiles from configuration
    ///
    /// Keys are normalized to lowercase. The fallback profile can be replaced
    /// but never removed.
    pub fn with_overrides(mut self, overrides: HashMap<String, EmotionProfile>) -> Self {
        for (label, profile) in overrides {
            self.profiles.insert(label.trim().to_lowercase(), profile);
        }
        self
    }

    /// Profile for an exact normalized label
    pub fn get(&self, label: &str) -> Option<&EmotionProfile> {
        self.profiles.get(label)
    }

    pub fn contains(&self, label: &str) -> bool {
        self.profiles.contains_key(label)
    }

    /// Resolve a normalized label, substituting the fallback profile for
    /// unknown labels
    ///
    /// Returns the key actually used together with its profile.
    pub fn resolve<'a>(&'a self, label: &'a str) -> (&'a str, &'a EmotionProfile) {
        if let Some(profile) = self.profiles.get(label) {
            return (label, profile);
        }

        warn!(
            emotion = %label,
            fallback = FALLBACK_PROFILE,
            "Emotion not in profile table, using fallback profile"
        );
        // builtin() always inserts the fallback and overrides never remove it
        (FALLBACK_PROFILE, &self.profiles[FALLBACK_PROFILE])
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.profiles.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }
}

impl Default for ProfileTable {
    fn default() -> Self {
        Self::builtin()
    }
}
