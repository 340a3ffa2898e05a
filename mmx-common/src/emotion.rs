//! Emotion labels and raw classifier observations
//!
//! The classifier emits one [`RawObservation`] per processed frame. Its label is
//! either one of the seven [`Emotion`]s or one of two non-signal markers
//! (no face found, prediction too uncertain).

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::Error;

/// Emotions produced by the classifier, in model output order
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Emotion {
    Angry,
    Disgust,
    Fear,
    Happy,
    #[default]
    Neutral,
    Sad,
    Surprise,
}

impl Emotion {
    /// All emotions in classifier output order
    pub const ALL: [Emotion; 7] = [
        Emotion::Angry,
        Emotion::Disgust,
        Emotion::Fear,
        Emotion::Happy,
        Emotion::Neutral,
        Emotion::Sad,
        Emotion::Surprise,
    ];

    /// Map a classifier output index to its emotion
    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    /// Normalized (lowercase) label, also used as the profile and cache key
    pub fn as_str(&self) -> &'static str {
        match self {
            Emotion::Angry => "angry",
            Emotion::Disgust => "disgust",
            Emotion::Fear => "fear",
            Emotion::Happy => "happy",
            Emotion::Neutral => "neutral",
            Emotion::Sad => "sad",
            Emotion::Surprise => "surprise",
        }
    }

    /// Capitalized label for display overlays and logs
    pub fn display_name(&self) -> &'static str {
        match self {
            Emotion::Angry => "Angry",
            Emotion::Disgust => "Disgust",
            Emotion::Fear => "Fear",
            Emotion::Happy => "Happy",
            Emotion::Neutral => "Neutral",
            Emotion::Sad => "Sad",
            Emotion::Surprise => "Surprise",
        }
    }
}

impl fmt::Display for Emotion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Emotion {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "angry" => Ok(Emotion::Angry),
            "disgust" | "disgusted" => Ok(Emotion::Disgust),
            "fear" => Ok(Emotion::Fear),
            "happy" => Ok(Emotion::Happy),
            "neutral" => Ok(Emotion::Neutral),
            "sad" => Ok(Emotion::Sad),
            "surprise" | "surprised" => Ok(Emotion::Surprise),
            other => Err(Error::InvalidInput(format!("Unknown emotion label: {}", other))),
        }
    }
}

/// Label attached to a raw observation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ObservedLabel {
    /// A genuine emotion prediction
    Emotion(Emotion),
    /// No face in the frame (or no frame at all this cycle)
    NoSignal,
    /// Face found but the prediction fell below the classifier's own threshold
    LowConfidence,
}

impl ObservedLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            ObservedLabel::Emotion(emotion) => emotion.as_str(),
            ObservedLabel::NoSignal => "no_signal",
            ObservedLabel::LowConfidence => "low_confidence",
        }
    }

    /// The emotion, if this label carries one
    pub fn emotion(&self) -> Option<Emotion> {
        match self {
            ObservedLabel::Emotion(emotion) => Some(*emotion),
            _ => None,
        }
    }
}

impl FromStr for ObservedLabel {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "no_signal" | "no face detected" | "none" => Ok(ObservedLabel::NoSignal),
            "low_confidence" | "uncertain" => Ok(ObservedLabel::LowConfidence),
            other => other.parse().map(ObservedLabel::Emotion),
        }
    }
}

impl TryFrom<String> for ObservedLabel {
    type Error = Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ObservedLabel> for String {
    fn from(label: ObservedLabel) -> Self {
        label.as_str().to_string()
    }
}

impl From<Emotion> for ObservedLabel {
    fn from(emotion: Emotion) -> Self {
        ObservedLabel::Emotion(emotion)
    }
}

/// One classifier output for one processed frame
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RawObservation {
    pub label: ObservedLabel,
    /// Confidence score (0.0-1.0)
    pub confidence: f32,
}

impl RawObservation {
    /// Create an observation with the confidence clamped to 0.0-1.0
    ///
    /// NaN confidence is treated as 0.0.
    pub fn new(label: impl Into<ObservedLabel>, confidence: f32) -> Self {
        let confidence = if confidence.is_nan() {
            0.0
        } else {
            confidence.clamp(0.0, 1.0)
        };
        Self {
            label: label.into(),
            confidence,
        }
    }

    /// Observation used when the source has nothing this cycle
    pub fn no_signal() -> Self {
        Self {
            label: ObservedLabel::NoSignal,
            confidence: 0.0,
        }
    }

    /// Returns the emotion if the observation carries a genuine emotion at or
    /// above `min_confidence`
    pub fn qualifying_emotion(&self, min_confidence: f32) -> Option<Emotion> {
        if self.confidence < min_confidence {
            return None;
        }
        self.label.emotion()
    }
}
