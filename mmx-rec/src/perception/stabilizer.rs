//! Temporal emotion stabilizer
//!
//! Turns the noisy per-frame classifier output into a debounced stable emotion.
//!
//! **Policy:**
//! - Observations below the confidence threshold, and non-emotion markers, are
//!   discarded without touching any state
//! - Qualifying observations enter a bounded FIFO history
//! - The leading emotion is the one with the highest summed confidence across
//!   the history; ties go to the emotion whose latest entry is most recent
//! - A cycle agrees when the leader is unchanged and the new observation itself
//!   carries the leader; agreeing cycles extend the consecutive run, anything
//!   else restarts it
//! - A transition commits only once the run reaches the required length AND
//!   the minimum hold time has passed since the previous commit
//!
//! The stabilizer is owned by the perception loop and never shared, so it needs
//! no synchronization of its own.

use mmx_common::config::StabilizerConfig;
use mmx_common::{Clock, Emotion, RawObservation};
use std::cmp::Ordering;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, trace};

/// Stabilizer tuning
#[derive(Debug, Clone, PartialEq)]
pub struct StabilizerSettings {
    pub history_capacity: usize,
    pub min_confidence: f32,
    pub required_consecutive: u32,
    pub min_hold: Duration,
}

impl Default for StabilizerSettings {
    fn default() -> Self {
        Self::from(&StabilizerConfig::default())
    }
}

impl From<&StabilizerConfig> for StabilizerSettings {
    fn from(config: &StabilizerConfig) -> Self {
        Self {
            history_capacity: config.history_capacity.max(1),
            min_confidence: config.min_confidence,
            required_consecutive: config.required_consecutive.max(1),
            min_hold: Duration::from_secs_f64(config.min_hold_secs.max(0.0)),
        }
    }
}

/// One qualifying observation kept for weighted voting
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HistoryEntry {
    pub emotion: Emotion,
    pub confidence: f32,
}

/// Consecutive cycles agreeing on the current leader
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConsecutiveRun {
    pub label: Emotion,
    pub count: u32,
    pub window_start: Instant,
}

/// Externally observable stabilizer state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StabilizerState {
    /// Nothing tracked and nothing committed yet
    NoLabel,
    /// A run is in progress
    Tracking { label: Emotion, count: u32 },
    /// Last cycle committed (or no run since the last commit)
    Stable(Emotion),
}

pub struct Stabilizer {
    settings: StabilizerSettings,
    clock: Arc<dyn Clock>,
    history: VecDeque<HistoryEntry>,
    run: Option<ConsecutiveRun>,
    stable: Emotion,
    committed: bool,
    last_transition: Instant,
}

impl Stabilizer {
    /// Create a stabilizer whose stable emotion starts at neutral
    ///
    /// The construction instant counts as the previous transition, so the first
    /// commit also waits out the hold time.
    pub fn new(settings: StabilizerSettings, clock: Arc<dyn Clock>) -> Self {
        let now = clock.now();
        Self {
            history: VecDeque::with_capacity(settings.history_capacity),
            settings,
            clock,
            run: None,
            stable: Emotion::Neutral,
            committed: false,
            last_transition: now,
        }
    }

    /// Feed one classifier observation and return the (possibly unchanged)
    /// stable emotion
    pub fn record(&mut self, observation: RawObservation) -> Emotion {
        let Some(emotion) = observation.qualifying_emotion(self.settings.min_confidence) else {
            trace!(
                label = observation.label.as_str(),
                confidence = observation.confidence,
                "Observation discarded"
            );
            return self.stable;
        };

        if self.history.len() >= self.settings.history_capacity {
            self.history.pop_front();
        }
        self.history.push_back(HistoryEntry {
            emotion,
            confidence: observation.confidence,
        });

        let Some(leader) = self.leading_emotion() else {
            return self.stable;
        };

        let now = self.clock.now();
        self.advance_run(leader, emotion, now);

        if let Some(run) = self.run {
            if run.count >= self.settings.required_consecutive {
                let held = now.saturating_duration_since(self.last_transition);
                if held >= self.settings.min_hold {
                    self.commit(run.label, now, observation.confidence);
                } else {
                    debug!(
                        emotion = %run.label,
                        count = run.count,
                        held_ms = held.as_millis() as u64,
                        "Transition held back by minimum hold time"
                    );
                }
            }
        }

        self.stable
    }

    fn advance_run(&mut self, leader: Emotion, observed: Emotion, now: Instant) {
        let agrees = observed == leader;
        match self.run.as_mut() {
            Some(run) if run.label == leader && agrees => {
                run.count = run.count.saturating_add(1);
            }
            _ => {
                self.run = Some(ConsecutiveRun {
                    label: leader,
                    count: u32::from(agrees),
                    window_start: now,
                });
            }
        }
    }

    fn commit(&mut self, emotion: Emotion, now: Instant, confidence: f32) {
        if emotion != self.stable {
            info!(
                from = %self.stable,
                to = %emotion,
                confidence,
                "Stable emotion changed"
            );
        }
        self.stable = emotion;
        self.committed = true;
        self.last_transition = now;
        self.run = None;
    }

    /// Confidence-weighted leader over the current history
    ///
    /// Ties are broken in favor of the emotion whose most recent entry sits
    /// latest in the history.
    pub fn leading_emotion(&self) -> Option<Emotion> {
        self.scored()
            .into_iter()
            .max_by(|a, b| {
                a.1.partial_cmp(&b.1)
                    .unwrap_or(Ordering::Equal)
                    .then(a.2.cmp(&b.2))
            })
            .map(|(emotion, _, _)| emotion)
    }

    /// Summed confidence per emotion, in order of first appearance
    pub fn scores(&self) -> Vec<(Emotion, f32)> {
        self.scored()
            .into_iter()
            .map(|(emotion, score, _)| (emotion, score))
            .collect()
    }

    /// (emotion, summed confidence, index of latest entry)
    fn scored(&self) -> Vec<(Emotion, f32, usize)> {
        let mut scores: Vec<(Emotion, f32, usize)> = Vec::with_capacity(Emotion::ALL.len());
        for (index, entry) in self.history.iter().enumerate() {
            match scores.iter_mut().find(|(emotion, _, _)| *emotion == entry.emotion) {
                Some(score) => {
                    score.1 += entry.confidence;
                    score.2 = index;
                }
                None => scores.push((entry.emotion, entry.confidence, index)),
            }
        }
        scores
    }

    /// Last committed emotion (neutral before the first commit)
    pub fn stable(&self) -> Emotion {
        self.stable
    }

    pub fn state(&self) -> StabilizerState {
        match self.run {
            Some(run) => StabilizerState::Tracking {
                label: run.label,
                count: run.count,
            },
            None if self.committed => StabilizerState::Stable(self.stable),
            None => StabilizerState::NoLabel,
        }
    }

    pub fn run(&self) -> Option<ConsecutiveRun> {
        self.run
    }

    pub fn history(&self) -> impl Iterator<Item = &HistoryEntry> {
        self.history.iter()
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    pub fn settings(&self) -> &StabilizerSettings {
        &self.settings
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mmx_common::{ManualClock, ObservedLabel};

    fn new_stabilizer() -> (Stabilizer, ManualClock) {
        let clock = ManualClock::new();
        let stabilizer = Stabilizer::new(StabilizerSettings::default(), Arc::new(clock.clone()));
        (stabilizer, clock)
    }

    fn obs(emotion: Emotion, confidence: f32) -> RawObservation {
        RawObservation::new(emotion, confidence)
    }

    #[test]
    fn test_starts_neutral_with_no_label() {
        let (stabilizer, _clock) = new_stabilizer();
        assert_eq!(stabilizer.stable(), Emotion::Neutral);
        assert_eq!(stabilizer.state(), StabilizerState::NoLabel);
        assert_eq!(stabilizer.history_len(), 0);
    }

    #[test]
    fn test_low_confidence_has_no_effect() {
        let (mut stabilizer, clock) = new_stabilizer();
        clock.advance_secs(2.0);

        assert_eq!(stabilizer.record(obs(Emotion::Happy, 0.49)), Emotion::Neutral);
        assert_eq!(stabilizer.history_len(), 0);
        assert_eq!(stabilizer.state(), StabilizerState::NoLabel);
    }

    #[test]
    fn test_markers_have_no_effect() {
        let (mut stabilizer, _clock) = new_stabilizer();
        stabilizer.record(RawObservation::no_signal());
        stabilizer.record(RawObservation::new(ObservedLabel::LowConfidence, 0.95));
        assert_eq!(stabilizer.history_len(), 0);
        assert!(stabilizer.run().is_none());
    }

    #[test]
    fn test_history_is_bounded() {
        let (mut stabilizer, _clock) = new_stabilizer();
        for _ in 0..25 {
            stabilizer.record(obs(Emotion::Sad, 0.8));
        }
        assert_eq!(stabilizer.history_len(), 10);
    }

    #[test]
    fn test_fourth_agreeing_observation_commits_after_hold() {
        let (mut stabilizer, clock) = new_stabilizer();
        clock.advance_secs(1.0);

        for _ in 0..3 {
            assert_eq!(stabilizer.record(obs(Emotion::Happy, 0.9)), Emotion::Neutral);
        }
        assert_eq!(
            stabilizer.state(),
            StabilizerState::Tracking {
                label: Emotion::Happy,
                count: 3
            }
        );

        assert_eq!(stabilizer.record(obs(Emotion::Happy, 0.9)), Emotion::Happy);
        assert_eq!(stabilizer.state(), StabilizerState::Stable(Emotion::Happy));
        assert!(stabilizer.run().is_none());
    }

    #[test]
    fn test_hold_time_defers_commit() {
        let (mut stabilizer, clock) = new_stabilizer();
        clock.advance_secs(0.5);

        for _ in 0..6 {
            assert_eq!(stabilizer.record(obs(Emotion::Happy, 0.9)), Emotion::Neutral);
        }

        clock.advance_secs(0.5);
        assert_eq!(stabilizer.record(obs(Emotion::Happy, 0.9)), Emotion::Happy);
    }

    #[test]
    fn test_mixed_history_resets_run() {
        let (mut stabilizer, clock) = new_stabilizer();
        clock.advance_secs(5.0);

        stabilizer.record(obs(Emotion::Happy, 0.9));
        stabilizer.record(obs(Emotion::Happy, 0.8));
        stabilizer.record(obs(Emotion::Sad, 0.6));
        let stable = stabilizer.record(obs(Emotion::Happy, 0.7));

        assert_eq!(stable, Emotion::Neutral);
        assert_eq!(stabilizer.leading_emotion(), Some(Emotion::Happy));

        let scores = stabilizer.scores();
        let happy = scores.iter().find(|(e, _)| *e == Emotion::Happy).unwrap().1;
        let sad = scores.iter().find(|(e, _)| *e == Emotion::Sad).unwrap().1;
        assert!((happy - 2.4).abs() < 1e-5);
        assert!((sad - 0.6).abs() < 1e-5);

        assert_eq!(
            stabilizer.state(),
            StabilizerState::Tracking {
                label: Emotion::Happy,
                count: 1
            }
        );
    }

    #[test]
    fn test_tie_goes_to_most_recent() {
        let (mut stabilizer, _clock) = new_stabilizer();
        stabilizer.record(obs(Emotion::Happy, 0.6));
        stabilizer.record(obs(Emotion::Sad, 0.6));
        assert_eq!(stabilizer.leading_emotion(), Some(Emotion::Sad));

        let (mut stabilizer, _clock) = new_stabilizer();
        stabilizer.record(obs(Emotion::Sad, 0.6));
        stabilizer.record(obs(Emotion::Happy, 0.6));
        assert_eq!(stabilizer.leading_emotion(), Some(Emotion::Happy));
    }

    #[test]
    fn test_second_transition_waits_for_hold() {
        let (mut stabilizer, clock) = new_stabilizer();
        clock.advance_secs(1.0);
        for _ in 0..4 {
            stabilizer.record(obs(Emotion::Happy, 0.9));
        }
        assert_eq!(stabilizer.stable(), Emotion::Happy);

        // Sad overtakes the weighted vote on its 4th entry (4.0 > 3.6), then
        // needs 4 agreeing cycles; the hold has not elapsed yet.
        for _ in 0..7 {
            assert_eq!(stabilizer.record(obs(Emotion::Sad, 1.0)), Emotion::Happy);
        }

        clock.advance_secs(1.0);
        assert_eq!(stabilizer.record(obs(Emotion::Sad, 1.0)), Emotion::Sad);
    }

    #[test]
    fn test_settings_from_config() {
        let config = StabilizerConfig {
            min_hold_secs: 2.5,
            ..StabilizerConfig::default()
        };
        let settings = StabilizerSettings::from(&config);
        assert_eq!(settings.min_hold, Duration::from_millis(2500));
        assert_eq!(settings.history_capacity, 10);
        assert_eq!(settings.required_consecutive, 4);
    }
}
