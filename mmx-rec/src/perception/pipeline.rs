//! Perception loop
//!
//! The single producer task: pulls frames from the classification source,
//! feeds every Nth one to the stabilizer, and publishes the stable emotion to
//! the shared store whenever it differs from what readers currently see.
//!
//! Runs on a blocking thread (`spawn_blocking`) because sources block on frame
//! capture. Readers are never waited on: the store write is a single short
//! critical section.

use super::source::ClassificationSource;
use super::stabilizer::Stabilizer;
use super::store::{StableSignal, StableSignalStore};
use mmx_common::config::StabilizerConfig;
use mmx_common::{Emotion, RawObservation};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Counters reported when the loop stops
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct LoopStats {
    /// Frames pulled from the source
    pub frames: u64,
    /// Frames fed to the stabilizer
    pub processed: u64,
    /// Store writes
    pub published: u64,
}

pub struct PerceptionLoop<S> {
    source: S,
    stabilizer: Stabilizer,
    store: Arc<StableSignalStore>,
    frame_stride: u64,
    frame_interval: Duration,
    stats: LoopStats,
}

impl<S: ClassificationSource> PerceptionLoop<S> {
    pub fn new(source: S, stabilizer: Stabilizer, store: Arc<StableSignalStore>) -> Self {
        Self {
            source,
            stabilizer,
            store,
            frame_stride: 1,
            frame_interval: Duration::ZERO,
            stats: LoopStats::default(),
        }
    }

    /// Apply frame stride and pacing from configuration
    pub fn with_config(self, config: &StabilizerConfig) -> Self {
        self.frame_stride(config.frame_stride)
            .frame_interval(Duration::from_millis(config.frame_interval_ms))
    }

    /// Feed only every `stride`th frame to the stabilizer
    pub fn frame_stride(mut self, stride: u32) -> Self {
        self.frame_stride = u64::from(stride.max(1));
        self
    }

    /// Sleep between frames (zero when the source paces itself)
    pub fn frame_interval(mut self, interval: Duration) -> Self {
        self.frame_interval = interval;
        self
    }

    /// Pull one frame; returns the stable emotion if the frame was processed
    pub fn tick(&mut self) -> Option<Emotion> {
        self.stats.frames += 1;
        let observation = self.source.observe();
        if self.stats.frames % self.frame_stride != 0 {
            return None;
        }
        Some(self.process(observation))
    }

    fn process(&mut self, observation: Option<RawObservation>) -> Emotion {
        self.stats.processed += 1;
        let observation = observation.unwrap_or_else(RawObservation::no_signal);
        let stable = self.stabilizer.record(observation);

        if self.store.get() != StableSignal::Emotion(stable) {
            self.store.set(stable);
            self.stats.published += 1;
            info!(
                emotion = stable.display_name(),
                confidence = observation.confidence,
                "Updated emotion"
            );
        }
        stable
    }

    /// Run until cancelled
    pub fn run(mut self, cancel: CancellationToken) -> LoopStats {
        info!(
            frame_stride = self.frame_stride,
            frame_interval_ms = self.frame_interval.as_millis() as u64,
            "Perception loop started"
        );

        while !cancel.is_cancelled() {
            self.tick();
            if !self.frame_interval.is_zero() {
                std::thread::sleep(self.frame_interval);
            }
        }

        info!(
            frames = self.stats.frames,
            processed = self.stats.processed,
            published = self.stats.published,
            "Perception loop stopped"
        );
        self.stats
    }

    pub fn stats(&self) -> LoopStats {
        self.stats
    }

    pub fn stabilizer(&self) -> &Stabilizer {
        &self.stabilizer
    }
}
