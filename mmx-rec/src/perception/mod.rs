//! Perception side: classification source → stabilizer → stable-signal store

pub mod pipeline;
pub mod source;
pub mod stabilizer;
pub mod store;

pub use pipeline::{LoopStats, PerceptionLoop};
pub use source::{ClassificationSource, IdleSource, ReplaySource};
pub use stabilizer::{Stabilizer, StabilizerSettings, StabilizerState};
pub use store::{StableSignal, StableSignalStore};
