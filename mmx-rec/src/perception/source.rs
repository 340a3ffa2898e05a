//! Classification sources
//!
//! The camera, face localization and classifier live outside this crate; the
//! perception loop only sees a [`ClassificationSource`]. Two sources ship here:
//! [`ReplaySource`] (recorded observations, one JSON object per line) and
//! [`IdleSource`] (never sees a face).

use mmx_common::{Error, RawObservation, Result};
use std::io::BufRead;
use std::path::Path;

/// Per-frame producer of classifier observations
///
/// `observe` may block (it typically waits for the next camera frame).
/// `None` means nothing usable this cycle and is treated as "no face".
pub trait ClassificationSource: Send {
    fn observe(&mut self) -> Option<RawObservation>;
}

impl<S: ClassificationSource + ?Sized> ClassificationSource for Box<S> {
    fn observe(&mut self) -> Option<RawObservation> {
        (**self).observe()
    }
}

/// Source that never produces an observation
#[derive(Debug, Default, Clone, Copy)]
pub struct IdleSource;

impl ClassificationSource for IdleSource {
    fn observe(&mut self) -> Option<RawObservation> {
        None
    }
}

/// Replays a fixed sequence of observations
///
/// Line format: `{"label": "happy", "confidence": 0.91}` or `null` for a
/// frame without a face. Blank lines and lines starting with `#` are skipped.
#[derive(Debug, Clone)]
pub struct ReplaySource {
    frames: Vec<Option<RawObservation>>,
    cursor: usize,
    looping: bool,
}

impl ReplaySource {
    pub fn new(frames: Vec<Option<RawObservation>>) -> Self {
        Self {
            frames,
            cursor: 0,
            looping: false,
        }
    }

    /// Restart from the first frame once the recording is exhausted
    pub fn looping(mut self, looping: bool) -> Self {
        self.looping = looping;
        self
    }

    pub fn from_reader(reader: impl BufRead) -> Result<Self> {
        let mut frames = Vec::new();
        for (index, line) in reader.lines().enumerate() {
            let line = line?;
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            let frame: Option<RawObservation> = serde_json::from_str(trimmed).map_err(|e| {
                Error::InvalidInput(format!("Observation line {}: {}", index + 1, e))
            })?;
            frames.push(frame);
        }
        Ok(Self::new(frames))
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let file = std::fs::File::open(path)?;
        Self::from_reader(std::io::BufReader::new(file))
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// True once every frame has been handed out (never true when looping)
    pub fn is_exhausted(&self) -> bool {
        !self.looping && self.cursor >= self.frames.len()
    }
}

impl ClassificationSource for ReplaySource {
    fn observe(&mut self) -> Option<RawObservation> {
        if self.frames.is_empty() {
            return None;
        }
        if self.cursor >= self.frames.len() {
            if !self.looping {
                return None;
            }
            self.cursor = 0;
        }
        let frame = self.frames[self.cursor];
        self.cursor += 1;
        frame
    }
}
