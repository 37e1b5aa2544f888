//! Pitch Tracking
//!
//! Frequency estimation is pluggable; this module only windows the stream
//! and names the resulting frequencies.

use crate::error::DspError;
use crate::window::{WindowTransform, WindowedBuffer};

/// Default analysis window in samples
pub const PITCH_WINDOW_SIZE: usize = 2048;

/// Note names from A3 up to A4, one per semitone
const NOTE_NAMES: [&str; 13] = [
    "A", "Bb", "B", "C", "C#", "D", "Eb", "E", "F", "F#", "G", "G#", "A",
];

const OCTAVE_LOW: f64 = 220.0;
const OCTAVE_HIGH: f64 = 440.0;

/// Name the 12-TET pitch class nearest to `frequency` (A440 tuning)
pub fn note_name(frequency: f64) -> Result<&'static str, DspError> {
    if !frequency.is_finite() || frequency <= 0.0 {
        return Err(DspError::InvalidFrequency(frequency));
    }

    let mut f = frequency;
    while f < OCTAVE_LOW {
        f *= 2.0;
    }
    while f >= OCTAVE_HIGH {
        f /= 2.0;
    }

    // Boundaries sit half a semitone above each note
    let name = NOTE_NAMES
        .iter()
        .enumerate()
        .find(|(i, _)| OCTAVE_LOW * 2f64.powf((*i as f64 + 0.5) / 12.0) > f)
        .map_or("A", |(_, name)| *name);
    Ok(name)
}

/// A frequency estimator run on one window at a time
pub trait PitchEstimator: Send {
    /// Estimated fundamental in Hz, or `None` for unpitched input
    fn estimate(&mut self, window: &[i16]) -> Option<f64>;

    fn name(&self) -> &'static str;
}

/// Counts sign changes across the window
///
/// Crude, but dependable on clean tones.
#[derive(Debug, Clone)]
pub struct ZeroCrossingEstimator {
    sample_rate: f64,
}

impl ZeroCrossingEstimator {
    pub fn new(sample_rate: u32) -> Self {
        Self {
            sample_rate: sample_rate as f64,
        }
    }
}

impl PitchEstimator for ZeroCrossingEstimator {
    fn estimate(&mut self, window: &[i16]) -> Option<f64> {
        let crossings = window
            .windows(2)
            .filter(|pair| (pair[0] >= 0) != (pair[1] >= 0))
            .count();
        if crossings < 2 {
            return None;
        }
        let seconds = window.len() as f64 / self.sample_rate;
        Some(crossings as f64 / 2.0 / seconds)
    }

    fn name(&self) -> &'static str {
        "Zero crossing"
    }
}

struct PitchWindow<E> {
    estimator: E,
    notes: Vec<Option<&'static str>>,
}

impl<E: PitchEstimator> WindowTransform for PitchWindow<E> {
    fn transform(&mut self, window: &mut [i16]) {
        let note = self
            .estimator
            .estimate(window)
            .and_then(|frequency| note_name(frequency).ok());
        self.notes.push(note);
    }
}

/// Names the pitch of every complete window in the stream
pub struct PitchTracker<E> {
    buffer: WindowedBuffer<PitchWindow<E>>,
}

impl<E: PitchEstimator> PitchTracker<E> {
    pub fn new(window_size: usize, estimator: E) -> Result<Self, DspError> {
        Ok(Self {
            buffer: WindowedBuffer::new(
                window_size,
                PitchWindow {
                    estimator,
                    notes: Vec::new(),
                },
            )?,
        })
    }

    /// Feed a batch; returns one entry per window it completed
    pub fn process(&mut self, batch: &[i16]) -> Vec<Option<&'static str>> {
        self.buffer.process(batch);
        std::mem::take(&mut self.buffer.transform_mut().notes)
    }

    pub fn estimator_name(&self) -> &'static str {
        self.buffer.transform().estimator.name()
    }
}
