//! Loop Engine
//!
//! An overdub looper driven by one control (`toggle`) plus `clear`:
//!
//! ```text
//!            toggle              toggle                toggle
//!   Idle ───────────▶ Recording ─────────▶ Looping ◀─────────────┐
//!    ▲                 First    (save)   │  ▲   │ toggle          │
//!    │ clear             │               │  │   ▼                 │
//!    ├───────────────────┘         clear │  │  Layered ───────────┘
//!    │                                   ▼  │toggle │ clear   (merge)
//!    └──────────────────────────── SavedOnly ◀──────┘
//!                   clear
//! ```
//!
//! Layers are stored in flat arenas (`layers * loop_len` samples, layer-major)
//! indexed by loop position, so appending a layer or merging the new set into
//! the saved one is a contiguous copy.

use std::fmt;

use parking_lot::Mutex;
use tracing::{info, warn};

use crate::error::DspError;
use crate::sample::saturate;

/// Weight of the live input against the recorded layers
const LIVE_BIAS: i64 = 3;

/// Initial capacity for the first recording (one second at the default rate)
const FIRST_RECORDING_CAPACITY: usize = crate::sample::SAMPLE_RATE as usize;

/// Observable looper state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    /// Nothing recorded; input passes through
    Idle,
    /// Capturing the first pass, which fixes the loop length
    RecordingFirst,
    /// Playing the saved loop while recording new layers
    Looping,
    /// Playing the saved loop plus finished, unmerged new layers
    Layered,
    /// Playing the saved loop alone
    SavedOnly,
}

impl LoopState {
    /// Short human-readable description
    pub fn label(&self) -> &'static str {
        match self {
            LoopState::Idle => "Idle",
            LoopState::RecordingFirst => "Recording first loop",
            LoopState::Looping => "Looping",
            LoopState::Layered => "Layered",
            LoopState::SavedOnly => "Saved loop",
        }
    }
}

impl fmt::Display for LoopState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Layer-major arena of equal-length layers
#[derive(Debug, Clone)]
struct LayerSet {
    len: usize,
    samples: Vec<i16>,
}

impl LayerSet {
    fn empty(len: usize) -> Self {
        Self {
            len,
            samples: Vec::new(),
        }
    }

    fn single(samples: Vec<i16>) -> Self {
        Self {
            len: samples.len(),
            samples,
        }
    }

    fn layers(&self) -> usize {
        self.samples.len() / self.len
    }

    #[inline]
    fn sum_at(&self, position: usize) -> i64 {
        self.samples
            .iter()
            .skip(position)
            .step_by(self.len)
            .map(|&s| s as i64)
            .sum()
    }

    /// Write into `layer`, appending a silent layer if it does not exist yet
    fn write(&mut self, layer: usize, position: usize, sample: i16) {
        if layer >= self.layers() {
            self.samples.resize((layer + 1) * self.len, 0);
        }
        self.samples[layer * self.len + position] = sample;
    }

    fn merge(&mut self, other: LayerSet) {
        debug_assert_eq!(self.len, other.len);
        self.samples.extend_from_slice(&other.samples);
    }
}

/// Layers recorded on top of the saved loop
#[derive(Debug)]
struct NewLayers {
    set: LayerSet,
    written: usize,
}

impl NewLayers {
    fn new(len: usize) -> Self {
        Self {
            set: LayerSet::empty(len),
            written: 0,
        }
    }
}

#[derive(Debug, Default)]
struct Inner {
    recording: bool,
    first: Vec<i16>,
    saved: Option<LayerSet>,
    fresh: Option<NewLayers>,
    position: usize,
}

impl Inner {
    fn state(&self) -> LoopState {
        match (&self.saved, &self.fresh, self.recording) {
            (None, _, false) => LoopState::Idle,
            (None, _, true) => LoopState::RecordingFirst,
            (Some(_), Some(_), true) => LoopState::Looping,
            (Some(_), Some(_), false) => LoopState::Layered,
            (Some(_), None, _) => LoopState::SavedOnly,
        }
    }
}

/// Overdub loop engine
///
/// `apply`, `toggle` and `clear` all lock the whole engine, so control calls
/// interleave with processing one whole operation at a time.
#[derive(Debug)]
pub struct Looper {
    amplification: f64,
    inner: Mutex<Inner>,
}

impl Looper {
    /// Create an idle looper
    ///
    /// # Arguments
    /// * `amplification` - Gain applied to input as it is recorded into a
    ///   new layer, in `(0, 1]`
    pub fn new(amplification: f64) -> Result<Self, DspError> {
        if !(amplification > 0.0 && amplification <= 1.0) {
            return Err(DspError::InvalidLoopFactor(amplification));
        }
        Ok(Self {
            amplification,
            inner: Mutex::new(Inner::default()),
        })
    }

    /// Process one sample
    pub fn apply(&self, sample: i16) -> i16 {
        let mut guard = self.inner.lock();
        let inner = &mut *guard;

        let saved = match &inner.saved {
            Some(saved) => saved,
            None => {
                if inner.recording {
                    inner.first.push(sample);
                }
                return sample;
            }
        };

        inner.position = (inner.position + 1) % saved.len;
        let position = inner.position;

        let mut total = saved.sum_at(position) + LIVE_BIAS * sample as i64;
        if let Some(fresh) = inner.fresh.as_mut() {
            total += fresh.set.sum_at(position);
            if inner.recording {
                let layer = fresh.written / fresh.set.len;
                let recorded = (sample as f64 * self.amplification) as i16;
                fresh.set.write(layer, position, recorded);
                fresh.written += 1;
            }
        }
        saturate(total)
    }

    /// Process a batch
    pub fn process(&self, batch: &[i16]) -> Vec<i16> {
        batch.iter().map(|&s| self.apply(s)).collect()
    }

    /// Advance the loop pedal state machine; returns the new state
    pub fn toggle(&self) -> LoopState {
        let mut guard = self.inner.lock();
        let inner = &mut *guard;
        match inner.state() {
            LoopState::Idle => {
                inner.first = Vec::with_capacity(FIRST_RECORDING_CAPACITY);
                inner.recording = true;
                info!("Starting new loop");
            }
            LoopState::RecordingFirst => {
                if inner.first.is_empty() {
                    warn!("Nothing recorded yet; still recording first loop");
                } else {
                    let first = std::mem::take(&mut inner.first);
                    let len = first.len();
                    inner.saved = Some(LayerSet::single(first));
                    inner.fresh = Some(NewLayers::new(len));
                    inner.position = 0;
                    info!("Finished new loop ({} samples)", len);
                }
            }
            LoopState::Looping => {
                inner.recording = false;
                info!("Finished new layer(s)");
            }
            LoopState::Layered | LoopState::SavedOnly => {
                if let (Some(saved), Some(fresh)) = (inner.saved.as_mut(), inner.fresh.take()) {
                    saved.merge(fresh.set);
                }
                let len = inner.saved.as_ref().map_or(0, |saved| saved.len);
                inner.fresh = Some(NewLayers::new(len));
                inner.recording = true;
                info!("Starting new layer(s)");
            }
        }
        inner.state()
    }

    /// Discard the most recent recording; returns the new state
    pub fn clear(&self) -> LoopState {
        let mut guard = self.inner.lock();
        let inner = &mut *guard;
        match inner.state() {
            LoopState::Idle => info!("No loop to clear"),
            LoopState::RecordingFirst => {
                inner.first.clear();
                info!("Aborting new loop");
            }
            LoopState::Looping | LoopState::Layered => {
                inner.fresh = None;
                info!("Wiping most recent layers");
            }
            LoopState::SavedOnly => {
                inner.saved = None;
                inner.position = 0;
                info!("Wiping saved loop");
            }
        }
        inner.recording = false;
        inner.state()
    }

    pub fn state(&self) -> LoopState {
        self.inner.lock().state()
    }

    /// Loop length in samples, once the first loop is closed
    pub fn loop_len(&self) -> Option<usize> {
        self.inner.lock().saved.as_ref().map(|saved| saved.len)
    }

    /// Number of layers in the saved loop
    pub fn saved_layers(&self) -> usize {
        self.inner.lock().saved.as_ref().map_or(0, LayerSet::layers)
    }

    /// Number of layers in the unmerged new set
    pub fn new_layers(&self) -> usize {
        self.inner
            .lock()
            .fresh
            .as_ref()
            .map_or(0, |fresh| fresh.set.layers())
    }

    pub fn amplification(&self) -> f64 {
        self.amplification
    }
}
