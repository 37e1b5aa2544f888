//! Feedback comb filter

use std::collections::VecDeque;
use std::sync::Arc;

use crate::error::DspError;
use crate::param::Parameter;
use crate::sample::{saturate, saturate_f64};

/// Where a comb filter reads its decay from
#[derive(Debug, Clone)]
pub enum DecaySource {
    Fixed(f64),
    Shared(Arc<Parameter>),
}

impl DecaySource {
    #[inline]
    fn value(&self) -> f64 {
        match self {
            DecaySource::Fixed(decay) => *decay,
            DecaySource::Shared(param) => param.current(),
        }
    }
}

impl From<f64> for DecaySource {
    fn from(decay: f64) -> Self {
        DecaySource::Fixed(decay)
    }
}

impl From<Arc<Parameter>> for DecaySource {
    fn from(param: Arc<Parameter>) -> Self {
        DecaySource::Shared(param)
    }
}

/// Fixed-delay feedback comb filter
///
/// Mixes each sample with an attenuated copy of the value stored `delay`
/// steps earlier. The ring always holds exactly `delay` samples.
#[derive(Debug)]
pub struct CombFilter {
    ring: VecDeque<i16>,
    decay: DecaySource,
}

impl CombFilter {
    /// Create a comb filter whose ring starts as `delay` zeros
    pub fn new(delay: usize, decay: impl Into<DecaySource>) -> Result<Self, DspError> {
        if delay == 0 {
            return Err(DspError::InvalidDelay(delay));
        }
        let mut ring = VecDeque::with_capacity(delay);
        ring.resize(delay, 0);
        Ok(Self {
            ring,
            decay: decay.into(),
        })
    }

    /// Process one sample
    ///
    /// # Real-time Safety
    /// No allocations: the ring never grows past its initial length.
    #[inline]
    pub fn apply(&mut self, sample: i16) -> i16 {
        let delayed = self.ring.pop_front().unwrap_or(0);
        let raw = delayed as f64 * self.decay.value() + sample as f64;
        self.ring.push_back(saturate(raw as i64));
        saturate_f64(raw / (1.0 + self.decay.value()))
    }

    pub fn delay(&self) -> usize {
        self.ring.len()
    }

    /// Zero the delay line
    pub fn reset(&mut self) {
        self.ring.iter_mut().for_each(|s| *s = 0);
    }
}
