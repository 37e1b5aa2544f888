//! Reverb
//!
//! A bank of parallel comb filters with mutually distinct delays, all sharing
//! one decay parameter. Output is the truncated mean of the bank.

use std::collections::HashSet;
use std::sync::Arc;

use crate::comb::CombFilter;
use crate::error::DspError;
use crate::param::Parameter;
use crate::sample::ms_to_samples;

/// Lower decay bound
pub const MIN_DECAY: f64 = 0.001;
/// Upper decay bound
pub const MAX_DECAY: f64 = 0.999;

/// Default comb delays in milliseconds (primes, so echoes rarely coincide)
pub const DEFAULT_DELAYS_MS: [u32; 17] = [
    23, 29, 31, 37, 41, 43, 47, 53, 59, 61, 67, 71, 73, 79, 83, 89, 97,
];

/// Comb-bank reverb
pub struct Reverb {
    decay: Arc<Parameter>,
    combs: Vec<CombFilter>,
}

impl Reverb {
    /// Create a reverb
    ///
    /// # Arguments
    /// * `initial_decay` - Starting decay, clamped to `[MIN_DECAY, MAX_DECAY]`
    /// * `delays` - Comb delays in samples; non-empty, positive, distinct
    pub fn new(initial_decay: f64, delays: &[usize]) -> Result<Self, DspError> {
        if delays.is_empty() {
            return Err(DspError::EmptyDelays);
        }
        let mut seen = HashSet::with_capacity(delays.len());
        for &delay in delays {
            if !seen.insert(delay) {
                return Err(DspError::DuplicateDelay(delay));
            }
        }

        let decay = Arc::new(Parameter::new(MIN_DECAY, MAX_DECAY, initial_decay)?);
        let combs = delays
            .iter()
            .map(|&delay| CombFilter::new(delay, Arc::clone(&decay)))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { decay, combs })
    }

    /// Create a reverb from delays given in milliseconds
    pub fn with_delays_ms(
        initial_decay: f64,
        delays_ms: &[u32],
        sample_rate: u32,
    ) -> Result<Self, DspError> {
        let delays: Vec<usize> = delays_ms
            .iter()
            .map(|&ms| ms_to_samples(ms, sample_rate))
            .collect();
        Self::new(initial_decay, &delays)
    }

    /// Process one sample
    #[inline]
    pub fn apply(&mut self, sample: i16) -> i16 {
        self.decay.advance();
        let sum: i64 = self
            .combs
            .iter_mut()
            .map(|comb| comb.apply(sample) as i64)
            .sum();
        (sum / self.combs.len() as i64) as i16
    }

    /// Shared decay parameter, for control code
    pub fn decay(&self) -> Arc<Parameter> {
        Arc::clone(&self.decay)
    }

    pub fn comb_count(&self) -> usize {
        self.combs.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sample::SAMPLE_RATE;

    #[test]
    fn test_rejects_bad_delays() {
        assert_eq!(Reverb::new(0.5, &[]).err(), Some(DspError::EmptyDelays));
        assert_eq!(
            Reverb::new(0.5, &[3, 0]).err(),
            Some(DspError::InvalidDelay(0))
        );
        assert_eq!(
            Reverb::new(0.5, &[3, 5, 3]).err(),
            Some(DspError::DuplicateDelay(3))
        );
    }

    #[test]
    fn test_decay_is_clamped() {
        let reverb = Reverb::new(5.0, &[1]).unwrap();
        assert_eq!(reverb.decay().current(), MAX_DECAY);
    }

    #[test]
    fn test_default_delays() {
        let reverb = Reverb::with_delays_ms(0.9, &DEFAULT_DELAYS_MS, SAMPLE_RATE).unwrap();
        assert_eq!(reverb.comb_count(), DEFAULT_DELAYS_MS.len());
    }

    #[test]
    fn test_mean_of_bank() {
        let mut reverb = Reverb::new(0.5, &[2, 3]).unwrap();
        // Both combs see an empty ring: each yields 1000 / 1.5
        assert_eq!(reverb.apply(1000), (1000.0 / 1.5) as i16);
        assert_eq!(reverb.apply(0), 0);
        // Only the 2-sample comb echoes
        let echo = (500.0 / 1.5) as i16 as i64;
        assert_eq!(reverb.apply(0) as i64, echo / 2);
    }

    #[test]
    fn test_silence() {
        let mut reverb = Reverb::new(0.9, &[5, 7, 11]).unwrap();
        for _ in 0..200 {
            assert_eq!(reverb.apply(0), 0);
        }
    }

    #[test]
    fn test_decay_ramp_advances_per_sample() {
        let mut reverb = Reverb::new(0.5, &[1]).unwrap();
        let decay = reverb.decay();
        decay.set_ramped(0.7, 2).unwrap();
        reverb.apply(0);
        reverb.apply(0);
        assert!((decay.current() - 0.7).abs() < 1e-12);
    }
}
