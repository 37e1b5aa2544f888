//! Distortion
//!
//! Amplify, clip, then divide back down. The clipping curve does the work;
//! the amplification factor decides how hard the signal is pushed into it.

use std::sync::Arc;

use crate::clip::ClipAlgorithm;
use crate::error::DspError;
use crate::param::Parameter;
use crate::rotator::Rotator;
use crate::sample::saturate_f64;

pub const MIN_AMPLIFICATION: f64 = 0.1;
pub const MAX_AMPLIFICATION: f64 = 100.0;

/// Factors this close to unity leave the signal untouched
const BYPASS_LOW: f64 = 0.999;
const BYPASS_HIGH: f64 = 1.001;

/// Amplify-and-clip distortion
///
/// The clipping algorithm and the amplification factor may both be changed
/// from a control thread through a shared handle while samples are processed.
pub struct Distortion {
    amplification: Arc<Parameter>,
    algorithms: Arc<Rotator<ClipAlgorithm>>,
}

impl Distortion {
    /// Create a distortion rotating over `catalog`, starting on its first entry
    pub fn new(catalog: Vec<ClipAlgorithm>) -> Result<Self, DspError> {
        for algorithm in &catalog {
            algorithm.validate()?;
        }
        Ok(Self {
            amplification: Arc::new(Parameter::new(MIN_AMPLIFICATION, MAX_AMPLIFICATION, 1.0)?),
            algorithms: Arc::new(Rotator::new(catalog)?),
        })
    }

    /// Process one sample
    ///
    /// # Real-time Safety
    /// No allocations, O(1).
    #[inline]
    pub fn apply(&mut self, sample: i16) -> i16 {
        let factor = self.amplification.advance();
        if (BYPASS_LOW..=BYPASS_HIGH).contains(&factor) {
            return sample;
        }

        let amplified = saturate_f64(sample as f64 * factor);
        let clipped = self.algorithms.current().clip(amplified);
        saturate_f64(clipped as f64 / factor)
    }

    /// Shared amplification parameter, for control code
    pub fn amplification(&self) -> Arc<Parameter> {
        Arc::clone(&self.amplification)
    }

    /// Shared algorithm selector, for control code
    pub fn algorithms(&self) -> Arc<Rotator<ClipAlgorithm>> {
        Arc::clone(&self.algorithms)
    }

    pub fn next_algorithm(&self) -> String {
        self.algorithms.next().name()
    }

    pub fn prev_algorithm(&self) -> String {
        self.algorithms.prev().name()
    }

    pub fn current_algorithm(&self) -> String {
        self.algorithms.current().name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_catalog() {
        assert_eq!(
            Distortion::new(Vec::new()).err(),
            Some(DspError::EmptyCatalog)
        );
    }

    #[test]
    fn test_hand_built_catalog_validated() {
        let result = Distortion::new(vec![
            ClipAlgorithm::None,
            ClipAlgorithm::Hard { ceiling: -100 },
        ]);
        assert!(matches!(result, Err(ref e) if e.is_configuration()));

        let result = Distortion::new(vec![ClipAlgorithm::Square {
            floor: 10,
            amplitude: i16::MIN,
        }]);
        assert!(result.is_err());

        let mut d = Distortion::new(vec![ClipAlgorithm::Hard { ceiling: 100 }]).unwrap();
        d.amplification().set_now(2.0);
        assert_eq!(d.apply(-5_000), -50);
    }

    #[test]
    fn test_bypass_near_unity() {
        let mut d = Distortion::new(vec![ClipAlgorithm::hard(0.01).unwrap()]).unwrap();
        for factor in [0.999, 1.0, 1.001] {
            d.amplification().set_now(factor);
            for s in [i16::MIN, -12_345, 0, 1, 20_000, i16::MAX] {
                assert_eq!(d.apply(s), s);
            }
        }
    }

    #[test]
    fn test_hard_clip_with_gain() {
        let mut d = Distortion::new(vec![ClipAlgorithm::hard(0.5).unwrap()]).unwrap();
        d.amplification().set_now(4.0);
        // 10_000 * 4 saturates, clips to 16_383, divides back by 4
        assert_eq!(d.apply(10_000), (16_383.0 / 4.0) as i16);
        // Quiet input survives the round trip
        assert_eq!(d.apply(1_000), 1_000);
    }

    #[test]
    fn test_rotation_names() {
        let d = Distortion::new(ClipAlgorithm::catalog()).unwrap();
        assert_eq!(d.current_algorithm(), "None");
        assert_eq!(d.next_algorithm(), "Square clip (amplitude 0.05)");
        assert_eq!(d.prev_algorithm(), "None");
        assert_eq!(d.prev_algorithm(), "Hyperbolic tangent");
    }

    #[test]
    fn test_amplification_ramps_per_sample() {
        let mut d = Distortion::new(ClipAlgorithm::catalog()).unwrap();
        let amp = d.amplification();
        amp.set_ramped(2.0, 4).unwrap();
        for _ in 0..4 {
            d.apply(0);
        }
        assert_eq!(amp.current(), 2.0);
    }
}
