//! Clipping Algorithms
//!
//! Closed family of waveshapers used by [`Distortion`](crate::Distortion).
//! Sample-domain variants work on raw 16-bit values; the remaining variants
//! run on the normalized signal and map back with saturation.

use std::fmt;

use crate::error::DspError;
use crate::sample::{denormalize, normalize, sign};

/// Default hard-clip ceiling, as a fraction of full scale
pub const DEFAULT_HARD_CEILING: f64 = 0.5;
/// Default square-clip noise floor, as a fraction of full scale
pub const DEFAULT_SQUARE_FLOOR: f64 = 0.01;
/// Default square-clip output amplitude, as a fraction of full scale
pub const DEFAULT_SQUARE_AMPLITUDE: f64 = 0.05;

/// One clipping strategy
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ClipAlgorithm {
    /// Pass-through
    None,
    /// Clamp to `±ceiling`
    Hard { ceiling: i16 },
    /// Quiet samples pass, everything else becomes `±amplitude`
    Square { floor: i16, amplitude: i16 },
    /// `x - x³/3`, flat beyond `|x| = 1`
    Cubic,
    /// `x / (1 + |x|)`
    Reciprocal,
    /// `sign(x) · (1 - e^-|x|)`
    Exponential,
    /// Piecewise soft knee that saturates above two thirds of full scale
    Overdrive,
    /// `tanh(x)`
    HyperbolicTangent,
}

fn fraction_to_sample(name: &'static str, value: f64) -> Result<i16, DspError> {
    if !(value > 0.0 && value <= 1.0) {
        return Err(DspError::InvalidFraction { name, value });
    }
    Ok((i16::MAX as f64 * value) as i16)
}

impl ClipAlgorithm {
    /// Hard clipper with its ceiling given as a fraction of full scale
    pub fn hard(ceiling: f64) -> Result<Self, DspError> {
        Ok(ClipAlgorithm::Hard {
            ceiling: fraction_to_sample("ceiling", ceiling)?,
        })
    }

    /// Square clipper with floor and amplitude given as fractions of full scale
    pub fn square(floor: f64, amplitude: f64) -> Result<Self, DspError> {
        Ok(ClipAlgorithm::Square {
            floor: fraction_to_sample("floor", floor)?,
            amplitude: fraction_to_sample("amplitude", amplitude)?,
        })
    }

    /// Check settings on variants built directly rather than through
    /// [`hard`](Self::hard) or [`square`](Self::square)
    pub fn validate(&self) -> Result<(), DspError> {
        let check = |name: &'static str, value: i16| {
            if value <= 0 {
                Err(DspError::InvalidFraction {
                    name,
                    value: normalize(value),
                })
            } else {
                Ok(())
            }
        };
        match *self {
            ClipAlgorithm::Hard { ceiling } => check("ceiling", ceiling),
            ClipAlgorithm::Square { floor, amplitude } => {
                check("floor", floor)?;
                check("amplitude", amplitude)
            }
            _ => Ok(()),
        }
    }

    /// Every algorithm with default settings, in rotation order
    pub fn catalog() -> Vec<ClipAlgorithm> {
        let ceiling = (i16::MAX as f64 * DEFAULT_HARD_CEILING) as i16;
        let floor = (i16::MAX as f64 * DEFAULT_SQUARE_FLOOR) as i16;
        let amplitude = (i16::MAX as f64 * DEFAULT_SQUARE_AMPLITUDE) as i16;
        vec![
            ClipAlgorithm::None,
            ClipAlgorithm::Square { floor, amplitude },
            ClipAlgorithm::Overdrive,
            ClipAlgorithm::Reciprocal,
            ClipAlgorithm::Cubic,
            ClipAlgorithm::Exponential,
            ClipAlgorithm::Hard { ceiling },
            ClipAlgorithm::HyperbolicTangent,
        ]
    }

    /// Display name
    pub fn name(&self) -> String {
        match self {
            ClipAlgorithm::None => "None".into(),
            ClipAlgorithm::Hard { ceiling } => {
                format!("Hard (ceiling {:.2})", normalize(*ceiling))
            }
            ClipAlgorithm::Square { amplitude, .. } => {
                format!("Square clip (amplitude {:.2})", normalize(*amplitude))
            }
            ClipAlgorithm::Cubic => "Cubic non-linearity".into(),
            ClipAlgorithm::Reciprocal => "Reciprocal".into(),
            ClipAlgorithm::Exponential => "Exponential".into(),
            ClipAlgorithm::Overdrive => "Overdrive".into(),
            ClipAlgorithm::HyperbolicTangent => "Hyperbolic tangent".into(),
        }
    }

    /// Clip one sample
    #[inline]
    pub fn clip(&self, sample: i16) -> i16 {
        match *self {
            ClipAlgorithm::None => sample,
            ClipAlgorithm::Hard { ceiling } => {
                let ceiling = ceiling.saturating_abs();
                sample.clamp(-ceiling, ceiling)
            }
            ClipAlgorithm::Square { floor, amplitude } => {
                let amplitude = amplitude.saturating_abs();
                if sample.saturating_abs() < floor {
                    sample
                } else if sample >= 0 {
                    amplitude
                } else {
                    -amplitude
                }
            }
            _ => denormalize(self.shape(normalize(sample))),
        }
    }

    #[inline]
    fn shape(&self, x: f64) -> f64 {
        match self {
            ClipAlgorithm::Cubic => {
                if x.abs() >= 1.0 {
                    sign(x) * 2.0 / 3.0
                } else {
                    x - x * x * x / 3.0
                }
            }
            ClipAlgorithm::Reciprocal => x / (1.0 + x.abs()),
            ClipAlgorithm::Exponential => sign(x) * (1.0 - (-x.abs()).exp()),
            ClipAlgorithm::Overdrive => {
                let a = x.abs();
                let shaped = if a <= 1.0 / 3.0 {
                    2.0 * a
                } else if a <= 2.0 / 3.0 {
                    let t = 2.0 - 3.0 * a;
                    (3.0 - t * t) / 3.0
                } else {
                    1.0
                };
                sign(x) * shaped
            }
            ClipAlgorithm::HyperbolicTangent => x.tanh(),
            _ => x,
        }
    }
}

impl fmt::Display for ClipAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name())
    }
}
