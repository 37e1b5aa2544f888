//! DSP Error Types

use thiserror::Error;

/// Errors that can occur while building or driving an effect
///
/// Construction-time problems are reported as configuration errors and are
/// always fatal to the constructing call. Call-time problems are reported as
/// invalid arguments. Numeric overflow is never an error: sample arithmetic
/// saturates instead.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DspError {
    #[error("Algorithm catalog must contain at least one entry")]
    EmptyCatalog,

    #[error("Invalid bounds: min ({min}) must be less than max ({max})")]
    InvalidBounds { min: f64, max: f64 },

    #[error("Delay must be positive, got {0} samples")]
    InvalidDelay(usize),

    #[error("Delay set must not be empty")]
    EmptyDelays,

    #[error("Duplicate delay of {0} samples")]
    DuplicateDelay(usize),

    #[error("Window size must be positive, got {0}")]
    InvalidWindowSize(usize),

    #[error("Invalid loop amplification factor {0}; must be in range (0, 1]")]
    InvalidLoopFactor(f64),

    #[error("Invalid {name} fraction {value}; must be in range (0, 1]")]
    InvalidFraction { name: &'static str, value: f64 },

    #[error("Invalid filter coefficients for frequency {frequency}Hz at sample rate {sample_rate}Hz")]
    InvalidCoefficients { frequency: f32, sample_rate: f32 },

    #[error("Sample rate must be positive, got {0}")]
    InvalidSampleRate(f32),

    #[error("Encoded sample array has odd length {0}")]
    OddByteLength(usize),

    #[error("Ramp step count must be positive")]
    ZeroRampSteps,

    #[error("Invalid peak {0}; may not be negative")]
    NegativePeak(i32),

    #[error("Invalid frequency {0}Hz; must be positive")]
    InvalidFrequency(f64),
}

impl DspError {
    /// Whether this error was raised while constructing an effect
    pub fn is_configuration(&self) -> bool {
        !self.is_invalid_argument()
    }

    /// Whether this error was raised by a call on an already-built effect
    pub fn is_invalid_argument(&self) -> bool {
        matches!(
            self,
            DspError::OddByteLength(_)
                | DspError::ZeroRampSteps
                | DspError::NegativePeak(_)
                | DspError::InvalidFrequency(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = DspError::OddByteLength(7);
        assert!(err.to_string().contains('7'));

        let err = DspError::InvalidBounds { min: 1.0, max: 0.5 };
        assert!(err.to_string().contains("0.5"));
    }

    #[test]
    fn test_error_classes() {
        assert!(DspError::EmptyCatalog.is_configuration());
        assert!(DspError::InvalidLoopFactor(1.5).is_configuration());
        assert!(DspError::ZeroRampSteps.is_invalid_argument());
        assert!(DspError::NegativePeak(-1).is_invalid_argument());
        assert!(!DspError::OddByteLength(3).is_configuration());
    }
}
