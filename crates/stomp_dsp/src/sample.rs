//! Sample Utilities
//!
//! Saturating conversions between wide arithmetic and 16-bit samples, the
//! little-endian wire codec, and normalization helpers shared by every effect.

use crate::error::DspError;

/// Default stream sample rate (Hz)
pub const SAMPLE_RATE: u32 = 44_100;

/// Scale between a sample and its normalized `[-1, 1)` representation
const SAMPLE_SCALE: f64 = 32_768.0;

/// Clamp a wide integer into the sample range
#[inline]
pub fn saturate(value: i64) -> i16 {
    value.clamp(i16::MIN as i64, i16::MAX as i64) as i16
}

/// Clamp and truncate a floating-point value into the sample range
///
/// NaN maps to zero.
#[inline]
pub fn saturate_f64(value: f64) -> i16 {
    // `as` saturates at the integer bounds and truncates toward zero
    value as i16
}

/// Magnitude of a sample, with `i16::MIN` mapped to `i16::MAX`
#[inline]
pub fn magnitude(sample: i16) -> i16 {
    sample.saturating_abs()
}

/// `1.0` for non-negative values, `-1.0` otherwise
#[inline]
pub fn sign(value: f64) -> f64 {
    if value >= 0.0 {
        1.0
    } else {
        -1.0
    }
}

/// Map a sample to `[-1, 1)`
#[inline]
pub fn normalize(sample: i16) -> f64 {
    sample as f64 / SAMPLE_SCALE
}

/// Map a normalized value back to a sample, saturating
#[inline]
pub fn denormalize(value: f64) -> i16 {
    saturate_f64(value * SAMPLE_SCALE)
}

/// Decode little-endian 16-bit samples
///
/// Odd-length input is rejected.
pub fn decode(bytes: &[u8]) -> Result<Vec<i16>, DspError> {
    if bytes.len() % 2 != 0 {
        return Err(DspError::OddByteLength(bytes.len()));
    }
    Ok(bytes
        .chunks_exact(2)
        .map(|pair| i16::from_le_bytes([pair[0], pair[1]]))
        .collect())
}

/// Encode samples as little-endian 16-bit integers
pub fn encode(samples: &[i16]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(samples.len() * 2);
    for sample in samples {
        bytes.extend_from_slice(&sample.to_le_bytes());
    }
    bytes
}

/// Convert a duration in milliseconds to a sample count
#[inline]
pub fn ms_to_samples(ms: u32, sample_rate: u32) -> usize {
    (ms as u64 * sample_rate as u64 / 1000) as usize
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_saturate_range() {
        assert_eq!(saturate(0), 0);
        assert_eq!(saturate(1234), 1234);
        assert_eq!(saturate(-32768), -32768);
        assert_eq!(saturate(40_000), i16::MAX);
        assert_eq!(saturate(-40_000), i16::MIN);
        assert_eq!(saturate(i64::MAX), i16::MAX);
        assert_eq!(saturate(i64::MIN), i16::MIN);
    }

    #[test]
    fn test_saturate_f64() {
        assert_eq!(saturate_f64(100.9), 100);
        assert_eq!(saturate_f64(-100.9), -100);
        assert_eq!(saturate_f64(1e9), i16::MAX);
        assert_eq!(saturate_f64(-1e9), i16::MIN);
        assert_eq!(saturate_f64(f64::NAN), 0);
    }

    #[test]
    fn test_magnitude_of_min() {
        assert_eq!(magnitude(i16::MIN), i16::MAX);
        assert_eq!(magnitude(-5), 5);
        assert_eq!(magnitude(5), 5);
    }

    #[test]
    fn test_codec() {
        let samples = vec![0, 1, -1, i16::MAX, i16::MIN, 258];
        let bytes = encode(&samples);
        assert_eq!(bytes.len(), samples.len() * 2);
        assert_eq!(&bytes[4..6], &[0xFF, 0xFF]);
        assert_eq!(&bytes[10..12], &[0x02, 0x01]);
        assert_eq!(decode(&bytes).unwrap(), samples);
    }

    #[test]
    fn test_decode_odd_length() {
        let err = decode(&[1, 2, 3]).unwrap_err();
        assert_eq!(err, DspError::OddByteLength(3));
        assert!(decode(&[]).unwrap().is_empty());
    }

    #[test]
    fn test_normalize() {
        assert_eq!(normalize(i16::MIN), -1.0);
        assert_eq!(denormalize(1.0), i16::MAX);
        assert_eq!(denormalize(normalize(1000)), 1000);
        assert_eq!(sign(0.0), 1.0);
        assert_eq!(sign(-0.1), -1.0);
    }

    #[test]
    fn test_ms_to_samples() {
        assert_eq!(ms_to_samples(23, SAMPLE_RATE), 1014);
        assert_eq!(ms_to_samples(1000, SAMPLE_RATE), 44_100);
        assert_eq!(ms_to_samples(0, SAMPLE_RATE), 0);
    }
}
