//! Waveform Warp
//!
//! Splits the signal at zero crossings and replaces every half-cycle with a
//! synthetic shape of the same length and peak. A segment is only emitted
//! once the next crossing closes it, so output trails input by one
//! half-cycle.

use std::f64::consts::FRAC_PI_2;
use std::fmt;
use std::sync::Arc;

use crate::error::DspError;
use crate::rotator::Rotator;
use crate::sample::magnitude;

/// Synthetic half-cycle shape
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WarpShape {
    Square,
    Sawtooth,
    Triangle,
    Sine,
    SemiCircle,
}

impl WarpShape {
    /// Every shape, in rotation order
    pub fn catalog() -> Vec<WarpShape> {
        vec![
            WarpShape::Square,
            WarpShape::Sawtooth,
            WarpShape::Triangle,
            WarpShape::Sine,
            WarpShape::SemiCircle,
        ]
    }

    pub fn name(&self) -> &'static str {
        match self {
            WarpShape::Square => "Square",
            WarpShape::Sawtooth => "Sawtooth",
            WarpShape::Triangle => "Triangle",
            WarpShape::Sine => "Sine",
            WarpShape::SemiCircle => "Semi-circle",
        }
    }

    /// Render one half-cycle of `length` samples peaking at `peak`
    ///
    /// A negative peak is rejected; a zero length yields nothing.
    pub fn render(&self, length: usize, peak: i16) -> Result<Vec<i16>, DspError> {
        if peak < 0 {
            return Err(DspError::NegativePeak(peak as i32));
        }
        if length == 0 {
            return Ok(Vec::new());
        }

        let peak = peak as f64;
        let samples = match self {
            WarpShape::Square => vec![peak as i16; length],
            WarpShape::Sawtooth => (0..length)
                .map(|i| (i as f64 / length as f64 * peak) as i16)
                .collect(),
            WarpShape::Triangle => rise_and_fall(length, |p| peak * p),
            WarpShape::Sine => rise_and_fall(length, |p| peak * (p * FRAC_PI_2).sin()),
            WarpShape::SemiCircle => (0..length)
                .map(|i| {
                    let x = i as f64 / length as f64;
                    (peak * 2.0 * (x * (1.0 - x)).sqrt()) as i16
                })
                .collect(),
        };
        Ok(samples)
    }
}

/// Rise over the first half, fall over the rest
///
/// The fall stops one step short of zero so consecutive half-cycles tile.
fn rise_and_fall(length: usize, curve: impl Fn(f64) -> f64) -> Vec<i16> {
    let up = length / 2;
    let down = length - up;
    let rise = (0..up).map(|i| curve(i as f64 / up as f64) as i16);
    let fall = (0..down).map(|i| curve(1.0 - i as f64 / down as f64) as i16);
    rise.chain(fall).collect()
}

impl fmt::Display for WarpShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct Segment {
    negative: bool,
    length: usize,
    peak: i16,
}

/// Zero-crossing segmenter feeding a [`WarpShape`]
#[derive(Debug, Default)]
pub struct WarpSegmenter {
    segment: Segment,
}

impl WarpSegmenter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one sample, appending any closed segment to `out`
    pub fn push(
        &mut self,
        shape: WarpShape,
        sample: i16,
        out: &mut Vec<i16>,
    ) -> Result<(), DspError> {
        let negative = sample < 0;
        if self.segment.length > 0 && negative == self.segment.negative {
            self.segment.length += 1;
            self.segment.peak = self.segment.peak.max(magnitude(sample));
            return Ok(());
        }

        // Crossing, or the very first sample (closing an empty segment)
        let closed = std::mem::replace(
            &mut self.segment,
            Segment {
                negative,
                length: 1,
                peak: magnitude(sample),
            },
        );
        let rendered = shape.render(closed.length, closed.peak)?;
        if closed.negative {
            out.extend(rendered.into_iter().map(|s| -s));
        } else {
            out.extend(rendered);
        }
        Ok(())
    }

    /// Segment a whole batch with one shape
    pub fn process(&mut self, shape: WarpShape, batch: &[i16]) -> Result<Vec<i16>, DspError> {
        let mut out = Vec::with_capacity(batch.len());
        for &sample in batch {
            self.push(shape, sample, &mut out)?;
        }
        Ok(out)
    }

    /// Samples held in the open segment
    pub fn pending(&self) -> usize {
        self.segment.length
    }
}

/// Warp effect: a segmenter plus a selectable shape
pub struct Warp {
    shapes: Arc<Rotator<WarpShape>>,
    segmenter: WarpSegmenter,
}

impl Warp {
    pub fn new(catalog: Vec<WarpShape>) -> Result<Self, DspError> {
        Ok(Self {
            shapes: Arc::new(Rotator::new(catalog)?),
            segmenter: WarpSegmenter::new(),
        })
    }

    /// Warp a batch with the currently selected shape
    pub fn process(&mut self, batch: &[i16]) -> Result<Vec<i16>, DspError> {
        let shape = *self.shapes.current();
        self.segmenter.process(shape, batch)
    }

    /// Shared shape selector, for control code
    pub fn shapes(&self) -> Arc<Rotator<WarpShape>> {
        Arc::clone(&self.shapes)
    }

    pub fn next_algorithm(&self) -> &'static str {
        self.shapes.next().name()
    }

    pub fn prev_algorithm(&self) -> &'static str {
        self.shapes.prev().name()
    }

    pub fn current_algorithm(&self) -> &'static str {
        self.shapes.current().name()
    }
}
