//! Band-limited Filter
//!
//! Cascaded BiQuad sections (RBJ Audio EQ Cookbook) run one window at a time
//! through a [`WindowedBuffer`]. Cutoff bounds and the active filter family
//! live in a shared [`FilterControls`] handle; the window transform picks up
//! changes at the next window boundary.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use biquad::{Biquad, Coefficients, DirectForm2Transposed, ToHertz, Type, Q_BUTTERWORTH_F32};
use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::error::DspError;
use crate::rotator::Rotator;
use crate::sample::saturate_f64;
use crate::window::{WindowTransform, WindowedBuffer};

/// Highest cutoff accepted as a bound (Hz)
pub const MAX_CUTOFF: f32 = 30_000.0;
/// Default window length in samples
pub const FILTER_WINDOW_SIZE: usize = 1024;

/// Lowest frequency a section is ever tuned to (Hz)
const MIN_SECTION_HZ: f32 = 1.0;
/// Highest tuning as a fraction of the sample rate, kept below Nyquist
const MAX_SECTION_RATIO: f32 = 0.49;

/// Filter family
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterKind {
    /// Pass between the min and max cutoffs
    BandPass,
    /// Pass above the min cutoff
    HighPass,
    /// Four cascaded low-pass sections at the max cutoff
    LowPassFourStage,
    /// One low-pass section at the max cutoff
    LowPassSingleStage,
}

impl FilterKind {
    /// Every family, in rotation order
    pub fn catalog() -> Vec<FilterKind> {
        vec![
            FilterKind::BandPass,
            FilterKind::HighPass,
            FilterKind::LowPassFourStage,
            FilterKind::LowPassSingleStage,
        ]
    }

    pub fn name(&self) -> &'static str {
        match self {
            FilterKind::BandPass => "Band pass",
            FilterKind::HighPass => "High pass",
            FilterKind::LowPassFourStage => "Low pass (four stage)",
            FilterKind::LowPassSingleStage => "Low pass (single stage)",
        }
    }

    /// Section coefficients for the given bounds
    fn sections(
        &self,
        bounds: FilterSettings,
        sample_rate: f32,
    ) -> Result<Vec<Coefficients<f32>>, DspError> {
        let section = |filter: Type<f32>, cutoff: f32| {
            let cutoff = cutoff.clamp(MIN_SECTION_HZ, sample_rate * MAX_SECTION_RATIO);
            Coefficients::<f32>::from_params(filter, sample_rate.hz(), cutoff.hz(), Q_BUTTERWORTH_F32)
                .map_err(|_| DspError::InvalidCoefficients {
                    frequency: cutoff,
                    sample_rate,
                })
        };

        match self {
            FilterKind::BandPass => Ok(vec![
                section(Type::HighPass, bounds.min)?,
                section(Type::LowPass, bounds.max)?,
            ]),
            FilterKind::HighPass => Ok(vec![section(Type::HighPass, bounds.min)?]),
            FilterKind::LowPassFourStage => {
                let low = section(Type::LowPass, bounds.max)?;
                Ok(vec![low; 4])
            }
            FilterKind::LowPassSingleStage => Ok(vec![section(Type::LowPass, bounds.max)?]),
        }
    }
}

/// Cutoff bounds in Hz
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FilterSettings {
    pub min: f32,
    pub max: f32,
}

impl Default for FilterSettings {
    fn default() -> Self {
        Self {
            min: 0.0,
            max: MAX_CUTOFF,
        }
    }
}

/// Shared control surface for a [`Filter`]
///
/// Every change bumps a generation counter so the processing side knows to
/// rebuild its sections.
#[derive(Debug)]
pub struct FilterControls {
    kinds: Rotator<FilterKind>,
    bounds: Mutex<FilterSettings>,
    generation: AtomicU64,
}

impl FilterControls {
    pub fn new(catalog: Vec<FilterKind>, bounds: FilterSettings) -> Result<Self, DspError> {
        Ok(Self {
            kinds: Rotator::new(catalog)?,
            bounds: Mutex::new(bounds),
            generation: AtomicU64::new(0),
        })
    }

    fn bump(&self) {
        self.generation.fetch_add(1, Ordering::AcqRel);
    }

    pub fn next_algorithm(&self) -> &'static str {
        let name = self.kinds.next().name();
        self.bump();
        name
    }

    pub fn prev_algorithm(&self) -> &'static str {
        let name = self.kinds.prev().name();
        self.bump();
        name
    }

    pub fn current_algorithm(&self) -> &'static str {
        self.kinds.current().name()
    }

    pub fn kind(&self) -> FilterKind {
        *self.kinds.current()
    }

    /// Set the lower cutoff; negative values become zero
    pub fn set_min(&self, min: f32) -> f32 {
        let min = min.clamp(0.0, MAX_CUTOFF);
        self.bounds.lock().min = min;
        self.bump();
        min
    }

    /// Set the upper cutoff, limited to [`MAX_CUTOFF`]
    pub fn set_max(&self, max: f32) -> f32 {
        let max = max.clamp(0.0, MAX_CUTOFF);
        self.bounds.lock().max = max;
        self.bump();
        max
    }

    pub fn min(&self) -> f32 {
        self.bounds.lock().min
    }

    pub fn max(&self) -> f32 {
        self.bounds.lock().max
    }

    pub fn bounds(&self) -> FilterSettings {
        *self.bounds.lock()
    }

    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }
}

/// Window transform holding the live filter sections
pub struct FilterWindow {
    controls: Arc<FilterControls>,
    sample_rate: f32,
    generation: u64,
    kind: FilterKind,
    sections: Vec<DirectForm2Transposed<f32>>,
}

impl FilterWindow {
    fn new(controls: Arc<FilterControls>, sample_rate: f32) -> Result<Self, DspError> {
        let generation = controls.generation();
        let kind = controls.kind();
        let sections = kind
            .sections(controls.bounds(), sample_rate)?
            .into_iter()
            .map(DirectForm2Transposed::<f32>::new)
            .collect();
        Ok(Self {
            controls,
            sample_rate,
            generation,
            kind,
            sections,
        })
    }

    fn refresh(&mut self) {
        let generation = self.controls.generation();
        if generation == self.generation {
            return;
        }
        self.generation = generation;

        let kind = self.controls.kind();
        let bounds = self.controls.bounds();
        let coefficients = match kind.sections(bounds, self.sample_rate) {
            Ok(coefficients) => coefficients,
            Err(e) => {
                warn!("Keeping previous filter: {}", e);
                return;
            }
        };

        if kind == self.kind {
            // Same topology: retune without dropping filter state
            for (section, coeffs) in self.sections.iter_mut().zip(coefficients) {
                section.update_coefficients(coeffs);
            }
        } else {
            self.kind = kind;
            self.sections = coefficients
                .into_iter()
                .map(DirectForm2Transposed::<f32>::new)
                .collect();
        }
        debug!(
            "Rebuilt {} filter ({:.2}Hz - {:.2}Hz)",
            kind.name(),
            bounds.min,
            bounds.max
        );
    }
}

impl WindowTransform for FilterWindow {
    fn transform(&mut self, window: &mut [i16]) {
        self.refresh();
        for sample in window.iter_mut() {
            let mut x = *sample as f32 / 32_768.0;
            for section in &mut self.sections {
                x = section.run(x);
            }
            *sample = saturate_f64((x * 32_768.0).round() as f64);
        }
    }
}

/// Windowed band-limiting filter
pub struct Filter {
    controls: Arc<FilterControls>,
    buffer: WindowedBuffer<FilterWindow>,
}

impl Filter {
    /// Create a filter
    ///
    /// # Arguments
    /// * `sample_rate` - Stream sample rate in Hz
    /// * `window_size` - Samples per processing window
    /// * `catalog` - Filter families to rotate through, first one active
    pub fn new(
        sample_rate: f32,
        window_size: usize,
        catalog: Vec<FilterKind>,
    ) -> Result<Self, DspError> {
        if sample_rate.is_nan() || sample_rate <= 0.0 {
            return Err(DspError::InvalidSampleRate(sample_rate));
        }
        let controls = Arc::new(FilterControls::new(catalog, FilterSettings::default())?);
        let window = FilterWindow::new(Arc::clone(&controls), sample_rate)?;
        Ok(Self {
            controls,
            buffer: WindowedBuffer::new(window_size, window)?,
        })
    }

    /// Filter a batch; output lags input by up to one window
    pub fn process(&mut self, batch: &[i16]) -> Vec<i16> {
        self.buffer.process(batch)
    }

    /// Shared control handle
    pub fn controls(&self) -> Arc<FilterControls> {
        Arc::clone(&self.controls)
    }

    pub fn pending(&self) -> usize {
        self.buffer.pending()
    }
}
