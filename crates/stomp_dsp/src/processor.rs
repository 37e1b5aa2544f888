//! Batch Processor Trait
//!
//! Defines the interface for chainable effects.
//! Allows building linear pipelines (decode -> Distortion -> Reverb -> encode).

use std::sync::Arc;

use crate::distortion::Distortion;
use crate::error::DspError;
use crate::filter::Filter;
use crate::looper::Looper;
use crate::reverb::Reverb;
use crate::sample::{decode, encode};
use crate::warp::Warp;

/// Trait for effects in the processing chain
///
/// Per-sample effects return a batch of the same length. Windowed effects
/// may hold samples back, so the output can be shorter or longer than the
/// input.
pub trait BatchProcessor: Send {
    /// Process one batch
    fn process(&mut self, batch: Vec<i16>) -> Result<Vec<i16>, DspError>;

    /// Human-readable name for logs and status display
    fn name(&self) -> &'static str;

    /// Whether this processor is currently enabled
    fn is_enabled(&self) -> bool {
        true
    }
}

/// A chain of processors applied sequentially
#[derive(Default)]
pub struct ProcessorChain {
    processors: Vec<Box<dyn BatchProcessor>>,
}

impl ProcessorChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a processor to the end of the chain
    pub fn add<P: BatchProcessor + 'static>(&mut self, processor: P) {
        self.processors.push(Box::new(processor));
    }

    /// Run a batch through all enabled processors
    pub fn process(&mut self, batch: Vec<i16>) -> Result<Vec<i16>, DspError> {
        self.processors
            .iter_mut()
            .filter(|p| p.is_enabled())
            .try_fold(batch, |batch, p| p.process(batch))
    }

    /// Decode, process, and re-encode a wire batch
    pub fn process_encoded(&mut self, bytes: &[u8]) -> Result<Vec<u8>, DspError> {
        let samples = decode(bytes)?;
        let processed = self.process(samples)?;
        Ok(encode(&processed))
    }

    /// Names of the processors in order
    pub fn names(&self) -> Vec<&'static str> {
        self.processors.iter().map(|p| p.name()).collect()
    }

    /// Get number of processors in chain
    pub fn len(&self) -> usize {
        self.processors.len()
    }

    /// Check if chain is empty
    pub fn is_empty(&self) -> bool {
        self.processors.is_empty()
    }
}

impl BatchProcessor for Distortion {
    fn process(&mut self, mut batch: Vec<i16>) -> Result<Vec<i16>, DspError> {
        for sample in batch.iter_mut() {
            *sample = self.apply(*sample);
        }
        Ok(batch)
    }

    fn name(&self) -> &'static str {
        "Distortion"
    }
}

impl BatchProcessor for Reverb {
    fn process(&mut self, mut batch: Vec<i16>) -> Result<Vec<i16>, DspError> {
        for sample in batch.iter_mut() {
            *sample = self.apply(*sample);
        }
        Ok(batch)
    }

    fn name(&self) -> &'static str {
        "Reverb"
    }
}

impl BatchProcessor for Arc<Looper> {
    fn process(&mut self, mut batch: Vec<i16>) -> Result<Vec<i16>, DspError> {
        for sample in batch.iter_mut() {
            *sample = self.apply(*sample);
        }
        Ok(batch)
    }

    fn name(&self) -> &'static str {
        "Loop"
    }
}

impl BatchProcessor for Filter {
    fn process(&mut self, batch: Vec<i16>) -> Result<Vec<i16>, DspError> {
        Ok(Filter::process(self, &batch))
    }

    fn name(&self) -> &'static str {
        "Filter"
    }
}

impl BatchProcessor for Warp {
    fn process(&mut self, batch: Vec<i16>) -> Result<Vec<i16>, DspError> {
        Warp::process(self, &batch)
    }

    fn name(&self) -> &'static str {
        "Warp"
    }
}
