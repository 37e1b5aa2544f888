//! Stomp DSP - Effects and Automation
//!
//! This crate provides the sample-domain effects for Stomp, including:
//! - Time-smoothed parameters that can be ramped from any thread
//! - Algorithm rotators for switching effect variants on the fly
//! - Comb-filter reverb, amplify-and-clip distortion, overdub looper
//! - Windowed effects (BiQuad filter, zero-crossing warp, pitch naming)
//!   that accept batches of any size
//!
//! # Architecture
//!
//! ```text
//!  bytes ──decode──▶ [Distortion] ──▶ [Reverb] ──▶ [Filter] ──▶ ... ──encode──▶ bytes
//!                        ▲               ▲            ▲
//!                        │ Arc<Parameter>, Arc<Rotator>, Arc<FilterControls>
//!                        └──────────── control thread ─────────────
//! ```
//!
//! Samples are signed 16-bit. Any arithmetic that could leave that range
//! saturates instead of wrapping.

mod clip;
mod comb;
mod distortion;
mod error;
mod filter;
mod looper;
mod param;
mod pitch;
mod processor;
mod reverb;
mod rotator;
mod sample;
mod warp;
mod window;

pub use clip::{
    ClipAlgorithm, DEFAULT_HARD_CEILING, DEFAULT_SQUARE_AMPLITUDE, DEFAULT_SQUARE_FLOOR,
};
pub use comb::{CombFilter, DecaySource};
pub use distortion::{Distortion, MAX_AMPLIFICATION, MIN_AMPLIFICATION};
pub use error::DspError;
pub use filter::{
    Filter, FilterControls, FilterKind, FilterSettings, FILTER_WINDOW_SIZE, MAX_CUTOFF,
};
pub use looper::{LoopState, Looper};
pub use param::Parameter;
pub use pitch::{
    note_name, PitchEstimator, PitchTracker, ZeroCrossingEstimator, PITCH_WINDOW_SIZE,
};
pub use processor::{BatchProcessor, ProcessorChain};
pub use reverb::{Reverb, DEFAULT_DELAYS_MS, MAX_DECAY, MIN_DECAY};
pub use rotator::Rotator;
pub use sample::{
    decode, denormalize, encode, magnitude, ms_to_samples, normalize, saturate, saturate_f64,
    SAMPLE_RATE,
};
pub use warp::{Warp, WarpSegmenter, WarpShape};
pub use window::{WindowTransform, WindowedBuffer};
