//! Message Types for Thread Communication
//!
//! Commands flow from the control source (pedal, keyboard, CLI) -> Controls
//! Events flow from Controls and the processing thread -> status display

use serde::{Deserialize, Serialize};

use crate::config::EffectKind;

/// Direction of a stepped adjustment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Step {
    Up,
    Down,
}

/// Control operations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Command {
    /// Rotate an effect's algorithm forward
    NextAlgorithm(EffectKind),

    /// Rotate an effect's algorithm backward
    PrevAlgorithm(EffectKind),

    /// Set reverb decay immediately
    SetDecay(f64),

    /// Move reverb decay by the configured step
    StepDecay(Step),

    /// Glide reverb decay to a target over a number of samples
    RampDecay { target: f64, steps: u32 },

    /// Set distortion amplification immediately
    SetAmplification(f64),

    /// Multiply or divide amplification by the configured factor, ramped
    ScaleAmplification(Step),

    /// Set the filter's lower cutoff (Hz)
    SetFilterMin(f32),

    /// Set the filter's upper cutoff (Hz)
    SetFilterMax(f32),

    /// Scale the lower cutoff by the configured factor
    ScaleFilterMin(Step),

    /// Scale the upper cutoff by the configured factor
    ScaleFilterMax(Step),

    /// Advance the loop pedal state machine
    Loop,

    /// Discard the most recent loop recording
    ClearLoop,

    /// Request current state (triggers StateUpdate event)
    RequestState,
}

/// Snapshot of one effect's controls
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EffectStatus {
    pub effect: EffectKind,
    pub algorithm: Option<String>,
}

/// Events published to the status display
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum Event {
    /// Processing thread started
    Started,

    /// Processing thread stopped
    Stopped,

    /// Error occurred
    Error { message: String },

    /// An effect switched algorithm
    AlgorithmChanged { effect: EffectKind, algorithm: String },

    /// Reverb decay goal changed
    DecayChanged { decay: f64 },

    /// Distortion amplification goal changed
    AmplificationChanged { factor: f64 },

    /// Filter cutoff bounds changed
    FilterBoundsChanged { min: f32, max: f32 },

    /// Loop pedal moved to a new state
    LoopStateChanged { state: String },

    /// Current state snapshot
    StateUpdate {
        is_running: bool,
        effects: Vec<EffectStatus>,
        decay: Option<f64>,
        amplification: Option<f64>,
        filter_bounds: Option<(f32, f32)>,
        loop_state: Option<String>,
    },
}

impl Event {
    /// Create an error event from any error type
    pub fn error<E: std::fmt::Display>(err: E) -> Self {
        Event::Error {
            message: err.to_string(),
        }
    }
}
