//! Stomp Core - Effects Engine
//!
//! This crate wires the `stomp_dsp` effects into a running engine:
//! - Chain assembly from a JSON config (with platform config paths)
//! - A processing thread fed through bounded crossbeam channels
//! - A cloneable control surface for pedals, keys, or scripts
//! - Status events for whatever display is attached
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      Control Thread(s)                      │
//! │   pedal/keys ──Command──▶ Controls ──Event──▶ status display │
//! └─────────────────────────────────────────────────────────────┘
//!                     │ Arc<Parameter>, Arc<Rotator>, Arc<Looper>
//!                     ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      Processing Thread                      │
//! │   bytes ──decode──▶ ProcessorChain ──encode──▶ bytes        │
//! └─────────────────────────────────────────────────────────────┘
//! ```

mod config;
mod controls;
mod engine;
mod error;
mod message;

pub use config::{DistortionConfig, EffectKind, EngineConfig, FilterConfig, ReverbConfig};
pub use controls::{build_chain, Controls};
pub use engine::Engine;
pub use error::{EngineError, EngineResult};
pub use message::{Command, EffectStatus, Event, Step};

// Re-export DSP types for convenience
pub use stomp_dsp::{decode, encode, DspError, LoopState, SAMPLE_RATE};
