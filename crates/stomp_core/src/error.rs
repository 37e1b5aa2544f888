//! Engine Error Types

use thiserror::Error;

/// Errors that can occur in the effects engine
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Engine not running")]
    NotRunning,

    #[error("Failed to spawn processing thread: {0}")]
    ThreadSpawn(String),

    #[error("Processing thread panicked")]
    ThreadPanicked,

    #[error("Effect {0} is not in the processing chain")]
    EffectNotLoaded(&'static str),

    #[error("Effect {0} has no algorithms to switch")]
    NoAlgorithms(&'static str),

    #[error("DSP error: {0}")]
    DspError(#[from] stomp_dsp::DspError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Channel send error - receiver dropped")]
    ChannelSendError,

    #[error("Channel receive error - sender dropped")]
    ChannelRecvError,
}

/// Result type alias for engine operations
pub type EngineResult<T> = Result<T, EngineError>;
