//! Engine Configuration
//!
//! Loaded from JSON, falling back to defaults.
//!
//! # Storage Locations
//! - Linux: `~/.config/stomp/config.json`
//! - Windows: `%APPDATA%\stomp\config.json`
//! - macOS: `~/Library/Application Support/stomp/config.json`

use std::fs;
use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use stomp_dsp::{
    DEFAULT_DELAYS_MS, FILTER_WINDOW_SIZE, MAX_AMPLIFICATION, MAX_CUTOFF, MIN_AMPLIFICATION,
    SAMPLE_RATE,
};

use crate::error::{EngineError, EngineResult};

/// An effect that can be placed in the chain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EffectKind {
    Distortion,
    Reverb,
    Filter,
    Warp,
    Loop,
}

impl EffectKind {
    pub fn name(&self) -> &'static str {
        match self {
            EffectKind::Distortion => "Distortion",
            EffectKind::Reverb => "Reverb",
            EffectKind::Filter => "Filter",
            EffectKind::Warp => "Warp",
            EffectKind::Loop => "Loop",
        }
    }
}

/// Distortion control settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DistortionConfig {
    /// Multiplier applied per pedal press
    pub scale_factor: f64,

    /// Samples over which each amplification change glides
    pub ramp_steps: u32,
}

impl Default for DistortionConfig {
    fn default() -> Self {
        Self {
            scale_factor: 1.1,
            // A tenth of a second
            ramp_steps: SAMPLE_RATE / 10,
        }
    }
}

/// Reverb settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReverbConfig {
    pub initial_decay: f64,

    /// Comb delays in milliseconds
    pub delays_ms: Vec<u32>,

    /// Step applied per decay adjustment
    pub decay_step: f64,
}

impl Default for ReverbConfig {
    fn default() -> Self {
        Self {
            initial_decay: 0.9,
            delays_ms: DEFAULT_DELAYS_MS.to_vec(),
            decay_step: 0.01,
        }
    }
}

/// Filter settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilterConfig {
    pub window_size: usize,

    /// Lowest cutoff reachable by scaling (Hz)
    pub min_cutoff: f32,

    /// Multiplier applied per cutoff step
    pub scale_factor: f32,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            window_size: FILTER_WINDOW_SIZE,
            min_cutoff: 0.1,
            scale_factor: 1.1,
        }
    }
}

/// Overall engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Sample rate in Hz
    pub sample_rate: u32,

    /// Effects in processing order
    pub chain: Vec<EffectKind>,

    #[serde(default)]
    pub distortion: DistortionConfig,

    #[serde(default)]
    pub reverb: ReverbConfig,

    #[serde(default)]
    pub filter: FilterConfig,

    /// Gain applied to input recorded into loop layers, in (0, 1]
    pub loop_amplification: f64,

    /// Capacity of the inbound batch channel
    pub channel_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            sample_rate: SAMPLE_RATE,
            chain: vec![EffectKind::Distortion, EffectKind::Reverb, EffectKind::Loop],
            distortion: DistortionConfig::default(),
            reverb: ReverbConfig::default(),
            filter: FilterConfig::default(),
            loop_amplification: 0.8,
            channel_capacity: 64,
        }
    }
}

impl EngineConfig {
    /// Config for one effect on its own
    pub fn single(effect: EffectKind) -> Self {
        Self {
            chain: vec![effect],
            ..Default::default()
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> EngineResult<()> {
        if self.sample_rate < 8000 || self.sample_rate > 192_000 {
            return Err(EngineError::ConfigError(format!(
                "Invalid sample rate: {}",
                self.sample_rate
            )));
        }
        if self.channel_capacity == 0 {
            return Err(EngineError::ConfigError("Channel capacity must be positive".into()));
        }
        let mut seen = Vec::with_capacity(self.chain.len());
        for effect in &self.chain {
            if seen.contains(effect) {
                return Err(EngineError::ConfigError(format!(
                    "{} appears more than once in the chain",
                    effect.name()
                )));
            }
            seen.push(*effect);
        }
        if !(self.distortion.scale_factor > 1.0
            && self.distortion.scale_factor < MAX_AMPLIFICATION / MIN_AMPLIFICATION)
        {
            return Err(EngineError::ConfigError(format!(
                "Invalid distortion scale factor: {}",
                self.distortion.scale_factor
            )));
        }
        if self.distortion.ramp_steps == 0 {
            return Err(EngineError::ConfigError("Distortion ramp must be at least one step".into()));
        }
        if !(self.reverb.decay_step > 0.0 && self.reverb.decay_step < 1.0) {
            return Err(EngineError::ConfigError(format!(
                "Invalid decay step: {}",
                self.reverb.decay_step
            )));
        }
        if !(self.filter.min_cutoff > 0.0 && self.filter.min_cutoff < MAX_CUTOFF) {
            return Err(EngineError::ConfigError(format!(
                "Invalid minimum cutoff: {}",
                self.filter.min_cutoff
            )));
        }
        if !(self.filter.scale_factor > 1.0) {
            return Err(EngineError::ConfigError(format!(
                "Invalid cutoff scale factor: {}",
                self.filter.scale_factor
            )));
        }
        // Remaining effect settings are checked by the effect constructors
        Ok(())
    }

    /// Default config file location, if the platform has one
    pub fn default_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", "stomp").map(|dirs| dirs.config_dir().join("config.json"))
    }

    /// Read a config file
    pub fn load_from(path: &Path) -> EngineResult<Self> {
        let file = fs::File::open(path)?;
        let config: EngineConfig = serde_json::from_reader(file)?;
        config.validate()?;
        info!("Config loaded from {:?}", path);
        Ok(config)
    }

    /// Load from the default location, or return default if missing/corrupt
    pub fn load() -> Self {
        if let Some(path) = Self::default_path() {
            if path.exists() {
                match Self::load_from(&path) {
                    Ok(config) => return config,
                    Err(e) => error!("Failed to load config: {}", e),
                }
            }
        }

        info!("Using default config");
        Self::default()
    }

    /// Write a config file, creating parent directories
    pub fn save_to(&self, path: &Path) -> EngineResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let file = fs::File::create(path)?;
        serde_json::to_writer_pretty(file, self)?;
        info!("Config saved to {:?}", path);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = EngineConfig::default();
        assert_eq!(config.sample_rate, 44_100);
        assert_eq!(config.distortion.ramp_steps, 4_410);
        assert_eq!(config.reverb.delays_ms.len(), 17);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validation() {
        let invalid_rate = EngineConfig {
            sample_rate: 100,
            ..Default::default()
        };
        assert!(invalid_rate.validate().is_err());

        let duplicate = EngineConfig {
            chain: vec![EffectKind::Reverb, EffectKind::Reverb],
            ..Default::default()
        };
        assert!(duplicate.validate().is_err());

        let mut no_ramp = EngineConfig::default();
        no_ramp.distortion.ramp_steps = 0;
        assert!(no_ramp.validate().is_err());

        let mut bad_scale = EngineConfig::default();
        bad_scale.filter.scale_factor = 0.9;
        assert!(bad_scale.validate().is_err());

        assert!(EngineConfig::single(EffectKind::Warp).validate().is_ok());
    }

    #[test]
    fn test_config_serialization() {
        let config = EngineConfig::single(EffectKind::Filter);
        let json = serde_json::to_string(&config).unwrap();
        assert!(json.contains("\"Filter\""));
        let deserialized: EngineConfig = serde_json::from_str(&json).unwrap();

        assert_eq!(deserialized.chain, vec![EffectKind::Filter]);
        assert_eq!(deserialized.sample_rate, config.sample_rate);
    }

    #[test]
    fn test_sections_default_when_missing() {
        let json = r#"{
            "sample_rate": 48000,
            "chain": ["Loop"],
            "loop_amplification": 0.5,
            "channel_capacity": 8
        }"#;
        let config: EngineConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.reverb.initial_decay, 0.9);
        assert_eq!(config.filter.window_size, 1024);
    }

    #[test]
    fn test_save_and_load() {
        let dir = std::env::temp_dir().join(format!("stomp-config-test-{}", std::process::id()));
        let path = dir.join("config.json");
        let config = EngineConfig::single(EffectKind::Reverb);
        config.save_to(&path).unwrap();

        let loaded = EngineConfig::load_from(&path).unwrap();
        assert_eq!(loaded.chain, vec![EffectKind::Reverb]);

        std::fs::remove_dir_all(&dir).unwrap();
    }
}
