//! Configuration loading and typed config structures for the engine binary.
//!
//! The canonical configuration lives in `volition-config.yaml` at the
//! project root. This module defines strongly-typed structs that mirror
//! the YAML structure, and provides a loader that reads the file. Every
//! field has a default, so a missing file or a partial file still yields
//! a runnable engine.

use std::path::Path;

use serde::Deserialize;
use volition_actions::SearchConfig;
use volition_robot::MotionConfig;

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level engine configuration.
///
/// Mirrors the structure of `volition-config.yaml`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct EngineConfig {
    /// Tick cadence and run bounds.
    #[serde(default)]
    pub control: ControlConfig,

    /// Physical limits for the simulated robot.
    #[serde(default)]
    pub motion: MotionConfig,

    /// Tuning for the object-search sweep.
    #[serde(default)]
    pub search: SearchConfig,

    /// The scripted demo scenario.
    #[serde(default)]
    pub demo: DemoConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl EngineConfig {
    /// Load configuration from a YAML file at the given path.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read, or
    /// [`ConfigError::Yaml`] if the content is not valid YAML.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Parse configuration from a YAML string.
    ///
    /// Blank input yields the default configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: Self = serde_yml::from_str(yaml)?;
        Ok(config)
    }
}

/// Tick cadence and run bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct ControlConfig {
    /// Simulated milliseconds per tick.
    #[serde(default = "default_tick_step_ms")]
    pub tick_step_ms: u64,

    /// Wall-clock milliseconds to sleep between ticks (0 = run flat out).
    #[serde(default)]
    pub tick_interval_ms: u64,

    /// Maximum ticks before the run is cut off.
    #[serde(default = "default_max_ticks")]
    pub max_ticks: u64,
}

impl Default for ControlConfig {
    fn default() -> Self {
        Self {
            tick_step_ms: default_tick_step_ms(),
            tick_interval_ms: 0,
            max_ticks: default_max_ticks(),
        }
    }
}

/// The scripted demo scenario: a head move and a drive-out sequence,
/// then a retry-wrapped search with a sighting injected at a fixed tick.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct DemoConfig {
    /// How far the drive-out leg goes, millimeters.
    #[serde(default = "default_drive_distance_mm")]
    pub drive_distance_mm: f32,

    /// Drive speed, mm/s.
    #[serde(default = "default_drive_speed_mmps")]
    pub drive_speed_mmps: f32,

    /// The turn after the drive, degrees.
    #[serde(default = "default_turn_angle_deg")]
    pub turn_angle_deg: f32,

    /// Turn speed, rad/s.
    #[serde(default = "default_turn_speed_radps")]
    pub turn_speed_radps: f32,

    /// Head angle to settle at while driving out, degrees.
    #[serde(default = "default_head_angle_deg")]
    pub head_angle_deg: f32,

    /// Pause at the end of the drive-out sequence, milliseconds.
    #[serde(default = "default_pause_ms")]
    pub pause_ms: u64,

    /// Retry budget for the search.
    #[serde(default = "default_search_max_retries")]
    pub search_max_retries: u8,

    /// Tick on which the scripted vision source reports the object
    /// (0 = never, letting the search run out of retries).
    #[serde(default = "default_observe_object_at_tick")]
    pub observe_object_at_tick: u64,
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            drive_distance_mm: default_drive_distance_mm(),
            drive_speed_mmps: default_drive_speed_mmps(),
            turn_angle_deg: default_turn_angle_deg(),
            turn_speed_radps: default_turn_speed_radps(),
            head_angle_deg: default_head_angle_deg(),
            pause_ms: default_pause_ms(),
            search_max_retries: default_search_max_retries(),
            observe_object_at_tick: default_observe_object_at_tick(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

// ---------------------------------------------------------------------------
// Default value functions (serde default requires named functions)
// ---------------------------------------------------------------------------

const fn default_tick_step_ms() -> u64 {
    33
}

const fn default_max_ticks() -> u64 {
    2000
}

const fn default_drive_distance_mm() -> f32 {
    150.0
}

const fn default_drive_speed_mmps() -> f32 {
    60.0
}

const fn default_turn_angle_deg() -> f32 {
    90.0
}

const fn default_turn_speed_radps() -> f32 {
    2.0
}

const fn default_head_angle_deg() -> f32 {
    20.0
}

const fn default_pause_ms() -> u64 {
    500
}

const fn default_search_max_retries() -> u8 {
    2
}

const fn default_observe_object_at_tick() -> u64 {
    180
}

fn default_log_level() -> String {
    "info".to_owned()
}
