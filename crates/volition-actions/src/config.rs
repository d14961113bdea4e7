//! Tuning for the randomized object search.
//!
//! Every knob has a workable default, so a config file only needs to name
//! the values it wants to change. Angles are given in degrees here and
//! converted where the sweep is built.

use serde::{Deserialize, Serialize};

/// Tuning for [`SearchForNearbyObjectAction`](crate::SearchForNearbyObjectAction).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Shortest pause between sweep phases, milliseconds.
    #[serde(default = "default_min_wait_ms")]
    pub min_wait_ms: u64,
    /// Longest pause between sweep phases, milliseconds.
    #[serde(default = "default_max_wait_ms")]
    pub max_wait_ms: u64,
    /// Smallest sweep turn, degrees.
    #[serde(default = "default_min_sweep_deg")]
    pub min_sweep_deg: f32,
    /// Largest sweep turn, degrees.
    #[serde(default = "default_max_sweep_deg")]
    pub max_sweep_deg: f32,
    /// Rotation speed for sweep turns, rad/s.
    #[serde(default = "default_turn_speed_radps")]
    pub turn_speed_radps: f32,
    /// How close a sweep turn has to get to its goal heading, degrees.
    #[serde(default = "default_turn_tolerance_deg")]
    pub turn_tolerance_deg: f32,
    /// How far to back up before sweeping, millimeters. Zero skips the backup.
    #[serde(default = "default_backup_distance_mm")]
    pub backup_distance_mm: f32,
    /// Backup speed, mm/s.
    #[serde(default = "default_backup_speed_mmps")]
    pub backup_speed_mmps: f32,
    /// Head angle to hold while sweeping, radians.
    #[serde(default = "default_head_angle_rad")]
    pub head_angle_rad: f32,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            min_wait_ms: default_min_wait_ms(),
            max_wait_ms: default_max_wait_ms(),
            min_sweep_deg: default_min_sweep_deg(),
            max_sweep_deg: default_max_sweep_deg(),
            turn_speed_radps: default_turn_speed_radps(),
            turn_tolerance_deg: default_turn_tolerance_deg(),
            backup_distance_mm: default_backup_distance_mm(),
            backup_speed_mmps: default_backup_speed_mmps(),
            head_angle_rad: default_head_angle_rad(),
        }
    }
}

// --- Default value functions (serde default requires named functions) ---

const fn default_min_wait_ms() -> u64 {
    150
}

const fn default_max_wait_ms() -> u64 {
    350
}

const fn default_min_sweep_deg() -> f32 {
    30.0
}

const fn default_max_sweep_deg() -> f32 {
    60.0
}

const fn default_turn_speed_radps() -> f32 {
    2.0
}

const fn default_turn_tolerance_deg() -> f32 {
    4.0
}

const fn default_backup_distance_mm() -> f32 {
    40.0
}

const fn default_backup_speed_mmps() -> f32 {
    60.0
}

const fn default_head_angle_rad() -> f32 {
    0.35
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn defaults_describe_a_runnable_sweep() {
        let config = SearchConfig::default();
        assert!(config.min_wait_ms <= config.max_wait_ms);
        assert!(config.min_sweep_deg <= config.max_sweep_deg);
        assert!(config.turn_speed_radps > 0.0);
        assert!(config.turn_tolerance_deg > 0.0);
    }

    #[test]
    fn partial_json_fills_in_defaults() {
        let config: SearchConfig = serde_json::from_str(r#"{"backup_distance_mm": 0.0}"#).unwrap();
        assert!(config.backup_distance_mm.abs() < f32::EPSILON);
        assert_eq!(config.min_wait_ms, default_min_wait_ms());
        assert!((config.head_angle_rad - default_head_angle_rad()).abs() < f32::EPSILON);
    }
}
