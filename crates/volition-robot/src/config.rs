//! Physical limits for the simulated robot.
//!
//! Speeds commanded by actions are clamped to these limits, and head/lift
//! targets are clamped into their travel ranges, mirroring what the motor
//! controllers on a real unit would do.

use serde::{Deserialize, Serialize};

/// Motion limits applied to every commanded move.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MotionConfig {
    /// Maximum wheel speed for straight driving, mm/s.
    #[serde(default = "default_max_wheel_speed_mmps")]
    pub max_wheel_speed_mmps: f32,
    /// Maximum rotation speed for in-place turns, rad/s.
    #[serde(default = "default_max_turn_speed_radps")]
    pub max_turn_speed_radps: f32,
    /// Maximum head pitch speed, rad/s.
    #[serde(default = "default_max_head_speed_radps")]
    pub max_head_speed_radps: f32,
    /// Maximum lift travel speed, mm/s.
    #[serde(default = "default_max_lift_speed_mmps")]
    pub max_lift_speed_mmps: f32,
    /// Lowest reachable head angle, radians.
    #[serde(default = "default_min_head_angle_rad")]
    pub min_head_angle_rad: f32,
    /// Highest reachable head angle, radians.
    #[serde(default = "default_max_head_angle_rad")]
    pub max_head_angle_rad: f32,
    /// Lowest reachable lift height, millimeters.
    #[serde(default = "default_min_lift_height_mm")]
    pub min_lift_height_mm: f32,
    /// Highest reachable lift height, millimeters.
    #[serde(default = "default_max_lift_height_mm")]
    pub max_lift_height_mm: f32,
}

impl Default for MotionConfig {
    fn default() -> Self {
        Self {
            max_wheel_speed_mmps: default_max_wheel_speed_mmps(),
            max_turn_speed_radps: default_max_turn_speed_radps(),
            max_head_speed_radps: default_max_head_speed_radps(),
            max_lift_speed_mmps: default_max_lift_speed_mmps(),
            min_head_angle_rad: default_min_head_angle_rad(),
            max_head_angle_rad: default_max_head_angle_rad(),
            min_lift_height_mm: default_min_lift_height_mm(),
            max_lift_height_mm: default_max_lift_height_mm(),
        }
    }
}

// --- Default value functions (serde default requires named functions) ---

const fn default_max_wheel_speed_mmps() -> f32 {
    220.0
}

const fn default_max_turn_speed_radps() -> f32 {
    3.0
}

const fn default_max_head_speed_radps() -> f32 {
    4.0
}

const fn default_max_lift_speed_mmps() -> f32 {
    120.0
}

const fn default_min_head_angle_rad() -> f32 {
    -0.44
}

const fn default_max_head_angle_rad() -> f32 {
    0.78
}

const fn default_min_lift_height_mm() -> f32 {
    32.0
}

const fn default_max_lift_height_mm() -> f32 {
    92.0
}
