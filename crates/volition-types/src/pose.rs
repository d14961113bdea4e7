//! Planar robot pose and wrap-aware angle helpers.
//!
//! Headings are radians in the half-open interval `(-PI, PI]`. All angle
//! arithmetic goes through [`normalize_angle_rad`] and [`angle_diff_rad`] so
//! turns always take the short way around the circle.

use std::f32::consts::{PI, TAU};

use serde::{Deserialize, Serialize};

/// A robot pose on the driving plane: position in millimeters plus heading.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Pose2 {
    /// X position in millimeters.
    pub x_mm: f32,
    /// Y position in millimeters.
    pub y_mm: f32,
    /// Heading in radians, normalized to `(-PI, PI]`.
    pub heading_rad: f32,
}

impl Pose2 {
    /// Build a pose, normalizing the heading.
    pub fn new(x_mm: f32, y_mm: f32, heading_rad: f32) -> Self {
        Self {
            x_mm,
            y_mm,
            heading_rad: normalize_angle_rad(heading_rad),
        }
    }

    /// Straight-line distance to another pose, in millimeters.
    pub fn distance_to(self, other: Self) -> f32 {
        let dx = other.x_mm - self.x_mm;
        let dy = other.y_mm - self.y_mm;
        dx.hypot(dy)
    }

    /// The pose reached by driving `distance_mm` along the current heading.
    ///
    /// Negative distances move backward.
    pub fn advanced(self, distance_mm: f32) -> Self {
        Self {
            x_mm: distance_mm.mul_add(self.heading_rad.cos(), self.x_mm),
            y_mm: distance_mm.mul_add(self.heading_rad.sin(), self.y_mm),
            heading_rad: self.heading_rad,
        }
    }

    /// The same position with a new (normalized) heading.
    pub fn with_heading(self, heading_rad: f32) -> Self {
        Self {
            heading_rad: normalize_angle_rad(heading_rad),
            ..self
        }
    }
}

/// Normalize an angle to the half-open interval `(-PI, PI]`.
pub fn normalize_angle_rad(angle_rad: f32) -> f32 {
    let wrapped = angle_rad.rem_euclid(TAU);
    if wrapped > PI { wrapped - TAU } else { wrapped }
}

/// Signed shortest-arc difference `target - current`, in `(-PI, PI]`.
///
/// Positive means the shortest turn is counterclockwise.
pub fn angle_diff_rad(target_rad: f32, current_rad: f32) -> f32 {
    normalize_angle_rad(target_rad - current_rad)
}
