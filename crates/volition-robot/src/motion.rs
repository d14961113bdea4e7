//! In-flight motion commands and their per-tick integration.
//!
//! The simulation here is deliberately simple: each subsystem moves toward
//! its target at constant speed and snaps exactly onto the target on the
//! tick it would overshoot. A command clears itself when it arrives, so
//! "no command in flight" doubles as the arrival signal.

use volition_types::pose::{Pose2, angle_diff_rad, normalize_angle_rad};

/// Residual drive distance below which a drive counts as arrived, mm.
const ARRIVAL_EPSILON_MM: f32 = 1e-3;

/// An in-flight wheel command.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum WheelCommand {
    /// Rotate in place toward an absolute heading.
    TurnTo {
        /// Target heading, radians in `(-PI, PI]`.
        target_rad: f32,
        /// Rotation speed, rad/s (always positive).
        speed_radps: f32,
    },
    /// Drive along the current heading.
    Drive {
        /// Signed distance still to cover, mm (negative means backward).
        remaining_mm: f32,
        /// Travel speed, mm/s (always positive).
        speed_mmps: f32,
    },
}

/// An in-flight single-axis move (head or lift).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AxisMove {
    /// Target position in the axis' native unit.
    pub target: f32,
    /// Travel speed in the axis' native unit per second (always positive).
    pub speed: f32,
}

/// Everything currently commanded of the robot's motors.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MotionState {
    wheels: Option<WheelCommand>,
    head: Option<AxisMove>,
    lift: Option<AxisMove>,
}

impl MotionState {
    /// Command an in-place turn to an absolute heading.
    pub const fn set_turn(&mut self, target_rad: f32, speed_radps: f32) {
        self.wheels = Some(WheelCommand::TurnTo {
            target_rad,
            speed_radps,
        });
    }

    /// Command a straight drive of `distance_mm` (negative for backward).
    pub const fn set_drive(&mut self, distance_mm: f32, speed_mmps: f32) {
        self.wheels = Some(WheelCommand::Drive {
            remaining_mm: distance_mm,
            speed_mmps,
        });
    }

    /// Command a head move.
    pub const fn set_head(&mut self, target_rad: f32, speed_radps: f32) {
        self.head = Some(AxisMove {
            target: target_rad,
            speed: speed_radps,
        });
    }

    /// Command a lift move.
    pub const fn set_lift(&mut self, target_mm: f32, speed_mmps: f32) {
        self.lift = Some(AxisMove {
            target: target_mm,
            speed: speed_mmps,
        });
    }

    /// Drop any in-flight wheel command.
    pub const fn stop_wheels(&mut self) {
        self.wheels = None;
    }

    /// Drop any in-flight head move.
    pub const fn stop_head(&mut self) {
        self.head = None;
    }

    /// Drop any in-flight lift move.
    pub const fn stop_lift(&mut self) {
        self.lift = None;
    }

    /// Drop every in-flight command.
    pub const fn stop_all(&mut self) {
        self.wheels = None;
        self.head = None;
        self.lift = None;
    }

    /// The in-flight wheel command, if any.
    pub const fn wheels(&self) -> Option<WheelCommand> {
        self.wheels
    }

    /// The in-flight head move, if any.
    pub const fn head(&self) -> Option<AxisMove> {
        self.head
    }

    /// The in-flight lift move, if any.
    pub const fn lift(&self) -> Option<AxisMove> {
        self.lift
    }

    /// Whether nothing is commanded.
    pub const fn is_idle(&self) -> bool {
        self.wheels.is_none() && self.head.is_none() && self.lift.is_none()
    }

    /// Advance every in-flight command by `dt_s` seconds.
    ///
    /// Mutates the given pose and axis positions in place. Commands clear
    /// themselves on arrival.
    pub fn step(&mut self, dt_s: f32, pose: &mut Pose2, head_rad: &mut f32, lift_mm: &mut f32) {
        let wheels_done = match self.wheels.as_mut() {
            Some(WheelCommand::TurnTo {
                target_rad,
                speed_radps,
            }) => {
                let (heading, arrived) =
                    step_heading(pose.heading_rad, *target_rad, *speed_radps, dt_s);
                *pose = pose.with_heading(heading);
                arrived
            }
            Some(WheelCommand::Drive {
                remaining_mm,
                speed_mmps,
            }) => {
                let step_mm = (*speed_mmps * dt_s)
                    .min(remaining_mm.abs())
                    .copysign(*remaining_mm);
                *pose = pose.advanced(step_mm);
                *remaining_mm -= step_mm;
                remaining_mm.abs() <= ARRIVAL_EPSILON_MM
            }
            None => false,
        };
        if wheels_done {
            self.wheels = None;
        }

        step_optional_axis(&mut self.head, head_rad, dt_s);
        step_optional_axis(&mut self.lift, lift_mm, dt_s);
    }
}

/// Advance one axis slot, clearing it on arrival.
fn step_optional_axis(slot: &mut Option<AxisMove>, value: &mut f32, dt_s: f32) {
    let done = match *slot {
        Some(axis) => {
            let (next, arrived) = step_axis(*value, axis.target, axis.speed, dt_s);
            *value = next;
            arrived
        }
        None => false,
    };
    if done {
        *slot = None;
    }
}

/// Move `current` toward `target` at `speed` for `dt_s` seconds.
///
/// Returns the new value and whether the target was reached (the value
/// snaps exactly onto the target on arrival).
pub fn step_axis(current: f32, target: f32, speed: f32, dt_s: f32) -> (f32, bool) {
    let delta = target - current;
    let max_step = speed.abs() * dt_s;
    if delta.abs() <= max_step {
        (target, true)
    } else {
        (current + max_step.copysign(delta), false)
    }
}

/// Like [`step_axis`] but wrap-aware: always takes the short way around.
pub fn step_heading(
    current_rad: f32,
    target_rad: f32,
    speed_radps: f32,
    dt_s: f32,
) -> (f32, bool) {
    let delta = angle_diff_rad(target_rad, current_rad);
    let max_step = speed_radps.abs() * dt_s;
    if delta.abs() <= max_step {
        (normalize_angle_rad(target_rad), true)
    } else {
        (normalize_angle_rad(current_rad + max_step.copysign(delta)), false)
    }
}
