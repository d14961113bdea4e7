//! Point-to-point motion: in-place turns, straight drives, head and lift
//! moves.
//!
//! Each action declares the lock for the subsystem it drives, issues its
//! motion command at init, polls the robot for convergence, and stops its
//! subsystem on cleanup so a cancelled move never keeps coasting.

use volition_core::{Action, ActionCtx};
use volition_robot::Robot;
use volition_types::{
    ActionResult, ActionType, CompletionInfo, LockSet, Pose2, angle_diff_rad, normalize_angle_rad,
};

/// Default heading tolerance for turns, degrees.
pub const DEFAULT_TURN_TOLERANCE_DEG: f32 = 4.0;

#[derive(Debug, Clone, Copy)]
enum TurnTarget {
    /// Turn by this much from the heading at init, radians.
    Relative(f32),
    /// Turn to this heading, radians.
    Absolute(f32),
}

/// Rotates the robot in place to a goal heading.
#[derive(Debug)]
pub struct TurnInPlaceAction {
    name: String,
    target: TurnTarget,
    speed_radps: f32,
    tolerance_rad: f32,
    goal_rad: Option<f32>,
}

impl TurnInPlaceAction {
    /// Turn by `angle_rad` relative to the heading the robot has at init.
    pub fn relative(angle_rad: f32, speed_radps: f32) -> Self {
        Self {
            name: format!("TurnInPlace{:+.0}deg", angle_rad.to_degrees()),
            target: TurnTarget::Relative(angle_rad),
            speed_radps,
            tolerance_rad: DEFAULT_TURN_TOLERANCE_DEG.to_radians(),
            goal_rad: None,
        }
    }

    /// Turn to the absolute heading `heading_rad`.
    pub fn absolute(heading_rad: f32, speed_radps: f32) -> Self {
        Self {
            name: format!("TurnTo{:.0}deg", heading_rad.to_degrees()),
            target: TurnTarget::Absolute(heading_rad),
            speed_radps,
            tolerance_rad: DEFAULT_TURN_TOLERANCE_DEG.to_radians(),
            goal_rad: None,
        }
    }

    /// Accept headings within `tolerance_deg` of the goal.
    #[must_use]
    pub fn with_tolerance_deg(mut self, tolerance_deg: f32) -> Self {
        self.tolerance_rad = tolerance_deg.to_radians();
        self
    }
}

impl Action for TurnInPlaceAction {
    fn name(&self) -> &str {
        &self.name
    }

    fn action_type(&self) -> ActionType {
        ActionType::TurnInPlace
    }

    fn locks(&self) -> LockSet {
        LockSet::WHEELS
    }

    fn init(&mut self, ctx: &mut ActionCtx<'_>) -> ActionResult {
        let goal = match self.target {
            TurnTarget::Relative(delta) => {
                normalize_angle_rad(ctx.robot.pose().heading_rad + delta)
            }
            TurnTarget::Absolute(heading) => normalize_angle_rad(heading),
        };
        self.goal_rad = Some(goal);
        ctx.robot.begin_turn_to(goal, self.speed_radps);
        ActionResult::Success
    }

    fn check_if_done(&mut self, ctx: &mut ActionCtx<'_>) -> ActionResult {
        let Some(goal) = self.goal_rad else {
            return ActionResult::FailureAbort;
        };
        let off_by = angle_diff_rad(ctx.robot.pose().heading_rad, goal).abs();
        if off_by <= self.tolerance_rad || ctx.robot.wheels_idle() {
            ActionResult::Success
        } else {
            ActionResult::Running
        }
    }

    fn on_reset(&mut self, _ctx: &mut ActionCtx<'_>) {
        self.goal_rad = None;
    }

    fn cleanup(&mut self, ctx: &mut ActionCtx<'_>) {
        ctx.robot.stop_wheels();
    }

    fn completion_info(&self, robot: &Robot) -> CompletionInfo {
        CompletionInfo::Turned {
            final_heading_rad: robot.pose().heading_rad,
        }
    }
}

/// Drives the robot straight for a signed distance.
///
/// A negative distance drives backward. The speed is kept positive; the
/// sign of the distance alone picks the direction.
#[derive(Debug)]
pub struct DriveStraightAction {
    name: String,
    distance_mm: f32,
    speed_mmps: f32,
    start: Option<Pose2>,
}

impl DriveStraightAction {
    /// Drive `distance_mm` along the current heading at `speed_mmps`.
    pub fn new(distance_mm: f32, speed_mmps: f32) -> Self {
        Self {
            name: format!("DriveStraight{distance_mm:.0}mm@{:.0}mmps", speed_mmps.abs()),
            distance_mm,
            speed_mmps: speed_mmps.abs(),
            start: None,
        }
    }
}

impl Action for DriveStraightAction {
    fn name(&self) -> &str {
        &self.name
    }

    fn action_type(&self) -> ActionType {
        ActionType::DriveStraight
    }

    fn locks(&self) -> LockSet {
        LockSet::WHEELS
    }

    fn init(&mut self, ctx: &mut ActionCtx<'_>) -> ActionResult {
        self.start = Some(ctx.robot.pose());
        ctx.robot.begin_drive(self.distance_mm, self.speed_mmps);
        ActionResult::Success
    }

    fn check_if_done(&mut self, ctx: &mut ActionCtx<'_>) -> ActionResult {
        if self.start.is_none() {
            return ActionResult::FailureAbort;
        }
        if ctx.robot.wheels_idle() {
            ActionResult::Success
        } else {
            ActionResult::Running
        }
    }

    fn on_reset(&mut self, _ctx: &mut ActionCtx<'_>) {
        self.start = None;
    }

    fn cleanup(&mut self, ctx: &mut ActionCtx<'_>) {
        ctx.robot.stop_wheels();
    }

    fn completion_info(&self, robot: &Robot) -> CompletionInfo {
        let pose = robot.pose();
        let travelled = self.start.map_or(0.0, |start| {
            (pose.x_mm - start.x_mm).hypot(pose.y_mm - start.y_mm)
        });
        CompletionInfo::Drove {
            distance_mm: travelled.copysign(self.distance_mm),
            final_pose: pose,
        }
    }
}

/// Pitches the head to a goal angle.
///
/// The goal is clamped into the head's travel range at init, so asking for
/// more than the hardware allows converges at the limit instead of
/// timing out.
#[derive(Debug)]
pub struct MoveHeadToAngleAction {
    name: String,
    target_rad: f32,
    speed_radps: f32,
    goal_rad: Option<f32>,
}

impl MoveHeadToAngleAction {
    /// Move the head to `target_rad` at `speed_radps`.
    pub fn new(target_rad: f32, speed_radps: f32) -> Self {
        Self {
            name: format!("MoveHeadTo{:+.0}deg", target_rad.to_degrees()),
            target_rad,
            speed_radps,
            goal_rad: None,
        }
    }
}

impl Action for MoveHeadToAngleAction {
    fn name(&self) -> &str {
        &self.name
    }

    fn action_type(&self) -> ActionType {
        ActionType::MoveHeadToAngle
    }

    fn locks(&self) -> LockSet {
        LockSet::HEAD
    }

    fn init(&mut self, ctx: &mut ActionCtx<'_>) -> ActionResult {
        let limits = ctx.robot.limits();
        let goal = self
            .target_rad
            .clamp(limits.min_head_angle_rad, limits.max_head_angle_rad);
        self.goal_rad = Some(goal);
        ctx.robot.begin_head_move(goal, self.speed_radps);
        ActionResult::Success
    }

    fn check_if_done(&mut self, ctx: &mut ActionCtx<'_>) -> ActionResult {
        if self.goal_rad.is_none() {
            return ActionResult::FailureAbort;
        }
        if ctx.robot.head_idle() {
            ActionResult::Success
        } else {
            ActionResult::Running
        }
    }

    fn on_reset(&mut self, _ctx: &mut ActionCtx<'_>) {
        self.goal_rad = None;
    }

    fn cleanup(&mut self, ctx: &mut ActionCtx<'_>) {
        ctx.robot.stop_head();
    }

    fn completion_info(&self, robot: &Robot) -> CompletionInfo {
        CompletionInfo::HeadMoved {
            final_angle_rad: robot.head_angle_rad(),
        }
    }
}

/// Raises or lowers the lift to a goal height.
#[derive(Debug)]
pub struct MoveLiftToHeightAction {
    name: String,
    target_mm: f32,
    speed_mmps: f32,
    goal_mm: Option<f32>,
}

impl MoveLiftToHeightAction {
    /// Move the lift to `target_mm` at `speed_mmps`.
    pub fn new(target_mm: f32, speed_mmps: f32) -> Self {
        Self {
            name: format!("MoveLiftTo{target_mm:.0}mm"),
            target_mm,
            speed_mmps,
            goal_mm: None,
        }
    }
}

impl Action for MoveLiftToHeightAction {
    fn name(&self) -> &str {
        &self.name
    }

    fn action_type(&self) -> ActionType {
        ActionType::MoveLiftToHeight
    }

    fn locks(&self) -> LockSet {
        LockSet::LIFT
    }

    fn init(&mut self, ctx: &mut ActionCtx<'_>) -> ActionResult {
        let limits = ctx.robot.limits();
        let goal = self
            .target_mm
            .clamp(limits.min_lift_height_mm, limits.max_lift_height_mm);
        self.goal_mm = Some(goal);
        ctx.robot.begin_lift_move(goal, self.speed_mmps);
        ActionResult::Success
    }

    fn check_if_done(&mut self, ctx: &mut ActionCtx<'_>) -> ActionResult {
        if self.goal_mm.is_none() {
            return ActionResult::FailureAbort;
        }
        if ctx.robot.lift_idle() {
            ActionResult::Success
        } else {
            ActionResult::Running
        }
    }

    fn on_reset(&mut self, _ctx: &mut ActionCtx<'_>) {
        self.goal_mm = None;
    }

    fn cleanup(&mut self, ctx: &mut ActionCtx<'_>) {
        ctx.robot.stop_lift();
    }

    fn completion_info(&self, robot: &Robot) -> CompletionInfo {
        CompletionInfo::LiftMoved {
            final_height_mm: robot.lift_height_mm(),
        }
    }
}
