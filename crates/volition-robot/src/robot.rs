//! The robot context handed to every action.
//!
//! [`Robot`] bundles the tick clock, the pose and axis state, the subsystem
//! lock flags, and the in-flight motion commands. Actions read and command
//! it through `&mut Robot`; they never talk to motors or clocks directly.

use std::time::Duration;

use tracing::trace;
use volition_bus::EventBus;
use volition_types::{LockSet, ObjectId, Pose2, RobotId, Subsystem, normalize_angle_rad};

use crate::clock::{ClockError, TickClock};
use crate::config::MotionConfig;
use crate::motion::MotionState;

/// Simulated robot: identity, clock, kinematic state, locks, and bus handle.
#[derive(Debug)]
pub struct Robot {
    id: RobotId,
    clock: TickClock,
    pose: Pose2,
    head_angle_rad: f32,
    lift_height_mm: f32,
    held: LockSet,
    carrying: Option<ObjectId>,
    motion: MotionState,
    limits: MotionConfig,
    bus: EventBus,
}

impl Robot {
    /// Create a robot at the origin with idle motors and no locks held.
    pub fn new(
        id: RobotId,
        tick_step: Duration,
        limits: MotionConfig,
        bus: EventBus,
    ) -> Result<Self, ClockError> {
        let clock = TickClock::new(tick_step)?;
        Ok(Self {
            id,
            clock,
            pose: Pose2::default(),
            head_angle_rad: 0.0,
            lift_height_mm: limits.min_lift_height_mm,
            held: LockSet::NONE,
            carrying: None,
            motion: MotionState::default(),
            limits,
            bus,
        })
    }

    // --- Identity and time ---

    /// This robot's identifier.
    pub const fn id(&self) -> RobotId {
        self.id
    }

    /// Monotonic engine time.
    pub const fn now(&self) -> Duration {
        self.clock.now()
    }

    /// Current tick number.
    pub const fn tick(&self) -> u64 {
        self.clock.tick()
    }

    /// The fixed per-tick step of this robot's clock.
    pub const fn clock_step(&self) -> Duration {
        self.clock.step()
    }

    /// Advance the clock one tick.
    pub fn advance_clock(&mut self) -> Result<(), ClockError> {
        self.clock.advance()
    }

    // --- Kinematic state ---

    /// Current pose on the driving plane.
    pub const fn pose(&self) -> Pose2 {
        self.pose
    }

    /// Place the robot at a pose (teleport; clears nothing else).
    pub const fn set_pose(&mut self, pose: Pose2) {
        self.pose = pose;
    }

    /// Current head angle, radians.
    pub const fn head_angle_rad(&self) -> f32 {
        self.head_angle_rad
    }

    /// Current lift height, millimeters.
    pub const fn lift_height_mm(&self) -> f32 {
        self.lift_height_mm
    }

    /// The object held in the lift, if any.
    pub const fn carrying(&self) -> Option<ObjectId> {
        self.carrying
    }

    /// Record what the lift is holding.
    pub const fn set_carrying(&mut self, object: Option<ObjectId>) {
        self.carrying = object;
    }

    /// The configured motion limits.
    pub const fn limits(&self) -> &MotionConfig {
        &self.limits
    }

    /// The shared event bus.
    pub const fn bus(&self) -> &EventBus {
        &self.bus
    }

    // --- Subsystem locks ---

    /// The set of subsystems currently locked.
    pub const fn held_locks(&self) -> LockSet {
        self.held
    }

    /// Set or clear the head lock. Setting an already-set flag is a no-op.
    pub fn lock_head(&mut self, locked: bool) {
        self.set_lock(Subsystem::Head, locked);
    }

    /// Set or clear the lift lock. Setting an already-set flag is a no-op.
    pub fn lock_lift(&mut self, locked: bool) {
        self.set_lock(Subsystem::Lift, locked);
    }

    /// Set or clear the wheels lock. Setting an already-set flag is a no-op.
    pub fn lock_wheels(&mut self, locked: bool) {
        self.set_lock(Subsystem::Wheels, locked);
    }

    fn set_lock(&mut self, subsystem: Subsystem, locked: bool) {
        self.held = if locked {
            self.held.with(subsystem)
        } else {
            self.held.without(subsystem)
        };
        trace!(subsystem = %subsystem, locked, held = %self.held, "lock flag set");
    }

    // --- Motion commands ---

    /// Begin an in-place turn to an absolute heading.
    pub fn begin_turn_to(&mut self, target_rad: f32, speed_radps: f32) {
        let speed = speed_radps.abs().min(self.limits.max_turn_speed_radps);
        self.motion.set_turn(normalize_angle_rad(target_rad), speed);
    }

    /// Begin a straight drive of `distance_mm` (negative for backward).
    pub fn begin_drive(&mut self, distance_mm: f32, speed_mmps: f32) {
        let speed = speed_mmps.abs().min(self.limits.max_wheel_speed_mmps);
        self.motion.set_drive(distance_mm, speed);
    }

    /// Begin a head move; the target is clamped into the travel range.
    pub fn begin_head_move(&mut self, target_rad: f32, speed_radps: f32) {
        let target = target_rad.clamp(
            self.limits.min_head_angle_rad,
            self.limits.max_head_angle_rad,
        );
        let speed = speed_radps.abs().min(self.limits.max_head_speed_radps);
        self.motion.set_head(target, speed);
    }

    /// Begin a lift move; the target is clamped into the travel range.
    pub fn begin_lift_move(&mut self, target_mm: f32, speed_mmps: f32) {
        let target = target_mm.clamp(
            self.limits.min_lift_height_mm,
            self.limits.max_lift_height_mm,
        );
        let speed = speed_mmps.abs().min(self.limits.max_lift_speed_mmps);
        self.motion.set_lift(target, speed);
    }

    /// Drop any in-flight wheel command.
    pub const fn stop_wheels(&mut self) {
        self.motion.stop_wheels();
    }

    /// Drop any in-flight head move.
    pub const fn stop_head(&mut self) {
        self.motion.stop_head();
    }

    /// Drop any in-flight lift move.
    pub const fn stop_lift(&mut self) {
        self.motion.stop_lift();
    }

    /// Drop every in-flight motion command.
    pub const fn stop_all_motion(&mut self) {
        self.motion.stop_all();
    }

    /// Whether no motion command is in flight.
    pub const fn motion_idle(&self) -> bool {
        self.motion.is_idle()
    }

    /// Whether no wheel command is in flight.
    pub const fn wheels_idle(&self) -> bool {
        self.motion.wheels().is_none()
    }

    /// Whether no head move is in flight.
    pub const fn head_idle(&self) -> bool {
        self.motion.head().is_none()
    }

    /// Whether no lift move is in flight.
    pub const fn lift_idle(&self) -> bool {
        self.motion.lift().is_none()
    }

    /// Integrate every in-flight motion command over `dt`.
    pub fn step(&mut self, dt: Duration) {
        let dt_s = dt.as_secs_f32();
        self.motion.step(
            dt_s,
            &mut self.pose,
            &mut self.head_angle_rad,
            &mut self.lift_height_mm,
        );
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const EPS: f32 = 1e-3;

    fn make_robot() -> Robot {
        Robot::new(
            RobotId::new(),
            Duration::from_millis(10),
            MotionConfig::default(),
            EventBus::new(),
        )
        .unwrap()
    }

    #[test]
    fn lock_flags_are_idempotent_set_assignment() {
        let mut robot = make_robot();
        robot.lock_wheels(true);
        robot.lock_wheels(true);
        assert_eq!(robot.held_locks(), LockSet::WHEELS);

        robot.lock_head(true);
        assert!(robot.held_locks().contains(Subsystem::Head));

        robot.lock_wheels(false);
        robot.lock_wheels(false);
        assert_eq!(robot.held_locks(), LockSet::HEAD);
    }

    #[test]
    fn drive_converges_over_ticks() {
        let mut robot = make_robot();
        robot.begin_drive(100.0, 200.0);
        for _ in 0..100 {
            robot.advance_clock().unwrap();
            robot.step(robot.clock_step());
            if robot.motion_idle() {
                break;
            }
        }
        assert!(robot.motion_idle());
        assert!((robot.pose().x_mm - 100.0).abs() < EPS);
    }

    #[test]
    fn commanded_speed_is_clamped_to_limits() {
        let mut robot = make_robot();
        let max = robot.limits().max_wheel_speed_mmps;
        robot.begin_drive(1000.0, 10_000.0);
        robot.step(Duration::from_secs(1));
        // One second at a clamped speed covers at most max mm.
        assert!(robot.pose().x_mm <= max + EPS);
    }

    #[test]
    fn head_target_is_clamped_into_range() {
        let mut robot = make_robot();
        robot.begin_head_move(10.0, 100.0);
        for _ in 0..200 {
            robot.step(Duration::from_millis(10));
        }
        assert!((robot.head_angle_rad() - robot.limits().max_head_angle_rad).abs() < EPS);
    }

    #[test]
    fn lift_starts_at_bottom_of_travel() {
        let robot = make_robot();
        assert!(
            (robot.lift_height_mm() - robot.limits().min_lift_height_mm).abs() < EPS
        );
    }
}
