//! Randomized sweep search for a nearby object.

use std::cell::Cell;
use std::fmt;
use std::rc::Rc;
use std::time::Duration;

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use tracing::debug;
use volition_bus::Subscription;
use volition_core::{Action, ActionCtx, ActionNode, ActionRunner, CompoundAction};
use volition_robot::Robot;
use volition_types::{ActionResult, ActionType, CompletionInfo, Event, LockSet, ObjectId};

use crate::config::SearchConfig;
use crate::motion::{DriveStraightAction, MoveHeadToAngleAction, TurnInPlaceAction};
use crate::wait::WaitAction;

/// Sweeps the robot's gaze across its surroundings until an object is
/// sighted or the sweep is exhausted.
///
/// At init the action builds a fresh randomized sweep sequence (pauses,
/// an optional backup, a head move, and two turns that fan out to either
/// side) and runs it as an internal runner under its own locks, so the
/// wheels and head are claimed once for the whole search. Sightings arrive
/// over the bus; the handler only stores the object id, which the next
/// `check_if_done` reads. A sweep that finishes with nothing sighted ends
/// in [`ActionResult::VisualObservationFailed`], so callers can tell "gave
/// up" apart from a found object or a hard failure.
pub struct SearchForNearbyObjectAction {
    config: SearchConfig,
    desired: Option<ObjectId>,
    rng: SmallRng,
    inner: Option<ActionRunner>,
    found: Rc<Cell<Option<ObjectId>>>,
    subscription: Option<Subscription>,
    sweeps_completed: u8,
}

impl SearchForNearbyObjectAction {
    /// A search for any object, with OS-seeded sweep randomness.
    pub fn new(config: SearchConfig) -> Self {
        Self::with_rng(config, SmallRng::from_os_rng())
    }

    /// A search with a fixed random seed, for reproducible sweeps.
    pub fn with_seed(config: SearchConfig, seed: u64) -> Self {
        Self::with_rng(config, SmallRng::seed_from_u64(seed))
    }

    fn with_rng(config: SearchConfig, rng: SmallRng) -> Self {
        Self {
            config,
            desired: None,
            rng,
            inner: None,
            found: Rc::new(Cell::new(None)),
            subscription: None,
            sweeps_completed: 0,
        }
    }

    /// Only accept sightings of `object`; everything else is ignored.
    #[must_use]
    pub const fn for_object(mut self, object: ObjectId) -> Self {
        self.desired = Some(object);
        self
    }

    fn random_wait(&mut self) -> Duration {
        let lo = self.config.min_wait_ms;
        let hi = self.config.max_wait_ms.max(lo);
        Duration::from_millis(self.rng.random_range(lo..=hi))
    }

    fn random_sweep_rad(&mut self) -> f32 {
        let lo = self.config.min_sweep_deg;
        let hi = self.config.max_sweep_deg.max(lo);
        self.rng.random_range(lo..=hi).to_radians()
    }

    /// One full sweep: settle, line up, fan out to one side, then cross to
    /// the far side. Every pause and angle is drawn fresh from the rng.
    fn build_sweep(&mut self, head_speed_radps: f32) -> CompoundAction {
        let tolerance = self.config.turn_tolerance_deg;
        let direction = if self.rng.random_bool(0.5) { 1.0 } else { -1.0 };
        let first_sweep = direction * self.random_sweep_rad();
        let far_sweep = -first_sweep - direction * self.random_sweep_rad();
        debug!(
            first_sweep_deg = first_sweep.to_degrees(),
            far_sweep_deg = far_sweep.to_degrees(),
            "sweep plan drawn"
        );

        let mut sweep = CompoundAction::new("search_sweep");
        sweep.push(ActionNode::leaf(WaitAction::new(self.random_wait())));
        if self.config.backup_distance_mm > 0.0 {
            sweep.push(ActionNode::leaf(DriveStraightAction::new(
                -self.config.backup_distance_mm,
                self.config.backup_speed_mmps,
            )));
        }
        sweep.push(ActionNode::leaf(MoveHeadToAngleAction::new(
            self.config.head_angle_rad,
            head_speed_radps,
        )));
        sweep.push(ActionNode::leaf(WaitAction::new(self.random_wait())));
        sweep.push(ActionNode::leaf(
            TurnInPlaceAction::relative(first_sweep, self.config.turn_speed_radps)
                .with_tolerance_deg(tolerance),
        ));
        sweep.push(ActionNode::leaf(WaitAction::new(self.random_wait())));
        sweep.push(ActionNode::leaf(
            TurnInPlaceAction::relative(far_sweep, self.config.turn_speed_radps)
                .with_tolerance_deg(tolerance),
        ));
        sweep.push(ActionNode::leaf(WaitAction::new(self.random_wait())));
        sweep
    }

    fn subscribe(&self, robot: &Robot) -> Subscription {
        let found = Rc::clone(&self.found);
        let desired = self.desired;
        let robot_id = robot.id();
        robot.bus().subscribe(move |event| {
            if let Event::ObjectObserved(seen) = event {
                let wanted = desired.is_none_or(|want| want == seen.object_id);
                if seen.robot_id == robot_id && wanted && found.get().is_none() {
                    found.set(Some(seen.object_id));
                }
            }
        })
    }

    /// Keep the completed-turn count current from the recorded sub-results.
    fn note_sweep_progress(&mut self, ctx: &ActionCtx<'_>) {
        let Some(own_tag) = ctx.ancestor_tags().last().copied() else {
            return;
        };
        let turns = ctx
            .watcher
            .results_for(own_tag)
            .iter()
            .filter(|row| {
                row.action_type == ActionType::TurnInPlace && row.result == ActionResult::Success
            })
            .count();
        self.sweeps_completed = u8::try_from(turns).unwrap_or(u8::MAX);
    }
}

impl fmt::Debug for SearchForNearbyObjectAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SearchForNearbyObjectAction")
            .field("desired", &self.desired)
            .field("found", &self.found.get())
            .field("sweeps_completed", &self.sweeps_completed)
            .finish_non_exhaustive()
    }
}

impl Action for SearchForNearbyObjectAction {
    fn name(&self) -> &str {
        "SearchForNearbyObject"
    }

    fn action_type(&self) -> ActionType {
        ActionType::SearchForNearbyObject
    }

    fn locks(&self) -> LockSet {
        LockSet::WHEELS.union(LockSet::HEAD)
    }

    fn init(&mut self, ctx: &mut ActionCtx<'_>) -> ActionResult {
        self.found.set(None);
        self.sweeps_completed = 0;
        self.subscription = Some(self.subscribe(ctx.robot));

        let head_speed = ctx.robot.limits().max_head_speed_radps;
        let mut inner = ActionRunner::nested(self.build_sweep(head_speed));
        // Spend the init tick starting the sweep instead of idling until
        // the first check.
        let first = inner.update(ctx);
        self.inner = Some(inner);
        if first.is_terminal() && first != ActionResult::Success {
            return first;
        }
        ActionResult::Success
    }

    fn check_if_done(&mut self, ctx: &mut ActionCtx<'_>) -> ActionResult {
        if self.found.get().is_some() {
            return ActionResult::Success;
        }
        let Some(inner) = self.inner.as_mut() else {
            return ActionResult::FailureAbort;
        };
        let progress = inner.update(ctx);
        self.note_sweep_progress(ctx);
        match progress {
            ActionResult::Running => ActionResult::Running,
            ActionResult::Success => ActionResult::VisualObservationFailed,
            other => other,
        }
    }

    fn on_reset(&mut self, _ctx: &mut ActionCtx<'_>) {
        self.found.set(None);
        self.inner = None;
        self.subscription = None;
        self.sweeps_completed = 0;
    }

    fn cleanup(&mut self, ctx: &mut ActionCtx<'_>) {
        if let Some(inner) = self.inner.as_mut() {
            if !inner.is_finished() {
                inner.cancel();
                let _ = inner.update(ctx);
            }
        }
        self.subscription = None;
    }

    fn completion_info(&self, _robot: &Robot) -> CompletionInfo {
        CompletionInfo::ObjectSearch {
            found: self.found.get(),
            sweeps_completed: self.sweeps_completed,
        }
    }
}
