//! Waits: a fixed-duration pause and a predicate poll.

use std::fmt;
use std::time::Duration;

use volition_core::{Action, ActionCtx};
use volition_robot::Robot;
use volition_types::{ActionResult, ActionType, CompletionInfo};

/// Holds still for a fixed span of engine time.
///
/// The deadline is computed at init, so queueing delay and lock waits do
/// not eat into the requested duration.
#[derive(Debug)]
pub struct WaitAction {
    name: String,
    duration: Duration,
    done_at: Option<Duration>,
}

impl WaitAction {
    /// A wait for `duration` of engine time.
    pub fn new(duration: Duration) -> Self {
        Self {
            name: format!("Wait{}ms", duration.as_millis()),
            duration,
            done_at: None,
        }
    }
}

impl Action for WaitAction {
    fn name(&self) -> &str {
        &self.name
    }

    fn action_type(&self) -> ActionType {
        ActionType::Wait
    }

    /// The deadline bounds the wait already.
    fn timeout(&self) -> Option<Duration> {
        None
    }

    fn init(&mut self, ctx: &mut ActionCtx<'_>) -> ActionResult {
        self.done_at = Some(ctx.robot.now().saturating_add(self.duration));
        ActionResult::Success
    }

    fn check_if_done(&mut self, ctx: &mut ActionCtx<'_>) -> ActionResult {
        match self.done_at {
            Some(done_at) if ctx.robot.now() >= done_at => ActionResult::Success,
            Some(_) => ActionResult::Running,
            None => ActionResult::FailureAbort,
        }
    }

    fn on_reset(&mut self, _ctx: &mut ActionCtx<'_>) {
        self.done_at = None;
    }

    fn completion_info(&self, robot: &Robot) -> CompletionInfo {
        self.done_at.map_or(CompletionInfo::None, |done_at| {
            CompletionInfo::Waited {
                elapsed: robot
                    .now()
                    .saturating_add(self.duration)
                    .saturating_sub(done_at),
            }
        })
    }
}

/// Polls a predicate over the robot until it holds.
///
/// Carries no timeout of its own. Callers that need a bound should set one
/// through composition or cancel the action.
pub struct WaitForAction {
    name: String,
    predicate: Box<dyn Fn(&Robot) -> bool>,
}

impl WaitForAction {
    /// A wait on `predicate`, labelled with `description` for logs.
    pub fn new(description: &str, predicate: impl Fn(&Robot) -> bool + 'static) -> Self {
        Self {
            name: format!("WaitFor({description})"),
            predicate: Box::new(predicate),
        }
    }
}

impl fmt::Debug for WaitForAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WaitForAction")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

impl Action for WaitForAction {
    fn name(&self) -> &str {
        &self.name
    }

    fn action_type(&self) -> ActionType {
        ActionType::WaitForCondition
    }

    fn timeout(&self) -> Option<Duration> {
        None
    }

    fn init(&mut self, _ctx: &mut ActionCtx<'_>) -> ActionResult {
        ActionResult::Success
    }

    fn check_if_done(&mut self, ctx: &mut ActionCtx<'_>) -> ActionResult {
        if (self.predicate)(ctx.robot) {
            ActionResult::Success
        } else {
            ActionResult::Running
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic, clippy::arithmetic_side_effects)]
mod tests {
    use volition_bus::EventBus;
    use volition_core::{ActionList, ActionNode};
    use volition_robot::MotionConfig;
    use volition_types::{ActionTag, ObjectId, RobotId};

    use super::*;

    fn make_robot() -> Robot {
        Robot::new(
            RobotId::new(),
            Duration::from_millis(10),
            MotionConfig::default(),
            EventBus::new(),
        )
        .unwrap()
    }

    fn tick(robot: &mut Robot, list: &mut ActionList) -> Vec<(ActionTag, ActionResult)> {
        robot.advance_clock().unwrap();
        let dt = robot.clock_step();
        robot.step(dt);
        list.update(robot)
    }

    fn drain(
        robot: &mut Robot,
        list: &mut ActionList,
        max_ticks: u32,
    ) -> Vec<(ActionTag, ActionResult)> {
        let mut all = Vec::new();
        for _ in 0..max_ticks {
            all.extend(tick(robot, list));
            if list.is_idle() {
                return all;
            }
        }
        panic!("list did not drain within {max_ticks} ticks");
    }

    #[test]
    fn wait_elapses_its_full_duration() {
        let mut robot = make_robot();
        let mut list = ActionList::new();
        let tag = list.queue(ActionNode::leaf(WaitAction::new(Duration::from_millis(30))));

        // Tick 1 passes the start gate, tick 2 initializes and arms the
        // deadline, and the wait then holds until 30ms have elapsed.
        for _ in 0..4 {
            assert_eq!(tick(&mut robot, &mut list), vec![]);
        }
        let completed = tick(&mut robot, &mut list);
        assert_eq!(completed, vec![(tag, ActionResult::Success)]);
        assert_eq!(robot.now(), Duration::from_millis(50));
    }

    #[test]
    fn zero_wait_still_takes_an_init_tick() {
        let mut robot = make_robot();
        let mut list = ActionList::new();
        let tag = list.queue(ActionNode::leaf(WaitAction::new(Duration::ZERO)));

        let completed = drain(&mut robot, &mut list, 10);
        assert_eq!(completed, vec![(tag, ActionResult::Success)]);
        assert_eq!(robot.tick(), 3);
    }

    #[test]
    fn wait_for_releases_when_the_predicate_holds() {
        let mut robot = make_robot();
        let mut list = ActionList::new();
        let tag = list.queue(ActionNode::leaf(WaitForAction::new(
            "carrying something",
            |robot| robot.carrying().is_some(),
        )));

        for _ in 0..6 {
            assert_eq!(tick(&mut robot, &mut list), vec![]);
        }
        robot.set_carrying(Some(ObjectId::new()));
        let completed = tick(&mut robot, &mut list);
        assert_eq!(completed, vec![(tag, ActionResult::Success)]);
    }

    #[test]
    fn wait_for_names_its_condition() {
        let action = WaitForAction::new("lift raised", |_| true);
        assert_eq!(action.name(), "WaitFor(lift raised)");
    }
}
