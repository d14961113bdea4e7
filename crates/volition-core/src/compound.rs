//! Sequential composition of actions.
//!
//! A [`CompoundAction`] runs its children strictly in order, driving at
//! most one child per tick through a nested [`ActionRunner`]. The sequence
//! itself has no timeout and no retry budget; children carry their own.
//! Child locks are unioned and acquired once by the enclosing runner, so a
//! drive-turn-drive sequence holds the wheels for its whole duration
//! instead of releasing and reacquiring them between steps.
//!
//! A child's `Success` advances the sequence; every other terminal result
//! is forwarded unchanged as the sequence's own result, and the remaining
//! children are aborted during cleanup.

use tracing::debug;
use volition_types::{ActionResult, LockSet};

use crate::action::{ActionCtx, ActionNode};
use crate::runner::{AbortKind, ActionRunner};

/// One child of a sequence, with its retention policy.
#[derive(Debug)]
struct ChildSlot {
    runner: ActionRunner,
    retain: bool,
}

/// Runs a list of actions one after another.
///
/// Retention is a per-child choice: a completed child is dropped by
/// default, which keeps long command streams from accumulating, while a
/// retained child survives its own completion so a reset replays it. A
/// sequence wrapped in a retry decorator should retain every child it
/// wants re-run.
#[derive(Debug)]
pub struct CompoundAction {
    name: String,
    children: Vec<ChildSlot>,
    current: usize,
    log_steps: bool,
}

impl CompoundAction {
    /// Empty sequence with the given display name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            children: Vec::new(),
            current: 0,
            log_steps: false,
        }
    }

    /// Append a child that is dropped once it completes.
    pub fn push(&mut self, node: impl Into<ActionNode>) {
        self.push_slot(node.into(), false);
    }

    /// Append a child that is kept after completion so a reset replays it.
    pub fn push_retained(&mut self, node: impl Into<ActionNode>) {
        self.push_slot(node.into(), true);
    }

    /// Builder form of [`Self::push`].
    #[must_use]
    pub fn with_child(mut self, node: impl Into<ActionNode>) -> Self {
        self.push(node);
        self
    }

    /// Builder form of [`Self::push_retained`].
    #[must_use]
    pub fn with_child_retained(mut self, node: impl Into<ActionNode>) -> Self {
        self.push_retained(node);
        self
    }

    /// The sequence's display name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of children not yet completed.
    pub fn remaining(&self) -> usize {
        self.children.len().saturating_sub(self.current)
    }

    /// Union of every child's lock set.
    pub fn locks(&self) -> LockSet {
        self.children
            .iter()
            .fold(LockSet::NONE, |acc, slot| acc.union(slot.runner.locks()))
    }

    pub(crate) fn init(&mut self, _ctx: &mut ActionCtx<'_>) -> ActionResult {
        self.current = 0;
        for slot in &mut self.children {
            slot.runner.set_log_steps(self.log_steps);
        }
        ActionResult::Success
    }

    /// Drive the current child one tick and translate its result.
    pub(crate) fn check_if_done(&mut self, ctx: &mut ActionCtx<'_>) -> ActionResult {
        let result = match self.children.get_mut(self.current) {
            Some(slot) => slot.runner.update(ctx),
            None => return ActionResult::Success,
        };
        match result {
            ActionResult::Running => ActionResult::Running,
            ActionResult::Success => {
                self.advance();
                if self.remaining() == 0 {
                    ActionResult::Success
                } else {
                    ActionResult::Running
                }
            }
            // Failures and cancellations become the sequence's result;
            // children are never retried at this level.
            other => other,
        }
    }

    pub(crate) fn on_reset(&mut self, ctx: &mut ActionCtx<'_>) {
        for slot in &mut self.children {
            slot.runner.reset(ctx);
        }
        self.current = 0;
    }

    /// Abort whatever has not completed, current child included.
    pub(crate) fn cleanup(&mut self, ctx: &mut ActionCtx<'_>) {
        for slot in &mut self.children {
            if !slot.runner.is_finished() {
                slot.runner.abort_now(ctx, AbortKind::Cancel);
            }
        }
    }

    pub(crate) fn set_log_steps(&mut self, on: bool) {
        self.log_steps = on;
        for slot in &mut self.children {
            slot.runner.set_log_steps(on);
        }
    }

    fn push_slot(&mut self, node: ActionNode, retain: bool) {
        self.children.push(ChildSlot {
            runner: ActionRunner::nested(node),
            retain,
        });
    }

    fn advance(&mut self) {
        debug!(sequence = %self.name, remaining = self.remaining(), "sequence step completed");
        let retain = self
            .children
            .get(self.current)
            .is_some_and(|slot| slot.retain);
        if retain {
            self.current = self.current.saturating_add(1);
        } else if self.current < self.children.len() {
            self.children.remove(self.current);
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic, clippy::arithmetic_side_effects)]
mod tests {
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;
    use std::time::Duration;

    use volition_bus::EventBus;
    use volition_robot::{MotionConfig, Robot};
    use volition_types::{ActionType, RobotId};

    use super::*;
    use crate::action::Action;
    use crate::watcher::ActionWatcher;

    /// Leaf that appends its name to a shared journal on every hook call
    /// and finishes with a scripted result.
    struct JournaledStep {
        name: &'static str,
        outcome: ActionResult,
        ticks_running: u32,
        locks: LockSet,
        journal: Rc<RefCell<Vec<String>>>,
        inits: Rc<Cell<u32>>,
        cleanups: Rc<Cell<u32>>,
    }

    impl JournaledStep {
        fn new(name: &'static str, journal: &Rc<RefCell<Vec<String>>>) -> Self {
            Self {
                name,
                outcome: ActionResult::Success,
                ticks_running: 0,
                locks: LockSet::NONE,
                journal: Rc::clone(journal),
                inits: Rc::new(Cell::new(0)),
                cleanups: Rc::new(Cell::new(0)),
            }
        }

        fn failing_with(mut self, outcome: ActionResult) -> Self {
            self.outcome = outcome;
            self
        }

        fn running_for(mut self, ticks: u32) -> Self {
            self.ticks_running = ticks;
            self
        }

        fn with_locks(mut self, locks: LockSet) -> Self {
            self.locks = locks;
            self
        }

        fn note(&self, what: &str) {
            self.journal.borrow_mut().push(format!("{}:{what}", self.name));
        }
    }

    impl Action for JournaledStep {
        fn name(&self) -> &str {
            self.name
        }

        fn action_type(&self) -> ActionType {
            ActionType::Wait
        }

        fn locks(&self) -> LockSet {
            self.locks
        }

        fn init(&mut self, _ctx: &mut ActionCtx<'_>) -> ActionResult {
            self.inits.set(self.inits.get() + 1);
            self.note("init");
            ActionResult::Success
        }

        fn check_if_done(&mut self, _ctx: &mut ActionCtx<'_>) -> ActionResult {
            if self.ticks_running > 0 {
                self.ticks_running -= 1;
                return ActionResult::Running;
            }
            self.note("done");
            self.outcome
        }

        fn cleanup(&mut self, _ctx: &mut ActionCtx<'_>) {
            self.cleanups.set(self.cleanups.get() + 1);
            self.note("cleanup");
        }
    }

    fn make_robot() -> Robot {
        Robot::new(
            RobotId::new(),
            Duration::from_millis(10),
            MotionConfig::default(),
            EventBus::new(),
        )
        .unwrap()
    }

    fn run_to_end(
        robot: &mut Robot,
        watcher: &mut ActionWatcher,
        runner: &mut ActionRunner,
        max_steps: u32,
    ) -> ActionResult {
        for _ in 0..max_steps {
            robot.advance_clock().unwrap();
            let mut ctx = ActionCtx::new(robot, watcher);
            let result = runner.update(&mut ctx);
            if result.is_terminal() {
                return result;
            }
        }
        panic!("sequence did not terminate within {max_steps} steps");
    }

    #[test]
    fn children_run_in_order() {
        let journal = Rc::new(RefCell::new(Vec::new()));
        let sequence = CompoundAction::new("two-step")
            .with_child(ActionNode::leaf(JournaledStep::new("first", &journal)))
            .with_child(ActionNode::leaf(JournaledStep::new("second", &journal)));
        let mut robot = make_robot();
        let mut watcher = ActionWatcher::new();
        let mut runner = ActionRunner::new(sequence);

        let result = run_to_end(&mut robot, &mut watcher, &mut runner, 30);
        assert_eq!(result, ActionResult::Success);
        assert_eq!(
            *journal.borrow(),
            vec![
                "first:init",
                "first:done",
                "first:cleanup",
                "second:init",
                "second:done",
                "second:cleanup",
            ]
        );
    }

    #[test]
    fn empty_sequence_succeeds() {
        let mut robot = make_robot();
        let mut watcher = ActionWatcher::new();
        let mut runner = ActionRunner::new(CompoundAction::new("nothing-to-do"));

        let result = run_to_end(&mut robot, &mut watcher, &mut runner, 10);
        assert_eq!(result, ActionResult::Success);
    }

    #[test]
    fn child_failure_becomes_the_sequence_result() {
        let journal = Rc::new(RefCell::new(Vec::new()));
        let unreached = JournaledStep::new("unreached", &journal);
        let unreached_inits = Rc::clone(&unreached.inits);
        let unreached_cleanups = Rc::clone(&unreached.cleanups);
        let sequence = CompoundAction::new("doomed")
            .with_child(ActionNode::leaf(
                JournaledStep::new("fails", &journal).failing_with(ActionResult::FailureTimeout),
            ))
            .with_child(ActionNode::leaf(unreached));
        let mut robot = make_robot();
        let mut watcher = ActionWatcher::new();
        let mut runner = ActionRunner::new(sequence);

        let result = run_to_end(&mut robot, &mut watcher, &mut runner, 30);
        assert_eq!(result, ActionResult::FailureTimeout);
        // The pending child never initialized but was still cleaned up.
        assert_eq!(unreached_inits.get(), 0);
        assert_eq!(unreached_cleanups.get(), 1);
    }

    #[test]
    fn retryable_child_failure_is_forwarded_not_absorbed() {
        let journal = Rc::new(RefCell::new(Vec::new()));
        let sequence = CompoundAction::new("no-second-chances").with_child(ActionNode::leaf(
            JournaledStep::new("flaky", &journal).failing_with(ActionResult::FailureRetry),
        ));
        let mut robot = make_robot();
        let mut watcher = ActionWatcher::new();
        let mut runner = ActionRunner::new(sequence);

        let result = run_to_end(&mut robot, &mut watcher, &mut runner, 30);
        assert_eq!(result, ActionResult::FailureRetry);
    }

    #[test]
    fn cancellation_aborts_current_and_pending_children() {
        let journal = Rc::new(RefCell::new(Vec::new()));
        let slow = JournaledStep::new("slow", &journal).running_for(20);
        let slow_cleanups = Rc::clone(&slow.cleanups);
        let pending = JournaledStep::new("pending", &journal);
        let pending_cleanups = Rc::clone(&pending.cleanups);
        let sequence = CompoundAction::new("interruptible")
            .with_child(ActionNode::leaf(slow))
            .with_child(ActionNode::leaf(pending));
        let mut robot = make_robot();
        let mut watcher = ActionWatcher::new();
        let mut runner = ActionRunner::new(sequence);

        for _ in 0..6 {
            robot.advance_clock().unwrap();
            let mut ctx = ActionCtx::new(&mut robot, &mut watcher);
            assert_eq!(runner.update(&mut ctx), ActionResult::Running);
        }
        runner.cancel();
        robot.advance_clock().unwrap();
        let mut ctx = ActionCtx::new(&mut robot, &mut watcher);
        assert_eq!(runner.update(&mut ctx), ActionResult::CancelledWhileRunning);
        assert_eq!(slow_cleanups.get(), 1);
        assert_eq!(pending_cleanups.get(), 1);
    }

    #[test]
    fn sequence_holds_the_union_of_child_locks() {
        let journal = Rc::new(RefCell::new(Vec::new()));
        let sequence = CompoundAction::new("drive-and-look")
            .with_child(ActionNode::leaf(
                JournaledStep::new("drive", &journal)
                    .with_locks(LockSet::WHEELS)
                    .running_for(3),
            ))
            .with_child(ActionNode::leaf(
                JournaledStep::new("look", &journal).with_locks(LockSet::HEAD),
            ));
        let union = sequence.locks();
        assert_eq!(union, LockSet::WHEELS.union(LockSet::HEAD));

        let mut robot = make_robot();
        let mut watcher = ActionWatcher::new();
        let mut runner = ActionRunner::new(sequence);

        // While the first child runs, the union is already held.
        for _ in 0..4 {
            robot.advance_clock().unwrap();
            let mut ctx = ActionCtx::new(&mut robot, &mut watcher);
            assert_eq!(runner.update(&mut ctx), ActionResult::Running);
        }
        assert_eq!(robot.held_locks(), union);

        let result = run_to_end(&mut robot, &mut watcher, &mut runner, 30);
        assert_eq!(result, ActionResult::Success);
        assert!(robot.held_locks().is_empty());
    }

    #[test]
    fn retained_children_replay_after_reset() {
        let journal = Rc::new(RefCell::new(Vec::new()));
        let first = JournaledStep::new("first", &journal);
        let first_inits = Rc::clone(&first.inits);
        let second = JournaledStep::new("second", &journal);
        let second_inits = Rc::clone(&second.inits);
        let sequence = CompoundAction::new("replayable")
            .with_child_retained(ActionNode::leaf(first))
            .with_child_retained(ActionNode::leaf(second));
        let mut robot = make_robot();
        let mut watcher = ActionWatcher::new();
        let mut runner = ActionRunner::new(sequence);

        assert_eq!(
            run_to_end(&mut robot, &mut watcher, &mut runner, 30),
            ActionResult::Success
        );
        robot.advance_clock().unwrap();
        let mut ctx = ActionCtx::new(&mut robot, &mut watcher);
        runner.reset(&mut ctx);
        assert_eq!(
            run_to_end(&mut robot, &mut watcher, &mut runner, 30),
            ActionResult::Success
        );
        assert_eq!(first_inits.get(), 2);
        assert_eq!(second_inits.get(), 2);
    }

    #[test]
    fn dropped_children_do_not_replay_but_retained_ones_do() {
        let journal = Rc::new(RefCell::new(Vec::new()));
        let once = JournaledStep::new("once", &journal);
        let once_inits = Rc::clone(&once.inits);
        let again = JournaledStep::new("again", &journal);
        let again_inits = Rc::clone(&again.inits);
        let sequence = CompoundAction::new("mixed")
            .with_child(ActionNode::leaf(once))
            .with_child_retained(ActionNode::leaf(again));
        let mut robot = make_robot();
        let mut watcher = ActionWatcher::new();
        let mut runner = ActionRunner::new(sequence);

        assert_eq!(
            run_to_end(&mut robot, &mut watcher, &mut runner, 30),
            ActionResult::Success
        );
        robot.advance_clock().unwrap();
        let mut ctx = ActionCtx::new(&mut robot, &mut watcher);
        runner.reset(&mut ctx);
        assert_eq!(
            run_to_end(&mut robot, &mut watcher, &mut runner, 30),
            ActionResult::Success
        );
        // The dropped child ran once; the retained one ran both times.
        assert_eq!(once_inits.get(), 1);
        assert_eq!(again_inits.get(), 2);
    }
}
