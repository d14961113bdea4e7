//! Per-action execution state machine.
//!
//! An [`ActionRunner`] owns one node of an action tree and drives it
//! through its life cycle: optional start delay, repeated initialization,
//! optional settle delay, repeated completion checks, terminal result. The
//! runner also owns everything the node itself should not have to think
//! about: timers, the internal retry budget, cancellation, subsystem locks,
//! completion recording, and the completion broadcast.
//!
//! Termination guarantees, on every path:
//!
//! - the node's `cleanup` runs exactly once per run;
//! - locks acquired by this runner are released exactly once;
//! - a `(tag, kind, result)` triple is recorded for every enclosing runner;
//! - at the top of a tree, exactly one `ActionCompleted` event is
//!   published, synchronously, on the tick of termination.
//!
//! Updates after termination return the stored result and run nothing.

use std::time::Duration;

use chrono::Utc;
use tracing::{debug, error, info, warn};
use volition_robot::Robot;
use volition_types::{
    ActionCompleted, ActionResult, ActionTag, ActionType, CompletionInfo, Event, LockSet,
    SubActionResult, Subsystem,
};

use crate::action::{ActionCtx, ActionNode};

/// How an externally requested abort should be reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum AbortKind {
    /// Plain cancellation.
    Cancel,
    /// Displacement by a higher-priority action.
    Interrupt,
}

/// Per-runner behavior switches.
#[derive(Debug, Clone, Copy)]
struct RunnerOptions {
    acquires_locks: bool,
    emits_completion: bool,
    log_steps: bool,
}

impl RunnerOptions {
    const fn top_level() -> Self {
        Self {
            acquires_locks: true,
            emits_completion: true,
            log_steps: false,
        }
    }

    const fn nested() -> Self {
        Self {
            acquires_locks: false,
            emits_completion: false,
            log_steps: false,
        }
    }
}

/// Timing and precondition state for the current attempt.
///
/// Reset wholesale when an attempt restarts; the retry budget lives on the
/// runner so it survives attempt resets.
#[derive(Debug, Clone, Copy, Default)]
struct AttemptState {
    wait_until: Option<Duration>,
    timeout_at: Option<Duration>,
    preconditions_met: bool,
}

/// Stored terminal outcome.
#[derive(Debug, Clone)]
struct Completion {
    result: ActionResult,
    info: CompletionInfo,
}

/// Drives one action (tree) node through its life cycle.
pub struct ActionRunner {
    tag: ActionTag,
    node: Box<ActionNode>,
    opts: RunnerOptions,
    started: bool,
    attempt: AttemptState,
    retries_left: u8,
    abort: Option<AbortKind>,
    acquired: LockSet,
    outcome: Option<Completion>,
}

impl ActionRunner {
    /// Runner for the top of a tree: acquires its node's locks when it
    /// starts and publishes the completion event when it terminates.
    pub fn new(node: impl Into<ActionNode>) -> Self {
        Self::with_options(ActionTag::new(), node.into(), RunnerOptions::top_level())
    }

    /// Runner for use inside another action: lock acquisition and the
    /// completion broadcast are suppressed; the enclosing tree owns both.
    pub fn nested(node: impl Into<ActionNode>) -> Self {
        Self::with_options(ActionTag::new(), node.into(), RunnerOptions::nested())
    }

    pub(crate) fn with_tag(tag: ActionTag, node: impl Into<ActionNode>) -> Self {
        Self::with_options(tag, node.into(), RunnerOptions::top_level())
    }

    fn with_options(tag: ActionTag, node: ActionNode, opts: RunnerOptions) -> Self {
        let retries_left = node.retry_budget();
        Self {
            tag,
            node: Box::new(node),
            opts,
            started: false,
            attempt: AttemptState::default(),
            retries_left,
            abort: None,
            acquired: LockSet::NONE,
            outcome: None,
        }
    }

    // --- Introspection ---

    /// Tag identifying this run.
    pub const fn tag(&self) -> ActionTag {
        self.tag
    }

    /// The node's stable name.
    pub fn name(&self) -> &str {
        self.node.name()
    }

    /// The node's kind; decorators report the kind of what they wrap.
    pub fn action_type(&self) -> ActionType {
        self.node.action_type()
    }

    /// Subsystems the whole subtree needs locked.
    pub fn locks(&self) -> LockSet {
        self.node.locks()
    }

    /// Deadline for the node, measured from its first update.
    pub fn timeout(&self) -> Option<Duration> {
        self.node.timeout()
    }

    /// Whether a terminal result has been stored.
    pub const fn is_finished(&self) -> bool {
        self.outcome.is_some()
    }

    /// Whether a cancel or interrupt is waiting to be applied.
    pub(crate) const fn abort_requested(&self) -> bool {
        self.abort.is_some()
    }

    /// The stored terminal result, if the run has terminated.
    pub fn final_result(&self) -> Option<ActionResult> {
        self.outcome.as_ref().map(|done| done.result)
    }

    /// The stored completion payload, if the run has terminated.
    pub fn final_info(&self) -> Option<&CompletionInfo> {
        self.outcome.as_ref().map(|done| &done.info)
    }

    /// The completion payload as it stands right now: the stored one after
    /// termination, otherwise a live read from the node.
    pub(crate) fn current_info(&self, robot: &Robot) -> CompletionInfo {
        self.outcome.as_ref().map_or_else(
            || self.node.completion_info(robot),
            |done| done.info.clone(),
        )
    }

    // --- Configuration ---

    /// Disable lock acquisition; the enclosing tree owns the locks.
    pub const fn suppress_locks(&mut self) {
        self.opts.acquires_locks = false;
    }

    /// Disable the completion broadcast; only the top of a tree signals.
    pub const fn suppress_completion(&mut self) {
        self.opts.emits_completion = false;
    }

    /// Log every nested completion at info level instead of debug.
    pub fn set_log_steps(&mut self, on: bool) {
        self.opts.log_steps = on;
        self.node.set_log_steps(on);
    }

    // --- Cancellation ---

    /// Request cancellation. Level-triggered and idempotent; the result is
    /// reported on the next update. Does not downgrade an interrupt.
    pub const fn cancel(&mut self) {
        if self.abort.is_none() {
            self.abort = Some(AbortKind::Cancel);
        }
    }

    /// Request displacement. The next update reports `Interrupted`.
    pub const fn interrupt(&mut self) {
        self.abort = Some(AbortKind::Interrupt);
    }

    /// Apply an abort immediately: flag it and run one update so the whole
    /// completion path (cleanup, recording, locks, broadcast) happens now.
    pub(crate) fn abort_now(&mut self, ctx: &mut ActionCtx<'_>, kind: AbortKind) -> ActionResult {
        match kind {
            AbortKind::Cancel => self.cancel(),
            AbortKind::Interrupt => self.interrupt(),
        }
        self.update(ctx)
    }

    // --- Execution ---

    /// Advance the action by one tick.
    ///
    /// Returns [`ActionResult::Running`] until the run terminates; after
    /// that, returns the stored result without invoking the node.
    pub fn update(&mut self, ctx: &mut ActionCtx<'_>) -> ActionResult {
        if let Some(done) = &self.outcome {
            return done.result;
        }
        if let Some(kind) = self.abort {
            let result = self.aborted_result(kind);
            return self.finish(ctx, result);
        }
        if !self.started {
            self.begin(ctx);
        }
        if self.attempt.wait_until.is_none() {
            self.arm_timers(ctx.robot.now());
        }

        let now = ctx.robot.now();
        // The deadline outranks everything else, including a same-tick
        // success and the start-delay gate.
        if let Some(deadline) = self.attempt.timeout_at {
            if now > deadline {
                return self.finish(ctx, ActionResult::FailureTimeout);
            }
        }
        if let Some(gate) = self.attempt.wait_until {
            if now <= gate {
                return ActionResult::Running;
            }
        }

        let step = if self.attempt.preconditions_met {
            self.run_check(ctx)
        } else {
            self.run_init(ctx)
        };
        match step {
            ActionResult::Running => ActionResult::Running,
            ActionResult::FailureRetry if self.retries_left > 0 => {
                self.retries_left = self.retries_left.saturating_sub(1);
                debug!(
                    tag = %self.tag,
                    name = self.node.name(),
                    retries_left = self.retries_left,
                    "absorbing retryable failure, restarting attempt"
                );
                self.reset_attempt(ctx);
                ActionResult::Running
            }
            terminal => self.finish(ctx, terminal),
        }
    }

    /// Restore the runner as if it had never run: timers, retry budget,
    /// outcome, and the node's own state. Any held locks are released.
    pub fn reset(&mut self, ctx: &mut ActionCtx<'_>) {
        if !self.acquired.is_empty() {
            apply_locks(ctx.robot, self.acquired, false);
            self.acquired = LockSet::NONE;
        }
        self.attempt = AttemptState::default();
        self.retries_left = self.node.retry_budget();
        self.abort = None;
        self.outcome = None;
        self.started = false;
        self.node.on_reset(ctx);
    }

    // --- Internals ---

    fn begin(&mut self, ctx: &mut ActionCtx<'_>) {
        self.started = true;
        if self.opts.acquires_locks {
            let locks = self.node.locks();
            apply_locks(ctx.robot, locks, true);
            self.acquired = locks;
        }
        if self.opts.emits_completion {
            info!(
                tag = %self.tag,
                name = self.node.name(),
                locks = %self.acquired,
                "action started"
            );
        } else {
            debug!(tag = %self.tag, name = self.node.name(), "action started");
        }
    }

    fn arm_timers(&mut self, now: Duration) {
        self.attempt.wait_until = Some(now.saturating_add(self.node.start_delay()));
        self.attempt.timeout_at = self
            .node
            .timeout()
            .map(|timeout| now.saturating_add(timeout));
    }

    /// Run `init`, mapping its result into the attempt ladder: `Success`
    /// marks preconditions met and arms the settle gate, but the action
    /// never completes on the tick its preconditions are met.
    fn run_init(&mut self, ctx: &mut ActionCtx<'_>) -> ActionResult {
        ctx.ancestors.push(self.tag);
        let result = self.node.init(ctx);
        ctx.ancestors.pop();
        match result {
            ActionResult::Success => {
                self.attempt.preconditions_met = true;
                let settle = self.node.settle_delay();
                self.attempt.wait_until = Some(ctx.robot.now().saturating_add(settle));
                ActionResult::Running
            }
            other => other,
        }
    }

    fn run_check(&mut self, ctx: &mut ActionCtx<'_>) -> ActionResult {
        ctx.ancestors.push(self.tag);
        let result = self.node.check_if_done(ctx);
        ctx.ancestors.pop();
        result
    }

    /// Clear attempt state so the next update re-arms timers and re-runs
    /// initialization. The retry budget is deliberately left alone.
    fn reset_attempt(&mut self, ctx: &mut ActionCtx<'_>) {
        self.attempt = AttemptState::default();
        self.node.on_reset(ctx);
    }

    const fn aborted_result(&self, kind: AbortKind) -> ActionResult {
        match kind {
            AbortKind::Interrupt => ActionResult::Interrupted,
            AbortKind::Cancel => {
                if self.attempt.preconditions_met {
                    ActionResult::CancelledWhileRunning
                } else {
                    ActionResult::Cancelled
                }
            }
        }
    }

    /// Terminate the run: snapshot the payload, clean up exactly once,
    /// record the triple for every ancestor, release locks, broadcast.
    fn finish(&mut self, ctx: &mut ActionCtx<'_>, result: ActionResult) -> ActionResult {
        // Payload first, while the node's state is still intact.
        let info = self.node.completion_info(ctx.robot);

        ctx.ancestors.push(self.tag);
        self.node.cleanup(ctx);
        ctx.ancestors.pop();

        let record = SubActionResult {
            tag: self.tag,
            action_type: self.node.action_type(),
            result,
        };
        ctx.watcher.record(&ctx.ancestors, record);

        if !self.acquired.is_empty() {
            apply_locks(ctx.robot, self.acquired, false);
            self.acquired = LockSet::NONE;
        }

        self.log_finish(result);
        if self.opts.emits_completion {
            self.broadcast(ctx, result, info.clone());
        }
        self.outcome = Some(Completion { result, info });
        result
    }

    fn log_finish(&self, result: ActionResult) {
        if result.is_programmer_error() {
            error!(
                tag = %self.tag,
                name = self.node.name(),
                result = %result,
                "action finished with programmer error"
            );
        } else if result == ActionResult::FailureTimeout {
            warn!(tag = %self.tag, name = self.node.name(), "action timed out");
        } else if self.opts.emits_completion || self.opts.log_steps {
            info!(tag = %self.tag, name = self.node.name(), result = %result, "action finished");
        } else {
            debug!(tag = %self.tag, name = self.node.name(), result = %result, "action finished");
        }
    }

    fn broadcast(&self, ctx: &mut ActionCtx<'_>, result: ActionResult, info: CompletionInfo) {
        let sub_results = ctx.watcher.take_results(self.tag);
        let completed = ActionCompleted {
            robot_id: ctx.robot.id(),
            tag: self.tag,
            action_type: self.node.action_type(),
            result,
            info,
            sub_results,
            tick: ctx.robot.tick(),
            completed_at: Utc::now(),
        };
        ctx.robot.bus().publish(&Event::ActionCompleted(completed));
    }
}

impl core::fmt::Debug for ActionRunner {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ActionRunner")
            .field("tag", &self.tag)
            .field("name", &self.node.name())
            .field("started", &self.started)
            .field("finished", &self.is_finished())
            .finish_non_exhaustive()
    }
}

/// One lock call per subsystem named in `locks`.
fn apply_locks(robot: &mut Robot, locks: LockSet, locked: bool) {
    for subsystem in locks.subsystems() {
        match subsystem {
            Subsystem::Head => robot.lock_head(locked),
            Subsystem::Lift => robot.lock_lift(locked),
            Subsystem::Wheels => robot.lock_wheels(locked),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic, clippy::arithmetic_side_effects)]
mod tests {
    use std::cell::Cell;
    use std::collections::VecDeque;
    use std::rc::Rc;

    use volition_bus::EventBus;
    use volition_robot::MotionConfig;
    use volition_types::RobotId;

    use super::*;
    use crate::action::Action;
    use crate::watcher::ActionWatcher;

    /// Shared call counters for one stub action.
    #[derive(Clone, Default)]
    struct Counters {
        init: Rc<Cell<u32>>,
        check: Rc<Cell<u32>>,
        cleanup: Rc<Cell<u32>>,
        reset: Rc<Cell<u32>>,
    }

    /// Leaf whose hook results are scripted up front.
    ///
    /// Empty scripts default to `Success`, and scripts are consumed across
    /// attempts, so "fail, fail, succeed" is just a three-entry script.
    struct StubAction {
        name: &'static str,
        locks: LockSet,
        timeout: Option<Duration>,
        start_delay: Duration,
        settle_delay: Duration,
        retry_budget: u8,
        init_script: VecDeque<ActionResult>,
        check_script: VecDeque<ActionResult>,
        counters: Counters,
    }

    impl StubAction {
        fn new(name: &'static str) -> Self {
            Self {
                name,
                locks: LockSet::NONE,
                timeout: None,
                start_delay: Duration::ZERO,
                settle_delay: Duration::ZERO,
                retry_budget: 0,
                init_script: VecDeque::new(),
                check_script: VecDeque::new(),
                counters: Counters::default(),
            }
        }

        fn checks(mut self, results: &[ActionResult]) -> Self {
            self.check_script = results.iter().copied().collect();
            self
        }

        fn inits(mut self, results: &[ActionResult]) -> Self {
            self.init_script = results.iter().copied().collect();
            self
        }

        fn with_locks(mut self, locks: LockSet) -> Self {
            self.locks = locks;
            self
        }

        fn with_timeout(mut self, timeout: Duration) -> Self {
            self.timeout = Some(timeout);
            self
        }

        fn with_start_delay(mut self, delay: Duration) -> Self {
            self.start_delay = delay;
            self
        }

        fn with_settle_delay(mut self, delay: Duration) -> Self {
            self.settle_delay = delay;
            self
        }

        fn with_retry_budget(mut self, budget: u8) -> Self {
            self.retry_budget = budget;
            self
        }

        fn counters(&self) -> Counters {
            self.counters.clone()
        }
    }

    impl Action for StubAction {
        fn name(&self) -> &str {
            self.name
        }

        fn action_type(&self) -> ActionType {
            ActionType::Wait
        }

        fn locks(&self) -> LockSet {
            self.locks
        }

        fn timeout(&self) -> Option<Duration> {
            self.timeout
        }

        fn start_delay(&self) -> Duration {
            self.start_delay
        }

        fn settle_delay(&self) -> Duration {
            self.settle_delay
        }

        fn retry_budget(&self) -> u8 {
            self.retry_budget
        }

        fn init(&mut self, _ctx: &mut ActionCtx<'_>) -> ActionResult {
            self.counters.init.set(self.counters.init.get() + 1);
            self.init_script.pop_front().unwrap_or(ActionResult::Success)
        }

        fn check_if_done(&mut self, _ctx: &mut ActionCtx<'_>) -> ActionResult {
            self.counters.check.set(self.counters.check.get() + 1);
            self.check_script
                .pop_front()
                .unwrap_or(ActionResult::Success)
        }

        fn on_reset(&mut self, _ctx: &mut ActionCtx<'_>) {
            self.counters.reset.set(self.counters.reset.get() + 1);
        }

        fn cleanup(&mut self, _ctx: &mut ActionCtx<'_>) {
            self.counters.cleanup.set(self.counters.cleanup.get() + 1);
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

    fn step(robot: &mut Robot, watcher: &mut ActionWatcher, runner: &mut ActionRunner) -> ActionResult {
        robot.advance_clock().unwrap();
        let mut ctx = ActionCtx::new(robot, watcher);
        runner.update(&mut ctx)
    }

    fn run_to_end(
        robot: &mut Robot,
        watcher: &mut ActionWatcher,
        runner: &mut ActionRunner,
        max_steps: u32,
    ) -> ActionResult {
        for _ in 0..max_steps {
            let result = step(robot, watcher, runner);
            if result.is_terminal() {
                return result;
            }
        }
        panic!("action did not terminate within {max_steps} steps");
    }

    #[test]
    fn zero_delay_action_takes_gate_init_check() {
        let mut robot = make_robot();
        let mut watcher = ActionWatcher::new();
        let stub = StubAction::new("stub");
        let counters = stub.counters();
        let mut runner = ActionRunner::new(ActionNode::leaf(stub));

        // First update arms timers and sits on the start gate.
        assert_eq!(step(&mut robot, &mut watcher, &mut runner), ActionResult::Running);
        assert_eq!(counters.init.get(), 0);
        // Second update initializes; success never completes the same tick.
        assert_eq!(step(&mut robot, &mut watcher, &mut runner), ActionResult::Running);
        assert_eq!(counters.init.get(), 1);
        assert_eq!(counters.check.get(), 0);
        // Third update checks and completes.
        assert_eq!(step(&mut robot, &mut watcher, &mut runner), ActionResult::Success);
        assert_eq!(counters.check.get(), 1);
        assert_eq!(counters.cleanup.get(), 1);
    }

    #[test]
    fn post_terminal_updates_return_stored_result() {
        let mut robot = make_robot();
        let mut watcher = ActionWatcher::new();
        let stub = StubAction::new("stub");
        let counters = stub.counters();
        let mut runner = ActionRunner::new(ActionNode::leaf(stub));

        assert_eq!(
            run_to_end(&mut robot, &mut watcher, &mut runner, 10),
            ActionResult::Success
        );
        let checks = counters.check.get();
        for _ in 0..3 {
            assert_eq!(step(&mut robot, &mut watcher, &mut runner), ActionResult::Success);
        }
        assert_eq!(counters.check.get(), checks);
        assert_eq!(counters.cleanup.get(), 1);
    }

    #[test]
    fn timeout_beats_start_delay_gate() {
        let mut robot = make_robot();
        let mut watcher = ActionWatcher::new();
        let stub = StubAction::new("slow-starter")
            .with_start_delay(Duration::from_secs(2))
            .with_timeout(Duration::from_secs(1));
        let counters = stub.counters();
        let mut runner = ActionRunner::new(ActionNode::leaf(stub));

        let result = run_to_end(&mut robot, &mut watcher, &mut runner, 200);
        assert_eq!(result, ActionResult::FailureTimeout);
        // Still gated when the deadline hit: init never ran, cleanup did.
        assert_eq!(counters.init.get(), 0);
        assert_eq!(counters.cleanup.get(), 1);
    }

    #[test]
    fn timeout_beats_same_tick_success() {
        let mut robot = make_robot();
        let mut watcher = ActionWatcher::new();
        let stub = StubAction::new("late-winner").with_timeout(Duration::from_millis(40));
        let mut runner = ActionRunner::new(ActionNode::leaf(stub));

        // Gate, then init. 10ms per step.
        assert_eq!(step(&mut robot, &mut watcher, &mut runner), ActionResult::Running);
        assert_eq!(step(&mut robot, &mut watcher, &mut runner), ActionResult::Running);
        // Jump past the deadline before the first check (timeout armed at
        // 10ms, so the deadline is 50ms; tick 6 puts us at 60ms).
        for _ in 0..4 {
            robot.advance_clock().unwrap();
        }
        let mut ctx = ActionCtx::new(&mut robot, &mut watcher);
        assert_eq!(runner.update(&mut ctx), ActionResult::FailureTimeout);
    }

    #[test]
    fn cancel_before_first_update_reports_cancelled_and_cleans_up() {
        let mut robot = make_robot();
        let mut watcher = ActionWatcher::new();
        let stub = StubAction::new("never-ran").with_locks(LockSet::WHEELS);
        let counters = stub.counters();
        let mut runner = ActionRunner::new(ActionNode::leaf(stub));

        runner.cancel();
        assert_eq!(step(&mut robot, &mut watcher, &mut runner), ActionResult::Cancelled);
        assert_eq!(counters.init.get(), 0);
        assert_eq!(counters.cleanup.get(), 1);
        // Locks were never acquired, so none are held now.
        assert!(robot.held_locks().is_empty());
    }

    #[test]
    fn cancel_after_preconditions_reports_cancelled_while_running() {
        let mut robot = make_robot();
        let mut watcher = ActionWatcher::new();
        let stub = StubAction::new("mid-run").checks(&[ActionResult::Running; 8]);
        let mut runner = ActionRunner::new(ActionNode::leaf(stub));

        for _ in 0..4 {
            assert_eq!(step(&mut robot, &mut watcher, &mut runner), ActionResult::Running);
        }
        runner.cancel();
        assert_eq!(
            step(&mut robot, &mut watcher, &mut runner),
            ActionResult::CancelledWhileRunning
        );
    }

    #[test]
    fn interrupt_wins_over_cancel() {
        let mut robot = make_robot();
        let mut watcher = ActionWatcher::new();
        let mut runner = ActionRunner::new(ActionNode::leaf(StubAction::new("displaced")));

        runner.cancel();
        runner.interrupt();
        assert_eq!(step(&mut robot, &mut watcher, &mut runner), ActionResult::Interrupted);
    }

    #[test]
    fn locks_acquired_on_start_released_on_finish() {
        let mut robot = make_robot();
        let mut watcher = ActionWatcher::new();
        let stub = StubAction::new("locker")
            .with_locks(LockSet::WHEELS.union(LockSet::HEAD))
            .checks(&[ActionResult::Running, ActionResult::Success]);
        let mut runner = ActionRunner::new(ActionNode::leaf(stub));

        assert_eq!(step(&mut robot, &mut watcher, &mut runner), ActionResult::Running);
        assert_eq!(robot.held_locks(), LockSet::WHEELS.union(LockSet::HEAD));

        let result = run_to_end(&mut robot, &mut watcher, &mut runner, 10);
        assert_eq!(result, ActionResult::Success);
        assert!(robot.held_locks().is_empty());
    }

    #[test]
    fn nested_runner_never_touches_locks() {
        let mut robot = make_robot();
        let mut watcher = ActionWatcher::new();
        let stub = StubAction::new("inner").with_locks(LockSet::ALL);
        let mut runner = ActionRunner::nested(ActionNode::leaf(stub));

        assert_eq!(step(&mut robot, &mut watcher, &mut runner), ActionResult::Running);
        assert!(robot.held_locks().is_empty());
        run_to_end(&mut robot, &mut watcher, &mut runner, 10);
        assert!(robot.held_locks().is_empty());
    }

    #[test]
    fn internal_retry_is_invisible_to_the_caller() {
        let mut robot = make_robot();
        let mut watcher = ActionWatcher::new();
        let stub = StubAction::new("flaky")
            .with_retry_budget(2)
            .checks(&[ActionResult::FailureRetry, ActionResult::Success]);
        let counters = stub.counters();
        let mut runner = ActionRunner::new(ActionNode::leaf(stub));

        let mut saw_failure = false;
        let mut outcome = ActionResult::Running;
        for _ in 0..20 {
            let result = step(&mut robot, &mut watcher, &mut runner);
            if result == ActionResult::FailureRetry {
                saw_failure = true;
            }
            if result.is_terminal() {
                outcome = result;
                break;
            }
        }
        assert_eq!(outcome, ActionResult::Success);
        assert!(!saw_failure);
        // Two attempts: two inits, one reset between them.
        assert_eq!(counters.init.get(), 2);
        assert_eq!(counters.reset.get(), 1);
    }

    #[test]
    fn exhausted_retry_budget_surfaces_the_failure() {
        let mut robot = make_robot();
        let mut watcher = ActionWatcher::new();
        let stub = StubAction::new("hopeless")
            .with_retry_budget(1)
            .checks(&[ActionResult::FailureRetry, ActionResult::FailureRetry]);
        let counters = stub.counters();
        let mut runner = ActionRunner::new(ActionNode::leaf(stub));

        let result = run_to_end(&mut robot, &mut watcher, &mut runner, 20);
        assert_eq!(result, ActionResult::FailureRetry);
        assert_eq!(counters.init.get(), 2);
        assert_eq!(counters.cleanup.get(), 1);
    }

    #[test]
    fn programmer_errors_are_never_absorbed() {
        let mut robot = make_robot();
        let mut watcher = ActionWatcher::new();
        let stub = StubAction::new("buggy")
            .with_retry_budget(5)
            .checks(&[ActionResult::FailureAbort]);
        let mut runner = ActionRunner::new(ActionNode::leaf(stub));

        assert_eq!(
            run_to_end(&mut robot, &mut watcher, &mut runner, 10),
            ActionResult::FailureAbort
        );
    }

    #[test]
    fn init_running_means_keep_initializing() {
        let mut robot = make_robot();
        let mut watcher = ActionWatcher::new();
        let stub = StubAction::new("warming-up").inits(&[
            ActionResult::Running,
            ActionResult::Running,
            ActionResult::Success,
        ]);
        let counters = stub.counters();
        let mut runner = ActionRunner::new(ActionNode::leaf(stub));

        run_to_end(&mut robot, &mut watcher, &mut runner, 10);
        assert_eq!(counters.init.get(), 3);
        assert_eq!(counters.check.get(), 1);
    }

    #[test]
    fn init_failure_is_forwarded() {
        let mut robot = make_robot();
        let mut watcher = ActionWatcher::new();
        let stub = StubAction::new("bad-start").inits(&[ActionResult::FailureAbort]);
        let counters = stub.counters();
        let mut runner = ActionRunner::new(ActionNode::leaf(stub));

        assert_eq!(
            run_to_end(&mut robot, &mut watcher, &mut runner, 10),
            ActionResult::FailureAbort
        );
        assert_eq!(counters.check.get(), 0);
        assert_eq!(counters.cleanup.get(), 1);
    }

    #[test]
    fn settle_delay_defers_first_check() {
        let mut robot = make_robot();
        let mut watcher = ActionWatcher::new();
        let stub = StubAction::new("settling").with_settle_delay(Duration::from_millis(30));
        let counters = stub.counters();
        let mut runner = ActionRunner::new(ActionNode::leaf(stub));

        // Gate, then init at 20ms arms the settle gate for 50ms.
        assert_eq!(step(&mut robot, &mut watcher, &mut runner), ActionResult::Running);
        assert_eq!(step(&mut robot, &mut watcher, &mut runner), ActionResult::Running);
        assert_eq!(counters.init.get(), 1);
        // 30ms, 40ms, 50ms: still inside the settle window.
        for _ in 0..3 {
            assert_eq!(step(&mut robot, &mut watcher, &mut runner), ActionResult::Running);
            assert_eq!(counters.check.get(), 0);
        }
        // 60ms: past the gate, the check finally runs.
        assert_eq!(step(&mut robot, &mut watcher, &mut runner), ActionResult::Success);
        assert_eq!(counters.check.get(), 1);
    }

    #[test]
    fn top_level_runner_broadcasts_exactly_once() {
        let bus = EventBus::new();
        let completions = Rc::new(Cell::new(0_u32));
        let seen = Rc::clone(&completions);
        let _sub = bus.subscribe(move |event| {
            if let Event::ActionCompleted(_) = event {
                seen.set(seen.get() + 1);
            }
        });
        let mut robot = Robot::new(
            RobotId::new(),
            Duration::from_millis(10),
            MotionConfig::default(),
            bus,
        )
        .unwrap();
        let mut watcher = ActionWatcher::new();
        let mut runner = ActionRunner::new(ActionNode::leaf(StubAction::new("loud")));

        run_to_end(&mut robot, &mut watcher, &mut runner, 10);
        assert_eq!(completions.get(), 1);
        // Post-terminal updates never re-broadcast.
        step(&mut robot, &mut watcher, &mut runner);
        assert_eq!(completions.get(), 1);
    }

    #[test]
    fn nested_runner_records_but_does_not_broadcast() {
        let bus = EventBus::new();
        let completions = Rc::new(Cell::new(0_u32));
        let seen = Rc::clone(&completions);
        let _sub = bus.subscribe(move |event| {
            if let Event::ActionCompleted(_) = event {
                seen.set(seen.get() + 1);
            }
        });
        let mut robot = Robot::new(
            RobotId::new(),
            Duration::from_millis(10),
            MotionConfig::default(),
            bus,
        )
        .unwrap();
        let mut watcher = ActionWatcher::new();
        let mut runner = ActionRunner::nested(ActionNode::leaf(StubAction::new("quiet")));

        run_to_end(&mut robot, &mut watcher, &mut runner, 10);
        assert_eq!(completions.get(), 0);
    }

    #[test]
    fn reset_restores_a_finished_runner() {
        let mut robot = make_robot();
        let mut watcher = ActionWatcher::new();
        let stub = StubAction::new("rerun");
        let counters = stub.counters();
        let mut runner = ActionRunner::new(ActionNode::leaf(stub));

        run_to_end(&mut robot, &mut watcher, &mut runner, 10);
        assert!(runner.is_finished());

        robot.advance_clock().unwrap();
        let mut ctx = ActionCtx::new(&mut robot, &mut watcher);
        runner.reset(&mut ctx);
        assert!(!runner.is_finished());
        assert_eq!(counters.reset.get(), 1);

        let result = run_to_end(&mut robot, &mut watcher, &mut runner, 10);
        assert_eq!(result, ActionResult::Success);
        assert_eq!(counters.init.get(), 2);
        assert_eq!(counters.cleanup.get(), 2);
    }
}
