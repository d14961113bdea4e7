//! The [`Action`] trait, the composition tree, and the per-tick context.
//!
//! An action implements a small cooperative state machine: the framework
//! calls [`Action::init`] every tick until preconditions are met, then
//! [`Action::check_if_done`] every tick until a terminal result. Hooks are
//! cheap and non-blocking; anything slow belongs in the robot's motion
//! simulation, not in an action body.

use std::time::Duration;

use volition_robot::Robot;
use volition_types::{ActionResult, ActionTag, ActionType, CompletionInfo, LockSet};

use crate::compound::CompoundAction;
use crate::retry::RetryAction;
use crate::watcher::ActionWatcher;

/// Timeout applied to a leaf action that does not override [`Action::timeout`].
pub const DEFAULT_ACTION_TIMEOUT: Duration = Duration::from_secs(30);

/// Per-tick context handed to every action hook.
///
/// Carries the robot being driven and the completion recorder. The ancestor
/// tag stack is maintained by the runners; actions can read it but never
/// push or pop.
pub struct ActionCtx<'a> {
    /// The robot the action operates on.
    pub robot: &'a mut Robot,
    /// Recorder for nested completion results.
    pub watcher: &'a mut ActionWatcher,
    pub(crate) ancestors: Vec<ActionTag>,
}

impl<'a> ActionCtx<'a> {
    /// Build a context for one update pass.
    pub const fn new(robot: &'a mut Robot, watcher: &'a mut ActionWatcher) -> Self {
        Self {
            robot,
            watcher,
            ancestors: Vec::new(),
        }
    }

    /// Tags of the runners enclosing the current hook, outermost first.
    pub fn ancestor_tags(&self) -> &[ActionTag] {
        &self.ancestors
    }
}

/// One cooperative action.
///
/// Implementations hold their own state; the surrounding runner owns all
/// timing (start delay, settle delay, timeout) and the retry budget, so
/// hooks can stay small. No hook may block.
pub trait Action {
    /// Stable human-readable name, fixed at construction.
    fn name(&self) -> &str;

    /// The kind of this action, reported on completion events.
    fn action_type(&self) -> ActionType;

    /// Subsystems this action needs locked while it runs.
    fn locks(&self) -> LockSet {
        LockSet::NONE
    }

    /// Deadline for the whole attempt, measured from the first update.
    ///
    /// `None` disables the timeout entirely.
    fn timeout(&self) -> Option<Duration> {
        Some(DEFAULT_ACTION_TIMEOUT)
    }

    /// Delay before initialization begins.
    fn start_delay(&self) -> Duration {
        Duration::ZERO
    }

    /// Delay between preconditions being met and the first completion check.
    fn settle_delay(&self) -> Duration {
        Duration::ZERO
    }

    /// How many times a `FailureRetry` is absorbed and the attempt restarted
    /// before the failure is surfaced.
    fn retry_budget(&self) -> u8 {
        0
    }

    /// Establish preconditions.
    ///
    /// Called every tick until it returns [`ActionResult::Success`].
    /// Returning [`ActionResult::Running`] means "still getting ready"; any
    /// failure is forwarded as the action's result. The action never
    /// completes on the same tick its preconditions are met.
    fn init(&mut self, ctx: &mut ActionCtx<'_>) -> ActionResult;

    /// Poll for completion. Called every tick after initialization.
    fn check_if_done(&mut self, ctx: &mut ActionCtx<'_>) -> ActionResult;

    /// Clear internal state so the action can run again from scratch.
    ///
    /// Called when a retry (internal or decorator-driven) restarts the
    /// action. Timing state is cleared by the runner; this hook only needs
    /// to handle the action's own fields.
    fn on_reset(&mut self, _ctx: &mut ActionCtx<'_>) {}

    /// Release anything the action holds. Called exactly once per run, on
    /// every termination path, including cancellation before the first tick.
    fn cleanup(&mut self, _ctx: &mut ActionCtx<'_>) {}

    /// Action-specific completion payload, read while state is still intact.
    fn completion_info(&self, _robot: &Robot) -> CompletionInfo {
        CompletionInfo::None
    }
}

/// A node in an action tree.
///
/// Composition is a closed set: a leaf, a sequential compound, or a retry
/// decorator. Everything the framework can execute is one of these.
pub enum ActionNode {
    /// A single concrete action.
    Leaf(Box<dyn Action>),
    /// A sequential compound of child actions.
    Sequence(CompoundAction),
    /// A retry decorator around a sub-action.
    Retry(RetryAction),
}

impl ActionNode {
    /// Wrap a concrete action as a leaf node.
    pub fn leaf<A: Action + 'static>(action: A) -> Self {
        Self::Leaf(Box::new(action))
    }

    /// The node's stable name.
    pub fn name(&self) -> &str {
        match self {
            Self::Leaf(action) => action.name(),
            Self::Sequence(compound) => compound.name(),
            Self::Retry(retry) => retry.name(),
        }
    }

    /// The node's kind; decorators report the kind of what they wrap.
    pub fn action_type(&self) -> ActionType {
        match self {
            Self::Leaf(action) => action.action_type(),
            Self::Sequence(_) => ActionType::Compound,
            Self::Retry(retry) => retry.action_type(),
        }
    }

    /// Subsystems the whole subtree needs locked.
    pub fn locks(&self) -> LockSet {
        match self {
            Self::Leaf(action) => action.locks(),
            Self::Sequence(compound) => compound.locks(),
            Self::Retry(retry) => retry.locks(),
        }
    }

    /// Deadline for the node, measured from its first update.
    ///
    /// Compounds have no deadline of their own; each child carries its own.
    pub fn timeout(&self) -> Option<Duration> {
        match self {
            Self::Leaf(action) => action.timeout(),
            Self::Sequence(_) => None,
            Self::Retry(retry) => retry.timeout(),
        }
    }

    /// Delay before initialization begins.
    pub fn start_delay(&self) -> Duration {
        match self {
            Self::Leaf(action) => action.start_delay(),
            Self::Sequence(_) | Self::Retry(_) => Duration::ZERO,
        }
    }

    /// Delay between preconditions and the first completion check.
    pub fn settle_delay(&self) -> Duration {
        match self {
            Self::Leaf(action) => action.settle_delay(),
            Self::Sequence(_) | Self::Retry(_) => Duration::ZERO,
        }
    }

    /// Internal retry budget (leaves only; composites manage their own).
    pub fn retry_budget(&self) -> u8 {
        match self {
            Self::Leaf(action) => action.retry_budget(),
            Self::Sequence(_) | Self::Retry(_) => 0,
        }
    }

    pub(crate) fn init(&mut self, ctx: &mut ActionCtx<'_>) -> ActionResult {
        match self {
            Self::Leaf(action) => action.init(ctx),
            Self::Sequence(compound) => compound.init(ctx),
            Self::Retry(retry) => retry.init(ctx),
        }
    }

    pub(crate) fn check_if_done(&mut self, ctx: &mut ActionCtx<'_>) -> ActionResult {
        match self {
            Self::Leaf(action) => action.check_if_done(ctx),
            Self::Sequence(compound) => compound.check_if_done(ctx),
            Self::Retry(retry) => retry.check_if_done(ctx),
        }
    }

    pub(crate) fn on_reset(&mut self, ctx: &mut ActionCtx<'_>) {
        match self {
            Self::Leaf(action) => action.on_reset(ctx),
            Self::Sequence(compound) => compound.on_reset(ctx),
            Self::Retry(retry) => retry.on_reset(ctx),
        }
    }

    pub(crate) fn cleanup(&mut self, ctx: &mut ActionCtx<'_>) {
        match self {
            Self::Leaf(action) => action.cleanup(ctx),
            Self::Sequence(compound) => compound.cleanup(ctx),
            Self::Retry(retry) => retry.cleanup(ctx),
        }
    }

    pub(crate) fn completion_info(&self, robot: &Robot) -> CompletionInfo {
        match self {
            Self::Leaf(action) => action.completion_info(robot),
            Self::Sequence(_) => CompletionInfo::None,
            Self::Retry(retry) => retry.completion_info(robot),
        }
    }

    pub(crate) fn set_log_steps(&mut self, on: bool) {
        match self {
            Self::Leaf(_) => {}
            Self::Sequence(compound) => compound.set_log_steps(on),
            Self::Retry(retry) => retry.set_log_steps(on),
        }
    }
}

impl From<CompoundAction> for ActionNode {
    fn from(compound: CompoundAction) -> Self {
        Self::Sequence(compound)
    }
}

impl From<RetryAction> for ActionNode {
    fn from(retry: RetryAction) -> Self {
        Self::Retry(retry)
    }
}

impl core::fmt::Debug for ActionNode {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ActionNode")
            .field("name", &self.name())
            .field("action_type", &self.action_type())
            .finish_non_exhaustive()
    }
}
