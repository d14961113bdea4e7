//! Cooperative action execution for the Volition engine.
//!
//! Actions are small state machines advanced once per engine tick. This
//! crate owns their whole life cycle:
//!
//! - [`action`] -- the [`Action`] trait, tree nodes, and the per-tick
//!   execution context
//! - [`runner`] -- drives one node through delays, initialization,
//!   completion checks, timeouts, and internal retries
//! - [`compound`] -- sequential composition with unioned locks
//! - [`retry`] -- retry decoration with pluggable policies and recovery
//!   actions between attempts
//! - [`list`] -- the lock-aware top-level action queue
//! - [`watcher`] -- nested completion records, scoped per enclosing run
//! - [`tick`] -- the tick loop gluing robot, callback, and queue together
//!
//! Every terminating tree cleans up exactly once, releases its locks,
//! and publishes exactly one completion event from its outermost runner.

pub mod action;
pub mod compound;
pub mod list;
pub mod retry;
pub mod runner;
pub mod tick;
pub mod watcher;

pub use action::{Action, ActionCtx, ActionNode, DEFAULT_ACTION_TIMEOUT};
pub use compound::CompoundAction;
pub use list::{ActionList, QueueError};
pub use retry::{
    AttemptReport, FixedRecovery, RetryAction, RetryDecision, RetryPolicy, StandardRetryPolicy,
};
pub use runner::ActionRunner;
pub use tick::{
    CompletedAction, EngineState, NoOpCallback, RunEndReason, RunOutcome, TickCallback, TickError,
    TickSummary, run_tick, run_tick_with, run_until_settled,
};
pub use watcher::ActionWatcher;
