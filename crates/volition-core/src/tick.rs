//! The tick loop.
//!
//! One tick advances the simulated clock, integrates robot motion over
//! the elapsed step, gives an external callback a chance to inject
//! stimuli, and then dispatches every action once. Everything an action
//! does therefore happens at tick granularity, cooperatively, on one
//! thread.

use std::thread;
use std::time::Duration;

use serde::Serialize;
use thiserror::Error;
use tracing::info;
use volition_robot::{ClockError, Robot};
use volition_types::{ActionResult, ActionTag};

use crate::list::ActionList;

/// Tick advancement failures.
#[derive(Debug, Error)]
pub enum TickError {
    /// The simulated clock could not advance.
    #[error("clock error: {0}")]
    Clock(#[from] ClockError),
}

/// Everything the tick loop drives: one robot and its action queue.
#[derive(Debug)]
pub struct EngineState {
    /// The robot being driven.
    pub robot: Robot,
    /// Top-level actions queued on it.
    pub actions: ActionList,
}

impl EngineState {
    /// Engine state with an empty action queue.
    pub const fn new(robot: Robot) -> Self {
        Self {
            robot,
            actions: ActionList::new(),
        }
    }
}

/// One terminated top-level action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CompletedAction {
    /// The run's tag.
    pub tag: ActionTag,
    /// How it ended.
    pub result: ActionResult,
}

/// What one tick did.
#[derive(Debug, Clone, Serialize)]
pub struct TickSummary {
    /// Tick counter after advancing.
    pub tick: u64,
    /// Simulated time since start, in milliseconds.
    pub elapsed_ms: u64,
    /// Top-level actions that terminated this tick, in order.
    pub completed: Vec<CompletedAction>,
    /// Actions still executing after dispatch.
    pub running: usize,
    /// Actions still waiting for their locks.
    pub pending: usize,
}

/// Hook invoked every tick after motion integration and before action
/// dispatch, so injected stimuli are visible to actions the same tick.
pub trait TickCallback {
    /// Observe or mutate the engine state for this tick.
    fn on_tick(&mut self, state: &mut EngineState);
}

/// Callback that does nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpCallback;

impl TickCallback for NoOpCallback {
    fn on_tick(&mut self, _state: &mut EngineState) {}
}

/// Why a run loop returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunEndReason {
    /// The action queue drained.
    AllActionsCompleted,
    /// The tick budget ran out first.
    MaxTicksReached,
}

/// Result of a bounded run loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunOutcome {
    /// Why the loop stopped.
    pub reason: RunEndReason,
    /// Ticks executed.
    pub ticks: u64,
    /// Top-level completions observed across the whole run.
    pub completed: usize,
}

/// Advance the engine by exactly one tick.
pub fn run_tick(state: &mut EngineState) -> Result<TickSummary, TickError> {
    run_tick_with(state, &mut NoOpCallback)
}

/// Advance the engine by one tick, letting `callback` inject stimuli
/// between motion integration and action dispatch.
pub fn run_tick_with(
    state: &mut EngineState,
    callback: &mut dyn TickCallback,
) -> Result<TickSummary, TickError> {
    state.robot.advance_clock()?;
    let dt = state.robot.clock_step();
    state.robot.step(dt);
    callback.on_tick(state);

    let completed = state
        .actions
        .update(&mut state.robot)
        .into_iter()
        .map(|(tag, result)| CompletedAction { tag, result })
        .collect();

    Ok(TickSummary {
        tick: state.robot.tick(),
        elapsed_ms: millis(state.robot.now()),
        completed,
        running: state.actions.running_count(),
        pending: state.actions.pending_count(),
    })
}

/// Run ticks until the action queue drains or `max_ticks` elapse.
///
/// A nonzero `tick_interval` sleeps between ticks, pacing the loop at
/// roughly wall-clock rate; zero runs as fast as possible.
pub fn run_until_settled(
    state: &mut EngineState,
    max_ticks: u64,
    tick_interval: Duration,
    callback: &mut dyn TickCallback,
) -> Result<RunOutcome, TickError> {
    let mut ticks: u64 = 0;
    let mut completed: usize = 0;
    while ticks < max_ticks {
        let summary = run_tick_with(state, callback)?;
        ticks = ticks.saturating_add(1);
        completed = completed.saturating_add(summary.completed.len());
        if state.actions.is_idle() {
            let outcome = RunOutcome {
                reason: RunEndReason::AllActionsCompleted,
                ticks,
                completed,
            };
            log_run_end(outcome);
            return Ok(outcome);
        }
        if !tick_interval.is_zero() {
            thread::sleep(tick_interval);
        }
    }
    let outcome = RunOutcome {
        reason: RunEndReason::MaxTicksReached,
        ticks,
        completed,
    };
    log_run_end(outcome);
    Ok(outcome)
}

fn log_run_end(outcome: RunOutcome) {
    info!(
        reason = ?outcome.reason,
        ticks = outcome.ticks,
        completed = outcome.completed,
        "run finished"
    );
}

fn millis(elapsed: Duration) -> u64 {
    u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX)
}
