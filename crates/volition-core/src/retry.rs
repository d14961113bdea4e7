//! Retry decoration for actions.
//!
//! A [`RetryAction`] wraps one action (tree) and re-runs it when it fails
//! with a retryable result, up to a fixed budget of retries beyond the
//! first attempt. A [`RetryPolicy`] inspects each failed attempt and may
//! veto the retry or schedule a recovery action that runs to completion
//! between attempts.
//!
//! The wrapper is transparent on success: callers see `Running` across
//! failed attempts and recoveries, then the sub-action's own terminal
//! result. Only an exhausted budget introduces a result of its own,
//! `ReachedMaxNumRetries`.

use std::time::Duration;

use tracing::{debug, info, warn};
use volition_robot::Robot;
use volition_types::{ActionResult, ActionType, CompletionInfo, LockSet, SubActionResult};

use crate::action::{ActionCtx, ActionNode};
use crate::runner::{AbortKind, ActionRunner};

/// Everything known about one failed attempt.
#[derive(Debug, Clone)]
pub struct AttemptReport {
    /// 1-based number of the attempt that failed.
    pub attempt: u8,
    /// The failure the attempt ended with.
    pub result: ActionResult,
    /// The attempt's completion payload.
    pub info: CompletionInfo,
    /// Nested completions recorded during the attempt, oldest first.
    pub sub_results: Vec<SubActionResult>,
}

/// What to do about a failed attempt.
#[derive(Debug)]
pub enum RetryDecision {
    /// Forward the attempt's failure as the wrapper's result.
    GiveUp,
    /// Start the next attempt on the following tick.
    Retry,
    /// Run a recovery action to completion, then start the next attempt.
    RetryAfter(ActionNode),
}

/// Decides, per failed attempt, whether and how to retry.
pub trait RetryPolicy {
    /// Inspect a failed attempt and produce a decision.
    fn on_failure(&mut self, report: &AttemptReport) -> RetryDecision;
}

impl<F> RetryPolicy for F
where
    F: FnMut(&AttemptReport) -> RetryDecision,
{
    fn on_failure(&mut self, report: &AttemptReport) -> RetryDecision {
        self(report)
    }
}

/// Retries every retryable failure immediately, with no recovery step.
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardRetryPolicy;

impl RetryPolicy for StandardRetryPolicy {
    fn on_failure(&mut self, _report: &AttemptReport) -> RetryDecision {
        RetryDecision::Retry
    }
}

/// Runs the same recovery action before every repeat attempt.
pub struct FixedRecovery {
    factory: Box<dyn Fn() -> ActionNode>,
}

impl FixedRecovery {
    /// Policy whose recovery action is built fresh for each failure.
    pub fn new(factory: impl Fn() -> ActionNode + 'static) -> Self {
        Self {
            factory: Box::new(factory),
        }
    }
}

impl RetryPolicy for FixedRecovery {
    fn on_failure(&mut self, _report: &AttemptReport) -> RetryDecision {
        RetryDecision::RetryAfter((self.factory)())
    }
}

impl core::fmt::Debug for FixedRecovery {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("FixedRecovery").finish_non_exhaustive()
    }
}

/// Wraps an action and re-runs it across retryable failures.
pub struct RetryAction {
    name: String,
    sub: ActionRunner,
    policy: Box<dyn RetryPolicy>,
    /// Retries beyond the first attempt, so the total attempt count is
    /// `max_retries + 1`.
    max_retries: u8,
    retries_used: u8,
    interstitial: Option<ActionRunner>,
    last_report: Option<AttemptReport>,
    log_steps: bool,
}

impl RetryAction {
    /// Wrap `node`, retrying every retryable failure up to `max_retries`
    /// times.
    pub fn new(node: impl Into<ActionNode>, max_retries: u8) -> Self {
        let node = node.into();
        let name = format!("retry({})", node.name());
        Self {
            name,
            sub: ActionRunner::nested(node),
            policy: Box::new(StandardRetryPolicy),
            max_retries,
            retries_used: 0,
            interstitial: None,
            last_report: None,
            log_steps: false,
        }
    }

    /// Replace the retry policy.
    #[must_use]
    pub fn with_policy(mut self, policy: impl RetryPolicy + 'static) -> Self {
        self.policy = Box::new(policy);
        self
    }

    /// The wrapper's display name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Decorators are transparent in the taxonomy: this reports the kind
    /// of the wrapped action.
    pub fn action_type(&self) -> ActionType {
        self.sub.action_type()
    }

    /// The wrapped action's lock set. Recovery actions are expected to
    /// stay within this footprint.
    pub fn locks(&self) -> LockSet {
        self.sub.locks()
    }

    /// The wrapped action's deadline scaled by the total attempt count.
    pub fn timeout(&self) -> Option<Duration> {
        let attempts = u32::from(self.max_retries).saturating_add(1);
        self.sub
            .timeout()
            .map(|per_attempt| per_attempt.saturating_mul(attempts))
    }

    /// Retries consumed so far.
    pub const fn retries_used(&self) -> u8 {
        self.retries_used
    }

    /// The most recent failed attempt, if any attempt has failed.
    pub const fn last_attempt(&self) -> Option<&AttemptReport> {
        self.last_report.as_ref()
    }

    pub(crate) fn init(&mut self, _ctx: &mut ActionCtx<'_>) -> ActionResult {
        self.sub.set_log_steps(self.log_steps);
        ActionResult::Success
    }

    pub(crate) fn check_if_done(&mut self, ctx: &mut ActionCtx<'_>) -> ActionResult {
        // A pending recovery has exclusive control. Whatever it ends
        // with, it is discarded and the budget check runs.
        if let Some(recovery) = self.interstitial.as_mut() {
            let result = recovery.update(ctx);
            if result == ActionResult::Running {
                return ActionResult::Running;
            }
            debug!(wrapper = %self.name, result = %result, "recovery step finished");
            self.interstitial = None;
            return self.consume_retry();
        }

        let result = self.sub.update(ctx);
        match result {
            ActionResult::Running => ActionResult::Running,
            ActionResult::Success => {
                self.last_report = None;
                ActionResult::Success
            }
            failure if failure.is_retryable() => self.handle_failure(ctx, failure),
            // Cancellations and programmer errors are never retried.
            other => {
                self.last_report = None;
                other
            }
        }
    }

    pub(crate) fn on_reset(&mut self, ctx: &mut ActionCtx<'_>) {
        if let Some(mut recovery) = self.interstitial.take() {
            recovery.abort_now(ctx, AbortKind::Cancel);
        }
        self.sub.reset(ctx);
        self.retries_used = 0;
        self.last_report = None;
    }

    pub(crate) fn cleanup(&mut self, ctx: &mut ActionCtx<'_>) {
        if let Some(mut recovery) = self.interstitial.take() {
            if !recovery.is_finished() {
                recovery.abort_now(ctx, AbortKind::Cancel);
            }
        }
        if !self.sub.is_finished() {
            self.sub.abort_now(ctx, AbortKind::Cancel);
        }
    }

    /// After a failure, the wrapper reports the failed attempt's payload
    /// until an attempt succeeds.
    pub(crate) fn completion_info(&self, robot: &Robot) -> CompletionInfo {
        self.last_report.as_ref().map_or_else(
            || self.sub.current_info(robot),
            |report| report.info.clone(),
        )
    }

    pub(crate) fn set_log_steps(&mut self, on: bool) {
        self.log_steps = on;
        self.sub.set_log_steps(on);
        if let Some(recovery) = self.interstitial.as_mut() {
            recovery.set_log_steps(on);
        }
    }

    /// Capture the failed attempt, reset the sub-action for a clean
    /// replay, and let the policy decide what happens next.
    fn handle_failure(&mut self, ctx: &mut ActionCtx<'_>, failure: ActionResult) -> ActionResult {
        let report = AttemptReport {
            attempt: self.retries_used.saturating_add(1),
            result: failure,
            info: self.sub.final_info().cloned().unwrap_or_default(),
            sub_results: ctx.watcher.take_results(self.sub.tag()),
        };
        warn!(
            wrapper = %self.name,
            attempt = report.attempt,
            result = %failure,
            "attempt failed"
        );
        self.sub.reset(ctx);
        let decision = self.policy.on_failure(&report);
        self.last_report = Some(report);
        match decision {
            RetryDecision::GiveUp => failure,
            RetryDecision::Retry => self.consume_retry(),
            RetryDecision::RetryAfter(node) => {
                let mut recovery = ActionRunner::nested(node);
                recovery.set_log_steps(self.log_steps);
                self.interstitial = Some(recovery);
                ActionResult::Running
            }
        }
    }

    fn consume_retry(&mut self) -> ActionResult {
        if self.retries_used >= self.max_retries {
            info!(wrapper = %self.name, attempts = self.retries_used.saturating_add(1), "retry budget exhausted");
            return ActionResult::ReachedMaxNumRetries;
        }
        self.retries_used = self.retries_used.saturating_add(1);
        debug!(wrapper = %self.name, retry = self.retries_used, "starting repeat attempt");
        ActionResult::Running
    }
}

impl core::fmt::Debug for RetryAction {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("RetryAction")
            .field("name", &self.name)
            .field("max_retries", &self.max_retries)
            .field("retries_used", &self.retries_used)
            .field("recovering", &self.interstitial.is_some())
            .finish_non_exhaustive()
    }
}
