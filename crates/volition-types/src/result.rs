//! Action outcome and action kind enumerations.
//!
//! [`ActionResult`] is the single vocabulary every action speaks: leaves,
//! compounds, and decorators all report progress and termination through it,
//! so composition never needs to translate between outcome types.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Results
// ---------------------------------------------------------------------------

/// The outcome of one update of an action, or its final disposition.
///
/// Every value except [`ActionResult::Running`] is terminal: once an action
/// reports it, the action is finished and further updates return the same
/// value without re-running any logic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ActionResult {
    /// The action made progress this tick and wants to be updated again.
    Running,
    /// The action finished and achieved its goal.
    Success,

    // --- Failures ---
    /// The action failed in a way that retrying may fix.
    FailureRetry,
    /// The action ran past its deadline and was stopped.
    FailureTimeout,
    /// A sweep or search completed without sighting its target.
    VisualObservationFailed,
    /// A retry decorator exhausted its attempt budget.
    ReachedMaxNumRetries,

    // --- Cancellations ---
    /// The action was cancelled before its preconditions were ever met.
    Cancelled,
    /// The action was cancelled after it had started running in earnest.
    CancelledWhileRunning,
    /// The action was displaced by a higher-priority action.
    Interrupted,

    // --- Programmer errors ---
    /// The action hit a state that indicates a bug, not a runtime condition.
    FailureAbort,
    /// A decorator was asked to run with no action inside it.
    NullSubaction,
}

impl ActionResult {
    /// Whether this result ends the action.
    ///
    /// Everything except [`ActionResult::Running`] is terminal.
    pub const fn is_terminal(self) -> bool {
        !matches!(self, Self::Running)
    }

    /// Whether this result came from cancellation or displacement rather
    /// than from the action's own logic.
    pub const fn is_cancellation(self) -> bool {
        matches!(
            self,
            Self::Cancelled | Self::CancelledWhileRunning | Self::Interrupted
        )
    }

    /// Whether this result is a genuine failure: terminal, not success, and
    /// not a cancellation.
    pub const fn is_true_failure(self) -> bool {
        matches!(
            self,
            Self::FailureRetry
                | Self::FailureTimeout
                | Self::VisualObservationFailed
                | Self::ReachedMaxNumRetries
                | Self::FailureAbort
                | Self::NullSubaction
        )
    }

    /// Whether this result indicates a bug in the caller rather than a
    /// runtime condition. These are never retried, only surfaced.
    pub const fn is_programmer_error(self) -> bool {
        matches!(self, Self::FailureAbort | Self::NullSubaction)
    }

    /// Whether a retry decorator may absorb this result and try again.
    ///
    /// The retryable failures are the true failures minus the programmer
    /// errors, which must reach the caller unchanged.
    pub const fn is_retryable(self) -> bool {
        self.is_true_failure() && !self.is_programmer_error()
    }

    /// Static name of the variant, used in logs and formatted action names.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Running => "Running",
            Self::Success => "Success",
            Self::FailureRetry => "FailureRetry",
            Self::FailureTimeout => "FailureTimeout",
            Self::VisualObservationFailed => "VisualObservationFailed",
            Self::ReachedMaxNumRetries => "ReachedMaxNumRetries",
            Self::Cancelled => "Cancelled",
            Self::CancelledWhileRunning => "CancelledWhileRunning",
            Self::Interrupted => "Interrupted",
            Self::FailureAbort => "FailureAbort",
            Self::NullSubaction => "NullSubaction",
        }
    }
}

impl core::fmt::Display for ActionResult {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Action kinds
// ---------------------------------------------------------------------------

/// The kind of an action, reported on completion events.
///
/// Decorators report the kind of the action they wrap, so an observer
/// watching for `DriveStraight` completions sees them whether or not the
/// drive was nested inside a retry wrapper.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ActionType {
    /// Fixed-duration pause.
    Wait,
    /// Pause until a predicate over the robot holds.
    WaitForCondition,
    /// Rotate in place to a relative or absolute heading.
    TurnInPlace,
    /// Drive forward or backward a fixed distance.
    DriveStraight,
    /// Move the head to a target angle.
    MoveHeadToAngle,
    /// Move the lift to a target height.
    MoveLiftToHeight,
    /// Sweep in place looking for a nearby object.
    SearchForNearbyObject,
    /// Sequential composition of child actions.
    Compound,
    /// Retry decorator around another action.
    RetryWrapper,
    /// Kind could not be determined (e.g. an empty decorator).
    Unknown,
}

impl ActionType {
    /// Static name of the variant, used in logs and formatted action names.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Wait => "Wait",
            Self::WaitForCondition => "WaitForCondition",
            Self::TurnInPlace => "TurnInPlace",
            Self::DriveStraight => "DriveStraight",
            Self::MoveHeadToAngle => "MoveHeadToAngle",
            Self::MoveLiftToHeight => "MoveLiftToHeight",
            Self::SearchForNearbyObject => "SearchForNearbyObject",
            Self::Compound => "Compound",
            Self::RetryWrapper => "RetryWrapper",
            Self::Unknown => "Unknown",
        }
    }
}

impl core::fmt::Display for ActionType {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}
