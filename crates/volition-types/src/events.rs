//! Events published on the robot's bus, and completion payloads.
//!
//! The framework publishes exactly one [`ActionCompleted`] per queued action
//! tree, on the same tick the tree terminates. [`ObjectObserved`] flows the
//! other way: a perception source publishes it and search-style actions
//! subscribe.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{ActionTag, ObjectId, RobotId};
use crate::pose::Pose2;
use crate::result::{ActionResult, ActionType};

// ---------------------------------------------------------------------------
// Completion payloads
// ---------------------------------------------------------------------------

/// Action-specific data attached to a completion.
///
/// Leaves fill this in from final robot state; decorators republish the
/// payload of the action they wrap. Most composite bookkeeping carries
/// [`CompletionInfo::None`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub enum CompletionInfo {
    /// No payload.
    #[default]
    None,
    /// A timed wait finished.
    Waited {
        /// How long the action actually waited.
        elapsed: std::time::Duration,
    },
    /// A turn finished.
    Turned {
        /// The heading the robot ended at, radians in `(-PI, PI]`.
        final_heading_rad: f32,
    },
    /// A straight drive finished.
    Drove {
        /// Signed distance covered, millimeters (negative means backward).
        distance_mm: f32,
        /// Where the robot ended up.
        final_pose: Pose2,
    },
    /// A head move finished.
    HeadMoved {
        /// The head angle the robot ended at, radians.
        final_angle_rad: f32,
    },
    /// A lift move finished.
    LiftMoved {
        /// The lift height the robot ended at, millimeters.
        final_height_mm: f32,
    },
    /// A nearby-object search finished.
    ObjectSearch {
        /// The object that was sighted, if any.
        found: Option<ObjectId>,
        /// How many sweep phases ran before the search ended.
        sweeps_completed: u8,
    },
}

/// The `(tag, kind, result)` record of one nested action's termination.
///
/// When an inner action of a tree terminates, this triple is recorded for
/// every enclosing ancestor, so observers of the outer completion can see
/// how the inner pieces fared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubActionResult {
    /// Tag of the nested action that terminated.
    pub tag: ActionTag,
    /// Kind of the nested action.
    pub action_type: ActionType,
    /// How the nested action terminated.
    pub result: ActionResult,
}

// ---------------------------------------------------------------------------
// Bus events
// ---------------------------------------------------------------------------

/// Published exactly once when a queued action tree terminates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionCompleted {
    /// The robot the action ran on.
    pub robot_id: RobotId,
    /// Tag the tree was queued under.
    pub tag: ActionTag,
    /// Kind of the completed action (decorators report their inner kind).
    pub action_type: ActionType,
    /// Terminal result of the whole tree.
    pub result: ActionResult,
    /// Action-specific payload.
    pub info: CompletionInfo,
    /// Terminations of nested actions, oldest first.
    pub sub_results: Vec<SubActionResult>,
    /// The tick on which the tree terminated.
    pub tick: u64,
    /// Real-world timestamp when the completion was published.
    pub completed_at: DateTime<Utc>,
}

/// Published by a perception source when an object is sighted.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ObjectObserved {
    /// The robot that made the observation.
    pub robot_id: RobotId,
    /// The object that was sighted.
    pub object_id: ObjectId,
    /// Estimated pose of the object on the driving plane.
    pub pose: Pose2,
    /// The tick on which the observation was made.
    pub tick: u64,
}

/// Every event that can travel on the robot's bus.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Event {
    /// A queued action tree terminated.
    ActionCompleted(ActionCompleted),
    /// A perception source sighted an object.
    ObjectObserved(ObjectObserved),
}

impl Event {
    /// Static name of the event kind, used as a log field.
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::ActionCompleted(_) => "action_completed",
            Self::ObjectObserved(_) => "object_observed",
        }
    }
}
