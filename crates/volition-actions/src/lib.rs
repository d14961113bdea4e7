//! The concrete action catalogue for the Volition engine.
//!
//! Everything here implements [`Action`](volition_core::Action) and is
//! queued through the core crate's runners:
//!
//! - [`wait`] -- fixed-duration pauses and predicate polls
//! - [`motion`] -- in-place turns, straight drives, head and lift moves
//! - [`search`] -- the randomized object-search sweep
//! - [`config`] -- tuning for the search sweep
//!
//! Leaves declare the subsystem locks they need and stop their subsystems
//! on cleanup, so cancelling any of them leaves the robot still.

pub mod config;
pub mod motion;
pub mod search;
pub mod wait;

pub use config::SearchConfig;
pub use motion::{
    DriveStraightAction, MoveHeadToAngleAction, MoveLiftToHeightAction, TurnInPlaceAction,
    DEFAULT_TURN_TOLERANCE_DEG,
};
pub use search::SearchForNearbyObjectAction;
pub use wait::{WaitAction, WaitForAction};
