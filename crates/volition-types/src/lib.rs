//! Shared type definitions for the Volition action framework.
//!
//! This crate is the single source of truth for the vocabulary the rest of
//! the workspace speaks: action outcomes, subsystem locks, identifiers,
//! poses, and the events that travel on the robot's bus.
//!
//! # Modules
//!
//! - [`ids`] -- Type-safe UUID wrappers for tags, robots, and objects
//! - [`result`] -- The [`ActionResult`] outcome vocabulary and action kinds
//! - [`locks`] -- Subsystem lock sets ([`LockSet`])
//! - [`pose`] -- Planar poses and wrap-aware angle math
//! - [`events`] -- Bus events and completion payloads

pub mod events;
pub mod ids;
pub mod locks;
pub mod pose;
pub mod result;

// Re-export all public types at crate root for convenience.
pub use events::{ActionCompleted, CompletionInfo, Event, ObjectObserved, SubActionResult};
pub use ids::{ActionTag, ObjectId, RobotId};
pub use locks::{LockSet, Subsystem};
pub use pose::{Pose2, angle_diff_rad, normalize_angle_rad};
pub use result::{ActionResult, ActionType};
