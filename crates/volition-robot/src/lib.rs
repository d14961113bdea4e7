//! Robot context for the Volition action framework.
//!
//! Actions never touch hardware or wall clocks directly; everything they
//! can sense or command lives on the [`Robot`] handed to them each tick.
//!
//! # Modules
//!
//! - [`clock`] -- Fixed-step monotonic tick clock
//! - [`config`] -- Physical motion limits
//! - [`motion`] -- In-flight motion commands and per-tick integration
//! - [`robot`] -- The [`Robot`] context itself

pub mod clock;
pub mod config;
pub mod motion;
pub mod robot;

pub use clock::{ClockError, TickClock};
pub use config::MotionConfig;
pub use motion::{AxisMove, MotionState, WheelCommand};
pub use robot::Robot;
