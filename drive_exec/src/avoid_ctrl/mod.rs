//! # Obstacle avoidance control module
//!
//! Reactive state machine driving the robot away from obstacles seen by the range finder. Each
//! cycle the module takes one [`SensorReading`](crate::sensor::SensorReading), performs exactly
//! one step of the machine below and outputs a body velocity command:
//!
//! - `SeekingDirection` - decide where to go. A blocked front, or a blocked left side, starts a
//!   right turn. A blocked right side starts a left turn. Otherwise drive forward. A turn latches
//!   the current orientation as the turn reference.
//! - `DrivingForward` - command the forward speed for one cycle, then seek again.
//! - `TurningRight`/`TurningLeft` - command the turn rate until the robot has rotated the escape
//!   angle away from the turn reference, then seek again.
//!
//! Cycles in which the machine emits nothing (seeking, or finishing a turn) keep the previously
//! emitted command, so the drive base is always fed a command.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod mode;
mod params;
mod state;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// Internal
pub use mode::*;
pub use params::*;
pub use state::*;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Possible errors that can occur during AvoidCtrl initialisation.
#[derive(Debug, thiserror::Error)]
pub enum AvoidCtrlError {
    #[error("Invalid AvoidCtrl parameter `{name}` ({value}): {reason}")]
    InvalidParam {
        name: &'static str,
        value: f64,
        reason: &'static str,
    },
}
