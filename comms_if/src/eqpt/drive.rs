//! # Drive Base Commands

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Body velocity demand sent to the drive base.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Default)]
pub struct VelocityCommand {
    /// Forward speed of the robot body.
    ///
    /// Units: meters/second
    pub linear_ms: f64,

    /// Turn rate of the robot body about its vertical axis, positive counter-clockwise (left).
    ///
    /// Units: radians/second
    pub angular_rads: f64,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl VelocityCommand {
    pub fn new(linear_ms: f64, angular_rads: f64) -> Self {
        Self {
            linear_ms,
            angular_rads,
        }
    }

    /// A command bringing the robot to a full stop.
    pub fn stop() -> Self {
        Self::default()
    }

    /// Determine if this command demands a full stop.
    pub fn is_stop(&self) -> bool {
        self.linear_ms == 0.0 && self.angular_rads == 0.0
    }
}
