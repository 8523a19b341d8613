//! # Odometry Interface

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Pose estimate of the robot body in the odometry frame.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct Odometry {
    /// The position of the robot in the odometry frame.
    ///
    /// Units: meters
    pub position_m: [f64; 3],

    /// The attitude of the robot in the odometry frame as a normalised quaternion, stored in
    /// `[x, y, z, w]` order.
    pub attitude_q: [f64; 4],
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Odometry {
    /// Scalar part of the attitude quaternion.
    pub fn q_w(&self) -> f64 {
        self.attitude_q[3]
    }

    /// Vector part of the attitude quaternion, as `(x, y, z)`.
    pub fn q_xyz(&self) -> (f64, f64, f64) {
        (self.attitude_q[0], self.attitude_q[1], self.attitude_q[2])
    }
}

impl Default for Odometry {
    fn default() -> Self {
        Self {
            position_m: [0.0; 3],
            attitude_q: [0.0, 0.0, 0.0, 1.0],
        }
    }
}
