//! # Laser Scan Interface

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};
use std::f64::consts::TAU;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// A single planar sweep from a range finder.
///
/// Samples are ordered counter-clockwise starting at `angle_min_rad`, with `angle_increment_rad`
/// between consecutive samples. Angles are given in the robot body frame, 0 being straight ahead.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct LaserScan {
    /// Angle of the first sample.
    ///
    /// Units: radians
    pub angle_min_rad: f64,

    /// Angle between consecutive samples.
    ///
    /// Units: radians
    pub angle_increment_rad: f64,

    /// Minimum valid range of the sensor.
    ///
    /// Units: meters
    pub range_min_m: f64,

    /// Maximum valid range of the sensor. Samples with no return are reported as infinity.
    ///
    /// Units: meters
    pub range_max_m: f64,

    /// Measured ranges.
    ///
    /// Units: meters
    pub ranges_m: Vec<f64>,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl LaserScan {
    /// Get the index of the sample closest to the given body frame angle.
    ///
    /// Returns `None` if the scan has no samples, an invalid increment, or does not cover the
    /// angle.
    pub fn index_of_angle(&self, angle_rad: f64) -> Option<usize> {
        let num_samples = self.ranges_m.len();

        if num_samples == 0
            || !self.angle_increment_rad.is_finite()
            || self.angle_increment_rad <= 0.0
            || !angle_rad.is_finite()
        {
            return None;
        }

        let mut offset_rad = (angle_rad - self.angle_min_rad).rem_euclid(TAU);

        // Angles just short of the first sample round onto it rather than wrapping to the end
        if offset_rad > TAU - 0.5 * self.angle_increment_rad {
            offset_rad -= TAU;
        }

        let index = (offset_rad / self.angle_increment_rad).round().max(0.0) as usize;

        if index < num_samples {
            Some(index)
        }
        // A full sweep wraps back round onto the first sample
        else if num_samples as f64 * self.angle_increment_rad >= TAU - 0.5 * self.angle_increment_rad {
            Some(index % num_samples)
        }
        else {
            None
        }
    }

    /// Get the raw sample closest to the given body frame angle.
    pub fn range_at_angle(&self, angle_rad: f64) -> Option<f64> {
        self.index_of_angle(angle_rad).map(|i| self.ranges_m[i])
    }
}
