//! Parameters structure for the simulation

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::Deserialize;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters of the simulated arena, robot and range finder.
#[derive(Debug, Clone, Deserialize)]
pub struct SimParams {

    // ---- ARENA ----

    /// Size of the rectangular arena along X and Y. The arena spans from the origin to this
    /// corner.
    ///
    /// Units: meters
    pub arena_size_m: [f64; 2],

    /// Start position of the robot.
    ///
    /// Units: meters
    pub start_position_m: [f64; 2],

    /// Start heading of the robot, counter-clockwise from the X axis.
    ///
    /// Units: radians
    pub start_heading_rad: f64,

    // ---- RANGE FINDER ----

    /// Number of samples in one full sweep.
    pub scan_num_samples: usize,

    /// Minimum reportable range.
    ///
    /// Units: meters
    pub range_min_m: f64,

    /// Maximum reportable range, walls further away than this are reported as infinity.
    ///
    /// Units: meters
    pub range_max_m: f64,

    // ---- TIMING ----

    /// Number of simulation steps per second.
    ///
    /// Units: hertz
    pub step_frequency_hz: f64,
}

impl Default for SimParams {
    fn default() -> Self {
        Self {
            arena_size_m: [4.0, 4.0],
            start_position_m: [2.0, 2.0],
            start_heading_rad: 0.0,
            scan_num_samples: 360,
            range_min_m: 0.12,
            range_max_m: 3.5,
            step_frequency_hz: 250.0,
        }
    }
}
