//! Parameters structure for the sensor snapshot

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::Deserialize;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Selection of the range samples used by the controller.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct SensorParams {
    /// Angle of the center sample in the body frame, positive counter-clockwise.
    ///
    /// Units: degrees
    pub center_offset_deg: f64,

    /// Angular offset either side of the center sample for the left (positive) and right
    /// (negative) samples.
    ///
    /// Units: degrees
    pub side_offset_deg: f64,

    /// Maximum range used to clamp non-finite samples until a scan declares its own.
    ///
    /// Units: meters
    pub default_max_range_m: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl SensorParams {
    /// Body frame angles of the `(center, left, right)` samples.
    ///
    /// Units: radians
    pub fn sample_angles_rad(&self) -> (f64, f64, f64) {
        (
            self.center_offset_deg.to_radians(),
            (self.center_offset_deg + self.side_offset_deg).to_radians(),
            (self.center_offset_deg - self.side_offset_deg).to_radians(),
        )
    }
}

impl Default for SensorParams {
    fn default() -> Self {
        Self {
            center_offset_deg: 0.0,
            side_offset_deg: 30.0,
            default_max_range_m: 3.5,
        }
    }
}
