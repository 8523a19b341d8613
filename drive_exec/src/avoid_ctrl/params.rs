//! Parameters structure for AvoidCtrl

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::Deserialize;
use super::AvoidCtrlError;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for obstacle avoidance control.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct AvoidCtrlParams {

    // ---- DEMANDS ----

    /// Forward speed commanded while driving. The sign is fixed by the mode, so this is a
    /// magnitude.
    ///
    /// Units: meters/second
    pub forward_speed_ms: f64,

    /// Turn rate commanded while turning. The sign is fixed by the mode, so this is a magnitude.
    ///
    /// Units: radians/second
    pub turn_speed_rads: f64,

    // ---- THRESHOLDS ----

    /// Range ahead at or below which the robot turns away.
    ///
    /// Units: meters
    pub forward_clearance_m: f64,

    /// Range to either side below which the robot turns away from that side.
    ///
    /// Units: meters
    pub side_clearance_m: f64,

    /// Rotation from the turn reference needed to complete a turn. Must be less than 180 degrees
    /// as rotation is measured along the shortest arc.
    ///
    /// Units: degrees
    pub turn_escape_angle_deg: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl AvoidCtrlParams {
    /// Turn escape angle.
    ///
    /// Units: radians
    pub fn turn_escape_angle_rad(&self) -> f64 {
        self.turn_escape_angle_deg.to_radians()
    }

    /// Check the parameters describe a controller that can run.
    pub fn validate(&self) -> Result<(), AvoidCtrlError> {
        check_positive("forward_speed_ms", self.forward_speed_ms)?;
        check_positive("turn_speed_rads", self.turn_speed_rads)?;
        check_positive("forward_clearance_m", self.forward_clearance_m)?;
        check_positive("side_clearance_m", self.side_clearance_m)?;
        check_positive("turn_escape_angle_deg", self.turn_escape_angle_deg)?;

        if self.turn_escape_angle_deg >= 180.0 {
            return Err(AvoidCtrlError::InvalidParam {
                name: "turn_escape_angle_deg",
                value: self.turn_escape_angle_deg,
                reason: "must be less than 180 degrees or turns never complete",
            });
        }

        Ok(())
    }
}

impl Default for AvoidCtrlParams {
    fn default() -> Self {
        Self {
            forward_speed_ms: 0.3,
            turn_speed_rads: 1.5,
            forward_clearance_m: 0.7,
            side_clearance_m: 0.6,
            turn_escape_angle_deg: 30.0,
        }
    }
}

fn check_positive(name: &'static str, value: f64) -> Result<(), AvoidCtrlError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    }
    else {
        Err(AvoidCtrlError::InvalidParam {
            name,
            value,
            reason: "must be a positive finite number",
        })
    }
}
