//! # Drive Executable Parameters
//!
//! This module provide parameters for the drive executable.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::Deserialize;

use crate::{driver::DriverParams, sensor::SensorParams};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct DriveExecParams {

    /// Control loop timing
    pub driver: DriverParams,

    /// Selection of the range samples from the scan
    pub sensor: SensorParams,
}
