//! # Communications interface crate.
//!
//! Provides the interface types exchanged between the drive software and its external
//! collaborators: range scans and odometry coming in, velocity commands going out.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Measurement and command definitions for equipment (like the ranger and the drive base)
pub mod eqpt;
