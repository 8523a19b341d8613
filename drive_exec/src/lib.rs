//! # Drive library.
//!
//! This library allows other crates in the workspace (and the benchmarks) to access items defined
//! inside the drive executable crate.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Obstacle avoidance control module - turns range readings into velocity commands
pub mod avoid_ctrl;

/// Drive sink - carries velocity commands to the drive base
pub mod drive_sink;

/// Driver - runs the avoidance controller at a fixed rate
pub mod driver;

/// Executable parameters
pub mod params;

/// Sensor snapshot - latest orientation and ranges shared with the producers
pub mod sensor;

/// Simulation client - a simulated arena standing in for the robot
pub mod sim;
