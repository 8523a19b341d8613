//! Modes of the avoidance state machine

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::Serialize;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// The active mode of AvoidCtrl.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AvoidMode {
    /// Choosing the next mode from the current ranges.
    SeekingDirection,

    /// Driving forward for a single cycle.
    DrivingForward,

    /// Turning clockwise until the escape angle is reached.
    TurningRight,

    /// Turning counter-clockwise until the escape angle is reached.
    TurningLeft,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl AvoidMode {
    /// Determine if the mode is one of the turning modes.
    pub fn is_turning(&self) -> bool {
        match self {
            AvoidMode::TurningRight | AvoidMode::TurningLeft => true,
            AvoidMode::SeekingDirection | AvoidMode::DrivingForward => false,
        }
    }
}

impl Default for AvoidMode {
    fn default() -> Self {
        AvoidMode::SeekingDirection
    }
}

impl std::fmt::Display for AvoidMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Debug::fmt(self, f)
    }
}
