//! # Drive sink
//!
//! Abstraction over whatever carries velocity commands to the motors. The driver hands every
//! cycle's command to a [`DriveSink`] exactly once.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use comms_if::eqpt::drive::VelocityCommand;
use log::info;

// ---------------------------------------------------------------------------
// TRAITS
// ---------------------------------------------------------------------------

/// Receiver of the body velocity commands.
pub trait DriveSink {
    /// Send a command to the drive base. The command replaces any previous one.
    fn send(&mut self, cmd: &VelocityCommand) -> Result<(), DriveSinkError>;
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Errors that can occur while sending a command.
#[derive(Debug, thiserror::Error)]
pub enum DriveSinkError {
    #[error("The drive base is not connected")]
    NotConnected,
}

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A sink which only logs the commands it receives, used for dry runs without a drive base.
///
/// Only changes of command are logged to keep the log readable at high cycle rates.
#[derive(Debug, Default)]
pub struct LogSink {
    last: Option<VelocityCommand>,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl DriveSink for LogSink {
    fn send(&mut self, cmd: &VelocityCommand) -> Result<(), DriveSinkError> {
        if self.last.as_ref() != Some(cmd) {
            info!(
                "Drive command: lin {:.3} m/s, ang {:.3} rad/s",
                cmd.linear_ms, cmd.angular_rads
            );
            self.last = Some(*cmd);
        }

        Ok(())
    }
}

impl<S: DriveSink + ?Sized> DriveSink for Box<S> {
    fn send(&mut self, cmd: &VelocityCommand) -> Result<(), DriveSinkError> {
        (**self).send(cmd)
    }
}
