//! Implementations for the AvoidCtrl state structure

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use comms_if::eqpt::drive::VelocityCommand;
use log::{debug, info, trace};
use std::convert::Infallible;

// Internal
use super::{AvoidCtrlError, AvoidCtrlParams, AvoidMode};
use crate::sensor::{SensorReading, SensorSnapshot};
use util::{maths::get_ang_dist, module::State};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Obstacle avoidance control module state
#[derive(Debug)]
pub struct AvoidCtrl {
    params: AvoidCtrlParams,

    /// Cached from the parameters
    escape_angle_rad: f64,

    mode: AvoidMode,

    /// Orientation latched when the current turn started.
    turn_ref_rad: f64,

    /// The last command emitted by the state machine.
    last_cmd: VelocityCommand,
}

/// Status report for AvoidCtrl processing.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StatusReport {
    /// Mode the step was evaluated in
    pub prev_mode: AvoidMode,

    /// Mode after the step
    pub mode: AvoidMode,

    /// True if the state machine emitted a new command this step, false if the previous command
    /// was held.
    pub cmd_emitted: bool,

    /// Rotation from the turn reference, if the step was evaluated in a turning mode.
    ///
    /// Units: radians
    pub turn_disp_rad: Option<f64>,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl State for AvoidCtrl {
    type InitData = AvoidCtrlParams;
    type InitError = AvoidCtrlError;

    type InputData = SensorReading;
    type OutputData = VelocityCommand;
    type StatusReport = StatusReport;
    type ProcError = Infallible;

    /// Initialise the AvoidCtrl module, validating the parameters.
    fn init(init_data: Self::InitData) -> Result<Self, Self::InitError> {
        init_data.validate()?;

        Ok(Self {
            escape_angle_rad: init_data.turn_escape_angle_rad(),
            params: init_data,
            mode: AvoidMode::default(),
            turn_ref_rad: 0.0,
            last_cmd: VelocityCommand::stop(),
        })
    }

    /// Perform one step of the state machine.
    fn proc(&mut self, input_data: &Self::InputData)
        -> Result<(Self::OutputData, Self::StatusReport), Self::ProcError>
    {
        let prev_mode = self.mode;

        let (mode, cmd, turn_disp_rad) = match self.mode {
            AvoidMode::SeekingDirection => (self.seek(input_data), None, None),
            AvoidMode::DrivingForward => (
                AvoidMode::SeekingDirection,
                Some(VelocityCommand::new(self.params.forward_speed_ms, 0.0)),
                None,
            ),
            AvoidMode::TurningRight => {
                let (m, c, d) = self.turn(input_data, -1.0);
                (m, c, Some(d))
            }
            AvoidMode::TurningLeft => {
                let (m, c, d) = self.turn(input_data, 1.0);
                (m, c, Some(d))
            }
        };

        if mode != prev_mode {
            if mode.is_turning() {
                debug!(
                    "AvoidCtrl: {} -> {} (ref {:.3} rad)",
                    prev_mode, mode, self.turn_ref_rad
                );
            }
            else {
                debug!("AvoidCtrl: {} -> {}", prev_mode, mode);
            }
        }
        self.mode = mode;

        if let Some(c) = cmd {
            self.last_cmd = c;
        }

        trace!(
            "AvoidCtrl output: lin {:.3} m/s, ang {:.3} rad/s ({})",
            self.last_cmd.linear_ms,
            self.last_cmd.angular_rads,
            if cmd.is_some() { "new" } else { "held" }
        );

        Ok((
            self.last_cmd,
            StatusReport {
                prev_mode,
                mode,
                cmd_emitted: cmd.is_some(),
                turn_disp_rad,
            },
        ))
    }
}

impl AvoidCtrl {
    /// Create a new controller in `SeekingDirection`, failing if the parameters are invalid.
    pub fn new(params: AvoidCtrlParams) -> Result<Self, AvoidCtrlError> {
        <Self as State>::init(params)
    }

    /// Read the snapshot and perform one control cycle, returning the command to send to the
    /// drive base this cycle.
    pub fn tick(&mut self, snapshot: &SensorSnapshot) -> VelocityCommand {
        self.tick_with_report(snapshot).0
    }

    /// As [`AvoidCtrl::tick`] but also returns the status report of the step.
    pub fn tick_with_report(&mut self, snapshot: &SensorSnapshot)
        -> (VelocityCommand, StatusReport)
    {
        self.step(&snapshot.read())
    }

    /// Perform one step on a reading already taken from the snapshot.
    pub fn step(&mut self, reading: &SensorReading) -> (VelocityCommand, StatusReport) {
        match self.proc(reading) {
            Ok(r) => r,
            Err(e) => match e {},
        }
    }

    /// Force the state machine back to `SeekingDirection` and clear the held command.
    ///
    /// Used whenever the controller's state cannot be trusted, for instance before (re)starting
    /// the control loop.
    pub fn reset(&mut self) {
        if self.mode != AvoidMode::SeekingDirection {
            info!("AvoidCtrl reset from {}", self.mode);
        }

        self.mode = AvoidMode::SeekingDirection;
        self.turn_ref_rad = 0.0;
        self.last_cmd = VelocityCommand::stop();
    }

    pub fn mode(&self) -> AvoidMode {
        self.mode
    }

    /// The latched turn reference, or `None` when not turning.
    pub fn turn_ref_rad(&self) -> Option<f64> {
        if self.mode.is_turning() {
            Some(self.turn_ref_rad)
        }
        else {
            None
        }
    }

    pub fn last_cmd(&self) -> VelocityCommand {
        self.last_cmd
    }

    pub fn params(&self) -> &AvoidCtrlParams {
        &self.params
    }

    /// Pick the next mode from the ranges, latching the turn reference if a turn starts.
    fn seek(&mut self, reading: &SensorReading) -> AvoidMode {
        let mut next = AvoidMode::SeekingDirection;

        if reading.center_m > self.params.forward_clearance_m {
            if reading.left_m < self.params.side_clearance_m {
                next = AvoidMode::TurningRight;
            }
            else if reading.right_m < self.params.side_clearance_m {
                next = AvoidMode::TurningLeft;
            }
            else {
                next = AvoidMode::DrivingForward;
            }
        }

        // Blocked front overrides any side decision. Written as a negation so that a NaN range
        // also counts as blocked.
        if !(reading.center_m > self.params.forward_clearance_m) {
            next = AvoidMode::TurningRight;
        }

        if next.is_turning() {
            self.turn_ref_rad = reading.orientation_rad;
        }

        next
    }

    /// Step a turn in the direction of `sign` (positive is left).
    ///
    /// Returns the next mode, the command if one is emitted, and the rotation from the turn
    /// reference.
    fn turn(&self, reading: &SensorReading, sign: f64)
        -> (AvoidMode, Option<VelocityCommand>, f64)
    {
        let disp_rad = get_ang_dist(self.turn_ref_rad, reading.orientation_rad).abs();

        if disp_rad >= self.escape_angle_rad {
            (AvoidMode::SeekingDirection, None, disp_rad)
        }
        else {
            (
                self.mode,
                Some(VelocityCommand::new(0.0, sign * self.params.turn_speed_rads)),
                disp_rad,
            )
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::f64::consts::PI;

    const FWD_MS: f64 = 0.3;
    const TURN_RADS: f64 = 1.5;

    fn ctrl() -> AvoidCtrl {
        AvoidCtrl::new(AvoidCtrlParams {
            forward_speed_ms: FWD_MS,
            turn_speed_rads: TURN_RADS,
            forward_clearance_m: 0.7,
            side_clearance_m: 0.6,
            turn_escape_angle_deg: 30.0,
        })
        .unwrap()
    }

    fn reading(orientation_rad: f64, center_m: f64, left_m: f64, right_m: f64) -> SensorReading {
        SensorReading {
            orientation_rad,
            center_m,
            left_m,
            right_m,
        }
    }

    fn step(c: &mut AvoidCtrl, r: SensorReading) -> (VelocityCommand, StatusReport) {
        c.proc(&r).unwrap()
    }

    #[test]
    fn test_invalid_params_fail_init() {
        let r = AvoidCtrl::new(AvoidCtrlParams {
            forward_clearance_m: -0.7,
            ..Default::default()
        });
        assert!(r.is_err());
    }

    #[test]
    fn test_clear_path_drives_forward() {
        let mut c = ctrl();
        let r = reading(0.0, 1.0, 0.8, 0.8);

        let (cmd, rpt) = step(&mut c, r);
        assert_eq!(rpt.mode, AvoidMode::DrivingForward);
        assert!(!rpt.cmd_emitted);
        assert_eq!(cmd, VelocityCommand::stop());

        let (cmd, rpt) = step(&mut c, r);
        assert_eq!(rpt.prev_mode, AvoidMode::DrivingForward);
        assert_eq!(rpt.mode, AvoidMode::SeekingDirection);
        assert_eq!(cmd, VelocityCommand::new(FWD_MS, 0.0));

        // Seeking again holds the forward command
        let (cmd, rpt) = step(&mut c, r);
        assert_eq!(rpt.mode, AvoidMode::DrivingForward);
        assert_eq!(cmd, VelocityCommand::new(FWD_MS, 0.0));
    }

    #[test]
    fn test_left_blocked_turns_right() {
        let mut c = ctrl();

        let (_, rpt) = step(&mut c, reading(0.4, 1.0, 0.3, 0.8));
        assert_eq!(rpt.mode, AvoidMode::TurningRight);
        assert_eq!(c.turn_ref_rad(), Some(0.4));

        let (cmd, _) = step(&mut c, reading(0.4, 1.0, 0.3, 0.8));
        assert_eq!(cmd, VelocityCommand::new(0.0, -TURN_RADS));
    }

    #[test]
    fn test_right_blocked_turns_left() {
        let mut c = ctrl();

        let (_, rpt) = step(&mut c, reading(-1.0, 1.0, 0.8, 0.3));
        assert_eq!(rpt.mode, AvoidMode::TurningLeft);
        assert_eq!(c.turn_ref_rad(), Some(-1.0));

        let (cmd, _) = step(&mut c, reading(-1.0, 1.0, 0.8, 0.3));
        assert_eq!(cmd, VelocityCommand::new(0.0, TURN_RADS));
    }

    #[test]
    fn test_both_sides_blocked_prefers_right_turn() {
        let mut c = ctrl();

        let (_, rpt) = step(&mut c, reading(0.0, 1.0, 0.3, 0.3));
        assert_eq!(rpt.mode, AvoidMode::TurningRight);
    }

    #[test]
    fn test_front_blocked_overrides_sides() {
        for &(left_m, right_m) in [(0.8, 0.8), (0.3, 0.8), (0.8, 0.3), (0.1, 0.1)].iter() {
            let mut c = ctrl();
            let (_, rpt) = step(&mut c, reading(2.0, 0.5, left_m, right_m));
            assert_eq!(rpt.mode, AvoidMode::TurningRight);
            assert_eq!(c.turn_ref_rad(), Some(2.0));
        }

        // Exactly at the threshold counts as blocked
        let mut c = ctrl();
        let (_, rpt) = step(&mut c, reading(0.0, 0.7, 0.8, 0.8));
        assert_eq!(rpt.mode, AvoidMode::TurningRight);

        // As does a NaN range
        let mut c = ctrl();
        let (_, rpt) = step(&mut c, reading(0.0, f64::NAN, 0.8, 0.8));
        assert_eq!(rpt.mode, AvoidMode::TurningRight);
    }

    #[test]
    fn test_turn_completes_at_escape_angle() {
        let mut c = ctrl();
        let escape = 30f64.to_radians();

        step(&mut c, reading(0.0, 0.5, 0.8, 0.8));
        assert_eq!(c.mode(), AvoidMode::TurningRight);

        // Rotating clockwise, just short of the escape angle
        let (cmd, rpt) = step(&mut c, reading(-(escape - 0.01), 0.5, 0.8, 0.8));
        assert_eq!(rpt.mode, AvoidMode::TurningRight);
        assert_eq!(cmd, VelocityCommand::new(0.0, -TURN_RADS));

        // Reached
        let (cmd, rpt) = step(&mut c, reading(-(escape + 0.01), 0.5, 0.8, 0.8));
        assert_eq!(rpt.mode, AvoidMode::SeekingDirection);
        assert!(!rpt.cmd_emitted);
        assert!(rpt.turn_disp_rad.unwrap() >= escape);
        assert_eq!(c.turn_ref_rad(), None);

        // The turn command is held while re-evaluating
        assert_eq!(cmd, VelocityCommand::new(0.0, -TURN_RADS));
    }

    #[test]
    fn test_turn_across_pi_boundary() {
        let mut c = ctrl();

        // Start a left turn just below +pi
        let start = PI - 0.1;
        step(&mut c, reading(start, 1.0, 0.8, 0.3));
        assert_eq!(c.mode(), AvoidMode::TurningLeft);

        // Orientation wraps to just above -pi, only 0.2 rad of rotation. Raw subtraction would
        // see nearly 2pi and end the turn here.
        let (cmd, rpt) = step(&mut c, reading(-PI + 0.1, 1.0, 0.8, 0.3));
        assert_eq!(rpt.mode, AvoidMode::TurningLeft);
        assert!((rpt.turn_disp_rad.unwrap() - 0.2).abs() < 1e-9);
        assert_eq!(cmd, VelocityCommand::new(0.0, TURN_RADS));

        // 0.6 rad past the start is beyond the escape angle
        let (_, rpt) = step(&mut c, reading(-PI + 0.5, 1.0, 0.8, 0.3));
        assert_eq!(rpt.mode, AvoidMode::SeekingDirection);
    }

    #[test]
    fn test_default_snapshot_turns_never_drives() {
        let snapshot = SensorSnapshot::default();
        let mut c = ctrl();

        // The seek step emits nothing, so the held zero command goes out while the turn starts
        let (cmd, rpt) = c.tick_with_report(&snapshot);
        assert_eq!(rpt.mode, AvoidMode::TurningRight);
        assert!(!rpt.cmd_emitted);
        assert_eq!(cmd, VelocityCommand::stop());

        // Stays turning on the spot while nothing arrives
        for _ in 0..100 {
            let cmd = c.tick(&snapshot);
            assert_eq!(cmd, VelocityCommand::new(0.0, -TURN_RADS));
        }
    }

    #[test]
    fn test_repeated_tick_is_idempotent() {
        let snapshot = SensorSnapshot::default();
        snapshot.update_ranges(0.5, 0.8, 0.8);

        let mut c = ctrl();
        c.tick(&snapshot);
        assert_eq!(c.mode(), AvoidMode::TurningRight);

        let a = c.tick(&snapshot);
        let mode_a = c.mode();
        let b = c.tick(&snapshot);

        assert_eq!(a, b);
        assert_eq!(mode_a, c.mode());
    }

    #[test]
    fn test_command_magnitudes() {
        let mut c = ctrl();

        // Sweep through a mix of readings and check every command uses the fixed magnitudes
        for i in 0..2000 {
            let t = i as f64 * 0.01;
            let r = reading(
                util::maths::wrap_pi(t * 0.7),
                0.4 + (t * 1.3).sin().abs(),
                0.3 + (t * 0.9).cos().abs(),
                0.3 + (t * 1.1).sin().abs(),
            );
            let (cmd, _) = step(&mut c, r);

            assert!(cmd.linear_ms == 0.0 || cmd.linear_ms == FWD_MS);
            assert!(cmd.angular_rads.abs() == 0.0 || cmd.angular_rads.abs() == TURN_RADS);
            assert!(cmd.linear_ms == 0.0 || cmd.angular_rads == 0.0);
        }
    }

    #[test]
    fn test_reset() {
        let mut c = ctrl();

        step(&mut c, reading(1.0, 0.5, 0.8, 0.8));
        step(&mut c, reading(1.0, 0.5, 0.8, 0.8));
        assert_eq!(c.mode(), AvoidMode::TurningRight);
        assert!(!c.last_cmd().is_stop());

        c.reset();
        assert_eq!(c.mode(), AvoidMode::SeekingDirection);
        assert_eq!(c.turn_ref_rad(), None);
        assert!(c.last_cmd().is_stop());

        // Behaves as freshly initialised
        let (_, rpt) = step(&mut c, reading(0.0, 1.0, 0.8, 0.8));
        assert_eq!(rpt.prev_mode, AvoidMode::SeekingDirection);
        assert_eq!(rpt.mode, AvoidMode::DrivingForward);
    }
}
