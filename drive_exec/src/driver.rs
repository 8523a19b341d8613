//! # Driver
//!
//! Runs the avoidance controller at a fixed rate. Each cycle the controller reads the sensor
//! snapshot and the resulting command is handed to the drive sink. When the stop flag is cleared
//! the loop exits and a final zero command is sent so the robot is not left moving.
//!
//! When an archiver is attached every cycle's reading, mode change and command is written as one
//! row of the archive.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use comms_if::eqpt::drive::VelocityCommand;
use log::{error, info, warn};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

// Internal
use crate::avoid_ctrl::{AvoidCtrl, AvoidMode, StatusReport};
use crate::drive_sink::{DriveSink, DriveSinkError};
use crate::sensor::{SensorReading, SensorSnapshot};
use util::archive::Archiver;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters of the control loop.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct DriverParams {
    /// Number of control cycles per second.
    ///
    /// Units: hertz
    pub cycle_frequency_hz: f64,

    /// Number of consecutive cycle overruns after which an error is logged.
    pub max_consec_overruns: u64,
}

/// Counters describing the loop's execution.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CycleStats {
    /// Number of cycles executed
    pub num_cycles: u64,

    /// Total number of cycles which overran the cycle period
    pub num_overruns: u64,

    /// Number of consecutive cycle overruns
    pub num_consec_overruns: u64,

    /// Number of commands the sink failed to send
    pub num_sink_errors: u64,

    /// Number of cycle records the archiver failed to write
    pub num_archive_errors: u64,
}

/// One archived control cycle.
#[derive(Debug, Clone, Copy, Serialize)]
struct CycleRecord {
    time_s: f64,

    orientation_rad: f64,
    center_m: f64,
    left_m: f64,
    right_m: f64,

    prev_mode: AvoidMode,
    mode: AvoidMode,
    cmd_emitted: bool,
    turn_disp_rad: Option<f64>,

    linear_ms: f64,
    angular_rads: f64,
}

/// Periodic driver of the avoidance controller.
pub struct Driver<S: DriveSink> {
    ctrl: AvoidCtrl,
    snapshot: Arc<SensorSnapshot>,
    sink: S,

    cycle_period: Duration,
    max_consec_overruns: u64,

    stats: CycleStats,

    arch_cycles: Option<Archiver>,

    /// Set once the final zero command has been sent
    stopped: bool,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Errors that can occur in the driver.
#[derive(Debug, thiserror::Error)]
pub enum DriverError {
    #[error("The cycle frequency must be a positive number, found {0}")]
    InvalidFrequency(f64),

    #[error("Could not send the stop command to the drive base: {0}")]
    StopCmdFailed(DriveSinkError),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for DriverParams {
    fn default() -> Self {
        Self {
            cycle_frequency_hz: 125.0,
            max_consec_overruns: 125,
        }
    }
}

impl<S: DriveSink> Driver<S> {
    pub fn new(
        ctrl: AvoidCtrl,
        snapshot: Arc<SensorSnapshot>,
        sink: S,
        params: &DriverParams,
    ) -> Result<Self, DriverError> {
        let cycle_period = util::time::frequency_to_period(params.cycle_frequency_hz)
            .ok_or(DriverError::InvalidFrequency(params.cycle_frequency_hz))?;

        Ok(Self {
            ctrl,
            snapshot,
            sink,
            cycle_period,
            max_consec_overruns: params.max_consec_overruns,
            stats: CycleStats::default(),
            arch_cycles: None,
            stopped: false,
        })
    }

    /// Archive every following cycle with the given archiver.
    pub fn with_archiver(mut self, archiver: Archiver) -> Self {
        self.arch_cycles = Some(archiver);
        self
    }

    /// Execute a single control cycle without any timing, returning the command that was sent.
    ///
    /// Sink failures are counted and logged, the next cycle sends a fresh command anyway.
    pub fn cycle(&mut self) -> VelocityCommand {
        let reading = self.snapshot.read();
        let (cmd, report) = self.ctrl.step(&reading);

        if let Err(e) = self.sink.send(&cmd) {
            self.stats.num_sink_errors += 1;
            warn!("Could not send drive command: {}", e);
        }

        if let Some(ref mut arch) = self.arch_cycles {
            let record = CycleRecord::new(&reading, &report, &cmd);

            if let Err(e) = arch.serialise(record) {
                self.stats.num_archive_errors += 1;
                warn!("Could not archive the cycle: {}", e);
            }
        }

        self.stats.num_cycles += 1;
        self.stopped = false;

        cmd
    }

    /// Run the control loop until `running` is cleared, then stop the robot.
    ///
    /// The controller is reset before the first cycle.
    pub fn run(&mut self, running: &AtomicBool) -> Result<CycleStats, DriverError> {
        self.ctrl.reset();

        info!(
            "Beginning control loop at {:.1} Hz",
            1.0 / self.cycle_period.as_secs_f64()
        );

        while running.load(Ordering::Relaxed) {
            let cycle_start_instant = Instant::now();

            self.cycle();

            // ---- CYCLE MANAGEMENT ----

            let cycle_dur = Instant::now() - cycle_start_instant;

            match self.cycle_period.checked_sub(cycle_dur) {
                Some(d) => {
                    self.stats.num_consec_overruns = 0;
                    thread::sleep(d);
                }
                None => {
                    warn!(
                        "Cycle overran by {:.06} s",
                        cycle_dur.as_secs_f64() - self.cycle_period.as_secs_f64()
                    );
                    self.stats.num_overruns += 1;
                    self.stats.num_consec_overruns += 1;

                    if self.stats.num_consec_overruns == self.max_consec_overruns {
                        error!(
                            "{} consecutive cycle overruns, the control rate cannot be held",
                            self.max_consec_overruns
                        );
                    }
                }
            }
        }

        info!("Control loop stopped after {} cycles", self.stats.num_cycles);

        self.stop()?;

        Ok(self.stats)
    }

    /// Send the zero command, bringing the robot to a stop.
    pub fn stop(&mut self) -> Result<(), DriverError> {
        let result = self
            .sink
            .send(&VelocityCommand::stop())
            .map_err(DriverError::StopCmdFailed);

        if result.is_ok() {
            info!("Stop command sent");
        }

        // Only one attempt is made, repeating a failed stop on drop would not help
        self.stopped = true;

        result
    }

    pub fn stats(&self) -> CycleStats {
        self.stats
    }

    pub fn ctrl(&self) -> &AvoidCtrl {
        &self.ctrl
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }
}

impl CycleRecord {
    fn new(reading: &SensorReading, report: &StatusReport, cmd: &VelocityCommand) -> Self {
        Self {
            time_s: util::session::get_elapsed_seconds(),
            orientation_rad: reading.orientation_rad,
            center_m: reading.center_m,
            left_m: reading.left_m,
            right_m: reading.right_m,
            prev_mode: report.prev_mode,
            mode: report.mode,
            cmd_emitted: report.cmd_emitted,
            turn_disp_rad: report.turn_disp_rad,
            linear_ms: cmd.linear_ms,
            angular_rads: cmd.angular_rads,
        }
    }
}

impl<S: DriveSink> Drop for Driver<S> {
    fn drop(&mut self) {
        if !self.stopped {
            warn!("Driver dropped while the robot may be moving, sending stop command");
            if let Err(e) = self.stop() {
                error!("{}", e);
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::avoid_ctrl::{AvoidCtrlParams, AvoidMode};
    use std::sync::Mutex;

    #[derive(Clone, Default)]
    struct RecordingSink {
        sent: Arc<Mutex<Vec<VelocityCommand>>>,
        fail: bool,
    }

    impl DriveSink for RecordingSink {
        fn send(&mut self, cmd: &VelocityCommand) -> Result<(), DriveSinkError> {
            if self.fail {
                return Err(DriveSinkError::NotConnected);
            }
            self.sent.lock().unwrap().push(*cmd);
            Ok(())
        }
    }

    fn driver(sink: RecordingSink, snapshot: Arc<SensorSnapshot>) -> Driver<RecordingSink> {
        Driver::new(
            AvoidCtrl::new(AvoidCtrlParams::default()).unwrap(),
            snapshot,
            sink,
            &DriverParams {
                cycle_frequency_hz: 500.0,
                max_consec_overruns: 10,
            },
        )
        .unwrap()
    }

    #[test]
    fn test_invalid_frequency() {
        let r = Driver::new(
            AvoidCtrl::new(AvoidCtrlParams::default()).unwrap(),
            Arc::new(SensorSnapshot::default()),
            RecordingSink::default(),
            &DriverParams {
                cycle_frequency_hz: 0.0,
                max_consec_overruns: 10,
            },
        );
        assert!(matches!(r, Err(DriverError::InvalidFrequency(_))));
    }

    #[test]
    fn test_cycle_sends_once_per_cycle() {
        let sink = RecordingSink::default();
        let snapshot = Arc::new(SensorSnapshot::default());
        snapshot.update_ranges(2.0, 2.0, 2.0);

        let mut d = driver(sink.clone(), snapshot);

        for _ in 0..4 {
            d.cycle();
        }

        let sent = sink.sent.lock().unwrap().clone();
        assert_eq!(sent.len(), 4);
        assert_eq!(sent[1], VelocityCommand::new(0.3, 0.0));
        assert_eq!(d.stats().num_cycles, 4);
        assert_eq!(d.ctrl().mode(), AvoidMode::SeekingDirection);
    }

    #[test]
    fn test_run_ends_with_stop() {
        let sink = RecordingSink::default();
        let snapshot = Arc::new(SensorSnapshot::default());
        snapshot.update_ranges(2.0, 2.0, 2.0);

        let mut d = driver(sink.clone(), snapshot);

        let running = Arc::new(AtomicBool::new(true));
        let r = running.clone();
        let stopper = thread::spawn(move || {
            thread::sleep(Duration::from_millis(50));
            r.store(false, Ordering::Relaxed);
        });

        let stats = d.run(&running).unwrap();
        stopper.join().unwrap();

        let sent = sink.sent.lock().unwrap().clone();
        assert!(stats.num_cycles > 0);
        assert_eq!(sent.len() as u64, stats.num_cycles + 1);
        assert!(sent.iter().any(|c| c.linear_ms > 0.0));
        assert!(sent.last().unwrap().is_stop());
    }

    #[test]
    fn test_run_with_stop_already_requested() {
        let sink = RecordingSink::default();
        let mut d = driver(sink.clone(), Arc::new(SensorSnapshot::default()));

        let stats = d.run(&AtomicBool::new(false)).unwrap();

        assert_eq!(stats.num_cycles, 0);
        assert_eq!(*sink.sent.lock().unwrap(), vec![VelocityCommand::stop()]);
    }

    #[test]
    fn test_drop_sends_stop() {
        let sink = RecordingSink::default();
        let snapshot = Arc::new(SensorSnapshot::default());
        snapshot.update_ranges(2.0, 2.0, 2.0);

        {
            let mut d = driver(sink.clone(), snapshot);
            d.cycle();
            d.cycle();
        }

        let sent = sink.sent.lock().unwrap().clone();
        assert_eq!(sent.len(), 3);
        assert_eq!(sent[1], VelocityCommand::new(0.3, 0.0));
        assert!(sent[2].is_stop());
    }

    #[test]
    fn test_no_second_stop_on_drop() {
        let sink = RecordingSink::default();

        {
            let mut d = driver(sink.clone(), Arc::new(SensorSnapshot::default()));
            d.cycle();
            d.stop().unwrap();
        }

        assert_eq!(sink.sent.lock().unwrap().len(), 2);
    }

    #[test]
    fn test_cycles_archived() {
        let path = std::env::temp_dir()
            .join(format!("drive_cycles_test_{}.csv", std::process::id()));

        let sink = RecordingSink::default();
        let snapshot = Arc::new(SensorSnapshot::default());
        snapshot.update_ranges(2.0, 2.0, 2.0);

        {
            let mut d = driver(sink, snapshot)
                .with_archiver(Archiver::from_file_path(&path).unwrap());

            d.cycle();
            d.cycle();
            d.cycle();
            assert_eq!(d.stats().num_archive_errors, 0);
        }

        let contents = std::fs::read_to_string(&path).unwrap();
        std::fs::remove_file(&path).unwrap();

        let lines: Vec<_> = contents.lines().collect();
        assert_eq!(lines.len(), 4);
        assert!(lines[0].starts_with("time_s,orientation_rad,center_m,left_m,right_m,prev_mode,mode"));

        // Seek decides to drive, then the forward command goes out
        assert!(lines[1].contains("SeekingDirection,DrivingForward,false,,0.0,0.0"));
        assert!(lines[2].contains("DrivingForward,SeekingDirection,true,,0.3,0.0"));
    }

    #[test]
    fn test_sink_errors_counted() {
        let sink = RecordingSink {
            fail: true,
            ..Default::default()
        };
        let mut d = driver(sink, Arc::new(SensorSnapshot::default()));

        d.cycle();
        d.cycle();
        assert_eq!(d.stats().num_sink_errors, 2);
        assert_eq!(d.stats().num_cycles, 2);

        assert!(matches!(d.stop(), Err(DriverError::StopCmdFailed(_))));
    }
}
