//! # Simulation Client
//!
//! The SimClient stands in for the real robot during development. It runs a [`SimWorld`] on a
//! background thread which:
//!
//! - integrates the latest velocity command sent to the client, acting as the drive base,
//! - publishes a range scan and an odometry pose into the [`SensorSnapshot`] every step.
//!
//! Commands are taken as they come, so the simulation sees exactly what the drive base would.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

mod params;
mod world;

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex,
    },
    thread::{self, JoinHandle},
    time::Duration,
};

use comms_if::eqpt::drive::VelocityCommand;
use log::{error, info};
use nalgebra::Vector2;

use crate::{
    drive_sink::{DriveSink, DriveSinkError},
    sensor::SensorSnapshot,
};

pub use params::SimParams;
pub use world::SimWorld;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

pub struct SimClient {
    bg_jh: Option<JoinHandle<()>>,
    bg_run: Arc<AtomicBool>,
    cmd: Arc<Mutex<VelocityCommand>>,
    pose: Arc<Mutex<SimPose>>,
}

/// Ground truth state of the simulated robot.
#[derive(Debug, Clone, Copy)]
pub struct SimPose {
    /// Units: meters
    pub position_m: Vector2<f64>,

    /// Units: radians
    pub heading_rad: f64,

    /// Distance to the closest wall.
    ///
    /// Units: meters
    pub wall_clearance_m: f64,

    /// Smallest wall clearance seen since the simulation started.
    ///
    /// Units: meters
    pub min_wall_clearance_m: f64,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum SimClientError {
    #[error("Invalid simulation parameters: {0}")]
    InvalidParams(&'static str),

    #[error("The simulation thread has stopped")]
    NotRunning,

    #[error("Could not spawn the simulation thread: {0}")]
    SpawnError(std::io::Error),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl SimClient {
    /// Start the simulation, publishing into the given snapshot.
    ///
    /// The snapshot is fed one scan and pose before this function returns.
    pub fn start(params: SimParams, snapshot: Arc<SensorSnapshot>) -> Result<Self, SimClientError> {
        let step_period = util::time::frequency_to_period(params.step_frequency_hz)
            .ok_or(SimClientError::InvalidParams("step frequency must be positive"))?;

        let world = SimWorld::new(params)?;
        publish(&world, &snapshot);

        // Create the data shared objects
        let bg_run = Arc::new(AtomicBool::new(true));
        let cmd = Arc::new(Mutex::new(VelocityCommand::stop()));
        let pose = Arc::new(Mutex::new(SimPose::from_world(&world, None)));

        // Create clones of these to pass to the bg thread
        let bg_run_clone = bg_run.clone();
        let cmd_clone = cmd.clone();
        let pose_clone = pose.clone();

        // Start BG thread
        let bg_jh = thread::Builder::new()
            .name(String::from("sim"))
            .spawn(move || {
                bg_thread(world, step_period, snapshot, bg_run_clone, cmd_clone, pose_clone)
            })
            .map_err(SimClientError::SpawnError)?;

        info!(
            "Simulation started at {:.1} Hz",
            1.0 / step_period.as_secs_f64()
        );

        Ok(Self {
            bg_jh: Some(bg_jh),
            bg_run,
            cmd,
            pose,
        })
    }

    /// Get the ground truth pose of the simulated robot.
    pub fn pose(&self) -> Result<SimPose, SimClientError> {
        self.pose
            .lock()
            .map(|p| *p)
            .map_err(|_| SimClientError::NotRunning)
    }

    pub fn is_running(&self) -> bool {
        self.bg_run.load(Ordering::Relaxed)
    }

    /// Stop the simulation thread and wait for it to exit.
    pub fn stop(&mut self) {
        self.bg_run.store(false, Ordering::Relaxed);

        if let Some(jh) = self.bg_jh.take() {
            if jh.join().is_err() {
                error!("Simulation thread panicked");
            }
            info!("Simulation stopped");
        }
    }
}

impl DriveSink for SimClient {
    fn send(&mut self, cmd: &VelocityCommand) -> Result<(), DriveSinkError> {
        if !self.is_running() {
            return Err(DriveSinkError::NotConnected);
        }

        let mut c = self.cmd.lock().map_err(|_| DriveSinkError::NotConnected)?;
        *c = *cmd;

        Ok(())
    }
}

impl Drop for SimClient {
    fn drop(&mut self) {
        self.stop();
    }
}

impl SimPose {
    fn from_world(world: &SimWorld, prev: Option<&SimPose>) -> Self {
        let wall_clearance_m = world.wall_clearance_m();

        Self {
            position_m: world.position_m(),
            heading_rad: world.heading_rad(),
            wall_clearance_m,
            min_wall_clearance_m: prev
                .map(|p| p.min_wall_clearance_m.min(wall_clearance_m))
                .unwrap_or(wall_clearance_m),
        }
    }
}

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Publish the world's measurements into the snapshot.
fn publish(world: &SimWorld, snapshot: &SensorSnapshot) {
    snapshot.update_from_scan(&world.scan());
    snapshot.update_from_odom(&world.odometry());
}

/// Background thread, steps the world and publishes its measurements.
fn bg_thread(
    mut world: SimWorld,
    step_period: Duration,
    snapshot: Arc<SensorSnapshot>,
    run: Arc<AtomicBool>,
    cmd: Arc<Mutex<VelocityCommand>>,
    pose: Arc<Mutex<SimPose>>,
) {
    let dt_s = step_period.as_secs_f64();

    // While instructed to run
    while run.load(Ordering::Relaxed) {
        let current_cmd = match cmd.lock() {
            Ok(c) => *c,
            Err(_) => {
                error!("SimClient: cmd mutex poisoned, stopping simulation");
                break;
            }
        };

        world.step(&current_cmd, dt_s);
        publish(&world, &snapshot);

        match pose.lock() {
            Ok(mut p) => *p = SimPose::from_world(&world, Some(&*p)),
            Err(_) => {
                error!("SimClient: pose mutex poisoned, stopping simulation");
                break;
            }
        }

        thread::sleep(step_period);
    }

    run.store(false, Ordering::Relaxed);
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::avoid_ctrl::{AvoidCtrl, AvoidCtrlParams};

    #[test]
    fn test_closed_loop_avoids_walls() {
        let params = SimParams::default();
        let mut world = SimWorld::new(params).unwrap();
        let snapshot = SensorSnapshot::default();
        let mut ctrl = AvoidCtrl::new(AvoidCtrlParams::default()).unwrap();

        let dt_s = 1.0 / 125.0;
        let mut travelled_m = 0.0;
        let mut min_clearance_m = f64::INFINITY;

        // One simulated minute at the control rate
        for _ in 0..(60 * 125) {
            publish(&world, &snapshot);

            let cmd = ctrl.tick(&snapshot);

            let before = world.position_m();
            world.step(&cmd, dt_s);
            travelled_m += (world.position_m() - before).norm();

            min_clearance_m = min_clearance_m.min(world.wall_clearance_m());
        }

        assert!(
            min_clearance_m > 0.2,
            "Robot came within {} m of a wall",
            min_clearance_m
        );
        assert!(travelled_m > 1.0, "Robot only travelled {} m", travelled_m);
    }

    #[test]
    fn test_client_publishes_and_follows_commands() {
        let snapshot = Arc::new(SensorSnapshot::default());
        let mut client = SimClient::start(SimParams::default(), snapshot.clone()).unwrap();

        // Initial publication, facing the +X wall 2 m away
        let r = snapshot.read();
        assert!((r.center_m - 2.0).abs() < 1e-9);
        assert!(r.orientation_rad.abs() < 1e-9);

        client.send(&VelocityCommand::new(0.0, 1.0)).unwrap();
        thread::sleep(Duration::from_millis(100));
        client.send(&VelocityCommand::stop()).unwrap();

        let pose = client.pose().unwrap();
        assert!(pose.heading_rad > 0.0);
        assert!(snapshot.read().orientation_rad > 0.0);
        assert!((pose.position_m - Vector2::new(2.0, 2.0)).norm() < 1e-9);

        client.stop();
        assert!(!client.is_running());
        assert!(matches!(
            client.send(&VelocityCommand::stop()),
            Err(DriveSinkError::NotConnected)
        ));
    }

    #[test]
    fn test_invalid_step_frequency() {
        let r = SimClient::start(
            SimParams {
                step_frequency_hz: 0.0,
                ..Default::default()
            },
            Arc::new(SensorSnapshot::default()),
        );
        assert!(matches!(r, Err(SimClientError::InvalidParams(_))));
    }
}
