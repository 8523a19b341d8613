//! Drive executable entry point.
//!
//! # Architecture
//!
//! The general execution methodology consists of:
//!
//!     - Initialise the session, logging and parameters
//!     - Initialise the sensor snapshot and the avoidance controller
//!     - Start the measurement producers and the drive sink (the simulation, or a logging sink
//!       for dry runs)
//!     - Main loop, at the cycle frequency:
//!         - Read the sensor snapshot
//!         - Step the avoidance controller
//!         - Send the velocity command to the drive sink
//!     - On Ctrl-C, or when the requested duration has elapsed, send a zero velocity command and
//!       exit

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use color_eyre::{eyre::{eyre, WrapErr}, Result};
use log::{debug, info};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use structopt::StructOpt;

// Internal
use drive_lib::{
    avoid_ctrl::{AvoidCtrl, AvoidCtrlParams},
    drive_sink::{DriveSink, LogSink},
    driver::{CycleStats, Driver, DriverParams},
    params::DriveExecParams,
    sensor::SensorSnapshot,
    sim::{SimClient, SimParams},
};
use util::{
    archive::Archiver,
    host,
    logger::{logger_init, LevelFilter},
    module::State,
    session::Session,
};

// ---------------------------------------------------------------------------
// STRUCTS
// ---------------------------------------------------------------------------

/// Command line options.
#[derive(Debug, StructOpt)]
#[structopt(name = "drive_exec", about = "Reactive obstacle avoidance for a wheeled robot")]
struct Opts {
    /// Run without the simulation, logging the commands instead of driving
    #[structopt(long)]
    no_sim: bool,

    /// Stop after this many seconds instead of waiting for Ctrl-C
    #[structopt(long)]
    duration_s: Option<f64>,

    /// Minimum log level (info, debug or trace)
    #[structopt(long, default_value = "debug")]
    log_level: LevelFilter,
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Executable main function, entry point.
fn main() -> Result<()> {
    color_eyre::install()?;

    let opts = Opts::from_args();

    // ---- EARLY INITIALISATION ----

    // Initialise session
    let session = Session::new(
        "drive_exec",
        "sessions"
    ).wrap_err("Failed to create the session")?;

    // Initialise logger
    logger_init(opts.log_level, &session)
        .wrap_err("Failed to initialise logging")?;

    // Log information on this execution.
    info!("Oro Drive Executable\n");
    info!(
        "Running on: {:#?}",
        host::get_uname().wrap_err("Failed to get host information")?
    );
    info!("Session directory: {:?}\n", session.session_root);

    debug!("CLI options: {:?}", opts);

    // ---- LOAD PARAMETERS ----

    let exec_params: DriveExecParams = util::params::load("drive_exec.toml")
        .wrap_err("Could not load exec params")?;
    let avoid_ctrl_params: AvoidCtrlParams = util::params::load("avoid_ctrl.toml")
        .wrap_err("Could not load AvoidCtrl params")?;

    info!("Exec parameters loaded");

    // ---- INITIALISE MODULES ----

    info!("Initialising modules...");

    let avoid_ctrl = AvoidCtrl::init(avoid_ctrl_params)
        .wrap_err("Failed to initialise AvoidCtrl")?;
    info!("AvoidCtrl init complete");

    let snapshot = Arc::new(SensorSnapshot::new(exec_params.sensor));

    info!("Module initialisation complete\n");

    // ---- STOP SIGNAL ----

    let running = Arc::new(AtomicBool::new(true));

    let r = running.clone();
    ctrlc::set_handler(move || {
        info!("Received shutdown signal");
        r.store(false, Ordering::Relaxed);
    })
    .wrap_err("Failed to set the Ctrl-C handler")?;

    if let Some(duration_s) = opts.duration_s {
        if !(duration_s.is_finite() && duration_s > 0.0) {
            return Err(eyre!("Run duration must be positive, found {}", duration_s));
        }

        let r = running.clone();
        thread::spawn(move || {
            thread::sleep(Duration::from_secs_f64(duration_s));
            info!("Run duration of {} s elapsed", duration_s);
            r.store(false, Ordering::Relaxed);
        });
    }

    // ---- MAIN LOOP ----

    let stats = if opts.no_sim {
        info!("Dry run, commands will be logged only");

        run(avoid_ctrl, snapshot, LogSink::default(), &exec_params.driver, &session, &running)?
    }
    else {
        let sim_params: SimParams = util::params::load("sim.toml")
            .wrap_err("Could not load sim params")?;

        let sim_client = SimClient::start(sim_params, snapshot.clone())
            .wrap_err("Failed to initialise SimClient")?;
        info!("SimClient initialised");

        let mut driver = Driver::new(avoid_ctrl, snapshot, sim_client, &exec_params.driver)
            .wrap_err("Failed to initialise the Driver")?
            .with_archiver(cycle_archiver(&session)?);

        let stats = driver.run(&running)
            .wrap_err("Error while running the control loop")?;

        match driver.sink().pose() {
            Ok(pose) => info!(
                "Final sim pose: ({:.3}, {:.3}) m, {:.3} rad, closest approach to a wall {:.3} m",
                pose.position_m.x,
                pose.position_m.y,
                pose.heading_rad,
                pose.min_wall_clearance_m
            ),
            Err(e) => info!("Final sim pose unavailable: {}", e),
        }

        stats
    };

    info!(
        "{} cycles executed, {} overruns, {} drive command errors, {} archive errors",
        stats.num_cycles, stats.num_overruns, stats.num_sink_errors, stats.num_archive_errors
    );

    // ---- SHUTDOWN ----

    info!("End of execution");

    session.exit();

    Ok(())
}

/// Run the control loop against the given sink until the stop flag is cleared.
fn run<S: DriveSink>(
    avoid_ctrl: AvoidCtrl,
    snapshot: Arc<SensorSnapshot>,
    sink: S,
    params: &DriverParams,
    session: &Session,
    running: &AtomicBool,
) -> Result<CycleStats> {
    let mut driver = Driver::new(avoid_ctrl, snapshot, sink, params)
        .wrap_err("Failed to initialise the Driver")?
        .with_archiver(cycle_archiver(session)?);

    driver.run(running)
        .wrap_err("Error while running the control loop")
}

/// Open the per-cycle archive in the session's archive directory.
fn cycle_archiver(session: &Session) -> Result<Archiver> {
    Archiver::from_path(session, "drive_cycles.csv")
        .wrap_err("Failed to create the cycle archive")
}
