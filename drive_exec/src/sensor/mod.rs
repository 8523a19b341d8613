//! # Sensor snapshot
//!
//! Holds the most recent orientation and range measurements of the robot. Producers (the scan
//! and odometry callbacks, or the simulation) overwrite the values whenever a new measurement
//! arrives, and the controller reads them once per cycle. Each value lives in its own lock-free
//! cell so that neither side ever blocks. Reads are not atomic across fields, a reading may mix
//! values from two consecutive scans, which the controller tolerates as it re-evaluates every
//! cycle.
//!
//! A snapshot which has never been updated reads zero for every value, so the controller sees an
//! obstacle at zero distance on all sides and will not drive forward.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod cell;
mod params;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use comms_if::eqpt::{odom::Odometry, scan::LaserScan};
use log::{debug, trace};

// Internal
pub use cell::AtomicF64;
pub use params::SensorParams;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Latest sensor values, shared between the producers and the controller.
#[derive(Debug)]
pub struct SensorSnapshot {
    params: SensorParams,

    orientation_rad: AtomicF64,

    center_m: AtomicF64,
    left_m: AtomicF64,
    right_m: AtomicF64,

    /// Value non-finite ranges are clamped to
    max_range_m: AtomicF64,
}

/// One read of the snapshot, used for a single control cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SensorReading {
    /// Yaw of the robot.
    ///
    /// Units: radians
    pub orientation_rad: f64,

    /// Range straight ahead.
    ///
    /// Units: meters
    pub center_m: f64,

    /// Range to the front left.
    ///
    /// Units: meters
    pub left_m: f64,

    /// Range to the front right.
    ///
    /// Units: meters
    pub right_m: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl SensorSnapshot {
    pub fn new(params: SensorParams) -> Self {
        Self {
            max_range_m: AtomicF64::new(params.default_max_range_m),
            params,
            orientation_rad: AtomicF64::default(),
            center_m: AtomicF64::default(),
            left_m: AtomicF64::default(),
            right_m: AtomicF64::default(),
        }
    }

    /// Overwrite the orientation.
    ///
    /// Non-finite angles carry no information and are dropped, the previous orientation is kept.
    pub fn update_orientation(&self, angle_rad: f64) {
        if angle_rad.is_finite() {
            self.orientation_rad.store(angle_rad);
        }
        else {
            debug!("Dropping non-finite orientation {}", angle_rad);
        }
    }

    /// Overwrite the three range samples.
    ///
    /// Non-finite samples are clamped to the maximum range.
    pub fn update_ranges(&self, center_m: f64, left_m: f64, right_m: f64) {
        let max_range_m = self.max_range_m.load();

        self.center_m.store(clamp_range(center_m, max_range_m));
        self.left_m.store(clamp_range(left_m, max_range_m));
        self.right_m.store(clamp_range(right_m, max_range_m));
    }

    /// Read the current values.
    pub fn read(&self) -> SensorReading {
        SensorReading {
            orientation_rad: self.orientation_rad.load(),
            center_m: self.center_m.load(),
            left_m: self.left_m.load(),
            right_m: self.right_m.load(),
        }
    }

    /// Maximum range currently used to clamp non-finite samples.
    pub fn max_range_m(&self) -> f64 {
        self.max_range_m.load()
    }

    /// Update the orientation from an odometry message.
    pub fn update_from_odom(&self, odom: &Odometry) {
        let (x, y, z) = odom.q_xyz();
        self.update_orientation(util::maths::quat_to_yaw(odom.q_w(), x, y, z));
    }

    /// Update the ranges from a full scan.
    ///
    /// The scan's declared maximum range replaces the clamp value. A sample the scan does not
    /// cover is treated as an obstacle at zero distance.
    pub fn update_from_scan(&self, scan: &LaserScan) {
        if scan.range_max_m.is_finite() && scan.range_max_m > 0.0 {
            self.max_range_m.store(scan.range_max_m);
        }

        let (center_rad, left_rad, right_rad) = self.params.sample_angles_rad();

        let sample = |angle_rad: f64| match scan.range_at_angle(angle_rad) {
            Some(r) => r,
            None => {
                debug!(
                    "Scan of {} samples does not cover {:.1} deg, assuming blocked",
                    scan.ranges_m.len(),
                    angle_rad.to_degrees()
                );
                0.0
            }
        };

        let (center_m, left_m, right_m) = (sample(center_rad), sample(left_rad), sample(right_rad));

        trace!(
            "Scan ranges: center {:.3} m, left {:.3} m, right {:.3} m",
            center_m, left_m, right_m
        );

        self.update_ranges(center_m, left_m, right_m);
    }
}

impl Default for SensorSnapshot {
    fn default() -> Self {
        Self::new(SensorParams::default())
    }
}

// ---------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ---------------------------------------------------------------------------

fn clamp_range(range_m: f64, max_range_m: f64) -> f64 {
    if range_m.is_finite() {
        range_m
    }
    else {
        max_range_m
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    fn scan(ranges_m: Vec<f64>, range_max_m: f64) -> LaserScan {
        LaserScan {
            angle_min_rad: 0.0,
            angle_increment_rad: 1f64.to_radians(),
            range_min_m: 0.12,
            range_max_m,
            ranges_m,
        }
    }

    #[test]
    fn test_default_reads_zero() {
        let snapshot = SensorSnapshot::default();
        assert_eq!(snapshot.read(), SensorReading::default());
    }

    #[test]
    fn test_last_write_wins() {
        let snapshot = SensorSnapshot::default();

        snapshot.update_ranges(1.0, 2.0, 3.0);
        snapshot.update_orientation(0.5);
        snapshot.update_ranges(1.5, 0.4, 0.9);
        snapshot.update_orientation(-0.25);

        assert_eq!(
            snapshot.read(),
            SensorReading {
                orientation_rad: -0.25,
                center_m: 1.5,
                left_m: 0.4,
                right_m: 0.9
            }
        );
    }

    #[test]
    fn test_non_finite_ranges_clamped() {
        let snapshot = SensorSnapshot::new(SensorParams {
            default_max_range_m: 3.5,
            ..Default::default()
        });

        snapshot.update_ranges(f64::INFINITY, f64::NAN, f64::NEG_INFINITY);

        let r = snapshot.read();
        assert_eq!(r.center_m, 3.5);
        assert_eq!(r.left_m, 3.5);
        assert_eq!(r.right_m, 3.5);
    }

    #[test]
    fn test_non_finite_orientation_dropped() {
        let snapshot = SensorSnapshot::default();

        snapshot.update_orientation(1.0);
        snapshot.update_orientation(f64::NAN);

        assert_eq!(snapshot.read().orientation_rad, 1.0);
    }

    #[test]
    fn test_update_from_scan() {
        let snapshot = SensorSnapshot::default();

        let mut ranges_m = vec![2.0; 360];
        ranges_m[0] = 1.0;
        ranges_m[30] = 0.3;
        ranges_m[330] = f64::INFINITY;

        snapshot.update_from_scan(&scan(ranges_m, 8.0));

        let r = snapshot.read();
        assert_eq!(r.center_m, 1.0);
        assert_eq!(r.left_m, 0.3);
        assert_eq!(r.right_m, 8.0);
        assert_eq!(snapshot.max_range_m(), 8.0);
    }

    #[test]
    fn test_short_scan_is_blocked() {
        let snapshot = SensorSnapshot::default();

        // Only covers 0 to 9 degrees, so both sides are missing
        snapshot.update_from_scan(&scan(vec![2.0; 10], 3.5));

        let r = snapshot.read();
        assert_eq!(r.center_m, 2.0);
        assert_eq!(r.left_m, 0.0);
        assert_eq!(r.right_m, 0.0);
    }

    #[test]
    fn test_sector_scan_covers_both_sides() {
        let snapshot = SensorSnapshot::default();

        // Front sector whose edges fall on the side samples, with a little float error
        snapshot.update_from_scan(&LaserScan {
            angle_min_rad: -30f64.to_radians() + 1e-9,
            angle_increment_rad: 1f64.to_radians(),
            range_min_m: 0.12,
            range_max_m: 3.5,
            ranges_m: vec![2.0; 61],
        });

        let r = snapshot.read();
        assert_eq!(r.center_m, 2.0);
        assert_eq!(r.left_m, 2.0);
        assert_eq!(r.right_m, 2.0);
    }

    #[test]
    fn test_update_from_odom() {
        let snapshot = SensorSnapshot::default();
        let yaw = -2.5f64;

        snapshot.update_from_odom(&Odometry {
            position_m: [1.0, 2.0, 0.0],
            attitude_q: [0.0, 0.0, (yaw / 2.0).sin(), (yaw / 2.0).cos()],
        });

        assert!((snapshot.read().orientation_rad - yaw).abs() < 1e-12);
    }

    #[test]
    fn test_concurrent_producers() {
        let snapshot = Arc::new(SensorSnapshot::default());

        let handles: Vec<_> = (0..4)
            .map(|i| {
                let s = snapshot.clone();
                thread::spawn(move || {
                    for _ in 0..1000 {
                        s.update_ranges(i as f64, i as f64, i as f64);
                        s.update_orientation(i as f64);
                    }
                })
            })
            .collect();

        for h in handles {
            h.join().unwrap();
        }

        // Every field holds one of the written values, never a torn one
        let r = snapshot.read();
        for v in [r.orientation_rad, r.center_m, r.left_m, r.right_m].iter() {
            assert!((0..4).any(|i| i as f64 == *v));
        }
    }
}
