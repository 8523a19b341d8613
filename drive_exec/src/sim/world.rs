//! Kinematic model of the robot in a walled arena

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use comms_if::eqpt::{drive::VelocityCommand, odom::Odometry, scan::LaserScan};
use nalgebra::{UnitQuaternion, Vector2};
use std::f64::consts::TAU;

// Internal
use super::{SimClientError, SimParams};
use util::maths::wrap_pi;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A point robot with unicycle kinematics inside a rectangular arena.
///
/// The robot cannot leave the arena, a command driving it into a wall leaves it pressed against
/// the wall.
#[derive(Debug, Clone)]
pub struct SimWorld {
    params: SimParams,

    position_m: Vector2<f64>,
    heading_rad: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl SimWorld {
    pub fn new(params: SimParams) -> Result<Self, SimClientError> {
        let [size_x, size_y] = params.arena_size_m;
        let [start_x, start_y] = params.start_position_m;

        if !(size_x > 0.0 && size_y > 0.0) {
            return Err(SimClientError::InvalidParams("arena size must be positive"));
        }
        if !(start_x > 0.0 && start_x < size_x && start_y > 0.0 && start_y < size_y) {
            return Err(SimClientError::InvalidParams("start position must be inside the arena"));
        }
        if params.scan_num_samples == 0 {
            return Err(SimClientError::InvalidParams("scan must have at least one sample"));
        }
        if !(params.range_min_m >= 0.0 && params.range_max_m > params.range_min_m) {
            return Err(SimClientError::InvalidParams("range limits must satisfy 0 <= min < max"));
        }

        Ok(Self {
            position_m: Vector2::new(start_x, start_y),
            heading_rad: wrap_pi(params.start_heading_rad),
            params,
        })
    }

    /// Advance the robot by `dt_s` seconds under the given command.
    pub fn step(&mut self, cmd: &VelocityCommand, dt_s: f64) {
        let direction = Vector2::new(self.heading_rad.cos(), self.heading_rad.sin());
        let position_m = self.position_m + direction * (cmd.linear_ms * dt_s);

        self.position_m = Vector2::new(
            position_m.x.max(0.0).min(self.params.arena_size_m[0]),
            position_m.y.max(0.0).min(self.params.arena_size_m[1]),
        );
        self.heading_rad = wrap_pi(self.heading_rad + cmd.angular_rads * dt_s);
    }

    /// Take a full counter-clockwise sweep starting straight ahead.
    pub fn scan(&self) -> LaserScan {
        let angle_increment_rad = TAU / self.params.scan_num_samples as f64;

        let ranges_m = (0..self.params.scan_num_samples)
            .map(|i| {
                let range_m = self.ray_dist_m(self.heading_rad + i as f64 * angle_increment_rad);

                if range_m > self.params.range_max_m {
                    f64::INFINITY
                }
                else {
                    range_m.max(self.params.range_min_m)
                }
            })
            .collect();

        LaserScan {
            angle_min_rad: 0.0,
            angle_increment_rad,
            range_min_m: self.params.range_min_m,
            range_max_m: self.params.range_max_m,
            ranges_m,
        }
    }

    /// Current pose as an odometry message.
    pub fn odometry(&self) -> Odometry {
        let q = UnitQuaternion::from_euler_angles(0.0, 0.0, self.heading_rad);
        let c = q.quaternion().coords;

        Odometry {
            position_m: [self.position_m.x, self.position_m.y, 0.0],
            attitude_q: [c.x, c.y, c.z, c.w],
        }
    }

    pub fn position_m(&self) -> Vector2<f64> {
        self.position_m
    }

    pub fn heading_rad(&self) -> f64 {
        self.heading_rad
    }

    /// Distance from the robot to the closest wall.
    ///
    /// Units: meters
    pub fn wall_clearance_m(&self) -> f64 {
        let [size_x, size_y] = self.params.arena_size_m;

        self.position_m.x
            .min(size_x - self.position_m.x)
            .min(self.position_m.y)
            .min(size_y - self.position_m.y)
    }

    /// Distance along a ray at the given world angle to the first wall it hits.
    fn ray_dist_m(&self, angle_rad: f64) -> f64 {
        let (s, c) = angle_rad.sin_cos();
        let [size_x, size_y] = self.params.arena_size_m;

        let mut dist_m = f64::INFINITY;

        if c > 0.0 {
            dist_m = dist_m.min((size_x - self.position_m.x) / c);
        }
        else if c < 0.0 {
            dist_m = dist_m.min(-self.position_m.x / c);
        }

        if s > 0.0 {
            dist_m = dist_m.min((size_y - self.position_m.y) / s);
        }
        else if s < 0.0 {
            dist_m = dist_m.min(-self.position_m.y / s);
        }

        dist_m
    }
}
