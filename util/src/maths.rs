//! Utility maths functions

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use num_traits::Float;

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Get the signed angular distance from `a` to `b`.
///
/// This function returns the shortest signed distance between a and b accounting for wrapping,
/// so the result always lies in `[-pi, pi]` whatever range the inputs are given in. A positive
/// result means `b` is counter-clockwise of `a`.
pub fn get_ang_dist<T>(a: T, b: T) -> T
where
    T: Float
{
    let tau_t: T = T::from(std::f64::consts::TAU).unwrap();

    let c = rem_euclid(a - b, tau_t);
    let d = rem_euclid(b - a, tau_t);

    if c < d {
        -c
    }
    else {
        d
    }
}

/// Wrap an angle into the range `(-pi, pi]`.
pub fn wrap_pi<T>(value: T) -> T
where
    T: Float
{
    let pi_t: T = T::from(std::f64::consts::PI).unwrap();
    let tau_t: T = T::from(std::f64::consts::TAU).unwrap();

    let wrapped = pi_t - rem_euclid(pi_t - value, tau_t);

    // Rounding can land exactly on -pi
    if wrapped <= -pi_t {
        wrapped + tau_t
    }
    else {
        wrapped
    }
}

/// Calculates the least nonnegative remainder of `lhs (mod rhs)`.
///
/// This function is taken from the std library as num is missing it.
///
/// The return value `r` satisfies `0.0 <= r < rhs.abs()` in most cases, however a floating point
/// round-off error can result in `r == rhs.abs()` if `lhs` is much smaller than `rhs.abs()` in
/// magnitude and `lhs < 0.0`.
pub fn rem_euclid<T>(lhs: T, rhs: T) -> T
where
    T: Float
{
    let r = lhs % rhs;
    if r < T::zero() { r + rhs.abs() } else { r }
}

/// Get the yaw (rotation about Z) of the quaternion `(w, x, y, z)`.
///
/// Uses `atan2(2(wz + xy), 1 - 2(y^2 + z^2))`, so the result lies in `[-pi, pi]`. The quaternion
/// is expected to be normalised.
pub fn quat_to_yaw<T>(w: T, x: T, y: T, z: T) -> T
where
    T: Float
{
    let two = T::from(2.0).unwrap();

    let siny = two * (w * z + x * y);
    let cosy = T::one() - two * (y * y + z * z);

    siny.atan2(cosy)
}
