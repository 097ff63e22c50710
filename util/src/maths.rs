//! Utility maths functions
//!
//! Angles in the guidance software are compass headings: radians, zero to the
//! north and increasing clockwise, stored in the range `[0, 2pi)`.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use num_traits::Float;

/// Clamp a value between the given min and max.
pub fn clamp<T>(value: &T, min: &T, max: &T) -> T 
where
    T: Float
{
    let mut ret = *value;

    if ret > *max {
        ret = *max
    }
    if ret < *min {
        ret = *min
    }

    ret
}

/// Calculates the least nonnegative remainder of `lhs (mod rhs)`.
/// 
/// This function is taken from the std library as num is missing it.
///
/// In particular, the return value `r` satisfies `0.0 <= r < rhs.abs()` in
/// most cases. However, due to a floating point round-off error it can
/// result in `r == rhs.abs()` if `lhs` is much smaller than `rhs.abs()` in
/// magnitude and `lhs < 0.0`.
pub fn rem_euclid<T>(lhs: T, rhs: T) -> T
where
    T: Float
{
    let r = lhs % rhs;
    if r < T::zero() { r + rhs.abs() } else { r }
}

/// Normalise an angle into the range `[0, 2pi)`.
///
/// Uses a single euclidean remainder so arbitrarily large inputs are reduced
/// in constant time.
pub fn normalize_angle<T>(angle: T) -> T
where
    T: Float
{
    let tau_t: T = T::from(std::f64::consts::TAU).unwrap();

    let r = rem_euclid(angle, tau_t);

    // Round-off in rem_euclid can land exactly on tau
    if r >= tau_t {
        T::zero()
    }
    else {
        r
    }
}

/// Get the signed shortest rotation from `a` to `b`, in the range `(-pi, pi]`.
///
/// Positive values are clockwise. When the two angles are exactly opposite the
/// result is `+pi` whichever order they are given in.
pub fn angular_delta<T>(a: T, b: T) -> T
where
    T: Float
{
    let pi_t: T = T::from(std::f64::consts::PI).unwrap();
    let tau_t: T = T::from(std::f64::consts::TAU).unwrap();

    let d = normalize_angle(b - a);

    if d > pi_t {
        d - tau_t
    }
    else {
        d
    }
}

/// Map any angle into the range `(-pi, pi]`.
pub fn wrap_pi<T>(angle: T) -> T
where
    T: Float
{
    angular_delta(T::zero(), angle)
}
