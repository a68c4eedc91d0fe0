//! Utility maths functions

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use num_traits::Float;

/// Map a value from one range into another.
pub fn lin_map<T>(source_range: (T, T), target_range: (T, T), value: T) -> T
where 
    T: Float 
{
    target_range.0 
        + ((value - source_range.0) 
        * (target_range.1 - target_range.0) 
        / (source_range.1 - source_range.0))
}

/// Clamp a value into the closed range `[min, max]`.
///
/// Returns the clamped value and a flag which is `true` if the value had to be saturated. `NaN`
/// is saturated to `min`.
pub fn saturate<T>(value: T, min: T, max: T) -> (T, bool)
where
    T: Float
{
    if value.is_nan() {
        return (min, true)
    }

    if value > max {
        (max, true)
    }
    else if value < min {
        (min, true)
    }
    else {
        (value, false)
    }
}

/// Calculates the least nonnegative remainder of `lhs (mod rhs)`.
/// 
/// This function is taken from the std library as num is missing it.
///
/// In particular, the return value `r` satisfies `0.0 <= r < rhs.abs()` in
/// most cases. However, due to a floating point round-off error it can
/// result in `r == rhs.abs()`, violating the mathematical definition, if
/// `self` is much smaller than `rhs.abs()` in magnitude and `self < 0.0`.
pub fn rem_euclid<T>(lhs: T, rhs: T) -> T
where
    T: Float
{
    let r = lhs % rhs;
    if r < T::zero() { r + rhs.abs() } else { r }
}

/// Wrap an angle in degrees into the range (-180, 180].
pub fn wrap_180<T>(angle_deg: T) -> T
where
    T: Float
{
    let full = T::from(360.0).unwrap();
    let half = T::from(180.0).unwrap();

    let mut a = rem_euclid(angle_deg, full);
    if a > half {
        a = a - full;
    }

    a
}

/// Wrap an angle in degrees into the range [0, 360).
pub fn wrap_360<T>(angle_deg: T) -> T
where
    T: Float
{
    let full = T::from(360.0).unwrap();

    let a = rem_euclid(angle_deg, full);
    if a >= full { T::zero() } else { a }
}

#[cfg(test)]
mod test {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_lin_map() {
        assert_eq!(lin_map((0f64, 1f64), (0f64, 10f64), 0.5), 5.0);
        assert_eq!(lin_map((1f64, -1f64), (0f64, 255f64), 1.0), 0.0);
        assert_eq!(lin_map((1f64, -1f64), (0f64, 255f64), -1.0), 255.0);
    }

    #[test]
    fn test_saturate() {
        assert_eq!(saturate(0.5f64, -1.0, 1.0), (0.5, false));
        assert_eq!(saturate(1.5f64, -1.0, 1.0), (1.0, true));
        assert_eq!(saturate(-7.0f64, -1.0, 1.0), (-1.0, true));
        assert_eq!(saturate(f64::NAN, -1.0, 1.0), (-1.0, true));
    }

    #[test]
    fn test_wrap_180() {
        assert_abs_diff_eq!(wrap_180(0f64), 0.0);
        assert_abs_diff_eq!(wrap_180(180f64), 180.0);
        assert_abs_diff_eq!(wrap_180(-180f64), 180.0);
        assert_abs_diff_eq!(wrap_180(190f64), -170.0);
        assert_abs_diff_eq!(wrap_180(-190f64), 170.0);
        assert_abs_diff_eq!(wrap_180(725f64), 5.0);
    }

    #[test]
    fn test_wrap_360() {
        assert_abs_diff_eq!(wrap_360(-10f64), 350.0);
        assert_abs_diff_eq!(wrap_360(360f64), 0.0);
        assert_abs_diff_eq!(wrap_360(12.5f64), 12.5);
    }
}
