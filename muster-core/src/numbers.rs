//! Numeric conversion helpers centralizing lossy numeric casts.

use num_traits::cast::cast;

/// Round a f64 and clamp it to the u64 range, returning 0 for NaN values.
#[must_use]
pub fn round_f64_to_u64(value: f64) -> u64 {
    if value.is_nan() {
        return 0;
    }
    let max = cast::<u64, f64>(u64::MAX).unwrap_or(f64::MAX);
    let clamped = value.clamp(0.0, max).round();
    cast::<f64, u64>(clamped).unwrap_or(0)
}

/// Convert u64 to f64 while allowing precision loss in a single location.
#[must_use]
pub fn u64_to_f64(value: u64) -> f64 {
    cast::<u64, f64>(value).unwrap_or(0.0)
}

/// Convert a collection length to f64 for averaging.
#[must_use]
pub fn usize_to_f64(value: usize) -> f64 {
    cast::<usize, f64>(value).unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rounding_covers_edges() {
        assert_eq!(round_f64_to_u64(1.6), 2);
        assert_eq!(round_f64_to_u64(2.5), 3);
        assert_eq!(round_f64_to_u64(53.999), 54);
        assert_eq!(round_f64_to_u64(f64::NAN), 0);
        assert_eq!(round_f64_to_u64(-4.0), 0);
        assert_eq!(round_f64_to_u64(f64::INFINITY), u64::MAX);
    }

    #[test]
    fn float_conversions_are_exact_for_small_values() {
        assert!((u64_to_f64(90) - 90.0).abs() < f64::EPSILON);
        assert!((usize_to_f64(3) - 3.0).abs() < f64::EPSILON);
    }
}
