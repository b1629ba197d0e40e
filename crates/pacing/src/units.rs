//! Unit conversions and small numeric helpers shared by the simulation.

/// Gravitational acceleration in m/s².
pub const GRAVITY: f64 = 9.8;

/// Converts a speed in km/h to m/s.
pub fn kmh_to_mps(speed_kmh: f64) -> f64 {
    speed_kmh * 1000.0 / 3600.0
}

/// Counts the multiples of `spacing` in the half-open interval `(start, end]`.
///
/// Uses floor semantics, so the result is negative when `end < start` and
/// crossings below zero are counted the same way as crossings above it.
/// `spacing` must be strictly positive.
pub fn count_multiples(start: f64, end: f64, spacing: f64) -> i64 {
    debug_assert!(spacing > 0.0, "spacing must be positive");
    let multiples_in_end = (end / spacing).floor() as i64;
    let multiples_in_start = (start / spacing).floor() as i64;
    multiples_in_end - multiples_in_start
}
