//! Coordinate fuzzing for privacy.

use crate::constants::birdweather::{FUZZ_DECIMAL_PLACES, METERS_PER_DEGREE};
use rand::Rng;

/// Fuzzes `(lat, lon)` within `radius_meters`, truncated to four decimal
/// places. `radius_meters == 0.0` is the identity. `BirdWeather` currently
/// ignores submitted coordinates, but the contract is preserved.
pub fn randomize_location(lat: f64, lon: f64, radius_meters: f64) -> (f64, f64) {
    if radius_meters <= 0.0 {
        return (truncate(lat), truncate(lon));
    }
    let degree_offset = radius_meters / METERS_PER_DEGREE;
    let mut rng = rand::rng();
    let r_lat: f64 = rng.random_range(-1.0..=1.0);
    let r_lon: f64 = rng.random_range(-1.0..=1.0);
    (
        truncate(lat + r_lat * degree_offset),
        truncate(lon + r_lon * degree_offset),
    )
}

fn truncate(value: f64) -> f64 {
    (value * FUZZ_DECIMAL_PLACES).floor() / FUZZ_DECIMAL_PLACES
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_radius_is_identity_after_truncation() {
        let (lat, lon) = randomize_location(52.123_456, 4.987_654, 0.0);
        assert!((lat - 52.1234).abs() < 1e-9);
        assert!((lon - 4.9876).abs() < 1e-9);
    }

    #[test]
    fn positive_radius_yields_distinct_values_with_high_probability() {
        let draws: Vec<(f64, f64)> = (0..10)
            .map(|_| randomize_location(52.0, 4.0, 500.0))
            .collect();
        let distinct = draws
            .iter()
            .collect::<std::collections::HashSet<_>>()
            .len();
        assert!(distinct >= 2, "expected at least 2 distinct draws, got {distinct}");
    }

    #[test]
    fn result_is_truncated_to_four_decimals() {
        let (lat, _lon) = randomize_location(52.0, 4.0, 500.0);
        let scaled = lat * FUZZ_DECIMAL_PLACES;
        assert!((scaled - scaled.round()).abs() < 1e-6);
    }
}
