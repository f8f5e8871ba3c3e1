//! Mathematical utilities for spectral dynamics processing.
//!
//! All functions are allocation-free and suitable for `no_std`.
//!
//! # Level Conversions
//!
//! - [`db_to_linear`] / [`linear_to_db`] - Convert between dB and linear gain
//! - [`magnitude_to_db`] - Floored conversion for spectral magnitudes
//!
//! # Input Hygiene
//!
//! - [`sanitize_sample`] - Contain NaN/Inf samples from upstream so they
//!   cannot pollute the overlap-add accumulator

use libm::{expf, log10f, logf};

/// Silence floor in dB used when converting near-zero magnitudes.
///
/// Magnitudes at or below [`MAGNITUDE_EPSILON`] map to this value instead
/// of negative infinity.
pub const DB_FLOOR: f32 = -100.0;

/// Smallest magnitude considered nonzero when converting to dB.
pub const MAGNITUDE_EPSILON: f32 = 1e-10;

/// Convert decibels to linear gain.
///
/// # Example
/// ```rust
/// use espectro_core::db_to_linear;
///
/// assert!((db_to_linear(0.0) - 1.0).abs() < 0.001);
/// assert!((db_to_linear(-6.02) - 0.5).abs() < 0.01);
/// ```
#[inline]
pub fn db_to_linear(db: f32) -> f32 {
    // 10^(dB/20) = e^(dB * ln(10)/20)
    const FACTOR: f32 = core::f32::consts::LN_10 / 20.0;
    expf(db * FACTOR)
}

/// Convert linear gain to decibels.
///
/// Inputs at or below zero are floored to 1e-10 before the log.
///
/// # Example
/// ```rust
/// use espectro_core::linear_to_db;
///
/// assert!((linear_to_db(1.0) - 0.0).abs() < 0.001);
/// assert!((linear_to_db(0.5) - (-6.02)).abs() < 0.01);
/// ```
#[inline]
pub fn linear_to_db(linear: f32) -> f32 {
    // 20 * log10(linear) = 20 * ln(linear) / ln(10)
    const FACTOR: f32 = 20.0 / core::f32::consts::LN_10;
    logf(linear.max(1e-10)) * FACTOR
}

/// Convert a spectral magnitude to dB with an explicit silence floor.
///
/// Returns [`DB_FLOOR`] for magnitudes at or below [`MAGNITUDE_EPSILON`]
/// rather than `-inf`, keeping downstream envelope arithmetic finite.
#[inline]
pub fn magnitude_to_db(magnitude: f32) -> f32 {
    if magnitude > MAGNITUDE_EPSILON {
        20.0 * log10f(magnitude)
    } else {
        DB_FLOOR
    }
}

/// Replace NaN/Inf samples with silence.
///
/// Upstream hosts occasionally deliver corrupt blocks; a single NaN pushed
/// into the overlap-add accumulator would persist across frames, so inputs
/// are contained here rather than propagated.
#[inline]
pub fn sanitize_sample(sample: f32) -> f32 {
    if sample.is_finite() { sample } else { 0.0 }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn db_linear_roundtrip() {
        for &db in &[-60.0, -24.0, -6.0, 0.0, 6.0, 12.0] {
            let back = linear_to_db(db_to_linear(db));
            assert!((back - db).abs() < 0.01, "roundtrip {db} -> {back}");
        }
    }

    #[test]
    fn magnitude_to_db_floors_silence() {
        assert_eq!(magnitude_to_db(0.0), DB_FLOOR);
        assert_eq!(magnitude_to_db(1e-12), DB_FLOOR);
        assert!(magnitude_to_db(1.0).abs() < 0.001);
    }

    #[test]
    fn magnitude_to_db_finite_everywhere() {
        for i in 0..200 {
            let mag = 10.0f32.powi(-(i / 10)) * (i as f32 + 1.0);
            assert!(magnitude_to_db(mag).is_finite());
        }
    }

    #[test]
    fn sanitize_passes_finite() {
        assert_eq!(sanitize_sample(0.5), 0.5);
        assert_eq!(sanitize_sample(-1.0), -1.0);
        assert_eq!(sanitize_sample(0.0), 0.0);
    }

    #[test]
    fn sanitize_contains_nan_inf() {
        assert_eq!(sanitize_sample(f32::NAN), 0.0);
        assert_eq!(sanitize_sample(f32::INFINITY), 0.0);
        assert_eq!(sanitize_sample(f32::NEG_INFINITY), 0.0);
    }
}
