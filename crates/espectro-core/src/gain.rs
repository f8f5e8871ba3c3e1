//! Smoothed input/output gain staging around the spectral engine.
//!
//! A [`GainStage`] holds a target linear gain updated asynchronously from a
//! dB parameter and applies a click-free linear ramp when the target
//! changes. The signal path multiplies every sample by the current ramped
//! value; no error conditions exist and any finite input produces a defined
//! output.

use crate::math::{db_to_linear, linear_to_db};
use crate::param::LinearSmoothedParam;

/// Minimum gain in dB.
pub const GAIN_MIN_DB: f32 = -24.0;

/// Maximum gain in dB.
pub const GAIN_MAX_DB: f32 = 24.0;

/// Default ramp time when the gain target changes.
pub const RAMP_MS: f32 = 50.0;

/// Smoothed linear gain with a dB-facing interface.
///
/// ```rust
/// use espectro_core::GainStage;
///
/// let mut stage = GainStage::new(48000.0);
/// stage.set_gain_db(-6.0);
/// let mut buffer = [0.5f32; 64];
/// stage.process_block(&mut buffer);
/// ```
#[derive(Debug, Clone)]
pub struct GainStage {
    gain: LinearSmoothedParam,
}

impl GainStage {
    /// Create a unity-gain stage with a 50 ms ramp.
    pub fn new(sample_rate: f32) -> Self {
        Self {
            gain: LinearSmoothedParam::with_config(1.0, sample_rate, RAMP_MS),
        }
    }

    /// Set the gain target in dB, clamped to [`GAIN_MIN_DB`]..=[`GAIN_MAX_DB`].
    pub fn set_gain_db(&mut self, db: f32) {
        self.gain
            .set_target(db_to_linear(db.clamp(GAIN_MIN_DB, GAIN_MAX_DB)));
    }

    /// Current gain target as dB.
    pub fn gain_db(&self) -> f32 {
        linear_to_db(self.gain.target())
    }

    /// Process one sample.
    #[inline]
    pub fn process(&mut self, input: f32) -> f32 {
        input * self.gain.advance()
    }

    /// Process a channel buffer in place.
    pub fn process_block(&mut self, buffer: &mut [f32]) {
        for sample in buffer.iter_mut() {
            *sample *= self.gain.advance();
        }
    }

    /// Update sample rate (affects ramps started after this call).
    pub fn set_sample_rate(&mut self, sample_rate: f32) {
        self.gain.set_sample_rate(sample_rate);
    }

    /// Snap the ramp to its target (used on prepare, avoids a fade-in).
    pub fn reset(&mut self) {
        self.gain.snap_to_target();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gain_db_roundtrip() {
        let mut stage = GainStage::new(48000.0);
        stage.set_gain_db(-6.0);
        assert!((stage.gain_db() - (-6.0)).abs() < 0.01);
    }

    #[test]
    fn gain_clamps_to_range() {
        let mut stage = GainStage::new(48000.0);
        stage.set_gain_db(-100.0);
        assert!((stage.gain_db() - GAIN_MIN_DB).abs() < 0.01);
        stage.set_gain_db(100.0);
        assert!((stage.gain_db() - GAIN_MAX_DB).abs() < 0.01);
    }

    #[test]
    fn ramp_completes_in_ramp_time() {
        let sample_rate = 48000.0;
        let mut stage = GainStage::new(sample_rate);
        stage.set_gain_db(6.0);

        let samples = (RAMP_MS / 1000.0 * sample_rate) as usize;
        let mut out = 0.0;
        for _ in 0..samples {
            out = stage.process(1.0);
        }
        let expected = db_to_linear(6.0);
        assert!(
            (out - expected).abs() < 1e-3,
            "ramp should settle at {expected}, got {out}"
        );
    }

    #[test]
    fn ramp_is_monotone() {
        let mut stage = GainStage::new(48000.0);
        stage.set_gain_db(12.0);
        let mut prev = 0.0;
        for _ in 0..10000 {
            let v = stage.process(1.0);
            assert!(v >= prev, "ramp must not move backwards");
            prev = v;
        }
    }

    #[test]
    fn reset_snaps_to_target() {
        let mut stage = GainStage::new(48000.0);
        stage.set_gain_db(-12.0);
        stage.reset();
        let out = stage.process(1.0);
        assert!((out - db_to_linear(-12.0)).abs() < 1e-5);
    }

    #[test]
    fn unity_by_default() {
        let mut stage = GainStage::new(48000.0);
        for _ in 0..100 {
            assert_eq!(stage.process(0.25), 0.25);
        }
    }
}
