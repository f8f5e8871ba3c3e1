//! Per-bin spectral dynamics engine.
//!
//! Runs once per analysis frame inside the spectral pipeline. For every
//! bin up to Nyquist it measures the calibrated magnitude in dB, evaluates
//! the response curve at the bin's center frequency, and drives a per-bin
//! envelope toward the gain change the active mode asks for. The complex
//! bin is then scaled by the linear gain, leaving phase untouched.
//!
//! Envelope smoothing runs at hop rate (one step per frame), so attack and
//! release times are honored independently of FFT size.
//!
//! A curve with no peaks bypasses the frame entirely; the global shift only
//! takes effect once at least one control point exists.

use espectro_core::magnitude_to_db;
use rustfft::num_complex::Complex;

use crate::curve::{GaussianPeak, ResponseCurveModel, evaluate_peaks};
use crate::stft::{SpectralConfig, SpectralProcessor};

/// Gain reduction applied by the gate below threshold, in dB.
const GATE_RANGE_DB: f32 = 100.0;

/// Bins below this frequency pass through unmodified.
const MIN_BIN_HZ: f32 = 20.0;

/// Envelope coefficients are capped just below one so even absurd time
/// constants keep moving.
const MAX_ENV_COEFF: f32 = 0.999_99;

/// Processing behavior applied per bin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DynamicsMode {
    /// Attenuate bins above the curve with a soft knee.
    #[default]
    Compressor,
    /// Boost bins below the curve with the mirrored knee (upward expansion).
    Expander,
    /// Hard-limit bins to the curve with no smoothing.
    Clipper,
    /// Attenuate bins below the curve by a fixed large amount.
    Gate,
}

impl DynamicsMode {
    /// Stable index used by the stepped mode parameter.
    pub fn as_index(self) -> usize {
        match self {
            Self::Compressor => 0,
            Self::Expander => 1,
            Self::Clipper => 2,
            Self::Gate => 3,
        }
    }

    /// Inverse of [`as_index`](Self::as_index); out-of-range maps to
    /// compressor.
    pub fn from_index(index: usize) -> Self {
        match index {
            1 => Self::Expander,
            2 => Self::Clipper,
            3 => Self::Gate,
            _ => Self::Compressor,
        }
    }

    /// Display name for the stepped parameter.
    pub fn name(self) -> &'static str {
        match self {
            Self::Compressor => "Compress",
            Self::Expander => "Expand",
            Self::Clipper => "Clip",
            Self::Gate => "Gate",
        }
    }
}

/// Quadratic soft-knee transfer.
///
/// `over` is the signed dB distance past the threshold. Returns the dB of
/// gain reduction: zero below the knee, `over * (1 - 1/ratio)` above it,
/// and a quadratic blend across the knee span.
#[inline]
fn soft_knee(over: f32, knee_db: f32, ratio: f32) -> f32 {
    let slope = 1.0 - 1.0 / ratio;
    let half = knee_db * 0.5;
    if over <= -half {
        0.0
    } else if over >= half {
        over * slope
    } else {
        let t = over + half;
        (t * t) / (2.0 * knee_db) * slope
    }
}

/// Per-bin dynamics processor driven by a shared [`ResponseCurveModel`].
pub struct DynamicsEngine {
    curve: ResponseCurveModel,
    mode: DynamicsMode,
    attack_ms: f32,
    release_ms: f32,
    ratio: f32,
    knee_db: f32,

    sample_rate: f32,
    hop_size: usize,
    attack_coeff: f32,
    release_coeff: f32,
    /// Calibrated magnitude scale for interior bins. DC and Nyquist never
    /// reach the magnitude path (they sit outside the processed band).
    mag_scale: f32,
    nyquist_hz: f32,

    /// Bin center frequencies, length `fft_size / 2 + 1`.
    bin_freqs: Vec<f32>,
    /// Per-channel envelope state in dB of gain change, one slot per bin.
    envelopes: Vec<Vec<f32>>,
    /// Frame-local copy of the curve, refreshed once per frame.
    peak_scratch: Vec<GaussianPeak>,
    /// Set when the last refresh found no peaks; a curve without control
    /// points is inert, shift or not.
    bypass: bool,
    /// Curve evaluated per bin, refreshed once per frame for channel 0 and
    /// reused for the remaining channels.
    threshold_scratch: Vec<f32>,
}

impl DynamicsEngine {
    /// Create an engine bound to `curve` with the given defaults.
    pub fn new(curve: ResponseCurveModel) -> Self {
        Self {
            curve,
            mode: DynamicsMode::default(),
            attack_ms: 10.0,
            release_ms: 100.0,
            ratio: 4.0,
            knee_db: 6.0,
            sample_rate: 44_100.0,
            hop_size: 256,
            attack_coeff: 0.0,
            release_coeff: 0.0,
            mag_scale: 1.0,
            nyquist_hz: 22_050.0,
            bin_freqs: Vec::new(),
            envelopes: Vec::new(),
            peak_scratch: Vec::with_capacity(16),
            bypass: true,
            threshold_scratch: Vec::new(),
        }
    }

    /// Set the processing mode.
    pub fn set_mode(&mut self, mode: DynamicsMode) {
        self.mode = mode;
    }

    /// Current processing mode.
    pub fn mode(&self) -> DynamicsMode {
        self.mode
    }

    /// Set attack time in milliseconds (clamped to 1..=1000).
    pub fn set_attack_ms(&mut self, ms: f32) {
        self.attack_ms = ms.clamp(1.0, 1000.0);
        self.update_coefficients();
    }

    /// Attack time in milliseconds.
    pub fn attack_ms(&self) -> f32 {
        self.attack_ms
    }

    /// Set release time in milliseconds (clamped to 10..=1000).
    pub fn set_release_ms(&mut self, ms: f32) {
        self.release_ms = ms.clamp(10.0, 1000.0);
        self.update_coefficients();
    }

    /// Release time in milliseconds.
    pub fn release_ms(&self) -> f32 {
        self.release_ms
    }

    /// Set the ratio (clamped to 1..=20).
    pub fn set_ratio(&mut self, ratio: f32) {
        self.ratio = ratio.clamp(1.0, 20.0);
    }

    /// Current ratio.
    pub fn ratio(&self) -> f32 {
        self.ratio
    }

    /// Set knee width in dB (clamped to 0..=12).
    ///
    /// A zero knee degenerates to a hard corner; the quadratic blend
    /// branch is unreachable in that case, so no division guard is needed.
    pub fn set_knee_db(&mut self, knee_db: f32) {
        self.knee_db = knee_db.clamp(0.0, 12.0);
    }

    /// Knee width in dB.
    pub fn knee_db(&self) -> f32 {
        self.knee_db
    }

    /// Shared handle to the response curve this engine reads.
    pub fn curve(&self) -> &ResponseCurveModel {
        &self.curve
    }

    /// Envelope state for `channel` in dB of gain change, one slot per bin.
    ///
    /// Positive values attenuate, negative values boost. Channel 0 is what
    /// the pipeline publishes as the gain-reduction snapshot.
    pub fn envelope_db(&self, channel: usize) -> &[f32] {
        self.envelopes.get(channel).map_or(&[], Vec::as_slice)
    }

    fn update_coefficients(&mut self) {
        let hop_secs = self.hop_size as f32 / self.sample_rate;
        self.attack_coeff = env_coeff(hop_secs, self.attack_ms);
        self.release_coeff = env_coeff(hop_secs, self.release_ms);
    }
}

/// The gain change in dB `mode` wants for a bin at `mag_db` given the
/// curve value `threshold_db`. Positive attenuates, negative boosts.
#[inline]
fn target_db(mode: DynamicsMode, mag_db: f32, threshold_db: f32, knee_db: f32, ratio: f32) -> f32 {
    match mode {
        DynamicsMode::Compressor => soft_knee(mag_db - threshold_db, knee_db, ratio),
        // Mirror the knee below the curve and flip the sign: bins under
        // the threshold get boosted toward it. At or above the curve no
        // boost is needed, knee blend or not.
        DynamicsMode::Expander => {
            if mag_db >= threshold_db {
                0.0
            } else {
                -soft_knee(threshold_db - mag_db, knee_db, ratio)
            }
        }
        DynamicsMode::Clipper => (mag_db - threshold_db).max(0.0),
        DynamicsMode::Gate => {
            if mag_db < threshold_db {
                GATE_RANGE_DB
            } else {
                0.0
            }
        }
    }
}

/// One-pole coefficient for a `time_ms` constant stepped at `hop_secs`.
#[inline]
fn env_coeff(hop_secs: f32, time_ms: f32) -> f32 {
    libm::expf(-hop_secs / (time_ms * 0.001)).clamp(0.0, MAX_ENV_COEFF)
}

impl SpectralProcessor for DynamicsEngine {
    fn prepare(&mut self, config: &SpectralConfig) {
        self.sample_rate = config.sample_rate;
        self.hop_size = config.hop_size;
        self.update_coefficients();

        let num_bins = config.fft_size / 2 + 1;
        self.bin_freqs.clear();
        self.bin_freqs.extend(
            (0..num_bins).map(|i| i as f32 * config.sample_rate / config.fft_size as f32),
        );
        self.threshold_scratch.clear();
        self.threshold_scratch.resize(num_bins, 0.0);

        self.envelopes.clear();
        self.envelopes
            .resize_with(config.num_channels, || vec![0.0; num_bins]);

        // Calibration maps raw FFT magnitudes back to input amplitude so
        // the curve is stated in dBFS of a full-scale sinusoid.
        let n = config.fft_size as f32;
        self.mag_scale = 2.0 / (n * config.coherent_gain);
        self.nyquist_hz = config.sample_rate * 0.5;
    }

    fn process_spectrum(&mut self, channel: usize, bins: &mut [Complex<f32>]) {
        debug_assert_eq!(bins.len(), self.bin_freqs.len());
        debug_assert!(channel < self.envelopes.len());

        // Refresh the curve once per frame, on the first channel; the
        // remaining channels of the same frame reuse the evaluation.
        if channel == 0 {
            let shift_db = self.curve.copy_peaks_into(&mut self.peak_scratch);
            self.bypass = self.peak_scratch.is_empty();
            if !self.bypass {
                for (slot, &freq) in self.threshold_scratch.iter_mut().zip(&self.bin_freqs) {
                    // DC has no log-frequency position; pin it to the lowest
                    // audible bin's behavior.
                    let f = freq.max(1.0);
                    *slot = evaluate_peaks(&self.peak_scratch, f) + shift_db;
                }
            }
        }

        // No control points means no processing: the whole frame passes
        // through and the envelopes hold.
        if self.bypass {
            return;
        }

        let env = &mut self.envelopes[channel];
        let clip = self.mode == DynamicsMode::Clipper;

        for (i, bin) in bins.iter_mut().enumerate() {
            // Sub-audio and Nyquist-and-above content passes through
            // untouched; there is nothing meaningful to process there.
            let freq = self.bin_freqs[i];
            if freq < MIN_BIN_HZ || freq >= self.nyquist_hz {
                continue;
            }

            let mag_db = magnitude_to_db(bin.norm() * self.mag_scale);
            let target = target_db(
                self.mode,
                mag_db,
                self.threshold_scratch[i],
                self.knee_db,
                self.ratio,
            );

            // Clipping is instantaneous; everything else smooths at hop
            // rate with separate attack and release constants.
            let smoothed = if clip {
                target
            } else {
                let coeff = if target > env[i] {
                    self.attack_coeff
                } else {
                    self.release_coeff
                };
                target + coeff * (env[i] - target)
            };
            env[i] = smoothed;

            let gain = espectro_core::db_to_linear(-smoothed);
            *bin = *bin * gain;
        }
    }

    fn reset(&mut self) {
        for env in &mut self.envelopes {
            env.fill(0.0);
        }
    }
}
