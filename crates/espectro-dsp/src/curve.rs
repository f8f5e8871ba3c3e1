//! Thread-safe sum-of-Gaussians response curve model.
//!
//! The response curve is the single source of truth for the desired
//! frequency response of the dynamics engine: an ordered collection of
//! Gaussian peaks plus a global dB shift. The UI thread mutates it through
//! add/remove/update gestures at most a few times per frame; the audio
//! thread reads it once per analysis frame. Both sides go through one
//! mutex, and readers only ever receive copies — the live peak list is
//! never exposed by reference, so a caller cannot retain it past the lock.
//!
//! Evaluation happens in log10-frequency space so a peak's width is
//! perceptually uniform across octaves:
//!
//! ```text
//! threshold(f) = Σ gain_i · exp(-0.5 · ((log10 f − log10 f_i) / σ_i)²) + shift
//! ```

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

/// Lowest frequency a peak may sit at.
pub const MIN_PEAK_HZ: f32 = 20.0;

/// Highest frequency a peak may sit at.
pub const MAX_PEAK_HZ: f32 = 30_000.0;

/// Narrowest permitted peak width, in log-frequency decades.
///
/// A zero sigma would make the Gaussian evaluation divide by zero; widths
/// are floored here on insert.
pub const MIN_SIGMA: f32 = 1e-3;

/// One editable control point of the response curve.
///
/// `sigma` is the Gaussian width in log10-frequency decades, so a sigma of
/// 0.301 spans roughly one octave either side of the center.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GaussianPeak {
    /// Center frequency in Hz.
    pub frequency: f32,
    /// Peak gain contribution in dB (signed).
    pub gain_db: f32,
    /// Width in log-frequency decades.
    pub sigma: f32,
}

impl GaussianPeak {
    /// Create a peak with fields clamped to their valid ranges.
    pub fn new(frequency: f32, gain_db: f32, sigma: f32) -> Self {
        Self {
            frequency: frequency.clamp(MIN_PEAK_HZ, MAX_PEAK_HZ),
            gain_db,
            sigma: sigma.max(MIN_SIGMA),
        }
    }

    /// This peak's dB contribution at `frequency`.
    #[inline]
    pub fn evaluate(&self, frequency: f32) -> f32 {
        let dx = libm::log10f(frequency) - libm::log10f(self.frequency);
        self.gain_db * libm::expf(-0.5 * (dx * dx) / (self.sigma * self.sigma))
    }
}

/// Serializable curve state for the persistence collaborator.
///
/// The concrete byte encoding (JSON, a host state tree, ...) is owned by
/// the caller; the model only exposes and accepts this tuple list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistedCurve {
    /// Global curve shift in dB.
    pub shift_db: f32,
    /// Peaks in insertion order.
    pub peaks: Vec<PersistedPeak>,
}

/// One persisted peak tuple.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PersistedPeak {
    /// Center frequency in Hz.
    pub frequency: f32,
    /// Peak gain in dB.
    pub gain_db: f32,
    /// Width in log-frequency decades.
    pub sigma: f32,
}

#[derive(Debug, Default)]
struct CurveState {
    peaks: Vec<GaussianPeak>,
    shift_db: f32,
}

/// Thread-safe ordered collection of Gaussian peaks plus a global dB shift.
///
/// Cloning the model clones the *handle*: both clones observe the same
/// curve, which is how the audio-thread processor and the UI-thread editor
/// share it.
///
/// # Example
///
/// ```rust
/// use espectro_dsp::{GaussianPeak, ResponseCurveModel};
///
/// let curve = ResponseCurveModel::new();
/// curve.add_peak(GaussianPeak::new(1000.0, 6.0, 0.25));
/// assert!((curve.threshold_db_at(1000.0) - 6.0).abs() < 1e-3);
/// ```
#[derive(Debug, Clone, Default)]
pub struct ResponseCurveModel {
    state: Arc<Mutex<CurveState>>,
}

impl ResponseCurveModel {
    /// Create an empty curve (no peaks, zero shift).
    ///
    /// An empty curve means "no processing": the dynamics engine treats it
    /// as bypass, not as an error.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a peak. Always succeeds; fields are clamped by
    /// [`GaussianPeak::new`] semantics if the caller built them raw.
    pub fn add_peak(&self, peak: GaussianPeak) {
        let peak = GaussianPeak::new(peak.frequency, peak.gain_db, peak.sigma);
        self.state.lock().peaks.push(peak);
    }

    /// Remove the peak at `index`. Out-of-range is a no-op, not an error.
    pub fn remove_peak(&self, index: usize) {
        let mut state = self.state.lock();
        if index < state.peaks.len() {
            state.peaks.remove(index);
        }
    }

    /// Replace the peak at `index` (UI drag gesture). Out-of-range is a
    /// no-op.
    pub fn update_peak(&self, index: usize, peak: GaussianPeak) {
        let peak = GaussianPeak::new(peak.frequency, peak.gain_db, peak.sigma);
        let mut state = self.state.lock();
        if let Some(slot) = state.peaks.get_mut(index) {
            *slot = peak;
        }
    }

    /// Remove all peaks.
    pub fn clear(&self) {
        self.state.lock().peaks.clear();
    }

    /// Number of peaks currently held.
    pub fn peak_count(&self) -> usize {
        self.state.lock().peaks.len()
    }

    /// Snapshot copy of the peak list.
    ///
    /// Allocates; intended for UI and tests. The audio thread uses
    /// [`copy_peaks_into`](Self::copy_peaks_into) instead.
    pub fn peaks(&self) -> Vec<GaussianPeak> {
        self.state.lock().peaks.clone()
    }

    /// Copy the peak list into a caller-owned buffer and return the shift.
    ///
    /// One lock acquisition covers both reads. The destination's capacity
    /// is reused, so a buffer that has grown to the working peak count
    /// makes this allocation-free — the audio thread calls it once per
    /// analysis frame with a retained scratch vector.
    pub fn copy_peaks_into(&self, dest: &mut Vec<GaussianPeak>) -> f32 {
        let state = self.state.lock();
        dest.clear();
        dest.extend_from_slice(&state.peaks);
        state.shift_db
    }

    /// Set the global curve shift in dB.
    pub fn set_shift_db(&self, shift_db: f32) {
        self.state.lock().shift_db = shift_db;
    }

    /// Global curve shift in dB.
    pub fn shift_db(&self) -> f32 {
        self.state.lock().shift_db
    }

    /// Evaluate the full curve (sum of Gaussians plus shift) at `frequency`.
    ///
    /// Convenience for UI painting and tests; holds the lock for the scan.
    pub fn threshold_db_at(&self, frequency: f32) -> f32 {
        let state = self.state.lock();
        evaluate_peaks(&state.peaks, frequency) + state.shift_db
    }

    /// Export the curve for the persistence collaborator.
    pub fn to_persisted(&self) -> PersistedCurve {
        let state = self.state.lock();
        PersistedCurve {
            shift_db: state.shift_db,
            peaks: state
                .peaks
                .iter()
                .map(|p| PersistedPeak {
                    frequency: p.frequency,
                    gain_db: p.gain_db,
                    sigma: p.sigma,
                })
                .collect(),
        }
    }

    /// Restore the curve from a persisted representation, replacing the
    /// current state. Fields are re-clamped on the way in.
    pub fn from_persisted(&self, persisted: &PersistedCurve) {
        let mut state = self.state.lock();
        state.shift_db = persisted.shift_db;
        state.peaks.clear();
        state.peaks.extend(
            persisted
                .peaks
                .iter()
                .map(|p| GaussianPeak::new(p.frequency, p.gain_db, p.sigma)),
        );
        debug!(
            peaks = state.peaks.len(),
            shift_db = state.shift_db,
            "response curve restored"
        );
    }
}

/// Sum the Gaussian contributions of `peaks` at `frequency` (no shift).
///
/// The dynamics engine calls this on its frame-local peak copy, outside
/// the model's lock.
#[inline]
pub fn evaluate_peaks(peaks: &[GaussianPeak], frequency: f32) -> f32 {
    peaks.iter().map(|p| p.evaluate(frequency)).sum()
}
