//! Analysis/synthesis window functions and overlap compensation.
//!
//! The transform engine applies the same window twice (analysis and
//! synthesis), so reconstruction must correct for the squared window's
//! overlap-summed power loss. [`compensation_table`] computes that
//! correction once per configuration; [`Window::coherent_gain`] calibrates
//! magnitude readings so a single tone reads its true amplitude regardless
//! of window shape.

use std::f32::consts::PI;

/// Window function types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Window {
    /// Hann window (raised cosine). Overlap factor 2.
    Hann,
    /// Hamming window. Overlap factor 2.
    Hamming,
    /// Blackman window. Overlap factor 4.
    Blackman,
    /// Blackman-Harris window (better sidelobe suppression). Overlap factor 4.
    #[default]
    BlackmanHarris,
}

impl Window {
    /// Apply the window to a buffer in place.
    pub fn apply(self, buffer: &mut [f32]) {
        let n = buffer.len();
        match self {
            Window::Hann => {
                for (i, sample) in buffer.iter_mut().enumerate() {
                    let w = 0.5 * (1.0 - (2.0 * PI * i as f32 / n as f32).cos());
                    *sample *= w;
                }
            }
            Window::Hamming => {
                for (i, sample) in buffer.iter_mut().enumerate() {
                    let w = 0.54 - 0.46 * (2.0 * PI * i as f32 / n as f32).cos();
                    *sample *= w;
                }
            }
            Window::Blackman => {
                for (i, sample) in buffer.iter_mut().enumerate() {
                    let x = 2.0 * PI * i as f32 / n as f32;
                    let w = 0.42 - 0.5 * x.cos() + 0.08 * (2.0 * x).cos();
                    *sample *= w;
                }
            }
            Window::BlackmanHarris => {
                for (i, sample) in buffer.iter_mut().enumerate() {
                    let x = 2.0 * PI * i as f32 / n as f32;
                    let w = 0.35875 - 0.48829 * x.cos() + 0.14128 * (2.0 * x).cos()
                        - 0.01168 * (3.0 * x).cos();
                    *sample *= w;
                }
            }
        }
    }

    /// Window coefficients for the given size.
    pub fn coefficients(self, size: usize) -> Vec<f32> {
        let mut coeffs = vec![1.0; size];
        self.apply(&mut coeffs);
        coeffs
    }

    /// Overlap factor giving perfect-reconstruction hop sizes.
    ///
    /// Hann/Hamming variants overlap by 2; the wider Blackman family needs 4.
    pub fn overlap_factor(self) -> usize {
        match self {
            Window::Hann | Window::Hamming => 2,
            Window::Blackman | Window::BlackmanHarris => 4,
        }
    }

    /// Coherent gain: mean of the raw window samples.
    ///
    /// The DC-equivalent gain of the window. Dividing magnitude readings by
    /// this keeps single-tone levels calibrated to their true amplitude.
    pub fn coherent_gain(self, size: usize) -> f32 {
        let coeffs = self.coefficients(size);
        coeffs.iter().sum::<f32>() / size as f32
    }
}

/// Sum threshold below which the compensation falls back to unity.
const NEGLIGIBLE_ENERGY: f32 = 1e-6;

/// Per-sample correction for the squared window's overlap sum.
///
/// Simulates 8 overlapping hops of the squared window summed at `hop_size`
/// offsets into an extended buffer, reads back the steady-state sum at an
/// offset of one full frame length (past the startup transient), and
/// inverts each nonzero sum. Positions whose summed energy is numerically
/// negligible fall back to 1.0 instead of dividing by near-zero.
///
/// Multiplying each synthesis frame by this table before overlap-add gives
/// a flat unity-gain response for an unprocessed signal, for any window
/// shape and overlap factor.
pub fn compensation_table(window: Window, size: usize, hop_size: usize) -> Vec<f32> {
    let mut squared = window.coefficients(size);
    for w in &mut squared {
        *w *= *w;
    }

    // Enough frames to reach steady state one frame-length in.
    let num_frames = 8;
    let mut overlap_sum = vec![0.0f32; size * 2];
    for frame in 0..num_frames {
        let offset = frame * hop_size;
        for (i, &w) in squared.iter().enumerate() {
            if offset + i < overlap_sum.len() {
                overlap_sum[offset + i] += w;
            }
        }
    }

    let steady_state = &overlap_sum[size..size * 2];
    steady_state
        .iter()
        .map(|&sum| if sum > NEGLIGIBLE_ENERGY { 1.0 / sum } else { 1.0 })
        .collect()
}
