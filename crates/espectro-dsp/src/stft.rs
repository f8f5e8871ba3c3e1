//! Streaming STFT engine with windowed overlap-add resynthesis.
//!
//! The engine turns a per-sample stream into analysis frames and back:
//! every input sample is pushed into a per-channel FIFO, a frame is
//! attempted whenever the FIFO holds a full FFT's worth, and exactly one
//! output sample is popped per input sample (zero while the pipeline is
//! still filling). The cadence makes the engine a fixed-latency in-place
//! block processor regardless of the host's buffer size.
//!
//! Each frame is windowed, transformed, handed to the attached
//! [`SpectralProcessor`] as the non-redundant half spectrum, re-windowed
//! after the inverse transform, compensated for the squared analysis
//! window, and overlap-added. The same window is used for analysis and
//! synthesis, which is why the compensation table is built from the
//! window's square.

use std::sync::Arc;

use espectro_core::{RingBuffer, sanitize_sample};
use rustfft::num_complex::Complex;
use rustfft::{Fft, FftPlanner};
use tracing::debug;

use crate::error::EngineError;
use crate::snapshot::SpectrumSnapshots;
use crate::window::{Window, compensation_table};

/// Smallest supported FFT size.
pub const MIN_FFT_SIZE: usize = 64;

/// Most channels an engine can be configured for.
pub const MAX_CHANNELS: usize = 8;

/// Everything a spectral processor needs to size its state, handed over
/// once at preparation time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpectralConfig {
    /// Sample rate in Hz.
    pub sample_rate: f32,
    /// FFT size in samples (power of two).
    pub fft_size: usize,
    /// Hop between consecutive frames in samples.
    pub hop_size: usize,
    /// Number of independent channels.
    pub num_channels: usize,
    /// Mean of the analysis window samples, for magnitude calibration.
    pub coherent_gain: f32,
}

/// Per-frame hook running between the forward and inverse transforms.
///
/// `bins` covers DC through Nyquist (`fft_size / 2 + 1` entries); the
/// engine re-imposes conjugate symmetry afterwards, so implementations
/// only touch the non-redundant half.
pub trait SpectralProcessor: Send {
    /// Called once per configuration change, before any frames.
    fn prepare(&mut self, config: &SpectralConfig);

    /// Modify one channel's half spectrum in place.
    fn process_spectrum(&mut self, channel: usize, bins: &mut [Complex<f32>]);

    /// Drop all accumulated state.
    fn reset(&mut self);
}

/// A processor that leaves the spectrum untouched. Resynthesis through it
/// reconstructs the input exactly (minus latency), which pins down the
/// analysis chain in tests.
#[derive(Debug, Default, Clone, Copy)]
pub struct PassthroughProcessor;

impl SpectralProcessor for PassthroughProcessor {
    fn prepare(&mut self, _config: &SpectralConfig) {}
    fn process_spectrum(&mut self, _channel: usize, _bins: &mut [Complex<f32>]) {}
    fn reset(&mut self) {}
}

struct ChannelState {
    input: RingBuffer,
    output: RingBuffer,
    /// Overlap-add accumulator, `fft_size` samples.
    ola: Vec<f32>,
}

/// STFT analysis/resynthesis pipeline around a [`SpectralProcessor`].
pub struct SpectralTransformEngine<P: SpectralProcessor> {
    processor: P,
    fft_size: usize,
    hop_size: usize,
    window: Window,
    num_channels: usize,
    sample_rate: f32,

    forward: Arc<dyn Fft<f32>>,
    inverse: Arc<dyn Fft<f32>>,
    fft_scratch: Vec<Complex<f32>>,

    window_coeffs: Vec<f32>,
    compensation: Vec<f32>,
    coherent_gain: f32,

    time_scratch: Vec<f32>,
    freq_scratch: Vec<Complex<f32>>,
    /// Channel-averaged linear frame magnitudes, published after each frame.
    unproc_frame: Vec<f32>,
    proc_frame: Vec<f32>,

    channels: Vec<ChannelState>,
    snapshots: Arc<SpectrumSnapshots>,
}

impl<P: SpectralProcessor> SpectralTransformEngine<P> {
    /// Build an engine for `fft_size` points and `num_channels` channels
    /// with the given analysis window, wrapping `processor`.
    ///
    /// Size and channel count are fixed for the life of the engine; all
    /// buffers are allocated here. The hop follows the window's overlap
    /// requirement: a quarter of the FFT size for the Blackman family,
    /// half for Hann and Hamming.
    pub fn new(
        fft_size: usize,
        num_channels: usize,
        window: Window,
        processor: P,
    ) -> Result<Self, EngineError> {
        if fft_size < MIN_FFT_SIZE {
            return Err(EngineError::FftSizeTooSmall(fft_size));
        }
        if !fft_size.is_power_of_two() {
            return Err(EngineError::FftSizeNotPowerOfTwo(fft_size));
        }
        if num_channels == 0 || num_channels > MAX_CHANNELS {
            return Err(EngineError::InvalidChannelCount(num_channels));
        }

        let hop_size = fft_size / window.overlap_factor();
        let mut planner = FftPlanner::new();
        let forward = planner.plan_fft_forward(fft_size);
        let inverse = planner.plan_fft_inverse(fft_size);
        let scratch_len = forward
            .get_inplace_scratch_len()
            .max(inverse.get_inplace_scratch_len());

        let window_coeffs = window.coefficients(fft_size);
        let compensation = compensation_table(window, fft_size, hop_size);
        let num_bins = fft_size / 2 + 1;

        let channels = (0..num_channels)
            .map(|_| ChannelState {
                input: RingBuffer::new(fft_size * 2),
                output: RingBuffer::new(fft_size * 2),
                ola: vec![0.0; fft_size],
            })
            .collect();

        Ok(Self {
            processor,
            fft_size,
            hop_size,
            window,
            num_channels,
            sample_rate: 0.0,
            forward,
            inverse,
            fft_scratch: vec![Complex::new(0.0, 0.0); scratch_len],
            coherent_gain: window.coherent_gain(fft_size),
            window_coeffs,
            compensation,
            time_scratch: vec![0.0; fft_size],
            freq_scratch: vec![Complex::new(0.0, 0.0); fft_size],
            unproc_frame: vec![0.0; num_bins],
            proc_frame: vec![0.0; num_bins],
            channels,
            snapshots: Arc::new(SpectrumSnapshots::new(num_bins)),
        })
    }

    /// Zero all pipeline state, store the sample rate, and propagate the
    /// configuration to the wrapped processor.
    ///
    /// Call before the first [`process_block`](Self::process_block) and
    /// again on every sample-rate change.
    pub fn prepare_to_play(&mut self, sample_rate: f32) {
        self.sample_rate = sample_rate;
        for ch in &mut self.channels {
            ch.input.clear();
            ch.output.clear();
            ch.ola.fill(0.0);
        }

        let config = SpectralConfig {
            sample_rate,
            fft_size: self.fft_size,
            hop_size: self.hop_size,
            num_channels: self.num_channels,
            coherent_gain: self.coherent_gain,
        };
        self.processor.prepare(&config);

        debug!(
            sample_rate,
            fft_size = self.fft_size,
            hop_size = self.hop_size,
            num_channels = self.num_channels,
            window = ?self.window,
            "spectral engine prepared"
        );
    }

    /// Fixed pipeline delay in samples.
    ///
    /// The first frame fires on the push that fills the analysis buffer,
    /// so a sample entering at time `t` leaves at `t + fft_size - 1`.
    pub fn latency_samples(&self) -> usize {
        self.fft_size - 1
    }

    /// Configured FFT size.
    pub fn fft_size(&self) -> usize {
        self.fft_size
    }

    /// Hop between frames in samples.
    pub fn hop_size(&self) -> usize {
        self.hop_size
    }

    /// Analysis window in use.
    pub fn window(&self) -> Window {
        self.window
    }

    /// Shared handle to the published spectrum snapshots.
    pub fn snapshots(&self) -> Arc<SpectrumSnapshots> {
        Arc::clone(&self.snapshots)
    }

    /// The wrapped spectral processor.
    pub fn processor(&self) -> &P {
        &self.processor
    }

    /// Mutable access to the wrapped spectral processor.
    pub fn processor_mut(&mut self) -> &mut P {
        &mut self.processor
    }

    /// Clear all FIFOs and accumulated state without reallocating.
    pub fn reset(&mut self) {
        for ch in &mut self.channels {
            ch.input.clear();
            ch.output.clear();
            ch.ola.fill(0.0);
        }
        self.processor.reset();
    }

    /// Process `buffers` in place, one slice per channel.
    ///
    /// The live channel count may be smaller than the configured count;
    /// the extra configured channels stay idle. It must not exceed the
    /// configured count, and must stay constant between
    /// [`prepare_to_play`](Self::prepare_to_play) calls. All channel
    /// slices must be the same length. Non-finite input samples are
    /// replaced with silence before entering the pipeline.
    ///
    /// Before the first [`prepare_to_play`](Self::prepare_to_play) no
    /// frames run and the output is all zeros.
    pub fn process_block(&mut self, buffers: &mut [&mut [f32]]) {
        debug_assert!(buffers.len() <= self.num_channels);
        let active = buffers.len().min(self.num_channels);
        let len = buffers.first().map_or(0, |b| b.len());
        let prepared = self.sample_rate > 0.0;

        for n in 0..len {
            for (ch, buf) in self.channels.iter_mut().zip(buffers.iter()) {
                ch.input.push(sanitize_sample(buf[n]));
            }

            // Live channels share the cadence, so channel 0 speaks for all.
            if prepared && active > 0 && self.channels[0].input.len() >= self.fft_size {
                self.process_frame(active);
            }

            for (ch, buf) in self.channels.iter_mut().zip(buffers.iter_mut()) {
                buf[n] = ch.output.pop();
            }
        }
    }

    /// Run one analysis/resynthesis frame for the first `active` channels,
    /// then publish the channel-averaged magnitude snapshots.
    fn process_frame(&mut self, active: usize) {
        let half = self.fft_size / 2;
        let num_bins = half + 1;
        let inv_n = 1.0 / self.fft_size as f32;
        let interior_scale = 2.0 * inv_n / self.coherent_gain;
        let edge_scale = inv_n / self.coherent_gain;

        for channel in 0..active {
            // Window the oldest fft_size samples without consuming them;
            // only a hop's worth leaves the FIFO per frame.
            self.channels[channel].input.peek_front(&mut self.time_scratch);
            for (dst, (&x, &w)) in self
                .freq_scratch
                .iter_mut()
                .zip(self.time_scratch.iter().zip(&self.window_coeffs))
            {
                *dst = Complex::new(x * w, 0.0);
            }

            self.forward
                .process_with_scratch(&mut self.freq_scratch, &mut self.fft_scratch);

            for i in 0..num_bins {
                let scale = if i == 0 || i == half { edge_scale } else { interior_scale };
                let mag = self.freq_scratch[i].norm() * scale;
                if channel == 0 {
                    self.unproc_frame[i] = mag;
                } else {
                    self.unproc_frame[i] += mag;
                }
            }

            self.processor
                .process_spectrum(channel, &mut self.freq_scratch[..num_bins]);

            for i in 0..num_bins {
                let scale = if i == 0 || i == half { edge_scale } else { interior_scale };
                let mag = self.freq_scratch[i].norm() * scale;
                if channel == 0 {
                    self.proc_frame[i] = mag;
                } else {
                    self.proc_frame[i] += mag;
                }
            }

            // The processor only saw the lower half; rebuild the upper
            // half so the inverse transform comes out real.
            for k in 1..half {
                self.freq_scratch[self.fft_size - k] = self.freq_scratch[k].conj();
            }

            self.inverse
                .process_with_scratch(&mut self.freq_scratch, &mut self.fft_scratch);

            let ch = &mut self.channels[channel];
            for i in 0..self.fft_size {
                let sample = self.freq_scratch[i].re * inv_n * self.window_coeffs[i];
                ch.ola[i] += sample * self.compensation[i];
            }

            for i in 0..self.hop_size {
                ch.output.push(ch.ola[i]);
            }
            ch.ola.copy_within(self.hop_size.., 0);
            ch.ola[self.fft_size - self.hop_size..].fill(0.0);

            ch.input.discard(self.hop_size);
        }

        if active > 1 {
            let inv = 1.0 / active as f32;
            for v in &mut self.unproc_frame {
                *v *= inv;
            }
            for v in &mut self.proc_frame {
                *v *= inv;
            }
        }
        self.snapshots.write_unprocessed(&self.unproc_frame);
        self.snapshots.write_processed(&self.proc_frame);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine(fft_size: usize, window: Window) -> SpectralTransformEngine<PassthroughProcessor> {
        let mut e = SpectralTransformEngine::new(fft_size, 1, window, PassthroughProcessor)
            .expect("valid config");
        e.prepare_to_play(48_000.0);
        e
    }

    #[test]
    fn rejects_bad_configurations() {
        let r = SpectralTransformEngine::new(500, 1, Window::Hann, PassthroughProcessor);
        assert_eq!(r.err(), Some(EngineError::FftSizeNotPowerOfTwo(500)));
        let r = SpectralTransformEngine::new(32, 1, Window::Hann, PassthroughProcessor);
        assert_eq!(r.err(), Some(EngineError::FftSizeTooSmall(32)));
        let r = SpectralTransformEngine::new(512, 0, Window::Hann, PassthroughProcessor);
        assert_eq!(r.err(), Some(EngineError::InvalidChannelCount(0)));
        let r = SpectralTransformEngine::new(512, 9, Window::Hann, PassthroughProcessor);
        assert_eq!(r.err(), Some(EngineError::InvalidChannelCount(9)));
    }

    #[test]
    fn hop_follows_window_family() {
        let e = engine(1024, Window::Hann);
        assert_eq!(e.hop_size(), 512);
        let e = engine(1024, Window::BlackmanHarris);
        assert_eq!(e.hop_size(), 256);
    }

    #[test]
    fn passthrough_reconstructs_sine() {
        let fft_size = 512;
        let mut e = engine(fft_size, Window::BlackmanHarris);
        let latency = e.latency_samples();

        let total = fft_size * 8;
        let freq = 1000.0 / 48_000.0;
        let mut signal: Vec<f32> = (0..total)
            .map(|n| libm::sinf(2.0 * core::f32::consts::PI * freq * n as f32))
            .collect();
        let reference = signal.clone();

        let mut bufs: Vec<&mut [f32]> = vec![&mut signal];
        e.process_block(&mut bufs);

        // Compare past the fill transient: output sample latency+k carries
        // input sample k, and the first fft_size outputs have partial
        // window overlap.
        for k in fft_size..(total - latency) {
            let got = signal[latency + k];
            let want = reference[k];
            assert!(
                (got - want).abs() < 1e-2,
                "sample {k}: want {want}, got {got}"
            );
        }
    }

    #[test]
    fn impulse_latency_is_one_fft_minus_one() {
        let fft_size = 256;
        let mut e = engine(fft_size, Window::Hann);

        // Placed past the first FFT so every overlapping frame sees it;
        // an impulse in the very first hop is only covered by one window.
        let pos = fft_size;
        let mut signal = vec![0.0f32; fft_size * 4];
        signal[pos] = 1.0;
        let mut bufs: Vec<&mut [f32]> = vec![&mut signal];
        e.process_block(&mut bufs);

        let first = signal
            .iter()
            .position(|&s| s.abs() > 1e-3)
            .expect("impulse must come out");
        assert_eq!(first, pos + fft_size - 1);
        // Full overlap reconstructs the impulse at unit amplitude.
        assert!((signal[pos + fft_size - 1] - 1.0).abs() < 1e-2);
    }

    #[test]
    fn leading_zeros_before_pipeline_fills() {
        let fft_size = 256;
        let mut e = engine(fft_size, Window::Hann);

        let mut signal = vec![1.0f32; fft_size];
        let mut bufs: Vec<&mut [f32]> = vec![&mut signal];
        e.process_block(&mut bufs);

        for (i, &s) in signal.iter().take(fft_size - 1).enumerate() {
            assert_eq!(s, 0.0, "expected silence at sample {i}");
        }
    }

    #[test]
    fn nonfinite_input_is_contained() {
        let fft_size = 256;
        let mut e = engine(fft_size, Window::Hann);

        let mut signal = vec![0.5f32; fft_size * 4];
        signal[10] = f32::NAN;
        signal[11] = f32::INFINITY;
        signal[12] = f32::NEG_INFINITY;
        let mut bufs: Vec<&mut [f32]> = vec![&mut signal];
        e.process_block(&mut bufs);

        assert!(signal.iter().all(|s| s.is_finite()));
    }

    #[test]
    fn block_size_does_not_change_output() {
        let fft_size = 256;
        let total = fft_size * 6;
        let input: Vec<f32> = (0..total)
            .map(|n| libm::sinf(0.03 * n as f32) * 0.7)
            .collect();

        let mut one_shot = input.clone();
        let mut e = engine(fft_size, Window::BlackmanHarris);
        let mut bufs: Vec<&mut [f32]> = vec![&mut one_shot];
        e.process_block(&mut bufs);

        let mut chunked = input.clone();
        let mut e = engine(fft_size, Window::BlackmanHarris);
        // Awkward chunk sizes exercise the FIFO cadence.
        let mut offset = 0;
        for &size in [1usize, 7, 64, 100, 3, 256].iter().cycle() {
            if offset >= total {
                break;
            }
            let end = (offset + size).min(total);
            let mut bufs: Vec<&mut [f32]> = vec![&mut chunked[offset..end]];
            e.process_block(&mut bufs);
            offset = end;
        }

        for (i, (a, b)) in one_shot.iter().zip(&chunked).enumerate() {
            assert!((a - b).abs() < 1e-6, "sample {i} differs: {a} vs {b}");
        }
    }

    #[test]
    fn stereo_channels_stay_independent() {
        let fft_size = 256;
        let mut e = SpectralTransformEngine::new(fft_size, 2, Window::Hann, PassthroughProcessor)
            .expect("valid config");
        e.prepare_to_play(48_000.0);

        let total = fft_size * 6;
        let mut left: Vec<f32> = (0..total).map(|n| libm::sinf(0.05 * n as f32)).collect();
        let mut right = vec![0.0f32; total];
        let mut bufs: Vec<&mut [f32]> = vec![&mut left, &mut right];
        e.process_block(&mut bufs);

        // The silent channel must not pick up bleed from the other.
        assert!(right.iter().all(|&s| s.abs() < 1e-5));
        assert!(left.iter().any(|&s| s.abs() > 0.5));
    }

    #[test]
    fn snapshots_show_sine_peak() {
        let fft_size = 1024;
        let sample_rate = 48_000.0;
        let mut e = SpectralTransformEngine::new(fft_size, 1, Window::Hann, PassthroughProcessor)
            .expect("valid config");
        e.prepare_to_play(sample_rate);
        let snapshots = e.snapshots();

        // Bin-centered sinusoid at full scale.
        let bin = 64;
        let freq = bin as f32 * sample_rate / fft_size as f32;
        let mut signal: Vec<f32> = (0..fft_size * 4)
            .map(|n| libm::sinf(2.0 * core::f32::consts::PI * freq * n as f32 / sample_rate))
            .collect();
        let mut bufs: Vec<&mut [f32]> = vec![&mut signal];
        e.process_block(&mut bufs);

        let spectrum = snapshots.unprocessed();
        // Calibration puts a full-scale sine at linear magnitude ~1 in its
        // bin.
        assert!(
            (spectrum[bin] - 1.0).abs() < 0.12,
            "expected ~1.0 at bin {bin}, got {}",
            spectrum[bin]
        );
        // A bin far away sits near the floor (below -40 dBFS).
        assert!(spectrum[bin + 200] < 0.01);
    }

    #[test]
    fn unprepared_engine_stays_silent() {
        let fft_size = 256;
        let mut e = SpectralTransformEngine::new(fft_size, 1, Window::Hann, PassthroughProcessor)
            .expect("valid config");

        // No prepare_to_play yet: input is swallowed, output is silence.
        let mut signal = vec![0.8f32; fft_size * 4];
        let mut bufs: Vec<&mut [f32]> = vec![&mut signal];
        e.process_block(&mut bufs);
        assert!(signal.iter().all(|&s| s == 0.0));

        // Preparing afterwards starts the pipeline from scratch.
        e.prepare_to_play(48_000.0);
        let mut signal = vec![0.8f32; fft_size * 4];
        let mut bufs: Vec<&mut [f32]> = vec![&mut signal];
        e.process_block(&mut bufs);
        assert!(signal.iter().any(|&s| s.abs() > 0.1));
    }

    #[test]
    fn tolerates_fewer_live_channels_than_configured() {
        let fft_size = 256;
        let mut e = SpectralTransformEngine::new(fft_size, 2, Window::Hann, PassthroughProcessor)
            .expect("valid config");
        e.prepare_to_play(48_000.0);
        let latency = e.latency_samples();

        // Mono buffer into a stereo-configured engine: the second channel
        // idles and the first behaves normally.
        let total = fft_size * 6;
        let mut signal: Vec<f32> = (0..total).map(|n| libm::sinf(0.05 * n as f32)).collect();
        let reference = signal.clone();
        let mut bufs: Vec<&mut [f32]> = vec![&mut signal];
        e.process_block(&mut bufs);

        for k in fft_size..(total - latency) {
            assert!((signal[latency + k] - reference[k]).abs() < 1e-2);
        }
    }

    #[test]
    fn reset_clears_pipeline() {
        let fft_size = 256;
        let mut e = engine(fft_size, Window::Hann);

        let mut signal = vec![0.8f32; fft_size * 2];
        let mut bufs: Vec<&mut [f32]> = vec![&mut signal];
        e.process_block(&mut bufs);

        e.reset();

        // After reset, silence in produces silence out.
        let mut quiet = vec![0.0f32; fft_size * 2];
        let mut bufs: Vec<&mut [f32]> = vec![&mut quiet];
        e.process_block(&mut bufs);
        assert!(quiet.iter().all(|&s| s == 0.0));
    }
}
