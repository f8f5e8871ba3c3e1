//! Property-based tests for the spectral pipeline.
//!
//! Randomized inputs, curves, and parameter settings must never drive the
//! engine into non-finite output, and the passthrough analysis chain must
//! reconstruct arbitrary bounded signals.

use espectro_dsp::{
    GaussianPeak, ParameterInfo, PassthroughProcessor, SpectralDynamics,
    SpectralTransformEngine, Window,
};
use proptest::prelude::*;

fn any_window() -> impl Strategy<Value = Window> {
    prop_oneof![
        Just(Window::Hann),
        Just(Window::Hamming),
        Just(Window::Blackman),
        Just(Window::BlackmanHarris),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Any bounded input through the passthrough engine reconstructs
    /// within tight tolerance past the fill transient, for every window
    /// family and FFT size.
    #[test]
    fn passthrough_reconstructs_arbitrary_signals(
        window in any_window(),
        size_exp in 6u32..11, // 64..1024
        input in prop::collection::vec(-1.0f32..=1.0f32, 4096..5000),
    ) {
        let fft_size = 1usize << size_exp;
        let mut engine = SpectralTransformEngine::new(fft_size, 1, window, PassthroughProcessor)
            .expect("power-of-two size");
        engine.prepare_to_play(48_000.0);
        let latency = engine.latency_samples();

        let mut signal = input.clone();
        let mut bufs: Vec<&mut [f32]> = vec![&mut signal];
        engine.process_block(&mut bufs);

        for k in fft_size..(input.len().saturating_sub(latency)) {
            let got = signal[latency + k];
            let want = input[k];
            prop_assert!(
                (got - want).abs() < 1e-3,
                "window {:?} size {}: sample {} want {} got {}",
                window, fft_size, k, want, got
            );
        }
    }

    /// Random curves and parameter values never produce non-finite audio,
    /// even with hostile input containing NaN and infinities.
    #[test]
    fn full_chain_output_is_always_finite(
        mode in 0.0f32..=3.0,
        attack in 0.1f32..500.0,
        release in 1.0f32..5000.0,
        ratio in 1.0f32..100.0,
        knee in 0.1f32..24.0,
        shift in -60.0f32..=60.0,
        peaks in prop::collection::vec(
            (20.0f32..20_000.0, -40.0f32..=40.0, 0.01f32..1.0),
            0..6
        ),
        input in prop::collection::vec(-2.0f32..=2.0, 2048),
        poison_at in prop::option::of(0usize..2048),
    ) {
        let mut proc = SpectralDynamics::new(512, 1, Window::BlackmanHarris)
            .expect("valid config");
        proc.prepare_to_play(44_100.0);

        for (freq, gain, sigma) in peaks {
            proc.curve().add_peak(GaussianPeak::new(freq, gain, sigma));
        }
        proc.curve().set_shift_db(shift);
        for (name, value) in [
            ("Mode", mode),
            ("Attack", attack),
            ("Release", release),
            ("Ratio", ratio),
            ("Knee", knee),
        ] {
            let idx = proc.find_param_by_name(name).expect("known param");
            proc.set_param(idx, value);
        }

        let mut signal = input;
        if let Some(i) = poison_at {
            signal[i] = f32::NAN;
        }
        let mut bufs: Vec<&mut [f32]> = vec![&mut signal];
        proc.process_block(&mut bufs);

        prop_assert!(signal.iter().all(|s| s.is_finite()));
    }

    /// Reported latency never depends on how the stream is chopped into
    /// blocks.
    #[test]
    fn chunking_never_shifts_the_output(
        chunk in 1usize..300,
    ) {
        let fft_size = 256;
        let total = fft_size * 5;
        let input: Vec<f32> = (0..total).map(|n| ((n % 97) as f32 / 48.0) - 1.0).collect();

        let mut whole = input.clone();
        let mut engine = SpectralTransformEngine::new(fft_size, 1, Window::Hann, PassthroughProcessor)
            .expect("valid");
        engine.prepare_to_play(48_000.0);
        let mut bufs: Vec<&mut [f32]> = vec![&mut whole];
        engine.process_block(&mut bufs);

        let mut pieces = input.clone();
        let mut engine = SpectralTransformEngine::new(fft_size, 1, Window::Hann, PassthroughProcessor)
            .expect("valid");
        engine.prepare_to_play(48_000.0);
        for off in (0..total).step_by(chunk) {
            let end = (off + chunk).min(total);
            let mut bufs: Vec<&mut [f32]> = vec![&mut pieces[off..end]];
            engine.process_block(&mut bufs);
        }

        for (i, (a, b)) in whole.iter().zip(&pieces).enumerate() {
            prop_assert!((a - b).abs() < 1e-6, "sample {} differs: {} vs {}", i, a, b);
        }
    }
}
