//! Top-level processor: gain staging around the spectral dynamics chain.
//!
//! Signal path per channel:
//!
//! ```text
//! in -> input gain -> STFT -> per-bin dynamics -> iSTFT -> output gain -> out
//! ```
//!
//! The input and output stages ramp over 50 ms so automation does not
//! click. Block peak levels are published through relaxed atomics so a
//! meter on another thread can poll them without touching any lock.

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use espectro_core::{
    GainStage, ParamDescriptor, ParamId, ParameterInfo, linear_to_db,
};

use crate::curve::ResponseCurveModel;
use crate::dynamics::{DynamicsEngine, DynamicsMode};
use crate::error::EngineError;
use crate::snapshot::SpectrumSnapshots;
use crate::stft::SpectralTransformEngine;
use crate::window::Window;

/// Block peak meter readable across threads.
///
/// Stores the linear peak of the most recent block as `f32` bits.
#[derive(Debug)]
struct LevelProbe(AtomicU32);

impl LevelProbe {
    fn new() -> Self {
        Self(AtomicU32::new(0.0f32.to_bits()))
    }

    fn store(&self, peak: f32) {
        self.0.store(peak.to_bits(), Ordering::Relaxed);
    }

    fn load(&self) -> f32 {
        f32::from_bits(self.0.load(Ordering::Relaxed))
    }
}

/// Complete spectral dynamics processor with gain staging and parameter
/// introspection.
pub struct SpectralDynamics {
    input_gain: GainStage,
    output_gain: GainStage,
    engine: SpectralTransformEngine<DynamicsEngine>,
    curve: ResponseCurveModel,
    input_probe: LevelProbe,
    output_probe: LevelProbe,
    curve_shift_desc: ParamDescriptor,
}

/// Parameter indices, in display order.
const P_INPUT_GAIN: usize = 0;
const P_OUTPUT_GAIN: usize = 1;
const P_MODE: usize = 2;
const P_ATTACK: usize = 3;
const P_RELEASE: usize = 4;
const P_RATIO: usize = 5;
const P_KNEE: usize = 6;
const P_CURVE_SHIFT: usize = 7;

fn descriptors() -> [ParamDescriptor; 8] {
    [
        ParamDescriptor::gain_db("Input Gain", "In", -24.0, 24.0, 0.0)
            .with_id(ParamId(1), "input_gain"),
        ParamDescriptor::gain_db("Output Gain", "Out", -24.0, 24.0, 0.0)
            .with_id(ParamId(2), "output_gain"),
        ParamDescriptor::stepped("Mode", "Mode", 3).with_id(ParamId(3), "dyn_mode"),
        ParamDescriptor::time_ms("Attack", "Atk", 1.0, 1000.0, 10.0)
            .with_id(ParamId(4), "dyn_attack"),
        ParamDescriptor::time_ms("Release", "Rel", 10.0, 1000.0, 100.0)
            .with_id(ParamId(5), "dyn_release"),
        ParamDescriptor::ratio("Ratio", "Ratio", 1.0, 20.0, 4.0).with_id(ParamId(6), "dyn_ratio"),
        ParamDescriptor::gain_db("Knee", "Knee", 0.0, 12.0, 6.0).with_id(ParamId(7), "dyn_knee"),
        ParamDescriptor::gain_db("Curve Shift", "Shift", -96.0, 12.0, 0.0)
            .with_id(ParamId(8), "curve_shift"),
    ]
}

impl SpectralDynamics {
    /// Build the full chain for `fft_size` points and `num_channels`
    /// channels with the given analysis window. The response curve starts
    /// empty (transparent).
    pub fn new(
        fft_size: usize,
        num_channels: usize,
        window: Window,
    ) -> Result<Self, EngineError> {
        let curve = ResponseCurveModel::new();
        let engine = SpectralTransformEngine::new(
            fft_size,
            num_channels,
            window,
            DynamicsEngine::new(curve.clone()),
        )?;
        Ok(Self {
            input_gain: GainStage::new(44_100.0),
            output_gain: GainStage::new(44_100.0),
            engine,
            curve,
            input_probe: LevelProbe::new(),
            output_probe: LevelProbe::new(),
            curve_shift_desc: descriptors()[P_CURVE_SHIFT],
        })
    }

    /// Reset signal state for the session. Call before processing and on
    /// every sample-rate change.
    pub fn prepare_to_play(&mut self, sample_rate: f32) {
        self.input_gain.set_sample_rate(sample_rate);
        self.output_gain.set_sample_rate(sample_rate);
        self.engine.prepare_to_play(sample_rate);
    }

    /// Fixed chain latency in samples (the gain stages add none).
    pub fn latency_samples(&self) -> usize {
        self.engine.latency_samples()
    }

    /// Shared handle to the editable response curve.
    pub fn curve(&self) -> ResponseCurveModel {
        self.curve.clone()
    }

    /// Shared handle to the published display spectra.
    pub fn snapshots(&self) -> Arc<SpectrumSnapshots> {
        self.engine.snapshots()
    }

    /// Linear peak of the most recent block after the input stage.
    pub fn input_level(&self) -> f32 {
        self.input_probe.load()
    }

    /// Same probe in dB.
    pub fn input_level_db(&self) -> f32 {
        linear_to_db(self.input_probe.load())
    }

    /// Linear peak of the most recent block after the output stage.
    pub fn output_level(&self) -> f32 {
        self.output_probe.load()
    }

    /// Same probe in dB.
    pub fn output_level_db(&self) -> f32 {
        linear_to_db(self.output_probe.load())
    }

    /// Clear all signal state; parameters and the curve are kept.
    pub fn reset(&mut self) {
        self.input_gain.reset();
        self.output_gain.reset();
        self.engine.reset();
        self.input_probe.store(0.0);
        self.output_probe.store(0.0);
    }

    /// Process `buffers` in place, one slice per channel.
    pub fn process_block(&mut self, buffers: &mut [&mut [f32]]) {
        let len = buffers.first().map_or(0, |b| b.len());

        // One ramp step per sample frame, shared across channels, so a
        // stereo pair stays gain-matched mid-ramp.
        let mut in_peak = 0.0f32;
        for n in 0..len {
            let g = self.input_gain.process(1.0);
            for buf in buffers.iter_mut() {
                buf[n] *= g;
                in_peak = in_peak.max(buf[n].abs());
            }
        }
        self.input_probe.store(in_peak);

        self.engine.process_block(buffers);
        self.engine
            .snapshots()
            .write_gain_reduction(self.engine.processor().envelope_db(0));

        let mut out_peak = 0.0f32;
        for n in 0..len {
            let g = self.output_gain.process(1.0);
            for buf in buffers.iter_mut() {
                buf[n] *= g;
                out_peak = out_peak.max(buf[n].abs());
            }
        }
        self.output_probe.store(out_peak);
    }
}

impl ParameterInfo for SpectralDynamics {
    fn param_count(&self) -> usize {
        8
    }

    fn param_info(&self, index: usize) -> Option<ParamDescriptor> {
        descriptors().get(index).copied()
    }

    fn get_param(&self, index: usize) -> f32 {
        let dyn_engine = self.engine.processor();
        match index {
            P_INPUT_GAIN => self.input_gain.gain_db(),
            P_OUTPUT_GAIN => self.output_gain.gain_db(),
            P_MODE => dyn_engine.mode().as_index() as f32,
            P_ATTACK => dyn_engine.attack_ms(),
            P_RELEASE => dyn_engine.release_ms(),
            P_RATIO => dyn_engine.ratio(),
            P_KNEE => dyn_engine.knee_db(),
            P_CURVE_SHIFT => self.curve.shift_db(),
            _ => 0.0,
        }
    }

    fn set_param(&mut self, index: usize, value: f32) {
        match index {
            P_INPUT_GAIN => self.input_gain.set_gain_db(value),
            P_OUTPUT_GAIN => self.output_gain.set_gain_db(value),
            P_MODE => {
                let mode = DynamicsMode::from_index(value.round().max(0.0) as usize);
                self.engine.processor_mut().set_mode(mode);
            }
            P_ATTACK => self.engine.processor_mut().set_attack_ms(value),
            P_RELEASE => self.engine.processor_mut().set_release_ms(value),
            P_RATIO => self.engine.processor_mut().set_ratio(value),
            P_KNEE => self.engine.processor_mut().set_knee_db(value),
            P_CURVE_SHIFT => self.curve.set_shift_db(self.curve_shift_desc.clamp(value)),
            _ => {}
        }
    }
}
