//! Real-time spectral dynamics processing.
//!
//! This crate implements frequency-domain dynamics: the signal is carried
//! through a streaming STFT, every bin is compressed, expanded, clipped,
//! or gated against a user-drawn threshold curve, and the result is
//! resynthesized with windowed overlap-add at a fixed latency.
//!
//! The pieces compose bottom-up:
//!
//! - [`Window`] and the compensation table make analysis/synthesis
//!   windowing reconstruct exactly at the window's native overlap.
//! - [`SpectralTransformEngine`] owns the per-sample FIFO cadence, the
//!   FFTs, and the overlap-add, and hands each frame's half spectrum to a
//!   [`SpectralProcessor`].
//! - [`DynamicsEngine`] is that processor: per-bin envelopes driven by a
//!   shared [`ResponseCurveModel`] of Gaussian peaks.
//! - [`SpectralDynamics`] wraps the chain in input/output gain staging and
//!   exposes everything through [`ParameterInfo`].
//!
//! ```rust
//! use espectro_dsp::{GaussianPeak, SpectralDynamics, Window};
//!
//! let mut proc = SpectralDynamics::new(2048, 2, Window::BlackmanHarris)?;
//! proc.prepare_to_play(48_000.0);
//! proc.curve().add_peak(GaussianPeak::new(250.0, -12.0, 0.2));
//!
//! let mut left = vec![0.0f32; 512];
//! let mut right = vec![0.0f32; 512];
//! let mut buffers: Vec<&mut [f32]> = vec![&mut left, &mut right];
//! proc.process_block(&mut buffers);
//! # Ok::<(), espectro_dsp::EngineError>(())
//! ```
//!
//! All allocation happens in `new` and `prepare_to_play`; the audio path
//! is allocation-free and never panics on non-finite input.

pub mod curve;
pub mod dynamics;
pub mod error;
pub mod processor;
pub mod snapshot;
pub mod stft;
pub mod window;

pub use curve::{GaussianPeak, PersistedCurve, PersistedPeak, ResponseCurveModel};
pub use dynamics::{DynamicsEngine, DynamicsMode};
pub use error::EngineError;
pub use processor::SpectralDynamics;
pub use snapshot::SpectrumSnapshots;
pub use stft::{
    PassthroughProcessor, SpectralConfig, SpectralProcessor, SpectralTransformEngine,
};
pub use window::Window;

pub use espectro_core::ParameterInfo;
