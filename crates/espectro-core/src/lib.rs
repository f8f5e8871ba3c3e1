//! Espectro Core - DSP primitives for spectral dynamics processing
//!
//! This crate provides the foundational building blocks for the espectro
//! spectral dynamics engine, designed for real-time audio processing with
//! zero allocation in the audio path.
//!
//! # Core Abstractions
//!
//! ## Sample Queues
//!
//! - [`RingBuffer`] - Fixed-capacity circular FIFO with overwrite-on-full
//!   semantics, used for input staging and output delivery around the STFT
//!   pipeline
//!
//! ## Parameter Smoothing
//!
//! Zipper-free parameter changes for click-free automation:
//!
//! - [`LinearSmoothedParam`] - Linear ramps (constant rate)
//!
//! ## Gain Staging
//!
//! - [`GainStage`] - Smoothed linear input/output gain with a dB interface
//!
//! ## Parameter Introspection
//!
//! - [`ParamDescriptor`] - Declarative parameter metadata (id, range,
//!   default, step, unit)
//! - [`ParameterInfo`] - Runtime parameter discovery for hosts and GUIs
//!
//! ## Utilities
//!
//! - Math functions: [`db_to_linear`], [`linear_to_db`], [`sanitize_sample`]
//!
//! # no_std Support
//!
//! This crate is `no_std` compatible (with `alloc`) for embedded audio
//! applications. Disable the default `std` feature in your `Cargo.toml`:
//!
//! ```toml
//! [dependencies]
//! espectro-core = { version = "0.1", default-features = false }
//! ```
//!
//! # Design Principles
//!
//! - **Real-time safe**: No allocations in audio processing paths
//! - **No dependencies on std**: Pure `no_std` with `libm` for math
//! - **Explicit contracts**: Out-of-range indexing is a caller bug caught
//!   by debug assertions, never a recoverable runtime error

#![cfg_attr(not(feature = "std"), no_std)]

#[cfg(not(feature = "std"))]
extern crate alloc;

pub mod gain;
pub mod math;
pub mod param;
pub mod param_info;
pub mod ring;

// Re-export main types at crate root
pub use gain::GainStage;
pub use math::{DB_FLOOR, db_to_linear, linear_to_db, magnitude_to_db, sanitize_sample};
pub use param::LinearSmoothedParam;
pub use param_info::{ParamDescriptor, ParamId, ParamUnit, ParameterInfo};
pub use ring::RingBuffer;
