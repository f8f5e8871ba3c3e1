//! Construction-time error type for the spectral engine.
//!
//! All validation happens at construction or preparation; the per-sample
//! audio path never returns errors and never panics on bad input.

use thiserror::Error;

/// Errors raised while configuring a spectral engine.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    /// FFT size must be a power of two for the radix transforms used here
    /// and for the hop arithmetic to come out exact.
    #[error("FFT size {0} is not a power of two")]
    FftSizeNotPowerOfTwo(usize),

    /// Below 64 points the analysis window has too few bins to be useful
    /// and the overlap bookkeeping degenerates.
    #[error("FFT size {0} is too small (minimum 64)")]
    FftSizeTooSmall(usize),

    /// Channel counts outside 1 through 8 are refused at construction.
    #[error("invalid channel count {0} (expected 1..=8)")]
    InvalidChannelCount(usize),
}
