//! Parameter smoothing for zipper-free changes.
//!
//! Gain and similar host-facing parameters need smooth transitions to
//! avoid audible "zipper noise" when values change. [`LinearSmoothedParam`]
//! ramps at a constant rate so the transition completes in a known time;
//! the [`GainStage`] is built on it.
//!
//! [`GainStage`]: crate::GainStage

/// A parameter with linear smoothing (constant rate of change).
///
/// Unlike exponential smoothing, the transition completes in exactly the
/// configured time, which makes it the right choice for the input/output
/// gain ramps around the spectral engine.
#[derive(Debug, Clone)]
pub struct LinearSmoothedParam {
    current: f32,
    target: f32,
    increment: f32,
    samples_remaining: u32,
    sample_rate: f32,
    transition_time_ms: f32,
}

impl LinearSmoothedParam {
    /// Create a new linear smoothed parameter (10 ms default ramp).
    pub fn new(initial: f32) -> Self {
        Self {
            current: initial,
            target: initial,
            increment: 0.0,
            samples_remaining: 0,
            sample_rate: 44100.0,
            transition_time_ms: 10.0,
        }
    }

    /// Create with full configuration.
    pub fn with_config(initial: f32, sample_rate: f32, transition_time_ms: f32) -> Self {
        Self {
            current: initial,
            target: initial,
            increment: 0.0,
            samples_remaining: 0,
            sample_rate,
            transition_time_ms,
        }
    }

    /// Set the target value, starting a new ramp.
    pub fn set_target(&mut self, target: f32) {
        if (target - self.target).abs() < 1e-9 {
            return;
        }

        self.target = target;

        let samples = (self.transition_time_ms / 1000.0 * self.sample_rate) as u32;
        if samples == 0 {
            self.current = target;
            self.increment = 0.0;
            self.samples_remaining = 0;
        } else {
            self.increment = (target - self.current) / samples as f32;
            self.samples_remaining = samples;
        }
    }

    /// Set value immediately, cancelling any ramp in flight.
    pub fn set_immediate(&mut self, value: f32) {
        self.current = value;
        self.target = value;
        self.increment = 0.0;
        self.samples_remaining = 0;
    }

    /// Update sample rate (affects ramps started after this call).
    pub fn set_sample_rate(&mut self, sample_rate: f32) {
        self.sample_rate = sample_rate;
    }

    /// Set transition time in milliseconds.
    pub fn set_transition_time_ms(&mut self, time_ms: f32) {
        self.transition_time_ms = time_ms;
    }

    /// Get next smoothed value.
    #[inline]
    pub fn advance(&mut self) -> f32 {
        if self.samples_remaining > 0 {
            self.current += self.increment;
            self.samples_remaining -= 1;
            if self.samples_remaining == 0 {
                self.current = self.target; // Snap to exact target
            }
        }
        self.current
    }

    /// Current value without advancing.
    #[inline]
    pub fn get(&self) -> f32 {
        self.current
    }

    /// Target value.
    #[inline]
    pub fn target(&self) -> f32 {
        self.target
    }

    /// Whether the ramp has completed.
    #[inline]
    pub fn is_settled(&self) -> bool {
        self.samples_remaining == 0
    }

    /// Snap to target immediately.
    pub fn snap_to_target(&mut self) {
        self.current = self.target;
        self.increment = 0.0;
        self.samples_remaining = 0;
    }
}

impl Default for LinearSmoothedParam {
    fn default() -> Self {
        Self::new(0.0)
    }
}
