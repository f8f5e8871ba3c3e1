//! Parameter introspection for discoverable processor parameters.
//!
//! Host integration and GUI layers discover the processor's parameters
//! through [`ParameterInfo`] instead of ambient global layout tables. Each
//! parameter is described by a [`ParamDescriptor`] constructed once: stable
//! id, range, default, step, and display unit all live in one place, so
//! adding a parameter is a one-place change.
//!
//! # Example
//!
//! ```rust
//! use espectro_core::{ParameterInfo, ParamDescriptor, ParamId};
//!
//! struct SimpleGain {
//!     gain_db: f32,
//! }
//!
//! impl ParameterInfo for SimpleGain {
//!     fn param_count(&self) -> usize { 1 }
//!
//!     fn param_info(&self, index: usize) -> Option<ParamDescriptor> {
//!         match index {
//!             0 => Some(ParamDescriptor::gain_db("Gain", "Gain", -24.0, 24.0, 0.0)
//!                 .with_id(ParamId(100), "gain_level")),
//!             _ => None,
//!         }
//!     }
//!
//!     fn get_param(&self, index: usize) -> f32 {
//!         match index {
//!             0 => self.gain_db,
//!             _ => 0.0,
//!         }
//!     }
//!
//!     fn set_param(&mut self, index: usize, value: f32) {
//!         if index == 0 {
//!             self.gain_db = value.clamp(-24.0, 24.0);
//!         }
//!     }
//! }
//! ```

/// Stable parameter identifier that survives reordering.
///
/// Used by hosts for automation recording and preset save/restore. Once
/// assigned, a `ParamId` must never change for a given parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ParamId(pub u32);

/// Display unit for a parameter value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamUnit {
    /// Decibels (gain, threshold shift).
    Decibels,
    /// Milliseconds (attack, release).
    Milliseconds,
    /// Hertz (frequencies).
    Hertz,
    /// Unitless ratio (compression ratio).
    Ratio,
    /// Discrete stepped index (mode selectors).
    Stepped,
}

impl ParamUnit {
    /// Display suffix for formatted values (empty for unitless).
    pub fn suffix(self) -> &'static str {
        match self {
            ParamUnit::Decibels => " dB",
            ParamUnit::Milliseconds => " ms",
            ParamUnit::Hertz => " Hz",
            ParamUnit::Ratio => ":1",
            ParamUnit::Stepped => "",
        }
    }
}

/// Describes a single parameter's metadata for display and validation.
///
/// The `short_name` field should be 8 characters or less for hardware
/// displays. `step` is the recommended increment for encoder control.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParamDescriptor {
    /// Full parameter name for display (e.g., "Curve Shift").
    pub name: &'static str,
    /// Short name for hardware displays, max 8 characters.
    pub short_name: &'static str,
    /// Unit type for formatting the parameter value.
    pub unit: ParamUnit,
    /// Minimum allowed value.
    pub min: f32,
    /// Maximum allowed value.
    pub max: f32,
    /// Default value on initialization or reset.
    pub default: f32,
    /// Recommended step increment for encoder-based control.
    pub step: f32,
    /// Stable numeric ID for automation and persistence.
    pub id: ParamId,
    /// Human-readable stable ID (convention: `"dyn_attack"`).
    pub string_id: &'static str,
}

impl ParamDescriptor {
    /// Gain-style parameter in decibels.
    pub fn gain_db(
        name: &'static str,
        short_name: &'static str,
        min: f32,
        max: f32,
        default: f32,
    ) -> Self {
        Self {
            name,
            short_name,
            unit: ParamUnit::Decibels,
            min,
            max,
            default,
            step: 0.5,
            id: ParamId(0),
            string_id: "",
        }
    }

    /// Time parameter in milliseconds.
    pub fn time_ms(
        name: &'static str,
        short_name: &'static str,
        min: f32,
        max: f32,
        default: f32,
    ) -> Self {
        Self {
            name,
            short_name,
            unit: ParamUnit::Milliseconds,
            min,
            max,
            default,
            step: 1.0,
            id: ParamId(0),
            string_id: "",
        }
    }

    /// Unitless ratio parameter.
    pub fn ratio(
        name: &'static str,
        short_name: &'static str,
        min: f32,
        max: f32,
        default: f32,
    ) -> Self {
        Self {
            name,
            short_name,
            unit: ParamUnit::Ratio,
            min,
            max,
            default,
            step: 0.1,
            id: ParamId(0),
            string_id: "",
        }
    }

    /// Discrete stepped parameter (enum index).
    pub fn stepped(name: &'static str, short_name: &'static str, max_index: u32) -> Self {
        Self {
            name,
            short_name,
            unit: ParamUnit::Stepped,
            min: 0.0,
            max: max_index as f32,
            default: 0.0,
            step: 1.0,
            id: ParamId(0),
            string_id: "",
        }
    }

    /// Sets the stable parameter ID and string ID (builder pattern).
    pub const fn with_id(mut self, id: ParamId, string_id: &'static str) -> Self {
        self.id = id;
        self.string_id = string_id;
        self
    }

    /// Clamps a value to this parameter's valid range.
    #[inline]
    pub fn clamp(&self, value: f32) -> f32 {
        value.clamp(self.min, self.max)
    }

    /// Converts a plain value to normalized range (0.0 to 1.0).
    #[inline]
    pub fn normalize(&self, value: f32) -> f32 {
        let range = self.max - self.min;
        if range == 0.0 {
            0.0
        } else {
            ((value - self.min) / range).clamp(0.0, 1.0)
        }
    }

    /// Converts a normalized value (0.0 to 1.0) back to the plain range.
    #[inline]
    pub fn denormalize(&self, normalized: f32) -> f32 {
        self.min + normalized.clamp(0.0, 1.0) * (self.max - self.min)
    }
}

/// Trait for processors that expose introspectable parameters.
///
/// Parameters are accessed by zero-based index, stable for the lifetime of
/// the instance.
pub trait ParameterInfo {
    /// Number of parameters exposed. Valid indices are `0..param_count()`.
    fn param_count(&self) -> usize;

    /// Descriptor for the parameter at `index`, or `None` out of range.
    fn param_info(&self, index: usize) -> Option<ParamDescriptor>;

    /// Current value of the parameter at `index` (0.0 if out of range).
    fn get_param(&self, index: usize) -> f32;

    /// Sets the parameter at `index`, clamping to the descriptor range.
    /// Out-of-range indices are ignored.
    fn set_param(&mut self, index: usize, value: f32);

    /// Find a parameter index by name (case-insensitive, matches both
    /// `name` and `short_name`).
    fn find_param_by_name(&self, name: &str) -> Option<usize> {
        (0..self.param_count()).find(|&i| {
            self.param_info(i).is_some_and(|d| {
                d.name.eq_ignore_ascii_case(name) || d.short_name.eq_ignore_ascii_case(name)
            })
        })
    }

    /// Finds a parameter index by its stable [`ParamId`].
    fn param_index_by_id(&self, id: ParamId) -> Option<usize> {
        (0..self.param_count()).find(|&i| self.param_info(i).is_some_and(|d| d.id == id))
    }
}
