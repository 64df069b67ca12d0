//! Normalization engine.
//!
//! Maps between normalized values (0.0 to 1.0), the only currency exchanged
//! with the engine and host automation, and plain values in a parameter's
//! own units (Hz, dB, ms). Three shape curves are supported:
//!
//! - [`ParameterShape::Linear`] - `min + n * (max - min)`
//! - [`ParameterShape::PowCurve`] - `min + n^exponent * (max - min)`
//! - [`ParameterShape::Exp`] - geometric interpolation between `min` and `max`
//!
//! Every branch of [`to_normalized`] is the exact inverse of the matching
//! branch of [`from_normalized`].
//!
//! # Example
//!
//! ```ignore
//! use plugwire_core::parameter_range::{from_normalized, to_normalized, ParameterShape};
//!
//! // 632 Hz is the geometric mean of 20 and 20000
//! let mid = from_normalized(0.5, 20.0, 20000.0, ParameterShape::Exp);
//! assert!((mid - 632.455).abs() < 0.001);
//! assert!((to_normalized(mid, 20.0, 20000.0, ParameterShape::Exp) - 0.5).abs() < 1e-9);
//! ```

/// Lower bound substituted for non-positive minimums on the exponential curve.
pub const EXP_SAFE_MIN: f64 = 1e-8;

/// Shape curve distributing a control's resolution across its range.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum ParameterShape {
    /// Straight interpolation.
    #[default]
    Linear,
    /// Power curve. Exponents below 1.0 bias the displayed range toward
    /// the low end; above 1.0 toward the high end.
    PowCurve {
        /// Curve exponent. Non-positive or non-finite exponents behave as 1.0.
        exponent: f64,
    },
    /// Exponential (logarithmic-feel) curve. Requires `max > 0`.
    Exp,
}

impl ParameterShape {
    fn exponent(exponent: f64) -> f64 {
        if exponent.is_finite() && exponent > 0.0 {
            exponent
        } else {
            1.0
        }
    }
}

/// Convert a normalized value to a plain value.
///
/// `normalized` is clamped to 0.0-1.0 first.
pub fn from_normalized(normalized: f64, min: f64, max: f64, shape: ParameterShape) -> f64 {
    let n = normalized.clamp(0.0, 1.0);
    match shape {
        ParameterShape::Linear => min + n * (max - min),
        ParameterShape::PowCurve { exponent } => {
            min + n.powf(ParameterShape::exponent(exponent)) * (max - min)
        }
        ParameterShape::Exp => {
            if max <= 0.0 {
                return min + n * (max - min);
            }
            let safe_min = exp_min(min);
            (safe_min.ln() + n * (max.ln() - safe_min.ln())).exp()
        }
    }
}

/// Convert a plain value to a normalized value.
///
/// Returns 0.0 for a degenerate range (`max == min`). The result is clamped
/// to 0.0-1.0.
pub fn to_normalized(plain: f64, min: f64, max: f64, shape: ParameterShape) -> f64 {
    if max == min {
        return 0.0;
    }
    let n = match shape {
        ParameterShape::Linear => (plain - min) / (max - min),
        ParameterShape::PowCurve { exponent } => {
            let linear = ((plain - min) / (max - min)).clamp(0.0, 1.0);
            linear.powf(1.0 / ParameterShape::exponent(exponent))
        }
        ParameterShape::Exp => {
            if max <= 0.0 {
                return ((plain - min) / (max - min)).clamp(0.0, 1.0);
            }
            let safe_min = exp_min(min);
            let span = max.ln() - safe_min.ln();
            if span == 0.0 {
                return 0.0;
            }
            (plain.max(safe_min).ln() - safe_min.ln()) / span
        }
    };
    if n.is_nan() {
        0.0
    } else {
        n.clamp(0.0, 1.0)
    }
}

/// Express a plain step size as a fraction of the range.
///
/// Returns 0.0 for a degenerate range.
pub fn to_normalized_step(step: f64, min: f64, max: f64) -> f64 {
    if max == min {
        return 0.0;
    }
    step / (max - min)
}

/// Snap a normalized value to the nearest multiple of `normalized_step`.
///
/// Returns `normalized` unchanged if the step is not positive.
pub fn snap_to_step(normalized: f64, normalized_step: f64) -> f64 {
    if normalized_step <= 0.0 || normalized_step.is_nan() {
        return normalized;
    }
    ((normalized / normalized_step).round() * normalized_step).clamp(0.0, 1.0)
}

#[inline]
fn exp_min(min: f64) -> f64 {
    if min <= 0.0 {
        EXP_SAFE_MIN
    } else {
        min
    }
}

/// Trait for mapping between plain values and normalized values.
pub trait RangeMapper {
    /// Convert a plain value to normalized (0.0-1.0).
    fn normalize(&self, plain: f64) -> f64;

    /// Convert a normalized value (0.0-1.0) to plain.
    fn denormalize(&self, normalized: f64) -> f64;

    /// Get the plain value range as (min, max).
    fn range(&self) -> (f64, f64);
}

/// A plain range together with its shape curve.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShapedRange {
    pub min: f64,
    pub max: f64,
    pub shape: ParameterShape,
}

impl ShapedRange {
    pub const fn new(min: f64, max: f64, shape: ParameterShape) -> Self {
        Self { min, max, shape }
    }

    pub const fn linear(min: f64, max: f64) -> Self {
        Self::new(min, max, ParameterShape::Linear)
    }
}

impl RangeMapper for ShapedRange {
    fn normalize(&self, plain: f64) -> f64 {
        to_normalized(plain, self.min, self.max, self.shape)
    }

    fn denormalize(&self, normalized: f64) -> f64 {
        from_normalized(normalized, self.min, self.max, self.shape)
    }

    fn range(&self) -> (f64, f64) {
        (self.min, self.max)
    }
}
