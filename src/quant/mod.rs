//! Post-training int8 quantization.
//!
//! Activations use asymmetric int8 (`real = scale * (q - zero_point)`),
//! weights use symmetric per-output-channel int8 and biases int32. Rescaling
//! between layers is done with a fixed-point multiplier so inference needs only
//! integer arithmetic.

pub mod calibration;
pub mod converter;
pub mod format;
pub mod runtime;

pub use calibration::{calibrate, ActivationRange, Calibration};
pub use converter::{quantize_network, Converter};
pub use runtime::{QuantizedAutoencoder, QuantizedLayer};

pub const QMIN: i32 = -128;
pub const QMAX: i32 = 127;
/// Symmetric weight range is `[-127, 127]`
pub const WEIGHT_QMAX: i32 = 127;
/// Smallest activation span a range is widened to
pub const MIN_RANGE_SPAN: f32 = 1e-6;

pub const DEFAULT_CALIBRATION_SAMPLES: usize = 100;

/// Shifts produced by [`quantize_multiplier`] lie in `[-MAX_SHIFT, MAX_SHIFT]`
pub const MAX_SHIFT: i32 = 31;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QuantParams {
    pub scale: f32,
    pub zero_point: i32,
}

impl QuantParams {
    /// Asymmetric int8 parameters covering `[min, max]` widened to include 0.
    pub fn from_range(min: f32, max: f32) -> Self {
        let min = if min.is_finite() { min.min(0.0) } else { 0.0 };
        let max = if max.is_finite() { max.max(0.0) } else { 0.0 };
        let span = (max - min).max(MIN_RANGE_SPAN);

        let scale = span / (QMAX - QMIN) as f32;
        let zero_point = (QMIN as f32 - min / scale)
            .round()
            .clamp(QMIN as f32, QMAX as f32) as i32;

        Self { scale, zero_point }
    }

    pub fn quantize(&self, x: f32) -> i8 {
        let q = (x / self.scale).round() as i32;
        q.saturating_add(self.zero_point).clamp(QMIN, QMAX) as i8
    }

    pub fn dequantize(&self, q: i8) -> f32 {
        (i32::from(q) - self.zero_point) as f32 * self.scale
    }
}

/// Split a positive real multiplier into `(m, shift)` with `real ≈ m * 2^(shift - 31)`
/// and `m` in `[2^30, 2^31)`. Zero, negative and vanishing multipliers become `(0, 0)`.
pub fn quantize_multiplier(real: f64) -> (i32, i32) {
    if !real.is_finite() || real <= 0.0 {
        return (0, 0);
    }

    let mut significand = real;
    let mut shift = 0i32;
    while significand >= 1.0 {
        significand /= 2.0;
        shift += 1;
    }
    while significand < 0.5 {
        significand *= 2.0;
        shift -= 1;
    }

    let mut fixed = (significand * (1i64 << 31) as f64).round() as i64;
    if fixed == 1i64 << 31 {
        fixed /= 2;
        shift += 1;
    }
    if shift < -MAX_SHIFT {
        return (0, 0);
    }
    if shift > MAX_SHIFT {
        return (i32::MAX, MAX_SHIFT);
    }

    (fixed as i32, shift)
}

/// `round(acc * m * 2^(shift - 31))`, rounding half up and saturating to `i32`.
pub fn apply_multiplier(acc: i64, multiplier: i32, shift: i32) -> i32 {
    let product = i128::from(acc) * i128::from(multiplier);
    let right_shift = 31 - shift;

    let result = if right_shift <= 0 {
        product << (-right_shift).min(32)
    } else {
        (product + (1i128 << (right_shift - 1))) >> right_shift
    };

    result.clamp(i128::from(i32::MIN), i128::from(i32::MAX)) as i32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_params_cover_unit_range() {
        let p = QuantParams::from_range(0.0, 1.0);
        assert_eq!(p.zero_point, -128);
        assert_eq!(p.quantize(0.0), -128);
        assert_eq!(p.quantize(1.0), 127);
        assert!((p.dequantize(127) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_params_include_zero_exactly() {
        for (min, max) in [(-3.0, 5.0), (0.5, 2.0), (-2.0, -0.25)] {
            let p = QuantParams::from_range(min, max);
            assert_eq!(p.dequantize(p.quantize(0.0)), 0.0);
        }
    }

    #[test]
    fn test_degenerate_range_has_positive_scale() {
        let p = QuantParams::from_range(0.0, 0.0);
        assert!(p.scale > 0.0);
        let p = QuantParams::from_range(f32::INFINITY, f32::NEG_INFINITY);
        assert!(p.scale > 0.0);
    }

    #[test]
    fn test_quantize_saturates() {
        let p = QuantParams::from_range(-1.0, 1.0);
        assert_eq!(p.quantize(100.0), 127);
        assert_eq!(p.quantize(-100.0), -128);
    }

    #[test]
    fn test_quantize_multiplier_normalizes() {
        assert_eq!(quantize_multiplier(0.5), (1 << 30, 0));
        assert_eq!(quantize_multiplier(0.0), (0, 0));
        assert_eq!(quantize_multiplier(-1.0), (0, 0));

        let (m, shift) = quantize_multiplier(0.0123);
        assert!(m >= 1 << 30);
        let approx = m as f64 * 2f64.powi(shift - 31);
        assert!((approx - 0.0123).abs() < 1e-9);

        let (m, shift) = quantize_multiplier(3.0);
        assert_eq!(shift, 2);
        assert!((m as f64 * 2f64.powi(shift - 31) - 3.0).abs() < 1e-6);

        // 超大倍率在 MAX_SHIFT 飽和
        assert_eq!(quantize_multiplier(1e12), (i32::MAX, MAX_SHIFT));
    }

    #[test]
    fn test_apply_multiplier_rounds_to_nearest() {
        let (m, s) = quantize_multiplier(0.5);
        assert_eq!(apply_multiplier(1000, m, s), 500);
        assert_eq!(apply_multiplier(3, m, s), 2);

        let (m, s) = quantize_multiplier(0.75);
        assert_eq!(apply_multiplier(-3, m, s), -2);

        let (m, s) = quantize_multiplier(0.01);
        assert_eq!(apply_multiplier(12_345, m, s), 123);
    }

    #[test]
    fn test_apply_multiplier_saturates() {
        let (m, s) = quantize_multiplier(1000.0);
        assert_eq!(apply_multiplier(i64::from(i32::MAX), m, s), i32::MAX);
        assert_eq!(apply_multiplier(i64::from(i32::MIN), m, s), i32::MIN);
    }
}
