//! Integer-only inference for the quantized autoencoder.

use super::{apply_multiplier, QuantParams, MAX_SHIFT, QMAX, QMIN};
use crate::model::Activation;
use crate::utils::error::{AutoencoderError, Result};

#[derive(Debug, Clone, PartialEq)]
pub struct QuantizedLayer {
    pub in_dim: usize,
    pub out_dim: usize,
    pub activation: Activation,
    pub output: QuantParams,
    pub weight_scales: Vec<f32>,
    pub multipliers: Vec<i32>,
    pub shifts: Vec<i32>,
    pub bias: Vec<i32>,
    /// Row-major `[in_dim][out_dim]`
    pub weights: Vec<i8>,
}

impl QuantizedLayer {
    pub fn validate(&self) -> Result<()> {
        if self.in_dim == 0 || self.out_dim == 0 {
            return Err(AutoencoderError::artifact(format!(
                "empty layer [{}, {}]",
                self.in_dim, self.out_dim
            )));
        }
        let per_channel = [
            self.weight_scales.len(),
            self.multipliers.len(),
            self.shifts.len(),
            self.bias.len(),
        ];
        if per_channel.iter().any(|&n| n != self.out_dim) {
            return Err(AutoencoderError::artifact(format!(
                "per-channel parameter count mismatch for out_dim {}",
                self.out_dim
            )));
        }
        if self.weights.len() != self.in_dim * self.out_dim {
            return Err(AutoencoderError::artifact(format!(
                "expected {} weights, found {}",
                self.in_dim * self.out_dim,
                self.weights.len()
            )));
        }
        validate_params(&self.output, "output")?;
        if let Some(shift) = self.shifts.iter().find(|s| !(-MAX_SHIFT..=MAX_SHIFT).contains(*s)) {
            return Err(AutoencoderError::artifact(format!(
                "requantization shift {} outside [-{}, {}]",
                shift, MAX_SHIFT, MAX_SHIFT
            )));
        }
        if let Some(m) = self.multipliers.iter().find(|m| **m < 0) {
            return Err(AutoencoderError::artifact(format!(
                "negative requantization multiplier {}",
                m
            )));
        }
        Ok(())
    }

    /// Integer dense layer: `acc = bias + Σ (x - zp_in) * w`, then requantize to the output scale.
    pub fn forward(&self, input: &[i8], input_zero_point: i32) -> Vec<i8> {
        debug_assert_eq!(input.len(), self.in_dim);

        let mut acc: Vec<i64> = self.bias.iter().map(|&b| i64::from(b)).collect();
        for (i, &x) in input.iter().enumerate() {
            let x = i64::from(x) - i64::from(input_zero_point);
            if x == 0 {
                continue;
            }
            let row = &self.weights[i * self.out_dim..(i + 1) * self.out_dim];
            for (a, &w) in acc.iter_mut().zip(row) {
                *a += x * i64::from(w);
            }
        }

        // ReLU 直接以輸出零點截斷
        let lower = match self.activation {
            Activation::Relu => self.output.zero_point.clamp(QMIN, QMAX),
            Activation::Linear => QMIN,
        };

        acc.iter()
            .enumerate()
            .map(|(o, &a)| {
                let scaled = apply_multiplier(a, self.multipliers[o], self.shifts[o]);
                scaled
                    .saturating_add(self.output.zero_point)
                    .clamp(lower, QMAX) as i8
            })
            .collect()
    }
}

fn validate_params(params: &QuantParams, what: &str) -> Result<()> {
    if !(params.scale.is_finite() && params.scale > 0.0) {
        return Err(AutoencoderError::artifact(format!("{} scale must be positive", what)));
    }
    if !(QMIN..=QMAX).contains(&params.zero_point) {
        return Err(AutoencoderError::artifact(format!(
            "{} zero point {} outside [{}, {}]",
            what, params.zero_point, QMIN, QMAX
        )));
    }
    Ok(())
}

/// Int8 autoencoder with float input and output.
#[derive(Debug, Clone, PartialEq)]
pub struct QuantizedAutoencoder {
    pub(super) input: QuantParams,
    pub(super) layers: Vec<QuantizedLayer>,
    anomaly_threshold: Option<f32>,
}

impl QuantizedAutoencoder {
    pub fn new(
        input: QuantParams,
        layers: Vec<QuantizedLayer>,
        anomaly_threshold: Option<f32>,
    ) -> Result<Self> {
        if layers.is_empty() {
            return Err(AutoencoderError::artifact("quantized model has no layers"));
        }
        validate_params(&input, "input")?;
        for layer in &layers {
            layer.validate()?;
        }
        for (idx, pair) in layers.windows(2).enumerate() {
            if pair[0].out_dim != pair[1].in_dim {
                return Err(AutoencoderError::artifact(format!(
                    "layer {} outputs {} values but layer {} expects {}",
                    idx,
                    pair[0].out_dim,
                    idx + 1,
                    pair[1].in_dim
                )));
            }
        }
        if let Some(first) = layers.first() {
            if let Some(last) = layers.last() {
                if first.in_dim != last.out_dim {
                    return Err(AutoencoderError::artifact(format!(
                        "reconstruction width {} differs from input width {}",
                        last.out_dim, first.in_dim
                    )));
                }
            }
        }

        Ok(Self {
            input,
            layers,
            anomaly_threshold,
        })
    }

    pub fn input_params(&self) -> QuantParams {
        self.input
    }

    pub fn layers(&self) -> &[QuantizedLayer] {
        &self.layers
    }

    pub fn anomaly_threshold(&self) -> Option<f32> {
        self.anomaly_threshold
    }

    pub fn input_dim(&self) -> usize {
        self.layers[0].in_dim
    }

    pub fn forward(&self, window: &[f32]) -> Result<Vec<f32>> {
        if window.len() != self.input_dim() {
            return Err(AutoencoderError::shape(
                format!("{} features per window", self.input_dim()),
                format!("{} features per window", window.len()),
            ));
        }

        let mut q: Vec<i8> = window.iter().map(|&x| self.input.quantize(x)).collect();
        let mut params = self.input;
        for layer in &self.layers {
            q = layer.forward(&q, params.zero_point);
            params = layer.output;
        }

        Ok(q.into_iter().map(|v| params.dequantize(v)).collect())
    }

    /// Mean squared error between a window and its reconstruction.
    pub fn reconstruction_error(&self, window: &[f32]) -> Result<f32> {
        let reconstructed = self.forward(window)?;
        let sum: f32 = window
            .iter()
            .zip(&reconstructed)
            .map(|(x, y)| (x - y).powi(2))
            .sum();
        Ok(sum / window.len() as f32)
    }

    /// `false` when the model carries no threshold.
    pub fn is_anomaly(&self, reconstruction_error: f32) -> bool {
        self.anomaly_threshold
            .map(|t| reconstruction_error > t)
            .unwrap_or(false)
    }
}
