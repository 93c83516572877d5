use tracing::{debug, info};

use super::calibration::{calibrate, Calibration};
use super::runtime::{QuantizedAutoencoder, QuantizedLayer};
use super::{format, quantize_multiplier, QuantParams, DEFAULT_CALIBRATION_SAMPLES, WEIGHT_QMAX};
use crate::data::Dataset;
use crate::domain::model::ConversionReport;
use crate::model::{DenseLayer, DenseNetwork, ModelBundle};
use crate::utils::error::{AutoencoderError, Result};

impl QuantizedLayer {
    /// Quantize a float layer given the activation params on both sides.
    pub fn quantize(layer: &DenseLayer, input: QuantParams, output: QuantParams) -> Result<Self> {
        let mut weight_scales = Vec::with_capacity(layer.out_dim);
        let mut multipliers = Vec::with_capacity(layer.out_dim);
        let mut shifts = Vec::with_capacity(layer.out_dim);
        let mut bias = Vec::with_capacity(layer.out_dim);

        for o in 0..layer.out_dim {
            let max_abs = (0..layer.in_dim)
                .map(|i| layer.weight(i, o).abs())
                .fold(0.0f32, f32::max);
            let scale = if max_abs > 0.0 {
                max_abs / WEIGHT_QMAX as f32
            } else {
                1.0
            };

            let accumulator_scale = f64::from(input.scale) * f64::from(scale);
            let (m, shift) = quantize_multiplier(accumulator_scale / f64::from(output.scale));
            let q_bias = (f64::from(layer.bias[o]) / accumulator_scale)
                .round()
                .clamp(f64::from(i32::MIN), f64::from(i32::MAX)) as i32;

            weight_scales.push(scale);
            multipliers.push(m);
            shifts.push(shift);
            bias.push(q_bias);
        }

        let weights = layer
            .weights
            .iter()
            .enumerate()
            .map(|(idx, &w)| {
                let scale = weight_scales[idx % layer.out_dim];
                (w / scale)
                    .round()
                    .clamp(-(WEIGHT_QMAX as f32), WEIGHT_QMAX as f32) as i8
            })
            .collect();

        let quantized = Self {
            in_dim: layer.in_dim,
            out_dim: layer.out_dim,
            activation: layer.activation,
            output,
            weight_scales,
            multipliers,
            shifts,
            bias,
            weights,
        };
        quantized.validate()?;
        Ok(quantized)
    }
}

/// Build the int8 model from a float network and its calibration ranges.
pub fn quantize_network(
    network: &DenseNetwork,
    calibration: &Calibration,
    anomaly_threshold: Option<f32>,
) -> Result<QuantizedAutoencoder> {
    if calibration.layers.len() != network.layers().len() {
        return Err(AutoencoderError::QuantizationError {
            message: format!(
                "calibration covers {} layers, network has {}",
                calibration.layers.len(),
                network.layers().len()
            ),
        });
    }

    let input = calibration.input.params();
    let mut in_params = input;
    let mut layers = Vec::with_capacity(network.layers().len());

    for (idx, (layer, range)) in network.layers().iter().zip(&calibration.layers).enumerate() {
        let out_params = range.params();
        debug!(
            "Layer {} [{}x{}] range [{:.4}, {:.4}] -> scale {:.6}, zero_point {}",
            idx, layer.in_dim, layer.out_dim, range.min, range.max, out_params.scale, out_params.zero_point
        );
        layers.push(QuantizedLayer::quantize(layer, in_params, out_params)?);
        in_params = out_params;
    }

    QuantizedAutoencoder::new(input, layers, anomaly_threshold)
}

/// Post-training quantization driven by a representative dataset.
#[derive(Debug, Clone)]
pub struct Converter {
    calibration_samples: usize,
}

impl Default for Converter {
    fn default() -> Self {
        Self::new(DEFAULT_CALIBRATION_SAMPLES)
    }
}

impl Converter {
    pub fn new(calibration_samples: usize) -> Self {
        Self {
            calibration_samples,
        }
    }

    pub fn convert(
        &self,
        bundle: &ModelBundle,
        representative: &Dataset,
    ) -> Result<(QuantizedAutoencoder, ConversionReport)> {
        let network = DenseNetwork::new(bundle.model.dense_layers()?)?;
        self.convert_network(&network, representative, bundle.summary.anomaly_threshold)
    }

    pub fn convert_network(
        &self,
        network: &DenseNetwork,
        representative: &Dataset,
        anomaly_threshold: Option<f32>,
    ) -> Result<(QuantizedAutoencoder, ConversionReport)> {
        let calibration = calibrate(network, representative, self.calibration_samples)?;
        let model = quantize_network(network, &calibration, anomaly_threshold)?;

        let mut max_abs_diff = 0.0f32;
        let mut sum_abs_diff = 0.0f64;
        let mut count = 0usize;
        for window in representative.iter_rows().take(calibration.samples) {
            let expected = network.forward(window)?;
            let actual = model.forward(window)?;
            for (e, a) in expected.iter().zip(&actual) {
                let diff = (e - a).abs();
                max_abs_diff = max_abs_diff.max(diff);
                sum_abs_diff += f64::from(diff);
                count += 1;
            }
        }
        let mean_abs_diff = if count == 0 {
            0.0
        } else {
            (sum_abs_diff / count as f64) as f32
        };

        let report = ConversionReport {
            calibration_samples: calibration.samples,
            layers: model.layers().len(),
            max_abs_diff,
            mean_abs_diff,
            artifact_bytes: format::encode(&model)?.len(),
        };

        info!(
            "⚖️ Quantized {} layers with {} calibration windows (max |Δ| {:.5}, mean |Δ| {:.5})",
            report.layers, report.calibration_samples, report.max_abs_diff, report.mean_abs_diff
        );

        Ok((model, report))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Activation;

    fn float_autoencoder() -> DenseNetwork {
        // 4 -> 3 (relu) -> 4 (linear), deterministic pseudo-random weights
        let weights = |n: usize, seed: f32| -> Vec<f32> {
            (0..n).map(|i| ((i as f32 * 1.37 + seed).sin()) * 0.8).collect()
        };
        let enc = DenseLayer::new(4, 3, weights(12, 0.3), vec![0.1, -0.05, 0.2], Activation::Relu)
            .unwrap();
        let dec = DenseLayer::new(3, 4, weights(12, 1.1), vec![0.0, 0.05, -0.1, 0.02], Activation::Linear)
            .unwrap();
        DenseNetwork::new(vec![enc, dec]).unwrap()
    }

    fn representative(rows: usize) -> Dataset {
        let values = (0..rows * 4).map(|i| ((i as f32) * 0.61).cos()).collect();
        Dataset::new(rows, 4, values).unwrap()
    }

    #[test]
    fn test_quantized_output_tracks_float_output() {
        let network = float_autoencoder();
        let data = representative(50);
        let (model, report) = Converter::new(100).convert_network(&network, &data, Some(0.3)).unwrap();

        assert_eq!(report.calibration_samples, 50);
        assert_eq!(report.layers, 2);
        assert_eq!(model.anomaly_threshold(), Some(0.3));

        let (lo, hi) = data
            .iter_rows()
            .flat_map(|w| network.forward(w).unwrap())
            .fold((f32::MAX, f32::MIN), |(lo, hi), v| (lo.min(v), hi.max(v)));
        let output_range = hi - lo;
        assert!(
            report.max_abs_diff < 0.05 * output_range.max(1.0),
            "max diff {} for range {}",
            report.max_abs_diff,
            output_range
        );
        assert!(report.mean_abs_diff <= report.max_abs_diff);
        assert_eq!(report.artifact_bytes, format::encode(&model).unwrap().len());
    }

    #[test]
    fn test_weights_use_symmetric_range() {
        let layer = DenseLayer::new(2, 2, vec![0.5, -0.1, -1.0, 0.05], vec![0.0, 0.0], Activation::Linear)
            .unwrap();
        let params = QuantParams::from_range(-1.0, 1.0);
        let q = QuantizedLayer::quantize(&layer, params, params).unwrap();

        // channel 0 max |w| = 1.0, channel 1 max |w| = 0.1
        assert_eq!(q.weights[2], -127);
        assert_eq!(q.weights[1], -127);
        assert!((q.weight_scales[0] - 1.0 / 127.0).abs() < 1e-7);
    }

    #[test]
    fn test_zero_weight_channel_is_valid() {
        let layer = DenseLayer::new(1, 2, vec![0.0, 0.3], vec![0.0, 0.0], Activation::Linear).unwrap();
        let params = QuantParams::from_range(-1.0, 1.0);
        let q = QuantizedLayer::quantize(&layer, params, params).unwrap();
        assert_eq!(q.weight_scales[0], 1.0);
        assert_eq!(q.weights[0], 0);
    }

    #[test]
    fn test_quantize_network_checks_calibration() {
        let network = float_autoencoder();
        let calibration = Calibration {
            input: Default::default(),
            layers: vec![Default::default()],
            samples: 1,
        };
        assert!(quantize_network(&network, &calibration, None).is_err());
    }
}
