//! Activation range calibration over a representative dataset.

use super::QuantParams;
use crate::data::Dataset;
use crate::model::DenseNetwork;
use crate::utils::error::{AutoencoderError, Result};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ActivationRange {
    pub min: f32,
    pub max: f32,
}

impl Default for ActivationRange {
    fn default() -> Self {
        Self {
            min: f32::INFINITY,
            max: f32::NEG_INFINITY,
        }
    }
}

impl ActivationRange {
    pub fn observe(&mut self, values: &[f32]) {
        for &v in values {
            self.min = self.min.min(v);
            self.max = self.max.max(v);
        }
    }

    pub fn params(&self) -> QuantParams {
        QuantParams::from_range(self.min, self.max)
    }
}

/// Observed ranges of the network input and of every layer output.
#[derive(Debug, Clone, PartialEq)]
pub struct Calibration {
    pub input: ActivationRange,
    pub layers: Vec<ActivationRange>,
    pub samples: usize,
}

/// Feed the first `samples` windows through `network` one at a time and record ranges.
pub fn calibrate(
    network: &DenseNetwork,
    representative: &Dataset,
    samples: usize,
) -> Result<Calibration> {
    if samples == 0 {
        return Err(AutoencoderError::QuantizationError {
            message: "at least one calibration sample is required".to_string(),
        });
    }
    if representative.dim() != network.input_dim() {
        return Err(AutoencoderError::shape(
            format!("{} features per window", network.input_dim()),
            format!("{} features per window", representative.dim()),
        ));
    }

    let mut input = ActivationRange::default();
    let mut layers = vec![ActivationRange::default(); network.layers().len()];
    let mut seen = 0usize;

    for window in representative.iter_rows().take(samples) {
        input.observe(window);
        for (range, output) in layers.iter_mut().zip(network.forward_trace(window)?) {
            range.observe(&output);
        }
        seen += 1;
    }

    if seen < samples {
        tracing::warn!(
            "⚠️ Only {} representative windows available (requested {})",
            seen,
            samples
        );
    }

    Ok(Calibration {
        input,
        layers,
        samples: seen,
    })
}
