//! Plain `f32` dense network used after training.
//!
//! Weights are exported from the burn module once; calibration and the
//! float/quantized comparison run on these slices without a tensor backend.

use serde::{Deserialize, Serialize};

use crate::utils::error::{AutoencoderError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Activation {
    Linear,
    Relu,
}

impl Activation {
    pub fn apply(self, x: f32) -> f32 {
        match self {
            Activation::Linear => x,
            Activation::Relu => x.max(0.0),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DenseLayer {
    pub in_dim: usize,
    pub out_dim: usize,
    /// Row-major `[in_dim][out_dim]`, matching `y = x W + b`.
    pub weights: Vec<f32>,
    pub bias: Vec<f32>,
    pub activation: Activation,
}

impl DenseLayer {
    pub fn new(
        in_dim: usize,
        out_dim: usize,
        weights: Vec<f32>,
        bias: Vec<f32>,
        activation: Activation,
    ) -> Result<Self> {
        if in_dim == 0 || out_dim == 0 {
            return Err(AutoencoderError::shape("non-empty layer", format!("[{}, {}]", in_dim, out_dim)));
        }
        if weights.len() != in_dim * out_dim {
            return Err(AutoencoderError::shape(
                format!("{} weights", in_dim * out_dim),
                format!("{} weights", weights.len()),
            ));
        }
        if bias.len() != out_dim {
            return Err(AutoencoderError::shape(
                format!("{} bias values", out_dim),
                format!("{} bias values", bias.len()),
            ));
        }
        if weights.iter().chain(bias.iter()).any(|v| !v.is_finite()) {
            return Err(AutoencoderError::QuantizationError {
                message: "layer contains non-finite parameters".to_string(),
            });
        }

        Ok(Self {
            in_dim,
            out_dim,
            weights,
            bias,
            activation,
        })
    }

    #[inline]
    pub fn weight(&self, input: usize, output: usize) -> f32 {
        self.weights[input * self.out_dim + output]
    }

    pub fn forward(&self, x: &[f32]) -> Vec<f32> {
        debug_assert_eq!(x.len(), self.in_dim);
        let mut y = self.bias.clone();
        for (i, &xi) in x.iter().enumerate() {
            if xi == 0.0 {
                continue;
            }
            let row = &self.weights[i * self.out_dim..(i + 1) * self.out_dim];
            for (acc, &w) in y.iter_mut().zip(row) {
                *acc += xi * w;
            }
        }
        for v in y.iter_mut() {
            *v = self.activation.apply(*v);
        }
        y
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DenseNetwork {
    layers: Vec<DenseLayer>,
}

impl DenseNetwork {
    pub fn new(layers: Vec<DenseLayer>) -> Result<Self> {
        if layers.is_empty() {
            return Err(AutoencoderError::shape("at least one layer", "0 layers"));
        }
        for (idx, pair) in layers.windows(2).enumerate() {
            if pair[0].out_dim != pair[1].in_dim {
                return Err(AutoencoderError::shape(
                    format!("layer[{}] in_dim {}", idx + 1, pair[0].out_dim),
                    format!("{}", pair[1].in_dim),
                ));
            }
        }
        Ok(Self { layers })
    }

    pub fn layers(&self) -> &[DenseLayer] {
        &self.layers
    }

    pub fn input_dim(&self) -> usize {
        self.layers[0].in_dim
    }

    pub fn output_dim(&self) -> usize {
        self.layers[self.layers.len() - 1].out_dim
    }

    /// Outputs of every layer (post-activation), in order.
    pub fn forward_trace(&self, input: &[f32]) -> Result<Vec<Vec<f32>>> {
        if input.len() != self.input_dim() {
            return Err(AutoencoderError::shape(
                format!("{} features", self.input_dim()),
                format!("{} features", input.len()),
            ));
        }

        let mut trace: Vec<Vec<f32>> = Vec::with_capacity(self.layers.len());
        for layer in &self.layers {
            let x = trace.last().map(Vec::as_slice).unwrap_or(input);
            let y = layer.forward(x);
            trace.push(y);
        }
        Ok(trace)
    }

    pub fn forward(&self, input: &[f32]) -> Result<Vec<f32>> {
        let mut trace = self.forward_trace(input)?;
        Ok(trace.pop().unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity_relu(dim: usize) -> DenseLayer {
        let mut weights = vec![0.0; dim * dim];
        for i in 0..dim {
            weights[i * dim + i] = 1.0;
        }
        DenseLayer::new(dim, dim, weights, vec![0.0; dim], Activation::Relu).unwrap()
    }

    #[test]
    fn test_layer_forward_applies_bias_and_relu() {
        // y0 = 1*x0 + 2*x1 + 0.5, y1 = -1*x0 + 0*x1 - 1
        let layer = DenseLayer::new(
            2,
            2,
            vec![1.0, -1.0, 2.0, 0.0],
            vec![0.5, -1.0],
            Activation::Relu,
        )
        .unwrap();
        assert_eq!(layer.forward(&[1.0, 1.0]), vec![3.5, 0.0]);
    }

    #[test]
    fn test_network_rejects_broken_chain() {
        let a = identity_relu(3);
        let b = identity_relu(2);
        assert!(DenseNetwork::new(vec![a, b]).is_err());
    }

    #[test]
    fn test_forward_trace_and_input_check() {
        let net = DenseNetwork::new(vec![identity_relu(2), identity_relu(2)]).unwrap();
        let trace = net.forward_trace(&[1.0, -1.0]).unwrap();
        assert_eq!(trace.len(), 2);
        assert_eq!(trace[1], vec![1.0, 0.0]);
        assert!(net.forward(&[1.0]).is_err());
    }

    #[test]
    fn test_layer_rejects_bad_shapes() {
        assert!(DenseLayer::new(2, 2, vec![0.0; 3], vec![0.0; 2], Activation::Linear).is_err());
        assert!(DenseLayer::new(2, 2, vec![0.0; 4], vec![0.0; 1], Activation::Linear).is_err());
        assert!(DenseLayer::new(1, 1, vec![f32::NAN], vec![0.0], Activation::Linear).is_err());
    }
}
