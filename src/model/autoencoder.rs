//! Dense autoencoder network
//!
//! Symmetric encoder/decoder over flat feature windows:
//! `input -> hidden -> bottleneck -> latent -> bottleneck -> hidden -> input`.

use burn::module::Param;
use burn::nn::{Initializer, Linear, LinearConfig, Relu};
use burn::prelude::*;

use super::dense::{Activation, DenseLayer};
use crate::utils::error::AutoencoderError;

/// Outer encoder/decoder width
pub const HIDDEN_DIM: usize = 64;

/// Second encoder/decoder width
pub const BOTTLENECK_DIM: usize = 32;

/// Latent code width
pub const LATENT_DIM: usize = 16;

/// Autoencoder architecture configuration
#[derive(Config, Debug)]
pub struct AutoencoderConfig {
    /// Feature window length (input and output width)
    pub input_dim: usize,
    #[config(default = "HIDDEN_DIM")]
    pub hidden_dim: usize,
    #[config(default = "BOTTLENECK_DIM")]
    pub bottleneck_dim: usize,
    #[config(default = "LATENT_DIM")]
    pub latent_dim: usize,
}

/// Dense autoencoder with ReLU hidden layers and a linear reconstruction head.
#[derive(Module, Debug)]
pub struct Autoencoder<B: Backend> {
    enc1: Linear<B>,
    enc2: Linear<B>,
    latent: Linear<B>,
    dec1: Linear<B>,
    dec2: Linear<B>,
    output: Linear<B>,
    activation: Relu,
}

impl AutoencoderConfig {
    /// `(in, out)` width of every layer in forward order.
    pub fn layer_dims(&self) -> [(usize, usize); 6] {
        [
            (self.input_dim, self.hidden_dim),
            (self.hidden_dim, self.bottleneck_dim),
            (self.bottleneck_dim, self.latent_dim),
            (self.latent_dim, self.bottleneck_dim),
            (self.bottleneck_dim, self.hidden_dim),
            (self.hidden_dim, self.input_dim),
        ]
    }

    /// Initialize the network with Glorot-uniform weights and zero biases
    pub fn init<B: Backend>(&self, device: &B::Device) -> Autoencoder<B> {
        let linear = |(d_in, d_out): (usize, usize)| {
            let mut linear = LinearConfig::new(d_in, d_out)
                .with_initializer(Initializer::XavierUniform { gain: 1.0 })
                .init(device);
            linear.bias = Some(Param::from_tensor(Tensor::zeros([d_out], device)));
            linear
        };
        let [l1, l2, l3, l4, l5, l6] = self.layer_dims();

        Autoencoder {
            enc1: linear(l1),
            enc2: linear(l2),
            latent: linear(l3),
            dec1: linear(l4),
            dec2: linear(l5),
            output: linear(l6),
            activation: Relu::new(),
        }
    }
}

impl<B: Backend> Autoencoder<B> {
    /// Reconstruct a batch of windows `[batch, input_dim]`.
    pub fn forward(&self, x: Tensor<B, 2>) -> Tensor<B, 2> {
        let x = self.activation.forward(self.enc1.forward(x));
        let x = self.activation.forward(self.enc2.forward(x));
        let z = self.activation.forward(self.latent.forward(x));
        let x = self.activation.forward(self.dec1.forward(z));
        let x = self.activation.forward(self.dec2.forward(x));
        self.output.forward(x)
    }

    /// Latent code of a batch of windows `[batch, latent_dim]`.
    pub fn encode(&self, x: Tensor<B, 2>) -> Tensor<B, 2> {
        let x = self.activation.forward(self.enc1.forward(x));
        let x = self.activation.forward(self.enc2.forward(x));
        self.activation.forward(self.latent.forward(x))
    }

    /// Per-window mean squared reconstruction error `[batch]`.
    pub fn reconstruction_error(&self, x: Tensor<B, 2>) -> Tensor<B, 1> {
        let reconstructed = self.forward(x.clone());
        (reconstructed - x).powf_scalar(2.0).mean_dim(1).squeeze(1)
    }

    /// Export weights as plain `f32` layers for calibration and quantization.
    pub fn dense_layers(&self) -> crate::utils::error::Result<Vec<DenseLayer>> {
        [
            (&self.enc1, Activation::Relu),
            (&self.enc2, Activation::Relu),
            (&self.latent, Activation::Relu),
            (&self.dec1, Activation::Relu),
            (&self.dec2, Activation::Relu),
            (&self.output, Activation::Linear),
        ]
        .into_iter()
        .map(|(linear, activation)| export_linear(linear, activation))
        .collect()
    }
}

pub(crate) fn tensor_values<B: Backend, const D: usize>(
    tensor: Tensor<B, D>,
) -> crate::utils::error::Result<Vec<f32>> {
    tensor
        .into_data()
        .convert::<f32>()
        .to_vec::<f32>()
        .map_err(|e| AutoencoderError::RecorderError {
            message: format!("failed to read tensor values: {:?}", e),
        })
}

fn export_linear<B: Backend>(
    linear: &Linear<B>,
    activation: Activation,
) -> crate::utils::error::Result<DenseLayer> {
    let weight = linear.weight.val();
    let [in_dim, out_dim] = weight.dims();
    let weights = tensor_values(weight)?;

    let bias = match &linear.bias {
        Some(bias) => tensor_values(bias.val())?,
        None => vec![0.0; out_dim],
    };

    DenseLayer::new(in_dim, out_dim, weights, bias, activation)
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;
    use burn::tensor::TensorData;

    type TestBackend = NdArray<f32>;

    #[test]
    fn test_autoencoder_forward_shape() {
        let device = Default::default();
        let model = AutoencoderConfig::new(12).init::<TestBackend>(&device);

        let input = Tensor::<TestBackend, 2>::zeros([4, 12], &device);
        assert_eq!(model.forward(input.clone()).dims(), [4, 12]);
        assert_eq!(model.encode(input.clone()).dims(), [4, LATENT_DIM]);
        assert_eq!(model.reconstruction_error(input).dims(), [4]);
    }

    #[test]
    fn test_fresh_model_has_zero_biases() {
        let device = Default::default();
        let model = AutoencoderConfig::new(6).init::<TestBackend>(&device);

        let layers = model.dense_layers().unwrap();
        for layer in &layers {
            assert!(layer.bias.iter().all(|b| *b == 0.0));
        }
        // weights stay randomly initialized
        assert!(layers[0].weights.iter().any(|w| *w != 0.0));
    }

    #[test]
    fn test_layer_widths_are_symmetric() {
        let config = AutoencoderConfig::new(10);
        let widths: Vec<usize> = config.layer_dims().iter().map(|(_, out)| *out).collect();
        assert_eq!(widths, vec![64, 32, 16, 32, 64, 10]);
    }

    #[test]
    fn test_dense_export_matches_tensor_forward() {
        let device = Default::default();
        let model = AutoencoderConfig::new(5)
            .with_hidden_dim(8)
            .with_bottleneck_dim(6)
            .with_latent_dim(3)
            .init::<TestBackend>(&device);

        let sample = vec![0.1f32, -0.4, 0.9, 0.0, 0.3];
        let input = Tensor::<TestBackend, 2>::from_data(
            TensorData::new(sample.clone(), [1, 5]),
            &device,
        );
        let expected = tensor_values(model.forward(input)).unwrap();

        let layers = model.dense_layers().unwrap();
        assert_eq!(layers.len(), 6);
        assert_eq!(layers[5].activation, Activation::Linear);

        let network = crate::model::dense::DenseNetwork::new(layers).unwrap();
        let actual = network.forward(&sample).unwrap();
        for (a, e) in actual.iter().zip(expected.iter()) {
            assert!((a - e).abs() < 1e-5, "{} vs {}", a, e);
        }
    }
}
