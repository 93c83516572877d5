pub mod autoencoder;
pub mod bundle;
pub mod dense;

use burn::backend::{Autodiff, NdArray};

/// CPU backend used for inference, export and bundle decoding.
pub type InferenceBackend = NdArray<f32>;

/// Backend with automatic differentiation used while fitting.
pub type TrainingBackend = Autodiff<InferenceBackend>;

pub use autoencoder::{Autoencoder, AutoencoderConfig};
pub use bundle::ModelBundle;
pub use dense::{Activation, DenseLayer, DenseNetwork};
