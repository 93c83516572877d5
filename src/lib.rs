pub mod config;
pub mod core;
pub mod data;
pub mod domain;
pub mod model;
pub mod quant;
pub mod train;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::{CliConfig, Command};
pub use config::{LocalStorage, TomlConfig};

pub use crate::core::{ConversionPipeline, Engine, ScoringPipeline, TrainingPipeline};
pub use data::Dataset;
pub use model::ModelBundle;
pub use quant::QuantizedAutoencoder;
pub use utils::error::{AutoencoderError, Result};
